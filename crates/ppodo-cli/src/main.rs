use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "ppodo", version, about = "Ppodo focus timer: grapes, levels, streaks and badges")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Task management
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Focus sessions without the timer
    Session {
        #[command(subcommand)]
        action: commands::session::SessionAction,
    },
    /// Timer control
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// Grapes, level and streak
    Profile,
    /// Focus statistics
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
    /// Badge catalog and awards
    Badge {
        #[command(subcommand)]
        action: commands::badge::BadgeAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

/// Log to stderr so stdout stays machine-readable JSON.
fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("PPODO_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Task { action } => commands::task::run(action),
        Commands::Session { action } => commands::session::run(action),
        Commands::Timer { action } => commands::timer::run(action),
        Commands::Profile => commands::profile::run(),
        Commands::Stats { action } => commands::stats::run(action),
        Commands::Badge { action } => commands::badge::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
