mod engine;

pub use engine::{TimerEngine, TimerPhase, TimerState};
