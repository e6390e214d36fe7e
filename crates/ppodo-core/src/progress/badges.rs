//! Badge catalog and achievement predicates.
//!
//! The catalog is fixed: fifteen badges seeded once into storage, keyed by
//! their unique name. Each badge is a threshold over one aggregate in
//! [`BadgeContext`]; evaluation never depends on which other badges were
//! awarded in the same pass.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Sessions started in `MORNING_START_HOUR..MORNING_END_HOUR` count as morning sessions.
pub const MORNING_START_HOUR: u32 = 6;
pub const MORNING_END_HOUR: u32 = 9;
/// Sessions started at or after this hour count as night sessions.
pub const NIGHT_START_HOUR: u32 = 22;

/// The aggregate a badge threshold is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeCondition {
    /// Lifetime grapes.
    Grapes,
    /// Lifetime completed bunches.
    Bunches,
    /// Lifetime completed boxes.
    Boxes,
    /// Current streak in days.
    Streak,
    /// Grapes earned today.
    DailyGrapes,
    /// Days of the current month with at least one grape.
    MonthlyDays,
    /// Rewarded sessions started in the morning window.
    MorningSessions,
    /// Rewarded sessions started at night.
    NightSessions,
    Level,
    /// Tasks marked completed.
    TasksCompleted,
    /// Lifetime focus hours (minutes / 60, unrounded).
    TotalHours,
}

impl BadgeCondition {
    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            BadgeCondition::Grapes => "grapes",
            BadgeCondition::Bunches => "bunches",
            BadgeCondition::Boxes => "boxes",
            BadgeCondition::Streak => "streak",
            BadgeCondition::DailyGrapes => "daily_grapes",
            BadgeCondition::MonthlyDays => "monthly_days",
            BadgeCondition::MorningSessions => "morning_sessions",
            BadgeCondition::NightSessions => "night_sessions",
            BadgeCondition::Level => "level",
            BadgeCondition::TasksCompleted => "tasks_completed",
            BadgeCondition::TotalHours => "total_hours",
        }
    }

    /// Parse the storage representation.
    pub fn parse(value: &str) -> Option<Self> {
        let condition = match value {
            "grapes" => BadgeCondition::Grapes,
            "bunches" => BadgeCondition::Bunches,
            "boxes" => BadgeCondition::Boxes,
            "streak" => BadgeCondition::Streak,
            "daily_grapes" => BadgeCondition::DailyGrapes,
            "monthly_days" => BadgeCondition::MonthlyDays,
            "morning_sessions" => BadgeCondition::MorningSessions,
            "night_sessions" => BadgeCondition::NightSessions,
            "level" => BadgeCondition::Level,
            "tasks_completed" => BadgeCondition::TasksCompleted,
            "total_hours" => BadgeCondition::TotalHours,
            _ => return None,
        };
        Some(condition)
    }

    /// Whether `ctx` satisfies this condition at `threshold`.
    pub fn is_met(&self, threshold: u32, ctx: &BadgeContext) -> bool {
        let threshold = u64::from(threshold);
        match self {
            BadgeCondition::Grapes => ctx.total_grapes >= threshold,
            BadgeCondition::Bunches => ctx.total_bunches >= threshold,
            BadgeCondition::Boxes => ctx.total_boxes >= threshold,
            BadgeCondition::Streak => u64::from(ctx.streak_days) >= threshold,
            BadgeCondition::DailyGrapes => u64::from(ctx.daily_grapes) >= threshold,
            BadgeCondition::MonthlyDays => u64::from(ctx.monthly_focus_days) >= threshold,
            BadgeCondition::MorningSessions => ctx.morning_sessions >= threshold,
            BadgeCondition::NightSessions => ctx.night_sessions >= threshold,
            BadgeCondition::Level => u64::from(ctx.level) >= threshold,
            BadgeCondition::TasksCompleted => ctx.tasks_completed >= threshold,
            BadgeCondition::TotalHours => ctx.total_focus_minutes as f64 / 60.0 >= threshold as f64,
        }
    }
}

/// One entry of the static catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BadgeTemplate {
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub category: &'static str,
    pub condition: BadgeCondition,
    pub threshold: u32,
}

const fn badge(
    name: &'static str,
    description: &'static str,
    icon: &'static str,
    category: &'static str,
    condition: BadgeCondition,
    threshold: u32,
) -> BadgeTemplate {
    BadgeTemplate {
        name,
        description,
        icon,
        category,
        condition,
        threshold,
    }
}

/// The fifteen badges, in display order.
pub const BADGE_CATALOG: [BadgeTemplate; 15] = [
    // Milestones
    badge("첫 걸음", "포도알 1개 획득", "🌱", "마일스톤", BadgeCondition::Grapes, 1),
    badge("첫 송이", "포도송이 1개 완성", "🍇", "마일스톤", BadgeCondition::Bunches, 1),
    badge("첫 상자", "포도상자 1개 완성", "📦", "마일스톤", BadgeCondition::Boxes, 1),
    // Streaks
    badge("일주일 연속", "7일 연속 집중", "🔥", "연속성", BadgeCondition::Streak, 7),
    badge("끈기왕", "50일 연속 집중", "💪", "연속성", BadgeCondition::Streak, 50),
    // Daily achievements
    badge("집중왕", "하루 10개 포도알", "⚡", "일간 성과", BadgeCondition::DailyGrapes, 10),
    badge("한 달 마스터", "한 달 중 25일 집중", "👑", "일간 성과", BadgeCondition::MonthlyDays, 25),
    // Collection
    badge("백전노장", "포도알 100개 획득", "💯", "수집", BadgeCondition::Grapes, 100),
    badge("포도농장", "포도상자 10개 완성", "🏭", "수집", BadgeCondition::Boxes, 10),
    badge("전설", "포도알 1000개 획득", "🏆", "수집", BadgeCondition::Grapes, 1000),
    // Time of day
    badge("새벽형 인간", "오전 6-9시 집중", "🌅", "시간대", BadgeCondition::MorningSessions, 10),
    badge("올빼미족", "밤 10시 이후 집중", "🦉", "시간대", BadgeCondition::NightSessions, 10),
    badge("레벨 마스터", "레벨 10 달성", "⭐", "레벨", BadgeCondition::Level, 10),
    badge("완벽주의자", "할 일 100개 완료", "✅", "태스크", BadgeCondition::TasksCompleted, 100),
    badge("시간여행자", "총 100시간 집중", "⏰", "시간", BadgeCondition::TotalHours, 100),
];

/// Aggregate state the predicates are evaluated against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BadgeContext {
    pub total_grapes: u64,
    pub total_bunches: u64,
    pub total_boxes: u64,
    pub streak_days: u32,
    pub daily_grapes: u32,
    pub monthly_focus_days: u32,
    pub morning_sessions: u64,
    pub night_sessions: u64,
    pub level: u32,
    pub tasks_completed: u64,
    pub total_focus_minutes: u64,
}

/// A catalog badge as stored, with its row id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeDefinition {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub category: String,
    pub condition: BadgeCondition,
    pub threshold: u32,
}

impl BadgeDefinition {
    pub fn is_met(&self, ctx: &BadgeContext) -> bool {
        self.condition.is_met(self.threshold, ctx)
    }
}

/// A badge together with when (if ever) it was awarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeStatus {
    #[serde(flatten)]
    pub badge: BadgeDefinition,
    pub earned: bool,
    pub awarded_at: Option<DateTime<Local>>,
}

/// Badges from `definitions` that are not yet awarded and whose predicate holds.
///
/// Every predicate sees the same `ctx`, so the result does not depend on the
/// order of `definitions`.
pub fn newly_satisfied<'a>(
    definitions: &'a [BadgeStatus],
    ctx: &BadgeContext,
) -> Vec<&'a BadgeDefinition> {
    definitions
        .iter()
        .filter(|status| !status.earned && status.badge.is_met(ctx))
        .map(|status| &status.badge)
        .collect()
}
