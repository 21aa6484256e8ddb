//! Study-session points: per-session awards, penalties, streaks and levels.

use std::collections::HashSet;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::scoring::config::PointsConfig;
use crate::scoring::round_dp;
use crate::scoring::types::{LevelFormula, Mood, ScoreInputs};

/// Points needed to reach levels 1..=10 under [`LevelFormula::Threshold`].
const LEVEL_THRESHOLDS: [u32; 10] = [0, 100, 300, 600, 1000, 1500, 2100, 2800, 3600, 4500];

/// Threshold of level 11 when reporting progress from level 10.
const LEVEL_TEN_NEXT_THRESHOLD: u32 = 5500;

/// Per-level step once the threshold table is exhausted.
const THRESHOLD_OVERFLOW_STEP: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PenaltyKind {
    Skip,
    Miss,
}

impl PointsConfig {
    pub fn penalty_for(&self, kind: PenaltyKind) -> u32 {
        match kind {
            PenaltyKind::Skip => self.skip_penalty,
            PenaltyKind::Miss => self.miss_penalty,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PenaltyOutcome {
    pub new_total: u32,
    /// May be less than requested when the total would go negative
    pub applied: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelStatus {
    pub total_points: u32,
    pub level: u32,
    pub points_to_next_level: u32,
    pub progress_percentage: u32,
    pub leveled_up: bool,
}

/// True when the session started within `window_minutes` of its schedule,
/// early or late.
pub fn is_on_time(scheduled: DateTime<Utc>, actual: DateTime<Utc>, window_minutes: i64) -> bool {
    (actual - scheduled).num_seconds().abs() <= window_minutes * 60
}

pub fn calculate_session_points(inputs: &ScoreInputs, cfg: &PointsConfig) -> u32 {
    let mut points = cfg.base_points;

    if inputs.duration_minutes >= cfg.long_session_minutes {
        points += cfg.long_session_bonus;
    }

    match inputs.mood {
        Some(Mood::Happy) => points += cfg.happy_mood_bonus,
        Some(Mood::Sad) => points -= cfg.sad_mood_penalty,
        Some(Mood::Neutral) | None => {}
    }

    if inputs.consecutive_study_days >= cfg.streak_min_days {
        points += cfg.streak_bonus;
    }

    if let (Some(scheduled), Some(actual)) = (inputs.scheduled_at, inputs.actual_start_at) {
        if is_on_time(scheduled, actual, cfg.on_time_window_minutes) {
            points += cfg.on_time_bonus;
        }
    }

    points.clamp(0, cfg.max_session_points) as u32
}

/// Consecutive days ending at `today` that have at least one completed
/// session. A day without a session breaks the streak, including today.
pub fn consecutive_days_streak(completed_days: &[NaiveDate], today: NaiveDate, max_lookback: u32) -> u32 {
    let days: HashSet<NaiveDate> = completed_days.iter().copied().collect();
    let mut streak = 0;
    for offset in 0..max_lookback {
        let day = today - Duration::days(i64::from(offset));
        if !days.contains(&day) {
            break;
        }
        streak += 1;
    }
    streak
}

pub fn apply_penalty(current_total: u32, magnitude: u32) -> PenaltyOutcome {
    let new_total = current_total.saturating_sub(magnitude);
    PenaltyOutcome {
        new_total,
        applied: current_total - new_total,
    }
}

pub fn level_from_points(points: u32, formula: LevelFormula) -> u32 {
    match formula {
        LevelFormula::Linear => points / 100 + 1,
        LevelFormula::Threshold => LEVEL_THRESHOLDS
            .iter()
            .rposition(|threshold| points >= *threshold)
            .map_or(1, |idx| idx as u32 + 1),
    }
}

/// Points threshold at which `level` begins.
fn level_floor(level: u32, formula: LevelFormula) -> u32 {
    match formula {
        LevelFormula::Linear => level.saturating_sub(1).saturating_mul(100),
        LevelFormula::Threshold => match level {
            0 | 1 => 0,
            l if (l as usize) <= LEVEL_THRESHOLDS.len() => LEVEL_THRESHOLDS[l as usize - 1],
            l => l.saturating_mul(THRESHOLD_OVERFLOW_STEP),
        },
    }
}

/// Points threshold of the level after `level`, pinned at `u32::MAX`.
fn next_level_threshold(level: u32, formula: LevelFormula) -> u32 {
    match formula {
        LevelFormula::Linear => level.saturating_mul(100),
        LevelFormula::Threshold => match level {
            l if (l as usize) < LEVEL_THRESHOLDS.len() => LEVEL_THRESHOLDS[l as usize],
            10 => LEVEL_TEN_NEXT_THRESHOLD,
            l => l.saturating_add(1).saturating_mul(THRESHOLD_OVERFLOW_STEP),
        },
    }
}

pub fn points_to_next_level(points: u32, level: u32, formula: LevelFormula) -> u32 {
    next_level_threshold(level, formula).saturating_sub(points)
}

/// Completed share of the current level span, 0–100.
pub fn level_progress_percentage(points: u32, level: u32, formula: LevelFormula) -> u32 {
    let floor = level_floor(level, formula);
    let ceiling = next_level_threshold(level, formula);
    if ceiling <= floor {
        return 0;
    }
    let done = points.saturating_sub(floor).min(ceiling - floor);
    (f64::from(done) / f64::from(ceiling - floor) * 100.0).floor() as u32
}

pub fn level_status(total_points: u32, formula: LevelFormula) -> LevelStatus {
    let level = level_from_points(total_points, formula);
    LevelStatus {
        total_points,
        level,
        points_to_next_level: points_to_next_level(total_points, level, formula),
        progress_percentage: level_progress_percentage(total_points, level, formula),
        leveled_up: false,
    }
}

/// Adds `earned` to `total` and reports the resulting level.
pub fn award_points(total: u32, earned: u32, formula: LevelFormula) -> LevelStatus {
    let before = level_from_points(total, formula);
    let mut status = level_status(total.saturating_add(earned), formula);
    status.leveled_up = status.level > before;
    status
}

/// Points for a finished quiz, by score percentage.
pub fn quiz_completion_points(score_percentage: f64) -> u32 {
    match score_percentage {
        s if s >= 90.0 => 20,
        s if s >= 80.0 => 15,
        s if s >= 70.0 => 10,
        s if s >= 60.0 => 5,
        _ => 2,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum SessionStatus {
    Completed { points_earned: u32 },
    Skipped,
    Missed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOutcome {
    #[serde(flatten)]
    pub status: SessionStatus,
    /// Completion time for completed sessions, last update otherwise
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsSummary {
    pub period_days: u32,
    pub total_earned: u32,
    pub total_penalties: u32,
    pub net_points: i64,
    pub completed_sessions: u32,
    pub skipped_sessions: u32,
    pub missed_sessions: u32,
    pub average_points_per_session: f64,
}

pub fn points_summary(
    outcomes: &[SessionOutcome],
    period_days: u32,
    now: DateTime<Utc>,
    cfg: &PointsConfig,
) -> PointsSummary {
    let start = now - Duration::days(i64::from(period_days));
    let mut total_earned = 0_u32;
    let mut completed = 0_u32;
    let mut skipped = 0_u32;
    let mut missed = 0_u32;

    for outcome in outcomes.iter().filter(|o| o.at >= start) {
        match outcome.status {
            SessionStatus::Completed { points_earned } => {
                total_earned += points_earned;
                completed += 1;
            }
            SessionStatus::Skipped => skipped += 1,
            SessionStatus::Missed => missed += 1,
        }
    }

    let total_penalties = skipped * cfg.penalty_for(PenaltyKind::Skip)
        + missed * cfg.penalty_for(PenaltyKind::Miss);
    let average = if completed > 0 {
        round_dp(f64::from(total_earned) / f64::from(completed), 1)
    } else {
        0.0
    };

    PointsSummary {
        period_days,
        total_earned,
        total_penalties,
        net_points: i64::from(total_earned) - i64::from(total_penalties),
        completed_sessions: completed,
        skipped_sessions: skipped,
        missed_sessions: missed,
        average_points_per_session: average,
    }
}
