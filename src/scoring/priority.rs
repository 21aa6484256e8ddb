//! Per-subject priority scores, weekly goal distribution and the planner's
//! weighted priority breakdown.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::constants::{BAC_TARGET_AVERAGE, PERCENT_MAX};
use crate::scoring::config::{PlannerWeights, PriorityConfig};
use crate::scoring::round_dp;
use crate::scoring::types::{DifficultyLevel, SubjectPriority};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityInputs {
    pub coefficient: f64,
    pub difficulty_level: DifficultyLevel,
    pub is_favorite: bool,
    pub weekly_goal_minutes: u32,
    /// Studied / goal for the current week, `None` when unknown
    pub weekly_progress_ratio: Option<f64>,
}

impl PriorityInputs {
    pub fn from_subject(subject: &SubjectPriority, weekly_progress_ratio: Option<f64>) -> Self {
        Self {
            coefficient: subject.coefficient,
            difficulty_level: subject.difficulty_level,
            is_favorite: subject.is_favorite,
            weekly_goal_minutes: subject.weekly_goal_minutes,
            weekly_progress_ratio,
        }
    }
}

/// Non-negative priority of one subject, rounded to 2 decimals.
pub fn compute_priority_score(inputs: &PriorityInputs, cfg: &PriorityConfig) -> f64 {
    let coefficient = inputs.coefficient.max(0.0) / 10.0 * cfg.coefficient_weight;
    let difficulty = cfg.difficulty_score(inputs.difficulty_level);
    let goal = (f64::from(inputs.weekly_goal_minutes) / cfg.goal_saturation_minutes).min(1.0)
        * cfg.goal_weight;
    let favorite = if inputs.is_favorite {
        cfg.favorite_bonus
    } else {
        0.0
    };
    let performance = match inputs.weekly_progress_ratio {
        Some(ratio) if ratio.is_finite() => cfg.performance_weight * (1.0 - ratio.clamp(0.0, 1.0)),
        _ => cfg.performance_default,
    };

    round_dp(coefficient + difficulty + goal + favorite + performance, 2)
}

/// Returns a copy of `subject` with its priority score recomputed.
pub fn refresh_priority(
    subject: &SubjectPriority,
    weekly_progress_ratio: Option<f64>,
    cfg: &PriorityConfig,
) -> SubjectPriority {
    let inputs = PriorityInputs::from_subject(subject, weekly_progress_ratio);
    SubjectPriority {
        priority_score: compute_priority_score(&inputs, cfg),
        ..subject.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalAllocation {
    pub subject_id: u64,
    pub coefficient: f64,
    pub allocated_minutes: u32,
    pub allocated_hours: f64,
}

/// Splits a weekly budget across subjects in proportion to their
/// coefficients. Per-subject rounding drift is left as is, so the sum may
/// differ from `total_minutes` by a few minutes.
pub fn distribute_weekly_goals(total_minutes: u32, subjects: &[SubjectPriority]) -> Vec<GoalAllocation> {
    let total_coefficient: f64 = subjects.iter().map(|s| s.coefficient.max(0.0)).sum();

    subjects
        .iter()
        .map(|subject| {
            let allocated_minutes = if total_coefficient > 0.0 {
                (f64::from(total_minutes) * subject.coefficient.max(0.0) / total_coefficient).round()
                    as u32
            } else {
                0
            };
            GoalAllocation {
                subject_id: subject.subject_id,
                coefficient: subject.coefficient,
                allocated_minutes,
                allocated_hours: round_dp(f64::from(allocated_minutes) / 60.0, 1),
            }
        })
        .collect()
}

/// A distributed weekly budget and the subjects carrying their new goals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyGoalPlan {
    pub allocations: Vec<GoalAllocation>,
    pub subjects: Vec<SubjectPriority>,
}

/// Distributes `total_minutes`, writes each allocation back as the subject's
/// weekly goal and rescores it. Progress for the new week is unknown, so the
/// performance term takes its default.
pub fn apply_weekly_goals(total_minutes: u32, subjects: &[SubjectPriority], cfg: &PriorityConfig) -> WeeklyGoalPlan {
    let allocations = distribute_weekly_goals(total_minutes, subjects);
    let subjects = subjects
        .iter()
        .zip(&allocations)
        .map(|(subject, allocation)| {
            let goal_set = SubjectPriority {
                weekly_goal_minutes: allocation.allocated_minutes,
                ..subject.clone()
            };
            refresh_priority(&goal_set, None, cfg)
        })
        .collect();
    WeeklyGoalPlan { allocations, subjects }
}

/// Share of the weekly goal already studied, 0–100 with 1 decimal.
pub fn weekly_progress_percentage(studied_minutes: u32, goal_minutes: u32) -> f64 {
    if goal_minutes == 0 {
        return 0.0;
    }
    let pct = f64::from(studied_minutes) / f64::from(goal_minutes) * 100.0;
    round_dp(pct.min(PERCENT_MAX), 1)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttentionItem {
    pub subject_id: u64,
    pub subject_name: String,
    pub weekly_goal_minutes: u32,
    pub studied_minutes: u32,
    pub progress_percentage: f64,
}

/// Subjects with a weekly goal whose progress is below the attention threshold.
pub fn subjects_needing_attention(
    subjects: &[SubjectPriority],
    studied_by_subject: &HashMap<u64, u32>,
    cfg: &PriorityConfig,
) -> Vec<AttentionItem> {
    subjects
        .iter()
        .filter(|s| s.weekly_goal_minutes > 0)
        .filter_map(|s| {
            let studied = studied_by_subject.get(&s.subject_id).copied().unwrap_or(0);
            let pct = weekly_progress_percentage(studied, s.weekly_goal_minutes);
            (pct < cfg.attention_threshold_percent).then(|| AttentionItem {
                subject_id: s.subject_id,
                subject_name: s.subject_name.clone(),
                weekly_goal_minutes: s.weekly_goal_minutes,
                studied_minutes: studied,
                progress_percentage: pct,
            })
        })
        .collect()
}

/// What the planner knows about one subject when ordering the study plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannerSignals {
    pub coefficient: Option<f64>,
    /// Days until the next uncompleted exam; past exams count as none
    pub days_until_exam: Option<i64>,
    /// Learner-set difficulty on a 1–5 scale
    pub difficulty_rating: Option<u8>,
    /// Mean difficulty (0–10) of completed study sessions
    pub average_session_difficulty: Option<f64>,
    /// `None` when the subject was never studied
    pub days_since_last_study: Option<i64>,
    /// Mean exam score on the 0–20 scale
    pub average_exam_score: Option<f64>,
    pub last_year_average: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityBreakdown {
    pub coefficient_score: f64,
    pub exam_proximity_score: f64,
    pub difficulty_score: f64,
    pub inactivity_score: f64,
    pub performance_gap_score: f64,
    pub historical_gap_score: f64,
    pub total: f64,
}

pub fn coefficient_score(coefficient: Option<f64>) -> f64 {
    coefficient.unwrap_or(5.0).clamp(0.0, 10.0)
}

pub fn exam_proximity_score(days_until_exam: Option<i64>) -> f64 {
    match days_until_exam {
        None => 0.0,
        Some(d) if d < 0 => 0.0,
        Some(d) if d <= 7 => 10.0,
        Some(d) if d <= 14 => 8.0,
        Some(d) if d <= 30 => 6.0,
        Some(d) if d <= 60 => 4.0,
        Some(d) if d <= 90 => 2.0,
        Some(_) => 1.0,
    }
}

pub fn difficulty_score(rating: Option<u8>, average_session_difficulty: Option<f64>) -> f64 {
    if let Some(rating) = rating {
        return match rating {
            1 => 2.0,
            2 => 4.0,
            3 => 5.0,
            4 => 7.0,
            5 => 10.0,
            _ => 5.0,
        };
    }
    match average_session_difficulty {
        Some(avg) if avg.is_finite() => avg.clamp(0.0, 10.0),
        _ => 5.0,
    }
}

pub fn inactivity_score(days_since_last_study: Option<i64>) -> f64 {
    match days_since_last_study {
        None => 10.0,
        Some(d) if d <= 1 => 0.0,
        Some(d) if d <= 3 => 2.0,
        Some(d) if d <= 7 => 5.0,
        Some(d) if d <= 14 => 7.0,
        Some(d) if d <= 30 => 9.0,
        Some(_) => 10.0,
    }
}

/// A missing or zero average counts as no data.
pub fn performance_gap_score(average_exam_score: Option<f64>) -> f64 {
    match average_exam_score {
        None => 5.0,
        Some(avg) if avg == 0.0 || !avg.is_finite() => 5.0,
        Some(avg) if avg <= 8.0 => 10.0,
        Some(avg) if avg <= 11.0 => 8.0,
        Some(avg) if avg <= 14.0 => 6.0,
        Some(avg) if avg <= 16.0 => 4.0,
        Some(avg) if avg <= 18.0 => 2.0,
        Some(_) => 1.0,
    }
}

pub fn historical_gap_score(last_year_average: Option<f64>) -> f64 {
    match last_year_average {
        Some(avg) if avg.is_finite() => {
            let gap = (BAC_TARGET_AVERAGE - avg).max(0.0);
            (gap / BAC_TARGET_AVERAGE * 10.0).min(10.0)
        }
        _ => 0.0,
    }
}

/// Weighted sum of the six 0–10 planner scores.
pub fn planner_priority(signals: &PlannerSignals, weights: &PlannerWeights) -> PriorityBreakdown {
    let coefficient_score = coefficient_score(signals.coefficient);
    let exam_proximity_score = exam_proximity_score(signals.days_until_exam);
    let difficulty_score = difficulty_score(signals.difficulty_rating, signals.average_session_difficulty);
    let inactivity_score = inactivity_score(signals.days_since_last_study);
    let performance_gap_score = performance_gap_score(signals.average_exam_score);
    let historical_gap_score = historical_gap_score(signals.last_year_average);

    let total = coefficient_score * weights.coefficient
        + exam_proximity_score * weights.exam_proximity
        + difficulty_score * weights.difficulty
        + inactivity_score * weights.inactivity
        + performance_gap_score * weights.performance_gap
        + historical_gap_score * weights.historical_performance_gap;

    PriorityBreakdown {
        coefficient_score,
        exam_proximity_score,
        difficulty_score,
        inactivity_score,
        performance_gap_score,
        historical_gap_score,
        total: round_dp(total, 2),
    }
}
