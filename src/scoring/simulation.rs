//! Timed BAC exam simulations as plain records plus transition functions.
//! Persisting the returned records is the caller's job.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{BAC_SCALE_MAX, PERCENT_MAX, WEAK_CHAPTER_SCORE};
use crate::error::ScoringError;
use crate::scoring::round_dp;
use crate::scoring::types::PerformanceRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulationStatus {
    Started,
    Completed,
    Abandoned,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationRecord {
    pub id: u64,
    pub user_id: u64,
    pub bac_subject_id: u64,
    pub started_at: DateTime<Utc>,
    pub time_limit_secs: i64,
    pub status: SimulationStatus,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_secs: i64,
    /// 0–20 scale
    #[serde(default)]
    pub user_score: Option<f64>,
}

pub fn new_simulation(
    id: u64,
    user_id: u64,
    bac_subject_id: u64,
    duration_minutes: u32,
    now: DateTime<Utc>,
) -> SimulationRecord {
    SimulationRecord {
        id,
        user_id,
        bac_subject_id,
        started_at: now,
        time_limit_secs: i64::from(duration_minutes) * 60,
        status: SimulationStatus::Started,
        submitted_at: None,
        duration_secs: 0,
        user_score: None,
    }
}

fn elapsed_secs(sim: &SimulationRecord, now: DateTime<Utc>) -> i64 {
    (now - sim.started_at).num_seconds().max(0)
}

/// Seconds left on the clock; 0 once finished or out of time.
pub fn remaining_time_secs(sim: &SimulationRecord, now: DateTime<Utc>) -> i64 {
    if sim.status != SimulationStatus::Started {
        return 0;
    }
    (sim.time_limit_secs - elapsed_secs(sim, now)).max(0)
}

pub fn has_expired(sim: &SimulationRecord, now: DateTime<Utc>) -> bool {
    remaining_time_secs(sim, now) == 0
}

#[derive(Debug, Clone, PartialEq)]
pub enum StartDecision {
    /// No simulation in progress
    Fresh,
    /// The running simulation ran out of time; persist this abandoned copy
    /// before starting the new one
    AbandonExpired(SimulationRecord),
}

/// Decides whether a learner may start a new simulation given the one they
/// have in progress, if any.
pub fn check_can_start(active: Option<&SimulationRecord>, now: DateTime<Utc>) -> Result<StartDecision, ScoringError> {
    match active {
        None => Ok(StartDecision::Fresh),
        Some(sim) if sim.status != SimulationStatus::Started => Ok(StartDecision::Fresh),
        Some(sim) if has_expired(sim, now) => Ok(StartDecision::AbandonExpired(abandon_simulation(sim, now))),
        Some(sim) => Err(ScoringError::ActiveSimulation {
            user_id: sim.user_id,
            simulation_id: sim.id,
        }),
    }
}

pub fn abandon_simulation(sim: &SimulationRecord, now: DateTime<Utc>) -> SimulationRecord {
    SimulationRecord {
        status: SimulationStatus::Abandoned,
        duration_secs: elapsed_secs(sim, now),
        ..sim.clone()
    }
}

/// Records the learner's score. Fails when the simulation is no longer in
/// progress or its time is up; an expired simulation should be abandoned.
pub fn complete_simulation(
    sim: &SimulationRecord,
    score: f64,
    now: DateTime<Utc>,
) -> Result<SimulationRecord, ScoringError> {
    if sim.status != SimulationStatus::Started {
        return Err(ScoringError::SimulationNotActive { simulation_id: sim.id });
    }
    if has_expired(sim, now) {
        return Err(ScoringError::SimulationExpired { simulation_id: sim.id });
    }
    if !score.is_finite() || !(0.0..=BAC_SCALE_MAX).contains(&score) {
        return Err(ScoringError::invalid_input("score", "must be within 0..=20"));
    }
    Ok(SimulationRecord {
        status: SimulationStatus::Completed,
        submitted_at: Some(now),
        duration_secs: elapsed_secs(sim, now),
        user_score: Some(score),
        ..sim.clone()
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GradeBand {
    Excellent,
    VeryGood,
    Good,
    Average,
    Weak,
}

impl fmt::Display for GradeBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Excellent => "excellent",
            Self::VeryGood => "very good",
            Self::Good => "good",
            Self::Average => "average",
            Self::Weak => "weak",
        })
    }
}

pub fn grade_band(score: f64) -> GradeBand {
    match score {
        s if s >= 16.0 => GradeBand::Excellent,
        s if s >= 14.0 => GradeBand::VeryGood,
        s if s >= 12.0 => GradeBand::Good,
        s if s >= 10.0 => GradeBand::Average,
        _ => GradeBand::Weak,
    }
}

/// `score / total_points` as a percentage with 2 decimals.
pub fn score_percentage(score: f64, total_points: f64) -> f64 {
    if total_points <= 0.0 {
        return 0.0;
    }
    round_dp((score / total_points * 100.0).clamp(0.0, PERCENT_MAX), 2)
}

/// Folds one finished simulation into the learner's subject record.
/// `chapter_scores` are percentages per chapter; chapters under 50 become
/// the new weak-chapter list.
pub fn update_performance(record: &PerformanceRecord, score: f64, chapter_scores: &[(String, f64)]) -> PerformanceRecord {
    let total_simulations = record.total_simulations + 1;
    let previous_total = record.average_score * f64::from(record.total_simulations);
    let best_score = match record.best_score {
        Some(best) if best >= score => Some(best),
        _ => Some(score),
    };

    PerformanceRecord {
        average_score: (previous_total + score) / f64::from(total_simulations),
        best_score,
        total_simulations,
        weak_chapters: chapter_scores
            .iter()
            .filter(|(_, pct)| *pct < WEAK_CHAPTER_SCORE)
            .map(|(chapter, _)| chapter.clone())
            .collect(),
        ..record.clone()
    }
}
