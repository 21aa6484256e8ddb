mod common;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, NaiveDate};

use common::fixtures::{cache_on, now, subject};
use common::source::InMemorySource;
use memo_scoring::scoring::config::ScoringConfig;
use memo_scoring::scoring::engine::ScoringEngine;
use memo_scoring::scoring::points::{PenaltyKind, SessionOutcome, SessionStatus};
use memo_scoring::scoring::types::{LevelFormula, Mood, ScoreInputs};
use memo_scoring::ScoringError;

fn engine() -> ScoringEngine<InMemorySource> {
    let mut source = InMemorySource::default();
    source
        .priorities
        .insert(1, vec![subject(10, "maths", 4.0, 0.0), subject(20, "philosophy", 2.0, 0.0)]);
    ScoringEngine::new(ScoringConfig::default(), Arc::new(source), &cache_on()).expect("valid config")
}

#[test]
fn it_best_case_session_hits_the_ceiling() {
    let engine = engine();
    let inputs = ScoreInputs {
        duration_minutes: 50,
        mood: Some(Mood::Happy),
        consecutive_study_days: 4,
        scheduled_at: Some(now()),
        actual_start_at: Some(now() + Duration::minutes(3)),
    };
    assert_eq!(engine.session_points(&inputs), 25);
}

#[test]
fn it_award_reports_level_up() {
    let engine = engine();
    let inputs = ScoreInputs {
        duration_minutes: 20,
        ..ScoreInputs::default()
    };
    let status = engine.award_session(1, 95, &inputs);
    assert_eq!(status.total_points, 105);
    assert_eq!(status.level, 2);
    assert!(status.leveled_up);
    assert_eq!(status.points_to_next_level, 95);
    assert_eq!(status.progress_percentage, 5);

    let penalty = engine.penalize(1, 3, PenaltyKind::Skip);
    assert_eq!(penalty.new_total, 0);
    assert_eq!(penalty.applied, 3);
}

#[test]
fn it_reload_switches_level_formula() {
    let engine = engine();
    assert_eq!(engine.level_status(350).level, 4);

    let mut cfg = ScoringConfig::default();
    cfg.points.level_formula = LevelFormula::Threshold;
    engine.reload_config(cfg).expect("reload");

    let status = engine.level_status(350);
    assert_eq!(status.level, 3);
    assert_eq!(status.points_to_next_level, 250);
    assert_eq!(status.progress_percentage, 16);
}

#[test]
fn it_invalid_reload_keeps_previous_config() {
    let engine = engine();
    let mut broken = ScoringConfig::default();
    broken.points.max_session_points = 0;

    let err = engine.reload_config(broken).unwrap_err();
    assert!(matches!(err, ScoringError::InvalidConfig(_)));
    assert_eq!(engine.get_config().points.max_session_points, 25);
}

#[test]
fn it_streak_stops_at_first_gap() {
    let engine = engine();
    let today = NaiveDate::from_ymd_opt(2026, 5, 20).unwrap();
    let days = vec![
        today,
        today - Duration::days(1),
        today - Duration::days(2),
        today - Duration::days(4),
    ];
    assert_eq!(engine.current_streak(&days, today), 3);
    assert_eq!(engine.current_streak(&days[1..], today), 0);
}

#[test]
fn it_summary_defaults_to_thirty_days() {
    let engine = engine();
    let outcomes = vec![
        SessionOutcome {
            status: SessionStatus::Completed { points_earned: 20 },
            at: now() - Duration::days(2),
        },
        SessionOutcome {
            status: SessionStatus::Completed { points_earned: 10 },
            at: now() - Duration::days(40),
        },
        SessionOutcome {
            status: SessionStatus::Skipped,
            at: now() - Duration::days(1),
        },
        SessionOutcome {
            status: SessionStatus::Missed,
            at: now() - Duration::days(3),
        },
    ];

    let summary = engine.points_summary(&outcomes, None, now());
    assert_eq!(summary.period_days, 30);
    assert_eq!(summary.total_earned, 20);
    assert_eq!(summary.total_penalties, 7);
    assert_eq!(summary.net_points, 13);
    assert_eq!(summary.completed_sessions, 1);
    assert_eq!(summary.average_points_per_session, 20.0);

    let wide = engine.points_summary(&outcomes, Some(60), now());
    assert_eq!(wide.total_earned, 30);
    assert_eq!(wide.average_points_per_session, 15.0);
}

#[test]
fn it_weekly_goal_plan_splits_by_coefficient() {
    let engine = engine();
    let plan = engine.weekly_goal_plan(1, 600).expect("plan");
    let minutes: Vec<(u64, u32)> = plan
        .allocations
        .iter()
        .map(|g| (g.subject_id, g.allocated_minutes))
        .collect();
    assert_eq!(minutes, vec![(10, 400), (20, 200)]);
    assert_eq!(plan.allocations[0].allocated_hours, 6.7);
    assert_eq!(plan.allocations[1].allocated_hours, 3.3);

    let err = engine.weekly_goal_plan(1, 3001).unwrap_err();
    assert!(matches!(err, ScoringError::InvalidInput { .. }));
    let empty = engine.weekly_goal_plan(99, 600).expect("no subjects");
    assert!(empty.allocations.is_empty());
    assert!(empty.subjects.is_empty());
}

#[test]
fn it_weekly_goal_plan_rescores_subjects_against_new_goals() {
    let engine = engine();
    let plan = engine.weekly_goal_plan(1, 600).expect("plan");

    let goals: Vec<(u64, u32)> = plan
        .subjects
        .iter()
        .map(|s| (s.subject_id, s.weekly_goal_minutes))
        .collect();
    assert_eq!(goals, vec![(10, 400), (20, 200)]);
    // 1.2 + 2.0 + 400/420 * 2 + 1.0
    assert_eq!(plan.subjects[0].priority_score, 6.1);
    // 0.6 + 2.0 + 200/420 * 2 + 1.0
    assert_eq!(plan.subjects[1].priority_score, 4.55);
    assert_eq!(plan.subjects[1].subject_name, "philosophy");
}

#[test]
fn it_refresh_priorities_uses_weekly_progress() {
    let engine = engine();
    let studied = HashMap::from([(10_u64, 150_u32)]);
    let refreshed = engine.refresh_priorities(1, &studied).expect("refresh");

    assert_eq!(refreshed[0].subject_id, 10);
    assert_eq!(refreshed[0].priority_score, 5.63);
    assert_eq!(refreshed[1].priority_score, 6.03);
}
