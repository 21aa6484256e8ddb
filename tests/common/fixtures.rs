use chrono::{DateTime, Duration, TimeZone, Utc};

use memo_scoring::config::CacheConfig;
use memo_scoring::scoring::leaderboard::CohortMember;
use memo_scoring::scoring::types::{
    AttemptRecord, BacCandidate, DifficultyLevel, PerformanceRecord, QuizCandidate, SubjectPriority,
};

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 20, 9, 0, 0).unwrap()
}

pub fn cache_on() -> CacheConfig {
    CacheConfig {
        enabled: true,
        capacity: 64,
    }
}

pub fn performance(subject_id: u64, name: &str, average: f64, weak_chapters: &[&str]) -> PerformanceRecord {
    PerformanceRecord {
        average_score: average,
        best_score: Some(average),
        total_simulations: 3,
        weak_chapters: weak_chapters.iter().map(|c| c.to_string()).collect(),
        ..PerformanceRecord::new(subject_id, name)
    }
}

pub fn paper(id: u64, subject_id: u64, name: &str, difficulty: f64, year: i32, chapters: &[&str]) -> BacCandidate {
    BacCandidate {
        id,
        subject_id,
        subject_name: name.to_string(),
        difficulty_rating: difficulty,
        year,
        covered_chapters: chapters.iter().map(|c| c.to_string()).collect(),
    }
}

pub fn quiz(id: u64, subject_id: u64, difficulty: DifficultyLevel) -> QuizCandidate {
    QuizCandidate {
        id,
        subject_id,
        difficulty,
        tags: Vec::new(),
        total_attempts: 0,
        average_score: 0.0,
        created_at: now() - Duration::days(120),
        is_published: true,
        is_free: true,
    }
}

pub fn tagged_quiz(id: u64, subject_id: u64, tags: &[&str]) -> QuizCandidate {
    QuizCandidate {
        tags: tags.iter().map(|t| t.to_string()).collect(),
        ..quiz(id, subject_id, DifficultyLevel::Medium)
    }
}

pub fn attempt(item_id: u64, subject_id: u64, score: f64, days_ago: i64) -> AttemptRecord {
    AttemptRecord {
        item_id,
        subject_id,
        score_percentage: score,
        completed_at: now() - Duration::days(days_ago),
    }
}

pub fn subject(subject_id: u64, name: &str, coefficient: f64, priority_score: f64) -> SubjectPriority {
    SubjectPriority {
        priority_score,
        weekly_goal_minutes: 300,
        ..SubjectPriority::new(subject_id, name, coefficient)
    }
}

/// A member whose attempts all land on `subject_id`, one per score, `days_ago` each.
pub fn member(user_id: u64, name: Option<&str>, subject_id: u64, scores: &[(f64, i64)]) -> CohortMember {
    CohortMember {
        user_id,
        name: name.map(str::to_string),
        avatar: None,
        total_points: 50 * user_id as u32,
        attempts: scores
            .iter()
            .enumerate()
            .map(|(idx, (score, days_ago))| attempt(1000 + idx as u64, subject_id, *score, *days_ago))
            .collect(),
    }
}
