use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Happy,
    Neutral,
    Sad,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyLevel {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl DifficultyLevel {
    pub const ALL: [DifficultyLevel; 3] = [Self::Easy, Self::Medium, Self::Hard];

    /// One step harder; `Hard` stays `Hard`.
    pub fn harder(self) -> Self {
        match self {
            Self::Easy => Self::Medium,
            Self::Medium | Self::Hard => Self::Hard,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

impl fmt::Display for DifficultyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a points total maps onto a level. Both variants exist in the
/// platform; the configured one is canonical for a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelFormula {
    /// `floor(points / 100) + 1`
    #[default]
    Linear,
    /// Explicit threshold table (0, 100, 300, 600, ... 4500)
    Threshold,
}

impl FromStr for LevelFormula {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" => Ok(Self::Linear),
            "threshold" | "table" => Ok(Self::Threshold),
            other => Err(format!("unknown level formula: {other}")),
        }
    }
}

/// Aggregated BAC performance of one user in one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceRecord {
    pub subject_id: u64,
    pub subject_name: String,
    /// 0–20 scale
    pub average_score: f64,
    #[serde(default)]
    pub best_score: Option<f64>,
    #[serde(default)]
    pub total_simulations: u32,
    #[serde(default)]
    pub weak_chapters: Vec<String>,
}

impl PerformanceRecord {
    pub fn new(subject_id: u64, subject_name: &str) -> Self {
        Self {
            subject_id,
            subject_name: subject_name.to_string(),
            average_score: 0.0,
            best_score: None,
            total_simulations: 0,
            weak_chapters: Vec::new(),
        }
    }
}

/// A past BAC paper that can be recommended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacCandidate {
    pub id: u64,
    pub subject_id: u64,
    pub subject_name: String,
    pub difficulty_rating: f64,
    pub year: i32,
    /// Chapter titles in paper order
    #[serde(default)]
    pub covered_chapters: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizCandidate {
    pub id: u64,
    pub subject_id: u64,
    pub difficulty: DifficultyLevel,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub total_attempts: u32,
    /// Mean score of all learners, percent
    #[serde(default)]
    pub average_score: f64,
    pub created_at: DateTime<Utc>,
    #[serde(default = "default_true")]
    pub is_published: bool,
    #[serde(default = "default_true")]
    pub is_free: bool,
}

fn default_true() -> bool {
    true
}

/// One completed quiz attempt or exam simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    pub item_id: u64,
    pub subject_id: u64,
    pub score_percentage: f64,
    pub completed_at: DateTime<Utc>,
}

/// Weak concept tag with the error rate that flagged it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeakConcept {
    pub tag: String,
    pub error_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreInputs {
    pub duration_minutes: u32,
    pub mood: Option<Mood>,
    pub consecutive_study_days: u32,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub actual_start_at: Option<DateTime<Utc>>,
}

/// Per-user settings of one subject plus its derived priority score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectPriority {
    pub subject_id: u64,
    #[serde(default)]
    pub subject_name: String,
    pub coefficient: f64,
    #[serde(default)]
    pub difficulty_level: DifficultyLevel,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub weekly_goal_minutes: u32,
    #[serde(default)]
    pub priority_score: f64,
}

impl SubjectPriority {
    pub fn new(subject_id: u64, subject_name: &str, coefficient: f64) -> Self {
        Self {
            subject_id,
            subject_name: subject_name.to_string(),
            coefficient,
            difficulty_level: DifficultyLevel::Medium,
            is_favorite: false,
            weekly_goal_minutes: 0,
            priority_score: 0.0,
        }
    }
}
