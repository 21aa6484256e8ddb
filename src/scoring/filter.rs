//! Typed catalog and attempt-history predicates.
//!
//! Filters are built up front and handed to a data source (or applied to an
//! in-memory catalog) instead of composing query fragments at call sites.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::scoring::types::{AttemptRecord, BacCandidate, DifficultyLevel, QuizCandidate};

/// A trailing time window over attempt history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "days")]
pub enum AttemptWindow {
    #[default]
    All,
    LastDays(i64),
}

impl AttemptWindow {
    /// Earliest instant inside the window, `None` when unbounded.
    pub fn since(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::All => None,
            Self::LastDays(days) => Some(now - Duration::days(*days)),
        }
    }

    pub fn contains(&self, at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.since(now).map_or(true, |since| at >= since)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaderboardPeriod {
    #[default]
    All,
    Week,
    Month,
}

impl LeaderboardPeriod {
    pub fn window(self) -> AttemptWindow {
        match self {
            Self::All => AttemptWindow::All,
            Self::Week => AttemptWindow::LastDays(7),
            Self::Month => AttemptWindow::LastDays(30),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Week => "week",
            Self::Month => "month",
        }
    }
}

impl fmt::Display for LeaderboardPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeaderboardPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            other => Err(format!("unknown leaderboard period: {other}")),
        }
    }
}

/// Ids of items attempted inside `window`.
pub fn attempted_item_ids(attempts: &[AttemptRecord], window: AttemptWindow, now: DateTime<Utc>) -> HashSet<u64> {
    attempts
        .iter()
        .filter(|a| window.contains(a.completed_at, now))
        .map(|a| a.item_id)
        .collect()
}

/// Conjunction of catalog predicates. Empty lists match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogFilter {
    #[serde(default)]
    pub subject_ids: Vec<u64>,
    #[serde(default)]
    pub difficulties: Vec<DifficultyLevel>,
    /// Quiz must carry at least one of these tags
    #[serde(default)]
    pub any_tags: Vec<String>,
    #[serde(default)]
    pub exclude_ids: HashSet<u64>,
    #[serde(default)]
    pub published_only: bool,
    #[serde(default)]
    pub free_only: bool,
    /// Strictly more attempts than this
    #[serde(default)]
    pub min_total_attempts: Option<u32>,
    #[serde(default)]
    pub min_average_score: Option<f64>,
    #[serde(default)]
    pub created_since: Option<DateTime<Utc>>,
}

impl CatalogFilter {
    /// Published, free quizzes: the base of every learner-facing quiz query.
    pub fn quizzes() -> Self {
        Self {
            published_only: true,
            free_only: true,
            ..Self::default()
        }
    }

    pub fn in_subjects(mut self, ids: impl IntoIterator<Item = u64>) -> Self {
        self.subject_ids.extend(ids);
        self
    }

    pub fn with_difficulties(mut self, levels: &[DifficultyLevel]) -> Self {
        self.difficulties.extend_from_slice(levels);
        self
    }

    pub fn with_any_tag(mut self, tags: impl IntoIterator<Item = String>) -> Self {
        self.any_tags.extend(tags);
        self
    }

    pub fn excluding(mut self, ids: impl IntoIterator<Item = u64>) -> Self {
        self.exclude_ids.extend(ids);
        self
    }

    pub fn attempted_more_than(mut self, attempts: u32) -> Self {
        self.min_total_attempts = Some(attempts);
        self
    }

    pub fn average_at_least(mut self, score: f64) -> Self {
        self.min_average_score = Some(score);
        self
    }

    pub fn created_since(mut self, since: DateTime<Utc>) -> Self {
        self.created_since = Some(since);
        self
    }

    pub fn matches_quiz(&self, quiz: &QuizCandidate) -> bool {
        if self.exclude_ids.contains(&quiz.id) {
            return false;
        }
        if self.published_only && !quiz.is_published {
            return false;
        }
        if self.free_only && !quiz.is_free {
            return false;
        }
        if !self.subject_ids.is_empty() && !self.subject_ids.contains(&quiz.subject_id) {
            return false;
        }
        if !self.difficulties.is_empty() && !self.difficulties.contains(&quiz.difficulty) {
            return false;
        }
        if !self.any_tags.is_empty() && !quiz.tags.iter().any(|t| self.any_tags.contains(t)) {
            return false;
        }
        if let Some(min) = self.min_total_attempts {
            if quiz.total_attempts <= min {
                return false;
            }
        }
        if let Some(min) = self.min_average_score {
            if quiz.average_score < min {
                return false;
            }
        }
        if let Some(since) = self.created_since {
            if quiz.created_at < since {
                return false;
            }
        }
        true
    }

    /// BAC papers only carry a subject and an id.
    pub fn matches_bac(&self, paper: &BacCandidate) -> bool {
        if self.exclude_ids.contains(&paper.id) {
            return false;
        }
        self.subject_ids.is_empty() || self.subject_ids.contains(&paper.subject_id)
    }

    pub fn apply_quizzes(&self, catalog: &[QuizCandidate]) -> Vec<QuizCandidate> {
        catalog.iter().filter(|q| self.matches_quiz(q)).cloned().collect()
    }

    pub fn apply_bac(&self, catalog: &[BacCandidate]) -> Vec<BacCandidate> {
        catalog.iter().filter(|p| self.matches_bac(p)).cloned().collect()
    }
}
