//! Collaborators that hold learner data. Implementations live with the
//! persistence layer; the scoring engine only sees materialized lists.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::scoring::filter::{AttemptWindow, CatalogFilter};
use crate::scoring::leaderboard::CohortMember;
use crate::scoring::types::{
    AttemptRecord, BacCandidate, PerformanceRecord, QuizCandidate, SubjectPriority, WeakConcept,
};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("data source unavailable: {0}")]
    Unavailable(String),
    #[error("not found: entity={entity}, key={key}")]
    NotFound { entity: String, key: String },
    #[error("malformed record: entity={entity}, {message}")]
    Malformed { entity: String, message: String },
}

/// Which learners a leaderboard is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cohort {
    /// Learners of one academic stream and year
    Stream { stream_id: u64, year_id: u64 },
    /// Learners with attempts on one subject's quizzes
    Subject { subject_id: u64 },
}

pub trait LearnerDataSource: Send + Sync {
    fn performance_records(&self, user_id: u64) -> Result<Vec<PerformanceRecord>, SourceError>;

    /// BAC simulations the learner started inside `window`.
    fn bac_attempts(
        &self,
        user_id: u64,
        window: AttemptWindow,
        now: DateTime<Utc>,
    ) -> Result<Vec<AttemptRecord>, SourceError>;

    /// Completed quiz attempts inside `window`.
    fn quiz_attempts(
        &self,
        user_id: u64,
        window: AttemptWindow,
        now: DateTime<Utc>,
    ) -> Result<Vec<AttemptRecord>, SourceError>;

    fn bac_catalog(&self, filter: &CatalogFilter) -> Result<Vec<BacCandidate>, SourceError>;

    fn quiz_catalog(&self, filter: &CatalogFilter) -> Result<Vec<QuizCandidate>, SourceError>;

    fn weak_concepts(&self, user_id: u64) -> Result<Vec<WeakConcept>, SourceError>;

    fn subject_priorities(&self, user_id: u64) -> Result<Vec<SubjectPriority>, SourceError>;

    fn selected_subject_ids(&self, user_id: u64) -> Result<Vec<u64>, SourceError>;

    /// Cohort members with their completed attempts in `window`, already
    /// restricted to the cohort's subject when there is one.
    fn cohort_members(
        &self,
        cohort: Cohort,
        window: AttemptWindow,
        now: DateTime<Utc>,
    ) -> Result<Vec<CohortMember>, SourceError>;

    /// The learner with their full completed quiz history.
    fn member(&self, user_id: u64) -> Result<CohortMember, SourceError>;
}
