use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};

use memo_scoring::scoring::filter::{AttemptWindow, CatalogFilter};
use memo_scoring::scoring::leaderboard::CohortMember;
use memo_scoring::scoring::types::{
    AttemptRecord, BacCandidate, PerformanceRecord, QuizCandidate, SubjectPriority, WeakConcept,
};
use memo_scoring::sources::{Cohort, LearnerDataSource, SourceError};

/// Learner data held in plain collections. Counts performance lookups so
/// tests can observe caching.
#[derive(Default)]
pub struct InMemorySource {
    pub performance: HashMap<u64, Vec<PerformanceRecord>>,
    pub bac_attempts: HashMap<u64, Vec<AttemptRecord>>,
    pub quiz_attempts: HashMap<u64, Vec<AttemptRecord>>,
    pub bac_catalog: Vec<BacCandidate>,
    pub quiz_catalog: Vec<QuizCandidate>,
    pub weak_concepts: HashMap<u64, Vec<WeakConcept>>,
    pub priorities: HashMap<u64, Vec<SubjectPriority>>,
    pub selected_subjects: HashMap<u64, Vec<u64>>,
    pub members: Vec<CohortMember>,
    /// (stream, year) -> user ids
    pub streams: HashMap<(u64, u64), Vec<u64>>,
    pub performance_reads: AtomicUsize,
}

fn in_window(attempts: &[AttemptRecord], window: AttemptWindow, now: DateTime<Utc>) -> Vec<AttemptRecord> {
    attempts
        .iter()
        .filter(|a| window.contains(a.completed_at, now))
        .cloned()
        .collect()
}

impl InMemorySource {
    pub fn performance_reads(&self) -> usize {
        self.performance_reads.load(Ordering::SeqCst)
    }
}

impl LearnerDataSource for InMemorySource {
    fn performance_records(&self, user_id: u64) -> Result<Vec<PerformanceRecord>, SourceError> {
        self.performance_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.performance.get(&user_id).cloned().unwrap_or_default())
    }

    fn bac_attempts(
        &self,
        user_id: u64,
        window: AttemptWindow,
        now: DateTime<Utc>,
    ) -> Result<Vec<AttemptRecord>, SourceError> {
        let attempts = self.bac_attempts.get(&user_id).map(Vec::as_slice).unwrap_or_default();
        Ok(in_window(attempts, window, now))
    }

    fn quiz_attempts(
        &self,
        user_id: u64,
        window: AttemptWindow,
        now: DateTime<Utc>,
    ) -> Result<Vec<AttemptRecord>, SourceError> {
        let attempts = self.quiz_attempts.get(&user_id).map(Vec::as_slice).unwrap_or_default();
        Ok(in_window(attempts, window, now))
    }

    fn bac_catalog(&self, filter: &CatalogFilter) -> Result<Vec<BacCandidate>, SourceError> {
        Ok(filter.apply_bac(&self.bac_catalog))
    }

    fn quiz_catalog(&self, filter: &CatalogFilter) -> Result<Vec<QuizCandidate>, SourceError> {
        Ok(filter.apply_quizzes(&self.quiz_catalog))
    }

    fn weak_concepts(&self, user_id: u64) -> Result<Vec<WeakConcept>, SourceError> {
        Ok(self.weak_concepts.get(&user_id).cloned().unwrap_or_default())
    }

    fn subject_priorities(&self, user_id: u64) -> Result<Vec<SubjectPriority>, SourceError> {
        Ok(self.priorities.get(&user_id).cloned().unwrap_or_default())
    }

    fn selected_subject_ids(&self, user_id: u64) -> Result<Vec<u64>, SourceError> {
        Ok(self.selected_subjects.get(&user_id).cloned().unwrap_or_default())
    }

    fn cohort_members(
        &self,
        cohort: Cohort,
        window: AttemptWindow,
        now: DateTime<Utc>,
    ) -> Result<Vec<CohortMember>, SourceError> {
        let members = match cohort {
            Cohort::Stream { stream_id, year_id } => {
                let ids = self.streams.get(&(stream_id, year_id)).cloned().unwrap_or_default();
                self.members
                    .iter()
                    .filter(|m| ids.contains(&m.user_id))
                    .map(|m| CohortMember {
                        attempts: in_window(&m.attempts, window, now),
                        ..m.clone()
                    })
                    .collect()
            }
            Cohort::Subject { subject_id } => self
                .members
                .iter()
                .map(|m| {
                    let attempts: Vec<AttemptRecord> = in_window(&m.attempts, window, now)
                        .into_iter()
                        .filter(|a| a.subject_id == subject_id)
                        .collect();
                    CohortMember { attempts, ..m.clone() }
                })
                .filter(|m| !m.attempts.is_empty())
                .collect(),
        };
        Ok(members)
    }

    fn member(&self, user_id: u64) -> Result<CohortMember, SourceError> {
        self.members
            .iter()
            .find(|m| m.user_id == user_id)
            .cloned()
            .ok_or_else(|| SourceError::NotFound {
                entity: "user".to_string(),
                key: user_id.to_string(),
            })
    }
}

/// Every call fails as if the backing store were down.
pub struct UnavailableSource;

fn down<T>() -> Result<T, SourceError> {
    Err(SourceError::Unavailable("store offline".to_string()))
}

impl LearnerDataSource for UnavailableSource {
    fn performance_records(&self, _user_id: u64) -> Result<Vec<PerformanceRecord>, SourceError> {
        down()
    }

    fn bac_attempts(&self, _: u64, _: AttemptWindow, _: DateTime<Utc>) -> Result<Vec<AttemptRecord>, SourceError> {
        down()
    }

    fn quiz_attempts(&self, _: u64, _: AttemptWindow, _: DateTime<Utc>) -> Result<Vec<AttemptRecord>, SourceError> {
        down()
    }

    fn bac_catalog(&self, _filter: &CatalogFilter) -> Result<Vec<BacCandidate>, SourceError> {
        down()
    }

    fn quiz_catalog(&self, _filter: &CatalogFilter) -> Result<Vec<QuizCandidate>, SourceError> {
        down()
    }

    fn weak_concepts(&self, _user_id: u64) -> Result<Vec<WeakConcept>, SourceError> {
        down()
    }

    fn subject_priorities(&self, _user_id: u64) -> Result<Vec<SubjectPriority>, SourceError> {
        down()
    }

    fn selected_subject_ids(&self, _user_id: u64) -> Result<Vec<u64>, SourceError> {
        down()
    }

    fn cohort_members(&self, _: Cohort, _: AttemptWindow, _: DateTime<Utc>) -> Result<Vec<CohortMember>, SourceError> {
        down()
    }

    fn member(&self, _user_id: u64) -> Result<CohortMember, SourceError> {
        down()
    }
}
