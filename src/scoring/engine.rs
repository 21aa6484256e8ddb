use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;

use crate::cache::{CacheDomain, CacheKey, TypedCache};
use crate::config::CacheConfig;
use crate::constants::{
    DEFAULT_ADAPTIVE_LIMIT, DEFAULT_EXAM_PREP_LIMIT, DEFAULT_SUMMARY_PERIOD_DAYS, EXAM_PREP_RECENT_WINDOW_DAYS,
    MAX_WEEKLY_GOAL_MINUTES, STREAK_LOOKBACK_DAYS,
};
use crate::error::ScoringError;
use crate::scoring::config::ScoringConfig;
use crate::scoring::filter::{attempted_item_ids, AttemptWindow, CatalogFilter, LeaderboardPeriod};
use crate::scoring::leaderboard::{self, Leaderboard, LeaderboardKind, LeaderboardRequest};
use crate::scoring::points::{self, LevelStatus, PenaltyKind, PenaltyOutcome, PointsSummary, SessionOutcome};
use crate::scoring::priority::{self, WeeklyGoalPlan};
use crate::scoring::recommendation::{self, AdaptiveTier, BacRecommendation, QuizContext, QuizRecommendation};
use crate::scoring::simulation::{self, SimulationRecord};
use crate::scoring::types::{
    AttemptRecord, BacCandidate, PerformanceRecord, QuizCandidate, ScoreInputs, SubjectPriority,
};
use crate::sources::{Cohort, LearnerDataSource};

/// Result of folding a submitted simulation into the learner's record.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    pub simulation: SimulationRecord,
    pub performance: PerformanceRecord,
    pub percentage: f64,
    pub grade: simulation::GradeBand,
}

/// Runs the scoring functions against a learner data source. The
/// configuration can be swapped at runtime with [`ScoringEngine::reload_config`].
pub struct ScoringEngine<S> {
    config: Arc<RwLock<ScoringConfig>>,
    source: Arc<S>,
    performance_cache: TypedCache<Vec<PerformanceRecord>>,
}

impl<S: LearnerDataSource> ScoringEngine<S> {
    pub fn new(config: ScoringConfig, source: Arc<S>, cache: &CacheConfig) -> Result<Self, ScoringError> {
        config.validate().map_err(ScoringError::InvalidConfig)?;
        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            source,
            performance_cache: TypedCache::from_config(cache),
        })
    }

    pub fn reload_config(&self, new_config: ScoringConfig) -> Result<(), ScoringError> {
        new_config.validate().map_err(ScoringError::InvalidConfig)?;
        let mut cfg = self.config.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *cfg = new_config;
        tracing::info!("Scoring config reloaded");
        Ok(())
    }

    pub fn get_config(&self) -> ScoringConfig {
        self.config
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    pub fn session_points(&self, inputs: &ScoreInputs) -> u32 {
        points::calculate_session_points(inputs, &self.get_config().points)
    }

    /// Scores a finished session and adds it to `current_total`.
    pub fn award_session(&self, user_id: u64, current_total: u32, inputs: &ScoreInputs) -> LevelStatus {
        let cfg = self.get_config().points;
        let earned = points::calculate_session_points(inputs, &cfg);
        let status = points::award_points(current_total, earned, cfg.level_formula);
        tracing::debug!(
            user_id,
            earned,
            total = status.total_points,
            level = status.level,
            "Session points awarded"
        );
        if status.leveled_up {
            tracing::info!(user_id, level = status.level, "Learner leveled up");
        }
        status
    }

    pub fn level_status(&self, total_points: u32) -> LevelStatus {
        points::level_status(total_points, self.get_config().points.level_formula)
    }

    pub fn penalize(&self, user_id: u64, current_total: u32, kind: PenaltyKind) -> PenaltyOutcome {
        let magnitude = self.get_config().points.penalty_for(kind);
        let outcome = points::apply_penalty(current_total, magnitude);
        tracing::debug!(
            user_id,
            ?kind,
            requested = magnitude,
            applied = outcome.applied,
            "Session penalty applied"
        );
        outcome
    }

    /// Consecutive study days ending today, as used for the streak bonus.
    pub fn current_streak(&self, completed_days: &[NaiveDate], today: NaiveDate) -> u32 {
        points::consecutive_days_streak(completed_days, today, STREAK_LOOKBACK_DAYS)
    }

    pub fn points_summary(
        &self,
        outcomes: &[SessionOutcome],
        period_days: Option<u32>,
        now: DateTime<Utc>,
    ) -> PointsSummary {
        let cfg = self.get_config().points;
        points::points_summary(outcomes, period_days.unwrap_or(DEFAULT_SUMMARY_PERIOD_DAYS), now, &cfg)
    }

    /// Splits the weekly budget by coefficient and rescores each subject
    /// against its new goal. Persisting the returned subjects is up to the
    /// caller.
    pub fn weekly_goal_plan(&self, user_id: u64, total_minutes: u32) -> Result<WeeklyGoalPlan, ScoringError> {
        if total_minutes > MAX_WEEKLY_GOAL_MINUTES {
            return Err(ScoringError::invalid_input(
                "total_minutes",
                &format!("must be <= {MAX_WEEKLY_GOAL_MINUTES}"),
            ));
        }
        let cfg = self.get_config().priority;
        let subjects = self.source.subject_priorities(user_id)?;
        let plan = priority::apply_weekly_goals(total_minutes, &subjects, &cfg);
        tracing::debug!(user_id, total_minutes, subjects = plan.subjects.len(), "Weekly goals distributed");
        Ok(plan)
    }

    pub fn performance_records(&self, user_id: u64, now: DateTime<Utc>) -> Result<Vec<PerformanceRecord>, ScoringError> {
        let records = self
            .performance_cache
            .get_or_try_insert_with(CacheKey::UserBacPerformance(user_id), now, || {
                self.source.performance_records(user_id)
            })?;
        Ok(records)
    }

    /// Recomputes every subject priority of a learner from this week's
    /// studied minutes.
    pub fn refresh_priorities(
        &self,
        user_id: u64,
        studied_by_subject: &HashMap<u64, u32>,
    ) -> Result<Vec<SubjectPriority>, ScoringError> {
        let cfg = self.get_config().priority;
        let subjects = self.source.subject_priorities(user_id)?;
        let refreshed: Vec<SubjectPriority> = subjects
            .iter()
            .map(|subject| {
                let ratio = (subject.weekly_goal_minutes > 0).then(|| {
                    let studied = studied_by_subject.get(&subject.subject_id).copied().unwrap_or(0);
                    f64::from(studied) / f64::from(subject.weekly_goal_minutes)
                });
                priority::refresh_priority(subject, ratio, &cfg)
            })
            .collect();
        tracing::debug!(user_id, subjects = refreshed.len(), "Subject priorities refreshed");
        Ok(refreshed)
    }

    pub fn recommend_bac(
        &self,
        user_id: u64,
        limit: Option<usize>,
        now: DateTime<Utc>,
    ) -> Result<Vec<BacRecommendation>, ScoringError> {
        let cfg = self.get_config().recommendation;
        let records = self.performance_records(user_id, now)?;
        let profile = recommendation::weakness_profile(&records, cfg.weak_score_threshold);

        let window = AttemptWindow::LastDays(cfg.bac_recent_window_days);
        let attempts = self.source.bac_attempts(user_id, window, now)?;
        let recent = attempted_item_ids(&attempts, window, now);

        let filter = CatalogFilter::default().excluding(recent.iter().copied());
        let candidates = self.source.bac_catalog(&filter)?;
        let ranked = recommendation::rank_bac_candidates(
            &candidates,
            &profile,
            &recent,
            limit.unwrap_or(cfg.default_limit),
            &cfg,
        );
        tracing::debug!(
            user_id,
            weak_subjects = profile.weak_subject_ids.len(),
            candidates = candidates.len(),
            returned = ranked.len(),
            "BAC recommendations ranked"
        );
        Ok(ranked)
    }

    /// Papers to revise one subject before the exam. Papers of that subject
    /// attempted in the last two weeks are skipped.
    pub fn exam_prep_papers(
        &self,
        user_id: u64,
        subject_id: u64,
        limit: Option<usize>,
        now: DateTime<Utc>,
    ) -> Result<Vec<BacCandidate>, ScoringError> {
        let window = AttemptWindow::LastDays(EXAM_PREP_RECENT_WINDOW_DAYS);
        let attempts: Vec<AttemptRecord> = self
            .source
            .bac_attempts(user_id, window, now)?
            .into_iter()
            .filter(|a| a.subject_id == subject_id)
            .collect();
        let recent = attempted_item_ids(&attempts, window, now);

        let filter = CatalogFilter::default()
            .in_subjects([subject_id])
            .excluding(recent.iter().copied());
        let catalog = self.source.bac_catalog(&filter)?;
        let limit = limit.unwrap_or(DEFAULT_EXAM_PREP_LIMIT);
        let papers = recommendation::exam_prep_papers(&catalog, subject_id, &recent, limit);
        tracing::debug!(user_id, subject_id, returned = papers.len(), "Exam prep papers selected");
        Ok(papers)
    }

    pub fn recommend_quizzes(
        &self,
        user_id: u64,
        limit: Option<usize>,
        now: DateTime<Utc>,
    ) -> Result<Vec<QuizRecommendation>, ScoringError> {
        let cfg = self.get_config().recommendation;
        let catalog = self.source.quiz_catalog(&CatalogFilter::quizzes())?;
        let attempts = self.source.quiz_attempts(user_id, AttemptWindow::All, now)?;
        let weak_concepts = self.source.weak_concepts(user_id)?;
        let priorities = self.source.subject_priorities(user_id)?;
        let selected = self.source.selected_subject_ids(user_id)?;

        let ctx = QuizContext {
            catalog: &catalog,
            attempts: &attempts,
            weak_concepts: &weak_concepts,
            subject_priorities: &priorities,
            selected_subject_ids: &selected,
            now,
        };
        let ranked = recommendation::rank_quiz_recommendations(&ctx, limit.unwrap_or(cfg.default_limit), &cfg.quiz);
        tracing::debug!(user_id, returned = ranked.len(), "Quiz recommendations ranked");
        Ok(ranked)
    }

    pub fn adaptive_quizzes<R: Rng + ?Sized>(
        &self,
        user_id: u64,
        limit: Option<usize>,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<(AdaptiveTier, Vec<QuizCandidate>), ScoringError> {
        let cfg = self.get_config().recommendation.adaptive;
        let catalog = self.source.quiz_catalog(&CatalogFilter::quizzes())?;
        let attempts = self.source.quiz_attempts(user_id, AttemptWindow::All, now)?;
        let (tier, picks) = recommendation::pick_adaptive_quizzes(
            &catalog,
            &attempts,
            limit.unwrap_or(DEFAULT_ADAPTIVE_LIMIT),
            &cfg,
            rng,
        );
        tracing::debug!(user_id, ?tier, returned = picks.len(), "Adaptive quizzes picked");
        Ok((tier, picks))
    }

    /// A learner outside any cohort (no academic stream) gets an empty board.
    pub fn leaderboard(
        &self,
        user_id: u64,
        cohort: Option<Cohort>,
        period: LeaderboardPeriod,
        limit: Option<usize>,
        now: DateTime<Utc>,
    ) -> Result<Leaderboard, ScoringError> {
        let cfg = self.get_config().leaderboard;
        let kind = match cohort {
            Some(Cohort::Subject { .. }) => LeaderboardKind::Subject,
            _ => LeaderboardKind::Stream,
        };
        let Some(cohort) = cohort else {
            return Ok(leaderboard::empty_leaderboard(kind, period));
        };

        let members = self.source.cohort_members(cohort, period.window(), now)?;
        let current_user = self.source.member(user_id)?;
        let request = LeaderboardRequest {
            kind,
            period,
            limit: limit.unwrap_or(cfg.default_limit),
            current_user: &current_user,
            now,
        };
        let board = leaderboard::build_leaderboard(&members, &request, &cfg);
        tracing::debug!(
            user_id,
            ?cohort,
            %period,
            participants = board.total_participants,
            rank = ?board.current_user.rank,
            "Leaderboard built"
        );
        Ok(board)
    }

    /// Completes `sim` with `score`, folds it into the subject record and
    /// drops the learner's cached performance.
    pub fn record_simulation_result(
        &self,
        sim: &SimulationRecord,
        record: &PerformanceRecord,
        score: f64,
        chapter_scores: &[(String, f64)],
        now: DateTime<Utc>,
    ) -> Result<SimulationResult, ScoringError> {
        let completed = match simulation::complete_simulation(sim, score, now) {
            Ok(completed) => completed,
            Err(e) => {
                tracing::warn!(
                    user_id = sim.user_id,
                    simulation_id = sim.id,
                    error = %e,
                    "Simulation submission rejected"
                );
                return Err(e);
            }
        };
        let performance = simulation::update_performance(record, score, chapter_scores);
        self.performance_cache.invalidate(CacheDomain::User(sim.user_id));
        tracing::info!(
            user_id = sim.user_id,
            simulation_id = sim.id,
            score,
            "Simulation completed"
        );
        Ok(SimulationResult {
            percentage: simulation::score_percentage(score, crate::constants::BAC_SCALE_MAX),
            grade: simulation::grade_band(score),
            simulation: completed,
            performance,
        })
    }
}
