//! Ranks practice material for a learner: past BAC papers, quizzes by
//! heuristic bucket, adaptive difficulty tiers and quiz progression.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::scoring::config::{AdaptiveConfig, QuizBucketConfig, RecommendationConfig};
use crate::scoring::filter::{attempted_item_ids, AttemptWindow, CatalogFilter};
use crate::scoring::mean;
use crate::scoring::types::{
    AttemptRecord, BacCandidate, DifficultyLevel, PerformanceRecord, QuizCandidate, SubjectPriority,
    WeakConcept,
};

/// Weak subjects and chapters derived from performance records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeaknessProfile {
    pub weak_subject_ids: HashSet<u64>,
    /// Union of every record's weak chapters, first-seen order
    pub weak_chapters: Vec<String>,
}

impl WeaknessProfile {
    pub fn is_weak_subject(&self, subject_id: u64) -> bool {
        self.weak_subject_ids.contains(&subject_id)
    }

    pub fn is_weak_chapter(&self, chapter: &str) -> bool {
        self.weak_chapters.iter().any(|c| c == chapter)
    }
}

pub fn weakness_profile(records: &[PerformanceRecord], weak_score_threshold: f64) -> WeaknessProfile {
    let mut profile = WeaknessProfile::default();
    for record in records {
        if record.average_score < weak_score_threshold {
            profile.weak_subject_ids.insert(record.subject_id);
        }
        for chapter in &record.weak_chapters {
            if !profile.is_weak_chapter(chapter) {
                profile.weak_chapters.push(chapter.clone());
            }
        }
    }
    profile
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum BacReason {
    ImprovePerformance { subject_name: String },
    PracticeChapters { chapters: Vec<String> },
    VariedPractice,
}

impl fmt::Display for BacReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ImprovePerformance { subject_name } => {
                write!(f, "improve performance in {subject_name}")
            }
            Self::PracticeChapters { chapters } => write!(f, "practice: {}", chapters.join(", ")),
            Self::VariedPractice => f.write_str("varied practice"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacRecommendation {
    pub paper: BacCandidate,
    pub reason: BacReason,
}

fn bac_reason(paper: &BacCandidate, profile: &WeaknessProfile, max_chapters: usize) -> BacReason {
    if profile.is_weak_subject(paper.subject_id) {
        return BacReason::ImprovePerformance {
            subject_name: paper.subject_name.clone(),
        };
    }

    let mut chapters: Vec<String> = Vec::new();
    for chapter in &paper.covered_chapters {
        if chapters.len() == max_chapters {
            break;
        }
        if profile.is_weak_chapter(chapter) && !chapters.contains(chapter) {
            chapters.push(chapter.clone());
        }
    }

    if chapters.is_empty() {
        BacReason::VariedPractice
    } else {
        BacReason::PracticeChapters { chapters }
    }
}

/// Papers on weak subjects first, then easier papers, then more recent years.
/// Papers in `recently_attempted` are skipped.
pub fn rank_bac_candidates(
    candidates: &[BacCandidate],
    profile: &WeaknessProfile,
    recently_attempted: &HashSet<u64>,
    limit: usize,
    cfg: &RecommendationConfig,
) -> Vec<BacRecommendation> {
    let mut ranked: Vec<&BacCandidate> = candidates
        .iter()
        .filter(|c| !recently_attempted.contains(&c.id))
        .collect();

    ranked.sort_by(|a, b| {
        let weak_a = !profile.is_weak_subject(a.subject_id);
        let weak_b = !profile.is_weak_subject(b.subject_id);
        weak_a
            .cmp(&weak_b)
            .then_with(|| {
                a.difficulty_rating
                    .partial_cmp(&b.difficulty_rating)
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| b.year.cmp(&a.year))
    });

    ranked
        .into_iter()
        .take(limit)
        .map(|paper| BacRecommendation {
            reason: bac_reason(paper, profile, cfg.max_reason_chapters),
            paper: paper.clone(),
        })
        .collect()
}

/// Exam-prep papers for one subject, newest year first, skipping
/// `recently_attempted`.
pub fn exam_prep_papers(
    catalog: &[BacCandidate],
    subject_id: u64,
    recently_attempted: &HashSet<u64>,
    limit: usize,
) -> Vec<BacCandidate> {
    let mut papers: Vec<BacCandidate> = catalog
        .iter()
        .filter(|p| p.subject_id == subject_id && !recently_attempted.contains(&p.id))
        .cloned()
        .collect();
    papers.sort_by(|a, b| b.year.cmp(&a.year));
    papers.truncate(limit);
    papers
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QuizBucket {
    WeakConcept,
    PrioritySubject,
    Popular,
    NewlyAdded,
}

impl QuizBucket {
    pub fn priority(self, cfg: &QuizBucketConfig) -> u32 {
        match self {
            Self::WeakConcept => cfg.weak_concept_priority,
            Self::PrioritySubject => cfg.priority_subject_priority,
            Self::Popular => cfg.popular_priority,
            Self::NewlyAdded => cfg.new_priority,
        }
    }

    fn take(self, cfg: &QuizBucketConfig) -> usize {
        match self {
            Self::WeakConcept => cfg.weak_concept_take,
            Self::PrioritySubject => cfg.priority_subject_take,
            Self::Popular => cfg.popular_take,
            Self::NewlyAdded => cfg.new_take,
        }
    }
}

impl fmt::Display for QuizBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::WeakConcept => "targets weak concepts",
            Self::PrioritySubject => "high-priority subject",
            Self::Popular => "popular quiz",
            Self::NewlyAdded => "new quiz",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizRecommendation {
    pub quiz: QuizCandidate,
    pub bucket: QuizBucket,
    pub priority: u32,
}

/// Everything the quiz buckets select from.
#[derive(Debug, Clone, Copy)]
pub struct QuizContext<'a> {
    pub catalog: &'a [QuizCandidate],
    /// The learner's completed attempts, any order
    pub attempts: &'a [AttemptRecord],
    pub weak_concepts: &'a [WeakConcept],
    pub subject_priorities: &'a [SubjectPriority],
    /// Fallback when no priorities are known
    pub selected_subject_ids: &'a [u64],
    pub now: DateTime<Utc>,
}

/// Distinct tags (first occurrence wins) with the highest error rates.
pub fn top_weak_concept_tags(concepts: &[WeakConcept], max: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut unique: Vec<&WeakConcept> = concepts.iter().filter(|c| seen.insert(c.tag.as_str())).collect();
    unique.sort_by(|a, b| b.error_rate.partial_cmp(&a.error_rate).unwrap_or(Ordering::Equal));
    unique.into_iter().take(max).map(|c| c.tag.clone()).collect()
}

/// Highest-priority subject ids, or the learner's selected subjects when
/// no priorities exist.
pub fn top_priority_subjects(priorities: &[SubjectPriority], max: usize, fallback: &[u64]) -> Vec<u64> {
    if priorities.is_empty() {
        return fallback.to_vec();
    }
    let mut sorted: Vec<&SubjectPriority> = priorities.iter().collect();
    sorted.sort_by(|a, b| {
        b.priority_score
            .partial_cmp(&a.priority_score)
            .unwrap_or(Ordering::Equal)
    });
    sorted.into_iter().take(max).map(|p| p.subject_id).collect()
}

fn select_bucket(ctx: &QuizContext<'_>, bucket: QuizBucket, cfg: &QuizBucketConfig) -> Vec<QuizCandidate> {
    let recent = attempted_item_ids(ctx.attempts, AttemptWindow::LastDays(cfg.recent_window_days), ctx.now);
    let ever = attempted_item_ids(ctx.attempts, AttemptWindow::All, ctx.now);

    let mut pool = match bucket {
        QuizBucket::WeakConcept => {
            let tags = top_weak_concept_tags(ctx.weak_concepts, cfg.max_weak_concepts);
            if tags.is_empty() {
                return Vec::new();
            }
            CatalogFilter::quizzes()
                .with_any_tag(tags)
                .excluding(recent)
                .apply_quizzes(ctx.catalog)
        }
        QuizBucket::PrioritySubject => {
            let subjects = top_priority_subjects(
                ctx.subject_priorities,
                cfg.max_priority_subjects,
                ctx.selected_subject_ids,
            );
            if subjects.is_empty() {
                return Vec::new();
            }
            let mut pool = CatalogFilter::quizzes()
                .in_subjects(subjects)
                .excluding(recent)
                .apply_quizzes(ctx.catalog);
            pool.sort_by_key(|q| q.difficulty);
            pool
        }
        QuizBucket::Popular => {
            let mut pool = CatalogFilter::quizzes()
                .attempted_more_than(cfg.popular_min_attempts)
                .average_at_least(cfg.popular_min_average)
                .excluding(ever)
                .apply_quizzes(ctx.catalog);
            pool.sort_by(|a, b| b.total_attempts.cmp(&a.total_attempts));
            pool
        }
        QuizBucket::NewlyAdded => {
            let mut pool = CatalogFilter::quizzes()
                .created_since(ctx.now - Duration::days(cfg.new_window_days))
                .excluding(ever)
                .apply_quizzes(ctx.catalog);
            pool.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            pool
        }
    };

    pool.truncate(cfg.bucket_pool_size);
    pool
}

/// Fills each bucket, keeps the first occurrence of every quiz and orders
/// by bucket priority.
pub fn rank_quiz_recommendations(
    ctx: &QuizContext<'_>,
    limit: usize,
    cfg: &QuizBucketConfig,
) -> Vec<QuizRecommendation> {
    let buckets = [
        QuizBucket::WeakConcept,
        QuizBucket::PrioritySubject,
        QuizBucket::Popular,
        QuizBucket::NewlyAdded,
    ];

    let mut seen = HashSet::new();
    let mut out: Vec<QuizRecommendation> = Vec::new();
    for bucket in buckets {
        for quiz in select_bucket(ctx, bucket, cfg).into_iter().take(bucket.take(cfg)) {
            if seen.insert(quiz.id) {
                out.push(QuizRecommendation {
                    quiz,
                    bucket,
                    priority: bucket.priority(cfg),
                });
            }
        }
    }

    out.sort_by(|a, b| b.priority.cmp(&a.priority));
    out.truncate(limit);
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdaptiveTier {
    Foundation,
    Balanced,
    Challenge,
}

impl AdaptiveTier {
    pub fn difficulties(self) -> &'static [DifficultyLevel] {
        match self {
            Self::Foundation => &[DifficultyLevel::Easy],
            Self::Balanced => &[DifficultyLevel::Medium],
            Self::Challenge => &[DifficultyLevel::Medium, DifficultyLevel::Hard],
        }
    }
}

/// The `n` most recent attempts, newest first.
pub fn most_recent_attempts(attempts: &[AttemptRecord], n: usize) -> Vec<AttemptRecord> {
    let mut sorted = attempts.to_vec();
    sorted.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
    sorted.truncate(n);
    sorted
}

/// Last score beats the first among the `window` most recent scores.
/// `newest_first` must be ordered newest first, so "last" is the oldest of
/// the window.
pub fn is_improving(newest_first: &[f64], window: usize) -> bool {
    let recent = &newest_first[..newest_first.len().min(window)];
    match (recent.first(), recent.last()) {
        (Some(first), Some(last)) if recent.len() >= 2 => last > first,
        _ => false,
    }
}

/// Tier for scores ordered newest first.
pub fn adaptive_tier(newest_first: &[f64], cfg: &AdaptiveConfig) -> AdaptiveTier {
    if newest_first.is_empty() {
        return AdaptiveTier::Foundation;
    }
    let average = mean(newest_first);
    if average >= cfg.challenge_average || is_improving(newest_first, cfg.trend_window) {
        AdaptiveTier::Challenge
    } else if average < cfg.reinforce_average {
        AdaptiveTier::Foundation
    } else {
        AdaptiveTier::Balanced
    }
}

/// Random quizzes from the learner's tier, skipping quizzes found in the
/// recent history window.
pub fn pick_adaptive_quizzes<R: Rng + ?Sized>(
    catalog: &[QuizCandidate],
    attempts: &[AttemptRecord],
    limit: usize,
    cfg: &AdaptiveConfig,
    rng: &mut R,
) -> (AdaptiveTier, Vec<QuizCandidate>) {
    let recent = most_recent_attempts(attempts, cfg.history_size);
    let scores: Vec<f64> = recent.iter().map(|a| a.score_percentage).collect();
    let tier = adaptive_tier(&scores, cfg);

    let pool = CatalogFilter::quizzes()
        .with_difficulties(tier.difficulties())
        .excluding(recent.iter().map(|a| a.item_id))
        .apply_quizzes(catalog);

    let mut picks: Vec<QuizCandidate> = pool.choose_multiple(rng, limit).cloned().collect();
    picks.shuffle(rng);
    (tier, picks)
}

/// Difficulties suited to a learner's subject average, `None` when any fits.
pub fn subject_difficulty_window(
    average_score: Option<f64>,
    cfg: &AdaptiveConfig,
) -> Option<&'static [DifficultyLevel]> {
    match average_score {
        Some(avg) if avg >= cfg.subject_high_average => {
            Some(&[DifficultyLevel::Medium, DifficultyLevel::Hard])
        }
        Some(avg) if avg < cfg.subject_low_average => Some(&[DifficultyLevel::Easy, DifficultyLevel::Medium]),
        _ => None,
    }
}

/// Quizzes of one subject matched to the learner's level there.
pub fn quizzes_for_subject(
    catalog: &[QuizCandidate],
    subject_id: u64,
    subject_average: Option<f64>,
    attempts: &[AttemptRecord],
    now: DateTime<Utc>,
    limit: usize,
    cfg: &AdaptiveConfig,
) -> Vec<QuizCandidate> {
    let recent = attempted_item_ids(attempts, AttemptWindow::LastDays(cfg.subject_recent_window_days), now);
    let mut filter = CatalogFilter::quizzes().in_subjects([subject_id]).excluding(recent);
    if let Some(levels) = subject_difficulty_window(subject_average, cfg) {
        filter = filter.with_difficulties(levels);
    }
    let mut out = filter.apply_quizzes(catalog);
    out.truncate(limit);
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "difficulty", rename_all = "camelCase")]
pub enum ProgressionStep {
    /// Another quiz at the same difficulty
    Retry(DifficultyLevel),
    Advance(DifficultyLevel),
}

impl ProgressionStep {
    pub fn difficulty(self) -> DifficultyLevel {
        match self {
            Self::Retry(level) | Self::Advance(level) => level,
        }
    }
}

pub fn next_progression_step(
    current: DifficultyLevel,
    best_score: Option<f64>,
    cfg: &AdaptiveConfig,
) -> ProgressionStep {
    match best_score {
        Some(best) if best >= cfg.progression_score => ProgressionStep::Advance(current.harder()),
        _ => ProgressionStep::Retry(current),
    }
}

/// A random quiz of the same subject at the next step's difficulty. A retry
/// never returns the current quiz.
pub fn next_quiz_in_progression<R: Rng + ?Sized>(
    catalog: &[QuizCandidate],
    current: &QuizCandidate,
    best_score: Option<f64>,
    cfg: &AdaptiveConfig,
    rng: &mut R,
) -> Option<QuizCandidate> {
    let step = next_progression_step(current.difficulty, best_score, cfg);
    let mut filter = CatalogFilter::quizzes()
        .in_subjects([current.subject_id])
        .with_difficulties(&[step.difficulty()]);
    if let ProgressionStep::Retry(_) = step {
        filter = filter.excluding([current.id]);
    }
    let pool = filter.apply_quizzes(catalog);
    pool.choose(rng).cloned()
}
