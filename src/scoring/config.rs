use serde::{Deserialize, Serialize};

use crate::scoring::types::{DifficultyLevel, LevelFormula};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PointsConfig {
    pub base_points: i32,
    pub long_session_minutes: u32,
    pub long_session_bonus: i32,
    pub happy_mood_bonus: i32,
    pub sad_mood_penalty: i32,
    pub streak_min_days: u32,
    pub streak_bonus: i32,
    pub on_time_window_minutes: i64,
    pub on_time_bonus: i32,
    pub max_session_points: i32,
    pub skip_penalty: u32,
    pub miss_penalty: u32,
    pub level_formula: LevelFormula,
}

impl Default for PointsConfig {
    fn default() -> Self {
        Self {
            base_points: 10,
            long_session_minutes: 45,
            long_session_bonus: 5,
            happy_mood_bonus: 3,
            sad_mood_penalty: 2,
            streak_min_days: 3,
            streak_bonus: 5,
            on_time_window_minutes: 5,
            on_time_bonus: 2,
            max_session_points: 25,
            skip_penalty: 5,
            miss_penalty: 2,
            level_formula: LevelFormula::Linear,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PriorityConfig {
    /// Weight of `coefficient / 10`
    pub coefficient_weight: f64,
    pub easy_score: f64,
    pub medium_score: f64,
    pub hard_score: f64,
    pub goal_weight: f64,
    pub goal_saturation_minutes: f64,
    pub favorite_bonus: f64,
    /// Weight of the weekly shortfall `1 - progress`
    pub performance_weight: f64,
    /// Contribution when no weekly progress is known
    pub performance_default: f64,
    /// Weekly progress (percent) under which a subject needs attention
    pub attention_threshold_percent: f64,
}

impl PriorityConfig {
    pub fn difficulty_score(&self, level: DifficultyLevel) -> f64 {
        match level {
            DifficultyLevel::Easy => self.easy_score,
            DifficultyLevel::Medium => self.medium_score,
            DifficultyLevel::Hard => self.hard_score,
        }
    }
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            coefficient_weight: 3.0,
            easy_score: 0.8,
            medium_score: 2.0,
            hard_score: 2.5,
            goal_weight: 2.0,
            goal_saturation_minutes: crate::constants::WEEKLY_GOAL_SATURATION_MINUTES,
            favorite_bonus: 1.5,
            performance_weight: 2.0,
            performance_default: 1.0,
            attention_threshold_percent: 50.0,
        }
    }
}

/// Weights of the planner's six 0–10 component scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlannerWeights {
    pub coefficient: f64,
    pub exam_proximity: f64,
    pub difficulty: f64,
    pub inactivity: f64,
    pub performance_gap: f64,
    pub historical_performance_gap: f64,
}

impl Default for PlannerWeights {
    fn default() -> Self {
        Self {
            coefficient: 35.0,
            exam_proximity: 25.0,
            difficulty: 15.0,
            inactivity: 10.0,
            performance_gap: 5.0,
            historical_performance_gap: 10.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecommendationConfig {
    /// Subject average (0–20) under which a subject is weak
    pub weak_score_threshold: f64,
    pub bac_recent_window_days: i64,
    pub default_limit: usize,
    pub max_reason_chapters: usize,
    pub quiz: QuizBucketConfig,
    pub adaptive: AdaptiveConfig,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            weak_score_threshold: 12.0,
            bac_recent_window_days: 14,
            default_limit: crate::constants::DEFAULT_RECOMMENDATION_LIMIT,
            max_reason_chapters: 2,
            quiz: QuizBucketConfig::default(),
            adaptive: AdaptiveConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QuizBucketConfig {
    pub weak_concept_priority: u32,
    pub priority_subject_priority: u32,
    pub popular_priority: u32,
    pub new_priority: u32,
    pub weak_concept_take: usize,
    pub priority_subject_take: usize,
    pub popular_take: usize,
    pub new_take: usize,
    /// Bucket query size before the per-bucket take
    pub bucket_pool_size: usize,
    pub max_weak_concepts: usize,
    pub max_priority_subjects: usize,
    pub recent_window_days: i64,
    pub popular_min_attempts: u32,
    pub popular_min_average: f64,
    pub new_window_days: i64,
}

impl Default for QuizBucketConfig {
    fn default() -> Self {
        Self {
            weak_concept_priority: 10,
            priority_subject_priority: 8,
            popular_priority: 6,
            new_priority: 4,
            weak_concept_take: 2,
            priority_subject_take: 2,
            popular_take: 2,
            new_take: 1,
            bucket_pool_size: 10,
            max_weak_concepts: 5,
            max_priority_subjects: 3,
            recent_window_days: 7,
            popular_min_attempts: 10,
            popular_min_average: 60.0,
            new_window_days: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AdaptiveConfig {
    pub history_size: usize,
    pub trend_window: usize,
    pub challenge_average: f64,
    pub reinforce_average: f64,
    /// Best score (percent) needed to move up a difficulty step
    pub progression_score: f64,
    /// Subject average at or above which easy quizzes are skipped
    pub subject_high_average: f64,
    /// Subject average under which hard quizzes are skipped
    pub subject_low_average: f64,
    pub subject_recent_window_days: i64,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            history_size: 10,
            trend_window: 3,
            challenge_average: 80.0,
            reinforce_average: 60.0,
            progression_score: 70.0,
            subject_high_average: 80.0,
            subject_low_average: 60.0,
            subject_recent_window_days: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LeaderboardConfig {
    pub default_limit: usize,
    pub podium_size: usize,
    /// Prefix used when a learner has no display name
    pub anonymous_name_prefix: String,
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            default_limit: 50,
            podium_size: crate::constants::PODIUM_SIZE,
            anonymous_name_prefix: "user".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringConfig {
    #[serde(default)]
    pub points: PointsConfig,
    #[serde(default)]
    pub priority: PriorityConfig,
    #[serde(default)]
    pub planner_weights: PlannerWeights,
    #[serde(default)]
    pub recommendation: RecommendationConfig,
    #[serde(default)]
    pub leaderboard: LeaderboardConfig,
}

impl ScoringConfig {
    pub fn from_env(env_config: &crate::config::ScoringEnvConfig) -> Self {
        let mut config = Self::default();
        config.points.level_formula = env_config.level_formula;
        config.recommendation.weak_score_threshold = env_config.weak_score_threshold;
        config.recommendation.bac_recent_window_days = env_config.bac_recent_window_days;
        config.recommendation.quiz.recent_window_days = env_config.quiz_recent_window_days;
        config.leaderboard.default_limit = env_config.leaderboard_limit;
        config
    }

    pub fn validate(&self) -> Result<(), String> {
        let p = &self.points;
        if p.max_session_points <= 0 {
            return Err("points.max_session_points must be > 0".to_string());
        }
        if p.base_points < 0 || p.base_points > p.max_session_points {
            return Err("points.base_points must be in [0, max_session_points]".to_string());
        }
        if p.on_time_window_minutes < 0 {
            return Err("points.on_time_window_minutes must be >= 0".to_string());
        }

        let pr = &self.priority;
        if pr.coefficient_weight < 0.0
            || pr.goal_weight < 0.0
            || pr.favorite_bonus < 0.0
            || pr.performance_weight < 0.0
            || pr.performance_default < 0.0
        {
            return Err("priority weights must be >= 0".to_string());
        }
        if pr.easy_score < 0.0 || pr.medium_score < 0.0 || pr.hard_score < 0.0 {
            return Err("priority difficulty scores must be >= 0".to_string());
        }
        if pr.goal_saturation_minutes <= 0.0 {
            return Err("priority.goal_saturation_minutes must be > 0".to_string());
        }
        if !(0.0..=100.0).contains(&pr.attention_threshold_percent) {
            return Err("priority.attention_threshold_percent must be in [0,100]".to_string());
        }

        let w = &self.planner_weights;
        let weights = [
            w.coefficient,
            w.exam_proximity,
            w.difficulty,
            w.inactivity,
            w.performance_gap,
            w.historical_performance_gap,
        ];
        if weights.iter().any(|v| *v < 0.0) {
            return Err("planner_weights must be >= 0".to_string());
        }
        if weights.iter().sum::<f64>() <= 0.0 {
            return Err("planner_weights sum must be > 0".to_string());
        }

        let r = &self.recommendation;
        if !(0.0..=crate::constants::BAC_SCALE_MAX).contains(&r.weak_score_threshold) {
            return Err("recommendation.weak_score_threshold must be in [0,20]".to_string());
        }
        if r.bac_recent_window_days < 0 || r.quiz.recent_window_days < 0 {
            return Err("recommendation recent windows must be >= 0".to_string());
        }
        if r.quiz.new_window_days < 0 || r.adaptive.subject_recent_window_days < 0 {
            return Err("recommendation windows must be >= 0".to_string());
        }
        if r.adaptive.history_size == 0 {
            return Err("recommendation.adaptive.history_size must be > 0".to_string());
        }
        if r.adaptive.trend_window < 2 || r.adaptive.trend_window > r.adaptive.history_size {
            return Err(
                "recommendation.adaptive.trend_window must be in [2, history_size]".to_string(),
            );
        }
        if r.adaptive.reinforce_average > r.adaptive.challenge_average {
            return Err(
                "recommendation.adaptive.reinforce_average must be <= challenge_average"
                    .to_string(),
            );
        }
        if r.adaptive.subject_low_average > r.adaptive.subject_high_average {
            return Err(
                "recommendation.adaptive.subject_low_average must be <= subject_high_average"
                    .to_string(),
            );
        }

        if self.leaderboard.default_limit == 0 {
            return Err("leaderboard.default_limit must be > 0".to_string());
        }

        Ok(())
    }
}
