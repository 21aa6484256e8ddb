use std::env;
use std::str::FromStr;

use crate::scoring::types::LevelFormula;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
    pub scoring: ScoringEnvConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone)]
pub struct ScoringEnvConfig {
    pub level_formula: LevelFormula,
    pub weak_score_threshold: f64,
    pub bac_recent_window_days: i64,
    pub quiz_recent_window_days: i64,
    pub leaderboard_limit: usize,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    pub capacity: usize,
}

impl Config {
    /// Loads `.env` (if present) before reading the environment.
    pub fn load() -> Self {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    pub fn from_env() -> Self {
        Self {
            log_level: env_or("RUST_LOG", "info"),
            enable_file_logs: env_or_bool("ENABLE_FILE_LOGS", false),
            log_dir: env_or("LOG_DIR", "./logs"),
            scoring: ScoringEnvConfig {
                level_formula: env_or_parse("SCORING_LEVEL_FORMULA", LevelFormula::Linear),
                weak_score_threshold: env_or_parse("SCORING_WEAK_SCORE_THRESHOLD", 12.0_f64),
                bac_recent_window_days: env_or_parse("SCORING_BAC_RECENT_WINDOW_DAYS", 14_i64),
                quiz_recent_window_days: env_or_parse("SCORING_QUIZ_RECENT_WINDOW_DAYS", 7_i64),
                leaderboard_limit: env_or_parse("SCORING_LEADERBOARD_LIMIT", 50_usize),
            },
            cache: CacheConfig {
                enabled: env_or_bool("CACHE_ENABLED", true),
                capacity: env_or_parse("CACHE_CAPACITY", 1024_usize),
            },
        }
    }
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_or_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(key) {
        Ok(raw) => match raw.parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(
                    key,
                    value = %raw,
                    "Failed to parse env var, using default"
                );
                default
            }
        },
        Err(_) => default,
    }
}

pub fn env_or_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}
