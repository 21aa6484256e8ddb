/// Scores on the BAC scale are out of 20
pub const BAC_SCALE_MAX: f64 = 20.0;

/// Upper bound of any percentage score
pub const PERCENT_MAX: f64 = 100.0;

/// Weekly goal (minutes) at which the goal term of the priority score saturates (7h/week)
pub const WEEKLY_GOAL_SATURATION_MINUTES: f64 = 420.0;

/// Largest weekly goal a subject may carry (~50h/week)
pub const MAX_WEEKLY_GOAL_MINUTES: u32 = 3000;

/// How far back a study streak is searched
pub const STREAK_LOOKBACK_DAYS: u32 = 30;

/// Default period (days) for a points summary
pub const DEFAULT_SUMMARY_PERIOD_DAYS: u32 = 30;

/// Number of entries on a leaderboard podium
pub const PODIUM_SIZE: usize = 3;

/// Default number of recommendations returned
pub const DEFAULT_RECOMMENDATION_LIMIT: usize = 5;

/// Default number of exam-prep papers for one subject
pub const DEFAULT_EXAM_PREP_LIMIT: usize = 3;

/// Papers attempted within this many days are left out of exam prep
pub const EXAM_PREP_RECENT_WINDOW_DAYS: i64 = 14;

/// Default number of adaptive quiz picks
pub const DEFAULT_ADAPTIVE_LIMIT: usize = 3;

/// Chapter score (percent) below which a chapter is reported as weak
pub const WEAK_CHAPTER_SCORE: f64 = 50.0;

/// BAC target average used by the historical gap score
pub const BAC_TARGET_AVERAGE: f64 = 14.0;

/// Cache TTL: academic structure, subjects (1 week)
pub const TTL_STATIC_SECS: i64 = 604_800;

/// Cache TTL: user profiles, preferences, course trees (15 minutes)
pub const TTL_DYNAMIC_SECS: i64 = 900;

/// Cache TTL: daily sessions, notification counters, dashboard (5 minutes)
pub const TTL_FREQUENT_SECS: i64 = 300;

/// Cache TTL: heavy aggregates such as user statistics (1 hour)
pub const TTL_HEAVY_SECS: i64 = 3600;
