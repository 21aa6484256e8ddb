pub mod config;
pub mod coupon;
pub mod engine;
pub mod filter;
pub mod leaderboard;
pub mod points;
pub mod priority;
pub mod recommendation;
pub mod simulation;
pub mod types;

/// Rounds half away from zero to `dp` decimal places.
pub fn round_dp(value: f64, dp: u32) -> f64 {
    let factor = 10_f64.powi(dp as i32);
    (value * factor).round() / factor
}

/// Arithmetic mean, `0.0` for an empty slice.
pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
