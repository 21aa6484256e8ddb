pub mod cache;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod scoring;
pub mod sources;

pub use error::ScoringError;
