use thiserror::Error;
use tracing::Subscriber;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

use crate::config::Config;

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            enable_file_logs: false,
            log_dir: "./logs".to_string(),
        }
    }
}

impl From<&Config> for LogConfig {
    fn from(config: &Config) -> Self {
        Self {
            log_level: config.log_level.clone(),
            enable_file_logs: config.enable_file_logs,
            log_dir: config.log_dir.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum LogInitError {
    #[error("invalid log filter: {0}")]
    Filter(#[from] ParseError),
    #[error("failed to create rolling file appender: {0}")]
    FileAppender(#[from] InitError),
}

/// `RUST_LOG` wins when it parses; otherwise `fallback` must.
fn build_filter(from_env: Option<EnvFilter>, fallback: &str) -> Result<EnvFilter, ParseError> {
    match from_env {
        Some(filter) => Ok(filter),
        None => EnvFilter::try_new(fallback),
    }
}

/// Keeps a subscriber that is already installed (host application, earlier
/// test) and reports success.
fn install<S>(subscriber: S) -> Result<(), LogInitError>
where
    S: Subscriber + Send + Sync + 'static,
{
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::debug!("Global subscriber already installed, keeping it");
    }
    Ok(())
}

/// Installs the global subscriber: env filter, stdout, and with
/// `enable_file_logs` a daily JSON file under `log_dir`. Safe to call more
/// than once.
pub fn init_tracing(config: &LogConfig) -> Result<(), LogInitError> {
    let env_filter = build_filter(EnvFilter::try_from_default_env().ok(), &config.log_level)?;

    let stdout_layer = fmt::layer().with_target(true).with_thread_ids(false);

    let registry = Registry::default().with(env_filter).with(stdout_layer);

    if config.enable_file_logs {
        let file_appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("memo-scoring")
            .filename_suffix("log")
            .max_log_files(30)
            .build(&config.log_dir)?;
        let file_layer = fmt::layer()
            .with_writer(file_appender)
            .with_ansi(false)
            .json();
        install(registry.with(file_layer))
    } else {
        install(registry)
    }
}
