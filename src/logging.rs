//! Tracing subscriber setup
//!
//! Everything at the configured level goes to a daily-rolling file under
//! `logs/`; only warnings and errors reach stderr so command output stays
//! clean. `RUST_LOG` overrides the configured level.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{Settings, TillPaths};
use crate::error::{TillError, TillResult};

pub const LOG_FILE_PREFIX: &str = "till.log";

/// Install the global subscriber; keep the guard alive until exit
pub fn init_logging(paths: &TillPaths, settings: &Settings) -> TillResult<WorkerGuard> {
    let file_appender = tracing_appender::rolling::daily(paths.log_dir(), LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_level));

    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(LevelFilter::WARN);

    let registry = tracing_subscriber::registry().with(filter).with(stderr_layer);

    let result = if settings.log_json {
        let file_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_writer(non_blocking)
            .with_ansi(false);
        registry.with(file_layer).try_init()
    } else {
        let file_layer = fmt::layer()
            .with_target(false)
            .with_writer(non_blocking)
            .with_ansi(false);
        registry.with(file_layer).try_init()
    };

    result.map_err(|e| TillError::Config(format!("Failed to initialise logging: {}", e)))?;
    Ok(guard)
}
