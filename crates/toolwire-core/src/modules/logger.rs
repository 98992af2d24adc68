//! Logging setup.
//!
//! `RUST_LOG` wins when set; otherwise every `toolwire*` target logs at the
//! configured level. A daily rolling file is added when a log directory is
//! configured.

use std::path::Path;
use toolwire_types::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{AppError, AppResult};

const LOG_FILE_PREFIX: &str = "toolwire.log";

/// Default filter directive for `level`.
pub fn default_directive(level: &str) -> String {
    format!("toolwire={level}")
}

fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(level)))
}

/// Install the global subscriber. Keep the returned guard alive for the
/// life of the process or buffered file output is lost.
pub fn init_logging(config: &LoggingConfig) -> AppResult<Option<WorkerGuard>> {
    let (file_layer, guard) = match config.directory.as_deref() {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(Path::new(dir), LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        },
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(build_filter(&config.level))
        .with(fmt::layer())
        .with(file_layer)
        .try_init()
        .map_err(|e| AppError::Telemetry(format!("Failed to install tracing subscriber: {e}")))?;

    if let Some(dir) = config.directory.as_deref() {
        tracing::info!(directory = %dir, "Writing logs to daily rolling file");
    }
    Ok(guard)
}
