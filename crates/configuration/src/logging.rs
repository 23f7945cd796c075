use crate::error::ConfigError;
use crate::settings::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `logging.level`. When a log directory is
/// configured, the returned guard must be kept alive for the file writer to flush.
pub fn init_tracing(config: &LoggingConfig) -> Result<Option<WorkerGuard>, ConfigError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| ConfigError::LoggingError(format!("invalid level '{}': {}", config.level, e)))?;

    match &config.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "hookline.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .try_init()
                .map_err(|e| ConfigError::LoggingError(e.to_string()))?;
            tracing::info!(
                level = %config.level,
                directory = %directory,
                "Logging to stdout and daily log files."
            );
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .try_init()
                .map_err(|e| ConfigError::LoggingError(e.to_string()))?;
            tracing::info!(level = %config.level, "Logging to stdout.");
            Ok(None)
        }
    }
}
