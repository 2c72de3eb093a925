//! Structured logging with tracing
//!
//! Sets up:
//! - Console logging, text or JSON
//! - File logging with daily rotation, always JSON
//! - Level filtering from RUST_LOG

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::daily;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use super::config::{LogFormat, MonitoringConfig};

const LOG_FILE_PREFIX: &str = "sqltune.log";

/// Install the global subscriber.
///
/// Returns the file writer guard when file logging is on; keep it alive
/// for the lifetime of the program or buffered lines are lost. Calling this
/// twice is harmless: the second install is ignored.
pub fn init_tracing(config: &MonitoringConfig) -> std::io::Result<Option<WorkerGuard>> {
    if !config.enabled {
        return Ok(None);
    }

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let console_layer = if config.enable_console_logging {
        let layer = fmt::layer().with_writer(std::io::stderr).with_target(true);
        Some(match config.log_format {
            LogFormat::Json => layer.json().boxed(),
            LogFormat::Text => layer.boxed(),
        })
    } else {
        None
    };

    let (file_layer, guard) = if config.enable_file_logging {
        config.ensure_log_dir()?;
        let (writer, guard) = tracing_appender::non_blocking(daily(&config.log_dir, LOG_FILE_PREFIX));
        let layer = fmt::layer().with_writer(writer).with_ansi(false).json();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    tracing::debug!(
        format = config.log_format.as_str(),
        file_logging = config.enable_file_logging,
        "Tracing initialized"
    );
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracing_initialization() {
        let config = MonitoringConfig::default();
        let result = init_tracing(&config);
        assert!(result.is_ok());
    }

    #[test]
    fn test_tracing_disabled() {
        let config = MonitoringConfig {
            enabled: false,
            ..MonitoringConfig::default()
        };
        assert!(init_tracing(&config).unwrap().is_none());
    }

    #[test]
    fn test_file_logging_creates_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = MonitoringConfig {
            log_dir: dir.path().join("logs"),
            enable_file_logging: true,
            enable_console_logging: false,
            ..MonitoringConfig::default()
        };
        let guard = init_tracing(&config).unwrap();
        assert!(guard.is_some());
        assert!(config.log_dir.exists());
    }
}
