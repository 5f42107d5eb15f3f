//! Logging configuration and initialization
//!
//! `log` macros used throughout the crate are forwarded into a tracing
//! subscriber with console output and an optional log file.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use crate::config::Settings;

/// Log filter override, checked before `RUST_LOG`
pub const LOG_ENV_VAR: &str = "CAMERA_REACTIONS_LOG";

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Enable console output (default: true)
    pub console_enabled: bool,
    /// Enable file logging (default: false)
    pub file_enabled: bool,
    /// Log file location (default: logs/camera_reactions.log)
    pub file_path: Option<PathBuf>,
    /// Filter used when no environment override is set (default: "info")
    pub default_level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            console_enabled: true,
            file_enabled: false,
            file_path: None,
            default_level: "info".to_string(),
        }
    }
}

impl LogConfig {
    /// Console plus file logging at the level stored in settings
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            file_enabled: true,
            default_level: level_filter(&settings.log_level).to_string(),
            ..Self::default()
        }
    }
}

/// Translate a settings level name ("INFO", "WARNING", "CRITICAL", ...) to a filter directive
pub fn level_filter(level: &str) -> &'static str {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "warn" | "warning" => "warn",
        "error" | "critical" | "fatal" => "error",
        "off" => "off",
        _ => "info",
    }
}

/// Initialize the logging system with the given configuration
///
/// Returns a guard that must be kept alive for the duration of the program
/// to ensure file logging is properly flushed.
pub fn init_logging(
    config: &LogConfig,
) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_from_env("RUST_LOG"))
        .unwrap_or_else(|_| EnvFilter::new(&config.default_level));

    let mut file_guard: Option<WorkerGuard> = None;
    let subscriber = tracing_subscriber::registry().with(env_filter);

    // Generic over the subscriber so the same layer can stack on either branch
    fn console_layer<S>(enabled: bool) -> Option<impl tracing_subscriber::Layer<S>>
    where
        S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    {
        enabled.then(|| {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact()
        })
    }

    if config.file_enabled {
        let log_path = config
            .file_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("logs").join("camera_reactions.log"));
        if let Some(parent) = log_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = std::fs::File::create(&log_path)?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        file_guard = Some(guard);

        let file_layer = fmt::layer()
            .with_writer(non_blocking)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false);

        subscriber
            .with(file_layer)
            .with(console_layer(config.console_enabled))
            .try_init()?;
        eprintln!("Logging to file: {}", log_path.display());
    } else {
        subscriber
            .with(console_layer(config.console_enabled))
            .try_init()?;
    }

    tracing::info!(
        target: "camera_reactions",
        version = env!("CARGO_PKG_VERSION"),
        file_enabled = config.file_enabled,
        "Logging initialized"
    );

    Ok(file_guard)
}

pub use tracing_appender::non_blocking::WorkerGuard as LogGuard;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_default() {
        let config = LogConfig::default();
        assert!(config.console_enabled);
        assert!(!config.file_enabled);
        assert_eq!(config.default_level, "info");
    }

    #[test]
    fn test_level_names() {
        assert_eq!(level_filter("INFO"), "info");
        assert_eq!(level_filter("WARNING"), "warn");
        assert_eq!(level_filter("Debug"), "debug");
        assert_eq!(level_filter("CRITICAL"), "error");
        assert_eq!(level_filter("verbose"), "info");
    }

    #[test]
    fn test_config_from_settings() {
        let settings = Settings {
            log_level: "DEBUG".to_string(),
            ..Settings::default()
        };
        let config = LogConfig::from_settings(&settings);
        assert!(config.file_enabled);
        assert_eq!(config.default_level, "debug");
    }
}
