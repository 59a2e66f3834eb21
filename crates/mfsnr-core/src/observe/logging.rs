//! # Structured Logging
//!
//! The kernel emits `tracing` events (stage shapes at `debug`, the final
//! power report at `info`). Nothing is printed unless the host installs a
//! subscriber, which [`init_logging`] does from a [`LogConfig`].
//!
//! ```rust,ignore
//! use mfsnr_core::observe::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development());
//! tracing::info!(samples = 1024, "matched filter run complete");
//! ```

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(name)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per event
    Json,
    /// Multi-line, colored
    Pretty,
    /// One line per event
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        LogFormat::Compact
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    /// Include file:line of each event
    pub source_location: bool,
    /// Directive string (e.g. "mfsnr_core=debug"), overrides `level`
    pub filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            source_location: false,
            filter: None,
        }
    }
}

impl LogConfig {
    /// Verbose, human-readable.
    pub fn development() -> Self {
        Self {
            level: LogLevel::Debug,
            format: LogFormat::Pretty,
            source_location: true,
            ..Default::default()
        }
    }

    /// JSON at info level.
    pub fn production() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Json,
            ..Default::default()
        }
    }

    /// Errors only.
    pub fn quiet() -> Self {
        Self {
            level: LogLevel::Error,
            ..Default::default()
        }
    }

    /// Filter directives in effect: explicit filter, else `RUST_LOG`, else level.
    fn env_filter(&self) -> EnvFilter {
        let fallback = || EnvFilter::new(self.level.to_string());
        match &self.filter {
            Some(custom) => EnvFilter::try_new(custom).unwrap_or_else(|_| fallback()),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback()),
        }
    }
}

/// Install the global subscriber.
///
/// Only the first call takes effect; later calls are ignored so tests and
/// embedding hosts can call it freely.
pub fn init_logging(config: &LogConfig) {
    let registry = tracing_subscriber::registry().with(config.env_filter());
    let layer = fmt::layer()
        .with_file(config.source_location)
        .with_line_number(config.source_location);

    let result = match config.format {
        LogFormat::Json => tracing::subscriber::set_global_default(registry.with(layer.json())),
        LogFormat::Pretty => {
            tracing::subscriber::set_global_default(registry.with(layer.pretty()))
        }
        LogFormat::Compact => {
            tracing::subscriber::set_global_default(registry.with(layer.compact()))
        }
    };

    let _ = result;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_display() {
        assert_eq!(LogLevel::Debug.to_string(), "debug");
        assert_eq!(LogLevel::Warn.to_string(), "warn");
    }

    #[test]
    fn test_presets() {
        let dev = LogConfig::development();
        assert_eq!(dev.level, LogLevel::Debug);
        assert_eq!(dev.format, LogFormat::Pretty);
        assert!(dev.source_location);

        assert_eq!(LogConfig::production().format, LogFormat::Json);
        assert_eq!(LogConfig::quiet().level, LogLevel::Error);
    }

    #[test]
    fn test_yaml_round_trip_lowercase() {
        let yaml = "level: debug\nformat: json\n";
        let config: LogConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.format, LogFormat::Json);
        assert!(config.filter.is_none());
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_logging(&LogConfig::quiet());
        init_logging(&LogConfig::development());
        tracing::info!("logging initialized");
    }
}
