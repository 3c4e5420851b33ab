//! Logging setup.
//!
//! The library only emits `tracing` events; binaries call [`init_logging`]
//! once. Filter directives come from [`LoggingConfig`], never from
//! `RUST_LOG`.

use crate::result::{StudioError, StudioResult};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output format of log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Level for the studio crates (`error`..`trace`)
    pub level: String,
    /// Level for every other crate
    pub dependency_level: String,
    /// Output format
    pub format: LogFormat,
    /// Include the event target
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            dependency_level: "error".to_string(),
            format: LogFormat::Pretty,
            with_target: false,
        }
    }
}

impl LoggingConfig {
    /// Level from a `-v` count: 0 warn, 1 info, 2 debug, 3+ trace
    #[must_use]
    pub fn from_verbosity(verbose: u8, quiet: bool) -> Self {
        let level = match (quiet, verbose) {
            (true, _) => "error",
            (false, 0) => "warn",
            (false, 1) => "info",
            (false, 2) => "debug",
            (false, _) => "trace",
        };
        Self {
            level: level.to_string(),
            with_target: verbose >= 2,
            ..Self::default()
        }
    }

    /// Use JSON output
    #[must_use]
    pub const fn json(mut self) -> Self {
        self.format = LogFormat::Json;
        self
    }

    /// Filter directive string
    #[must_use]
    pub fn directive(&self) -> String {
        format!(
            "{},studio_probar={level},studio_probador={level}",
            self.dependency_level,
            level = self.level
        )
    }
}

/// Install the global subscriber
///
/// # Errors
///
/// Returns [`StudioError::Config`] for a bad directive or when a subscriber
/// is already installed
pub fn init_logging(config: &LoggingConfig) -> StudioResult<()> {
    let filter = EnvFilter::try_new(config.directive())
        .map_err(|e| StudioError::config(format!("invalid log filter: {e}")))?;

    let result = match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(config.with_target)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(config.with_target)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };
    result.map_err(|e| StudioError::config(format!("logging already initialised: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_verbosity() {
        assert_eq!(LoggingConfig::from_verbosity(0, false).level, "warn");
        assert_eq!(LoggingConfig::from_verbosity(1, false).level, "info");
        assert_eq!(LoggingConfig::from_verbosity(2, false).level, "debug");
        assert_eq!(LoggingConfig::from_verbosity(7, false).level, "trace");
        assert_eq!(LoggingConfig::from_verbosity(3, true).level, "error");
        assert!(LoggingConfig::from_verbosity(2, false).with_target);
    }

    #[test]
    fn test_directive_scopes_crates() {
        let directive = LoggingConfig::from_verbosity(1, false).directive();
        assert_eq!(directive, "error,studio_probar=info,studio_probador=info");
        assert!(EnvFilter::try_new(directive).is_ok());
    }

    #[test]
    fn test_json_builder() {
        assert_eq!(LoggingConfig::default().json().format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_directive_is_config_error() {
        let config = LoggingConfig {
            level: "loud".to_string(),
            ..LoggingConfig::default()
        };
        assert!(matches!(
            init_logging(&config).unwrap_err(),
            StudioError::Config { .. }
        ));
    }
}
