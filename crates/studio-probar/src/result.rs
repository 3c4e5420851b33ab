//! Result and error types for studio-probar.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for studio-probar operations
pub type StudioResult<T> = Result<T, StudioError>;

/// Errors that can occur while driving the studio
#[derive(Debug, Error)]
pub enum StudioError {
    /// A condition did not hold within its budget
    #[error("Timed out after {timeout_ms}ms waiting for {waited_for} (last observed: {last_observed})")]
    Timeout {
        /// What was being waited for
        waited_for: String,
        /// Timeout in milliseconds
        timeout_ms: u64,
        /// Last value sampled before giving up
        last_observed: String,
    },

    /// A control was not interactable before an action was attempted
    #[error("Precondition failed for {control}: {reason}")]
    Precondition {
        /// Semantic name of the control
        control: String,
        /// Why the control is not actionable
        reason: String,
    },

    /// No element matched a selector that had to match
    #[error("No element matches {selector}")]
    ElementNotFound {
        /// Selector key that matched nothing
        selector: String,
    },

    /// Business assertion failed
    #[error("Assertion failed: {message}")]
    AssertionFailed {
        /// Error message
        message: String,
    },

    /// Several soft assertions failed
    #[error("{count} assertion(s) failed: {}", failures.join("; "))]
    SoftAssertions {
        /// Number of failures
        count: usize,
        /// Failure messages in recording order
        failures: Vec<String>,
    },

    /// Driver-level failure (CDP call, evaluation, decoding)
    #[error("Driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Screenshot error
    #[error("Screenshot failed: {message}")]
    Screenshot {
        /// Error message
        message: String,
    },

    /// Invalid state error (operation called in wrong state)
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Error message
        message: String,
    },

    /// The application shows nothing the check applies to
    #[error("Nothing to check: {reason}")]
    NothingToCheck {
        /// Missing precondition
        reason: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// A page-object action failed; carries the diagnostic screenshot
    #[error("{action} failed: {source}")]
    Action {
        /// Action name
        action: String,
        /// Diagnostic screenshot captured on failure
        screenshot: Option<PathBuf>,
        /// Underlying failure
        #[source]
        source: Box<StudioError>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl StudioError {
    /// Create a driver error
    #[must_use]
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }

    /// Create a precondition error
    #[must_use]
    pub fn precondition(control: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Precondition {
            control: control.into(),
            reason: reason.into(),
        }
    }

    /// Create an assertion error
    #[must_use]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::AssertionFailed {
            message: message.into(),
        }
    }

    /// Create an invalid state error
    #[must_use]
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Create a nothing-to-check outcome
    #[must_use]
    pub fn nothing_to_check(reason: impl Into<String>) -> Self {
        Self::NothingToCheck {
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether this is a timeout, looking through `Action` wrappers
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Action { source, .. } => source.is_timeout(),
            _ => false,
        }
    }

    /// Whether this is a precondition failure, looking through `Action` wrappers
    #[must_use]
    pub fn is_precondition(&self) -> bool {
        match self {
            Self::Precondition { .. } => true,
            Self::Action { source, .. } => source.is_precondition(),
            _ => false,
        }
    }

    /// Whether the check did not apply, looking through `Action` wrappers
    #[must_use]
    pub fn is_nothing_to_check(&self) -> bool {
        match self {
            Self::NothingToCheck { .. } => true,
            Self::Action { source, .. } => source.is_nothing_to_check(),
            _ => false,
        }
    }

    /// Whether a failure screenshot should be captured before re-raising
    #[must_use]
    pub const fn wants_diagnostics(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. }
                | Self::Precondition { .. }
                | Self::ElementNotFound { .. }
                | Self::Driver { .. }
                | Self::AssertionFailed { .. }
        )
    }

    /// Innermost error, skipping `Action` wrappers
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Action { source, .. } => source.root(),
            other => other,
        }
    }
}
