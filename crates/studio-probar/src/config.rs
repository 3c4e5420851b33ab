//! Run configuration.
//!
//! Everything a scenario run needs comes from one YAML file plus CLI
//! overrides. Nothing is read from the process environment.
//!
//! ```yaml
//! base_url: http://localhost:9000
//! browser:
//!   headless: true
//! timeouts:
//!   run_finish_ms: 300000
//! capture_transitions: false   # skip checkpoint screenshots
//! environments:
//!   staging:
//!     base_url: https://studio.staging.internal
//! inputs:
//!   spec_file: api_order_v3.yaml
//!   sample_row: { path: /orders, method: POST, response: "201" }
//! ```

use crate::browser::BrowserConfig;
use crate::locator::RowKey;
use crate::result::{StudioError, StudioResult};
use crate::wait::WaitOptions;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default studio address
pub const DEFAULT_BASE_URL: &str = "http://localhost:9000";

/// Default artifacts directory
pub const DEFAULT_ARTIFACTS_DIR: &str = "target/studio-probar";

/// Wait budgets in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Budget for a single UI reaction (alert, tab switch, row flag)
    pub action_ms: u64,
    /// Budget for a page's ready marker after navigation
    pub navigation_ms: u64,
    /// Best-effort budget for a background run to report running
    pub run_start_ms: u64,
    /// Budget for a background run to finish
    pub run_finish_ms: u64,
    /// Sampling interval for every wait
    pub poll_interval_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            action_ms: 10_000,
            navigation_ms: 30_000,
            run_start_ms: 15_000,
            run_finish_ms: 300_000,
            poll_interval_ms: 250,
        }
    }
}

impl Timeouts {
    const fn wait(&self, timeout_ms: u64) -> WaitOptions {
        WaitOptions {
            timeout_ms,
            poll_interval_ms: self.poll_interval_ms,
        }
    }

    /// Wait options for a single UI reaction
    #[must_use]
    pub const fn action(&self) -> WaitOptions {
        self.wait(self.action_ms)
    }

    /// Wait options for page readiness
    #[must_use]
    pub const fn navigation(&self) -> WaitOptions {
        self.wait(self.navigation_ms)
    }

    /// Wait options for a run to start
    #[must_use]
    pub const fn run_start(&self) -> WaitOptions {
        self.wait(self.run_start_ms)
    }

    /// Wait options for a run to finish
    #[must_use]
    pub const fn run_finish(&self) -> WaitOptions {
        self.wait(self.run_finish_ms)
    }
}

/// Per-environment overrides selected with `--env`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentOverride {
    /// Studio address
    pub base_url: Option<String>,
    /// Service under contract test
    pub service_url: Option<String>,
}

/// Data the built-in scenarios operate on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioInputs {
    /// Specification file opened in the spec tree
    pub spec_file: String,
    /// Service the contract tests run against
    pub service_url: String,
    /// Whether to enable generative tests
    pub generative: bool,
    /// Row used by exclusion and drill-down scenarios
    pub sample_row: RowKey,
    /// Port for the mock server scenario
    pub mock_port: u16,
    /// Text appended by the spec config scenario
    pub config_patch: String,
}

impl Default for ScenarioInputs {
    fn default() -> Self {
        Self {
            spec_file: "api_order_v3.yaml".to_string(),
            service_url: "http://localhost:8090".to_string(),
            generative: false,
            sample_row: RowKey::new("/products", "POST", "201"),
            mock_port: 9001,
            config_patch: "# studio-probar\n".to_string(),
        }
    }
}

/// Configuration of a scenario run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    /// Studio address; page routes are appended to it
    pub base_url: String,
    /// Browser launch settings
    pub browser: BrowserConfig,
    /// Wait budgets
    pub timeouts: Timeouts,
    /// Where screenshots and reports are written
    pub artifacts_dir: PathBuf,
    /// Capture a screenshot at every contract-run transition (on by default)
    pub capture_transitions: bool,
    /// Concurrent scenario workers
    pub workers: usize,
    /// Extra attempts for a failed scenario
    pub retries: u32,
    /// Named overrides
    pub environments: BTreeMap<String, EnvironmentOverride>,
    /// Scenario data
    pub inputs: ScenarioInputs,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            browser: BrowserConfig::default(),
            timeouts: Timeouts::default(),
            artifacts_dir: PathBuf::from(DEFAULT_ARTIFACTS_DIR),
            capture_transitions: true,
            workers: 1,
            retries: 0,
            environments: BTreeMap::new(),
            inputs: ScenarioInputs::default(),
        }
    }
}

impl StudioConfig {
    /// Load and validate a YAML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, parsed or validated
    pub fn load(path: &Path) -> StudioResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            StudioError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config = Self::from_yaml_str(&text)?;
        tracing::debug!(path = %path.display(), base_url = %config.base_url, "loaded configuration");
        Ok(config)
    }

    /// Parse and validate YAML text
    ///
    /// # Errors
    ///
    /// Returns error if the text is not valid configuration
    pub fn from_yaml_str(text: &str) -> StudioResult<Self> {
        let config: Self = serde_yaml_ng::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to YAML
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails
    pub fn to_yaml(&self) -> StudioResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Check invariants
    ///
    /// # Errors
    ///
    /// Returns [`StudioError::Config`] describing the first violation
    pub fn validate(&self) -> StudioResult<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(StudioError::config(format!(
                "base_url must be an http(s) URL, got {:?}",
                self.base_url
            )));
        }
        if self.timeouts.poll_interval_ms == 0 {
            return Err(StudioError::config("poll_interval_ms must be positive"));
        }
        if self.timeouts.poll_interval_ms > self.timeouts.action_ms {
            return Err(StudioError::config(
                "poll_interval_ms must not exceed action_ms",
            ));
        }
        if self.workers == 0 {
            return Err(StudioError::config("workers must be at least 1"));
        }
        Ok(())
    }

    /// Apply the named environment's overrides
    ///
    /// # Errors
    ///
    /// Returns [`StudioError::Config`] for an unknown environment
    pub fn with_environment(mut self, name: &str) -> StudioResult<Self> {
        let overrides = self.environments.get(name).cloned().ok_or_else(|| {
            let known: Vec<&str> = self.environments.keys().map(String::as_str).collect();
            StudioError::config(format!(
                "unknown environment {name:?} (known: {})",
                known.join(", ")
            ))
        })?;
        if let Some(base_url) = overrides.base_url {
            self.base_url = base_url;
        }
        if let Some(service_url) = overrides.service_url {
            self.inputs.service_url = service_url;
        }
        self.validate()?;
        Ok(self)
    }

    /// Absolute URL of a page route
    #[must_use]
    pub fn url_for(&self, route: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            route.trim_start_matches('/')
        )
    }
}
