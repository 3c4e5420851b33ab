//! Per-scenario context.
//!
//! A [`StudioContext`] is handed to every scenario and page object. It owns
//! the scenario's driver, the run configuration, the artifact directory and
//! the report being built. Nothing in it is shared between scenarios.

use crate::config::{StudioConfig, Timeouts};
use crate::driver::StudioDriver;
use crate::reporter::{ArtifactStore, AttachmentKind, ScenarioReport};
use crate::result::{StudioError, StudioResult};
use std::path::PathBuf;
use std::sync::Arc;

/// Fixtures of one scenario run
pub struct StudioContext {
    driver: Arc<dyn StudioDriver>,
    config: Arc<StudioConfig>,
    artifacts: ArtifactStore,
    report: ScenarioReport,
}

impl std::fmt::Debug for StudioContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StudioContext")
            .field("base_url", &self.config.base_url)
            .field("artifacts", &self.artifacts)
            .field("scenario", &self.report.scenario)
            .finish_non_exhaustive()
    }
}

impl StudioContext {
    /// Create a context
    #[must_use]
    pub fn new(
        driver: Arc<dyn StudioDriver>,
        config: Arc<StudioConfig>,
        artifacts: ArtifactStore,
        report: ScenarioReport,
    ) -> Self {
        Self {
            driver,
            config,
            artifacts,
            report,
        }
    }

    /// The scenario's driver
    #[must_use]
    pub fn driver(&self) -> &dyn StudioDriver {
        self.driver.as_ref()
    }

    /// Run configuration
    #[must_use]
    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    /// Wait budgets
    #[must_use]
    pub fn timeouts(&self) -> &Timeouts {
        &self.config.timeouts
    }

    /// Artifact directory
    #[must_use]
    pub const fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    /// Report being built
    #[must_use]
    pub const fn report(&self) -> &ScenarioReport {
        &self.report
    }

    /// Mutable report
    pub fn report_mut(&mut self) -> &mut ScenarioReport {
        &mut self.report
    }

    /// Consume the context, returning the report
    #[must_use]
    pub fn into_report(self) -> ScenarioReport {
        self.report
    }

    /// Record a page action in the log and the report
    pub fn note(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(scenario = %self.report.scenario, "{message}");
        self.report.log("info", message);
    }

    /// Capture a screenshot and attach it
    ///
    /// # Errors
    ///
    /// Returns error if the screenshot cannot be taken or written
    pub async fn checkpoint(&mut self, label: &str) -> StudioResult<PathBuf> {
        let screenshot = self.driver.screenshot().await?;
        let path = self.artifacts.save_screenshot(label, &screenshot)?;
        self.report
            .attach(label, path.clone(), AttachmentKind::Checkpoint);
        Ok(path)
    }

    /// Capture a checkpoint when `capture_transitions` is on
    ///
    /// Capture failures are logged, never raised.
    pub async fn transition(&mut self, label: &str) {
        self.note(format!("transition: {label}"));
        if !self.config.capture_transitions {
            return;
        }
        if let Err(e) = self.checkpoint(label).await {
            tracing::warn!(label, error = %e, "checkpoint capture failed");
        }
    }

    /// Attach diagnostics to a failed page action and re-raise it
    ///
    /// Errors that [`StudioError::wants_diagnostics`] get a failure
    /// screenshot and are wrapped in [`StudioError::Action`]. Others pass
    /// through unchanged.
    ///
    /// # Errors
    ///
    /// Returns the (possibly wrapped) error of `result`
    pub async fn enrich<T>(&mut self, action: &str, result: StudioResult<T>) -> StudioResult<T> {
        let err = match result {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if !err.wants_diagnostics() {
            return Err(err);
        }

        let screenshot = match self.capture_failure(action).await {
            Ok(path) => Some(path),
            Err(capture) => {
                tracing::warn!(action, error = %capture, "failure screenshot not captured");
                None
            }
        };
        tracing::error!(
            scenario = %self.report.scenario,
            action,
            error = %err,
            screenshot = ?screenshot,
            "page action failed"
        );
        self.report.log("error", format!("{action} failed: {err}"));

        Err(StudioError::Action {
            action: action.to_string(),
            screenshot,
            source: Box::new(err),
        })
    }

    async fn capture_failure(&mut self, action: &str) -> StudioResult<PathBuf> {
        let screenshot = self
            .driver
            .screenshot()
            .await
            .map_err(|e| StudioError::Screenshot {
                message: e.to_string(),
            })?;
        let path = self.artifacts.save_screenshot(action, &screenshot)?;
        self.report.attach(action, path.clone(), AttachmentKind::Failure);
        Ok(path)
    }
}
