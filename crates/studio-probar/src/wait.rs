//! Wait Mechanisms
//!
//! The studio offers no completion callbacks, so every asynchronous UI
//! transition is observed by sampling the DOM at a fixed interval until a
//! condition holds or the budget runs out.
//!
//! - [`await_condition`] is the single polling loop everything else uses.
//! - [`RunStatePoller`] infers a background run's state from `data-running`.
//! - [`RunStateMonitor`] checks that observed states only move forward.

use crate::driver::StudioDriver;
use crate::locator::Locator;
use crate::result::{StudioError, StudioResult};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default timeout for wait operations (30 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 30_000;

/// Default polling interval (250ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

/// Attribute carrying the running flag of a background job
pub const RUNNING_ATTRIBUTE: &str = "data-running";

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Options for wait operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

// =============================================================================
// POLLING LOOP
// =============================================================================

/// Sample until `accept` holds or the timeout elapses.
///
/// The first sample is taken immediately and the last one no later than the
/// deadline. A sampling error ends the wait at once. On timeout the error
/// carries the last observed value.
pub async fn await_condition<T, F, Fut, A>(
    description: &str,
    options: &WaitOptions,
    mut sample: F,
    accept: A,
) -> StudioResult<T>
where
    T: Debug,
    F: FnMut() -> Fut,
    Fut: Future<Output = StudioResult<T>>,
    A: Fn(&T) -> bool,
{
    let start = Instant::now();
    let deadline = start + options.timeout();
    let mut samples = 0_u32;

    loop {
        let value = sample().await?;
        samples += 1;
        tracing::debug!(waited_for = description, samples, observed = ?value, "poll");

        if accept(&value) {
            return Ok(value);
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(StudioError::Timeout {
                waited_for: description.to_string(),
                timeout_ms: options.timeout_ms,
                last_observed: format!("{value:?}"),
            });
        }
        tokio::time::sleep(options.poll_interval().min(deadline - now)).await;
    }
}

/// Wait until an async predicate returns `true`
pub async fn wait_until<F, Fut>(
    description: &str,
    options: &WaitOptions,
    predicate: F,
) -> StudioResult<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StudioResult<bool>>,
{
    await_condition(description, options, predicate, |ok| *ok)
        .await
        .map(|_| ())
}

// =============================================================================
// RUN STATE
// =============================================================================

/// State of a background job as shown by its `data-running` flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// No tracked element is present yet
    NotStarted,
    /// At least one tracked element says `"true"`
    Running,
    /// Tracked elements are present and none says `"true"`
    Finished,
}

impl RunState {
    /// Infer the state from the flags of every tracked element
    pub fn from_flags<'a>(flags: impl IntoIterator<Item = Option<&'a str>>) -> Self {
        let mut seen = false;
        for flag in flags {
            if flag == Some("true") {
                return Self::Running;
            }
            seen = true;
        }
        if seen {
            Self::Finished
        } else {
            Self::NotStarted
        }
    }

    /// Attribute form: `"true"`, `"false"` or absent
    #[must_use]
    pub const fn raw(self) -> Option<&'static str> {
        match self {
            Self::NotStarted => None,
            Self::Running => Some("true"),
            Self::Finished => Some("false"),
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotStarted => "not started",
            Self::Running => "running",
            Self::Finished => "finished",
        };
        f.write_str(s)
    }
}

/// Polls the run state shown by a tracked locator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStatePoller {
    tracked: Locator,
}

impl RunStatePoller {
    /// Track the elements matched by `tracked`
    #[must_use]
    pub const fn new(tracked: Locator) -> Self {
        Self { tracked }
    }

    /// The tracked locator
    #[must_use]
    pub const fn tracked(&self) -> &Locator {
        &self.tracked
    }

    /// Sample the current state once
    pub async fn poll(&self, driver: &dyn StudioDriver) -> StudioResult<RunState> {
        let elements = self.tracked.resolve(driver).await?;
        Ok(RunState::from_flags(
            elements.iter().map(|el| el.attribute(RUNNING_ATTRIBUTE)),
        ))
    }

    /// Sample once and feed the observation to a monitor
    pub async fn poll_monitored(
        &self,
        driver: &dyn StudioDriver,
        monitor: &mut RunStateMonitor,
    ) -> StudioResult<RunState> {
        let state = self.poll(driver).await?;
        monitor.observe(state)?;
        Ok(state)
    }

    /// Wait until the state equals `target`
    pub async fn wait_until_state(
        &self,
        driver: &dyn StudioDriver,
        target: RunState,
        options: &WaitOptions,
    ) -> StudioResult<RunState> {
        let description = format!("{} to be {target}", self.tracked);
        await_condition(&description, options, move || self.poll(driver), |s| *s == target).await
    }

    /// Best-effort wait for the job to report running.
    ///
    /// Fast jobs may finish before a sample sees them running, so a timeout
    /// is logged and reported as `false`. Other errors propagate.
    pub async fn wait_for_started(
        &self,
        driver: &dyn StudioDriver,
        options: &WaitOptions,
    ) -> StudioResult<bool> {
        match self
            .wait_until_state(driver, RunState::Running, options)
            .await
        {
            Ok(_) => Ok(true),
            Err(err) if err.is_timeout() => {
                tracing::warn!(tracked = %self.tracked, error = %err, "run never observed as started");
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    /// Mandatory wait for the job to finish
    pub async fn wait_for_finished(
        &self,
        driver: &dyn StudioDriver,
        options: &WaitOptions,
    ) -> StudioResult<()> {
        self.wait_until_state(driver, RunState::Finished, options)
            .await
            .map(|_| ())
    }

    /// Sample the state together with the prerequisite banner
    pub async fn sample_with_banner(
        &self,
        driver: &dyn StudioDriver,
        banner: &Locator,
    ) -> StudioResult<JobSample> {
        let state = self.poll(driver).await?;
        let prereq_error = if banner.is_visible(driver).await? {
            Some(banner.text(driver).await?.unwrap_or_default())
        } else {
            None
        };
        Ok(JobSample {
            state,
            prereq_error,
        })
    }

    /// Best-effort wait for the job to report running, ending early when
    /// `banner` rejects it.
    ///
    /// Returns `None` when neither happened within the budget.
    pub async fn wait_for_started_or_rejected(
        &self,
        driver: &dyn StudioDriver,
        banner: &Locator,
        options: &WaitOptions,
    ) -> StudioResult<Option<JobSample>> {
        let description = format!("{} to start", self.tracked);
        let started = await_condition(
            &description,
            options,
            move || self.sample_with_banner(driver, banner),
            JobSample::is_started,
        )
        .await;
        match started {
            Ok(sample) => Ok(Some(sample)),
            Err(err) if err.is_timeout() => {
                tracing::warn!(tracked = %self.tracked, error = %err, "run never observed as started");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}

/// Run state and prerequisite banner sampled together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSample {
    /// Run state
    pub state: RunState,
    /// Banner text, when shown
    pub prereq_error: Option<String>,
}

impl JobSample {
    /// Running, or rejected before it could run
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.state == RunState::Running || self.prereq_error.is_some()
    }

    /// Finished, or rejected
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.state == RunState::Finished || self.prereq_error.is_some()
    }
}

/// Records observed run states and rejects a restart nobody triggered
#[derive(Debug, Clone, Default)]
pub struct RunStateMonitor {
    observed: Vec<RunState>,
    finished_since_trigger: bool,
}

impl RunStateMonitor {
    /// Create an empty monitor
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A new run was triggered; `Running` may be observed again
    pub fn mark_triggered(&mut self) {
        self.finished_since_trigger = false;
    }

    /// Record an observation
    pub fn observe(&mut self, state: RunState) -> StudioResult<()> {
        if state == RunState::Running && self.finished_since_trigger {
            return Err(StudioError::invalid_state(
                "run reported running again after finishing without a new trigger",
            ));
        }
        if state == RunState::Finished {
            self.finished_since_trigger = true;
        }
        self.observed.push(state);
        Ok(())
    }

    /// Observations in order
    #[must_use]
    pub fn observed(&self) -> &[RunState] {
        &self.observed
    }

    /// Most recent observation
    #[must_use]
    pub fn last(&self) -> Option<RunState> {
        self.observed.last().copied()
    }
}
