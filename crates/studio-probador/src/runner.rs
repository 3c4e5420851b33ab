//! Scenario runner
//!
//! Scenarios are queued and pulled by `workers` tokio tasks. Every attempt
//! gets a fresh driver from a [`DriverSource`], so workers share nothing
//! mutable; finished reports flow back over a channel to the [`Reporter`].

use crate::error::CliResult;
use crate::output::ProgressReporter;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use studio_probar::{
    ArtifactStore, Reporter, Scenario, ScenarioReport, StudioBrowser, StudioConfig, StudioContext,
    StudioDriver, StudioResult,
};
use tokio::sync::{mpsc, Mutex};

/// File name of the suite report
pub const SUMMARY_FILE: &str = "summary.json";

/// File name of the JUnit report
pub const JUNIT_FILE: &str = "junit.xml";

/// Hands out one isolated driver per scenario attempt
#[async_trait]
pub trait DriverSource: Send + Sync + 'static {
    /// Driver type
    type Driver: StudioDriver + 'static;

    /// Open a driver in a fresh browser context
    async fn open(&self) -> StudioResult<Self::Driver>;

    /// Dispose a driver once its attempt is over
    async fn release(&self, driver: Self::Driver);
}

/// [`DriverSource`] backed by one launched browser
#[derive(Debug)]
pub struct BrowserSource {
    browser: StudioBrowser,
}

impl BrowserSource {
    /// Launch the browser described by the configuration
    ///
    /// # Errors
    ///
    /// Returns error if the browser cannot be launched
    pub async fn launch(config: &StudioConfig) -> StudioResult<Self> {
        let browser = StudioBrowser::launch(config.browser.clone()).await?;
        Ok(Self { browser })
    }

    /// Close the browser
    ///
    /// # Errors
    ///
    /// Returns error if the browser does not shut down cleanly
    pub async fn close(self) -> StudioResult<()> {
        self.browser.close().await
    }
}

#[async_trait]
impl DriverSource for BrowserSource {
    type Driver = studio_probar::ChromiumDriver;

    async fn open(&self) -> StudioResult<Self::Driver> {
        self.browser.new_driver().await
    }

    async fn release(&self, driver: Self::Driver) {
        self.browser.release(driver).await;
    }
}

/// Outcome of a suite run
#[derive(Debug)]
pub struct RunSummary {
    /// Collected reports
    pub reporter: Reporter,
    /// Scenarios never started because of fail-fast
    pub skipped: usize,
    /// Wall time
    pub elapsed: Duration,
}

/// Runs scenarios on concurrent workers
#[derive(Debug)]
pub struct ScenarioRunner<S: DriverSource> {
    source: Arc<S>,
    config: Arc<StudioConfig>,
    fail_fast: bool,
    progress: ProgressReporter,
}

impl<S: DriverSource> ScenarioRunner<S> {
    /// Create a runner
    #[must_use]
    pub fn new(source: S, config: StudioConfig, progress: ProgressReporter) -> Self {
        Self {
            source: Arc::new(source),
            config: Arc::new(config),
            fail_fast: false,
            progress,
        }
    }

    /// Stop scheduling scenarios after the first failure
    #[must_use]
    pub const fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Effective configuration
    #[must_use]
    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    /// Give back the driver source
    #[must_use]
    pub fn into_source(self) -> Arc<S> {
        self.source
    }

    /// Run the scenarios and write `summary.json` and `junit.xml`
    ///
    /// # Errors
    ///
    /// Returns error if the artifacts directory or the suite reports cannot
    /// be written
    pub async fn run(&mut self, scenarios: Vec<Scenario>) -> CliResult<RunSummary> {
        let started = Instant::now();
        let mut reporter = if self.fail_fast {
            Reporter::fail_fast()
        } else {
            Reporter::new()
        };
        std::fs::create_dir_all(&self.config.artifacts_dir)?;

        let total = scenarios.len();
        if total == 0 {
            self.progress.warning("No scenarios selected");
            return Ok(RunSummary {
                reporter,
                skipped: 0,
                elapsed: started.elapsed(),
            });
        }

        let workers = self.config.workers.clamp(1, total);
        self.progress.header("Running scenarios");
        self.progress.start_progress(total as u64, "");
        tracing::info!(scenarios = total, workers, retries = self.config.retries, "starting run");

        let queue = Arc::new(Mutex::new(VecDeque::from(scenarios)));
        let stop = Arc::new(AtomicBool::new(false));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut handles = Vec::with_capacity(workers);
        for worker in 0..workers {
            let queue = queue.clone();
            let stop = stop.clone();
            let tx = tx.clone();
            let source = self.source.clone();
            let config = self.config.clone();
            let fail_fast = self.fail_fast;
            handles.push(tokio::spawn(async move {
                loop {
                    if stop.load(Ordering::SeqCst) {
                        break;
                    }
                    let Some(scenario) = queue.lock().await.pop_front() else {
                        break;
                    };
                    tracing::debug!(worker, scenario = scenario.name, "picked scenario");
                    let report = run_scenario(source.as_ref(), &config, scenario).await;
                    if fail_fast && report.status.is_failed() {
                        stop.store(true, Ordering::SeqCst);
                    }
                    if tx.send(report).is_err() {
                        break;
                    }
                }
            }));
        }
        drop(tx);

        while let Some(report) = rx.recv().await {
            self.progress.scenario_finished(&report);
            self.progress.increment(1);
            if let Err(err) = reporter.record(report) {
                self.progress.warning(&err.to_string());
            }
        }
        for handle in handles {
            if let Err(err) = handle.await {
                tracing::error!(error = %err, "worker task failed");
            }
        }
        self.progress.finish();

        let skipped = total.saturating_sub(reporter.total_count());
        self.write_suite_reports(&reporter)?;
        Ok(RunSummary {
            reporter,
            skipped,
            elapsed: started.elapsed(),
        })
    }

    fn write_suite_reports(&self, reporter: &Reporter) -> CliResult<()> {
        let dir = &self.config.artifacts_dir;
        let summary = dir.join(SUMMARY_FILE);
        reporter.write_json(&summary)?;
        reporter.generate_junit(&dir.join(JUNIT_FILE))?;
        tracing::info!(path = %summary.display(), "wrote suite report");
        Ok(())
    }
}

/// Run one scenario with retries and write its `report.json`
pub async fn run_scenario<S: DriverSource>(
    source: &S,
    config: &Arc<StudioConfig>,
    scenario: Scenario,
) -> ScenarioReport {
    let mut report = ScenarioReport::new(scenario.name, scenario.tags);
    let artifacts = match ArtifactStore::create(&config.artifacts_dir, scenario.name) {
        Ok(artifacts) => artifacts,
        Err(err) => {
            report.finish_attempt(&Err(err), Duration::ZERO);
            return report;
        }
    };

    for attempt in 0..=config.retries {
        let started = Instant::now();
        let (outcome, returned) = attempt_once(source, config, &artifacts, scenario, report).await;
        report = returned;
        report.finish_attempt(&outcome, started.elapsed());
        match outcome {
            Ok(()) => break,
            Err(err) if err.is_nothing_to_check() => {
                tracing::info!(scenario = scenario.name, reason = %err, "nothing to check");
                break;
            }
            Err(err) if attempt < config.retries => {
                tracing::warn!(scenario = scenario.name, attempt = attempt + 1, error = %err, "retrying");
            }
            Err(_) => {}
        }
    }

    if let Err(err) = artifacts.write_report(&report) {
        tracing::warn!(scenario = scenario.name, error = %err, "could not write scenario report");
    }
    report
}

async fn attempt_once<S: DriverSource>(
    source: &S,
    config: &Arc<StudioConfig>,
    artifacts: &ArtifactStore,
    scenario: Scenario,
    report: ScenarioReport,
) -> (StudioResult<()>, ScenarioReport) {
    let driver = match source.open().await {
        Ok(driver) => Arc::new(driver),
        Err(err) => return (Err(err), report),
    };
    let shared: Arc<dyn StudioDriver> = driver.clone();
    let mut ctx = StudioContext::new(shared, config.clone(), artifacts.clone(), report);
    let outcome = (scenario.run)(&mut ctx).await;
    let report = ctx.into_report();

    match Arc::try_unwrap(driver) {
        Ok(driver) => source.release(driver).await,
        Err(_) => tracing::warn!(scenario = scenario.name, "driver still referenced; not released"),
    }
    (outcome, report)
}

/// Path of the suite report inside an artifacts directory
#[must_use]
pub fn summary_path(artifacts_dir: &Path) -> PathBuf {
    artifacts_dir.join(SUMMARY_FILE)
}
