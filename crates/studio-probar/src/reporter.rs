//! Reporter - scenario reports and artifacts.
//!
//! ```text
//! artifacts_dir/
//! ├── summary.json                  suite Reporter
//! ├── junit.xml
//! └── exclusion-round-trip-1a2b3c4d/
//!     ├── report.json               ScenarioReport
//!     ├── run-submitted-….png       checkpoints
//!     └── exclude-row-….png         failure diagnostics
//! ```

use crate::driver::Screenshot;
use crate::result::{StudioError, StudioResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

/// Failure mode for a suite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureMode {
    /// Stop on first failed scenario
    FailFast,
    /// Run every scenario
    #[default]
    CollectAll,
}

/// Scenario result status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioStatus {
    /// Scenario passed
    Passed,
    /// Scenario failed
    Failed,
    /// Scenario was not run
    Skipped,
}

impl ScenarioStatus {
    /// Check if status is passing
    #[must_use]
    pub const fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Check if status is failing
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

/// What an attachment holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    /// Checkpoint screenshot
    Checkpoint,
    /// Screenshot captured on failure
    Failure,
}

/// File attached to a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Label, e.g. the action or transition name
    pub label: String,
    /// File path
    pub path: PathBuf,
    /// Kind
    pub kind: AttachmentKind,
    /// Capture time
    pub captured_at: DateTime<Utc>,
}

/// One log line kept in the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Time
    pub at: DateTime<Utc>,
    /// Level name
    pub level: String,
    /// Message
    pub message: String,
}

/// Report of one scenario run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    /// Unique run id
    pub id: Uuid,
    /// Scenario name
    pub scenario: String,
    /// Scenario tags
    pub tags: Vec<String>,
    /// Outcome
    pub status: ScenarioStatus,
    /// Attempts made, including retries
    pub attempts: u32,
    /// Start time
    pub started_at: DateTime<Utc>,
    /// Duration of the last attempt
    pub duration_ms: u64,
    /// Error of the last failed attempt
    pub error: Option<String>,
    /// Screenshots
    pub attachments: Vec<Attachment>,
    /// Notable events
    pub log: Vec<LogEntry>,
}

impl ScenarioReport {
    /// Start a report
    #[must_use]
    pub fn new(scenario: impl Into<String>, tags: &[&str]) -> Self {
        Self {
            id: Uuid::new_v4(),
            scenario: scenario.into(),
            tags: tags.iter().map(|t| (*t).to_string()).collect(),
            status: ScenarioStatus::Skipped,
            attempts: 0,
            started_at: Utc::now(),
            duration_ms: 0,
            error: None,
            attachments: Vec::new(),
            log: Vec::new(),
        }
    }

    /// Append a log line
    pub fn log(&mut self, level: &str, message: impl Into<String>) {
        self.log.push(LogEntry {
            at: Utc::now(),
            level: level.to_string(),
            message: message.into(),
        });
    }

    /// Attach a file
    pub fn attach(&mut self, label: impl Into<String>, path: PathBuf, kind: AttachmentKind) {
        self.attachments.push(Attachment {
            label: label.into(),
            path,
            kind,
            captured_at: Utc::now(),
        });
    }

    /// Record the outcome of one attempt
    pub fn finish_attempt(&mut self, outcome: &StudioResult<()>, duration: Duration) {
        self.attempts += 1;
        self.duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        match outcome {
            Ok(()) => {
                self.status = ScenarioStatus::Passed;
                self.error = None;
            }
            Err(err) if err.is_nothing_to_check() => {
                self.status = ScenarioStatus::Skipped;
                self.error = Some(err.to_string());
                self.log("warn", format!("attempt {} skipped: {err}", self.attempts));
            }
            Err(err) => {
                self.status = ScenarioStatus::Failed;
                self.error = Some(err.to_string());
                self.log("error", format!("attempt {} failed: {err}", self.attempts));
            }
        }
    }

    /// Passed, but only after a retry
    #[must_use]
    pub fn is_flaky(&self) -> bool {
        self.status.is_passed() && self.attempts > 1
    }

    /// Serialize as pretty JSON
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails
    pub fn to_json(&self) -> StudioResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Directory holding one scenario run's files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Create `root/<scenario>-<short id>/`
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created
    pub fn create(root: &Path, scenario: &str) -> StudioResult<Self> {
        let short = Uuid::new_v4().simple().to_string();
        let dir = root.join(format!("{}-{}", slugify(scenario), &short[..8]));
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Store rooted at an existing directory
    #[must_use]
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory path
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write a screenshot as `<label>-<uuid>.png`
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written
    pub fn save_screenshot(&self, label: &str, screenshot: &Screenshot) -> StudioResult<PathBuf> {
        let path = self
            .dir
            .join(format!("{}-{}.png", slugify(label), Uuid::new_v4().simple()));
        std::fs::write(&path, &screenshot.data)?;
        Ok(path)
    }

    /// Write `report.json`
    ///
    /// # Errors
    ///
    /// Returns error if the report cannot be serialized or written
    pub fn write_report(&self, report: &ScenarioReport) -> StudioResult<PathBuf> {
        let path = self.dir.join("report.json");
        std::fs::write(&path, report.to_json()?)?;
        Ok(path)
    }
}

/// Lower-case, dash-separated file name fragment
#[must_use]
pub fn slugify(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() {
        "artifact".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Suite reporter collecting scenario reports
///
/// ```ignore
/// let mut reporter = Reporter::new().with_name("nightly");
/// reporter.record(report)?; // Err in FailFast mode when the report failed
/// println!("{}", reporter.summary());
/// ```
#[derive(Debug, Default)]
pub struct Reporter {
    results: Vec<ScenarioReport>,
    failure_mode: FailureMode,
    suite_name: String,
}

impl Reporter {
    /// Create new reporter (CollectAll mode)
    #[must_use]
    pub fn new() -> Self {
        Self {
            suite_name: "studio scenarios".to_string(),
            ..Default::default()
        }
    }

    /// Create reporter that stops on the first failure
    #[must_use]
    pub fn fail_fast() -> Self {
        Self {
            failure_mode: FailureMode::FailFast,
            ..Self::new()
        }
    }

    /// Set suite name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.suite_name = name.into();
        self
    }

    /// Failure mode
    #[must_use]
    pub const fn failure_mode(&self) -> FailureMode {
        self.failure_mode
    }

    /// Record a scenario report
    ///
    /// # Errors
    ///
    /// In FailFast mode, returns error if the scenario failed
    pub fn record(&mut self, report: ScenarioReport) -> StudioResult<()> {
        let failure = report
            .status
            .is_failed()
            .then(|| (report.scenario.clone(), report.error.clone().unwrap_or_default()));
        self.results.push(report);

        if self.failure_mode == FailureMode::FailFast {
            if let Some((scenario, error)) = failure {
                return Err(StudioError::assertion(format!(
                    "stopping after '{scenario}' failed: {error}"
                )));
            }
        }
        Ok(())
    }

    /// Get number of passed scenarios
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.status.is_passed()).count()
    }

    /// Get number of failed scenarios
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| r.status.is_failed()).count()
    }

    /// Get number of scenarios that found nothing to check
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.status == ScenarioStatus::Skipped)
            .count()
    }

    /// Get number of scenarios that passed on retry
    #[must_use]
    pub fn flaky_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_flaky()).count()
    }

    /// Get total scenario count
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.results.len()
    }

    /// Get pass rate (0.0 to 1.0)
    #[must_use]
    pub fn pass_rate(&self) -> f64 {
        if self.results.is_empty() {
            return 1.0;
        }
        self.passed_count() as f64 / self.results.len() as f64
    }

    /// Check if all scenarios passed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed_count() == 0
    }

    /// Sum of last-attempt durations
    #[must_use]
    pub fn total_duration(&self) -> Duration {
        Duration::from_millis(self.results.iter().map(|r| r.duration_ms).sum())
    }

    /// Get scenario reports
    #[must_use]
    pub fn results(&self) -> &[ScenarioReport] {
        &self.results
    }

    /// Get failing scenarios
    #[must_use]
    pub fn failures(&self) -> Vec<&ScenarioReport> {
        self.results
            .iter()
            .filter(|r| r.status.is_failed())
            .collect()
    }

    /// Generate summary string
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{}: {}/{} passed ({:.1}%)",
            self.suite_name,
            self.passed_count(),
            self.total_count(),
            self.pass_rate() * 100.0
        )
    }

    /// Write every report as one JSON array
    ///
    /// # Errors
    ///
    /// Returns error if serialization or writing fails
    pub fn write_json(&self, output_path: &Path) -> StudioResult<()> {
        std::fs::write(output_path, serde_json::to_string_pretty(&self.results)?)?;
        Ok(())
    }

    /// Generate JUnit XML for CI integration
    ///
    /// # Errors
    ///
    /// Returns error if file writing fails
    pub fn generate_junit(&self, output_path: &Path) -> StudioResult<()> {
        std::fs::write(output_path, self.render_junit())?;
        Ok(())
    }

    /// Render JUnit XML content
    #[must_use]
    pub fn render_junit(&self) -> String {
        let mut xml = String::new();

        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        xml.push_str(&format!(
            r#"<testsuite name="{}" tests="{}" failures="{}" time="{:.3}">"#,
            escape_xml(&self.suite_name),
            self.total_count(),
            self.failed_count(),
            self.total_duration().as_secs_f64()
        ));
        xml.push('\n');

        for result in &self.results {
            xml.push_str(&format!(
                r#"  <testcase name="{}" time="{:.3}">"#,
                escape_xml(&result.scenario),
                Duration::from_millis(result.duration_ms).as_secs_f64()
            ));
            xml.push('\n');

            match (&result.status, &result.error) {
                (ScenarioStatus::Failed, Some(error)) => {
                    xml.push_str(&format!(
                        r#"    <failure message="{}">{}</failure>"#,
                        escape_xml(error),
                        escape_xml(error)
                    ));
                    xml.push('\n');
                }
                (ScenarioStatus::Skipped, Some(reason)) => {
                    xml.push_str(&format!(r#"    <skipped message="{}"/>"#, escape_xml(reason)));
                    xml.push('\n');
                }
                (ScenarioStatus::Skipped, None) => xml.push_str("    <skipped/>\n"),
                _ => {}
            }

            xml.push_str("  </testcase>\n");
        }

        xml.push_str("</testsuite>\n");
        xml
    }
}

/// Escape XML special characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
