//! Output formatting and progress reporting

use console::{style, Style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use studio_probar::{Reporter, Scenario, ScenarioReport, ScenarioStatus};

/// Counts shown in the run summary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryCounts {
    /// Scenarios that passed
    pub passed: usize,
    /// Scenarios that failed
    pub failed: usize,
    /// Scenarios never run, or with nothing to check
    pub skipped: usize,
    /// Scenarios that passed on retry
    pub flaky: usize,
}

impl SummaryCounts {
    /// Counts of a finished run; `not_run` were never picked up
    #[must_use]
    pub fn new(reporter: &Reporter, not_run: usize) -> Self {
        Self {
            passed: reporter.passed_count(),
            failed: reporter.failed_count(),
            skipped: reporter.skipped_count() + not_run,
            flaky: reporter.flaky_count(),
        }
    }

    /// Every selected scenario
    #[must_use]
    pub const fn total(&self) -> usize {
        self.passed + self.failed + self.skipped
    }
}

/// Progress reporter for scenario runs
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    progress_bar: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            progress_bar: None,
            use_color,
            quiet,
        }
    }

    /// Start a progress bar
    pub fn start_progress(&mut self, total: u64, message: &str) {
        if self.quiet {
            return;
        }

        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb.set_message(message.to_string());
        self.progress_bar = Some(pb);
    }

    /// Increment progress
    pub fn increment(&self, delta: u64) {
        if let Some(ref pb) = self.progress_bar {
            pb.inc(delta);
        }
    }

    /// Finish progress bar
    pub fn finish(&self) {
        if let Some(ref pb) = self.progress_bar {
            pb.finish_and_clear();
        }
    }

    fn line(&self, message: &str) {
        match self.progress_bar {
            Some(ref pb) => pb.println(message),
            None => {
                let _ = self.term.write_line(message);
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("✓").green().bold().to_string()
        } else {
            "PASS".to_string()
        };
        self.line(&format!("{prefix} {message}"));
    }

    /// Print a failure message
    pub fn failure(&self, message: &str) {
        // Failures print even in quiet mode
        let prefix = if self.use_color {
            style("✗").red().bold().to_string()
        } else {
            "FAIL".to_string()
        };
        self.line(&format!("{prefix} {message}"));
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("⚠").yellow().bold().to_string()
        } else {
            "WARN".to_string()
        };
        self.line(&format!("{prefix} {message}"));
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }

        let prefix = if self.use_color {
            style("ℹ").blue().bold().to_string()
        } else {
            "INFO".to_string()
        };
        self.line(&format!("{prefix} {message}"));
    }

    /// Print a section header
    pub fn header(&self, title: &str) {
        if self.quiet {
            return;
        }

        let styled = if self.use_color {
            style(title).bold().underlined().to_string()
        } else {
            format!("=== {title} ===")
        };

        let _ = self.term.write_line("");
        let _ = self.term.write_line(&styled);
    }

    /// Print one finished scenario
    pub fn scenario_finished(&self, report: &ScenarioReport) {
        let timing = format_duration(Duration::from_millis(report.duration_ms));
        match report.status {
            ScenarioStatus::Passed => {
                let retried = if report.is_flaky() {
                    format!(", passed on attempt {}", report.attempts)
                } else {
                    String::new()
                };
                self.success(&format!("{} ({timing}{retried})", report.scenario));
            }
            ScenarioStatus::Skipped => self.info(&format!(
                "{} skipped ({timing}): {}",
                report.scenario,
                report.error.as_deref().unwrap_or("not run")
            )),
            ScenarioStatus::Failed => self.failure(&format!(
                "{} ({timing}): {}",
                report.scenario,
                report.error.as_deref().unwrap_or("unknown error")
            )),
        }
    }

    /// Print the run summary
    pub fn summary(&self, reporter: &Reporter, not_run: usize, elapsed: Duration) {
        let counts = SummaryCounts::new(reporter, not_run);
        let SummaryCounts {
            passed,
            failed,
            skipped,
            flaky,
        } = counts;
        if self.quiet && failed == 0 {
            return;
        }

        let total = counts.total();
        let secs = elapsed.as_secs_f64();
        let _ = self.term.write_line("");

        if self.use_color {
            let passed_style = Style::new().green().bold();
            let failed_style = Style::new().red().bold();
            let skipped_style = Style::new().yellow();

            let status = if failed > 0 {
                failed_style.apply_to("FAILED")
            } else {
                passed_style.apply_to("PASSED")
            };

            let _ = self.term.write_line(&format!(
                "{} {} scenarios in {:.2}s ({} passed, {} failed, {} skipped, {} flaky)",
                status,
                total,
                secs,
                passed_style.apply_to(passed),
                if failed > 0 {
                    failed_style.apply_to(failed).to_string()
                } else {
                    failed.to_string()
                },
                skipped_style.apply_to(skipped),
                flaky
            ));
        } else {
            let status = if failed > 0 { "FAILED" } else { "PASSED" };
            let _ = self.term.write_line(&format!(
                "{status} {total} scenarios in {secs:.2}s ({passed} passed, {failed} failed, {skipped} skipped, {flaky} flaky)"
            ));
        }
    }
}

/// Format a duration as `850ms` or `2.40s`
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    if duration < Duration::from_secs(1) {
        format!("{}ms", duration.as_millis())
    } else {
        format!("{:.2}s", duration.as_secs_f64())
    }
}

/// One line per scenario: name, tags, description
#[must_use]
pub fn render_scenario_list(scenarios: &[Scenario]) -> String {
    let width = scenarios.iter().map(|s| s.name.len()).max().unwrap_or(0);
    let mut out = String::new();
    for scenario in scenarios {
        out.push_str(&format!(
            "{:<width$}  [{}]  {}\n",
            scenario.name,
            scenario.tags.join(", "),
            scenario.description
        ));
    }
    out
}

/// Scenarios as a JSON array of `{name, tags, description}`
///
/// # Errors
///
/// Returns error if serialization fails
pub fn scenario_list_json(scenarios: &[Scenario]) -> serde_json::Result<String> {
    let entries: Vec<serde_json::Value> = scenarios
        .iter()
        .map(|s| {
            serde_json::json!({
                "name": s.name,
                "tags": s.tags,
                "description": s.description,
            })
        })
        .collect();
    serde_json::to_string_pretty(&entries)
}
