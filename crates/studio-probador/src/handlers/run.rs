//! Run command handler

use crate::commands::RunArgs;
use crate::config::{load_studio_config, CliConfig};
use crate::error::{CliError, CliResult};
use crate::output::ProgressReporter;
use crate::runner::{BrowserSource, RunSummary, ScenarioRunner};
use std::path::Path;
use std::sync::Arc;
use studio_probar::{catalog, select, Scenario, StudioConfig};

/// Fold run flags into the loaded configuration
///
/// # Errors
///
/// Returns error for zero workers or if the result does not validate
pub fn apply_run_args(mut config: StudioConfig, args: &RunArgs) -> CliResult<StudioConfig> {
    if let Some(workers) = args.workers {
        if workers == 0 {
            return Err(CliError::invalid_argument("--workers must be at least 1"));
        }
        config.workers = workers;
    }
    if let Some(retries) = args.retries {
        config.retries = retries;
    }
    if args.headed {
        config.browser.headless = false;
    }
    if let Some(ref output) = args.output {
        config.artifacts_dir.clone_from(output);
    }
    config.validate()?;
    Ok(config)
}

/// Execute the run command
///
/// # Errors
///
/// Returns error if configuration is invalid, nothing is selected, the
/// browser cannot be launched, or any scenario fails
pub fn execute_run(cli: &CliConfig, config_path: Option<&Path>, args: &RunArgs) -> CliResult<()> {
    let config = load_studio_config(config_path, args.env.as_deref())?;
    let config = apply_run_args(config, args)?;

    let scenarios = select(&catalog(), &args.tag, args.filter.as_deref());
    if scenarios.is_empty() {
        return Err(CliError::invalid_argument(
            "no scenarios match the given tags and filter",
        ));
    }

    let use_color = cli.color.should_color();
    let quiet = cli.verbosity.is_quiet() || args.json;
    let progress = ProgressReporter::new(use_color, quiet);

    let rt = tokio::runtime::Runtime::new()?;
    let summary = rt.block_on(run_suite(config, scenarios, args.fail_fast, progress))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(summary.reporter.results())?);
    } else {
        ProgressReporter::new(use_color, cli.verbosity.is_quiet()).summary(
            &summary.reporter,
            summary.skipped,
            summary.elapsed,
        );
    }

    if summary.reporter.all_passed() {
        Ok(())
    } else {
        Err(CliError::ScenariosFailed {
            failed: summary.reporter.failed_count(),
            total: summary.reporter.total_count(),
        })
    }
}

async fn run_suite(
    config: StudioConfig,
    scenarios: Vec<Scenario>,
    fail_fast: bool,
    progress: ProgressReporter,
) -> CliResult<RunSummary> {
    let source = BrowserSource::launch(&config).await?;
    let mut runner = ScenarioRunner::new(source, config, progress).with_fail_fast(fail_fast);
    let summary = runner.run(scenarios).await;

    match Arc::try_unwrap(runner.into_source()) {
        Ok(source) => {
            if let Err(err) = source.close().await {
                tracing::warn!(error = %err, "browser did not close cleanly");
            }
        }
        Err(_) => tracing::warn!("browser still referenced; not closed"),
    }
    summary
}
