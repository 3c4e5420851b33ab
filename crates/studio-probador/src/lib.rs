//! Studio Probador: command-line runner for studio end-to-end scenarios.
//!
//! `list` prints the scenario catalog, `run` executes a tag/name selection
//! on concurrent workers with retries, and `config` shows or creates the
//! YAML configuration.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
pub mod handlers;
mod output;
mod runner;

pub use commands::{Cli, ColorArg, Commands, ConfigAction, ConfigArgs, ListArgs, RunArgs};
pub use config::{load_studio_config, CliConfig, ColorChoice, Verbosity, DEFAULT_CONFIG_FILE};
pub use error::{CliError, CliResult};
pub use output::{
    format_duration, render_scenario_list, scenario_list_json, ProgressReporter, SummaryCounts,
};
pub use runner::{
    run_scenario, summary_path, BrowserSource, DriverSource, RunSummary, ScenarioRunner,
    JUNIT_FILE, SUMMARY_FILE,
};
