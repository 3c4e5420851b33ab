//! Command handlers, kept out of main.rs for testability
//!
//! Each handler module holds the execution logic for one CLI command plus
//! the pure helpers it is built from.

pub mod config;
pub mod list;
pub mod run;

pub use config::{default_config_yaml, execute_config};
pub use list::{execute_list, render_list};
pub use run::{apply_run_args, execute_run};
