//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Studio Probador: list and run end-to-end scenarios against the API tooling studio
#[derive(Parser, Debug)]
#[command(name = "studio-probador")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Emit log lines as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Configuration file (YAML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List available scenarios
    List(ListArgs),

    /// Run scenarios against the studio
    Run(RunArgs),

    /// Show or create the configuration file
    Config(ConfigArgs),
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Only scenarios carrying one of these tags
    #[arg(short, long)]
    pub tag: Vec<String>,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the run command
#[derive(Parser, Debug)]
#[allow(clippy::struct_excessive_bools)]
pub struct RunArgs {
    /// Only scenarios carrying one of these tags
    #[arg(short, long)]
    pub tag: Vec<String>,

    /// Only scenarios whose name contains this text
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Named environment from the configuration file
    #[arg(short, long)]
    pub env: Option<String>,

    /// Concurrent workers, each with its own browser context
    #[arg(short = 'j', long)]
    pub workers: Option<usize>,

    /// Extra attempts for a failed scenario
    #[arg(short, long)]
    pub retries: Option<u32>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Print scenario reports as JSON
    #[arg(long)]
    pub json: bool,

    /// Stop scheduling scenarios after the first failure
    #[arg(long)]
    pub fail_fast: bool,

    /// Artifacts directory (overrides the configuration file)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Config action
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Print the effective configuration as YAML
    Show {
        /// Apply a named environment first
        #[arg(short, long)]
        env: Option<String>,
    },

    /// Write a default configuration file
    Init {
        /// Destination
        #[arg(default_value = crate::config::DEFAULT_CONFIG_FILE)]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Color choice argument
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum ColorArg {
    /// Detect from the terminal
    #[default]
    Auto,
    /// Always color
    Always,
    /// Never color
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
