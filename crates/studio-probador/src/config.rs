//! CLI configuration

use crate::error::{CliError, CliResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use studio_probar::StudioConfig;

/// File read when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "studio-probar.yaml";

/// CLI verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Verbosity {
    /// Quiet - minimal output
    Quiet,
    /// Normal - default output
    #[default]
    Normal,
    /// Verbose - extra output
    Verbose,
    /// Debug - maximum output
    Debug,
}

impl Verbosity {
    /// From `-v` count and `-q`
    #[must_use]
    pub const fn from_flags(verbose: u8, quiet: bool) -> Self {
        if quiet {
            return Self::Quiet;
        }
        match verbose {
            0 => Self::Normal,
            1 => Self::Verbose,
            _ => Self::Debug,
        }
    }

    /// Check if quiet mode
    #[must_use]
    pub const fn is_quiet(self) -> bool {
        matches!(self, Self::Quiet)
    }

    /// Check if verbose or higher
    #[must_use]
    pub const fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose | Self::Debug)
    }
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorChoice {
    /// Always use colors
    Always,
    /// Use colors when output is a terminal
    #[default]
    Auto,
    /// Never use colors
    Never,
}

impl ColorChoice {
    /// Should use colors based on output detection
    #[must_use]
    pub fn should_color(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => console::Term::stdout().features().colors_supported(),
        }
    }
}

/// Presentation settings of the CLI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Verbosity level
    pub verbosity: Verbosity,
    /// Color output choice
    pub color: ColorChoice,
}

impl CliConfig {
    /// Create new default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set verbosity
    #[must_use]
    pub const fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set color choice
    #[must_use]
    pub const fn with_color(mut self, color: ColorChoice) -> Self {
        self.color = color;
        self
    }
}

/// Load the studio configuration
///
/// An explicit path must exist. Without one, [`DEFAULT_CONFIG_FILE`] in the
/// working directory is used when present, defaults otherwise. The named
/// environment is applied last.
///
/// # Errors
///
/// Returns error if the file cannot be loaded or the environment is unknown
pub fn load_studio_config(path: Option<&Path>, env: Option<&str>) -> CliResult<StudioConfig> {
    let config = match path {
        Some(path) => {
            if !path.exists() {
                return Err(CliError::config(format!(
                    "configuration file not found: {}",
                    path.display()
                )));
            }
            StudioConfig::load(path)?
        }
        None => {
            let fallback = Path::new(DEFAULT_CONFIG_FILE);
            if fallback.exists() {
                StudioConfig::load(fallback)?
            } else {
                tracing::debug!("no configuration file, using defaults");
                StudioConfig::default()
            }
        }
    };
    match env {
        Some(name) => Ok(config.with_environment(name)?),
        None => Ok(config),
    }
}
