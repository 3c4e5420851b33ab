//! Config command handler

use crate::commands::ConfigAction;
use crate::config::load_studio_config;
use crate::error::{CliError, CliResult};
use std::path::Path;
use studio_probar::{EnvironmentOverride, StudioConfig};

/// YAML of the default configuration with one sample environment
///
/// # Errors
///
/// Returns error if serialization fails
pub fn default_config_yaml() -> CliResult<String> {
    let mut config = StudioConfig::default();
    let _ = config.environments.insert(
        "staging".to_string(),
        EnvironmentOverride {
            base_url: Some("https://studio.staging.example".to_string()),
            service_url: Some("https://orders.staging.example".to_string()),
        },
    );
    Ok(config.to_yaml()?)
}

/// Execute the config command
///
/// # Errors
///
/// Returns error if the configuration cannot be loaded, or on init when
/// the file exists without `--force` or cannot be written
pub fn execute_config(config_path: Option<&Path>, action: &ConfigAction) -> CliResult<()> {
    match action {
        ConfigAction::Show { env } => {
            let config = load_studio_config(config_path, env.as_deref())?;
            print!("{}", config.to_yaml()?);
            Ok(())
        }
        ConfigAction::Init { path, force } => {
            write_default_config(path, *force)?;
            println!("Created: {}", path.display());
            Ok(())
        }
    }
}

fn write_default_config(path: &Path, force: bool) -> CliResult<()> {
    if path.exists() && !force {
        return Err(CliError::invalid_argument(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, default_config_yaml()?)?;
    Ok(())
}
