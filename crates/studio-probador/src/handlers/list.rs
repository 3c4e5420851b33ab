//! List command handler

use crate::commands::ListArgs;
use crate::error::CliResult;
use crate::output::{render_scenario_list, scenario_list_json};
use studio_probar::{catalog, select};

/// Render the selected scenarios as text or JSON
///
/// # Errors
///
/// Returns error if JSON serialization fails
pub fn render_list(args: &ListArgs) -> CliResult<String> {
    let scenarios = select(&catalog(), &args.tag, None);
    if args.json {
        Ok(scenario_list_json(&scenarios)?)
    } else {
        Ok(render_scenario_list(&scenarios))
    }
}

/// Execute the list command
///
/// # Errors
///
/// Returns error if JSON serialization fails
pub fn execute_list(args: &ListArgs) -> CliResult<()> {
    let rendered = render_list(args)?;
    if rendered.trim().is_empty() || rendered.trim() == "[]" {
        eprintln!("No scenarios match tags: {}", args.tag.join(", "));
    }
    print!("{rendered}");
    if args.json {
        println!();
    }
    Ok(())
}
