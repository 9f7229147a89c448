//! Check-deps command - verify a module selection is closed under dependencies

use console::style;

use crate::error::{CliError, Result};
use crate::util::{self, GlobalPaths};

/// Run the check-deps command
pub fn run(paths: &GlobalPaths, modules: &[String]) -> Result<()> {
    let config = util::load_config(paths)?;
    let catalog = util::load_catalog(&config)?;

    let selected: Vec<&str> = modules.iter().map(String::as_str).collect();
    let missing = catalog.validate_dependencies(&selected);

    if missing.is_empty() {
        println!(
            "{} {} module(s), all dependencies satisfied",
            style("✓").green(),
            selected.len()
        );
        return Ok(());
    }

    for message in &missing {
        eprintln!("  {} {}", style("✗").red(), message);
    }
    Err(CliError::DependencyCheck {
        count: missing.len(),
    })
}
