//! Modules command - list the module catalog

use console::style;

use tenantmod_core::ModuleDefinition;

use crate::error::{CliError, Result};
use crate::util::{self, GlobalPaths};

/// Run the modules command
pub fn run(paths: &GlobalPaths, category: Option<&str>, output_json: bool) -> Result<()> {
    let config = util::load_config(paths)?;
    let catalog = util::load_catalog(&config)?;

    if let Some(category) = category
        && catalog.category(category).is_none()
        && catalog.by_category(category).next().is_none()
    {
        return Err(CliError::validation(format!(
            "unknown category '{}'",
            category
        )));
    }

    let modules: Vec<&ModuleDefinition> = match category {
        Some(category) => catalog.by_category(category).collect(),
        None => catalog.modules().collect(),
    };

    if output_json {
        println!("{}", serde_json::to_string_pretty(&modules)?);
        return Ok(());
    }

    if modules.is_empty() {
        println!("{}", style("No modules in catalog").dim());
        return Ok(());
    }

    println!(
        "{:<20} {:<16} {:<10} {}",
        "NAME", "CATEGORY", "VERSION", "DESCRIPTION"
    );
    for module in &modules {
        println!(
            "{:<20} {:<16} {:<10} {}",
            style(module.name.as_str()).cyan(),
            module.category,
            module.version,
            module.description
        );
        if !module.dependencies.is_empty() {
            let deps: Vec<&str> = module.dependencies.iter().map(|d| d.as_str()).collect();
            println!("{:<20} {}", "", style(format!("requires {}", deps.join(", "))).dim());
        }
    }

    Ok(())
}
