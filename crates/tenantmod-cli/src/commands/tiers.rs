//! Tiers command - list resource tiers

use console::style;

use crate::error::Result;
use crate::util::{self, GlobalPaths};

/// Run the tiers command
pub fn run(paths: &GlobalPaths, output_json: bool) -> Result<()> {
    let config = util::load_config(paths)?;
    let catalog = util::load_catalog(&config)?;

    if output_json {
        println!("{}", serde_json::to_string_pretty(catalog.tiers())?);
        return Ok(());
    }

    if catalog.tiers().is_empty() {
        println!("{}", style("No resource tiers defined").dim());
        return Ok(());
    }

    for (key, tier) in catalog.tiers() {
        let marker = if key == &config.defaults.tier {
            style(" (default)").dim().to_string()
        } else {
            String::new()
        };
        println!("{}{}", style(key).cyan().bold(), marker);
        if !tier.description.is_empty() {
            println!("  {}", tier.description);
        }
        for (resource, quantity) in &tier.resource_quota {
            println!("  {:<24} {}", resource, quantity);
        }
    }

    Ok(())
}
