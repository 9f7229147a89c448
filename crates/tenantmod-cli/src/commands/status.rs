//! Status command - show live module health in a tenant namespace

use crate::display;
use crate::error::Result;
use crate::util::{self, GlobalPaths};

/// Run the status command
///
/// With a module, shows that module's health. Without one, shows every
/// deployed catalog module in the namespace (`all` includes the rest).
pub async fn run(
    paths: &GlobalPaths,
    tenant: &str,
    module: Option<&str>,
    environment: Option<&str>,
    all: bool,
    output_json: bool,
) -> Result<()> {
    let config = util::load_config(paths)?;
    let controller = util::connect(&config).await?;

    match module {
        Some(module) => {
            let health = controller.get_status(tenant, module, environment).await?;
            if output_json {
                println!("{}", serde_json::to_string_pretty(&health)?);
            } else {
                display::print_health(&health);
            }
        }
        None => {
            let overview = controller.namespace_overview(tenant, environment).await?;
            if output_json {
                let shown: Vec<_> = overview
                    .iter()
                    .filter(|h| all || h.status.is_deployed())
                    .collect();
                println!("{}", serde_json::to_string_pretty(&shown)?);
            } else {
                let environment = environment.unwrap_or(&config.defaults.environment);
                display::print_overview(&format!("{}-{}", tenant, environment), &overview, all);
            }
        }
    }

    Ok(())
}
