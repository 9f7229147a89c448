//! Enable command - install a module into a tenant namespace

use console::style;

use tenantmod_kube::{CancellationToken, EnableAction, EnableOptions};

use crate::display;
use crate::error::Result;
use crate::util::{self, GlobalPaths};

/// Run the enable command
#[allow(clippy::too_many_arguments)]
pub async fn run(
    paths: &GlobalPaths,
    tenant: &str,
    module: &str,
    environment: Option<&str>,
    tier: Option<&str>,
    set: &[String],
    attempts: u32,
    output_json: bool,
    cancel: &CancellationToken,
) -> Result<()> {
    let overrides = util::parse_overrides(set)?;
    let config = util::load_config(paths)?;
    let controller = util::connect(&config).await?;

    let mut options = EnableOptions::new(tenant, module)
        .with_overrides(overrides)
        .with_attempts(attempts);
    if let Some(environment) = environment {
        options = options.with_environment(environment);
    }
    if let Some(tier) = tier {
        options = options.with_tier(tier);
    }

    if !output_json {
        println!(
            "{} Enabling {} for tenant {}",
            style("→").blue().bold(),
            style(module).cyan(),
            style(tenant).yellow()
        );
    }

    let result = controller.enable(&options, cancel).await?;

    if output_json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    for warning in &result.warnings {
        println!("{} {}", style("⚠").yellow(), warning);
    }
    for job in &result.removed_hook_jobs {
        println!("  {} removed stale hook job {}", style("-").dim(), job);
    }

    match result.action {
        EnableAction::AlreadyRunning => println!(
            "{} {} is already running in {}",
            style("✓").green(),
            style(module).cyan(),
            style(&result.release.namespace).yellow()
        ),
        EnableAction::Installed => println!(
            "{} Release {} deployed ({} → {})",
            style("✓").green().bold(),
            style(&result.release.release_name).cyan(),
            result.previous,
            display::styled_status(result.health.status)
        ),
    }

    if !result.health.status.is_running() {
        println!(
            "  {} not yet running; check with `tenantmod status {} {}`",
            style("⚠").yellow(),
            tenant,
            module
        );
    }

    Ok(())
}
