//! Disable command - remove a module from a tenant namespace

use console::style;

use tenantmod_core::CleanupTier;
use tenantmod_kube::{CancellationToken, DisableAction, DisableOptions};

use crate::display;
use crate::error::{CliError, Result};
use crate::util::{self, GlobalPaths};

/// Run the disable command
#[allow(clippy::too_many_arguments)]
pub async fn run(
    paths: &GlobalPaths,
    tenant: &str,
    module: &str,
    environment: Option<&str>,
    cleanup: Option<CleanupTier>,
    yes: bool,
    output_json: bool,
    cancel: &CancellationToken,
) -> Result<()> {
    let config = util::load_config(paths)?;
    let cleanup = cleanup.unwrap_or(config.defaults.cleanup);

    // Checked before any cluster access
    if cleanup.is_destructive() && !yes {
        eprintln!(
            "{} Cleanup tier '{}' deletes persistent data of {}",
            style("✗").red().bold(),
            cleanup,
            style(module).cyan()
        );
        return Err(CliError::usage_with_help(
            format!("cleanup tier '{}' requires --yes", cleanup),
            "Re-run with --yes, or use --cleanup none to keep volumes and secrets",
        ));
    }

    let controller = util::connect(&config).await?;

    let mut options = DisableOptions::new(tenant, module).with_cleanup(cleanup);
    if let Some(environment) = environment {
        options = options.with_environment(environment);
    }

    if !output_json {
        println!(
            "{} Disabling {} for tenant {}",
            style("→").blue().bold(),
            style(module).cyan(),
            style(tenant).yellow()
        );
        if cleanup.is_destructive() {
            println!(
                "{} Cleanup tier '{}' will delete leftover resources",
                style("⚠").yellow(),
                cleanup
            );
        }
    }

    let result = controller.disable(&options, cancel).await?;

    if output_json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    match result.action {
        DisableAction::AlreadyAbsent => println!(
            "{} {} is not deployed in {}",
            style("✓").green(),
            style(module).cyan(),
            style(&result.release.namespace).yellow()
        ),
        DisableAction::Uninstalled => println!(
            "{} Release {} removed ({} → {})",
            style("✓").green().bold(),
            style(&result.release.release_name).cyan(),
            result.previous,
            display::styled_status(result.health.status)
        ),
    }

    if let Some(report) = &result.cleanup {
        display::print_cleanup(report);
        if report.has_failures() {
            println!(
                "\n{} some resources could not be removed; delete them manually",
                style("⚠").yellow()
            );
        }
    }

    Ok(())
}
