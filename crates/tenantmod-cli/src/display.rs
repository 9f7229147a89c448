//! Display formatting for CLI output
//!
//! Provides structured display for:
//! - Module health with status colors
//! - Cleanup reports grouped by resource kind

use console::{StyledObject, style};

use tenantmod_core::ModuleStatus;
use tenantmod_kube::{CleanupReport, ModuleHealth};

/// Status label colored by severity
pub fn styled_status(status: ModuleStatus) -> StyledObject<String> {
    let label = status.to_string();
    match status {
        ModuleStatus::Running => style(label).green(),
        ModuleStatus::Degraded | ModuleStatus::Pending => style(label).yellow(),
        ModuleStatus::Failed => style(label).red(),
        ModuleStatus::Unknown => style(label).red().bold(),
        ModuleStatus::NotDeployed => style(label).dim(),
    }
}

/// Print one module's health as a section
pub fn print_health(health: &ModuleHealth) {
    println!("{}", style("MODULE STATUS").bold().underlined());
    println!("  Module:     {}", style(&health.module).cyan());
    println!("  Namespace:  {}", style(&health.namespace).yellow());
    println!("  Status:     {}", styled_status(health.status));
    if health.status.is_deployed() {
        println!(
            "  Replicas:   {}/{}",
            health.replicas.ready, health.replicas.desired
        );
    }
    println!(
        "  Checked:    {}",
        health.checked_at.format("%Y-%m-%d %H:%M:%S")
    );

    if !health.workloads.is_empty() {
        println!("\n{}", style("WORKLOADS").bold().underlined());
        for workload in &health.workloads {
            let ready = format!("{}/{}", workload.ready_replicas, workload.desired_replicas);
            let ready = if workload.ready_replicas >= workload.desired_replicas {
                style(ready).green()
            } else {
                style(ready).yellow()
            };
            println!(
                "  {:<12} {:<40} {}",
                workload.kind.to_string(),
                workload.name,
                ready
            );
        }
    }

    if !health.errors.is_empty() {
        println!("\n{}", style("ERRORS").bold().underlined());
        for error in &health.errors {
            println!("  {} {}", style("✗").red(), error);
        }
    }
}

/// Print a namespace overview as a table, deployed modules only unless `all`
pub fn print_overview(namespace: &str, overview: &[ModuleHealth], all: bool) {
    println!(
        "{} {}",
        style("Modules in").bold(),
        style(namespace).yellow().bold()
    );
    println!();
    println!("{:<24} {:<14} {}", "MODULE", "STATUS", "READY");

    let mut shown = 0;
    for health in overview {
        if !all && !health.status.is_deployed() {
            continue;
        }
        shown += 1;
        let ready = if health.status.is_deployed() {
            format!("{}/{}", health.replicas.ready, health.replicas.desired)
        } else {
            "-".to_string()
        };
        println!(
            "{:<24} {:<14} {}",
            health.module,
            styled_status(health.status),
            ready
        );
    }

    if shown == 0 {
        println!("{}", style("  (no modules deployed)").dim());
    }
}

/// Print what cleanup removed and what it could not
pub fn print_cleanup(report: &CleanupReport) {
    println!(
        "\n{} ({})",
        style("CLEANUP").bold().underlined(),
        report.tier
    );

    for outcome in &report.outcomes {
        let Some(kind) = outcome.kind else { continue };
        for name in &outcome.removed {
            println!("  {} {} {}", style("-").red(), kind, name);
        }
        for error in &outcome.errors {
            println!("  {} {} {}", style("✗").red(), kind, error);
        }
    }

    if report.removed_count() == 0 && !report.has_failures() {
        println!("{}", style("  nothing left to remove").dim());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_labels() {
        assert_eq!(
            styled_status(ModuleStatus::NotDeployed).force_styling(false).to_string(),
            "not-deployed"
        );
        assert_eq!(
            styled_status(ModuleStatus::Running).force_styling(false).to_string(),
            "running"
        );
    }
}
