//! tenantmod CLI - enable, disable and inspect platform modules per tenant

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use tenantmod_core::CleanupTier;
use tenantmod_kube::CancellationToken;

mod commands;
mod display;
mod error;
mod exit_codes;
mod util;

use error::{CliError, Result};
use util::GlobalPaths;

#[derive(Parser)]
#[command(name = "tenantmod")]
#[command(author = "tenantmod Contributors")]
#[command(version)]
#[command(about = "Enable, disable and inspect platform modules in tenant namespaces", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (default: ~/.config/tenantmod/config.yaml)
    #[arg(long, global = true, env = "TENANTMOD_CONFIG")]
    config: Option<PathBuf>,

    /// Module catalog file (overrides the configuration)
    #[arg(long, global = true, env = "TENANTMOD_CATALOG")]
    catalog: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List catalog modules
    Modules {
        /// Only modules in this category
        #[arg(short, long)]
        category: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List resource tiers
    Tiers {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that a module selection includes all dependencies
    CheckDeps {
        /// Modules to check
        #[arg(required = true)]
        modules: Vec<String>,
    },

    /// Show live module status in a tenant namespace
    Status {
        /// Tenant name
        tenant: String,

        /// Module (all catalog modules when omitted)
        module: Option<String>,

        /// Environment (namespace is {tenant}-{env})
        #[arg(short, long)]
        env: Option<String>,

        /// Include modules that are not deployed
        #[arg(short, long)]
        all: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Install a module into a tenant namespace
    Enable {
        /// Tenant name
        tenant: String,

        /// Module name
        module: String,

        /// Environment (namespace is {tenant}-{env})
        #[arg(short, long)]
        env: Option<String>,

        /// Resource tier
        #[arg(short, long)]
        tier: Option<String>,

        /// Set values on command line (key=value)
        #[arg(long = "set")]
        set: Vec<String>,

        /// Upgrade-or-install attempts when the release manager times out
        #[arg(long, default_value_t = 1)]
        attempts: u32,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove a module from a tenant namespace
    Disable {
        /// Tenant name
        tenant: String,

        /// Module name
        module: String,

        /// Environment (namespace is {tenant}-{env})
        #[arg(short, long)]
        env: Option<String>,

        /// Leftover resources to delete: none, pvcs-only or full
        #[arg(long)]
        cleanup: Option<CleanupTier>,

        /// Confirm a cleanup tier that deletes persistent data
        #[arg(short, long)]
        yes: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    match run(cli).await {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            ExitCode::from(code as u8)
        }
    }
}

/// Diagnostics go to stderr so `--json` output stays parseable
fn init_tracing(debug: bool) {
    let default = if debug { "tenantmod=debug,tenantmod_kube=debug,warn" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(debug)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let paths = GlobalPaths {
        config: cli.config,
        catalog: cli.catalog,
    };

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling");
            on_interrupt.cancel();
        }
    });

    match cli.command {
        Commands::Modules { category, json } => {
            commands::modules::run(&paths, category.as_deref(), json)
        }

        Commands::Tiers { json } => commands::tiers::run(&paths, json),

        Commands::CheckDeps { modules } => commands::check_deps::run(&paths, &modules),

        Commands::Status {
            tenant,
            module,
            env,
            all,
            json,
        } => {
            commands::status::run(
                &paths,
                &tenant,
                module.as_deref(),
                env.as_deref(),
                all,
                json,
            )
            .await
        }

        Commands::Enable {
            tenant,
            module,
            env,
            tier,
            set,
            attempts,
            json,
        } => {
            if attempts == 0 {
                return Err(CliError::usage_with_help(
                    "--attempts must be at least 1",
                    "Use --attempts 1 to try once",
                ));
            }
            commands::enable::run(
                &paths,
                &tenant,
                &module,
                env.as_deref(),
                tier.as_deref(),
                &set,
                attempts,
                json,
                &cancel,
            )
            .await
        }

        Commands::Disable {
            tenant,
            module,
            env,
            cleanup,
            yes,
            json,
        } => {
            commands::disable::run(
                &paths,
                &tenant,
                &module,
                env.as_deref(),
                cleanup,
                yes,
                json,
                &cancel,
            )
            .await
        }
    }
}
