//! Lifecycle controller: enable, disable and status of modules per tenant namespace
//!
//! The controller holds no per-module state. Every call resolves the module
//! from the current catalog snapshot, reads the live status, and acts only
//! when the status says it must:
//!
//! - enable on a `Running` module and disable on a `NotDeployed` module are
//!   no-ops that never reach the release manager
//! - after acting, status is polled until it converges or the settle
//!   deadline passes, and the last observation is returned
//! - concurrent operations on one release are left to the release manager,
//!   whose rejection surfaces as `OperationInProgress`

use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use tenantmod_core::{
    CatalogSource, Defaults, ModuleCatalog, ModuleDefinition, ModuleStatus, PlatformConfig,
    ReleaseRecord, SettleConfig, TenantNamespace,
};

use crate::actions::{DisableOptions, EnableOptions};
use crate::aggregator::{ModuleHealth, StatusAggregator};
use crate::artifacts::ArtifactStore;
use crate::cleanup::{CleanupPlanner, CleanupReport};
use crate::cluster::ClusterApi;
use crate::error::{Operation, PlatformError, Result};
use crate::orchestrator::{InstallOutcome, ReleaseOrchestrator};
use crate::release_manager::ReleaseManager;

/// What enable did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnableAction {
    AlreadyRunning,
    Installed,
}

/// What disable did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DisableAction {
    AlreadyAbsent,
    Uninstalled,
}

/// Outcome of [`LifecycleController::enable`]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnableResult {
    pub release: ReleaseRecord,
    pub action: EnableAction,
    /// Status before acting
    pub previous: ModuleStatus,
    /// Release manager output, verbatim
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub removed_hook_jobs: Vec<String>,
    /// Dependencies that were not running when the module was installed
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Last observed health
    pub health: ModuleHealth,
}

/// Outcome of [`LifecycleController::disable`]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisableResult {
    pub release: ReleaseRecord,
    pub action: DisableAction,
    pub previous: ModuleStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// The release manager had no release although workloads were found
    pub already_absent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleanup: Option<CleanupReport>,
    pub health: ModuleHealth,
}

/// Resolved target of one operation
struct Target {
    catalog: Arc<ModuleCatalog>,
    module: ModuleDefinition,
    namespace: TenantNamespace,
    record: ReleaseRecord,
}

pub struct LifecycleController<C, R, A> {
    cluster: C,
    orchestrator: ReleaseOrchestrator<R, A>,
    catalog: Arc<CatalogSource>,
    aggregator: StatusAggregator,
    planner: CleanupPlanner,
    defaults: Defaults,
    settle: SettleConfig,
}

impl<C, R, A> LifecycleController<C, R, A>
where
    C: ClusterApi,
    R: ReleaseManager,
    A: ArtifactStore,
{
    pub fn new(
        cluster: C,
        release_manager: R,
        artifacts: A,
        catalog: Arc<CatalogSource>,
        config: &PlatformConfig,
    ) -> Self {
        Self {
            cluster,
            orchestrator: ReleaseOrchestrator::new(
                release_manager,
                artifacts,
                config.timeouts.clone(),
            ),
            catalog,
            aggregator: StatusAggregator::new(),
            planner: CleanupPlanner::new(),
            defaults: config.defaults.clone(),
            settle: config.settle.clone(),
        }
    }

    pub fn release_manager(&self) -> &R {
        self.orchestrator.release_manager()
    }

    /// Current catalog snapshot
    pub fn catalog(&self) -> Arc<ModuleCatalog> {
        self.catalog.snapshot()
    }

    /// Re-read the catalog file; later calls see the new catalog
    pub fn reload_catalog(&self) -> Result<Arc<ModuleCatalog>> {
        Ok(self.catalog.reload()?)
    }

    /// Live health of one module
    pub async fn get_status(
        &self,
        tenant: &str,
        module: &str,
        environment: Option<&str>,
    ) -> Result<ModuleHealth> {
        let environment = environment.unwrap_or(&self.defaults.environment);
        let target = self.resolve(tenant, module, environment).map_err(|e| {
            e.during(Operation::Status, module, &namespace_label(tenant, environment))
        })?;

        self.ensure_namespace(&target.namespace)
            .await
            .map_err(|e| e.during(Operation::Status, module, target.namespace.as_str()))?;

        Ok(self.observe(&target).await)
    }

    /// Live health of every catalog module in a namespace, in catalog order
    pub async fn namespace_overview(
        &self,
        tenant: &str,
        environment: Option<&str>,
    ) -> Result<Vec<ModuleHealth>> {
        let environment = environment.unwrap_or(&self.defaults.environment);
        let namespace = TenantNamespace::new(tenant, environment)?;
        self.ensure_namespace(&namespace).await?;

        let catalog = self.catalog.snapshot();
        let resolver = catalog.resolver();
        let mut overview = Vec::with_capacity(catalog.len());
        for module in catalog.modules() {
            let selectors = resolver.resolve(module, &namespace);
            overview.push(
                self.aggregator
                    .aggregate(
                        &self.cluster,
                        namespace.as_str(),
                        module.name.as_str(),
                        &selectors,
                    )
                    .await,
            );
        }
        Ok(overview)
    }

    /// Make the module run in the tenant namespace
    pub async fn enable(
        &self,
        options: &EnableOptions,
        cancel: &CancellationToken,
    ) -> Result<EnableResult> {
        let environment = options
            .environment
            .as_deref()
            .unwrap_or(&self.defaults.environment);

        self.enable_inner(options, environment, cancel)
            .await
            .map_err(|e| {
                e.during(
                    Operation::Enable,
                    &options.module,
                    &namespace_label(&options.tenant, environment),
                )
            })
    }

    async fn enable_inner(
        &self,
        options: &EnableOptions,
        environment: &str,
        cancel: &CancellationToken,
    ) -> Result<EnableResult> {
        let target = self.resolve(&options.tenant, &options.module, environment)?;
        let tier = options.tier.as_deref().unwrap_or(&self.defaults.tier);
        check_tier(&target.catalog, tier)?;

        self.ensure_namespace(&target.namespace).await?;

        let record = target.record.clone();
        let previous = self.observe(&target).await;
        match previous.status {
            ModuleStatus::Unknown => {
                return Err(PlatformError::ClusterUnreachable {
                    namespace: target.namespace.to_string(),
                    message: previous.error().unwrap_or("status unknown").to_string(),
                });
            }
            ModuleStatus::Running => {
                tracing::info!(
                    module = %target.module.name,
                    namespace = %target.namespace,
                    "module already running"
                );
                return Ok(EnableResult {
                    release: record,
                    action: EnableAction::AlreadyRunning,
                    previous: previous.status,
                    output: None,
                    removed_hook_jobs: Vec::new(),
                    warnings: Vec::new(),
                    health: previous,
                });
            }
            _ => {}
        }

        let warnings = self.dependency_warnings(&target).await;
        for warning in &warnings {
            tracing::warn!(module = %target.module.name, "{}", warning);
        }

        tracing::info!(
            module = %target.module.name,
            namespace = %target.namespace,
            previous = %previous.status,
            tier,
            "enabling module"
        );

        let outcome = self
            .install_with_retry(&target, tier, options, cancel)
            .await?;

        let health = self
            .settle(&target, |status| status.is_running(), cancel)
            .await;
        if !health.status.is_running() {
            tracing::warn!(
                module = %target.module.name,
                status = %health.status,
                "module not running after settle deadline"
            );
        }

        let (output, removed_hook_jobs) = match outcome {
            Some(outcome) => (Some(outcome.output.combined()), outcome.removed_hook_jobs),
            None => (None, Vec::new()),
        };

        Ok(EnableResult {
            release: record,
            action: EnableAction::Installed,
            previous: previous.status,
            output,
            removed_hook_jobs,
            warnings,
            health,
        })
    }

    /// Install, retrying timeouts up to `options.attempts`
    ///
    /// Returns `None` when the release manager timed out but the module is
    /// running anyway.
    async fn install_with_retry(
        &self,
        target: &Target,
        tier: &str,
        options: &EnableOptions,
        cancel: &CancellationToken,
    ) -> Result<Option<InstallOutcome>> {
        let attempts = options.attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let install = self.orchestrator.install(
                &self.cluster,
                &target.module,
                &target.namespace,
                tier,
                &options.overrides,
            );

            // Dropping the install detaches the release manager; the
            // cancellation error carries a fresh status read.
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(self.cancelled(Operation::Enable, target).await);
                }
                result = install => result,
            };

            match result {
                Ok(outcome) => return Ok(Some(outcome)),
                Err(e @ PlatformError::DeploymentTimedOut { .. }) => {
                    let health = self.observe(target).await;
                    if health.status.is_running() {
                        tracing::info!(
                            module = %target.module.name,
                            "release manager timed out but module is running"
                        );
                        return Ok(None);
                    }
                    if attempt >= attempts {
                        return Err(e);
                    }
                    tracing::warn!(
                        module = %target.module.name,
                        attempt,
                        attempts,
                        status = %health.status,
                        "install timed out, retrying"
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Remove the module from the tenant namespace
    pub async fn disable(
        &self,
        options: &DisableOptions,
        cancel: &CancellationToken,
    ) -> Result<DisableResult> {
        let environment = options
            .environment
            .as_deref()
            .unwrap_or(&self.defaults.environment);

        self.disable_inner(options, environment, cancel)
            .await
            .map_err(|e| {
                e.during(
                    Operation::Disable,
                    &options.module,
                    &namespace_label(&options.tenant, environment),
                )
            })
    }

    async fn disable_inner(
        &self,
        options: &DisableOptions,
        environment: &str,
        cancel: &CancellationToken,
    ) -> Result<DisableResult> {
        let target = self.resolve(&options.tenant, &options.module, environment)?;
        self.ensure_namespace(&target.namespace).await?;

        let record = target.record.clone();
        let previous = self.observe(&target).await;
        match previous.status {
            ModuleStatus::Unknown => {
                return Err(PlatformError::ClusterUnreachable {
                    namespace: target.namespace.to_string(),
                    message: previous.error().unwrap_or("status unknown").to_string(),
                });
            }
            ModuleStatus::NotDeployed => {
                tracing::info!(
                    module = %target.module.name,
                    namespace = %target.namespace,
                    "module not deployed"
                );
                return Ok(DisableResult {
                    release: record,
                    action: DisableAction::AlreadyAbsent,
                    previous: previous.status,
                    output: None,
                    already_absent: true,
                    cleanup: None,
                    health: previous,
                });
            }
            _ => {}
        }

        tracing::info!(
            module = %target.module.name,
            namespace = %target.namespace,
            previous = %previous.status,
            cleanup = %options.cleanup,
            "disabling module"
        );

        let uninstall = self.orchestrator.uninstall(&target.module, &target.namespace);
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(self.cancelled(Operation::Disable, &target).await);
            }
            result = uninstall => result?,
        };

        if cancel.is_cancelled() {
            return Err(self.cancelled(Operation::Disable, &target).await);
        }

        let plan = self
            .planner
            .plan(&target.module, &target.namespace, options.cleanup);
        let cleanup = if plan.is_empty() {
            None
        } else {
            Some(self.planner.execute(&self.cluster, &plan).await)
        };

        let health = self
            .settle(&target, |status| status == ModuleStatus::NotDeployed, cancel)
            .await;
        if health.status.is_deployed() {
            tracing::warn!(
                module = %target.module.name,
                status = %health.status,
                "workloads still present after settle deadline"
            );
        }

        Ok(DisableResult {
            release: record,
            action: DisableAction::Uninstalled,
            previous: previous.status,
            output: outcome.output.map(|o| o.combined()),
            already_absent: outcome.already_absent,
            cleanup,
            health,
        })
    }

    fn resolve(&self, tenant: &str, module: &str, environment: &str) -> Result<Target> {
        let namespace = TenantNamespace::new(tenant, environment)?;
        let catalog = self.catalog.snapshot();
        let module = catalog
            .get(module)
            .cloned()
            .ok_or_else(|| PlatformError::ModuleUnknown {
                module: module.to_string(),
            })?;
        let record = ReleaseRecord::new(&module.name, &namespace)?;
        Ok(Target {
            catalog,
            module,
            namespace,
            record,
        })
    }

    async fn ensure_namespace(&self, namespace: &TenantNamespace) -> Result<()> {
        if self.cluster.namespace_exists(namespace.as_str()).await? {
            Ok(())
        } else {
            Err(PlatformError::NamespaceMissing {
                namespace: namespace.to_string(),
            })
        }
    }

    async fn observe(&self, target: &Target) -> ModuleHealth {
        self.observe_module(target, &target.module).await
    }

    async fn observe_module(&self, target: &Target, module: &ModuleDefinition) -> ModuleHealth {
        let selectors = target.catalog.resolver().resolve(module, &target.namespace);
        self.aggregator
            .aggregate(
                &self.cluster,
                target.namespace.as_str(),
                module.name.as_str(),
                &selectors,
            )
            .await
    }

    /// Poll until `done` holds for the status or the settle deadline passes
    async fn settle(
        &self,
        target: &Target,
        done: impl Fn(ModuleStatus) -> bool,
        cancel: &CancellationToken,
    ) -> ModuleHealth {
        let deadline = tokio::time::Instant::now() + self.settle.deadline;
        loop {
            let health = self.observe(target).await;
            if done(health.status) || tokio::time::Instant::now() >= deadline {
                return health;
            }
            tokio::select! {
                _ = tokio::time::sleep(self.settle.interval) => {}
                _ = cancel.cancelled() => return health,
            }
        }
    }

    async fn dependency_warnings(&self, target: &Target) -> Vec<String> {
        let mut warnings = Vec::new();
        for dependency in &target.module.dependencies {
            let Some(definition) = target.catalog.get(dependency.as_str()) else {
                warnings.push(format!("dependency '{}' is not in the catalog", dependency));
                continue;
            };
            let health = self.observe_module(target, definition).await;
            if !health.status.is_running() {
                warnings.push(format!(
                    "dependency '{}' is {}",
                    dependency, health.status
                ));
            }
        }
        warnings
    }

    async fn cancelled(&self, operation: Operation, target: &Target) -> PlatformError {
        let observed = self.observe(target).await;
        tracing::warn!(
            module = %target.module.name,
            namespace = %target.namespace,
            %operation,
            status = %observed.status,
            "operation cancelled"
        );
        PlatformError::Cancelled {
            operation,
            observed: Box::new(observed),
        }
    }
}

fn namespace_label(tenant: &str, environment: &str) -> String {
    format!("{}-{}", tenant, environment)
}

fn check_tier(catalog: &ModuleCatalog, tier: &str) -> Result<()> {
    if catalog.tiers().is_empty() || catalog.tier(tier).is_some() {
        return Ok(());
    }
    let available: Vec<&str> = catalog.tiers().keys().map(String::as_str).collect();
    Err(PlatformError::UnknownTier {
        tier: tier.to_string(),
        available: available.join(", "),
    })
}
