//! Release orchestration: upgrade-or-install and uninstall of one module release

use serde::Serialize;

use tenantmod_core::{ModuleDefinition, ReleaseRecord, SetOverrides, TenantNamespace, Timeouts};

use crate::artifacts::ArtifactStore;
use crate::cluster::ClusterApi;
use crate::error::{PlatformError, Result};
use crate::release_manager::{
    ReleaseFailure, ReleaseManager, ReleaseOutput, UninstallRequest, UpgradeInstallRequest,
};

/// Result of a successful upgrade-or-install
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallOutcome {
    pub record: ReleaseRecord,
    pub output: ReleaseOutput,
    /// Leftover hook Jobs deleted before installing
    pub removed_hook_jobs: Vec<String>,
}

/// Result of a successful uninstall
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UninstallOutcome {
    pub record: ReleaseRecord,
    pub output: Option<ReleaseOutput>,
    /// The release manager had no such release
    pub already_absent: bool,
}

/// Drives the release manager for one module at a time
///
/// Failures are classified and returned; retrying is the caller's decision.
pub struct ReleaseOrchestrator<R, A> {
    release_manager: R,
    artifacts: A,
    timeouts: Timeouts,
}

impl<R: ReleaseManager, A: ArtifactStore> ReleaseOrchestrator<R, A> {
    pub fn new(release_manager: R, artifacts: A, timeouts: Timeouts) -> Self {
        Self {
            release_manager,
            artifacts,
            timeouts,
        }
    }

    pub fn release_manager(&self) -> &R {
        &self.release_manager
    }

    /// Upgrade-or-install the module's release
    ///
    /// Overrides are layered: namespace and module identity, then the
    /// catalog's `helmValues`, then `overrides` (later wins).
    pub async fn install<C: ClusterApi + ?Sized>(
        &self,
        cluster: &C,
        module: &ModuleDefinition,
        namespace: &TenantNamespace,
        tier: &str,
        overrides: &SetOverrides,
    ) -> Result<InstallOutcome> {
        let record = ReleaseRecord::new(&module.name, namespace)?;

        let chart = self.artifacts.chart(module)?;
        let values = self
            .artifacts
            .resolve_values(module, namespace.environment())?;

        let removed_hook_jobs = self.remove_hook_jobs(cluster, module, namespace).await;

        let mut set = identity_overrides(module, namespace, tier);
        set.extend_from_json(&serde_json::Value::Object(module.helm_values.clone()));
        set.extend(overrides);

        let request = UpgradeInstallRequest {
            release_name: record.release_name.clone(),
            namespace: namespace.to_string(),
            chart,
            values,
            overrides: set,
            timeout: self.timeouts.install,
        };

        tracing::info!(
            release = %record.release_name,
            chart = %request.chart.display(),
            "upgrading release"
        );

        match self.release_manager.upgrade_install(&request).await {
            Ok(output) => Ok(InstallOutcome {
                record,
                output,
                removed_hook_jobs,
            }),
            Err(failure) => Err(match failure {
                ReleaseFailure::TimedOut { output } => PlatformError::DeploymentTimedOut {
                    release: record.release_name,
                    timeout: self.timeouts.install,
                    output,
                },
                ReleaseFailure::Locked { output } => PlatformError::OperationInProgress {
                    release: record.release_name,
                    output,
                },
                ReleaseFailure::NotFound { output } | ReleaseFailure::Failed { output } => {
                    PlatformError::DeploymentFailed {
                        release: record.release_name,
                        output,
                    }
                }
            }),
        }
    }

    /// Uninstall the module's release; a missing release is success
    pub async fn uninstall(
        &self,
        module: &ModuleDefinition,
        namespace: &TenantNamespace,
    ) -> Result<UninstallOutcome> {
        let record = ReleaseRecord::new(&module.name, namespace)?;
        let request = UninstallRequest {
            release_name: record.release_name.clone(),
            namespace: namespace.to_string(),
            timeout: self.timeouts.uninstall,
        };

        tracing::info!(release = %record.release_name, "uninstalling release");

        match self.release_manager.uninstall(&request).await {
            Ok(output) => Ok(UninstallOutcome {
                record,
                output: Some(output),
                already_absent: false,
            }),
            Err(ReleaseFailure::NotFound { output }) => {
                tracing::info!(release = %record.release_name, "release already absent");
                Ok(UninstallOutcome {
                    record,
                    output: Some(ReleaseOutput::new("", output)),
                    already_absent: true,
                })
            }
            Err(ReleaseFailure::TimedOut { output }) => Err(PlatformError::DeploymentTimedOut {
                release: record.release_name,
                timeout: self.timeouts.uninstall,
                output,
            }),
            Err(ReleaseFailure::Locked { output }) => Err(PlatformError::OperationInProgress {
                release: record.release_name,
                output,
            }),
            Err(ReleaseFailure::Failed { output }) => Err(PlatformError::UndeploymentFailed {
                release: record.release_name,
                output,
            }),
        }
    }

    /// Delete hook Jobs a previous run left behind; failures are only logged
    async fn remove_hook_jobs<C: ClusterApi + ?Sized>(
        &self,
        cluster: &C,
        module: &ModuleDefinition,
        namespace: &TenantNamespace,
    ) -> Vec<String> {
        let mut removed = Vec::new();
        for job in &module.hook_jobs {
            match cluster.delete_job(namespace.as_str(), job).await {
                Ok(true) => {
                    tracing::debug!(job, namespace = %namespace, "deleted leftover hook job");
                    removed.push(job.clone());
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(job, namespace = %namespace, error = %e, "could not delete hook job");
                }
            }
        }
        removed
    }
}

/// Namespace, tenant and module identity passed to every chart
pub fn identity_overrides(
    module: &ModuleDefinition,
    namespace: &TenantNamespace,
    tier: &str,
) -> SetOverrides {
    let mut set = SetOverrides::new();
    set.set("global.namespace", namespace.as_str());
    set.set("namespace", namespace.as_str());
    set.set("tenant.name", namespace.tenant());
    set.set("tenant.environment", namespace.environment());
    set.set("tenant.tier", tier);
    set.set("module.name", module.name.as_str());
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockCluster, MockReleaseManager};
    use tempfile::TempDir;
    use tenantmod_core::ModuleCatalog;

    use crate::artifacts::ChartDirectory;

    const CATALOG: &str = r#"
modules:
  spark:
    chartPath: data-lake
    hookJobs: [data-lake-init]
    helmValues:
      spark:
        enabled: true
      minio:
        enabled: false
"#;

    fn fixture() -> (TempDir, ModuleDefinition, TenantNamespace) {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("data-lake/helm")).unwrap();
        std::fs::write(
            dir.path().join("data-lake/helm/values.yaml"),
            "workers: 2\n",
        )
        .unwrap();

        let catalog = ModuleCatalog::from_yaml(CATALOG).unwrap();
        let spark = catalog.get("spark").unwrap().clone();
        (dir, spark, TenantNamespace::new("acme", "dev").unwrap())
    }

    #[tokio::test]
    async fn test_install_layers_overrides() {
        let (dir, spark, ns) = fixture();
        let cluster = MockCluster::new()
            .with_namespace("acme-dev")
            .with_job("acme-dev", "data-lake-init");
        let manager = MockReleaseManager::new();
        let orchestrator =
            ReleaseOrchestrator::new(manager.clone(), ChartDirectory::new(dir.path()), Timeouts::default());

        let mut caller = SetOverrides::new();
        caller.set("minio.enabled", "true");

        let outcome = orchestrator
            .install(&cluster, &spark, &ns, "gold", &caller)
            .await
            .unwrap();

        assert_eq!(outcome.record.release_name, "acme-dev-spark");
        assert_eq!(outcome.removed_hook_jobs, vec!["data-lake-init"]);
        assert!(cluster.jobs("acme-dev").is_empty());

        let installs = manager.installs();
        assert_eq!(installs.len(), 1);
        let request = &installs[0];
        assert_eq!(request.namespace, "acme-dev");
        assert_eq!(request.chart, dir.path().join("data-lake/helm"));
        assert_eq!(request.values.get("workers").unwrap(), 2);
        assert_eq!(request.overrides.get("tenant.tier"), Some("gold"));
        assert_eq!(request.overrides.get("tenant.name"), Some("acme"));
        assert_eq!(request.overrides.get("spark.enabled"), Some("true"));
        // caller override beats catalog helmValues
        assert_eq!(request.overrides.get("minio.enabled"), Some("true"));
    }

    #[tokio::test]
    async fn test_install_failure_classification() {
        let (dir, spark, ns) = fixture();
        let cluster = MockCluster::new().with_namespace("acme-dev");
        let manager = MockReleaseManager::new();
        let orchestrator =
            ReleaseOrchestrator::new(manager.clone(), ChartDirectory::new(dir.path()), Timeouts::default());

        manager.fail_next_install(ReleaseFailure::TimedOut {
            output: "timed out waiting for the condition".to_string(),
        });
        let err = orchestrator
            .install(&cluster, &spark, &ns, "bronze", &SetOverrides::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PlatformError::DeploymentTimedOut { .. }));

        manager.fail_next_install(ReleaseFailure::Locked {
            output: "another operation (install/upgrade/rollback) is in progress".to_string(),
        });
        let err = orchestrator
            .install(&cluster, &spark, &ns, "bronze", &SetOverrides::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PlatformError::OperationInProgress { .. }));

        manager.fail_next_install(ReleaseFailure::Failed {
            output: "Error: template: spark/templates/master.yaml:12: nil pointer".to_string(),
        });
        let err = orchestrator
            .install(&cluster, &spark, &ns, "bronze", &SetOverrides::new())
            .await
            .unwrap_err();
        assert_eq!(
            err.release_output(),
            Some("Error: template: spark/templates/master.yaml:12: nil pointer")
        );
    }

    #[tokio::test]
    async fn test_hook_job_failure_is_not_fatal() {
        let (dir, spark, ns) = fixture();
        let cluster = MockCluster::new().with_namespace("acme-dev");
        let manager = MockReleaseManager::new();
        let orchestrator =
            ReleaseOrchestrator::new(manager.clone(), ChartDirectory::new(dir.path()), Timeouts::default());

        // no such job: nothing removed, install proceeds
        let outcome = orchestrator
            .install(&cluster, &spark, &ns, "bronze", &SetOverrides::new())
            .await
            .unwrap();
        assert!(outcome.removed_hook_jobs.is_empty());
        assert_eq!(manager.operation_counts().installs, 1);
    }

    #[tokio::test]
    async fn test_uninstall_not_found_is_success() {
        let (dir, spark, ns) = fixture();
        let manager = MockReleaseManager::new();
        let orchestrator =
            ReleaseOrchestrator::new(manager.clone(), ChartDirectory::new(dir.path()), Timeouts::default());

        let outcome = orchestrator.uninstall(&spark, &ns).await.unwrap();
        assert!(outcome.already_absent);

        manager.fail_next_uninstall(ReleaseFailure::Failed {
            output: "Error: failed to delete release".to_string(),
        });
        let err = orchestrator.uninstall(&spark, &ns).await.unwrap_err();
        assert!(matches!(err, PlatformError::UndeploymentFailed { .. }));
    }

    #[test]
    fn test_identity_overrides() {
        let (_dir, spark, ns) = fixture();
        let set = identity_overrides(&spark, &ns, "silver");
        assert_eq!(
            set.to_args(),
            vec![
                "global.namespace=acme-dev",
                "namespace=acme-dev",
                "tenant.name=acme",
                "tenant.environment=dev",
                "tenant.tier=silver",
                "module.name=spark",
            ]
        );
    }
}
