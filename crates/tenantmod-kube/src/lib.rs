//! tenantmod Kube - Kubernetes integration for the tenant module platform
//!
//! This crate provides:
//! - **Cluster Status Reader**: bounded workload queries behind the `ClusterApi` trait
//! - **Status Aggregation**: merges selector matches into one module health
//! - **Release Orchestration**: upgrade-or-install and uninstall through a `ReleaseManager`
//! - **Cleanup Planning**: tiered removal of resources a release leaves behind
//! - **Lifecycle Control**: idempotent enable/disable with bounded settle polling
//! - **Mocks**: in-memory cluster and release manager for tests

pub mod actions;
pub mod aggregator;
pub mod artifacts;
pub mod cleanup;
pub mod cluster;
pub mod controller;
pub mod error;
pub mod helm;
pub mod mock;
pub mod orchestrator;
pub mod release_manager;

pub use actions::{DisableOptions, EnableOptions};
pub use aggregator::{ModuleHealth, StatusAggregator};
pub use artifacts::{ArtifactStore, ChartDirectory};
pub use cleanup::{CleanupAction, CleanupOutcome, CleanupPlan, CleanupPlanner, CleanupReport};
pub use cluster::{
    ClusterApi, KubeCluster, ResourceKind, ResourceSummary, WorkloadKind, WorkloadSummary,
};
pub use controller::{
    DisableAction, DisableResult, EnableAction, EnableResult, LifecycleController,
};
pub use error::{Operation, PlatformError, Result};
pub use helm::HelmCli;
pub use mock::{ClusterCounts, MockCluster, MockReleaseManager, ReleaseCounts};
pub use orchestrator::{InstallOutcome, ReleaseOrchestrator, UninstallOutcome};
pub use release_manager::{
    ReleaseFailure, ReleaseManager, ReleaseOutput, UninstallRequest, UpgradeInstallRequest,
};

pub use tokio_util::sync::CancellationToken;
