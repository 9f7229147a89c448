//! In-memory cluster and release manager for testing
//!
//! [`MockCluster`] stores workloads and auxiliary resources per namespace and
//! evaluates equality label selectors. [`MockReleaseManager`] records calls,
//! replays scripted failures and, when attached to a cluster, creates or
//! removes the release's workloads the way a real install would.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tenantmod_core::selector::INSTANCE_LABEL_KEY;

use crate::cluster::{ClusterApi, ResourceKind, ResourceSummary, WorkloadSummary};
use crate::error::{PlatformError, Result};
use crate::release_manager::{
    ReleaseFailure, ReleaseManager, ReleaseOutput, UninstallRequest, UpgradeInstallRequest,
};

#[derive(Default)]
struct ClusterState {
    namespaces: HashSet<String>,
    workloads: HashMap<String, Vec<WorkloadSummary>>,
    resources: HashMap<(String, ResourceKind), Vec<ResourceSummary>>,
    jobs: HashMap<String, HashSet<String>>,
    unreachable: bool,
    failing_selectors: HashSet<String>,
    failing_deletes: HashSet<ResourceKind>,
}

/// In-memory [`ClusterApi`]
#[derive(Clone, Default)]
pub struct MockCluster {
    state: Arc<RwLock<ClusterState>>,
    operations: Arc<RwLock<ClusterCounts>>,
}

/// Counts of cluster calls for testing assertions
#[derive(Debug, Default, Clone)]
pub struct ClusterCounts {
    pub workload_lists: usize,
    pub namespace_checks: usize,
    pub job_deletes: usize,
    pub resource_lists: usize,
    pub resource_deletes: usize,
}

impl MockCluster {
    /// Create an empty cluster with no namespaces
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespace(self, namespace: &str) -> Self {
        self.state
            .write()
            .unwrap()
            .namespaces
            .insert(namespace.to_string());
        self
    }

    pub fn with_workload(self, namespace: &str, workload: WorkloadSummary) -> Self {
        self.add_workload(namespace, workload);
        self
    }

    pub fn with_resource(self, namespace: &str, kind: ResourceKind, resource: ResourceSummary) -> Self {
        self.state
            .write()
            .unwrap()
            .resources
            .entry((namespace.to_string(), kind))
            .or_default()
            .push(resource);
        self
    }

    pub fn with_job(self, namespace: &str, name: &str) -> Self {
        self.state
            .write()
            .unwrap()
            .jobs
            .entry(namespace.to_string())
            .or_default()
            .insert(name.to_string());
        self
    }

    /// Add or replace a workload (identity is kind and name)
    pub fn add_workload(&self, namespace: &str, workload: WorkloadSummary) {
        let mut state = self.state.write().unwrap();
        let workloads = state.workloads.entry(namespace.to_string()).or_default();
        workloads.retain(|w| w.key() != workload.key());
        workloads.push(workload);
    }

    /// Remove every workload carrying `key=value`
    pub fn remove_workloads_labelled(&self, namespace: &str, key: &str, value: &str) -> usize {
        let mut state = self.state.write().unwrap();
        let Some(workloads) = state.workloads.get_mut(namespace) else {
            return 0;
        };
        let before = workloads.len();
        workloads.retain(|w| w.labels.get(key).map(String::as_str) != Some(value));
        before - workloads.len()
    }

    /// Make every call fail with `ClusterUnreachable`
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state.write().unwrap().unreachable = unreachable;
    }

    /// Make queries for one selector fail
    pub fn fail_selector(&self, selector: &str) {
        self.state
            .write()
            .unwrap()
            .failing_selectors
            .insert(selector.to_string());
    }

    /// Make deletions of one resource kind fail
    pub fn fail_deletes(&self, kind: ResourceKind) {
        self.state.write().unwrap().failing_deletes.insert(kind);
    }

    pub fn workloads(&self, namespace: &str) -> Vec<WorkloadSummary> {
        self.state
            .read()
            .unwrap()
            .workloads
            .get(namespace)
            .cloned()
            .unwrap_or_default()
    }

    pub fn resources(&self, namespace: &str, kind: ResourceKind) -> Vec<String> {
        self.state
            .read()
            .unwrap()
            .resources
            .get(&(namespace.to_string(), kind))
            .map(|r| r.iter().map(|r| r.name.clone()).collect())
            .unwrap_or_default()
    }

    pub fn jobs(&self, namespace: &str) -> Vec<String> {
        let state = self.state.read().unwrap();
        let mut jobs: Vec<String> = state
            .jobs
            .get(namespace)
            .map(|j| j.iter().cloned().collect())
            .unwrap_or_default();
        jobs.sort();
        jobs
    }

    /// Get operation counts for assertions
    pub fn operation_counts(&self) -> ClusterCounts {
        self.operations.read().unwrap().clone()
    }

    /// Reset operation counts
    pub fn reset_counts(&self) {
        *self.operations.write().unwrap() = ClusterCounts::default();
    }

    fn check_reachable(&self, namespace: &str) -> Result<()> {
        if self.state.read().unwrap().unreachable {
            return Err(PlatformError::ClusterUnreachable {
                namespace: namespace.to_string(),
                message: "connection refused".to_string(),
            });
        }
        Ok(())
    }
}

/// Evaluate a comma-separated list of `k=v`, `k==v` and `k!=v` requirements
pub fn selector_matches(selector: &str, labels: &BTreeMap<String, String>) -> bool {
    selector
        .split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .all(|requirement| {
            if let Some((key, value)) = requirement.split_once("!=") {
                labels.get(key.trim()).map(String::as_str) != Some(value.trim())
            } else if let Some((key, value)) = requirement
                .split_once("==")
                .or_else(|| requirement.split_once('='))
            {
                labels.get(key.trim()).map(String::as_str) == Some(value.trim())
            } else {
                labels.contains_key(requirement)
            }
        })
}

#[async_trait]
impl ClusterApi for MockCluster {
    async fn list_workloads(&self, namespace: &str, selector: &str) -> Result<Vec<WorkloadSummary>> {
        self.operations.write().unwrap().workload_lists += 1;
        self.check_reachable(namespace)?;

        let state = self.state.read().unwrap();
        if state.failing_selectors.contains(selector) {
            return Err(PlatformError::ClusterUnreachable {
                namespace: namespace.to_string(),
                message: format!("query for '{}' failed", selector),
            });
        }

        Ok(state
            .workloads
            .get(namespace)
            .map(|workloads| {
                workloads
                    .iter()
                    .filter(|w| selector_matches(selector, &w.labels))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn namespace_exists(&self, namespace: &str) -> Result<bool> {
        self.operations.write().unwrap().namespace_checks += 1;
        self.check_reachable(namespace)?;
        Ok(self.state.read().unwrap().namespaces.contains(namespace))
    }

    async fn delete_job(&self, namespace: &str, name: &str) -> Result<bool> {
        self.operations.write().unwrap().job_deletes += 1;
        self.check_reachable(namespace)?;
        let mut state = self.state.write().unwrap();
        Ok(state
            .jobs
            .get_mut(namespace)
            .map(|jobs| jobs.remove(name))
            .unwrap_or(false))
    }

    async fn list_resources(
        &self,
        namespace: &str,
        kind: ResourceKind,
    ) -> Result<Vec<ResourceSummary>> {
        self.operations.write().unwrap().resource_lists += 1;
        self.check_reachable(namespace)?;
        Ok(self
            .state
            .read()
            .unwrap()
            .resources
            .get(&(namespace.to_string(), kind))
            .cloned()
            .unwrap_or_default())
    }

    async fn delete_resource(
        &self,
        namespace: &str,
        kind: ResourceKind,
        name: &str,
    ) -> Result<bool> {
        self.operations.write().unwrap().resource_deletes += 1;
        self.check_reachable(namespace)?;

        let mut state = self.state.write().unwrap();
        if state.failing_deletes.contains(&kind) {
            return Err(PlatformError::ClusterUnreachable {
                namespace: namespace.to_string(),
                message: format!("{} '{}' is forbidden", kind, name),
            });
        }

        let Some(resources) = state.resources.get_mut(&(namespace.to_string(), kind)) else {
            return Ok(false);
        };
        let before = resources.len();
        resources.retain(|r| r.name != name);
        Ok(resources.len() < before)
    }
}

#[derive(Default)]
struct ReleaseState {
    installs: Vec<UpgradeInstallRequest>,
    install_failures: VecDeque<ReleaseFailure>,
    uninstall_failures: VecDeque<ReleaseFailure>,
    apply_on_failure: bool,
    latency: Duration,
    /// namespace -> release names
    releases: HashMap<String, HashSet<String>>,
}

/// In-memory [`ReleaseManager`]
#[derive(Clone, Default)]
pub struct MockReleaseManager {
    state: Arc<RwLock<ReleaseState>>,
    operations: Arc<RwLock<ReleaseCounts>>,
    cluster: Option<MockCluster>,
    chart_workloads: Vec<WorkloadSummary>,
}

/// Counts of release manager calls for testing assertions
#[derive(Debug, Default, Clone)]
pub struct ReleaseCounts {
    pub installs: usize,
    pub uninstalls: usize,
}

impl MockReleaseManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply installs and uninstalls to `cluster`
    ///
    /// A successful install creates `workloads`, labelled with the release's
    /// instance label. Uninstall removes everything carrying that label.
    pub fn attached_to(cluster: &MockCluster, workloads: Vec<WorkloadSummary>) -> Self {
        Self {
            cluster: Some(cluster.clone()),
            chart_workloads: workloads,
            ..Self::default()
        }
    }

    /// Fail the next install with `failure`
    pub fn fail_next_install(&self, failure: ReleaseFailure) {
        self.state
            .write()
            .unwrap()
            .install_failures
            .push_back(failure);
    }

    /// Create the chart's workloads even when a scripted install failure fires
    pub fn apply_on_failure(&self) {
        self.state.write().unwrap().apply_on_failure = true;
    }

    /// Delay every install and uninstall by `latency` before it takes effect
    pub fn set_latency(&self, latency: Duration) {
        self.state.write().unwrap().latency = latency;
    }

    /// Fail the next uninstall with `failure`
    pub fn fail_next_uninstall(&self, failure: ReleaseFailure) {
        self.state
            .write()
            .unwrap()
            .uninstall_failures
            .push_back(failure);
    }

    pub fn installs(&self) -> Vec<UpgradeInstallRequest> {
        self.state.read().unwrap().installs.clone()
    }

    pub fn has_release(&self, namespace: &str, release_name: &str) -> bool {
        self.state
            .read()
            .unwrap()
            .releases
            .get(namespace)
            .is_some_and(|r| r.contains(release_name))
    }

    /// Get operation counts for assertions
    pub fn operation_counts(&self) -> ReleaseCounts {
        self.operations.read().unwrap().clone()
    }

    fn apply(&self, request: &UpgradeInstallRequest) {
        let Some(cluster) = &self.cluster else {
            return;
        };
        for workload in &self.chart_workloads {
            cluster.add_workload(
                &request.namespace,
                workload
                    .clone()
                    .with_label(INSTANCE_LABEL_KEY, &request.release_name),
            );
        }
    }
}

#[async_trait]
impl ReleaseManager for MockReleaseManager {
    async fn upgrade_install(
        &self,
        request: &UpgradeInstallRequest,
    ) -> std::result::Result<ReleaseOutput, ReleaseFailure> {
        self.operations.write().unwrap().installs += 1;

        let latency = {
            let mut state = self.state.write().unwrap();
            state.installs.push(request.clone());
            state.latency
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let (failure, apply_on_failure) = {
            let mut state = self.state.write().unwrap();
            (state.install_failures.pop_front(), state.apply_on_failure)
        };
        if let Some(failure) = failure {
            if apply_on_failure {
                self.apply(request);
            }
            return Err(failure);
        }

        let upgraded = {
            let mut state = self.state.write().unwrap();
            !state
                .releases
                .entry(request.namespace.clone())
                .or_default()
                .insert(request.release_name.clone())
        };
        self.apply(request);

        let verb = if upgraded { "has been upgraded" } else { "has been installed" };
        Ok(ReleaseOutput::new(
            format!("Release \"{}\" {}. Happy Helming!", request.release_name, verb),
            "",
        ))
    }

    async fn uninstall(
        &self,
        request: &UninstallRequest,
    ) -> std::result::Result<ReleaseOutput, ReleaseFailure> {
        self.operations.write().unwrap().uninstalls += 1;

        let latency = self.state.read().unwrap().latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let (failure, known) = {
            let mut state = self.state.write().unwrap();
            let failure = state.uninstall_failures.pop_front();
            let known = state
                .releases
                .get_mut(&request.namespace)
                .map(|r| r.remove(&request.release_name))
                .unwrap_or(false);
            (failure, known)
        };
        if let Some(failure) = failure {
            return Err(failure);
        }

        let removed = self
            .cluster
            .as_ref()
            .map(|c| {
                c.remove_workloads_labelled(&request.namespace, INSTANCE_LABEL_KEY, &request.release_name)
            })
            .unwrap_or(0);

        if !known && removed == 0 {
            return Err(ReleaseFailure::NotFound {
                output: format!(
                    "Error: uninstall: Release not loaded: {}: release: not found",
                    request.release_name
                ),
            });
        }

        Ok(ReleaseOutput::new(
            format!("release \"{}\" uninstalled", request.release_name),
            "",
        ))
    }
}
