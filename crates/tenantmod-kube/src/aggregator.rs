//! Deployment status aggregation
//!
//! Probes every candidate selector of a module, merges the matched workloads
//! and derives one [`ModuleStatus`] from the summed replica counts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use tenantmod_core::{CandidateSelector, ModuleStatus, ReplicaState, derive_status};

use crate::cluster::{ClusterApi, WorkloadKind, WorkloadSummary};

/// Consolidated health of one module in one namespace
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleHealth {
    pub module: String,
    pub namespace: String,
    pub status: ModuleStatus,
    pub replicas: ReplicaState,
    pub workloads: Vec<WorkloadSummary>,
    /// Selectors that contributed at least one workload
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matched_by: Vec<String>,
    /// Query failures, in selector order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    pub checked_at: DateTime<Utc>,
}

impl ModuleHealth {
    /// First query error, if any
    pub fn error(&self) -> Option<&str> {
        self.errors.first().map(String::as_str)
    }
}

/// Merges workload queries into module health
#[derive(Debug, Clone, Default)]
pub struct StatusAggregator;

impl StatusAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Query every selector and derive the module's health
    ///
    /// Lower-priority selectors are always queried and merged. Only when every
    /// query fails is the result `Unknown`.
    pub async fn aggregate<C: ClusterApi + ?Sized>(
        &self,
        cluster: &C,
        namespace: &str,
        module: &str,
        selectors: &[CandidateSelector],
    ) -> ModuleHealth {
        let mut seen: HashSet<(WorkloadKind, String)> = HashSet::new();
        let mut workloads = Vec::new();
        let mut matched_by = Vec::new();
        let mut errors = Vec::new();
        let mut failed = 0usize;

        for candidate in selectors {
            let found = match cluster.list_workloads(namespace, &candidate.selector).await {
                Ok(found) => found,
                Err(e) => {
                    tracing::warn!(
                        namespace,
                        module,
                        selector = %candidate.selector,
                        error = %e,
                        "workload query failed"
                    );
                    errors.push(format!("{}: {}", candidate.selector, e));
                    failed += 1;
                    continue;
                }
            };

            let mut contributed = false;
            for workload in found {
                if !candidate.accepts(&workload.name) {
                    continue;
                }
                if seen.insert((workload.kind, workload.name.clone())) {
                    workloads.push(workload);
                    contributed = true;
                }
            }

            tracing::debug!(
                namespace,
                module,
                selector = %candidate,
                contributed,
                "probed selector"
            );
            if contributed {
                matched_by.push(candidate.selector.clone());
            }
        }

        let mut replicas = ReplicaState::default();
        for workload in &workloads {
            replicas.add(workload.desired_replicas, workload.ready_replicas);
        }

        let status = if !selectors.is_empty() && failed == selectors.len() {
            ModuleStatus::Unknown
        } else {
            derive_status(workloads.len(), replicas)
        };

        ModuleHealth {
            module: module.to_string(),
            namespace: namespace.to_string(),
            status,
            replicas,
            workloads,
            matched_by,
            errors,
            checked_at: Utc::now(),
        }
    }
}
