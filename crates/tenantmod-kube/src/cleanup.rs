//! Resource cleanup after uninstall
//!
//! The release manager only removes what it rendered. Volume claims created
//! from StatefulSet templates outlive the release, as do operator-created
//! secrets, custom resources and finished Jobs. The planner selects them by
//! name pattern per [`CleanupTier`], and execution removes them action by
//! action.

use serde::Serialize;

use tenantmod_core::{CleanupTier, ModuleDefinition, TenantNamespace};

use crate::cluster::{ClusterApi, ResourceKind, ResourceSummary};

const SERVICE_ACCOUNT_TOKEN_TYPE: &str = "kubernetes.io/service-account-token";
const ROOT_CA_CONFIGMAP: &str = "kube-root-ca.crt";
const DEFAULT_SERVICE_ACCOUNT: &str = "default";

/// Removal of every resource of one kind whose name matches a pattern
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupAction {
    pub kind: ResourceKind,
    /// Substrings; a resource is selected if its name contains any of them
    pub patterns: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exclude_names: Vec<String>,
    /// Secret types that are never removed
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exclude_types: Vec<String>,
}

impl CleanupAction {
    fn new(kind: ResourceKind, patterns: &[String]) -> Self {
        Self {
            kind,
            patterns: patterns.to_vec(),
            exclude_names: Vec::new(),
            exclude_types: Vec::new(),
        }
    }

    fn excluding_name(mut self, name: &str) -> Self {
        self.exclude_names.push(name.to_string());
        self
    }

    fn excluding_type(mut self, resource_type: &str) -> Self {
        self.exclude_types.push(resource_type.to_string());
        self
    }

    /// Whether this action removes `resource`
    pub fn selects(&self, resource: &ResourceSummary) -> bool {
        if self.exclude_names.iter().any(|n| n == &resource.name) {
            return false;
        }
        if let Some(t) = &resource.resource_type
            && self.exclude_types.iter().any(|x| x == t)
        {
            return false;
        }
        self.patterns.iter().any(|p| resource.name.contains(p.as_str()))
    }
}

/// Ordered cleanup actions for one module
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupPlan {
    pub module: String,
    pub namespace: String,
    pub tier: CleanupTier,
    pub actions: Vec<CleanupAction>,
    /// Executing the plan deletes persistent data
    pub destructive: bool,
}

impl CleanupPlan {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn kinds(&self) -> Vec<ResourceKind> {
        self.actions.iter().map(|a| a.kind).collect()
    }
}

/// What one action removed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupOutcome {
    pub kind: Option<ResourceKind>,
    pub removed: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl CleanupOutcome {
    pub fn succeeded(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Per-action outcomes of an executed plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupReport {
    pub tier: CleanupTier,
    pub destructive: bool,
    pub outcomes: Vec<CleanupOutcome>,
}

impl CleanupReport {
    pub fn removed_count(&self) -> usize {
        self.outcomes.iter().map(|o| o.removed.len()).sum()
    }

    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(|o| !o.succeeded())
    }
}

/// Builds and executes cleanup plans
#[derive(Debug, Clone, Default)]
pub struct CleanupPlanner;

impl CleanupPlanner {
    pub fn new() -> Self {
        Self
    }

    /// Plan the removals for `tier`. Pure.
    pub fn plan(
        &self,
        module: &ModuleDefinition,
        namespace: &TenantNamespace,
        tier: CleanupTier,
    ) -> CleanupPlan {
        let mut patterns = vec![module.name.to_string()];
        patterns.extend(module.co_resident.iter().map(|m| m.to_string()));

        let mut actions = Vec::new();
        if tier >= CleanupTier::PvcsOnly {
            actions.push(CleanupAction::new(
                ResourceKind::PersistentVolumeClaim,
                &patterns,
            ));
        }
        if tier >= CleanupTier::Full {
            actions.push(
                CleanupAction::new(ResourceKind::Secret, &patterns)
                    .excluding_type(SERVICE_ACCOUNT_TOKEN_TYPE),
            );
            actions.push(
                CleanupAction::new(ResourceKind::ConfigMap, &patterns)
                    .excluding_name(ROOT_CA_CONFIGMAP),
            );
            actions.push(
                CleanupAction::new(ResourceKind::ServiceAccount, &patterns)
                    .excluding_name(DEFAULT_SERVICE_ACCOUNT),
            );
            for kind in [
                ResourceKind::Role,
                ResourceKind::RoleBinding,
                ResourceKind::NetworkPolicy,
                ResourceKind::Ingress,
                ResourceKind::KafkaTopic,
                ResourceKind::KafkaUser,
                ResourceKind::Issuer,
                ResourceKind::Job,
            ] {
                actions.push(CleanupAction::new(kind, &patterns));
            }
        }

        CleanupPlan {
            module: module.name.to_string(),
            namespace: namespace.to_string(),
            tier,
            destructive: !actions.is_empty(),
            actions,
        }
    }

    /// Run every action; failures are recorded per action, never propagated
    pub async fn execute<C: ClusterApi + ?Sized>(
        &self,
        cluster: &C,
        plan: &CleanupPlan,
    ) -> CleanupReport {
        let mut outcomes = Vec::with_capacity(plan.actions.len());

        for action in &plan.actions {
            let mut outcome = CleanupOutcome {
                kind: Some(action.kind),
                ..Default::default()
            };

            let resources = match cluster.list_resources(&plan.namespace, action.kind).await {
                Ok(resources) => resources,
                Err(e) => {
                    tracing::warn!(kind = %action.kind, namespace = %plan.namespace, error = %e, "cleanup listing failed");
                    outcome.errors.push(e.to_string());
                    outcomes.push(outcome);
                    continue;
                }
            };

            for resource in resources.iter().filter(|r| action.selects(r)) {
                match cluster
                    .delete_resource(&plan.namespace, action.kind, &resource.name)
                    .await
                {
                    Ok(true) => outcome.removed.push(resource.name.clone()),
                    Ok(false) => {}
                    Err(e) => {
                        tracing::warn!(
                            kind = %action.kind,
                            name = %resource.name,
                            error = %e,
                            "cleanup deletion failed"
                        );
                        outcome.errors.push(format!("{}: {}", resource.name, e));
                    }
                }
            }

            if !outcome.removed.is_empty() {
                tracing::info!(
                    kind = %action.kind,
                    namespace = %plan.namespace,
                    count = outcome.removed.len(),
                    "removed leftover resources"
                );
            }
            outcomes.push(outcome);
        }

        CleanupReport {
            tier: plan.tier,
            destructive: plan.destructive,
            outcomes,
        }
    }
}
