//! Cluster status reader
//!
//! The [`ClusterApi`] trait is the only seam between the lifecycle core and
//! the Kubernetes API. [`KubeCluster`] implements it with bounded queries;
//! [`crate::mock::MockCluster`] implements it in memory for tests.

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::Namespace;
use kube::api::{Api, ApiResource, DeleteParams, DynamicObject, ListParams};
use kube::core::GroupVersionKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::time::Duration;

use crate::error::{PlatformError, Result};

/// Workload kinds that carry replica counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WorkloadKind {
    Deployment,
    StatefulSet,
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkloadKind::Deployment => write!(f, "Deployment"),
            WorkloadKind::StatefulSet => write!(f, "StatefulSet"),
        }
    }
}

/// Replica summary of one workload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadSummary {
    pub kind: WorkloadKind,
    pub name: String,
    pub desired_replicas: i32,
    pub ready_replicas: i32,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl WorkloadSummary {
    pub fn new(kind: WorkloadKind, name: impl Into<String>, desired: i32, ready: i32) -> Self {
        Self {
            kind,
            name: name.into(),
            desired_replicas: desired,
            ready_replicas: ready,
            labels: BTreeMap::new(),
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// De-duplication key across selectors
    pub fn key(&self) -> (WorkloadKind, &str) {
        (self.kind, self.name.as_str())
    }
}

// An unset spec.replicas means the API server default of one replica
impl From<&Deployment> for WorkloadSummary {
    fn from(deployment: &Deployment) -> Self {
        Self {
            kind: WorkloadKind::Deployment,
            name: deployment.metadata.name.clone().unwrap_or_default(),
            desired_replicas: deployment
                .spec
                .as_ref()
                .and_then(|s| s.replicas)
                .unwrap_or(1),
            ready_replicas: deployment
                .status
                .as_ref()
                .and_then(|s| s.ready_replicas)
                .unwrap_or(0),
            labels: deployment.metadata.labels.clone().unwrap_or_default(),
        }
    }
}

impl From<&StatefulSet> for WorkloadSummary {
    fn from(statefulset: &StatefulSet) -> Self {
        Self {
            kind: WorkloadKind::StatefulSet,
            name: statefulset.metadata.name.clone().unwrap_or_default(),
            desired_replicas: statefulset
                .spec
                .as_ref()
                .and_then(|s| s.replicas)
                .unwrap_or(1),
            ready_replicas: statefulset
                .status
                .as_ref()
                .and_then(|s| s.ready_replicas)
                .unwrap_or(0),
            labels: statefulset.metadata.labels.clone().unwrap_or_default(),
        }
    }
}

/// Namespaced resource kinds the cleanup planner may remove
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    PersistentVolumeClaim,
    Secret,
    ConfigMap,
    ServiceAccount,
    Role,
    RoleBinding,
    NetworkPolicy,
    Ingress,
    KafkaTopic,
    KafkaUser,
    Issuer,
    Job,
}

impl ResourceKind {
    /// (group, version, kind, plural)
    fn gvk(&self) -> (&'static str, &'static str, &'static str, &'static str) {
        match self {
            ResourceKind::PersistentVolumeClaim => {
                ("", "v1", "PersistentVolumeClaim", "persistentvolumeclaims")
            }
            ResourceKind::Secret => ("", "v1", "Secret", "secrets"),
            ResourceKind::ConfigMap => ("", "v1", "ConfigMap", "configmaps"),
            ResourceKind::ServiceAccount => ("", "v1", "ServiceAccount", "serviceaccounts"),
            ResourceKind::Role => ("rbac.authorization.k8s.io", "v1", "Role", "roles"),
            ResourceKind::RoleBinding => {
                ("rbac.authorization.k8s.io", "v1", "RoleBinding", "rolebindings")
            }
            ResourceKind::NetworkPolicy => {
                ("networking.k8s.io", "v1", "NetworkPolicy", "networkpolicies")
            }
            ResourceKind::Ingress => ("networking.k8s.io", "v1", "Ingress", "ingresses"),
            ResourceKind::KafkaTopic => ("kafka.strimzi.io", "v1beta2", "KafkaTopic", "kafkatopics"),
            ResourceKind::KafkaUser => ("kafka.strimzi.io", "v1beta2", "KafkaUser", "kafkausers"),
            ResourceKind::Issuer => ("cert-manager.io", "v1", "Issuer", "issuers"),
            ResourceKind::Job => ("batch", "v1", "Job", "jobs"),
        }
    }

    pub fn api_resource(&self) -> ApiResource {
        let (group, version, kind, plural) = self.gvk();
        ApiResource::from_gvk_with_plural(&GroupVersionKind::gvk(group, version, kind), plural)
    }

    pub fn kind(&self) -> &'static str {
        self.gvk().2
    }

    /// Jobs are deleted with their pods; everything else as the API defaults
    fn delete_params(&self) -> DeleteParams {
        match self {
            ResourceKind::Job => DeleteParams {
                propagation_policy: Some(kube::api::PropagationPolicy::Background),
                ..Default::default()
            },
            _ => DeleteParams::default(),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

/// Name and type of a namespaced resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSummary {
    pub name: String,
    /// `type` field, set for Secrets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
}

impl ResourceSummary {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resource_type: None,
        }
    }

    pub fn with_type(mut self, resource_type: impl Into<String>) -> Self {
        self.resource_type = Some(resource_type.into());
        self
    }
}

/// Read and delete access to the cluster, scoped to what the lifecycle core needs
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Deployments and StatefulSets in `namespace` matching a label selector
    async fn list_workloads(&self, namespace: &str, selector: &str) -> Result<Vec<WorkloadSummary>>;

    async fn namespace_exists(&self, namespace: &str) -> Result<bool>;

    /// Delete a Job and its pods; `Ok(false)` if it did not exist
    async fn delete_job(&self, namespace: &str, name: &str) -> Result<bool>;

    /// All resources of a kind in `namespace`; empty if the kind is not served
    async fn list_resources(
        &self,
        namespace: &str,
        kind: ResourceKind,
    ) -> Result<Vec<ResourceSummary>>;

    /// Delete one resource; `Ok(false)` if it did not exist
    async fn delete_resource(&self, namespace: &str, kind: ResourceKind, name: &str)
    -> Result<bool>;
}

/// [`ClusterApi`] backed by a live Kubernetes client
#[derive(Clone)]
pub struct KubeCluster {
    client: kube::Client,
    query_timeout: Duration,
}

impl KubeCluster {
    /// Create from the ambient kubeconfig or in-cluster environment
    pub async fn try_default(query_timeout: Duration) -> Result<Self> {
        let client = kube::Client::try_default()
            .await
            .map_err(|e| PlatformError::ClusterUnreachable {
                namespace: String::new(),
                message: e.to_string(),
            })?;
        Ok(Self::with_client(client, query_timeout))
    }

    /// Create from a kubeconfig context
    pub async fn for_context(context: &str, query_timeout: Duration) -> Result<Self> {
        let options = kube::config::KubeConfigOptions {
            context: Some(context.to_string()),
            ..Default::default()
        };
        let config = kube::Config::from_kubeconfig(&options)
            .await
            .map_err(|e| PlatformError::InvalidConfig(e.to_string()))?;
        let client = kube::Client::try_from(config).map_err(|e| {
            PlatformError::ClusterUnreachable {
                namespace: String::new(),
                message: e.to_string(),
            }
        })?;
        Ok(Self::with_client(client, query_timeout))
    }

    pub fn with_client(client: kube::Client, query_timeout: Duration) -> Self {
        Self {
            client,
            query_timeout,
        }
    }

    /// Run one API call under the query timeout
    async fn bounded<T, F>(&self, namespace: &str, call: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, kube::Error>>,
    {
        match tokio::time::timeout(self.query_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(PlatformError::ClusterUnreachable {
                namespace: namespace.to_string(),
                message: e.to_string(),
            }),
            Err(_) => Err(PlatformError::ClusterUnreachable {
                namespace: namespace.to_string(),
                message: format!("query timed out after {}s", self.query_timeout.as_secs()),
            }),
        }
    }

    fn dynamic(&self, namespace: &str, kind: ResourceKind) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), namespace, &kind.api_resource())
    }
}

fn is_not_found(error: &kube::Error) -> bool {
    matches!(error, kube::Error::Api(resp) if resp.code == 404)
}

#[async_trait]
impl ClusterApi for KubeCluster {
    async fn list_workloads(&self, namespace: &str, selector: &str) -> Result<Vec<WorkloadSummary>> {
        let params = ListParams::default().labels(selector);

        let deployments: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        let statefulsets: Api<StatefulSet> = Api::namespaced(self.client.clone(), namespace);

        let (deployments, statefulsets) = futures::try_join!(
            self.bounded(namespace, deployments.list(&params)),
            self.bounded(namespace, statefulsets.list(&params)),
        )?;

        let mut workloads: Vec<WorkloadSummary> =
            deployments.items.iter().map(WorkloadSummary::from).collect();
        workloads.extend(statefulsets.items.iter().map(WorkloadSummary::from));

        tracing::debug!(
            namespace,
            selector,
            count = workloads.len(),
            "listed workloads"
        );
        Ok(workloads)
    }

    async fn namespace_exists(&self, namespace: &str) -> Result<bool> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let found = self.bounded(namespace, api.get_opt(namespace)).await?;
        Ok(found.is_some())
    }

    async fn delete_job(&self, namespace: &str, name: &str) -> Result<bool> {
        let api: Api<Job> = Api::namespaced(self.client.clone(), namespace);
        // Background propagation removes the Job's pods too
        let params = DeleteParams {
            propagation_policy: Some(kube::api::PropagationPolicy::Background),
            ..Default::default()
        };

        match tokio::time::timeout(self.query_timeout, api.delete(name, &params)).await {
            Ok(Ok(_)) => Ok(true),
            Ok(Err(e)) if is_not_found(&e) => Ok(false),
            Ok(Err(e)) => Err(PlatformError::ClusterUnreachable {
                namespace: namespace.to_string(),
                message: e.to_string(),
            }),
            Err(_) => Err(PlatformError::ClusterUnreachable {
                namespace: namespace.to_string(),
                message: format!("deleting job '{}' timed out", name),
            }),
        }
    }

    async fn list_resources(
        &self,
        namespace: &str,
        kind: ResourceKind,
    ) -> Result<Vec<ResourceSummary>> {
        let api = self.dynamic(namespace, kind);

        let list = match tokio::time::timeout(self.query_timeout, api.list(&ListParams::default()))
            .await
        {
            Ok(Ok(list)) => list,
            // CRD-backed kinds are absent on clusters without the operator
            Ok(Err(e)) if is_not_found(&e) => return Ok(Vec::new()),
            Ok(Err(e)) => {
                return Err(PlatformError::ClusterUnreachable {
                    namespace: namespace.to_string(),
                    message: e.to_string(),
                });
            }
            Err(_) => {
                return Err(PlatformError::ClusterUnreachable {
                    namespace: namespace.to_string(),
                    message: format!("listing {} timed out", kind),
                });
            }
        };

        Ok(list
            .items
            .iter()
            .filter_map(|obj| {
                let name = obj.metadata.name.clone()?;
                let resource_type = obj
                    .data
                    .get("type")
                    .and_then(|t| t.as_str())
                    .map(String::from);
                Some(ResourceSummary {
                    name,
                    resource_type,
                })
            })
            .collect())
    }

    async fn delete_resource(
        &self,
        namespace: &str,
        kind: ResourceKind,
        name: &str,
    ) -> Result<bool> {
        let api = self.dynamic(namespace, kind);

        match tokio::time::timeout(
            self.query_timeout,
            api.delete(name, &kind.delete_params()),
        )
        .await
        {
            Ok(Ok(_)) => Ok(true),
            Ok(Err(e)) if is_not_found(&e) => Ok(false),
            Ok(Err(e)) => Err(PlatformError::ClusterUnreachable {
                namespace: namespace.to_string(),
                message: e.to_string(),
            }),
            Err(_) => Err(PlatformError::ClusterUnreachable {
                namespace: namespace.to_string(),
                message: format!("deleting {} '{}' timed out", kind, name),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::apps::v1::{DeploymentSpec, DeploymentStatus, StatefulSetSpec};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    #[test]
    fn test_summary_from_deployment() {
        let deployment = Deployment {
            metadata: ObjectMeta {
                name: Some("minio".to_string()),
                labels: Some(BTreeMap::from([(
                    "app.kubernetes.io/name".to_string(),
                    "minio".to_string(),
                )])),
                ..Default::default()
            },
            spec: Some(DeploymentSpec {
                replicas: Some(3),
                ..Default::default()
            }),
            status: Some(DeploymentStatus {
                ready_replicas: Some(2),
                ..Default::default()
            }),
        };

        let summary = WorkloadSummary::from(&deployment);
        assert_eq!(summary.kind, WorkloadKind::Deployment);
        assert_eq!(summary.desired_replicas, 3);
        assert_eq!(summary.ready_replicas, 2);
        assert_eq!(summary.labels["app.kubernetes.io/name"], "minio");
    }

    #[test]
    fn test_summary_defaults_for_missing_fields() {
        let statefulset = StatefulSet {
            metadata: ObjectMeta {
                name: Some("kafka".to_string()),
                ..Default::default()
            },
            spec: Some(StatefulSetSpec::default()),
            status: None,
        };

        let summary = WorkloadSummary::from(&statefulset);
        assert_eq!(summary.kind, WorkloadKind::StatefulSet);
        assert_eq!(summary.desired_replicas, 1);
        assert_eq!(summary.ready_replicas, 0);
    }

    #[test]
    fn test_resource_kind_api_resource() {
        let ar = ResourceKind::KafkaTopic.api_resource();
        assert_eq!(ar.group, "kafka.strimzi.io");
        assert_eq!(ar.version, "v1beta2");
        assert_eq!(ar.plural, "kafkatopics");
        assert_eq!(ar.api_version, "kafka.strimzi.io/v1beta2");

        let pvc = ResourceKind::PersistentVolumeClaim.api_resource();
        assert_eq!(pvc.group, "");
        assert_eq!(pvc.api_version, "v1");
    }

    #[test]
    fn test_jobs_deleted_with_pods() {
        let job = ResourceKind::Job.api_resource();
        assert_eq!(job.api_version, "batch/v1");
        assert_eq!(job.plural, "jobs");
        assert!(matches!(
            ResourceKind::Job.delete_params().propagation_policy,
            Some(kube::api::PropagationPolicy::Background)
        ));
        assert!(ResourceKind::Secret.delete_params().propagation_policy.is_none());
    }
}
