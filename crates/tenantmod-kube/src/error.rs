//! Error types for tenantmod-kube

use std::fmt;
use std::time::Duration;
use thiserror::Error;

use tenantmod_core::CoreError;

use crate::aggregator::ModuleHealth;

/// Result type for tenantmod-kube operations
pub type Result<T> = std::result::Result<T, PlatformError>;

/// Lifecycle operation an error occurred in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Status,
    Enable,
    Disable,
    Cleanup,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Status => write!(f, "status"),
            Operation::Enable => write!(f, "enable"),
            Operation::Disable => write!(f, "disable"),
            Operation::Cleanup => write!(f, "cleanup"),
        }
    }
}

/// Errors surfaced by the lifecycle core
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PlatformError {
    /// Cluster API could not be reached or rejected the query
    #[error("cluster unreachable while querying namespace '{namespace}': {message}")]
    ClusterUnreachable { namespace: String, message: String },

    /// Release manager did not finish within its timeout
    #[error("release '{release}' did not finish within {}", humanize(.timeout))]
    DeploymentTimedOut {
        release: String,
        timeout: Duration,
        output: String,
    },

    /// Release manager reported failure for upgrade-or-install
    #[error("deploying release '{release}' failed:\n{output}")]
    DeploymentFailed { release: String, output: String },

    /// Release manager reported failure for uninstall
    #[error("removing release '{release}' failed:\n{output}")]
    UndeploymentFailed { release: String, output: String },

    /// Another release manager operation holds the release
    #[error(
        "another operation is in progress for release '{release}'\nHint: wait for it to finish, then retry"
    )]
    OperationInProgress { release: String, output: String },

    /// Module is not in the catalog
    #[error("module '{module}' is not in the catalog")]
    ModuleUnknown { module: String },

    /// Tenant namespace does not exist
    #[error("namespace '{namespace}' does not exist\nHint: namespaces are provisioned by the tenant onboarding flow")]
    NamespaceMissing { namespace: String },

    /// Resource tier is not defined in the catalog
    #[error("unknown resource tier '{tier}' (available: {available})")]
    UnknownTier { tier: String, available: String },

    /// Chart or values files for a module are missing
    #[error("chart artifacts for module '{module}' not found at {path}")]
    ArtifactMissing { module: String, path: String },

    /// Operation was cancelled; `observed` is the health read afterwards
    #[error("{operation} cancelled (module is now {})", .observed.status)]
    Cancelled {
        operation: Operation,
        observed: Box<ModuleHealth>,
    },

    /// Catalog, identifier or values error
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Any of the above, tagged with the operation and target
    #[error("{operation} {module} in {namespace}: {source}")]
    Operation {
        operation: Operation,
        module: String,
        namespace: String,
        #[source]
        source: Box<PlatformError>,
    },
}

fn humanize(duration: &Duration) -> String {
    format!("{}s", duration.as_secs())
}

impl PlatformError {
    /// Tag this error with the operation and target it occurred in
    pub fn during(self, operation: Operation, module: &str, namespace: &str) -> Self {
        match self {
            already @ PlatformError::Operation { .. } => already,
            source => PlatformError::Operation {
                operation,
                module: module.to_string(),
                namespace: namespace.to_string(),
                source: Box::new(source),
            },
        }
    }

    /// The underlying error, with any operation tag removed
    pub fn root(&self) -> &PlatformError {
        match self {
            PlatformError::Operation { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether retrying the same call may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.root(),
            PlatformError::ClusterUnreachable { .. }
                | PlatformError::DeploymentTimedOut { .. }
                | PlatformError::OperationInProgress { .. }
        )
    }

    /// Whether the module or its namespace does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(
            self.root(),
            PlatformError::ModuleUnknown { .. } | PlatformError::NamespaceMissing { .. }
        )
    }

    /// Raw release manager output attached to the error, if any
    pub fn release_output(&self) -> Option<&str> {
        match self.root() {
            PlatformError::DeploymentTimedOut { output, .. }
            | PlatformError::DeploymentFailed { output, .. }
            | PlatformError::UndeploymentFailed { output, .. }
            | PlatformError::OperationInProgress { output, .. } => Some(output),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_during_wraps_once() {
        let err = PlatformError::ModuleUnknown {
            module: "spark".to_string(),
        }
        .during(Operation::Enable, "spark", "acme-dev")
        .during(Operation::Disable, "spark", "acme-dev");

        assert_eq!(
            err.to_string(),
            "enable spark in acme-dev: module 'spark' is not in the catalog"
        );
        assert!(matches!(err.root(), PlatformError::ModuleUnknown { .. }));
    }

    #[test]
    fn test_retryable() {
        let busy = PlatformError::OperationInProgress {
            release: "acme-dev-spark".to_string(),
            output: String::new(),
        }
        .during(Operation::Enable, "spark", "acme-dev");
        assert!(busy.is_retryable());

        let missing = PlatformError::NamespaceMissing {
            namespace: "acme-dev".to_string(),
        };
        assert!(!missing.is_retryable());
        assert!(missing.is_not_found());
    }

    #[test]
    fn test_release_output_preserved() {
        let err = PlatformError::DeploymentFailed {
            release: "acme-dev-minio".to_string(),
            output: "Error: chart requires kubeVersion >= 1.30".to_string(),
        }
        .during(Operation::Enable, "minio", "acme-dev");

        assert_eq!(
            err.release_output(),
            Some("Error: chart requires kubeVersion >= 1.30")
        );
        assert!(err.to_string().contains("kubeVersion"));
    }

    #[test]
    fn test_timeout_message() {
        let err = PlatformError::DeploymentTimedOut {
            release: "acme-dev-kafka".to_string(),
            timeout: Duration::from_secs(300),
            output: String::new(),
        };
        assert_eq!(
            err.to_string(),
            "release 'acme-dev-kafka' did not finish within 300s"
        );
    }
}
