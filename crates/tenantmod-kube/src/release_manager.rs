//! Release manager interface
//!
//! The orchestrator never shells out itself; it talks to a [`ReleaseManager`].
//! [`crate::helm::HelmCli`] drives the `helm` binary, and
//! [`crate::mock::MockReleaseManager`] records calls for tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use tenantmod_core::{SetOverrides, Values};

/// Upgrade-or-install of one release
#[derive(Debug, Clone, PartialEq)]
pub struct UpgradeInstallRequest {
    pub release_name: String,
    pub namespace: String,
    /// Chart directory or reference
    pub chart: PathBuf,
    /// Values payload (written to a values file)
    pub values: Values,
    /// `--set` overrides, applied after `values`
    pub overrides: SetOverrides,
    pub timeout: Duration,
}

/// Uninstall of one release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UninstallRequest {
    pub release_name: String,
    pub namespace: String,
    pub timeout: Duration,
}

/// Raw output of a release manager call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseOutput {
    pub stdout: String,
    pub stderr: String,
}

impl ReleaseOutput {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// stdout followed by stderr, trimmed
    pub fn combined(&self) -> String {
        match (self.stdout.trim(), self.stderr.trim()) {
            ("", err) => err.to_string(),
            (out, "") => out.to_string(),
            (out, err) => format!("{}\n{}", out, err),
        }
    }
}

/// Classified release manager failure, carrying its diagnostic verbatim
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReleaseFailure {
    #[error("timed out: {output}")]
    TimedOut { output: String },

    #[error("release not found: {output}")]
    NotFound { output: String },

    #[error("release locked by another operation: {output}")]
    Locked { output: String },

    #[error("{output}")]
    Failed { output: String },
}

impl ReleaseFailure {
    pub fn output(&self) -> &str {
        match self {
            ReleaseFailure::TimedOut { output }
            | ReleaseFailure::NotFound { output }
            | ReleaseFailure::Locked { output }
            | ReleaseFailure::Failed { output } => output,
        }
    }
}

/// Installs and removes releases
#[async_trait]
pub trait ReleaseManager: Send + Sync {
    async fn upgrade_install(
        &self,
        request: &UpgradeInstallRequest,
    ) -> Result<ReleaseOutput, ReleaseFailure>;

    async fn uninstall(&self, request: &UninstallRequest) -> Result<ReleaseOutput, ReleaseFailure>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combined_output() {
        assert_eq!(ReleaseOutput::new("deployed\n", "").combined(), "deployed");
        assert_eq!(ReleaseOutput::new("", "warning\n").combined(), "warning");
        assert_eq!(
            ReleaseOutput::new("deployed", "warning").combined(),
            "deployed\nwarning"
        );
    }

    #[test]
    fn test_failure_output() {
        let failure = ReleaseFailure::Locked {
            output: "Error: UPGRADE FAILED: another operation is in progress".to_string(),
        };
        assert!(failure.output().contains("in progress"));
    }
}
