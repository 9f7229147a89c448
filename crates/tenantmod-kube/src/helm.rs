//! [`ReleaseManager`] backed by the `helm` binary

use async_trait::async_trait;
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};

use tenantmod_core::ReleaseManagerConfig;

use crate::release_manager::{
    ReleaseFailure, ReleaseManager, ReleaseOutput, UninstallRequest, UpgradeInstallRequest,
};

/// Time helm gets past its own `--timeout` to report before it is killed
pub const DEFAULT_KILL_GRACE: Duration = Duration::from_secs(30);

/// Runs `helm upgrade --install` and `helm uninstall` as subprocesses
///
/// helm enforces the request timeout itself. The child is only killed when it
/// is still running `kill_grace` after that. Dropping the returned future
/// detaches the child; helm then finishes or times out on its own.
#[derive(Debug, Clone)]
pub struct HelmCli {
    binary: PathBuf,
    kubeconfig: Option<PathBuf>,
    kube_context: Option<String>,
    kill_grace: Duration,
}

impl HelmCli {
    pub fn new(config: &ReleaseManagerConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            kubeconfig: config.kubeconfig.clone(),
            kube_context: config.kube_context.clone(),
            kill_grace: DEFAULT_KILL_GRACE,
        }
    }

    pub fn with_kill_grace(mut self, grace: Duration) -> Self {
        self.kill_grace = grace;
        self
    }

    fn global_args(&self) -> Vec<OsString> {
        let mut args = Vec::new();
        if let Some(kubeconfig) = &self.kubeconfig {
            args.push("--kubeconfig".into());
            args.push(kubeconfig.into());
        }
        if let Some(context) = &self.kube_context {
            args.push("--kube-context".into());
            args.push(context.into());
        }
        args
    }

    /// Arguments for upgrade-or-install. The namespace is never created.
    pub fn upgrade_install_args(
        &self,
        request: &UpgradeInstallRequest,
        values_file: Option<&Path>,
    ) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "upgrade".into(),
            "--install".into(),
            request.release_name.clone().into(),
            request.chart.clone().into(),
            "--namespace".into(),
            request.namespace.clone().into(),
            "--timeout".into(),
            format!("{}s", request.timeout.as_secs()).into(),
        ];

        if let Some(file) = values_file {
            args.push("--values".into());
            args.push(file.into());
        }

        for set in request.overrides.to_args() {
            args.push("--set".into());
            args.push(set.into());
        }

        args.extend(self.global_args());
        args
    }

    pub fn uninstall_args(&self, request: &UninstallRequest) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "uninstall".into(),
            request.release_name.clone().into(),
            "--namespace".into(),
            request.namespace.clone().into(),
            "--timeout".into(),
            format!("{}s", request.timeout.as_secs()).into(),
        ];
        args.extend(self.global_args());
        args
    }

    async fn run(
        &self,
        args: Vec<OsString>,
        timeout: Duration,
        values_file: Option<NamedTempFile>,
    ) -> Result<ReleaseOutput, ReleaseFailure> {
        tracing::debug!(binary = %self.binary.display(), ?args, "running release manager");

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(false)
            .spawn()
            .map_err(|e| ReleaseFailure::Failed {
                output: format!("failed to start {}: {}", self.binary.display(), e),
            })?;

        let binary = self.binary.clone();
        let grace = self.kill_grace;
        let backstop = timeout.saturating_add(grace);

        // The task owns the child and the values file, so dropping the caller
        // does not interrupt helm mid-operation.
        let supervisor = tokio::spawn(async move {
            let _values_file = values_file;
            let stdout = child.stdout.take();
            let stderr = child.stderr.take();

            let collected = tokio::time::timeout(backstop, collect(&mut child, stdout, stderr)).await;
            match collected {
                Ok(Ok(collected)) => Ok(collected),
                Ok(Err(e)) => Err(ReleaseFailure::Failed {
                    output: format!("failed to wait for {}: {}", binary.display(), e),
                }),
                Err(_) => {
                    if let Err(e) = child.kill().await {
                        tracing::warn!(binary = %binary.display(), error = %e, "failed to kill release manager");
                    }
                    Err(ReleaseFailure::TimedOut {
                        output: format!(
                            "{} still running {:?} after its {:?} timeout; killed",
                            binary.display(),
                            grace,
                            timeout
                        ),
                    })
                }
            }
        });

        let (status, stdout, stderr) = match supervisor.await {
            Ok(collected) => collected?,
            Err(e) => {
                return Err(ReleaseFailure::Failed {
                    output: format!("release manager task failed: {}", e),
                });
            }
        };

        let result = ReleaseOutput::new(
            String::from_utf8_lossy(&stdout),
            String::from_utf8_lossy(&stderr),
        );

        if status.success() {
            Ok(result)
        } else {
            Err(classify_failure(result.combined()))
        }
    }
}

async fn collect(
    child: &mut Child,
    stdout: Option<impl AsyncRead + Unpin>,
    stderr: Option<impl AsyncRead + Unpin>,
) -> std::io::Result<(ExitStatus, Vec<u8>, Vec<u8>)> {
    let (status, stdout, stderr) = tokio::join!(child.wait(), read_pipe(stdout), read_pipe(stderr));
    Ok((status?, stdout?, stderr?))
}

async fn read_pipe(pipe: Option<impl AsyncRead + Unpin>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

/// Classify a failed helm invocation from its diagnostic text
pub fn classify_failure(output: String) -> ReleaseFailure {
    let lower = output.to_lowercase();

    if lower.contains("another operation") && lower.contains("in progress") {
        ReleaseFailure::Locked { output }
    } else if lower.contains("release: not found") || lower.contains("release not loaded") {
        ReleaseFailure::NotFound { output }
    } else if lower.contains("timed out waiting for the condition")
        || lower.contains("context deadline exceeded")
    {
        ReleaseFailure::TimedOut { output }
    } else {
        ReleaseFailure::Failed { output }
    }
}

#[async_trait]
impl ReleaseManager for HelmCli {
    async fn upgrade_install(
        &self,
        request: &UpgradeInstallRequest,
    ) -> Result<ReleaseOutput, ReleaseFailure> {
        let values_file = if request.values.is_empty() {
            None
        } else {
            Some(write_values_file(request).map_err(|e| ReleaseFailure::Failed {
                output: format!("failed to write values file: {}", e),
            })?)
        };

        let args = self.upgrade_install_args(request, values_file.as_ref().map(|f| f.path()));
        self.run(args, request.timeout, values_file).await
    }

    async fn uninstall(&self, request: &UninstallRequest) -> Result<ReleaseOutput, ReleaseFailure> {
        self.run(self.uninstall_args(request), request.timeout, None)
            .await
    }
}

fn write_values_file(request: &UpgradeInstallRequest) -> std::io::Result<NamedTempFile> {
    let yaml = request
        .values
        .to_yaml()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;

    let mut file = tempfile::Builder::new()
        .prefix("tenantmod-values-")
        .suffix(".yaml")
        .tempfile()?;
    file.write_all(yaml.as_bytes())?;
    file.flush()?;
    Ok(file)
}
