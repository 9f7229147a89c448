//! Deployment artifact lookup: chart location and values payloads per module

use std::path::{Path, PathBuf};

use tenantmod_core::{ModuleDefinition, Values};

use crate::error::{PlatformError, Result};

/// Chart and values files for one module
pub trait ArtifactStore: Send + Sync {
    /// Chart reference handed to the release manager
    fn chart(&self, module: &ModuleDefinition) -> Result<PathBuf>;

    /// Default values payload
    fn base_values(&self, module: &ModuleDefinition) -> Result<Values>;

    /// Environment-specific override payload, if the module ships one
    fn environment_values(
        &self,
        module: &ModuleDefinition,
        environment: &str,
    ) -> Result<Option<Values>>;

    /// The environment override when present, else the base payload
    fn resolve_values(&self, module: &ModuleDefinition, environment: &str) -> Result<Values> {
        match self.environment_values(module, environment)? {
            Some(values) => Ok(values),
            None => self.base_values(module),
        }
    }
}

/// Charts laid out on disk as `{root}/{chartPath}/helm`
///
/// A chart directory without a `helm/` subdirectory is used as-is. Values
/// live next to `Chart.yaml` as `values.yaml` and `values-{environment}.yaml`.
#[derive(Debug, Clone)]
pub struct ChartDirectory {
    root: PathBuf,
}

impl ChartDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn chart_dir(&self, module: &ModuleDefinition) -> PathBuf {
        let base = self.root.join(&module.chart_path);
        let nested = base.join("helm");
        if nested.is_dir() { nested } else { base }
    }
}

impl ArtifactStore for ChartDirectory {
    fn chart(&self, module: &ModuleDefinition) -> Result<PathBuf> {
        let dir = self.chart_dir(module);
        if !dir.is_dir() {
            return Err(PlatformError::ArtifactMissing {
                module: module.name.to_string(),
                path: dir.display().to_string(),
            });
        }
        Ok(dir)
    }

    fn base_values(&self, module: &ModuleDefinition) -> Result<Values> {
        let path = self.chart(module)?.join("values.yaml");
        if path.exists() {
            Ok(Values::from_file(&path)?)
        } else {
            Ok(Values::new())
        }
    }

    fn environment_values(
        &self,
        module: &ModuleDefinition,
        environment: &str,
    ) -> Result<Option<Values>> {
        let path = self
            .chart(module)?
            .join(format!("values-{}.yaml", environment));
        if path.exists() {
            tracing::debug!(path = %path.display(), "using environment values");
            Ok(Some(Values::from_file(&path)?))
        } else {
            Ok(None)
        }
    }
}
