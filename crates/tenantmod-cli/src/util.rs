//! Shared utility functions for CLI commands

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tenantmod_core::{CatalogSource, ModuleCatalog, PlatformConfig, parse_set_values};
use tenantmod_kube::{ChartDirectory, HelmCli, KubeCluster, LifecycleController};

use crate::error::Result;

/// Controller wired to the live cluster and the helm binary
pub type Controller = LifecycleController<KubeCluster, HelmCli, ChartDirectory>;

/// Paths given on the command line, overriding the configuration file
#[derive(Debug, Clone, Default)]
pub struct GlobalPaths {
    pub config: Option<PathBuf>,
    pub catalog: Option<PathBuf>,
}

/// Load the configuration, applying `--catalog`
pub fn load_config(paths: &GlobalPaths) -> Result<PlatformConfig> {
    let mut config = match &paths.config {
        Some(path) => PlatformConfig::load_from(path)?,
        None => PlatformConfig::load()?,
    };
    if let Some(catalog) = &paths.catalog {
        config.catalog_path = Some(catalog.clone());
    }
    Ok(config)
}

/// Load the module catalog named by the configuration
pub fn load_catalog(config: &PlatformConfig) -> Result<ModuleCatalog> {
    let path = config.catalog_path()?;
    Ok(ModuleCatalog::load(&path)?)
}

/// Build a controller against the configured cluster
pub async fn connect(config: &PlatformConfig) -> Result<Controller> {
    let catalog = Arc::new(CatalogSource::open(config.catalog_path()?)?);

    let query_timeout = config.timeouts.query;
    let cluster = match &config.release_manager.kube_context {
        Some(context) => KubeCluster::for_context(context, query_timeout).await?,
        None => KubeCluster::try_default(query_timeout).await?,
    };

    tracing::debug!(
        catalog = %catalog.path().display(),
        charts = %config.charts_root.display(),
        "connected to cluster"
    );

    Ok(LifecycleController::new(
        cluster,
        HelmCli::new(&config.release_manager),
        ChartDirectory::new(charts_root(config)),
        catalog,
        config,
    ))
}

/// Parse repeated `--set key=value` arguments
pub fn parse_overrides(set: &[String]) -> Result<tenantmod_core::SetOverrides> {
    Ok(parse_set_values(set)?)
}

/// Relative charts roots resolve against the catalog's directory
fn charts_root(config: &PlatformConfig) -> PathBuf {
    if config.charts_root.is_absolute() {
        return config.charts_root.clone();
    }
    config
        .catalog_path()
        .ok()
        .as_deref()
        .and_then(Path::parent)
        .map(|dir| dir.join(&config.charts_root))
        .unwrap_or_else(|| config.charts_root.clone())
}
