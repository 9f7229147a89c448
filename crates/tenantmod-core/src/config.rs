//! Platform configuration
//!
//! Stored in `~/.config/tenantmod/config.yaml`. Every field has a default, so
//! a missing file is equivalent to an empty one.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{CoreError, Result};
use crate::release::CleanupTier;

/// Top-level configuration handed to the lifecycle core at construction time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformConfig {
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Module catalog file (defaults to `catalog.yaml` next to this file)
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,

    /// Directory holding one chart directory per module
    #[serde(default = "default_charts_root")]
    pub charts_root: PathBuf,

    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub release_manager: ReleaseManagerConfig,

    #[serde(default)]
    pub timeouts: Timeouts,

    #[serde(default)]
    pub settle: SettleConfig,
}

fn default_api_version() -> String {
    "tenantmod.io/v1".to_string()
}

fn default_charts_root() -> PathBuf {
    PathBuf::from("charts")
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            api_version: default_api_version(),
            catalog_path: None,
            charts_root: default_charts_root(),
            defaults: Defaults::default(),
            release_manager: ReleaseManagerConfig::default(),
            timeouts: Timeouts::default(),
            settle: SettleConfig::default(),
        }
    }
}

/// Defaults applied when a caller omits an argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Defaults {
    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default = "default_tier")]
    pub tier: String,

    #[serde(default)]
    pub cleanup: CleanupTier,
}

fn default_environment() -> String {
    "dev".to_string()
}

fn default_tier() -> String {
    "bronze".to_string()
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            tier: default_tier(),
            cleanup: CleanupTier::None,
        }
    }
}

/// How to reach the release manager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseManagerConfig {
    /// Release manager executable
    #[serde(default = "default_binary")]
    pub binary: PathBuf,

    /// Kubeconfig passed to the release manager
    #[serde(default)]
    pub kubeconfig: Option<PathBuf>,

    /// Kube context passed to the release manager
    #[serde(default)]
    pub kube_context: Option<String>,
}

fn default_binary() -> PathBuf {
    PathBuf::from("helm")
}

impl Default for ReleaseManagerConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            kubeconfig: None,
            kube_context: None,
        }
    }
}

/// Bounds on every blocking call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeouts {
    /// Per cluster API query
    #[serde(default = "default_query_timeout", with = "humantime_serde")]
    pub query: Duration,

    /// Release manager upgrade-or-install
    #[serde(default = "default_release_timeout", with = "humantime_serde")]
    pub install: Duration,

    /// Release manager uninstall
    #[serde(default = "default_release_timeout", with = "humantime_serde")]
    pub uninstall: Duration,
}

fn default_query_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_release_timeout() -> Duration {
    Duration::from_secs(300)
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            query: default_query_timeout(),
            install: default_release_timeout(),
            uninstall: default_release_timeout(),
        }
    }
}

/// Post-action polling: status is re-read every `interval` until it
/// converges or `deadline` has elapsed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleConfig {
    #[serde(default = "default_settle_interval", with = "humantime_serde")]
    pub interval: Duration,

    #[serde(default = "default_settle_deadline", with = "humantime_serde")]
    pub deadline: Duration,
}

fn default_settle_interval() -> Duration {
    Duration::from_secs(2)
}

fn default_settle_deadline() -> Duration {
    Duration::from_secs(60)
}

impl Default for SettleConfig {
    fn default() -> Self {
        Self {
            interval: default_settle_interval(),
            deadline: default_settle_deadline(),
        }
    }
}

impl PlatformConfig {
    /// Load configuration from default location
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Directory holding the configuration and the default catalog
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| CoreError::InvalidConfig {
            message: "Could not determine config directory".to_string(),
        })?;
        Ok(config_dir.join("tenantmod"))
    }

    /// Get default configuration path
    pub fn default_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.yaml"))
    }

    /// Resolved catalog path
    pub fn catalog_path(&self) -> Result<PathBuf> {
        match &self.catalog_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::config_dir()?.join("catalog.yaml")),
        }
    }

    fn validate(&self) -> Result<()> {
        let zero = [
            ("timeouts.query", self.timeouts.query),
            ("timeouts.install", self.timeouts.install),
            ("timeouts.uninstall", self.timeouts.uninstall),
            ("settle.interval", self.settle.interval),
        ];
        for (field, value) in zero {
            if value.is_zero() {
                return Err(CoreError::InvalidConfig {
                    message: format!("{} must be greater than zero", field),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = PlatformConfig::default();
        assert_eq!(config.timeouts.query, Duration::from_secs(30));
        assert_eq!(config.timeouts.install, Duration::from_secs(300));
        assert_eq!(config.defaults.environment, "dev");
        assert_eq!(config.defaults.tier, "bronze");
        assert_eq!(config.defaults.cleanup, CleanupTier::None);
        assert_eq!(config.release_manager.binary, PathBuf::from("helm"));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
chartsRoot: /opt/platform/modules
timeouts:
  install: 10m
settle:
  interval: 500ms
"#,
        )
        .unwrap();

        let config = PlatformConfig::load_from(&path).unwrap();
        assert_eq!(config.charts_root, PathBuf::from("/opt/platform/modules"));
        assert_eq!(config.timeouts.install, Duration::from_secs(600));
        assert_eq!(config.timeouts.uninstall, Duration::from_secs(300));
        assert_eq!(config.settle.interval, Duration::from_millis(500));
        assert_eq!(config.settle.deadline, Duration::from_secs(60));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "timeouts:\n  query: 0s\n").unwrap();

        let err = PlatformConfig::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("timeouts.query"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let mut config = PlatformConfig::default();
        config.defaults.cleanup = CleanupTier::PvcsOnly;
        config.release_manager.kube_context = Some("staging".to_string());
        config.save_to(&path).unwrap();

        let loaded = PlatformConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_explicit_catalog_path() {
        let config = PlatformConfig {
            catalog_path: Some(PathBuf::from("/etc/tenantmod/catalog.yaml")),
            ..Default::default()
        };
        assert_eq!(
            config.catalog_path().unwrap(),
            PathBuf::from("/etc/tenantmod/catalog.yaml")
        );
    }
}
