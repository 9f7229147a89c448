//! Release identity and cleanup tiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::module::{ModuleName, TenantNamespace};

/// The unit tracked by the release manager: one release per (module, namespace)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseRecord {
    pub module_name: ModuleName,
    pub namespace: String,
    pub release_name: String,
}

/// Longest release name helm accepts
pub const MAX_RELEASE_NAME_LEN: usize = 53;

impl ReleaseRecord {
    /// Build the record; the release name is always `{namespace}-{module}`
    ///
    /// Fails when that name is longer than [`MAX_RELEASE_NAME_LEN`]. It is
    /// also the value of the instance label, so it must fit before anything
    /// is installed.
    pub fn new(module: &ModuleName, namespace: &TenantNamespace) -> Result<Self, CoreError> {
        let release_name = release_name(module, namespace);
        if release_name.len() > MAX_RELEASE_NAME_LEN {
            return Err(CoreError::InvalidName {
                field: "release name",
                reason: format!(
                    "{} characters, longer than {}",
                    release_name.len(),
                    MAX_RELEASE_NAME_LEN
                ),
                value: release_name,
            });
        }

        Ok(Self {
            module_name: module.clone(),
            namespace: namespace.as_str().to_string(),
            release_name,
        })
    }
}

/// Deterministic release name for a module in a namespace
pub fn release_name(module: &ModuleName, namespace: &TenantNamespace) -> String {
    format!("{}-{}", namespace, module)
}

/// How aggressively auxiliary resources are removed after uninstall
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum CleanupTier {
    /// Leave everything the release manager does not own
    #[default]
    None,
    /// Remove persistent volume claims (data loss)
    PvcsOnly,
    /// Remove volume claims plus secrets, RBAC, policies and known custom resources
    Full,
}

impl CleanupTier {
    /// Whether this tier deletes persistent data
    pub fn is_destructive(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Display for CleanupTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::PvcsOnly => "pvcs-only",
            Self::Full => "full",
        };
        f.write_str(s)
    }
}

impl FromStr for CleanupTier {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "pvcs" | "pvcs-only" | "pvcsonly" => Ok(Self::PvcsOnly),
            "full" | "all" => Ok(Self::Full),
            other => Err(CoreError::InvalidConfig {
                message: format!(
                    "unknown cleanup tier '{}' (expected none, pvcs-only or full)",
                    other
                ),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_name() {
        let module = ModuleName::new("spark").unwrap();
        let ns = TenantNamespace::new("acme", "dev").unwrap();
        let record = ReleaseRecord::new(&module, &ns).unwrap();

        assert_eq!(record.release_name, "acme-dev-spark");
        assert_eq!(record.namespace, "acme-dev");
        assert_eq!(record.module_name, module);
    }

    #[test]
    fn test_release_name_length_limit() {
        // 27 + 1 + 25 characters: exactly at the limit
        let ns = TenantNamespace::new("a".repeat(22), "prod").unwrap();
        let module = ModuleName::new("m".repeat(25)).unwrap();
        assert_eq!(ReleaseRecord::new(&module, &ns).unwrap().release_name.len(), 53);

        // both parts are valid labels on their own
        let ns = TenantNamespace::new("enterprise-analytics", "production").unwrap();
        let module = ModuleName::new("security-vault-operator").unwrap();
        let err = ReleaseRecord::new(&module, &ns).unwrap_err();
        match err {
            CoreError::InvalidName { field, value, .. } => {
                assert_eq!(field, "release name");
                assert_eq!(value, "enterprise-analytics-production-security-vault-operator");
            }
            other => panic!("expected InvalidName, got {other:?}"),
        }
    }

    #[test]
    fn test_cleanup_tier_parse() {
        assert_eq!("none".parse::<CleanupTier>().unwrap(), CleanupTier::None);
        assert_eq!("pvcs".parse::<CleanupTier>().unwrap(), CleanupTier::PvcsOnly);
        assert_eq!(
            "PVCs-Only".parse::<CleanupTier>().unwrap(),
            CleanupTier::PvcsOnly
        );
        assert_eq!("full".parse::<CleanupTier>().unwrap(), CleanupTier::Full);
        assert!("everything".parse::<CleanupTier>().is_err());
    }

    #[test]
    fn test_cleanup_tier_ordering() {
        assert!(CleanupTier::None < CleanupTier::PvcsOnly);
        assert!(CleanupTier::PvcsOnly < CleanupTier::Full);
        assert!(!CleanupTier::None.is_destructive());
        assert!(CleanupTier::Full.is_destructive());
    }
}
