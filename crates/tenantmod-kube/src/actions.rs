//! Action options for enable and disable operations

use tenantmod_core::{CleanupTier, SetOverrides};

/// Options for enabling a module
#[derive(Debug, Clone, Default)]
pub struct EnableOptions {
    pub tenant: String,

    pub module: String,

    /// Environment (configured default when unset)
    pub environment: Option<String>,

    /// Resource tier (configured default when unset)
    pub tier: Option<String>,

    /// Caller overrides, applied last
    pub overrides: SetOverrides,

    /// Upgrade-or-install attempts when the release manager times out
    pub attempts: u32,
}

impl EnableOptions {
    /// Create default enable options for a tenant and module
    pub fn new(tenant: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            tenant: tenant.into(),
            module: module.into(),
            attempts: 1,
            ..Default::default()
        }
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    pub fn with_tier(mut self, tier: impl Into<String>) -> Self {
        self.tier = Some(tier.into());
        self
    }

    pub fn with_overrides(mut self, overrides: SetOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Retry timed-out installs up to `attempts` times in total
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }
}

/// Options for disabling a module
#[derive(Debug, Clone, Default)]
pub struct DisableOptions {
    pub tenant: String,

    pub module: String,

    /// Environment (configured default when unset)
    pub environment: Option<String>,

    /// Auxiliary resources to remove after uninstall
    pub cleanup: CleanupTier,
}

impl DisableOptions {
    /// Create default disable options (no cleanup)
    pub fn new(tenant: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            tenant: tenant.into(),
            module: module.into(),
            ..Default::default()
        }
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    pub fn with_cleanup(mut self, cleanup: CleanupTier) -> Self {
        self.cleanup = cleanup;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enable_builder() {
        let options = EnableOptions::new("acme", "spark")
            .with_environment("prod")
            .with_tier("gold")
            .with_attempts(0);

        assert_eq!(options.environment.as_deref(), Some("prod"));
        assert_eq!(options.tier.as_deref(), Some("gold"));
        assert_eq!(options.attempts, 1);
        assert!(options.overrides.is_empty());
    }

    #[test]
    fn test_disable_defaults_to_no_cleanup() {
        let options = DisableOptions::new("acme", "spark");
        assert_eq!(options.cleanup, CleanupTier::None);
        assert!(options.environment.is_none());
    }
}
