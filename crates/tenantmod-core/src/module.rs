//! Module and tenant namespace identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

/// Maximum length of a Kubernetes namespace (DNS-1123 label)
pub const MAX_NAMESPACE_LEN: usize = 63;

/// Name of a logical platform module (e.g. `spark`, `security-vault`)
///
/// Stable across label-scheme generations; the release name and every
/// label selector for the module are derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModuleName(String);

impl ModuleName {
    /// Create a module name, validating it as a DNS-1123 label
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_label("module", &name)?;
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ModuleName {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for ModuleName {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ModuleName> for String {
    fn from(value: ModuleName) -> Self {
        value.0
    }
}

impl AsRef<str> for ModuleName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A tenant's namespace for one environment: `{tenant}-{environment}`
///
/// The platform owns namespace creation; this type only names one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantNamespace {
    tenant: String,
    environment: String,
    name: String,
}

impl TenantNamespace {
    /// Build the namespace for a tenant and environment
    pub fn new(tenant: impl Into<String>, environment: impl Into<String>) -> Result<Self> {
        let tenant = tenant.into();
        let environment = environment.into();
        validate_label("tenant", &tenant)?;
        validate_label("environment", &environment)?;

        let name = format!("{}-{}", tenant, environment);
        if name.len() > MAX_NAMESPACE_LEN {
            return Err(CoreError::InvalidName {
                field: "namespace",
                value: name,
                reason: format!("longer than {} characters", MAX_NAMESPACE_LEN),
            });
        }

        Ok(Self {
            tenant,
            environment,
            name,
        })
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// The Kubernetes namespace name
    pub fn as_str(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for TenantNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Validate a DNS-1123 label: lowercase alphanumerics and '-', alphanumeric at both ends
fn validate_label(field: &'static str, value: &str) -> Result<()> {
    let invalid = |reason: &str| CoreError::InvalidName {
        field,
        value: value.to_string(),
        reason: reason.to_string(),
    };

    if value.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if value.len() > MAX_NAMESPACE_LEN {
        return Err(invalid("longer than 63 characters"));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(invalid(
            "only lowercase letters, digits and '-' are allowed",
        ));
    }
    if value.starts_with('-') || value.ends_with('-') {
        return Err(invalid("must start and end with an alphanumeric character"));
    }
    Ok(())
}
