//! Label resolution: which selectors identify a module's workloads
//!
//! Modules have been deployed under several labelling generations:
//! - the platform module label (`platform.tenantmod.io/module=<name>`), possibly
//!   carrying a parent chart name shared by several modules
//! - the Helm instance label (`app.kubernetes.io/instance=<release>`)
//! - generic app-name labels (`app.kubernetes.io/name=<app>`)
//! - legacy `service=<name>` labels
//! - ad-hoc selectors from the catalog, usually paired with a name filter
//!
//! The resolver turns a catalog entry into an ordered, de-duplicated list of
//! candidate selectors. It performs no I/O and never fails.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::catalog::ModuleDefinition;
use crate::error::CoreError;
use crate::module::TenantNamespace;
use crate::release::release_name;

/// Default label key carrying the module name
pub const DEFAULT_MODULE_LABEL_KEY: &str = "platform.tenantmod.io/module";

/// Helm instance label
pub const INSTANCE_LABEL_KEY: &str = "app.kubernetes.io/instance";

/// Generic application name label
pub const APP_NAME_LABEL_KEY: &str = "app.kubernetes.io/name";

/// Legacy service label
pub const SERVICE_LABEL_KEY: &str = "service";

/// Regex applied to workload names after a broad selector matched
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NameFilter {
    pattern: String,
    regex: Regex,
}

impl NameFilter {
    pub fn new(pattern: impl Into<String>) -> Result<Self, CoreError> {
        let pattern = pattern.into();
        let regex = Regex::new(&pattern).map_err(|source| CoreError::InvalidFilter {
            pattern: pattern.clone(),
            source,
        })?;
        Ok(Self { pattern, regex })
    }

    /// Whether a workload name passes the filter
    pub fn matches(&self, workload_name: &str) -> bool {
        self.regex.is_match(workload_name)
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

impl PartialEq for NameFilter {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}

impl Eq for NameFilter {}

impl TryFrom<String> for NameFilter {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<NameFilter> for String {
    fn from(value: NameFilter) -> Self {
        value.pattern
    }
}

/// Where a candidate selector came from, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectorSource {
    ModuleLabel,
    Alias,
    Instance,
    AppName,
    Service,
    Catalog,
}

/// A label selector to probe, with an optional post-filter on workload names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateSelector {
    pub selector: String,
    pub source: SelectorSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<NameFilter>,
}

impl CandidateSelector {
    pub fn new(selector: impl Into<String>, source: SelectorSource) -> Self {
        Self {
            selector: selector.into(),
            source,
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: NameFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Whether a workload found by this selector belongs to the module
    pub fn accepts(&self, workload_name: &str) -> bool {
        self.filter
            .as_ref()
            .map(|f| f.matches(workload_name))
            .unwrap_or(true)
    }
}

impl fmt::Display for CandidateSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.filter {
            Some(filter) => write!(f, "{} (name ~ /{}/)", self.selector, filter.pattern()),
            None => f.write_str(&self.selector),
        }
    }
}

/// Maps catalog entries to candidate selectors
#[derive(Debug, Clone)]
pub struct LabelResolver {
    module_label_key: String,
}

impl Default for LabelResolver {
    fn default() -> Self {
        Self::new(DEFAULT_MODULE_LABEL_KEY)
    }
}

impl LabelResolver {
    pub fn new(module_label_key: impl Into<String>) -> Self {
        Self {
            module_label_key: module_label_key.into(),
        }
    }

    pub fn module_label_key(&self) -> &str {
        &self.module_label_key
    }

    /// Candidate selectors for a module, most specific first
    pub fn resolve(
        &self,
        module: &ModuleDefinition,
        namespace: &TenantNamespace,
    ) -> Vec<CandidateSelector> {
        let name = module.name.as_str();
        let hints = &module.labels;
        let mut candidates = Vec::new();

        candidates.push(CandidateSelector::new(
            format!("{}={}", self.module_label_key, name),
            SelectorSource::ModuleLabel,
        ));

        for alias in &hints.aliases {
            let mut candidate = CandidateSelector::new(
                format!("{}={}", self.module_label_key, alias),
                SelectorSource::Alias,
            );
            // A parent chart label also matches sibling modules
            candidate.filter = hints.alias_filter.clone();
            candidates.push(candidate);
        }

        candidates.push(CandidateSelector::new(
            format!(
                "{}={}",
                INSTANCE_LABEL_KEY,
                release_name(&module.name, namespace)
            ),
            SelectorSource::Instance,
        ));

        if hints.app_names.is_empty() {
            candidates.push(CandidateSelector::new(
                format!("{}={}", APP_NAME_LABEL_KEY, name),
                SelectorSource::AppName,
            ));
        } else {
            for app in &hints.app_names {
                candidates.push(CandidateSelector::new(
                    format!("{}={}", APP_NAME_LABEL_KEY, app),
                    SelectorSource::AppName,
                ));
            }
        }

        candidates.push(CandidateSelector::new(
            format!("{}={}", SERVICE_LABEL_KEY, name),
            SelectorSource::Service,
        ));
        for service in &hints.services {
            candidates.push(CandidateSelector::new(
                format!("{}={}", SERVICE_LABEL_KEY, service),
                SelectorSource::Service,
            ));
        }

        for extra in &hints.selectors {
            let mut candidate = CandidateSelector::new(&extra.selector, SelectorSource::Catalog);
            candidate.filter = extra.name_filter.clone();
            candidates.push(candidate);
        }

        let mut seen = HashSet::new();
        candidates.retain(|c| seen.insert(c.selector.clone()));
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ModuleCatalog;

    const CATALOG: &str = r#"
modules:
  spark:
    displayName: Apache Spark
    chartPath: data-lake-baremetal
    labels:
      aliases: [data-lake-baremetal]
      aliasFilter: spark
      services: [spark-master, spark-worker]
      selectors:
        - selector: component=data-lake
          nameFilter: "^spark-"
  grafana:
    displayName: Grafana
    labels:
      appNames: [grafana, grafana-agent]
"#;

    fn ns() -> TenantNamespace {
        TenantNamespace::new("acme", "dev").unwrap()
    }

    #[test]
    fn test_resolve_priority_order() {
        let catalog = ModuleCatalog::from_yaml(CATALOG).unwrap();
        let spark = catalog.get("spark").unwrap();

        let selectors = LabelResolver::default().resolve(spark, &ns());
        let rendered: Vec<&str> = selectors.iter().map(|c| c.selector.as_str()).collect();

        assert_eq!(
            rendered,
            vec![
                "platform.tenantmod.io/module=spark",
                "platform.tenantmod.io/module=data-lake-baremetal",
                "app.kubernetes.io/instance=acme-dev-spark",
                "app.kubernetes.io/name=spark",
                "service=spark",
                "service=spark-master",
                "service=spark-worker",
                "component=data-lake",
            ]
        );

        let sources: Vec<SelectorSource> = selectors.iter().map(|c| c.source).collect();
        let mut sorted = sources.clone();
        sorted.sort();
        assert_eq!(sources, sorted, "sources must be in priority order");
    }

    #[test]
    fn test_resolve_attaches_filters() {
        let catalog = ModuleCatalog::from_yaml(CATALOG).unwrap();
        let spark = catalog.get("spark").unwrap();
        let selectors = LabelResolver::default().resolve(spark, &ns());

        let broad = selectors
            .iter()
            .find(|c| c.selector == "component=data-lake")
            .unwrap();
        assert!(broad.accepts("spark-master"));
        assert!(!broad.accepts("minio"));

        let alias = selectors
            .iter()
            .find(|c| c.source == SelectorSource::Alias)
            .unwrap();
        assert!(alias.accepts("data-lake-spark-worker"));
        assert!(!alias.accepts("data-lake-dremio"));

        let primary = &selectors[0];
        assert!(primary.filter.is_none());
        assert!(primary.accepts("anything"));
    }

    #[test]
    fn test_resolve_app_names_replace_default() {
        let catalog = ModuleCatalog::from_yaml(CATALOG).unwrap();
        let grafana = catalog.get("grafana").unwrap();
        let selectors = LabelResolver::new("example.com/module").resolve(grafana, &ns());

        assert_eq!(selectors[0].selector, "example.com/module=grafana");
        assert!(selectors
            .iter()
            .any(|c| c.selector == "app.kubernetes.io/name=grafana-agent"));
        assert_eq!(
            selectors
                .iter()
                .filter(|c| c.source == SelectorSource::AppName)
                .count(),
            2
        );
    }

    #[test]
    fn test_resolve_removes_duplicates() {
        let yaml = r#"
modules:
  vault:
    labels:
      appNames: [vault]
      services: [vault]
      selectors:
        - selector: service=vault
"#;
        let catalog = ModuleCatalog::from_yaml(yaml).unwrap();
        let vault = catalog.get("vault").unwrap();
        let selectors = LabelResolver::default().resolve(vault, &ns());

        let count = selectors
            .iter()
            .filter(|c| c.selector == "service=vault")
            .count();
        assert_eq!(count, 1);
        assert_eq!(selectors.len(), 4);
    }

    #[test]
    fn test_name_filter_rejects_invalid_regex() {
        assert!(NameFilter::new("(unclosed").is_err());
    }
}
