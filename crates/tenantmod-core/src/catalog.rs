//! Module catalog: the externally supplied definition of every platform module
//!
//! The catalog is plain configuration data. Adding a module, or teaching the
//! platform a new labelling convention for an existing one, is a catalog edit
//! and never a code change.
//!
//! ```yaml
//! moduleLabelKey: platform.tenantmod.io/module
//! modules:
//!   spark:
//!     displayName: Apache Spark
//!     category: data-processing
//!     chartPath: data-lake-baremetal
//!     dependencies: [minio]
//!     helmValues:
//!       spark.enabled: true
//!     hookJobs: [data-lake-init]
//!     coResident: [minio]
//!     labels:
//!       aliases: [data-lake-baremetal]
//!       aliasFilter: spark
//!       selectors:
//!         - selector: component=data-lake
//!           nameFilter: "^spark-"
//! tiers:
//!   bronze:
//!     resourceQuota:
//!       requests.cpu: "10"
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::error::{CoreError, Result};
use crate::module::ModuleName;
use crate::selector::{DEFAULT_MODULE_LABEL_KEY, LabelResolver, NameFilter};

/// Labelling hints used by the label resolver
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelHints {
    /// Other values of the module label that also carry this module
    /// (e.g. a parent chart shared by several modules)
    #[serde(default)]
    pub aliases: Vec<String>,

    /// Name filter applied to workloads found through an alias
    #[serde(default)]
    pub alias_filter: Option<NameFilter>,

    /// `app.kubernetes.io/name` values; defaults to the module name
    #[serde(default)]
    pub app_names: Vec<String>,

    /// Additional legacy `service=` values
    #[serde(default)]
    pub services: Vec<String>,

    /// Free-form selectors, tried last
    #[serde(default)]
    pub selectors: Vec<ExtraSelector>,
}

/// A catalog-supplied selector with an optional workload name filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtraSelector {
    pub selector: String,
    #[serde(default)]
    pub name_filter: Option<NameFilter>,
}

/// Module entry as written in the catalog file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModuleSpec {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    chart_path: Option<String>,
    #[serde(default)]
    dependencies: Vec<ModuleName>,
    #[serde(default)]
    helm_values: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    hook_jobs: Vec<String>,
    #[serde(default)]
    co_resident: Vec<ModuleName>,
    #[serde(default)]
    labels: LabelHints,
}

/// A platform module definition
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDefinition {
    pub name: ModuleName,
    pub display_name: String,
    pub description: String,
    pub version: String,
    pub category: String,
    /// Chart directory, relative to the charts root
    pub chart_path: String,
    pub dependencies: Vec<ModuleName>,
    /// Values always passed as overrides when installing this module
    pub helm_values: serde_json::Map<String, serde_json::Value>,
    /// One-shot Jobs left behind by failed installs that block hooks
    pub hook_jobs: Vec<String>,
    /// Modules sharing auxiliary resources with this one by convention
    pub co_resident: Vec<ModuleName>,
    pub labels: LabelHints,
}

impl ModuleDefinition {
    fn from_spec(name: ModuleName, spec: ModuleSpec) -> Self {
        Self {
            display_name: spec.display_name.unwrap_or_else(|| name.to_string()),
            description: spec.description,
            version: spec.version.unwrap_or_else(|| "latest".to_string()),
            category: spec.category.unwrap_or_else(|| "uncategorized".to_string()),
            chart_path: spec.chart_path.unwrap_or_else(|| name.to_string()),
            dependencies: spec.dependencies,
            helm_values: spec.helm_values,
            hook_jobs: spec.hook_jobs,
            co_resident: spec.co_resident,
            labels: spec.labels,
            name,
        }
    }

    /// Minimal definition for a module with no catalog metadata
    pub fn bare(name: ModuleName) -> Self {
        Self::from_spec(name, ModuleSpec::default())
    }
}

/// Module category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: Option<String>,
}

/// Resource tier (quota template) a tenant installs modules under
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTier {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub resource_quota: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogFile {
    #[serde(default)]
    module_label_key: Option<String>,
    #[serde(default)]
    modules: IndexMap<ModuleName, ModuleSpec>,
    #[serde(default)]
    categories: IndexMap<String, Category>,
    #[serde(default)]
    tiers: IndexMap<String, ResourceTier>,
}

/// The loaded module catalog
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleCatalog {
    module_label_key: String,
    modules: IndexMap<ModuleName, ModuleDefinition>,
    categories: IndexMap<String, Category>,
    tiers: IndexMap<String, ResourceTier>,
}

impl ModuleCatalog {
    /// Load a catalog file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CoreError::CatalogNotFound {
                path: path.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse and validate a catalog
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let file: CatalogFile = serde_yaml::from_str(yaml)?;

        let modules: IndexMap<ModuleName, ModuleDefinition> = file
            .modules
            .into_iter()
            .map(|(name, spec)| (name.clone(), ModuleDefinition::from_spec(name, spec)))
            .collect();

        let catalog = Self {
            module_label_key: file
                .module_label_key
                .unwrap_or_else(|| DEFAULT_MODULE_LABEL_KEY.to_string()),
            modules,
            categories: file.categories,
            tiers: file.tiers,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<()> {
        if self.module_label_key.trim().is_empty() {
            return Err(CoreError::InvalidCatalog {
                message: "moduleLabelKey must not be empty".to_string(),
            });
        }

        for module in self.modules.values() {
            for dep in &module.dependencies {
                if dep == &module.name {
                    return Err(CoreError::InvalidCatalog {
                        message: format!("module '{}' depends on itself", module.name),
                    });
                }
                if !self.modules.contains_key(dep) {
                    return Err(CoreError::InvalidCatalog {
                        message: format!(
                            "module '{}' depends on unknown module '{}'",
                            module.name, dep
                        ),
                    });
                }
            }
            for extra in &module.labels.selectors {
                if extra.selector.trim().is_empty() {
                    return Err(CoreError::InvalidCatalog {
                        message: format!("module '{}' has an empty selector", module.name),
                    });
                }
            }
        }
        Ok(())
    }

    /// Label resolver configured with this catalog's module label key
    pub fn resolver(&self) -> LabelResolver {
        LabelResolver::new(&self.module_label_key)
    }

    pub fn module_label_key(&self) -> &str {
        &self.module_label_key
    }

    /// Look up a module by name
    pub fn get(&self, name: &str) -> Option<&ModuleDefinition> {
        self.modules.iter().find(|(k, _)| k.as_str() == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// All modules, in catalog order
    pub fn modules(&self) -> impl Iterator<Item = &ModuleDefinition> {
        self.modules.values()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Modules in a category
    pub fn by_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a ModuleDefinition> {
        self.modules.values().filter(move |m| m.category == category)
    }

    pub fn categories(&self) -> &IndexMap<String, Category> {
        &self.categories
    }

    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories.get(name)
    }

    pub fn tiers(&self) -> &IndexMap<String, ResourceTier> {
        &self.tiers
    }

    pub fn tier(&self, name: &str) -> Option<&ResourceTier> {
        self.tiers.get(name)
    }

    /// Check that every dependency of the selected modules is also selected
    ///
    /// Returns one message per missing dependency; unknown modules are
    /// reported too.
    pub fn validate_dependencies(&self, selected: &[&str]) -> Vec<String> {
        let mut missing = Vec::new();
        for name in selected {
            match self.get(name) {
                Some(module) => {
                    for dep in &module.dependencies {
                        if !selected.contains(&dep.as_str()) {
                            missing.push(format!("{} requires {}", name, dep));
                        }
                    }
                }
                None => missing.push(format!("{} is not in the catalog", name)),
            }
        }
        missing
    }
}

/// Owns the catalog path and the currently loaded catalog
///
/// Readers take a snapshot; `reload` swaps the snapshot only when the new
/// file parses, so a broken edit never replaces a working catalog.
#[derive(Debug)]
pub struct CatalogSource {
    path: PathBuf,
    current: RwLock<Arc<ModuleCatalog>>,
}

impl CatalogSource {
    /// Load the catalog at `path`
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let catalog = ModuleCatalog::load(&path)?;
        Ok(Self {
            path,
            current: RwLock::new(Arc::new(catalog)),
        })
    }

    /// Wrap an already loaded catalog (no backing file reloads)
    pub fn fixed(catalog: ModuleCatalog) -> Self {
        Self {
            path: PathBuf::new(),
            current: RwLock::new(Arc::new(catalog)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current catalog
    pub fn snapshot(&self) -> Arc<ModuleCatalog> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Re-read the catalog file
    pub fn reload(&self) -> Result<Arc<ModuleCatalog>> {
        if self.path.as_os_str().is_empty() {
            return Ok(self.snapshot());
        }

        let catalog = Arc::new(ModuleCatalog::load(&self.path)?);
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = Arc::clone(&catalog);
        tracing::info!(
            path = %self.path.display(),
            modules = catalog.len(),
            "module catalog reloaded"
        );
        Ok(catalog)
    }
}
