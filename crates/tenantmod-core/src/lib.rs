//! tenantmod Core - Core types for the tenant module platform
//!
//! This crate provides the foundational types used throughout tenantmod:
//! - `ModuleName` / `TenantNamespace`: identifiers (`{tenant}-{environment}`)
//! - `ModuleStatus` / `ReplicaState`: module health derived from replica counts
//! - `ReleaseRecord` / `CleanupTier`: release identity and disable aggressiveness
//! - `ModuleCatalog`: externally supplied module definitions
//! - `LabelResolver`: catalog-driven workload selectors
//! - `PlatformConfig`: timeouts, defaults and release manager settings
//! - `Values` / `SetOverrides`: values payloads and `--set` overrides

pub mod catalog;
pub mod config;
pub mod error;
pub mod module;
pub mod release;
pub mod selector;
pub mod status;
pub mod values;

pub use catalog::{
    CatalogSource, Category, ExtraSelector, LabelHints, ModuleCatalog, ModuleDefinition,
    ResourceTier,
};
pub use config::{Defaults, PlatformConfig, ReleaseManagerConfig, SettleConfig, Timeouts};
pub use error::{CoreError, Result};
pub use module::{ModuleName, TenantNamespace};
pub use release::{CleanupTier, MAX_RELEASE_NAME_LEN, ReleaseRecord, release_name};
pub use selector::{CandidateSelector, LabelResolver, NameFilter, SelectorSource};
pub use status::{ModuleStatus, ReplicaState, derive_status};
pub use values::{SetOverrides, Values, parse_set_values};
