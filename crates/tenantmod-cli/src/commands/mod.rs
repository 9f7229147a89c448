//! CLI commands

// Catalog inspection
pub mod check_deps;
pub mod modules;
pub mod tiers;

// Cluster operations
pub mod disable;
pub mod enable;
pub mod status;
