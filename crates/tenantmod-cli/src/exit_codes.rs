//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

#![allow(dead_code)]

/// Success - operation completed without errors
pub const SUCCESS: i32 = 0;

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Validation error - invalid module name, tier, values or dependency set
pub const VALIDATION_ERROR: i32 = 2;

/// Not found - module not in the catalog or tenant namespace missing
pub const NOT_FOUND: i32 = 3;

/// Config error - unreadable configuration or catalog
pub const CONFIG_ERROR: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Cluster error - the cluster API could not be reached
pub const CLUSTER_ERROR: i32 = 6;

/// Release error - the release manager reported failure
pub const RELEASE_ERROR: i32 = 7;

/// Timeout - the release manager did not finish in time
pub const TIMEOUT: i32 = 8;

/// Busy - another operation holds the release
pub const BUSY: i32 = 9;

/// Usage error - invalid arguments or options (following sysexits.h convention)
pub const USAGE_ERROR: i32 = 64;

/// Cancelled - interrupted by SIGINT (128 + 2)
pub const CANCELLED: i32 = 130;
