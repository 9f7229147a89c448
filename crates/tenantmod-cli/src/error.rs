//! CLI error types with exit code handling
//!
//! Every failure a command can produce is funneled into [`CliError`], which
//! carries the exit code the process ends with.

use miette::Diagnostic;
use thiserror::Error;

use tenantmod_core::CoreError;
use tenantmod_kube::PlatformError;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Invalid input (names, tiers, values, dependency sets)
    #[error("Validation failed: {message}")]
    #[diagnostic(code(tenantmod::cli::validation))]
    Validation {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Configuration could not be loaded
    #[error("Configuration error: {message}")]
    #[diagnostic(code(tenantmod::cli::config))]
    Config {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Arguments were well-formed but not acceptable together
    #[error("{message}")]
    #[diagnostic(code(tenantmod::cli::usage))]
    Usage {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Lifecycle operation failed
    #[error("{message}")]
    #[diagnostic(code(tenantmod::cli::platform))]
    Platform {
        message: String,
        code: i32,
        #[help]
        help: Option<String>,
    },

    /// Selected modules are missing dependencies
    #[error("{count} missing dependency(ies)")]
    #[diagnostic(code(tenantmod::cli::dependencies))]
    DependencyCheck { count: usize },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(tenantmod::cli::io))]
    Io { message: String },

    /// Internal error (runtime, unexpected failure)
    #[error("Internal error: {message}")]
    #[diagnostic(code(tenantmod::cli::internal))]
    Internal { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Validation { .. } => exit_codes::VALIDATION_ERROR,
            CliError::Config { .. } => exit_codes::CONFIG_ERROR,
            CliError::Usage { .. } => exit_codes::USAGE_ERROR,
            CliError::Platform { code, .. } => *code,
            CliError::DependencyCheck { .. } => exit_codes::VALIDATION_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Internal { .. } => exit_codes::ERROR,
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            help: None,
        }
    }

    /// Create a usage error with help text
    pub fn usage_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a configuration error with help text
    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::internal(format!("failed to serialize output: {}", err))
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::CatalogNotFound { .. } => CliError::config_with_help(
                message,
                "Pass --catalog or set catalogPath in the configuration file",
            ),
            CoreError::InvalidCatalog { .. }
            | CoreError::InvalidConfig { .. }
            | CoreError::YamlParse(_)
            | CoreError::JsonParse(_) => CliError::Config {
                message,
                help: None,
            },
            CoreError::Io(_) => CliError::Io { message },
            _ => CliError::validation(message),
        }
    }
}

impl From<PlatformError> for CliError {
    fn from(err: PlatformError) -> Self {
        let (code, help) = match err.root() {
            PlatformError::ModuleUnknown { .. } => (
                exit_codes::NOT_FOUND,
                Some("Run `tenantmod modules` to list the catalog".to_string()),
            ),
            PlatformError::NamespaceMissing { .. } => (exit_codes::NOT_FOUND, None),
            PlatformError::UnknownTier { .. } => (
                exit_codes::VALIDATION_ERROR,
                Some("Run `tenantmod tiers` to list resource tiers".to_string()),
            ),
            PlatformError::ArtifactMissing { .. } => (exit_codes::CONFIG_ERROR, None),
            PlatformError::ClusterUnreachable { .. } => (
                exit_codes::CLUSTER_ERROR,
                Some("Check the kube context and that the API server is reachable".to_string()),
            ),
            PlatformError::DeploymentTimedOut { .. } => (
                exit_codes::TIMEOUT,
                Some("Retry with --attempts, or check `tenantmod status`".to_string()),
            ),
            PlatformError::OperationInProgress { .. } => (exit_codes::BUSY, None),
            PlatformError::DeploymentFailed { .. } | PlatformError::UndeploymentFailed { .. } => {
                (exit_codes::RELEASE_ERROR, None)
            }
            PlatformError::Cancelled { .. } => (exit_codes::CANCELLED, None),
            PlatformError::InvalidConfig(_) => (exit_codes::CONFIG_ERROR, None),
            PlatformError::Io(_) => (exit_codes::IO_ERROR, None),
            PlatformError::Core(CoreError::InvalidName { .. })
            | PlatformError::Core(CoreError::Values { .. }) => {
                (exit_codes::VALIDATION_ERROR, None)
            }
            _ => (exit_codes::ERROR, None),
        };

        CliError::Platform {
            message: err.to_string(),
            code,
            help,
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
