//! Error types for shared-storages.
//!
//! This module defines the error type used throughout the library. The binary
//! wraps it in `anyhow` at command boundaries.

use std::path::PathBuf;
use thiserror::Error;

use crate::dependency::DependencyError;

/// Result type alias for shared-storages operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for shared-storages.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Lookup Errors
    // ========================================================================
    /// No VPC carries the requested `Name` tag.
    #[error("Could not find any VPC named '{name}' in account {account}, region {region}")]
    VpcNotFound {
        /// VPC name tag
        name: String,
        /// Target account
        account: String,
        /// Target region
        region: String,
    },

    /// More than one VPC carries the requested `Name` tag.
    #[error("Found {count} VPCs named '{name}'; the lookup must match exactly one")]
    AmbiguousVpc {
        /// VPC name tag
        name: String,
        /// Number of matching VPCs
        count: usize,
    },

    /// The cloud provider rejected a lookup call.
    #[error("VPC lookup failed: {0}")]
    VpcLookup(String),

    /// Account or region missing for an environment-dependent lookup.
    #[error(
        "Cannot look up VPC '{vpc_name}': {missing} is not specified for the stack \
         (set CDK_DEFAULT_ACCOUNT / CDK_DEFAULT_REGION or pass --account / --region)"
    )]
    EnvironmentUnresolved {
        /// VPC being looked up
        vpc_name: String,
        /// Which part of the environment is missing
        missing: &'static str,
    },

    /// No live lookup provider is available for a missing context entry.
    #[error("No cached context for '{key}' and lookups are disabled")]
    ContextMissing {
        /// Context key
        key: String,
    },

    // ========================================================================
    // Context Cache Errors
    // ========================================================================
    /// The context file could not be read or written.
    #[error("Context file '{path}': {message}")]
    ContextFile {
        /// Path to the context file
        path: PathBuf,
        /// Error message
        message: String,
    },

    // ========================================================================
    // Construction Errors
    // ========================================================================
    /// Two constructs were declared with the same path.
    #[error("There is already a construct with path '{0}' in the stack")]
    DuplicateConstruct(String),

    /// A construct path did not match any declared resource.
    #[error("No construct found at path '{0}'")]
    ConstructNotFound(String),

    /// No subnets matched the file-system subnet selection.
    #[error("Subnet selection failed for VPC '{vpc_id}': {message}")]
    SubnetSelection {
        /// VPC id
        vpc_id: String,
        /// Error message
        message: String,
    },

    // ========================================================================
    // Synthesis Errors
    // ========================================================================
    /// A resource references a logical ID that is not declared.
    #[error("Resource '{from}' references undeclared logical ID '{target}'")]
    UnknownReference {
        /// Referencing resource
        from: String,
        /// Missing logical ID
        target: String,
    },

    /// The resource graph is not a DAG.
    #[error(transparent)]
    Dependency(#[from] DependencyError),

    /// Strict review rejected the template.
    #[error("Security review failed with {0} finding(s)")]
    ReviewFailed(usize),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid configuration value.
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidConfig {
        /// Configuration key
        key: String,
        /// Error message
        message: String,
    },

    // ========================================================================
    // IO / Serialization Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Creates a new context file error.
    pub fn context_file(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ContextFile {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new invalid configuration error.
    pub fn invalid_config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Returns true if the error came from resolving the target network.
    pub fn is_lookup_failure(&self) -> bool {
        matches!(
            self,
            Error::VpcNotFound { .. }
                | Error::AmbiguousVpc { .. }
                | Error::VpcLookup(_)
                | Error::EnvironmentUnresolved { .. }
                | Error::ContextMissing { .. }
        )
    }

    /// Returns the error code for CLI exit status.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::ReviewFailed(_) => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vpc_not_found_message() {
        let err = Error::VpcNotFound {
            name: "Infra/dev-vpc".to_string(),
            account: "123456789012".to_string(),
            region: "eu-west-1".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Infra/dev-vpc"));
        assert!(msg.contains("123456789012"));
        assert!(msg.contains("eu-west-1"));
        assert!(err.is_lookup_failure());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(Error::ReviewFailed(1).exit_code(), 2);
        assert_eq!(Error::DuplicateConstruct("a".into()).exit_code(), 1);
        assert!(!Error::ReviewFailed(1).is_lookup_failure());
    }
}
