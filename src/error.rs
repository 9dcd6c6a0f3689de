//! Error types for cb-provision.
//!
//! Defines the main error enum used throughout the application.

use thiserror::Error;

/// Main error type for provisioning operations.
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// Configuration errors (unreadable file, invalid YAML, failed validation, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Cluster connection errors (host unreachable, auth failed, bad CA cert, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// A bucket lookup that found no bucket with the given name.
    #[error("Bucket '{0}' not found")]
    BucketNotFound(String),

    /// Bucket management errors (lookup, create, or update refused by the cluster).
    #[error("Bucket management error: {0}")]
    Management(String),

    /// A declared bucket conflicts with an existing one on an attribute that
    /// is fixed at creation time.
    #[error("Storage backend mismatch for bucket '{name}': existing={existing}, declared={declared}")]
    BackendMismatch {
        name: String,
        existing: String,
        declared: String,
    },

    /// Query execution errors reported by the query service.
    #[error("Query error: {0}")]
    Query(String),

    /// A named DDL statement that failed to execute.
    #[error("Statement '{name}' failed: {cause}")]
    Statement { name: String, cause: String },
}

impl ProvisionError {
    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a not-found error for the given bucket name.
    pub fn bucket_not_found(name: impl Into<String>) -> Self {
        Self::BucketNotFound(name.into())
    }

    /// Creates a bucket management error with the given message.
    pub fn management(msg: impl Into<String>) -> Self {
        Self::Management(msg.into())
    }

    /// Creates a backend mismatch error naming both conflicting values.
    pub fn backend_mismatch(
        name: impl Into<String>,
        existing: impl Into<String>,
        declared: impl Into<String>,
    ) -> Self {
        Self::BackendMismatch {
            name: name.into(),
            existing: existing.into(),
            declared: declared.into(),
        }
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates a statement error attributed to the statement's declared name.
    pub fn statement(name: impl Into<String>, cause: impl Into<String>) -> Self {
        Self::Statement {
            name: name.into(),
            cause: cause.into(),
        }
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "Configuration Error",
            Self::Connection(_) => "Connection Error",
            Self::BucketNotFound(_) | Self::Management(_) | Self::BackendMismatch { .. } => {
                "Bucket Error"
            }
            Self::Query(_) => "Query Error",
            Self::Statement { .. } => "Statement Error",
        }
    }
}

/// Result type alias using ProvisionError.
pub type Result<T> = std::result::Result<T, ProvisionError>;
