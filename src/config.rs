//! Configuration model for cb-provision.
//!
//! Handles loading the declarative YAML provisioning file: cluster
//! connection details, bucket specifications, and the ordered pre/post
//! DDL statement lists.

use crate::cluster::{BucketType, StorageBackend};
use crate::error::{ProvisionError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Longest bucket name the cluster accepts.
const MAX_BUCKET_NAME_LEN: usize = 100;

/// Top-level provisioning configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Cluster endpoint and credentials.
    pub connection_details: ConnectionConfig,

    /// Buckets to reconcile, in declaration order.
    #[serde(default)]
    pub buckets: Vec<BucketSpec>,

    /// Statements executed before bucket reconciliation.
    #[serde(default)]
    pub pre_ddl_statements: Vec<StatementSpec>,

    /// Statements executed after bucket reconciliation.
    #[serde(default)]
    pub post_ddl_statements: Vec<StatementSpec>,
}

/// Cluster connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Cluster user.
    pub user: String,

    /// Cluster password.
    pub password: String,

    /// Cluster endpoint (`couchbase://`, `couchbases://`, `http://`, or `https://`).
    pub url: String,

    /// Optional CA certificate for TLS verification.
    #[serde(default)]
    pub ca_certificate: CaCertificate,
}

impl ConnectionConfig {
    /// Returns a display-safe string (no password) for logging purposes.
    pub fn display_string(&self) -> String {
        format!("{} as {}", self.url, self.user)
    }
}

/// An embedded CA certificate, written out to `name` at load time so that
/// external tooling can reference the same trust anchor.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CaCertificate {
    /// Whether the certificate should be used at all.
    #[serde(default)]
    pub enabled: bool,

    /// File name the certificate content is persisted under.
    #[serde(default)]
    pub name: String,

    /// PEM-encoded certificate content.
    #[serde(default)]
    pub content: String,
}

impl CaCertificate {
    fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        if self.content.trim().is_empty() {
            return Err(ProvisionError::config(
                "ca_certificate is enabled but has no content",
            ));
        }
        if self.name.trim().is_empty() {
            return Err(ProvisionError::config(
                "ca_certificate is enabled but has no file name",
            ));
        }
        Ok(())
    }

    /// Writes the certificate content to its named file. No-op when disabled.
    pub fn persist(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        std::fs::write(&self.name, &self.content).map_err(|e| {
            ProvisionError::config(format!("Failed to write CA certificate {}: {e}", self.name))
        })
    }
}

/// Declared state of a single bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketSpec {
    /// Bucket name, unique within a configuration.
    pub name: String,

    /// Memory quota per node, in MiB.
    pub ram_quota_mb: u64,

    /// Bucket type. Defaults to `couchbase`.
    #[serde(default)]
    pub bucket_type: BucketType,

    /// Number of replicas. Defaults to 0.
    #[serde(default)]
    pub num_replicas: u32,

    /// Whether the bucket may be flushed. Defaults to false.
    #[serde(default)]
    pub flush_enabled: bool,

    /// Storage backend, fixed once the bucket exists. Defaults to `couchstore`.
    #[serde(default)]
    pub storage_backend: StorageBackend,
}

impl BucketSpec {
    /// Checks the cluster's naming rule (1-100 characters drawn from
    /// letters, digits, period, percent, underscore, and hyphen) and that
    /// the quota is positive.
    fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(ProvisionError::config("Bucket name must not be empty"));
        }
        if self.name.len() > MAX_BUCKET_NAME_LEN {
            return Err(ProvisionError::config(format!(
                "Bucket name '{}' exceeds {MAX_BUCKET_NAME_LEN} characters",
                self.name
            )));
        }
        if let Some(c) = self
            .name
            .chars()
            .find(|c| !c.is_ascii_alphanumeric() && !matches!(c, '.' | '%' | '_' | '-'))
        {
            return Err(ProvisionError::config(format!(
                "Bucket name '{}' contains unsupported character '{c}'",
                self.name
            )));
        }
        if self.ram_quota_mb == 0 {
            return Err(ProvisionError::config(format!(
                "Bucket '{}' must declare a positive ram_quota_mb",
                self.name
            )));
        }
        Ok(())
    }
}

/// A named DDL statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementSpec {
    /// Name used for logging and error attribution.
    #[serde(rename = "query_name")]
    pub name: String,

    /// The statement body.
    #[serde(rename = "n1ql")]
    pub statement: String,
}

impl Config {
    /// Loads configuration from a YAML file.
    ///
    /// Validates the declared state and persists any embedded CA certificate
    /// before returning, so every failure here precedes cluster contact.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProvisionError::config(format!("Failed to read config file {}: {e}", path.display()))
        })?;

        let config = Self::parse_yaml(&content, path)?;
        config.validate()?;
        config.connection_details.ca_certificate.persist()?;
        Ok(config)
    }

    /// Parses configuration from a YAML string.
    fn parse_yaml(content: &str, path: &Path) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| {
            ProvisionError::config(format!("Invalid configuration in {}: {e}", path.display()))
        })
    }

    /// Checks the invariants the configuration owns: bucket names are legal
    /// and unique, quotas are positive. Cluster-side bounds such as minimum
    /// quotas and replica limits are left to the cluster.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for bucket in &self.buckets {
            bucket.validate()?;
            if !seen.insert(bucket.name.as_str()) {
                return Err(ProvisionError::config(format!(
                    "Duplicate bucket name '{}'",
                    bucket.name
                )));
            }
        }
        self.connection_details.ca_certificate.validate()
    }
}
