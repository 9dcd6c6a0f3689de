//! Cluster abstraction layer for cb-provision.
//!
//! Provides trait-based interfaces for the two cluster capabilities the
//! provisioning engine needs: bucket management and statement execution.

mod mock;
mod rest;

pub use mock::{ClusterCall, MockCluster};
pub use rest::CouchbaseCluster;

use crate::config::{BucketSpec, ConnectionConfig};
use crate::error::Result;
use async_trait::async_trait;

/// Supported bucket types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketType {
    #[default]
    Couchbase,
    Ephemeral,
    Memcached,
}

impl BucketType {
    /// Returns the bucket type as the string the management API expects.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Couchbase => "couchbase",
            Self::Ephemeral => "ephemeral",
            Self::Memcached => "memcached",
        }
    }

    /// Parses a bucket type from a string.
    ///
    /// The management API reports couchbase buckets under the legacy name
    /// `membase`; both spellings are accepted.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "couchbase" | "membase" => Some(Self::Couchbase),
            "ephemeral" => Some(Self::Ephemeral),
            "memcached" => Some(Self::Memcached),
            _ => None,
        }
    }
}

/// Supported storage backends. Fixed at bucket creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Couchstore,
    Magma,
}

impl StorageBackend {
    /// Returns the backend as the string the management API expects.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Couchstore => "couchstore",
            Self::Magma => "magma",
        }
    }

    /// Parses a storage backend from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "couchstore" => Some(Self::Couchstore),
            "magma" => Some(Self::Magma),
            _ => None,
        }
    }
}

/// Conflict resolution policy for bucket creation. The cluster fixes the
/// policy once a bucket exists; provisioning always creates with
/// sequence-number resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictResolution {
    #[default]
    SequenceNumber,
}

impl ConflictResolution {
    /// Returns the policy as the string the management API expects.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SequenceNumber => "seqno",
        }
    }
}

/// Observed state of an existing bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketInfo {
    pub name: String,
    pub bucket_type: BucketType,
    pub ram_quota_mb: u64,
    pub num_replicas: u32,
    pub flush_enabled: bool,
    /// Absent when the cluster reports no backend (ephemeral and memcached
    /// buckets have none).
    pub storage_backend: Option<StorageBackend>,
}

/// Connects to the cluster described by the configuration and verifies that
/// it is reachable with the given credentials.
///
/// This is the central factory function for cluster handles.
pub async fn connect(config: &ConnectionConfig) -> Result<CouchbaseCluster> {
    CouchbaseCluster::connect(config).await
}

/// Trait defining the bucket management interface.
///
/// All operations are async and return Results with ProvisionError.
#[async_trait]
pub trait BucketManager: Send + Sync {
    /// Fetches the observed state of the named bucket.
    ///
    /// Returns [`ProvisionError::BucketNotFound`](crate::error::ProvisionError)
    /// when no bucket with that name exists. Any other error means existence
    /// could not be determined and must not be treated as absence.
    async fn get_bucket(&self, name: &str) -> Result<BucketInfo>;

    /// Creates a bucket with all declared attributes and the given conflict
    /// resolution policy.
    async fn create_bucket(
        &self,
        spec: &BucketSpec,
        conflict_resolution: ConflictResolution,
    ) -> Result<()>;

    /// Updates the mutable attributes (quota, replicas, flush) of an
    /// existing bucket.
    async fn update_bucket(&self, spec: &BucketSpec) -> Result<()>;
}

/// Trait defining the statement execution interface.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Executes a single statement. Result rows are discarded; only the
    /// error signal matters.
    async fn execute_statement(&self, statement: &str) -> Result<()>;
}
