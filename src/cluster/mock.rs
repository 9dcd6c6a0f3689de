//! Mock cluster for testing.
//!
//! Provides an in-memory implementation of both cluster traits, recording
//! every interaction so tests can assert call order and counts.

use super::{BucketInfo, BucketManager, BucketType, ConflictResolution, QueryExecutor};
use crate::config::BucketSpec;
use crate::error::{ProvisionError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// A single recorded interaction with the mock cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterCall {
    Lookup(String),
    Create(String, ConflictResolution),
    Update(String),
    Execute(String),
    Close,
}

/// A mock cluster backed by an in-memory bucket map.
#[derive(Default)]
pub struct MockCluster {
    buckets: Mutex<HashMap<String, BucketInfo>>,
    calls: Mutex<Vec<ClusterCall>>,
    lookup_error: Option<String>,
    create_error: Option<String>,
    update_error: Option<String>,
    statement_errors: HashMap<String, String>,
}

// A test that panics mid-call poisons the lock; later assertions should
// still be able to read the recorded state.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockCluster {
    /// Creates an empty mock cluster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an existing bucket with explicit observed state.
    pub fn with_bucket(self, info: BucketInfo) -> Self {
        {
            let mut buckets = lock(&self.buckets);
            buckets.insert(info.name.clone(), info);
        }
        self
    }

    /// Seeds an existing bucket in the state a create from this spec would
    /// have produced.
    pub fn with_existing(self, spec: &BucketSpec) -> Self {
        self.with_bucket(bucket_info_from_spec(spec))
    }

    /// Makes every lookup fail with a management error (not a miss).
    pub fn failing_lookups(mut self, message: impl Into<String>) -> Self {
        self.lookup_error = Some(message.into());
        self
    }

    /// Makes every create fail with a management error.
    pub fn failing_creates(mut self, message: impl Into<String>) -> Self {
        self.create_error = Some(message.into());
        self
    }

    /// Makes every update fail with a management error.
    pub fn failing_updates(mut self, message: impl Into<String>) -> Self {
        self.update_error = Some(message.into());
        self
    }

    /// Makes one specific statement fail with a query error.
    pub fn failing_statement(
        mut self,
        statement: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        self.statement_errors
            .insert(statement.into(), message.into());
        self
    }

    /// Records the release of the handle.
    pub async fn close(&self) {
        self.record(ClusterCall::Close);
    }

    /// Returns the calls recorded so far, in order.
    pub fn calls(&self) -> Vec<ClusterCall> {
        lock(&self.calls).clone()
    }

    /// Returns the observed state of a bucket, if present.
    pub fn bucket(&self, name: &str) -> Option<BucketInfo> {
        lock(&self.buckets).get(name).cloned()
    }

    fn record(&self, call: ClusterCall) {
        lock(&self.calls).push(call);
    }
}

/// Builds the observed state a freshly created bucket would report. Only
/// couchbase-type buckets carry a storage backend.
fn bucket_info_from_spec(spec: &BucketSpec) -> BucketInfo {
    let storage_backend = match spec.bucket_type {
        BucketType::Couchbase => Some(spec.storage_backend),
        _ => None,
    };
    BucketInfo {
        name: spec.name.clone(),
        bucket_type: spec.bucket_type,
        ram_quota_mb: spec.ram_quota_mb,
        num_replicas: spec.num_replicas,
        flush_enabled: spec.flush_enabled,
        storage_backend,
    }
}

#[async_trait]
impl BucketManager for MockCluster {
    async fn get_bucket(&self, name: &str) -> Result<BucketInfo> {
        self.record(ClusterCall::Lookup(name.to_string()));
        if let Some(message) = &self.lookup_error {
            return Err(ProvisionError::management(message.clone()));
        }
        match lock(&self.buckets).get(name) {
            Some(info) => Ok(info.clone()),
            None => Err(ProvisionError::bucket_not_found(name)),
        }
    }

    async fn create_bucket(
        &self,
        spec: &BucketSpec,
        conflict_resolution: ConflictResolution,
    ) -> Result<()> {
        self.record(ClusterCall::Create(spec.name.clone(), conflict_resolution));
        if let Some(message) = &self.create_error {
            return Err(ProvisionError::management(message.clone()));
        }
        lock(&self.buckets).insert(spec.name.clone(), bucket_info_from_spec(spec));
        Ok(())
    }

    async fn update_bucket(&self, spec: &BucketSpec) -> Result<()> {
        self.record(ClusterCall::Update(spec.name.clone()));
        if let Some(message) = &self.update_error {
            return Err(ProvisionError::management(message.clone()));
        }
        let mut buckets = lock(&self.buckets);
        match buckets.get_mut(&spec.name) {
            Some(info) => {
                info.ram_quota_mb = spec.ram_quota_mb;
                info.num_replicas = spec.num_replicas;
                info.flush_enabled = spec.flush_enabled;
                Ok(())
            }
            None => Err(ProvisionError::management(format!(
                "Cannot update missing bucket '{}'",
                spec.name
            ))),
        }
    }
}

#[async_trait]
impl QueryExecutor for MockCluster {
    async fn execute_statement(&self, statement: &str) -> Result<()> {
        self.record(ClusterCall::Execute(statement.to_string()));
        if let Some(message) = self.statement_errors.get(statement) {
            return Err(ProvisionError::query(message.clone()));
        }
        Ok(())
    }
}
