//! Bucket reconciliation.
//!
//! Converges a single declared bucket with the cluster's observed state:
//! create it when missing, update its mutable attributes when present, and
//! refuse when an attribute fixed at creation differs.

use std::fmt;

use crate::cluster::{BucketManager, ConflictResolution};
use crate::config::BucketSpec;
use crate::error::{ProvisionError, Result};

/// How a declared bucket was converged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The bucket did not exist and was created.
    Created,
    /// The bucket existed and its mutable attributes were updated.
    Updated,
}

impl fmt::Display for ReconcileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Updated => write!(f, "updated"),
        }
    }
}

/// Converges one declared bucket.
///
/// A lookup miss leads to a create carrying all declared attributes and the
/// sequence-number conflict resolution policy. Any other lookup failure
/// propagates unchanged: an unreachable cluster must never be mistaken for
/// a missing bucket.
///
/// An existing bucket whose storage backend differs from the declared one
/// is refused before any update is attempted; the backend cannot change
/// after creation. Buckets for which the cluster reports no backend at all
/// skip that comparison.
pub async fn reconcile_bucket(
    manager: &dyn BucketManager,
    spec: &BucketSpec,
) -> Result<ReconcileOutcome> {
    let existing = match manager.get_bucket(&spec.name).await {
        Ok(info) => info,
        Err(ProvisionError::BucketNotFound(_)) => {
            manager
                .create_bucket(spec, ConflictResolution::SequenceNumber)
                .await?;
            return Ok(ReconcileOutcome::Created);
        }
        Err(e) => return Err(e),
    };

    if let Some(existing_backend) = existing.storage_backend {
        if existing_backend != spec.storage_backend {
            return Err(ProvisionError::backend_mismatch(
                &spec.name,
                existing_backend.as_str(),
                spec.storage_backend.as_str(),
            ));
        }
    }

    manager.update_bucket(spec).await?;
    Ok(ReconcileOutcome::Updated)
}
