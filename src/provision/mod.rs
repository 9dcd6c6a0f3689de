//! Provisioning engine.
//!
//! Drives a full run against the cluster: pre-statements, bucket
//! reconciliation in declaration order, post-statements. The run is
//! fail-fast throughout and the cluster handle is released on every path.

mod reconcile;
mod statements;

pub use reconcile::{reconcile_bucket, ReconcileOutcome};
pub use statements::run_statements;

use tracing::info;

use crate::cluster::{self, BucketManager, QueryExecutor};
use crate::config::Config;
use crate::error::Result;

/// Runs the full provisioning plan against the configured cluster.
///
/// The cluster handle is acquired once and closed unconditionally, whether
/// the plan succeeds or not.
pub async fn run(config: &Config) -> Result<()> {
    info!(
        "Connecting to {}",
        config.connection_details.display_string()
    );
    let handle = cluster::connect(&config.connection_details).await?;

    let outcome = execute_plan(&handle, &handle, config).await;
    handle.close().await;
    outcome
}

/// Executes the provisioning stages in order, failing fast.
///
/// Kept separate from [`run`] so the staging logic can be driven against
/// any pair of capability implementations.
pub async fn execute_plan(
    buckets: &dyn BucketManager,
    queries: &dyn QueryExecutor,
    config: &Config,
) -> Result<()> {
    if !config.pre_ddl_statements.is_empty() {
        info!(
            "Executing {} pre-provisioning statement(s)",
            config.pre_ddl_statements.len()
        );
        run_statements(queries, &config.pre_ddl_statements).await?;
    }

    if !config.buckets.is_empty() {
        info!("Reconciling {} bucket(s)", config.buckets.len());
    }
    for spec in &config.buckets {
        let outcome = reconcile_bucket(buckets, spec).await?;
        info!("Bucket '{}' {}", spec.name, outcome);
    }

    if !config.post_ddl_statements.is_empty() {
        info!(
            "Executing {} post-provisioning statement(s)",
            config.post_ddl_statements.len()
        );
        run_statements(queries, &config.post_ddl_statements).await?;
    }

    Ok(())
}
