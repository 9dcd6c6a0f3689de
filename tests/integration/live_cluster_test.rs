//! Live cluster integration tests.
//!
//! These tests require a reachable Couchbase cluster. Set CB_TEST_URL,
//! CB_TEST_USER, and CB_TEST_PASSWORD to run them; they are skipped
//! otherwise. They only read cluster state and run trivial statements.

use cb_provision::cluster::{self, BucketManager, CouchbaseCluster, QueryExecutor};
use cb_provision::config::{CaCertificate, ConnectionConfig};
use cb_provision::error::ProvisionError;

/// Helper to build connection details from the environment.
fn get_test_connection() -> Option<ConnectionConfig> {
    let url = std::env::var("CB_TEST_URL").ok()?;
    let user = std::env::var("CB_TEST_USER").ok()?;
    let password = std::env::var("CB_TEST_PASSWORD").ok()?;
    Some(ConnectionConfig {
        user,
        password,
        url,
        ca_certificate: CaCertificate::default(),
    })
}

/// Helper to create a connected cluster handle.
async fn get_test_cluster() -> Option<CouchbaseCluster> {
    let config = get_test_connection()?;
    cluster::connect(&config).await.ok()
}

#[tokio::test]
async fn test_connect_to_live_cluster() {
    let Some(cluster) = get_test_cluster().await else {
        eprintln!("Skipping test: CB_TEST_URL not set");
        return;
    };

    cluster.close().await;
}

#[tokio::test]
async fn test_lookup_of_absent_bucket_is_a_miss() {
    let Some(cluster) = get_test_cluster().await else {
        eprintln!("Skipping test: CB_TEST_URL not set");
        return;
    };

    let result = cluster.get_bucket("cbprov-test-absent-bucket").await;
    assert!(matches!(result, Err(ProvisionError::BucketNotFound(_))));

    cluster.close().await;
}

#[tokio::test]
async fn test_execute_trivial_statement() {
    let Some(cluster) = get_test_cluster().await else {
        eprintln!("Skipping test: CB_TEST_URL not set");
        return;
    };

    cluster.execute_statement("SELECT 1").await.unwrap();

    cluster.close().await;
}

#[tokio::test]
async fn test_wrong_credentials_are_rejected() {
    let Some(mut config) = get_test_connection() else {
        eprintln!("Skipping test: CB_TEST_URL not set");
        return;
    };
    config.password = "definitely-not-the-password".to_string();

    let err = cluster::connect(&config).await.unwrap_err();
    assert_eq!(err.category(), "Connection Error");
}
