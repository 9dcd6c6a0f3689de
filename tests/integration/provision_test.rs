//! Provisioning scenario tests.
//!
//! Drives the full staging logic against the mock cluster, plus the
//! connection failures that can be exercised without a server.

use cb_provision::cluster::{
    ClusterCall, ConflictResolution, MockCluster, StorageBackend,
};
use cb_provision::config::{
    BucketSpec, CaCertificate, Config, ConnectionConfig, StatementSpec,
};
use cb_provision::error::ProvisionError;
use cb_provision::provision;
use pretty_assertions::assert_eq;

fn bucket(name: &str, ram_quota_mb: u64, backend: StorageBackend) -> BucketSpec {
    BucketSpec {
        name: name.to_string(),
        ram_quota_mb,
        bucket_type: Default::default(),
        num_replicas: 1,
        flush_enabled: false,
        storage_backend: backend,
    }
}

fn statement(name: &str, body: &str) -> StatementSpec {
    StatementSpec {
        name: name.to_string(),
        statement: body.to_string(),
    }
}

fn plan(
    url: &str,
    buckets: Vec<BucketSpec>,
    pre: Vec<StatementSpec>,
    post: Vec<StatementSpec>,
) -> Config {
    Config {
        connection_details: ConnectionConfig {
            user: "Administrator".to_string(),
            password: "secret".to_string(),
            url: url.to_string(),
            ca_certificate: CaCertificate::default(),
        },
        buckets,
        pre_ddl_statements: pre,
        post_ddl_statements: post,
    }
}

#[tokio::test]
async fn test_first_run_provisions_empty_cluster() {
    let mock = MockCluster::new();
    let config = plan(
        "couchbase://localhost",
        vec![bucket("orders", 512, StorageBackend::Magma)],
        vec![statement("idx1", "CREATE PRIMARY INDEX ON `orders`")],
        vec![statement("mark", "UPDATE `orders` SET provisioned = true")],
    );

    provision::execute_plan(&mock, &mock, &config).await.unwrap();

    assert_eq!(
        mock.calls(),
        vec![
            ClusterCall::Execute("CREATE PRIMARY INDEX ON `orders`".to_string()),
            ClusterCall::Lookup("orders".to_string()),
            ClusterCall::Create("orders".to_string(), ConflictResolution::SequenceNumber),
            ClusterCall::Execute("UPDATE `orders` SET provisioned = true".to_string()),
        ]
    );

    let created = mock.bucket("orders").unwrap();
    assert_eq!(created.ram_quota_mb, 512);
    assert_eq!(created.num_replicas, 1);
    assert_eq!(created.storage_backend, Some(StorageBackend::Magma));
}

#[tokio::test]
async fn test_second_run_updates_instead_of_creating() {
    let mock = MockCluster::new();
    let config = plan(
        "couchbase://localhost",
        vec![bucket("orders", 512, StorageBackend::Magma)],
        vec![statement("idx1", "CREATE PRIMARY INDEX ON `orders`")],
        vec![],
    );

    provision::execute_plan(&mock, &mock, &config).await.unwrap();
    let calls_after_first_run = mock.calls().len();

    provision::execute_plan(&mock, &mock, &config).await.unwrap();

    let second_run = mock.calls().split_off(calls_after_first_run);
    assert_eq!(
        second_run,
        vec![
            ClusterCall::Execute("CREATE PRIMARY INDEX ON `orders`".to_string()),
            ClusterCall::Lookup("orders".to_string()),
            ClusterCall::Update("orders".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_backend_change_is_refused() {
    let existing = bucket("orders", 512, StorageBackend::Couchstore);
    let mock = MockCluster::new().with_existing(&existing);
    let config = plan(
        "couchbase://localhost",
        vec![bucket("orders", 512, StorageBackend::Magma)],
        vec![],
        vec![statement("post", "SELECT 'never runs'")],
    );

    let err = provision::execute_plan(&mock, &mock, &config)
        .await
        .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("orders"));
    assert!(message.contains("couchstore"));
    assert!(message.contains("magma"));

    // Neither the existing bucket nor anything after it was touched.
    assert_eq!(mock.calls(), vec![ClusterCall::Lookup("orders".to_string())]);
    assert_eq!(
        mock.bucket("orders").unwrap().storage_backend,
        Some(StorageBackend::Couchstore)
    );
}

#[tokio::test]
async fn test_failing_statement_is_named_and_stops_the_run() {
    let mock = MockCluster::new().failing_statement("BROKEN", "syntax error at position 1");
    let config = plan(
        "couchbase://localhost",
        vec![],
        vec![
            statement("first", "SELECT 1"),
            statement("second", "BROKEN"),
            statement("third", "SELECT 3"),
        ],
        vec![],
    );

    let err = provision::execute_plan(&mock, &mock, &config)
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Statement 'second' failed: syntax error at position 1"
    );
    assert_eq!(err.category(), "Statement Error");
    assert_eq!(
        mock.calls(),
        vec![
            ClusterCall::Execute("SELECT 1".to_string()),
            ClusterCall::Execute("BROKEN".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_connect_rejects_unsupported_scheme() {
    let config = plan("ftp://db.example.com", vec![], vec![], vec![]);

    let err = provision::run(&config).await.unwrap_err();

    assert_eq!(err.category(), "Connection Error");
    assert!(err.to_string().contains("Unsupported scheme"));
}

#[tokio::test]
async fn test_connect_rejects_invalid_ca_before_any_network_contact() {
    let mut config = plan("couchbases://db.example.com", vec![], vec![], vec![]);
    config.connection_details.ca_certificate = CaCertificate {
        enabled: true,
        name: "unused.pem".to_string(),
        content: "not a certificate".to_string(),
    };

    let err = provision::run(&config).await.unwrap_err();

    assert_eq!(err.category(), "Connection Error");
    assert!(err.to_string().contains("CA certificate"));
}
