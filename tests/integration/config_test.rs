//! Configuration loading integration tests.
//!
//! Exercises the full file path: read, parse, validate, and CA persistence.

use cb_provision::cluster::StorageBackend;
use cb_provision::config::Config;
use cb_provision::error::ProvisionError;
use std::fs;
use tempfile::tempdir;

fn write_config(dir: &tempfile::TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("cluster.yaml");
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_load_full_config_from_file() {
    let dir = tempdir().unwrap();
    let path = write_config(
        &dir,
        r#"
connection_details:
  user: Administrator
  password: secret
  url: couchbase://db.example.com
buckets:
  - name: orders
    ram_quota_mb: 512
    storage_backend: magma
pre_ddl_statements:
  - query_name: idx1
    n1ql: CREATE PRIMARY INDEX ON `orders`
"#,
    );

    let config = Config::load_from_file(&path).unwrap();

    assert_eq!(config.connection_details.user, "Administrator");
    assert_eq!(config.buckets.len(), 1);
    assert_eq!(config.buckets[0].storage_backend, StorageBackend::Magma);
    assert_eq!(config.pre_ddl_statements[0].name, "idx1");
    assert!(config.post_ddl_statements.is_empty());
}

#[test]
fn test_load_missing_file_is_a_config_error() {
    let dir = tempdir().unwrap();
    let err = Config::load_from_file(&dir.path().join("absent.yaml")).unwrap_err();

    assert!(matches!(err, ProvisionError::Config(_)));
    assert_eq!(err.category(), "Configuration Error");
}

#[test]
fn test_load_invalid_yaml_is_a_config_error() {
    let dir = tempdir().unwrap();
    let path = write_config(&dir, "connection_details: [not, a, mapping\n");

    let err = Config::load_from_file(&path).unwrap_err();
    assert!(matches!(err, ProvisionError::Config(_)));
}

#[test]
fn test_load_rejects_duplicate_buckets() {
    let dir = tempdir().unwrap();
    let path = write_config(
        &dir,
        r#"
connection_details:
  user: admin
  password: pw
  url: couchbase://localhost
buckets:
  - name: orders
    ram_quota_mb: 128
  - name: orders
    ram_quota_mb: 128
"#,
    );

    let err = Config::load_from_file(&path).unwrap_err();
    assert!(err.to_string().contains("Duplicate bucket name"));
}

#[test]
fn test_load_rejects_bucket_name_outside_naming_rule() {
    let dir = tempdir().unwrap();
    let path = write_config(
        &dir,
        r##"
connection_details:
  user: admin
  password: pw
  url: couchbase://localhost
buckets:
  - name: "orders#prod"
    ram_quota_mb: 128
"##,
    );

    let err = Config::load_from_file(&path).unwrap_err();
    assert!(matches!(err, ProvisionError::Config(_)));
    assert!(err.to_string().contains("unsupported character"));
}

#[test]
fn test_load_persists_enabled_ca_certificate() {
    let dir = tempdir().unwrap();
    let ca_path = dir.path().join("cluster-ca.pem");
    let yaml = format!(
        r#"
connection_details:
  user: admin
  password: pw
  url: couchbases://db.example.com
  ca_certificate:
    enabled: true
    name: {}
    content: |
      -----BEGIN CERTIFICATE-----
      MIIBszCCAVmgAwIBAgIUJ
      -----END CERTIFICATE-----
"#,
        ca_path.display()
    );
    let path = write_config(&dir, &yaml);

    Config::load_from_file(&path).unwrap();

    let written = fs::read_to_string(&ca_path).unwrap();
    assert!(written.starts_with("-----BEGIN CERTIFICATE-----"));
}

#[test]
fn test_load_skips_persistence_for_disabled_ca() {
    let dir = tempdir().unwrap();
    let ca_path = dir.path().join("unused-ca.pem");
    let yaml = format!(
        r#"
connection_details:
  user: admin
  password: pw
  url: couchbase://localhost
  ca_certificate:
    enabled: false
    name: {}
    content: ignored
"#,
        ca_path.display()
    );
    let path = write_config(&dir, &yaml);

    Config::load_from_file(&path).unwrap();
    assert!(!ca_path.exists());
}
