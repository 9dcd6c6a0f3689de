//! Couchbase REST client implementation.
//!
//! Implements the BucketManager and QueryExecutor traits over the cluster's
//! management and query service REST APIs.

use async_trait::async_trait;
use reqwest::{Certificate, Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Cursor;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::cluster::{
    BucketInfo, BucketManager, BucketType, ConflictResolution, QueryExecutor, StorageBackend,
};
use crate::config::{BucketSpec, ConnectionConfig};
use crate::error::{ProvisionError, Result};

/// Overall timeout for management and query requests. DDL statements such as
/// index builds can be slow, so this is generous.
const REQUEST_TIMEOUT_SECS: u64 = 75;

/// Timeout for establishing a TCP connection.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Management API ports (plain / TLS).
const MGMT_PORT: u16 = 8091;
const MGMT_TLS_PORT: u16 = 18091;

/// Query service ports (plain / TLS).
const QUERY_PORT: u16 = 8093;
const QUERY_TLS_PORT: u16 = 18093;

/// Resolved management and query service base URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Endpoints {
    management: Url,
    query: Url,
}

/// Maps a cluster URL to the management and query endpoints.
///
/// `couchbase://` and `couchbases://` address the cluster as a whole; their
/// optional port belongs to the data service and is ignored here. Explicit
/// `http(s)://` URLs are taken as the management endpoint directly, with the
/// conventional query port substituted for the same scheme.
fn resolve_endpoints(raw: &str) -> Result<Endpoints> {
    let url = Url::parse(raw)
        .map_err(|e| ProvisionError::connection(format!("Invalid cluster URL '{raw}': {e}")))?;

    let host = url
        .host_str()
        .ok_or_else(|| ProvisionError::connection(format!("Cluster URL '{raw}' has no host")))?;

    let (scheme, mgmt_port, query_port) = match url.scheme() {
        "couchbase" => ("http", MGMT_PORT, QUERY_PORT),
        "couchbases" => ("https", MGMT_TLS_PORT, QUERY_TLS_PORT),
        "http" => ("http", url.port().unwrap_or(MGMT_PORT), QUERY_PORT),
        "https" => ("https", url.port().unwrap_or(MGMT_TLS_PORT), QUERY_TLS_PORT),
        other => {
            return Err(ProvisionError::connection(format!(
                "Unsupported scheme '{other}' in cluster URL '{raw}'"
            )))
        }
    };

    let parse_base = |port: u16| {
        Url::parse(&format!("{scheme}://{host}:{port}")).map_err(|e| {
            ProvisionError::connection(format!("Cannot build endpoint for '{raw}': {e}"))
        })
    };

    Ok(Endpoints {
        management: parse_base(mgmt_port)?,
        query: parse_base(query_port)?,
    })
}

/// Management URL for a single bucket. The name travels as one
/// percent-encoded path segment, never as raw path text.
fn bucket_url(management: &Url, name: &str) -> Result<Url> {
    let mut url = management.clone();
    url.path_segments_mut()
        .map_err(|_| {
            ProvisionError::connection(format!("Invalid management endpoint '{management}'"))
        })?
        .pop_if_empty()
        .extend(["pools", "default", "buckets", name]);
    Ok(url)
}

/// Parses the configured CA content as PEM. reqwest's rustls backend defers
/// certificate parsing until the TLS handshake, so without this check
/// garbage content would only surface after a request had gone out.
fn parse_ca_certificate(pem: &str) -> Result<Certificate> {
    let mut reader = Cursor::new(pem.as_bytes());
    let parsed = rustls_pemfile::certs(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| {
            ProvisionError::connection(format!("Failed to parse CA certificate: {e}"))
        })?;
    if parsed.is_empty() {
        return Err(ProvisionError::connection(
            "Failed to parse CA certificate: no certificate found in PEM content",
        ));
    }
    Certificate::from_pem(pem.as_bytes())
        .map_err(|e| ProvisionError::connection(format!("Failed to parse CA certificate: {e}")))
}

/// Maps a reqwest transport error to a connection error.
fn map_connection_error(e: reqwest::Error) -> ProvisionError {
    if e.is_timeout() {
        ProvisionError::connection("Request timed out")
    } else if e.is_connect() {
        ProvisionError::connection(format!("Failed to connect to cluster: {e}"))
    } else {
        ProvisionError::connection(format!("Request failed: {e}"))
    }
}

fn flush_flag(enabled: bool) -> &'static str {
    if enabled {
        "1"
    } else {
        "0"
    }
}

/// Couchbase cluster client over the REST APIs.
#[derive(Debug, Clone)]
pub struct CouchbaseCluster {
    client: Client,
    endpoints: Endpoints,
    user: String,
    password: String,
}

impl CouchbaseCluster {
    /// Connects to the cluster and verifies reachability and credentials.
    ///
    /// When a CA certificate is configured, it must parse as valid PEM
    /// before any network contact is attempted.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let endpoints = resolve_endpoints(&config.url)?;

        let mut builder = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS));

        if config.ca_certificate.enabled {
            let cert = parse_ca_certificate(&config.ca_certificate.content)?;
            builder = builder.add_root_certificate(cert);
        }

        let client = builder
            .build()
            .map_err(|e| ProvisionError::connection(format!("Failed to create HTTP client: {e}")))?;

        let cluster = Self {
            client,
            endpoints,
            user: config.user.clone(),
            password: config.password.clone(),
        };
        cluster.verify_connectivity().await?;
        debug!("Connected to cluster at {}", cluster.endpoints.management);
        Ok(cluster)
    }

    /// Releases the underlying HTTP connection pool.
    pub async fn close(self) {
        debug!("Cluster connection closed");
    }

    async fn verify_connectivity(&self) -> Result<()> {
        let url = self.mgmt_url("/pools")?;
        let response = self
            .client
            .get(url)
            .basic_auth(&self.user, Some(&self.password))
            .send()
            .await
            .map_err(map_connection_error)?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::UNAUTHORIZED => Err(ProvisionError::connection(format!(
                "Authentication failed for user '{}'",
                self.user
            ))),
            status => Err(ProvisionError::connection(format!(
                "Cluster returned {status} during connection check"
            ))),
        }
    }

    fn mgmt_url(&self, path: &str) -> Result<Url> {
        self.endpoints.management.join(path).map_err(|e| {
            ProvisionError::connection(format!("Invalid management path '{path}': {e}"))
        })
    }

    fn query_url(&self) -> Result<Url> {
        self.endpoints.query.join("/query/service").map_err(|e| {
            ProvisionError::connection(format!("Invalid query service URL: {e}"))
        })
    }

    /// Form parameters for bucket creation. All declared attributes are sent;
    /// only couchbase-type buckets carry a storage backend.
    fn create_params(
        spec: &BucketSpec,
        conflict_resolution: ConflictResolution,
    ) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("name", spec.name.clone()),
            ("bucketType", spec.bucket_type.as_str().to_string()),
            ("ramQuota", spec.ram_quota_mb.to_string()),
            ("replicaNumber", spec.num_replicas.to_string()),
            ("flushEnabled", flush_flag(spec.flush_enabled).to_string()),
            (
                "conflictResolutionType",
                conflict_resolution.as_str().to_string(),
            ),
        ];
        if spec.bucket_type == BucketType::Couchbase {
            params.push(("storageBackend", spec.storage_backend.as_str().to_string()));
        }
        params
    }

    /// Form parameters for bucket updates: only the attributes that may
    /// change after creation.
    fn update_params(spec: &BucketSpec) -> Vec<(&'static str, String)> {
        vec![
            ("ramQuota", spec.ram_quota_mb.to_string()),
            ("replicaNumber", spec.num_replicas.to_string()),
            ("flushEnabled", flush_flag(spec.flush_enabled).to_string()),
        ]
    }

    async fn check_management_response(
        &self,
        response: reqwest::Response,
        action: &str,
    ) -> Result<()> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(ProvisionError::connection(format!(
                "Authentication failed for user '{}'",
                self.user
            )));
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(ProvisionError::management(format!(
            "Failed to {action} ({status}): {}",
            extract_management_errors(&body)
        )))
    }
}

#[async_trait]
impl BucketManager for CouchbaseCluster {
    async fn get_bucket(&self, name: &str) -> Result<BucketInfo> {
        let url = bucket_url(&self.endpoints.management, name)?;
        let response = self
            .client
            .get(url)
            .basic_auth(&self.user, Some(&self.password))
            .send()
            .await
            .map_err(map_connection_error)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ProvisionError::bucket_not_found(name));
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(ProvisionError::connection(format!(
                "Authentication failed for user '{}'",
                self.user
            )));
        }

        let body = response.text().await.map_err(|e| {
            ProvisionError::management(format!("Failed to read bucket response: {e}"))
        })?;
        if !status.is_success() {
            return Err(ProvisionError::management(format!(
                "Failed to look up bucket '{name}' ({status}): {}",
                extract_management_errors(&body)
            )));
        }

        let parsed: BucketResponse = serde_json::from_str(&body).map_err(|e| {
            ProvisionError::management(format!("Failed to parse bucket response: {e}"))
        })?;
        parsed.into_info()
    }

    async fn create_bucket(
        &self,
        spec: &BucketSpec,
        conflict_resolution: ConflictResolution,
    ) -> Result<()> {
        let url = self.mgmt_url("/pools/default/buckets")?;
        let params = Self::create_params(spec, conflict_resolution);
        let response = self
            .client
            .post(url)
            .basic_auth(&self.user, Some(&self.password))
            .form(&params)
            .send()
            .await
            .map_err(map_connection_error)?;
        self.check_management_response(response, &format!("create bucket '{}'", spec.name))
            .await
    }

    async fn update_bucket(&self, spec: &BucketSpec) -> Result<()> {
        let url = bucket_url(&self.endpoints.management, &spec.name)?;
        let params = Self::update_params(spec);
        let response = self
            .client
            .post(url)
            .basic_auth(&self.user, Some(&self.password))
            .form(&params)
            .send()
            .await
            .map_err(map_connection_error)?;
        self.check_management_response(response, &format!("update bucket '{}'", spec.name))
            .await
    }
}

#[async_trait]
impl QueryExecutor for CouchbaseCluster {
    async fn execute_statement(&self, statement: &str) -> Result<()> {
        let url = self.query_url()?;
        let request = QueryRequest { statement };
        let response = self
            .client
            .post(url)
            .basic_auth(&self.user, Some(&self.password))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProvisionError::query("Request timed out")
                } else if e.is_connect() {
                    ProvisionError::query(format!("Failed to connect to query service: {e}"))
                } else {
                    ProvisionError::query(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProvisionError::query(format!("Failed to read query response: {e}")))?;

        // The query service reports failures in the body, with the HTTP
        // status not always reflecting them.
        if let Ok(parsed) = serde_json::from_str::<QueryResponse>(&body) {
            if parsed.status == "success" {
                return Ok(());
            }
            return Err(ProvisionError::query(format_query_errors(&parsed)));
        }

        if !status.is_success() {
            return Err(ProvisionError::query(format!(
                "Query service returned {status}: {body}"
            )));
        }
        Err(ProvisionError::query(format!(
            "Unexpected query response: {body}"
        )))
    }
}

/// Summarizes the errors array of a failed query response.
fn format_query_errors(response: &QueryResponse) -> String {
    if response.errors.is_empty() {
        return format!("Query service reported status '{}'", response.status);
    }
    response
        .errors
        .iter()
        .map(|e| format!("[{}] {}", e.code, e.msg))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Extracts per-field messages from a management API error body, falling
/// back to the raw body.
fn extract_management_errors(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ManagementErrorResponse>(body) {
        if !parsed.errors.is_empty() {
            let mut messages: Vec<String> = parsed
                .errors
                .into_iter()
                .map(|(field, msg)| format!("{field}: {msg}"))
                .collect();
            messages.sort();
            return messages.join("; ");
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "no details".to_string()
    } else {
        trimmed.to_string()
    }
}

// Management and query API types

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    statement: &'a str,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    status: String,
    #[serde(default)]
    errors: Vec<QueryServiceError>,
}

#[derive(Debug, Deserialize)]
struct QueryServiceError {
    #[serde(default)]
    code: i64,
    msg: String,
}

#[derive(Debug, Deserialize)]
struct ManagementErrorResponse {
    #[serde(default)]
    errors: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct BucketResponse {
    name: String,
    #[serde(rename = "bucketType")]
    bucket_type: String,
    #[serde(rename = "storageBackend")]
    storage_backend: Option<String>,
    #[serde(default)]
    quota: QuotaResponse,
    #[serde(rename = "replicaNumber", default)]
    replica_number: u32,
    #[serde(default)]
    controllers: ControllersResponse,
}

#[derive(Debug, Default, Deserialize)]
struct QuotaResponse {
    /// Per-node quota in bytes.
    #[serde(rename = "rawRAM", default)]
    raw_ram: u64,
}

#[derive(Debug, Default, Deserialize)]
struct ControllersResponse {
    /// Present only when the bucket may be flushed.
    flush: Option<String>,
}

impl BucketResponse {
    fn into_info(self) -> Result<BucketInfo> {
        let bucket_type = BucketType::parse(&self.bucket_type).ok_or_else(|| {
            ProvisionError::management(format!(
                "Bucket '{}' has unrecognized type '{}'",
                self.name, self.bucket_type
            ))
        })?;

        // Ephemeral and memcached buckets have no storage backend; the
        // cluster omits the field or reports "undefined".
        let storage_backend = match self.storage_backend.as_deref() {
            None | Some("") | Some("undefined") => None,
            Some(s) => Some(StorageBackend::parse(s).ok_or_else(|| {
                ProvisionError::management(format!(
                    "Bucket '{}' has unrecognized storage backend '{s}'",
                    self.name
                ))
            })?),
        };

        Ok(BucketInfo {
            name: self.name,
            bucket_type,
            ram_quota_mb: self.quota.raw_ram / (1024 * 1024),
            num_replicas: self.replica_number,
            flush_enabled: self.controllers.flush.is_some(),
            storage_backend,
        })
    }
}
