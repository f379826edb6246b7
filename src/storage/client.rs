//! HTTP client for the content-addressed store node.
//!
//! Speaks the store's HTTP API: `add` (multipart upload, pinned),
//! `cat` (fetch by content identifier), and `version` as a cheap
//! availability probe. Payloads are opaque bytes at this layer.

use crate::error::{Error, Result};
use bytes::Bytes;
use reqwest::multipart;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for the content store proxy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Base URL of the store node's HTTP API.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Maximum decoded payload size in bytes.
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,

    /// Timeout for add/cat operations in seconds.
    #[serde(default = "default_op_timeout_secs")]
    pub op_timeout_secs: u64,

    /// Timeout for the availability probe in seconds.
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            max_payload_bytes: default_max_payload_bytes(),
            op_timeout_secs: default_op_timeout_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
        }
    }
}

fn default_api_url() -> String {
    "http://127.0.0.1:5001".to_string()
}

const fn default_max_payload_bytes() -> usize {
    10 * 1024 * 1024
}

const fn default_op_timeout_secs() -> u64 {
    30
}

const fn default_probe_timeout_secs() -> u64 {
    2
}

#[derive(Debug, Deserialize)]
struct AddResponse {
    #[serde(rename = "Hash")]
    hash: String,
}

/// Client for the store node's HTTP API.
pub struct StoreClient {
    config: StorageConfig,
    http: reqwest::Client,
}

impl StoreClient {
    /// Create a new store client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to initialize.
    pub fn new(config: StorageConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::Config(format!("failed to build store client: {e}")))?;

        Ok(Self { config, http })
    }

    /// Whether the store node answers its version endpoint.
    pub async fn is_available(&self) -> bool {
        let url = format!("{}/api/v0/version", self.config.api_url);
        let probe = self
            .http
            .get(&url)
            .timeout(Duration::from_secs(self.config.probe_timeout_secs))
            .send()
            .await;

        match probe {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("store probe failed: {e}");
                false
            }
        }
    }

    /// Upload and pin raw bytes, returning the content identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unavailable`] on timeouts, transport failures,
    /// non-success statuses, or an unparseable reply.
    pub async fn add(&self, data: Bytes) -> Result<String> {
        let size = data.len();
        let part = multipart::Part::bytes(data.to_vec()).file_name("blob");
        let form = multipart::Form::new().part("file", part);

        let response = self
            .http
            .post(format!("{}/api/v0/add", self.config.api_url))
            .query(&[("pin", "true")])
            .multipart(form)
            .timeout(Duration::from_secs(self.config.op_timeout_secs))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Unavailable("store node timed out".to_string())
                } else {
                    Error::Unavailable(format!("store add failed: {e}"))
                }
            })?;

        if !response.status().is_success() {
            warn!("store add returned {}", response.status());
            return Err(Error::Unavailable(format!(
                "store add failed: {}",
                response.status()
            )));
        }

        let payload: AddResponse = response
            .json()
            .await
            .map_err(|e| Error::Unavailable(format!("malformed store add reply: {e}")))?;

        debug!("pinned {size} bytes as {}", payload.hash);
        Ok(payload.hash)
    }

    /// Fetch the bytes behind a content identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when the store answers 404 and
    /// [`Error::Unavailable`] for every other failure.
    pub async fn cat(&self, cid: &str) -> Result<Bytes> {
        let response = self
            .http
            .post(format!("{}/api/v0/cat", self.config.api_url))
            .query(&[("arg", cid)])
            .timeout(Duration::from_secs(self.config.op_timeout_secs))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Unavailable("store node timed out".to_string())
                } else {
                    Error::Unavailable(format!("store cat failed: {e}"))
                }
            })?;

        let status = response.status();
        if status.is_success() {
            response
                .bytes()
                .await
                .map_err(|e| Error::Unavailable(format!("store cat read failed: {e}")))
        } else if status == StatusCode::NOT_FOUND {
            Err(Error::NotFound(format!("cid not found: {cid}")))
        } else {
            Err(Error::Unavailable(format!("store cat failed: {status}")))
        }
    }

    /// The configured API base URL.
    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.config.api_url
    }

    /// The configured payload size cap in bytes.
    #[must_use]
    pub fn max_payload_bytes(&self) -> usize {
        self.config.max_payload_bytes
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn client_for(server: &mockito::Server) -> StoreClient {
        StoreClient::new(StorageConfig {
            api_url: server.url(),
            op_timeout_secs: 2,
            probe_timeout_secs: 1,
            ..Default::default()
        })
        .expect("client should build")
    }

    #[tokio::test]
    async fn test_availability_probe() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v0/version")
            .with_status(200)
            .with_body(r#"{"Version": "0.24.0"}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        assert!(client.is_available().await);
    }

    #[tokio::test]
    async fn test_availability_probe_fails_when_unreachable() {
        let client = StoreClient::new(StorageConfig {
            api_url: "http://127.0.0.1:1".to_string(),
            probe_timeout_secs: 1,
            ..Default::default()
        })
        .expect("client should build");

        assert!(!client.is_available().await);
    }

    #[tokio::test]
    async fn test_add_returns_content_identifier() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/v0/add")
            .match_query(mockito::Matcher::UrlEncoded("pin".into(), "true".into()))
            .with_status(200)
            .with_body(r#"{"Name": "blob", "Hash": "QmTestCid123", "Size": "16"}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let cid = client
            .add(Bytes::from_static(b"encrypted-bytes"))
            .await
            .expect("add should succeed");
        assert_eq!(cid, "QmTestCid123");
    }

    #[tokio::test]
    async fn test_add_maps_server_error_to_unavailable() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/v0/add")
            .match_query(mockito::Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client.add(Bytes::from_static(b"data")).await.unwrap_err();
        assert!(matches!(err, Error::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_cat_returns_bytes() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/v0/cat")
            .match_query(mockito::Matcher::UrlEncoded("arg".into(), "QmTestCid123".into()))
            .with_status(200)
            .with_body("opaque payload")
            .create_async()
            .await;

        let client = client_for(&server);
        let bytes = client.cat("QmTestCid123").await.expect("cat should succeed");
        assert_eq!(bytes, Bytes::from_static(b"opaque payload"));
    }

    #[tokio::test]
    async fn test_cat_maps_404_to_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/v0/cat")
            .match_query(mockito::Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client.cat("QmMissing").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(!err.is_transient());
    }
}
