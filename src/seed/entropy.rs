//! Client for the external entropy endpoint.
//!
//! The endpoint returns unsigned byte values as JSON:
//! `{"success": true, "data": [17, 203, ...]}`. Anything else (a non-2xx
//! status, a `success: false` flag, or a byte count that does not match
//! the request) is reported as a transient failure so the caller's retry
//! policy can decide what to do with it.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Configuration for the entropy endpoint client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntropyConfig {
    /// Entropy endpoint URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EntropyConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_endpoint() -> String {
    "https://qrng.anu.edu.au/API/jsonI.php".to_string()
}

const fn default_timeout_secs() -> u64 {
    5
}

/// Payload shape of the entropy endpoint.
#[derive(Debug, Deserialize)]
struct EntropyPayload {
    success: bool,
    #[serde(default)]
    data: Vec<u8>,
}

/// HTTP client for the external entropy source.
pub struct EntropyClient {
    config: EntropyConfig,
    http: reqwest::Client,
}

impl EntropyClient {
    /// Create a new entropy client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to initialize.
    pub fn new(config: EntropyConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("failed to build entropy client: {e}")))?;

        Ok(Self { config, http })
    }

    /// Fetch exactly `count` random bytes from the entropy endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`] on transport failures and
    /// [`Error::UnexpectedPayload`] when the endpoint answers with the
    /// wrong shape or byte count. Both are transient.
    pub async fn fetch_bytes(&self, count: usize) -> Result<Vec<u8>> {
        debug!("requesting {count} bytes from {}", self.config.endpoint);

        let length = count.to_string();
        let response = self
            .http
            .get(&self.config.endpoint)
            .query(&[("length", length.as_str()), ("type", "uint8")])
            .send()
            .await
            .map_err(|e| Error::Network(format!("entropy request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Network(format!(
                "entropy endpoint returned {}",
                response.status()
            )));
        }

        let payload: EntropyPayload = response
            .json()
            .await
            .map_err(|e| Error::UnexpectedPayload(format!("malformed entropy response: {e}")))?;

        if !payload.success {
            return Err(Error::UnexpectedPayload(
                "entropy endpoint reported failure".to_string(),
            ));
        }

        if payload.data.len() != count {
            return Err(Error::UnexpectedPayload(format!(
                "requested {count} bytes, got {}",
                payload.data.len()
            )));
        }

        Ok(payload.data)
    }

    /// The configured endpoint URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }
}
