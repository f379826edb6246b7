//! Encrypted blob pinning and retrieval.
//!
//! The proxy validates size and encoding, then forwards opaque bytes to a
//! content-addressed store node. Encryption and decryption are entirely
//! the caller's responsibility: only ciphertext should ever reach this
//! module, and it never looks inside a payload.

mod client;

pub use client::{StorageConfig, StoreClient};

use crate::error::{Error, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::info;

/// URI scheme prefixed to content identifiers.
const URI_SCHEME: &str = "ipfs://";

/// Receipt for a pinned payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinReceipt {
    /// Content identifier assigned by the store.
    pub cid: String,
    /// URI for the pinned content.
    pub uri: String,
    /// Decoded payload size in bytes.
    pub size: usize,
}

/// Validating proxy in front of the content store.
pub struct StorageProxy {
    client: StoreClient,
}

impl StorageProxy {
    /// Create a proxy for the given store configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the store client fails to initialize.
    pub fn new(config: StorageConfig) -> Result<Self> {
        Ok(Self {
            client: StoreClient::new(config)?,
        })
    }

    /// Pin a base64-encoded payload to the store.
    ///
    /// Validation happens before any network contact: the payload must be
    /// well-formed base64 and its decoded size must not exceed the
    /// configured cap.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for bad base64,
    /// [`Error::PayloadTooLarge`] past the size cap, and
    /// [`Error::Unavailable`] when the store cannot be reached.
    pub async fn pin(&self, data: &str) -> Result<PinReceipt> {
        let bytes = BASE64
            .decode(data)
            .map_err(|_| Error::InvalidInput("payload is not valid base64".to_string()))?;

        let size = bytes.len();
        let limit = self.client.max_payload_bytes();
        if size > limit {
            return Err(Error::PayloadTooLarge { size, limit });
        }

        if !self.client.is_available().await {
            return Err(Error::Unavailable("store node is not reachable".to_string()));
        }

        let cid = self.client.add(Bytes::from(bytes)).await?;
        info!("pinned {size} bytes as {cid}");

        Ok(PinReceipt {
            uri: format!("{URI_SCHEME}{cid}"),
            cid,
            size,
        })
    }

    /// Retrieve the bytes behind a content identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for unknown identifiers and
    /// [`Error::Unavailable`] when the store cannot be reached.
    pub async fn retrieve(&self, cid: &str) -> Result<Bytes> {
        if !self.client.is_available().await {
            return Err(Error::Unavailable("store node is not reachable".to_string()));
        }

        self.client.cat(cid).await
    }

    /// Whether the store node is currently reachable.
    pub async fn is_available(&self) -> bool {
        self.client.is_available().await
    }
}
