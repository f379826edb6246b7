//! Gateway facade wiring the components together.
//!
//! The HTTP layer (routing, CORS, rate limiting) lives outside this crate
//! and calls into one [`Gateway`] instance. Every method takes `&self`:
//! requests are independent tasks and the components keep no mutable
//! state between calls.

use crate::config::GatewayConfig;
use crate::error::Result;
use crate::seed::{SeedGenerator, SeedResult};
use crate::storage::{PinReceipt, StorageProxy};
use crate::verify::{ProofVerifier, VerificationRequest, VerificationResult};
use bytes::Bytes;
use tracing::info;

/// The gateway's three logical operations behind one handle.
pub struct Gateway {
    seeds: SeedGenerator,
    verifier: ProofVerifier,
    storage: StorageProxy,
}

impl Gateway {
    /// Build a gateway from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any component client fails to initialize.
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let verifier = ProofVerifier::new(config.classifier)?;
        info!(
            "gateway initialized (classifier_enabled={}, store={})",
            verifier.classifier_enabled(),
            config.storage.api_url
        );

        Ok(Self {
            seeds: SeedGenerator::new(config.entropy)?,
            verifier,
            storage: StorageProxy::new(config.storage)?,
        })
    }

    /// Verify a proof submission.
    ///
    /// Always returns a structured result; see
    /// [`ProofVerifier::verify`].
    pub async fn verify(&self, request: &VerificationRequest) -> VerificationResult {
        self.verifier.verify(request).await
    }

    /// Generate a random seed of `size` bytes.
    ///
    /// `size` is expected to be pre-validated against
    /// [`crate::seed::MIN_SEED_SIZE`] and [`crate::seed::MAX_SEED_SIZE`].
    pub async fn generate_seed(&self, size: usize) -> SeedResult {
        self.seeds.generate(size).await
    }

    /// Pin a base64-encoded encrypted payload to the content store.
    ///
    /// # Errors
    ///
    /// See [`StorageProxy::pin`].
    pub async fn pin(&self, data: &str) -> Result<PinReceipt> {
        self.storage.pin(data).await
    }

    /// Retrieve pinned bytes by content identifier.
    ///
    /// # Errors
    ///
    /// See [`StorageProxy::retrieve`].
    pub async fn retrieve(&self, cid: &str) -> Result<Bytes> {
        self.storage.retrieve(cid).await
    }
}
