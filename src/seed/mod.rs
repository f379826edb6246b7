//! Random seed generation with quantum-source preference.
//!
//! Seeds drive deterministic evolution-art generation, so the only hard
//! requirement is that callers always get exactly the bytes they asked
//! for. The generator prefers the external quantum entropy endpoint
//! (fetched through the network retry policy) and falls back to the
//! OS CSPRNG when the endpoint stays unreachable. The fallback path has
//! no failure mode: seed generation never errors because an external
//! dependency is down.

mod entropy;

pub use entropy::{EntropyClient, EntropyConfig};

use crate::error::Result;
use crate::retry::RetryConfig;
use chrono::Utc;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Minimum seed size in bytes.
pub const MIN_SEED_SIZE: usize = 16;

/// Maximum seed size in bytes.
pub const MAX_SEED_SIZE: usize = 128;

/// Default seed size in bytes (256 bits).
pub const DEFAULT_SEED_SIZE: usize = 32;

/// Which generator produced a seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeedSource {
    /// Bytes came from the external quantum entropy endpoint.
    Quantum,
    /// Bytes came from the local CSPRNG fallback.
    Pseudo,
}

/// A freshly generated random seed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedResult {
    /// Hex-encoded seed bytes.
    pub seed: String,
    /// Which generator produced the bytes.
    pub source: SeedSource,
    /// Millisecond timestamp taken after generation completed.
    pub timestamp: i64,
    /// Seed size in bytes.
    pub size: usize,
}

/// Seed generator selecting between the quantum source and the CSPRNG.
pub struct SeedGenerator {
    entropy: EntropyClient,
    retry: RetryConfig,
}

impl SeedGenerator {
    /// Create a generator for the given entropy endpoint.
    ///
    /// External fetches run under [`RetryConfig::network`].
    ///
    /// # Errors
    ///
    /// Returns an error if the entropy client fails to initialize.
    pub fn new(config: EntropyConfig) -> Result<Self> {
        Ok(Self {
            entropy: EntropyClient::new(config)?,
            retry: RetryConfig::network(),
        })
    }

    /// Replace the retry policy used for the quantum source.
    #[must_use]
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Generate `size` random bytes, hex-encoded.
    ///
    /// Callers are expected to have validated `size` against
    /// [`MIN_SEED_SIZE`] and [`MAX_SEED_SIZE`]. The quantum source is
    /// tried first; once its retry budget is spent the local CSPRNG
    /// takes over, so this method always produces a seed.
    pub async fn generate(&self, size: usize) -> SeedResult {
        let (bytes, source) = match self
            .retry
            .execute(|| self.entropy.fetch_bytes(size))
            .await
        {
            Ok(bytes) => {
                debug!("generated {size}-byte seed from quantum source");
                (bytes, SeedSource::Quantum)
            }
            Err(err) => {
                warn!("quantum source unavailable, falling back to CSPRNG: {err}");
                let mut bytes = vec![0u8; size];
                OsRng.fill_bytes(&mut bytes);
                (bytes, SeedSource::Pseudo)
            }
        };

        let timestamp = Utc::now().timestamp_millis();

        SeedResult {
            seed: hex::encode(&bytes),
            source,
            timestamp,
            size: bytes.len(),
        }
    }
}
