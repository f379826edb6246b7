//! Verification and randomness gateway for the Proof of Becoming app.
//!
//! pob-gateway is the backend core behind the app's HTTP layer. It
//! provides three logical operations:
//!
//! 1. **Proof verification**: heuristic checks plus an optional external
//!    vision-model call, producing a confidence score and verdict
//! 2. **Seed generation**: random seeds from a quantum entropy endpoint,
//!    with a CSPRNG fallback that never fails
//! 3. **Blob pinning**: size- and encoding-validated proxying of
//!    encrypted payloads to a content-addressed store
//!
//! External calls run through a retry executor with exponential backoff
//! and jitter ([`retry`]). Routing, CORS, and rate limiting live in the
//! HTTP collaborator, not here.
//!
//! # Example
//!
//! ```rust,ignore
//! use pob_gateway::{Gateway, GatewayConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gateway = Gateway::new(GatewayConfig::default())?;
//!
//!     let seed = gateway.generate_seed(32).await;
//!     println!("{} seed: {}", seed.size, seed.seed);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod gateway;
pub mod retry;
pub mod seed;
pub mod storage;
pub mod verify;

pub use config::GatewayConfig;
pub use error::{Error, Result};
pub use gateway::Gateway;
pub use retry::{Retrier, RetryConfig};
pub use seed::{SeedResult, SeedSource};
pub use storage::PinReceipt;
pub use verify::{VerificationRequest, VerificationResult};
