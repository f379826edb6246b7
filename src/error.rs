//! Error types for pob-gateway.

/// Errors returned by gateway components.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed input rejected before any external call.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Transport-level failure talking to an external service.
    #[error("network error: {0}")]
    Network(String),

    /// An external service answered, but not in the shape we expect.
    #[error("unexpected payload: {0}")]
    UnexpectedPayload(String),

    /// All retry attempts were used up; carries the final failure.
    #[error("all {attempts} attempts failed: {source}")]
    RetryExhausted {
        /// Number of attempts that were made.
        attempts: u32,
        /// The failure from the last attempt.
        #[source]
        source: Box<Error>,
    },

    /// The requested item does not exist on the external service.
    #[error("not found: {0}")]
    NotFound(String),

    /// An external service is unreachable and there is no safe fallback.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// Payload exceeds the configured size cap.
    #[error("payload too large: {size} bytes (limit {limit})")]
    PayloadTooLarge {
        /// Decoded payload size in bytes.
        size: usize,
        /// Configured maximum in bytes.
        limit: usize,
    },

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this failure is worth another attempt.
    ///
    /// Timeouts and malformed external responses are transient; explicit
    /// not-found answers and local validation failures are not.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::UnexpectedPayload(_))
    }
}

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(Error::Network("timed out".into()).is_transient());
        assert!(Error::UnexpectedPayload("short read".into()).is_transient());
        assert!(!Error::NotFound("cid".into()).is_transient());
        assert!(!Error::InvalidInput("bad base64".into()).is_transient());
        assert!(!Error::Config("missing url".into()).is_transient());
    }

    #[test]
    fn test_exhausted_preserves_source() {
        let err = Error::RetryExhausted {
            attempts: 4,
            source: Box::new(Error::Network("connection refused".into())),
        };
        assert!(err.to_string().contains("4 attempts"));
        assert!(err.to_string().contains("connection refused"));
    }
}
