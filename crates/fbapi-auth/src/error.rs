//! Error types for request signing and verification.
//!
//! [`AuthError`] covers both per-request authentication failures (recoverable:
//! the request is rejected, the process keeps serving) and the signer-level
//! configuration guard [`AuthError::AlgorithmNotSupported`].

use fbapi_core::EncodingFormat;

/// Errors that can occur while signing or verifying a request.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// A required security header is absent.
    #[error("Missing required header: {0}")]
    MissingHeader(&'static str),

    /// A security header is present but its value is unusable.
    #[error("Invalid value for header: {0}")]
    InvalidHeader(&'static str),

    /// The payload is not valid in the given encoding.
    #[error("Invalid {format} payload: {reason}")]
    InvalidEncoding {
        /// The encoding that rejected the payload.
        format: EncodingFormat,
        /// Decoder error detail.
        reason: String,
    },

    /// The signature does not verify against the canonical message and key.
    #[error("Signature does not match")]
    InvalidSignature,

    /// The signer does not support the requested hash algorithm.
    #[error("Algorithm not supported: {0}")]
    AlgorithmNotSupported(String),

    /// Key material could not be decoded.
    #[error("Invalid key material: {0}")]
    InvalidKey(String),

    /// The configuration lacks the key needed for this operation.
    #[error("No {0} key configured")]
    MissingKey(&'static str),

    /// The API key is not known to the key store.
    #[error("API key not found: {0}")]
    ApiKeyNotFound(String),

    /// The nonce was already used with this API key.
    #[error("Nonce already used")]
    NonceReused,

    /// The request timestamp is older than the configured time-to-live.
    #[error("Request has expired")]
    RequestExpired,

    /// The request body is not valid UTF-8 text.
    #[error("Request body is not valid UTF-8")]
    InvalidBody,

    /// The body could not be serialized to JSON.
    #[error("Failed to serialize request body: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A cryptographic primitive failed for reasons other than a bad signature.
    #[error("Cryptographic operation failed: {0}")]
    Crypto(String),

    /// An unexpected failure inside the admission pipeline.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Whether this error reflects a problem with the server's own setup
    /// rather than with the incoming request.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::AlgorithmNotSupported(_)
                | Self::InvalidKey(_)
                | Self::MissingKey(_)
                | Self::Serialization(_)
                | Self::Crypto(_)
                | Self::Internal(_)
        )
    }
}
