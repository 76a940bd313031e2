//! Client-side security header generation.
//!
//! [`AuthProvider`] turns an outgoing request into the four security header
//! values:
//!
//! ```text
//! signature = url_encode(post.encode(sign(pre.encode(canonical_message))))
//! ```
//!
//! It reads the signing configuration only and records nothing; nonce
//! bookkeeping is the server's job.

use std::sync::Arc;

use chrono::Utc;
use fbapi_core::SigningConfig;
use tracing::debug;
use uuid::Uuid;

use crate::canonical::SignedRequest;
use crate::encoding::Encoder;
use crate::error::AuthError;
use crate::headers::{SecurityHeaders, url_encode_signature};
use crate::signer::signer_for;

/// Produces security headers for outgoing requests.
#[derive(Debug, Clone)]
pub struct AuthProvider {
    api_key: String,
    config: Arc<SigningConfig>,
}

impl AuthProvider {
    /// Create a provider signing as `api_key`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingKey`] if `config` has no private key.
    pub fn new(
        api_key: impl Into<String>,
        config: impl Into<Arc<SigningConfig>>,
    ) -> Result<Self, AuthError> {
        let config = config.into();
        if config.private_key().is_none() {
            return Err(AuthError::MissingKey("private"));
        }

        Ok(Self {
            api_key: api_key.into(),
            config,
        })
    }

    /// The API key this provider signs as.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// The signing configuration.
    #[must_use]
    pub fn config(&self) -> &SigningConfig {
        &self.config
    }

    /// Compute the security headers for a request.
    ///
    /// A fresh UUID nonce and the current wall-clock time are used when
    /// `nonce` or `timestamp` is not supplied.
    ///
    /// # Errors
    ///
    /// Returns an [`AuthError`] if the private key cannot be used for signing.
    pub fn security_headers(
        &self,
        method: &str,
        path: &str,
        body: Option<&str>,
        timestamp: Option<i64>,
        nonce: Option<&str>,
    ) -> Result<SecurityHeaders, AuthError> {
        let timestamp = timestamp.unwrap_or_else(|| Utc::now().timestamp_millis());
        let nonce = nonce.map_or_else(|| Uuid::new_v4().to_string(), str::to_owned);

        let signature = self.sign(&SignedRequest {
            method,
            path,
            body,
            timestamp,
            nonce: &nonce,
        })?;

        Ok(SecurityHeaders {
            api_key: self.api_key.clone(),
            signature,
            timestamp,
            nonce,
        })
    }

    /// Sign `request` and return the wire form of the signature header.
    ///
    /// # Errors
    ///
    /// Returns an [`AuthError`] if the private key cannot be used for signing.
    pub fn sign(&self, request: &SignedRequest<'_>) -> Result<String, AuthError> {
        let private_key = self
            .config
            .private_key()
            .ok_or(AuthError::MissingKey("private"))?;

        let message = request.canonical_message();
        let prepared = self.config.pre_encoding().encode(message.as_bytes());

        let signer = signer_for(self.config.signing_algorithm());
        let raw = signer.sign(&prepared, private_key, self.config.hash_algorithm())?;
        let encoded = self.config.post_encoding().encode(&raw);

        debug!(
            method = %request.method,
            path = %request.path,
            nonce = %request.nonce,
            timestamp = request.timestamp,
            "Signed request"
        );

        Ok(url_encode_signature(&encoded))
    }
}
