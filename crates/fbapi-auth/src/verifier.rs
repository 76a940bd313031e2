//! Server-side signature verification.
//!
//! Verification mirrors signing step for step:
//!
//! 1. URL-decode the signature header and undo the post-encoding
//! 2. Rebuild the canonical message from the received components
//! 3. Apply the pre-encoding
//! 4. Ask the [`Signer`](crate::signer::Signer) to verify against the
//!    counterparty's key

use std::sync::Arc;

use fbapi_core::SigningConfig;
use tracing::debug;

use crate::canonical::SignedRequest;
use crate::encoding::Encoder;
use crate::error::AuthError;
use crate::headers::url_decode_signature;
use crate::signer::signer_for;

/// Verifies request signatures under a fixed signing configuration.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    config: Arc<SigningConfig>,
}

impl SignatureVerifier {
    /// Create a verifier.
    pub fn new(config: impl Into<Arc<SigningConfig>>) -> Self {
        Self {
            config: config.into(),
        }
    }

    /// The signing configuration.
    #[must_use]
    pub fn config(&self) -> &SigningConfig {
        &self.config
    }

    /// Verify `signature_header` for `request`.
    ///
    /// `verification_key` is the shared secret for HMAC and the caller's SPKI
    /// public key otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidEncoding`] if the header does not decode,
    /// [`AuthError::InvalidSignature`] if it does not verify, or
    /// [`AuthError::InvalidKey`] if `verification_key` is unusable.
    pub fn verify(
        &self,
        request: &SignedRequest<'_>,
        signature_header: &str,
        verification_key: &str,
    ) -> Result<(), AuthError> {
        let encoded = url_decode_signature(signature_header);
        let signature = self.config.post_encoding().decode(&encoded)?;

        let message = request.canonical_message();
        let prepared = self.config.pre_encoding().encode(message.as_bytes());

        let signer = signer_for(self.config.signing_algorithm());
        signer.verify(
            &prepared,
            verification_key,
            &signature,
            self.config.hash_algorithm(),
        )?;

        debug!(
            method = %request.method,
            path = %request.path,
            nonce = %request.nonce,
            "Signature verified"
        );
        Ok(())
    }
}
