//! Server-side request admission.
//!
//! [`AdmissionGate`] runs four short-circuiting gates in a fixed order:
//!
//! ```text
//! Received -> TimestampChecked -> NonceChecked -> KeyChecked -> SignatureVerified -> Admitted
//! ```
//!
//! A failing gate rejects the request with that gate's error and later gates
//! never run: no key lookup or signature work happens for an expired
//! request. Once the signature verifies, the nonce is registered atomically;
//! if a concurrent request registered it first, this one is rejected as a
//! replay. Panics raised inside the pipeline are caught and reported as
//! [`AuthError::Internal`].

use std::cell::Cell;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use http::HeaderMap;
use tracing::debug;

use crate::canonical::{SignedRequest, body_text};
use crate::credentials::KeyStore;
use crate::error::AuthError;
use crate::headers::{api_key_from, nonce_from, signature_from, timestamp_from};
use crate::nonce::NonceStore;
use crate::timestamp::{self, now_millis};
use crate::verifier::SignatureVerifier;

/// Progress of a request through the admission pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionState {
    /// No gate has run yet.
    Received,
    /// The timestamp is present and fresh.
    TimestampChecked,
    /// The nonce is present and unused.
    NonceChecked,
    /// The API key is known.
    KeyChecked,
    /// The signature verified.
    SignatureVerified,
    /// The nonce is registered and the request admitted.
    Admitted,
}

impl fmt::Display for AdmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "RECEIVED",
            Self::TimestampChecked => "TIMESTAMP_CHECKED",
            Self::NonceChecked => "NONCE_CHECKED",
            Self::KeyChecked => "KEY_CHECKED",
            Self::SignatureVerified => "SIGNATURE_VERIFIED",
            Self::Admitted => "ADMITTED",
        };
        f.write_str(name)
    }
}

/// A rejected request: the last state reached and the failing gate's error.
#[derive(Debug, thiserror::Error)]
#[error("request rejected after {state}: {error}")]
pub struct Rejection {
    /// The last state the request reached before it was rejected.
    pub state: AdmissionState,
    /// Why it was rejected.
    #[source]
    pub error: AuthError,
}

/// An admitted request's identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admitted {
    /// The authenticated API key.
    pub api_key: String,
    /// The nonce now recorded as used.
    pub nonce: String,
    /// The request timestamp in milliseconds.
    pub timestamp: i64,
}

/// The parts of an incoming request the gates inspect.
#[derive(Debug, Clone, Copy)]
pub struct IncomingRequest<'a> {
    /// HTTP method.
    pub method: &'a str,
    /// Path including the query string, exactly as received.
    pub path: &'a str,
    /// Request headers.
    pub headers: &'a HeaderMap,
    /// Raw request body.
    pub body: &'a [u8],
}

/// Runs the admission pipeline for incoming requests.
pub struct AdmissionGate {
    verifier: SignatureVerifier,
    key_store: Arc<dyn KeyStore>,
    nonces: Arc<NonceStore>,
    ttl_secs: u64,
    clock: fn() -> i64,
}

impl fmt::Debug for AdmissionGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdmissionGate")
            .field("verifier", &self.verifier)
            .field("nonces", &self.nonces.len())
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

impl AdmissionGate {
    /// Create a gate using the wall clock.
    pub fn new(
        verifier: SignatureVerifier,
        key_store: Arc<dyn KeyStore>,
        nonces: Arc<NonceStore>,
        ttl_secs: u64,
    ) -> Self {
        Self {
            verifier,
            key_store,
            nonces,
            ttl_secs,
            clock: now_millis,
        }
    }

    /// Replace the clock, returning milliseconds since the Unix epoch.
    #[must_use]
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    /// The nonce store shared with this gate.
    #[must_use]
    pub fn nonces(&self) -> &Arc<NonceStore> {
        &self.nonces
    }

    /// The request time-to-live in seconds.
    #[must_use]
    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Admit or reject `request`.
    ///
    /// # Errors
    ///
    /// Returns a [`Rejection`] naming the last state reached and the error of
    /// the gate that failed.
    pub fn admit(&self, request: &IncomingRequest<'_>) -> Result<Admitted, Rejection> {
        let state = Cell::new(AdmissionState::Received);

        let outcome = catch_unwind(AssertUnwindSafe(|| self.run(request, &state)));

        match outcome {
            Ok(Ok(admitted)) => Ok(admitted),
            Ok(Err(error)) => Err(Rejection {
                state: state.get(),
                error,
            }),
            Err(payload) => Err(Rejection {
                state: state.get(),
                error: AuthError::Internal(panic_message(payload.as_ref())),
            }),
        }
    }

    fn run(
        &self,
        request: &IncomingRequest<'_>,
        state: &Cell<AdmissionState>,
    ) -> Result<Admitted, AuthError> {
        let headers = request.headers;

        let timestamp = check_timestamp(headers, self.ttl_secs, (self.clock)())?;
        state.set(AdmissionState::TimestampChecked);

        let nonce = check_nonce(headers, &self.nonces)?;
        state.set(AdmissionState::NonceChecked);

        let (api_key, verification_key) = check_api_key(headers, self.key_store.as_ref())?;
        state.set(AdmissionState::KeyChecked);

        check_signature(&self.verifier, request, timestamp, nonce, &verification_key)?;
        state.set(AdmissionState::SignatureVerified);

        if !self.nonces.check_and_register(api_key, nonce, timestamp) {
            debug!(api_key = %api_key, nonce = %nonce, "Nonce registered concurrently");
            return Err(AuthError::NonceReused);
        }
        state.set(AdmissionState::Admitted);

        debug!(api_key = %api_key, nonce = %nonce, "Request admitted");
        Ok(Admitted {
            api_key: api_key.to_owned(),
            nonce: nonce.to_owned(),
            timestamp,
        })
    }
}

/// Timestamp gate: the header is present, numeric, and within `ttl_secs` of
/// `now_ms`.
///
/// # Errors
///
/// Returns a header error or [`AuthError::RequestExpired`].
pub fn check_timestamp(headers: &HeaderMap, ttl_secs: u64, now_ms: i64) -> Result<i64, AuthError> {
    let timestamp = timestamp_from(headers)?;
    if timestamp::is_expired_at(timestamp, ttl_secs, now_ms) {
        debug!(timestamp, now_ms, ttl_secs, "Request expired");
        return Err(AuthError::RequestExpired);
    }
    Ok(timestamp)
}

/// Nonce gate: the header is present and not yet used with the request's
/// API key.
///
/// A missing API key header passes here; the key gate reports it.
///
/// # Errors
///
/// Returns a header error or [`AuthError::NonceReused`].
pub fn check_nonce<'h>(headers: &'h HeaderMap, nonces: &NonceStore) -> Result<&'h str, AuthError> {
    let nonce = nonce_from(headers)?;
    if let Ok(api_key) = api_key_from(headers)
        && nonces.is_used(api_key, nonce)
    {
        debug!(api_key = %api_key, nonce = %nonce, "Nonce replay");
        return Err(AuthError::NonceReused);
    }
    Ok(nonce)
}

/// Key gate: the API key header is present and known to `key_store`.
///
/// Returns the API key and its verification key.
///
/// # Errors
///
/// Returns a header error or [`AuthError::ApiKeyNotFound`].
pub fn check_api_key<'h>(
    headers: &'h HeaderMap,
    key_store: &dyn KeyStore,
) -> Result<(&'h str, String), AuthError> {
    let api_key = api_key_from(headers)?;
    let verification_key = key_store.verification_key(api_key)?;
    Ok((api_key, verification_key))
}

/// Signature gate: the signature header verifies against the canonical
/// message rebuilt from `request`.
///
/// # Errors
///
/// Returns a header error, [`AuthError::InvalidBody`],
/// [`AuthError::InvalidEncoding`], or [`AuthError::InvalidSignature`].
pub fn check_signature(
    verifier: &SignatureVerifier,
    request: &IncomingRequest<'_>,
    timestamp: i64,
    nonce: &str,
    verification_key: &str,
) -> Result<(), AuthError> {
    let signature = signature_from(request.headers)?;
    let body = body_text(request.body)?;

    verifier.verify(
        &SignedRequest {
            method: request.method,
            path: request.path,
            body,
            timestamp,
            nonce,
        },
        signature,
        verification_key,
    )
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic during request admission".to_owned()
    }
}
