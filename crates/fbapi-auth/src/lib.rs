//! Request signing, signature verification, and replay protection for FBAPI.
//!
//! This crate implements both sides of the FBAPI request authentication
//! scheme. A client signs a canonical rendering of each outgoing request and
//! attaches four security headers; the server rebuilds the same canonical
//! message, verifies the signature against the caller's key, and refuses stale
//! or replayed requests.
//!
//! # Overview
//!
//! The signature covers the request timestamp, a single-use nonce, the HTTP
//! method, the path with its query string, and the body:
//!
//! ```text
//! canonical = timestamp + nonce + METHOD + path + body
//! signature = url_encode(post.encode(sign(pre.encode(canonical), key, hash)))
//! ```
//!
//! Signing algorithms (HMAC, RSA, ECDSA on secp256k1), hash functions, and the
//! pre/post encodings are selected by [`SigningConfig`](fbapi_core::SigningConfig).
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use fbapi_auth::credentials::StaticKeyStore;
//! use fbapi_auth::gate::{AdmissionGate, IncomingRequest};
//! use fbapi_auth::{AuthProvider, NonceStore, SignatureVerifier};
//! use fbapi_core::{HashAlgorithm, SigningAlgorithm, SigningConfig};
//!
//! let config = Arc::new(
//!     SigningConfig::new(SigningAlgorithm::Hmac, HashAlgorithm::Sha256)
//!         .unwrap()
//!         .with_private_key("secret"),
//! );
//!
//! // Client: compute and attach the security headers.
//! let provider = AuthProvider::new("key-1", Arc::clone(&config)).unwrap();
//! let security = provider
//!     .security_headers("GET", "/accounts?limit=10", None, None, None)
//!     .unwrap();
//! let mut headers = http::HeaderMap::new();
//! security.apply_to(&mut headers).unwrap();
//!
//! // Server: run the admission pipeline.
//! let gate = AdmissionGate::new(
//!     SignatureVerifier::new(config),
//!     Arc::new(StaticKeyStore::new(vec![("key-1".to_owned(), "secret".to_owned())])),
//!     Arc::new(NonceStore::new()),
//!     30,
//! );
//! let request = IncomingRequest {
//!     method: "GET",
//!     path: "/accounts?limit=10",
//!     headers: &headers,
//!     body: b"",
//! };
//! assert!(gate.admit(&request).is_ok());
//! assert!(gate.admit(&request).is_err());
//! ```
//!
//! # Modules
//!
//! - [`canonical`] - Canonical message construction
//! - [`credentials`] - API key to verification key lookup
//! - [`encoding`] - Plain, Base64, hex, Base32, and Base58 encoders
//! - [`error`] - Authentication error types
//! - [`gate`] - Ordered admission pipeline (timestamp, nonce, key, signature)
//! - [`headers`] - Security header names and accessors
//! - [`keys`] - PEM/DER key decoding
//! - [`nonce`] - Per-API-key replay protection
//! - [`provider`] - Client-side header generation
//! - [`signer`] - HMAC, RSA, and ECDSA signers
//! - [`timestamp`] - Request freshness checks
//! - [`verifier`] - Server-side signature verification

pub mod canonical;
pub mod credentials;
pub mod encoding;
pub mod error;
pub mod gate;
pub mod headers;
pub mod keys;
pub mod nonce;
pub mod provider;
pub mod signer;
pub mod timestamp;
pub mod verifier;

pub use canonical::{SignedRequest, build_canonical_message};
pub use credentials::{KeyStore, StaticKeyStore};
pub use encoding::Encoder;
pub use error::AuthError;
pub use gate::{AdmissionGate, AdmissionState, Admitted, Rejection};
pub use headers::SecurityHeaders;
pub use nonce::NonceStore;
pub use provider::AuthProvider;
pub use signer::{Signer, signer_for};
pub use verifier::SignatureVerifier;
