//! Key material decoding.
//!
//! Keys arrive as PEM text. The armor is removed with a standard PEM parser
//! and the DER body is handed to the RSA or secp256k1 primitives:
//!
//! - RSA: PKCS#1 private key (PKCS#8 also accepted), SPKI public key
//! - ECDSA: SEC1 private key (PKCS#8 also accepted), SPKI public key
//!
//! Key text without armor is treated as the bare base64 body. Literal `\n`
//! sequences, as produced when a PEM is squeezed into one environment
//! variable line, are expanded first.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use fbapi_core::SigningAlgorithm;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::error::AuthError;

/// Strip PEM armor from `key` and return the DER body.
///
/// # Examples
///
/// ```
/// use fbapi_auth::keys::pem_to_der;
///
/// let pem = "-----BEGIN PUBLIC KEY-----\naGVsbG8=\n-----END PUBLIC KEY-----\n";
/// assert_eq!(pem_to_der(pem).unwrap(), b"hello");
/// assert_eq!(pem_to_der("aGVs bG8=").unwrap(), b"hello");
/// ```
pub fn pem_to_der(key: &str) -> Result<Vec<u8>, AuthError> {
    let normalized = key.replace("\\n", "\n");
    let trimmed = normalized.trim();

    if trimmed.contains("-----BEGIN") {
        return pem::parse(trimmed)
            .map(pem::Pem::into_contents)
            .map_err(|e| AuthError::InvalidKey(e.to_string()));
    }

    let body: String = trimmed.split_whitespace().collect();
    BASE64
        .decode(body)
        .map_err(|e| AuthError::InvalidKey(format!("key is neither PEM nor base64 DER: {e}")))
}

/// Parse an RSA private key.
pub fn rsa_private_key(key: &str) -> Result<RsaPrivateKey, AuthError> {
    let der = pem_to_der(key)?;
    RsaPrivateKey::from_pkcs1_der(&der)
        .or_else(|_| RsaPrivateKey::from_pkcs8_der(&der))
        .map_err(|e| AuthError::InvalidKey(format!("RSA private key: {e}")))
}

/// Parse an RSA public key.
pub fn rsa_public_key(key: &str) -> Result<RsaPublicKey, AuthError> {
    let der = pem_to_der(key)?;
    RsaPublicKey::from_public_key_der(&der)
        .map_err(|e| AuthError::InvalidKey(format!("RSA public key: {e}")))
}

/// Parse a secp256k1 private key.
pub fn ec_secret_key(key: &str) -> Result<k256::SecretKey, AuthError> {
    let der = pem_to_der(key)?;
    k256::SecretKey::from_sec1_der(&der)
        .or_else(|_| k256::SecretKey::from_pkcs8_der(&der))
        .map_err(|e| AuthError::InvalidKey(format!("secp256k1 private key: {e}")))
}

/// Parse a secp256k1 public key.
pub fn ec_public_key(key: &str) -> Result<k256::PublicKey, AuthError> {
    let der = pem_to_der(key)?;
    k256::PublicKey::from_public_key_der(&der)
        .map_err(|e| AuthError::InvalidKey(format!("secp256k1 public key: {e}")))
}

/// Derive the verification key matching `private_key`.
///
/// For RSA and ECDSA this is the SPKI PEM of the public half; for HMAC the
/// shared secret verifies itself. Stub servers and tests use this when only
/// the private key is configured. A real deployment configures the public key.
pub fn derive_public_key_pem(
    algorithm: SigningAlgorithm,
    private_key: &str,
) -> Result<String, AuthError> {
    match algorithm {
        SigningAlgorithm::Hmac => Ok(private_key.to_owned()),
        SigningAlgorithm::Rsa => RsaPublicKey::from(&rsa_private_key(private_key)?)
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| AuthError::InvalidKey(e.to_string())),
        SigningAlgorithm::Ecdsa => ec_secret_key(private_key)?
            .public_key()
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| AuthError::InvalidKey(e.to_string())),
    }
}
