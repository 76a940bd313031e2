//! Algorithm and encoding identifiers accepted in signing configuration.

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Digital signature scheme used to sign the canonical message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SigningAlgorithm {
    /// Keyed-hash MAC over a shared secret.
    Hmac,
    /// RSA PKCS#1 v1.5 with a PKCS#1 private key and SPKI public key.
    Rsa,
    /// ECDSA on secp256k1 with a SEC1 private key and SPKI public key.
    Ecdsa,
}

impl SigningAlgorithm {
    /// The configuration name of this algorithm.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hmac => "hmac",
            Self::Rsa => "rsa",
            Self::Ecdsa => "ecdsa",
        }
    }
}

impl FromStr for SigningAlgorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hmac" => Ok(Self::Hmac),
            "rsa" => Ok(Self::Rsa),
            "ecdsa" => Ok(Self::Ecdsa),
            _ => Err(ConfigError::AlgorithmNotSupported(s.to_owned())),
        }
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hash function used by the signer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize,
)]
pub enum HashAlgorithm {
    /// SHA-256.
    #[default]
    #[serde(rename = "sha256")]
    Sha256,
    /// SHA-512.
    #[serde(rename = "sha512")]
    Sha512,
    /// SHA3-256.
    #[serde(rename = "sha3-256")]
    Sha3_256,
}

impl HashAlgorithm {
    /// The configuration name of this hash algorithm.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
            Self::Sha3_256 => "sha3-256",
        }
    }
}

impl FromStr for HashAlgorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha256" => Ok(Self::Sha256),
            "sha512" => Ok(Self::Sha512),
            "sha3-256" => Ok(Self::Sha3_256),
            _ => Err(ConfigError::AlgorithmNotSupported(s.to_owned())),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport-safe text representation applied before signing (pre-encoding)
/// or to the raw signature bytes (post-encoding).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum EncodingFormat {
    /// Identity: bytes pass through unchanged.
    #[default]
    Plain,
    /// RFC 4648 Base64 with padding.
    Base64,
    /// Hexadecimal.
    HexStr,
    /// RFC 4648 Base32.
    Base32,
    /// Base58 with the Bitcoin alphabet.
    Base58,
}

impl EncodingFormat {
    /// The configuration name of this encoding.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Base64 => "base64",
            Self::HexStr => "hexstr",
            Self::Base32 => "base32",
            Self::Base58 => "base58",
        }
    }
}

impl FromStr for EncodingFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" => Ok(Self::Plain),
            "base64" => Ok(Self::Base64),
            "hexstr" => Ok(Self::HexStr),
            "base32" => Ok(Self::Base32),
            "base58" => Ok(Self::Base58),
            _ => Err(ConfigError::UnsupportedEncodingFormat(s.to_owned())),
        }
    }
}

impl fmt::Display for EncodingFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
