//! Configuration management for FBAPI request signing.
//!
//! All configuration is driven by environment variables and loaded once at
//! startup. [`SigningConfig`] is shared by the client-side header provider and
//! the server-side verifier; [`ServerConfig`] carries the settings only the
//! verifying server needs.

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::types::{EncodingFormat, HashAlgorithm, SigningAlgorithm};

/// Default request time-to-live in seconds.
const DEFAULT_REQUEST_TTL_SECS: u64 = 30;

/// Immutable signing configuration.
///
/// Invariant: ECDSA is only ever paired with SHA-256. Every constructor goes
/// through [`SigningConfig::new`], which enforces this.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningConfig {
    signing_algorithm: SigningAlgorithm,
    hash_algorithm: HashAlgorithm,
    private_key: Option<String>,
    public_key: Option<String>,
    pre_encoding: EncodingFormat,
    post_encoding: EncodingFormat,
}

impl SigningConfig {
    /// Create a signing configuration with `plain` pre-encoding and `base64`
    /// post-encoding and no key material.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::AlgorithmNotSupported`] when ECDSA is combined with
    /// any hash other than SHA-256.
    pub fn new(
        signing_algorithm: SigningAlgorithm,
        hash_algorithm: HashAlgorithm,
    ) -> ConfigResult<Self> {
        if signing_algorithm == SigningAlgorithm::Ecdsa
            && hash_algorithm != HashAlgorithm::Sha256
        {
            return Err(ConfigError::AlgorithmNotSupported(format!(
                "{signing_algorithm} with {hash_algorithm} (ecdsa requires sha256)"
            )));
        }

        Ok(Self {
            signing_algorithm,
            hash_algorithm,
            private_key: None,
            public_key: None,
            pre_encoding: EncodingFormat::Plain,
            post_encoding: EncodingFormat::Base64,
        })
    }

    /// Set the private key (PEM text for RSA/ECDSA, shared secret for HMAC).
    #[must_use]
    pub fn with_private_key(mut self, key: impl Into<String>) -> Self {
        self.private_key = Some(key.into());
        self
    }

    /// Set the counterparty public key (SPKI PEM text).
    #[must_use]
    pub fn with_public_key(mut self, key: impl Into<String>) -> Self {
        self.public_key = Some(key.into());
        self
    }

    /// Set the pre-signing and post-signing encodings.
    #[must_use]
    pub fn with_encodings(mut self, pre: EncodingFormat, post: EncodingFormat) -> Self {
        self.pre_encoding = pre;
        self.post_encoding = post;
        self
    }

    /// Load the signing configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `FBAPI_SIGNING_ALGORITHM` | `hmac` |
    /// | `FBAPI_HASH_ALGORITHM` | `sha256` |
    /// | `FBAPI_PRIVATE_KEY` / `FBAPI_PRIVATE_KEY_FILE` | *(none)* |
    /// | `FBAPI_PUBLIC_KEY` / `FBAPI_PUBLIC_KEY_FILE` | *(none)* |
    /// | `FBAPI_PRE_ENCODING` | `plain` |
    /// | `FBAPI_POST_ENCODING` | `base64` |
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load the signing configuration through an arbitrary variable lookup.
    ///
    /// At least one of the private or public key must be present.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let signing_algorithm: SigningAlgorithm =
            parse_or(&lookup, "FBAPI_SIGNING_ALGORITHM", SigningAlgorithm::Hmac)?;
        let hash_algorithm: HashAlgorithm =
            parse_or(&lookup, "FBAPI_HASH_ALGORITHM", HashAlgorithm::Sha256)?;
        let pre_encoding: EncodingFormat =
            parse_or(&lookup, "FBAPI_PRE_ENCODING", EncodingFormat::Plain)?;
        let post_encoding: EncodingFormat =
            parse_or(&lookup, "FBAPI_POST_ENCODING", EncodingFormat::Base64)?;

        let mut config = Self::new(signing_algorithm, hash_algorithm)?
            .with_encodings(pre_encoding, post_encoding);

        config.private_key = key_material(&lookup, "FBAPI_PRIVATE_KEY")?;
        config.public_key = key_material(&lookup, "FBAPI_PUBLIC_KEY")?;

        if config.private_key.is_none() && config.public_key.is_none() {
            return Err(ConfigError::MissingVar("FBAPI_PRIVATE_KEY".to_owned()));
        }

        debug!(
            signing_algorithm = %config.signing_algorithm,
            hash_algorithm = %config.hash_algorithm,
            pre_encoding = %config.pre_encoding,
            post_encoding = %config.post_encoding,
            "loaded signing configuration"
        );

        Ok(config)
    }

    /// The signing algorithm.
    #[must_use]
    pub fn signing_algorithm(&self) -> SigningAlgorithm {
        self.signing_algorithm
    }

    /// The hash algorithm.
    #[must_use]
    pub fn hash_algorithm(&self) -> HashAlgorithm {
        self.hash_algorithm
    }

    /// The private key or shared secret, if configured.
    #[must_use]
    pub fn private_key(&self) -> Option<&str> {
        self.private_key.as_deref()
    }

    /// The counterparty public key, if configured.
    #[must_use]
    pub fn public_key(&self) -> Option<&str> {
        self.public_key.as_deref()
    }

    /// Encoding applied to the canonical message before signing.
    #[must_use]
    pub fn pre_encoding(&self) -> EncodingFormat {
        self.pre_encoding
    }

    /// Encoding applied to the raw signature bytes.
    #[must_use]
    pub fn post_encoding(&self) -> EncodingFormat {
        self.post_encoding
    }
}

impl fmt::Debug for SigningConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningConfig")
            .field("signing_algorithm", &self.signing_algorithm)
            .field("hash_algorithm", &self.hash_algorithm)
            .field(
                "private_key",
                &self.private_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("public_key", &self.public_key.as_ref().map(|_| "..."))
            .field("pre_encoding", &self.pre_encoding)
            .field("post_encoding", &self.post_encoding)
            .finish()
    }
}

/// How long seen nonces are retained by the verifying server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NonceRetention {
    /// Keep every nonce for the lifetime of the process.
    #[default]
    Forever,
    /// Drop nonces once their request timestamp falls outside the TTL window.
    Ttl,
}

impl FromStr for NonceRetention {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "forever" => Ok(Self::Forever),
            "ttl" => Ok(Self::Ttl),
            _ => Err(ConfigError::InvalidValue {
                name: "FBAPI_NONCE_RETENTION".to_owned(),
                value: s.to_owned(),
            }),
        }
    }
}

/// Settings for the verifying server.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Bind address.
    pub listen: String,
    /// Log level filter.
    pub log_level: String,
    /// The API key clients must present in `X-FBAPI-KEY`.
    pub api_key: String,
    /// Maximum request age in seconds.
    pub request_ttl_secs: u64,
    /// Nonce retention policy.
    pub nonce_retention: NonceRetention,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_owned(),
            log_level: "info".to_owned(),
            api_key: String::new(),
            request_ttl_secs: DEFAULT_REQUEST_TTL_SECS,
            nonce_retention: NonceRetention::Forever,
        }
    }
}

impl ServerConfig {
    /// Load server configuration from environment variables.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load server configuration through an arbitrary variable lookup.
    ///
    /// `FBAPI_API_KEY` is required; everything else has a default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let defaults = Self::default();

        let api_key = lookup("FBAPI_API_KEY")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigError::MissingVar("FBAPI_API_KEY".to_owned()))?;

        let request_ttl_secs: u64 = match lookup("FBAPI_REQUEST_TTL") {
            Some(v) => v.trim().parse().map_err(|_| ConfigError::InvalidValue {
                name: "FBAPI_REQUEST_TTL".to_owned(),
                value: v.clone(),
            })?,
            None => defaults.request_ttl_secs,
        };

        Ok(Self {
            listen: lookup("GATEWAY_LISTEN").unwrap_or(defaults.listen),
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
            api_key,
            request_ttl_secs,
            nonce_retention: parse_or(&lookup, "FBAPI_NONCE_RETENTION", defaults.nonce_retention)?,
        })
    }
}

/// Parse an optional variable, falling back to `default` when it is unset.
fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> ConfigResult<T>
where
    T: FromStr<Err = ConfigError>,
{
    lookup(name).map_or(Ok(default), |v| v.parse())
}

/// Read key material either inline from `name` or from the file named by `{name}_FILE`.
fn key_material(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> ConfigResult<Option<String>> {
    if let Some(inline) = lookup(name).filter(|v| !v.trim().is_empty()) {
        return Ok(Some(inline));
    }

    let file_var = format!("{name}_FILE");
    match lookup(&file_var) {
        Some(path) => std::fs::read_to_string(&path)
            .map(Some)
            .map_err(|source| ConfigError::Io { path, source }),
        None => Ok(None),
    }
}
