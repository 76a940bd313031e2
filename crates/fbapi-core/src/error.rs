//! Error types for configuration loading.

/// Errors raised while parsing or validating configuration.
///
/// Every variant is fatal: a process that hits one of these must not start
/// serving traffic.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is not set.
    #[error("missing required configuration variable: {0}")]
    MissingVar(String),

    /// The signing or hash algorithm is unknown, or the combination is not supported.
    #[error("algorithm not supported: {0}")]
    AlgorithmNotSupported(String),

    /// The encoding name is not one of `plain`, `base64`, `hexstr`, `base32`, `base58`.
    #[error("unsupported encoding format: {0}")]
    UnsupportedEncodingFormat(String),

    /// A configuration value could not be parsed.
    #[error("invalid value for {name}: {value}")]
    InvalidValue {
        /// The variable name.
        name: String,
        /// The rejected value.
        value: String,
    },

    /// A key file referenced by configuration could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The file path.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Convenience result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
