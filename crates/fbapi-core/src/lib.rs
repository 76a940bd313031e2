//! Core configuration types for FBAPI request authentication.
//!
//! This crate holds the pieces every other crate in the workspace agrees on:
//! the algorithm and encoding names accepted in configuration, the immutable
//! [`SigningConfig`] shared by signers and verifiers, the server-side
//! [`ServerConfig`], and the [`ConfigError`] raised while loading them.
//!
//! Configuration is read once at process start and never mutated afterwards.

mod config;
mod error;
mod types;

pub use config::{NonceRetention, ServerConfig, SigningConfig};
pub use error::{ConfigError, ConfigResult};
pub use types::{EncodingFormat, HashAlgorithm, SigningAlgorithm};
