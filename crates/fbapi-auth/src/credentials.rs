//! API key lookup.
//!
//! A [`KeyStore`] maps an API key to the material used to verify that
//! caller's signatures: the shared secret for HMAC, the caller's SPKI public
//! key PEM for RSA and ECDSA.

use std::collections::HashMap;
use std::fmt;

use crate::error::AuthError;

/// Resolves the verification key for an API key.
///
/// Implementations may back this with a database, configuration file, or any
/// other key store.
pub trait KeyStore: Send + Sync {
    /// Retrieve the verification key for `api_key`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ApiKeyNotFound`] if the API key is not recognized.
    fn verification_key(&self, api_key: &str) -> Result<String, AuthError>;
}

/// An in-memory key store.
///
/// # Examples
///
/// ```
/// use fbapi_auth::credentials::{KeyStore, StaticKeyStore};
///
/// let store = StaticKeyStore::new(vec![("key-1".to_owned(), "secret".to_owned())]);
///
/// assert_eq!(store.verification_key("key-1").unwrap(), "secret");
/// assert!(store.verification_key("key-2").is_err());
/// ```
#[derive(Clone)]
pub struct StaticKeyStore {
    keys: HashMap<String, String>,
}

impl StaticKeyStore {
    /// Create a store from `(api_key, verification_key)` pairs.
    pub fn new(keys: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
        }
    }
}

impl fmt::Debug for StaticKeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticKeyStore")
            .field("api_keys", &self.keys.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl KeyStore for StaticKeyStore {
    fn verification_key(&self, api_key: &str) -> Result<String, AuthError> {
        self.keys
            .get(api_key)
            .cloned()
            .ok_or_else(|| AuthError::ApiKeyNotFound(api_key.to_owned()))
    }
}
