//! Replay protection.
//!
//! [`NonceStore`] keeps, per API key, every nonce that has been admitted
//! together with a millisecond stamp. Each API key is one [`DashMap`] entry,
//! so check-then-insert for a given key runs under that entry's shard lock
//! while different keys proceed in parallel.
//!
//! Nothing is evicted unless the owner calls
//! [`purge_older_than`](NonceStore::purge_older_than). Purging at
//! `now - ttl` is safe: a replay of a purged nonce carries a timestamp the
//! timestamp gate already rejects.

use std::collections::HashMap;

use dashmap::DashMap;
use tracing::debug;

use crate::timestamp::now_millis;

/// Per-API-key record of used nonces.
#[derive(Debug, Default)]
pub struct NonceStore {
    inner: DashMap<String, HashMap<String, i64>>,
}

impl NonceStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `nonce` has already been used with `api_key`.
    #[must_use]
    pub fn is_used(&self, api_key: &str, nonce: &str) -> bool {
        self.inner
            .get(api_key)
            .is_some_and(|nonces| nonces.contains_key(nonce))
    }

    /// Record `nonce` as used with `api_key`, stamped with the current time.
    ///
    /// Registering an already-used nonce is a no-op.
    pub fn register(&self, api_key: &str, nonce: &str) {
        self.check_and_register(api_key, nonce, now_millis());
    }

    /// Atomically record `nonce` for `api_key` unless it is already present.
    ///
    /// `stamp_ms` is the request timestamp, used when purging.
    ///
    /// Returns `true` if the nonce was fresh and is now recorded, `false` if
    /// it was already used.
    pub fn check_and_register(&self, api_key: &str, nonce: &str, stamp_ms: i64) -> bool {
        let mut nonces = self.inner.entry(api_key.to_owned()).or_default();
        if nonces.contains_key(nonce) {
            return false;
        }
        nonces.insert(nonce.to_owned(), stamp_ms);
        true
    }

    /// Remove every nonce stamped before `cutoff_ms`. Returns how many were
    /// removed.
    pub fn purge_older_than(&self, cutoff_ms: i64) -> usize {
        let mut removed = 0;
        self.inner.retain(|_, nonces| {
            let before = nonces.len();
            nonces.retain(|_, stamp| *stamp >= cutoff_ms);
            removed += before - nonces.len();
            !nonces.is_empty()
        });

        if removed > 0 {
            debug!(removed, cutoff_ms, "Purged expired nonces");
        }
        removed
    }

    /// Total number of recorded nonces across all API keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.iter().map(|entry| entry.value().len()).sum()
    }

    /// Whether no nonce has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
