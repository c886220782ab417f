//! Bounded cache of transaction hashes already verified this process.
//!
//! Best-effort duplicate suppression ahead of the durable ledger check.
//! It does not survive restarts and is not shared across instances, so
//! it is never the authority; only the ledger's correlation-id
//! uniqueness is load-bearing for replay prevention.

use lru::LruCache;
use std::num::NonZeroUsize;

/// LRU set of verified transaction hashes.
pub struct VerifiedCache {
    inner: parking_lot::Mutex<LruCache<String, ()>>,
}

impl VerifiedCache {
    /// Create a cache holding at most `capacity` hashes.
    ///
    /// A zero capacity is bumped to 1 rather than rejected.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: parking_lot::Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Check whether a hash was verified this process lifetime.
    ///
    /// Promotes the entry so hot hashes stay resident.
    #[must_use]
    pub fn contains(&self, tx_hash: &str) -> bool {
        self.inner.lock().get(tx_hash).is_some()
    }

    /// Record a verified hash, evicting the least recently used entry
    /// when full.
    pub fn insert(&self, tx_hash: &str) {
        self.inner.lock().put(tx_hash.to_string(), ());
    }

    /// Number of cached hashes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
