//! In-memory manifest cache.
//!
//! Manifests are immutable once addressed by digest, so entries never
//! expire; the LRU bound keeps memory in check. Large manifests (typically
//! big multi-arch indexes) are not worth holding and are skipped.

use crate::client::ManifestResponse;
use crate::digest::Digest;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use tracing::debug;


/// Default number of manifests held.
pub const DEFAULT_CAPACITY: usize = 128;

/// Default size limit for a single cached manifest, in bytes.
pub const DEFAULT_MAX_ITEM_SIZE: usize = 50 * 1024;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug)]
struct Inner {
    entries: LruCache<Digest, ManifestResponse>,
    hits: u64,
    misses: u64,
}

/// LRU cache of manifests keyed by digest.
#[derive(Debug)]
pub struct ManifestCache {
    inner: Mutex<Inner>,
    max_item_size: usize,
}

impl Default for ManifestCache {
    fn default() -> Self {
        Self::new(
            NonZeroUsize::new(DEFAULT_CAPACITY).unwrap_or(NonZeroUsize::MIN),
            DEFAULT_MAX_ITEM_SIZE,
        )
    }
}

impl ManifestCache {
    pub fn new(capacity: NonZeroUsize, max_item_size: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: LruCache::new(capacity),
                hits: 0,
                misses: 0,
            }),
            max_item_size,
        }
    }

    pub fn max_item_size(&self) -> usize {
        self.max_item_size
    }

    /// Looks up a manifest, marking it as recently used.
    pub fn get(&self, digest: &Digest) -> Option<ManifestResponse> {
        let mut inner = self.inner.lock();
        let found = inner.entries.get(digest).cloned();
        match found {
            Some(manifest) => {
                inner.hits += 1;
                debug!(%digest, "manifest cache hit");
                Some(manifest)
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    /// Stores `manifest` unless it exceeds the size limit.
    ///
    /// Returns whether the manifest was cached.
    pub fn insert(&self, manifest: &ManifestResponse) -> bool {
        if manifest.bytes.len() > self.max_item_size {
            debug!(
                digest = %manifest.digest,
                size = manifest.bytes.len(),
                "manifest too large to cache"
            );
            return false;
        }

        self.inner
            .lock()
            .entries
            .put(manifest.digest.clone(), manifest.clone());
        true
    }

    pub fn contains(&self, digest: &Digest) -> bool {
        self.inner.lock().entries.contains(digest)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.hits = 0;
        inner.misses = 0;
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            entries: inner.entries.len(),
            hits: inner.hits,
            misses: inner.misses,
        }
    }
}
