use lru::LruCache;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_MEMO_CAPACITY: usize = 64;

/// Hex SHA-256 over the parts. Each part is length-prefixed so `["ab", "c"]` and
/// `["a", "bc"]` hash differently.
pub fn digest(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    hex::encode(hasher.finalize())
}

/// Results keyed by a caller-computed digest. A hit hands back the shared value;
/// `force` recomputes and replaces the entry. Holds at most `capacity` entries and
/// evicts the least recently used one when full.
pub struct MemoCache<T> {
    entries: LruCache<String, Arc<T>>,
    hits: u64,
    misses: u64,
}

impl<T> MemoCache<T> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MEMO_CAPACITY)
    }

    /// A capacity of zero is treated as one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        MemoCache {
            entries: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    pub fn get_or_try_insert_with<E>(
        &mut self,
        key: &str,
        force: bool,
        compute: impl FnOnce() -> Result<T, E>,
    ) -> Result<Arc<T>, E> {
        if !force {
            if let Some(value) = self.entries.get(key) {
                self.hits += 1;
                debug!("Memo hit for {}", key);
                return Ok(Arc::clone(value));
            }
        }

        self.misses += 1;
        debug!("Memo miss for {} (forced: {})", key, force);
        let value = Arc::new(compute()?);
        if let Some((evicted, _)) = self.entries.push(key.to_string(), Arc::clone(&value)) {
            if evicted != key {
                debug!("Memo evicted {}", evicted);
            }
        }
        Ok(value)
    }

    pub fn invalidate(&mut self, key: &str) -> bool {
        self.entries.pop(key).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}

impl<T> Default for MemoCache<T> {
    fn default() -> Self {
        Self::new()
    }
}
