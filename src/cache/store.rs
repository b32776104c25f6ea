//! Image Store Module
//!
//! Main cache engine combining HashMap storage with LRU ordering and byte-size accounting.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::cache::lru::{LruList, NodeId};
use crate::cache::{CacheKey, CacheStats, ImageSlot};

#[derive(Debug)]
struct StoredSlot {
    slot: ImageSlot,
    size: usize,
    node: NodeId,
}

// == Image Store ==
/// Byte-bounded image storage with LRU eviction.
///
/// The store is not synchronized; [`crate::cache::ImageCache`] wraps it in a
/// single lock. The running size never exceeds `max_bytes` once a mutating
/// call returns.
#[derive(Debug)]
pub struct ImageStore {
    /// Key-slot storage
    entries: HashMap<CacheKey, StoredSlot>,
    /// Recency order, front = most recently used
    lru: LruList<CacheKey>,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum cumulative payload size in bytes
    max_bytes: usize,
    /// Current cumulative payload size in bytes
    size_bytes: usize,
}

impl ImageStore {
    // == Constructor ==
    /// Creates a new ImageStore holding at most `max_bytes` of image payload.
    pub fn new(max_bytes: usize) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruList::new(),
            stats: CacheStats::new(),
            max_bytes,
            size_bytes: 0,
        }
    }

    // == Put ==
    /// Stores a slot, replacing any previous slot under the same key.
    ///
    /// The new slot becomes the most recently used entry; least recently
    /// used entries are evicted until the byte budget holds again. A slot
    /// larger than the whole budget is not cached: the previous slot under
    /// the key is dropped and nothing else is evicted.
    ///
    /// Returns the replaced slot, if any.
    pub fn put(&mut self, key: CacheKey, slot: ImageSlot) -> Option<ImageSlot> {
        let size = slot.size_bytes();
        let previous = self.take(&key);

        if size > self.max_bytes {
            warn!(
                "Not caching {}: {} bytes exceeds budget of {} bytes",
                key, size, self.max_bytes
            );
            self.stats.record_eviction();
            return previous;
        }

        let node = self.lru.push_front(key.clone());
        self.entries.insert(key, StoredSlot { slot, size, node });
        self.size_bytes += size;
        self.trim_to_size();

        previous
    }

    // == Get ==
    /// Retrieves a slot and promotes it to most recently used.
    pub fn get(&mut self, key: &CacheKey) -> Option<ImageSlot> {
        match self.entries.get(key) {
            Some(stored) => {
                self.lru.touch(stored.node);
                self.stats.record_hit();
                Some(stored.slot.clone())
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Remove ==
    /// Removes a slot unconditionally, returning it if it was present.
    pub fn remove(&mut self, key: &CacheKey) -> Option<ImageSlot> {
        self.take(key)
    }

    // == Invalidate ==
    /// Removes a slot because its record changed.
    ///
    /// Returns true if an entry was dropped.
    pub fn invalidate(&mut self, key: &CacheKey) -> bool {
        let removed = self.take(key).is_some();
        if removed {
            self.stats.record_invalidations(1);
        }
        removed
    }

    // == Invalidate All ==
    /// Drops every entry, counting them as invalidations.
    ///
    /// Returns the number of entries dropped.
    pub fn invalidate_all(&mut self) -> usize {
        let count = self.entries.len();
        self.clear();
        self.stats.record_invalidations(count);
        count
    }

    // == Clear ==
    /// Removes all entries and resets the size to zero.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.lru.clear();
        self.size_bytes = 0;
    }

    // == Contains ==
    /// Checks for a key without touching recency or statistics.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.total_entries = self.entries.len();
        stats.total_bytes = self.size_bytes;
        stats
    }

    /// Keys from most to least recently used.
    pub fn keys_by_recency(&self) -> Vec<CacheKey> {
        self.lru.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    fn take(&mut self, key: &CacheKey) -> Option<ImageSlot> {
        let stored = self.entries.remove(key)?;
        self.lru.remove(stored.node);
        self.size_bytes -= stored.size;
        Some(stored.slot)
    }

    // == Trim ==
    /// Evicts from the least recently used end until within budget.
    fn trim_to_size(&mut self) {
        while self.size_bytes > self.max_bytes {
            let Some(key) = self.lru.pop_back() else {
                break;
            };
            if let Some(stored) = self.entries.remove(&key) {
                self.size_bytes -= stored.size;
                self.stats.record_eviction();
                debug!("Evicted {} ({} bytes)", key, stored.size);
            }
        }
    }
}
