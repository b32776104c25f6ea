//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, evictions and invalidations.

use serde::Serialize;

// == Cache Stats ==
/// Tracks cache performance metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Number of successful image retrievals
    pub hits: u64,
    /// Number of image retrievals for absent keys
    pub misses: u64,
    /// Number of entries evicted to stay within the byte budget
    pub evictions: u64,
    /// Number of entries dropped because the underlying record changed
    pub invalidations: u64,
    /// Current number of entries in the cache
    pub total_entries: usize,
    /// Current cumulative payload size in bytes
    pub total_bytes: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    // == Record Hit ==
    /// Increments the hit counter.
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    // == Record Miss ==
    /// Increments the miss counter.
    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    // == Record Eviction ==
    /// Increments the eviction counter.
    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    // == Record Invalidations ==
    /// Adds `count` entries dropped because their records changed.
    pub fn record_invalidations(&mut self, count: usize) {
        self.invalidations += count as u64;
    }
}
