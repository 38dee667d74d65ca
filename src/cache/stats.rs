//! Cache Statistics Module
//!
//! Tracks read cache behavior: hits, misses, loads and invalidations.

use serde::Serialize;

// == Cache Stats ==
/// Tracks read cache metrics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Reads served from a loaded entry
    pub hits: u64,
    /// Reads that found no entry and started a load
    pub misses: u64,
    /// Reads that joined another caller's in-flight load
    pub coalesced: u64,
    /// Loader invocations that hit the store
    pub loads: u64,
    /// Loader invocations that failed (never cached)
    pub load_failures: u64,
    /// Entries removed by invalidation
    pub invalidated: u64,
    /// Completed cycles
    pub cycles: u64,
    /// Current number of entries in the cache
    pub total_entries: usize,
}

impl CacheStats {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Coalesced reads count as hits since they cause no extra load.
    /// Returns 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let served = self.hits + self.coalesced;
        let total = served + self.misses;
        if total == 0 {
            0.0
        } else {
            served as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_coalesced(&mut self) {
        self.coalesced += 1;
    }

    pub fn record_load(&mut self, ok: bool) {
        self.loads += 1;
        if !ok {
            self.load_failures += 1;
        }
    }

    pub fn record_invalidated(&mut self, count: usize) {
        self.invalidated += count as u64;
    }

    pub fn record_cycle(&mut self) {
        self.cycles += 1;
    }

    // == Update Entry Count ==
    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }
}
