//! Cache event counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Per-holder counters, updated on the calling thread without locking.
#[derive(Debug, Default)]
pub struct CacheStats {
    lookups: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    ineligible: AtomicU64,
    compiles: AtomicU64,
    fallbacks: AtomicU64,
}

/// Point-in-time copy of [`CacheStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Calls that reached cache lookup.
    pub lookups: u64,
    pub hits: u64,
    pub misses: u64,
    /// Calls whose operator cannot be served from the cache at all.
    pub ineligible: u64,
    /// Misses that ran a freshly compiled kernel.
    pub compiles: u64,
    pub fallbacks: u64,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum CacheEvent {
    Lookup,
    Hit,
    Miss,
    Ineligible,
    Compile,
    Fallback,
}

impl CacheStats {
    pub(crate) fn record(&self, event: CacheEvent) {
        let counter = match event {
            CacheEvent::Lookup => &self.lookups,
            CacheEvent::Hit => &self.hits,
            CacheEvent::Miss => &self.misses,
            CacheEvent::Ineligible => &self.ineligible,
            CacheEvent::Compile => &self.compiles,
            CacheEvent::Fallback => &self.fallbacks,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            lookups: self.lookups.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            ineligible: self.ineligible.load(Ordering::Relaxed),
            compiles: self.compiles.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
        }
    }
}
