//! Resolver statistics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of a resolver's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverStats {
    /// SRV queries sent.
    pub srv_queries: u64,
    /// A queries sent for uncached targets.
    pub target_queries: u64,
    /// Target lookups answered from the cache.
    pub cache_hits: u64,
    /// SRV targets dropped because their address could not be resolved.
    pub skipped_targets: u64,
    /// Hostnames currently cached.
    pub cached_targets: usize,
}

impl ResolverStats {
    /// Fraction of target lookups served from the cache, in percent.
    pub fn cache_hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.target_queries;
        if total == 0 {
            0.0
        } else {
            (self.cache_hits as f64 / total as f64) * 100.0
        }
    }
}

/// Lock-free counters backing [`ResolverStats`].
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub srv_queries: AtomicU64,
    pub target_queries: AtomicU64,
    pub cache_hits: AtomicU64,
    pub skipped_targets: AtomicU64,
}

impl Counters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, cached_targets: usize) -> ResolverStats {
        ResolverStats {
            srv_queries: self.srv_queries.load(Ordering::Relaxed),
            target_queries: self.target_queries.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            skipped_targets: self.skipped_targets.load(Ordering::Relaxed),
            cached_targets,
        }
    }
}
