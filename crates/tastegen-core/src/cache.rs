//! Per-session verdict cache using moka
//!
//! Memoizes validation reports by candidate content hash. One cache belongs
//! to exactly one session; the orchestrator never hands the same instance
//! to two sessions.

use moka::sync::Cache;
use tastegen_artifact::ContentHash;
use tastegen_stream::{ValidationReport, VerdictMemo};

/// Statistics for cache monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of entries in cache
    pub entry_count: u64,
}

/// Bounded content-addressed verdict cache
#[derive(Debug, Clone)]
pub struct VerdictCache {
    inner: Cache<ContentHash, ValidationReport>,
}

impl VerdictCache {
    /// Create new cache with max capacity
    #[inline]
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: Cache::new(max_capacity),
        }
    }

    /// Check if hash is cached
    #[inline]
    #[must_use]
    pub fn contains(&self, hash: &ContentHash) -> bool {
        self.inner.contains_key(hash)
    }

    /// Cache statistics, after applying pending maintenance
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.inner.run_pending_tasks();
        CacheStats {
            entry_count: self.inner.entry_count(),
        }
    }

    /// Clear all entries
    pub fn clear(&self) {
        self.inner.invalidate_all();
    }
}

impl VerdictMemo for VerdictCache {
    fn get(&self, hash: &ContentHash) -> Option<ValidationReport> {
        self.inner.get(hash)
    }

    fn put(&self, hash: ContentHash, report: ValidationReport) {
        self.inner.insert(hash, report);
    }
}
