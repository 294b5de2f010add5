use classlink_utils::sync::{AtomicU64, Ordering};
use serde::Serialize;

#[derive(Debug, Serialize, Clone, Copy, PartialEq)]
pub struct CacheStat {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub size: usize,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq)]
pub struct CacheStats {
    pub member: CacheStat,
    pub intrinsic: CacheStat,
    pub call_site: CacheStat,
    pub publish_races_lost: u64,
    pub bootstrap_invocations: u64,
    pub initializer_runs: u64,
    pub initialization_waits: u64,
    pub loader_constraints: usize,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Cache Statistics:")?;
        writeln!(f, "  Member Cache:           {}", self.member)?;
        writeln!(f, "  Intrinsic Table:        {}", self.intrinsic)?;
        writeln!(f, "  Call Sites:             {}", self.call_site)?;
        writeln!(f, "  Lost Publish Races:     {:>8}", self.publish_races_lost)?;
        writeln!(f, "  Bootstrap Invocations:  {:>8}", self.bootstrap_invocations)?;
        writeln!(f, "  Initializer Runs:       {:>8}", self.initializer_runs)?;
        writeln!(f, "  Initialization Waits:   {:>8}", self.initialization_waits)?;
        writeln!(f, "  Loader Constraints:     {:>8}", self.loader_constraints)?;
        Ok(())
    }
}

impl std::fmt::Display for CacheStat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "hits: {:>8}, misses: {:>8}, hit_rate: {:>6.2}%, size: {:>8}",
            self.hits,
            self.misses,
            self.hit_rate * 100.0,
            self.size
        )
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CacheSizes {
    pub member_size: usize,
    pub intrinsic_size: usize,
    pub call_site_size: usize,
    pub loader_constraint_size: usize,
}

/// Metrics counters.
///
/// All counters use `Ordering::Relaxed`: they are independent and never used
/// to synchronize other memory.
#[derive(Debug, Default)]
pub struct RuntimeMetrics {
    pub member_cache_hits: AtomicU64,
    pub member_cache_misses: AtomicU64,
    pub intrinsic_cache_hits: AtomicU64,
    pub intrinsic_cache_misses: AtomicU64,
    pub call_site_hits: AtomicU64,
    pub call_site_misses: AtomicU64,
    /// Resolutions whose result was discarded because another thread published first
    pub publish_races_lost: AtomicU64,
    pub bootstrap_invocations: AtomicU64,
    pub initializer_runs: AtomicU64,
    /// Times a thread blocked on another thread's type initialization
    pub initialization_waits: AtomicU64,
}

impl RuntimeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_member_cache_hit(&self) {
        self.member_cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_member_cache_miss(&self) {
        self.member_cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_intrinsic_cache_hit(&self) {
        self.intrinsic_cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_intrinsic_cache_miss(&self) {
        self.intrinsic_cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_call_site_hit(&self) {
        self.call_site_hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_call_site_miss(&self) {
        self.call_site_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_publish_race_lost(&self) {
        self.publish_races_lost.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_bootstrap_invocation(&self) {
        self.bootstrap_invocations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_initializer_run(&self) {
        self.initializer_runs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_initialization_wait(&self) {
        self.initialization_waits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cache_statistics(&self, sizes: CacheSizes) -> CacheStats {
        CacheStats {
            member: self.stat(
                self.member_cache_hits.load(Ordering::Relaxed),
                self.member_cache_misses.load(Ordering::Relaxed),
                sizes.member_size,
            ),
            intrinsic: self.stat(
                self.intrinsic_cache_hits.load(Ordering::Relaxed),
                self.intrinsic_cache_misses.load(Ordering::Relaxed),
                sizes.intrinsic_size,
            ),
            call_site: self.stat(
                self.call_site_hits.load(Ordering::Relaxed),
                self.call_site_misses.load(Ordering::Relaxed),
                sizes.call_site_size,
            ),
            publish_races_lost: self.publish_races_lost.load(Ordering::Relaxed),
            bootstrap_invocations: self.bootstrap_invocations.load(Ordering::Relaxed),
            initializer_runs: self.initializer_runs.load(Ordering::Relaxed),
            initialization_waits: self.initialization_waits.load(Ordering::Relaxed),
            loader_constraints: sizes.loader_constraint_size,
        }
    }

    fn stat(&self, hits: u64, misses: u64, size: usize) -> CacheStat {
        let total = hits + misses;
        let hit_rate = if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        };
        CacheStat {
            hits,
            misses,
            hit_rate,
            size,
        }
    }
}
