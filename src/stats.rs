use serde::{Deserialize, Serialize};

/// Running counters for one simulation, plus the derived metrics filled in at
/// finalisation. Can be serialised to the reported output format
///
/// The `_combined` counters record misses at every level, so an access that
/// misses both the L1 and the victim cache contributes twice. `vc_misses`
/// counts the accesses that fell through the whole cache complex to main
/// memory; without a victim cache configured that is every L1 miss
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub accesses: u64,
    pub reads: u64,
    pub read_misses: u64,
    pub read_misses_combined: u64,
    pub writes: u64,
    pub write_misses: u64,
    pub write_misses_combined: u64,
    pub misses: u64,
    /// Dirty blocks flushed to memory on displacement
    pub write_backs: u64,
    pub vc_misses: u64,
    /// Reserved for the prefetch extension, never incremented
    pub prefetched_blocks: u64,
    /// Reserved for the prefetch extension, never incremented
    pub useful_prefetches: u64,
    pub bytes_transferred: u64,

    pub hit_time: f64,
    pub miss_penalty: u64,
    pub miss_rate: f64,
    pub avg_access_time: f64,
}
