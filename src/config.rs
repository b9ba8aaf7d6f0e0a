use serde::Deserialize;
use thiserror::Error;

/// Upper bound on the simulated storage; beyond this the block array itself
/// stops fitting in a reasonable amount of host memory
pub const MAX_TOTAL_SIZE_LOG2: u64 = 32;

/// Upper bound on victim cache lines. The victim cache is a single set, so
/// every lookup scans all of it; anything near this bound already defeats its
/// purpose
pub const MAX_VICTIM_CACHE_LINES: u64 = 1 << 16;

/// A cache hierarchy configuration, usually resulting from parsing JSON
///
/// The geometry fields are base-2 logarithms, so every size is a power of two
/// by construction. The short aliases match the classic setup parameters
/// (c, b, s, v, k), and every field defaults to the classic geometry: a 32KB
/// cache of 32-byte blocks, 8 blocks per set, 4 victim blocks, prefetch
/// distance 2
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Total data storage is 2^total_size_log2 bytes
    #[serde(alias = "c", default = "CacheConfig::default_total_size_log2")]
    pub total_size_log2: u64,

    /// A single block covers 2^block_size_log2 bytes
    #[serde(alias = "b", default = "CacheConfig::default_block_size_log2")]
    pub block_size_log2: u64,

    /// Each set holds 2^set_assoc_log2 blocks
    #[serde(alias = "s", default = "CacheConfig::default_set_assoc_log2")]
    pub set_assoc_log2: u64,

    /// Number of victim cache blocks. 0 disables the victim cache
    #[serde(alias = "v", default = "CacheConfig::default_victim_cache_lines")]
    pub victim_cache_lines: u64,

    /// Reserved prefetch distance. Accepted and reported, but no prefetch is
    /// issued
    #[serde(alias = "k", default = "CacheConfig::default_prefetch_distance")]
    pub prefetch_distance: u64,
}

/// Rejection reasons for a geometry that cannot describe a real cache
///
/// Raised at construction so a bad configuration never reaches the
/// simulation loop
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("total cache size 2^{total} bytes is too large to simulate")]
    CacheTooLarge { total: u64 },

    #[error("block size 2^{block} bytes exceeds the total cache size 2^{total} bytes")]
    BlockExceedsCache { block: u64, total: u64 },

    #[error("associativity 2^{assoc} exceeds the {blocks} blocks in the cache")]
    AssociativityExceedsBlocks { assoc: u64, blocks: u64 },

    #[error("{lines} victim cache lines exceeds the supported maximum")]
    VictimCacheTooLarge { lines: u64 },
}

impl CacheConfig {
    fn default_total_size_log2() -> u64 {
        15
    }

    fn default_block_size_log2() -> u64 {
        5
    }

    fn default_set_assoc_log2() -> u64 {
        3
    }

    fn default_victim_cache_lines() -> u64 {
        4
    }

    fn default_prefetch_distance() -> u64 {
        2
    }

    /// Checks that the geometry describes a realisable cache
    ///
    /// returns: Result<(), ConfigError>, Err with a descriptive reason on the
    /// first violated constraint
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.total_size_log2 > MAX_TOTAL_SIZE_LOG2 {
            return Err(ConfigError::CacheTooLarge {
                total: self.total_size_log2,
            });
        }
        if self.block_size_log2 > self.total_size_log2 {
            return Err(ConfigError::BlockExceedsCache {
                block: self.block_size_log2,
                total: self.total_size_log2,
            });
        }
        if self.set_assoc_log2 > self.total_size_log2 - self.block_size_log2 {
            return Err(ConfigError::AssociativityExceedsBlocks {
                assoc: self.set_assoc_log2,
                blocks: self.n_blocks(),
            });
        }
        if self.victim_cache_lines > MAX_VICTIM_CACHE_LINES {
            return Err(ConfigError::VictimCacheTooLarge {
                lines: self.victim_cache_lines,
            });
        }
        Ok(())
    }

    pub fn block_bytes(&self) -> u64 {
        1 << self.block_size_log2
    }

    pub fn n_blocks(&self) -> u64 {
        1 << (self.total_size_log2 - self.block_size_log2)
    }

    pub fn blocks_per_set(&self) -> u64 {
        1 << self.set_assoc_log2
    }

    pub fn n_sets(&self) -> u64 {
        self.n_blocks() / self.blocks_per_set()
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            total_size_log2: Self::default_total_size_log2(),
            block_size_log2: Self::default_block_size_log2(),
            set_assoc_log2: Self::default_set_assoc_log2(),
            victim_cache_lines: Self::default_victim_cache_lines(),
            prefetch_distance: Self::default_prefetch_distance(),
        }
    }
}
