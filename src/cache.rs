use std::fmt;

/// A cache's position in the hierarchy. Only used for identification, the
/// access protocol lives in the simulator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheLevel {
    L1,
    Victim,
}

impl fmt::Display for CacheLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CacheLevel::L1 => "L1",
            CacheLevel::Victim => "VC",
        })
    }
}

/// How a cache maintains its block timestamps
///
/// The eviction rule is shared and always picks the oldest stamp; LRU and FIFO
/// fall out of when the stamp is written. An `Lru` cache stamps a block on
/// every access, a `Fifo` cache stamps it once when the block is brought in
/// and never touches it again
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecencyPolicy {
    Lru,
    Fifo,
}

/// Metadata for a single cache line
///
/// A block with `valid = false` is content-free and is always the preferred
/// eviction candidate in its set. `dirty` marks data newer than the backing
/// memory image, which must be flushed before the line's storage is reused
#[derive(Debug, Default, Clone, Copy)]
pub struct Block {
    pub valid: bool,
    pub dirty: bool,
    pub was_prefetched: bool,
    pub tag: u64,
    pub time: u64,
}

/// A fixed-capacity store of cache lines, organised as `n_sets` contiguous
/// runs of `blocks_per_set` lines in one flat array
///
/// The fully-associative case is the degenerate geometry where every line is
/// in one set, so the victim cache needs no separate implementation
pub struct Cache {
    pub level: CacheLevel,
    pub recency: RecencyPolicy,
    pub(crate) blocks: Vec<Block>,
    n_blocks: u64,
    blocks_per_set: u64,
    block_size_log2: u64,
    block_bytes: u64,
    prefetch_distance: u64,
}

impl Cache {
    /// Allocates a cache with every line invalid
    ///
    /// Geometry must already be validated: `n_blocks` divisible by
    /// `blocks_per_set`, both powers of two for set-associative caches
    pub fn new(
        level: CacheLevel,
        n_blocks: u64,
        blocks_per_set: u64,
        block_size_log2: u64,
        recency: RecencyPolicy,
        prefetch_distance: u64,
    ) -> Self {
        Self {
            level,
            recency,
            blocks: vec![Block::default(); n_blocks as usize],
            n_blocks,
            blocks_per_set,
            block_size_log2,
            block_bytes: 1 << block_size_log2,
            prefetch_distance,
        }
    }

    pub fn n_blocks(&self) -> u64 {
        self.n_blocks
    }

    pub fn blocks_per_set(&self) -> u64 {
        self.blocks_per_set
    }

    pub fn n_sets(&self) -> u64 {
        self.n_blocks / self.blocks_per_set
    }

    pub fn block_bytes(&self) -> u64 {
        self.block_bytes
    }

    /// The address bits identifying a block: the address with its block-offset
    /// bits masked out
    pub fn block_tag(&self, address: u64) -> u64 {
        address & !(self.block_bytes - 1)
    }

    /// The set an address is constrained to map into
    ///
    /// For a fully-associative cache there is a single set and this is
    /// always 0
    pub fn set_index(&self, address: u64) -> u64 {
        (address >> self.block_size_log2) & (self.n_sets() - 1)
    }

    fn set_start(&self, address: u64) -> usize {
        (self.set_index(address) * self.blocks_per_set) as usize
    }

    /// Scans the set for a valid line carrying the address's tag
    ///
    /// Invalid lines never match, whatever stale tag they hold
    ///
    /// # Arguments
    ///
    /// * `address`: The address of the access
    ///
    /// returns: Option<usize>, the index of the resident line
    pub(crate) fn lookup(&self, address: u64) -> Option<usize> {
        let tag = self.block_tag(address);
        let start = self.set_start(address);
        let end = start + self.blocks_per_set as usize;
        (start..end).find(|&index| self.blocks[index].valid && self.blocks[index].tag == tag)
    }

    /// Picks the eviction candidate in the set holding `address`: the first
    /// invalid line if there is one, otherwise the line with the oldest stamp,
    /// first occurrence winning ties
    pub(crate) fn evict_choice(&self, address: u64) -> usize {
        let start = self.set_start(address);
        let end = start + self.blocks_per_set as usize;
        let mut choice = start;
        let mut index = start;
        while index < end {
            if !self.blocks[index].valid {
                return index;
            }
            if self.blocks[index].time < self.blocks[choice].time {
                choice = index;
            }
            index += 1;
        }
        choice
    }

    /// Updates a resident line on a hit. Writes set the dirty bit; the stamp
    /// is only refreshed under `RecencyPolicy::Lru`
    pub(crate) fn touch(&mut self, index: usize, is_write: bool, now: u64) {
        let refresh = self.recency == RecencyPolicy::Lru;
        let block = &mut self.blocks[index];
        if is_write {
            block.dirty = true;
        }
        if refresh {
            block.time = now;
        }
    }

    /// Reinitialises a line in place as the freshly fetched block for
    /// `address`
    pub(crate) fn overwrite(&mut self, index: usize, address: u64, is_write: bool, now: u64) {
        let tag = self.block_tag(address);
        let block = &mut self.blocks[index];
        block.tag = tag;
        block.valid = true;
        block.dirty = is_write;
        block.was_prefetched = false;
        block.time = now;
    }

    /// The number of lines never filled since setup. Useful for analysing
    /// cache utilisation or debugging
    pub fn uninitialised_line_count(&self) -> usize {
        self.blocks.iter().filter(|block| !block.valid).count()
    }
}

impl fmt::Display for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "the {} cache", self.level)?;
        writeln!(f, "============")?;
        writeln!(f, "\tbytes: {}", self.block_bytes * self.n_blocks)?;
        writeln!(f, "\tbytes/block: {}", self.block_bytes)?;
        writeln!(f, "\tblocks: {}", self.n_blocks)?;
        writeln!(f, "\tblocks/set: {}", self.blocks_per_set)?;
        writeln!(f, "\tsets: {}", self.n_sets())?;
        writeln!(
            f,
            "\teviction recency: {}",
            match self.recency {
                RecencyPolicy::Lru => "lru",
                RecencyPolicy::Fifo => "fifo",
            }
        )?;
        writeln!(f, "\tblocks to prefetch: {}", self.prefetch_distance)
    }
}
