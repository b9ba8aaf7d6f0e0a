use std::time::{Duration, Instant};

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use crate::cache::{Cache, CacheLevel, RecencyPolicy};
use crate::config::{CacheConfig, ConfigError};
use crate::stats::CacheStats;

/// Cost of a miss that has to be served by main memory, in the same units as
/// `hit_time`
pub const MISS_PENALTY: u64 = 200;

/// Analytic hit time is `HIT_TIME_BASE + HIT_TIME_PER_ASSOC_LOG2 * log2(associativity)`
pub const HIT_TIME_BASE: f64 = 2.0;
pub const HIT_TIME_PER_ASSOC_LOG2: f64 = 0.2;

/// The direction of a memory reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

/// A malformed line in a trace buffer. Lines are numbered from 1
#[derive(Debug, Error, PartialEq, Eq)]
#[error("malformed trace line {line}: {reason}")]
pub struct TraceError {
    pub line: usize,
    pub reason: &'static str,
}

/// The simulator owns the whole hierarchy, the logical clock, and the running
/// counters, and mutates them one reference at a time
///
/// It supports calling simulate multiple times, and will update the time taken
/// to simulate and the counters accordingly. Finalisation consumes the
/// simulator, so no access can be issued after the derived metrics are
/// computed
pub struct Simulator {
    l1: Cache,
    victim: Option<Cache>,
    stats: CacheStats,
    clock: u64,
    set_assoc_log2: u64,
    block_bytes: u64,
    simulation_time: Duration,
}

impl Simulator {
    /// Allocates zero-initialised cache state for a validated configuration
    ///
    /// A `victim_cache_lines` of 0 disables the victim cache. The victim cache
    /// is a single set spanning all its lines, with FIFO stamps
    ///
    /// # Arguments
    ///
    /// * `config`: A cache configuration, usually resulting from parsing JSON
    ///
    /// returns: Result<Simulator, ConfigError>
    pub fn new(config: &CacheConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let l1 = Cache::new(
            CacheLevel::L1,
            config.n_blocks(),
            config.blocks_per_set(),
            config.block_size_log2,
            RecencyPolicy::Lru,
            config.prefetch_distance,
        );
        let victim = (config.victim_cache_lines > 0).then(|| {
            Cache::new(
                CacheLevel::Victim,
                config.victim_cache_lines,
                config.victim_cache_lines,
                config.block_size_log2,
                RecencyPolicy::Fifo,
                0,
            )
        });
        Ok(Self {
            l1,
            victim,
            stats: CacheStats::default(),
            clock: 0,
            set_assoc_log2: config.set_assoc_log2,
            block_bytes: config.block_bytes(),
            simulation_time: Duration::new(0, 0),
        })
    }

    /// Handles one memory reference: L1 lookup, hit or miss resolution, and
    /// counter updates. The logical clock advances once per call, after the
    /// reference is fully resolved
    pub fn access(&mut self, rw: Access, address: u64) {
        match rw {
            Access::Read => self.stats.reads += 1,
            Access::Write => self.stats.writes += 1,
        }
        match self.l1.lookup(address) {
            Some(index) => self.l1.touch(index, rw == Access::Write, self.clock),
            None => self.miss(rw, address),
        }
        self.clock += 1;
    }

    fn miss(&mut self, rw: Access, address: u64) {
        self.stats.misses += 1;
        match rw {
            Access::Read => {
                self.stats.read_misses += 1;
                self.stats.read_misses_combined += 1;
            }
            Access::Write => {
                self.stats.write_misses += 1;
                self.stats.write_misses_combined += 1;
            }
        }

        // The line the incoming block would displace, whether or not a victim
        // cache gets involved
        let l1_victim = self.l1.evict_choice(address);

        if let Some(vc) = self.victim.as_mut() {
            match vc.lookup(address) {
                Some(found) => {
                    // Promotion: the requested block and the displaced L1
                    // resident swap places. Both get the current stamp, which
                    // is an LRU refresh on the way up and a fresh FIFO
                    // insertion on the way down. A pure intra-hierarchy move,
                    // no bytes touch memory
                    if rw == Access::Write {
                        vc.blocks[found].dirty = true;
                    }
                    vc.blocks[found].time = self.clock;
                    self.l1.blocks[l1_victim].time = self.clock;
                    std::mem::swap(&mut self.l1.blocks[l1_victim], &mut vc.blocks[found]);
                }
                None => {
                    self.stats.vc_misses += 1;
                    match rw {
                        Access::Read => self.stats.read_misses_combined += 1,
                        Access::Write => self.stats.write_misses_combined += 1,
                    }
                    let vc_victim = vc.evict_choice(address);
                    if vc.blocks[vc_victim].dirty {
                        self.stats.write_backs += 1;
                        self.stats.bytes_transferred += self.block_bytes;
                    }
                    // The displaced L1 line moves down into the victim cache
                    // as its newest entry; that transfer also covers the fetch
                    // of the requested block in this cost model
                    self.stats.bytes_transferred += self.block_bytes;
                    vc.blocks[vc_victim] = self.l1.blocks[l1_victim];
                    vc.blocks[vc_victim].time = self.clock;
                    self.l1.overwrite(l1_victim, address, rw == Access::Write, self.clock);
                }
            }
        } else {
            // No victim cache: every L1 miss is served by main memory
            self.stats.vc_misses += 1;
            if self.l1.blocks[l1_victim].dirty {
                self.stats.write_backs += 1;
                self.stats.bytes_transferred += self.block_bytes;
            }
            self.l1.overwrite(l1_victim, address, rw == Access::Write, self.clock);
            self.stats.bytes_transferred += self.block_bytes;
        }
    }

    /// Replays a whole trace buffer of `<r|w> <hex address>` lines
    ///
    /// Blank lines are skipped and a trailing `\r` is tolerated, so both unix
    /// and windows line endings work. Parsing stops at the first malformed
    /// line, reported by number
    ///
    /// Note that reads from the byte buffer are *guaranteed to be sequential*.
    /// This means that when using something like mmap, one can advise the
    /// operating system that sequential reads will be used, which can increase
    /// read performance
    ///
    /// # Arguments
    ///
    /// * `bytes`: The input byte buffer
    ///
    /// returns: Result<(), TraceError>
    pub fn simulate(&mut self, bytes: &[u8]) -> Result<(), TraceError> {
        let start = Instant::now();
        for (number, raw) in bytes.split(|&byte| byte == b'\n').enumerate() {
            let line = match raw.split_last() {
                Some((b'\r', rest)) => rest,
                _ => raw,
            };
            if line.is_empty() {
                continue;
            }
            let (rw, address) = parse_line(line).map_err(|reason| TraceError {
                line: number + 1,
                reason,
            })?;
            self.access(rw, address);
        }
        self.simulation_time += start.elapsed();
        Ok(())
    }

    /// Computes the derived metrics and releases all cache storage
    ///
    /// Consuming the simulator is what enforces the contract that no access
    /// follows finalisation. `miss_rate` and `avg_access_time` are NaN when
    /// the trace was empty
    pub fn finalize(self) -> CacheStats {
        let mut stats = self.stats;
        stats.accesses = stats.reads + stats.writes;
        stats.miss_rate = stats.misses as f64 / stats.accesses as f64;
        stats.hit_time = HIT_TIME_BASE + HIT_TIME_PER_ASSOC_LOG2 * self.set_assoc_log2 as f64;
        stats.miss_penalty = MISS_PENALTY;
        stats.avg_access_time = stats.hit_time + stats.miss_rate * stats.miss_penalty as f64;
        stats
    }

    /// The running counters. Derived fields stay zero until finalisation
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    pub fn l1(&self) -> &Cache {
        &self.l1
    }

    pub fn victim(&self) -> Option<&Cache> {
        self.victim.as_ref()
    }

    /// Gets the wall-clock execution time for processing
    pub fn get_execution_time(&self) -> &Duration {
        &self.simulation_time
    }

    /// Gets the number of never-filled lines for each cache level
    pub fn uninitialised_line_counts(&self) -> Vec<(CacheLevel, usize)> {
        let mut counts = vec![(self.l1.level, self.l1.uninitialised_line_count())];
        if let Some(vc) = &self.victim {
            counts.push((vc.level, vc.uninitialised_line_count()));
        }
        counts
    }
}

lazy_static! {
    // Reference grammar for a trace line, used to cross-check the hand-rolled
    // parser in debug builds
    static ref TRACE_LINE: Regex = Regex::new(r"^[rw][ \t]+(?:0[xX])?[0-9a-fA-F]+$").unwrap();
}

/// Parses one trace line of the form `<r|w> <hex address>`
///
/// Re-implemented byte-wise, as from_str_radix plus the UTF-8 round trip end
/// up being the bottleneck for small caches. Debug builds verify every parse
/// against the regex grammar and the standard library
fn parse_line(line: &[u8]) -> Result<(Access, u64), &'static str> {
    let rw = match line.first() {
        Some(b'r') => Access::Read,
        Some(b'w') => Access::Write,
        _ => return Err("expected access type 'r' or 'w'"),
    };
    let mut rest = &line[1..];
    if !matches!(rest.first(), Some(b' ' | b'\t')) {
        return Err("expected whitespace after the access type");
    }
    while matches!(rest.first(), Some(b' ' | b'\t')) {
        rest = &rest[1..];
    }
    if rest.starts_with(b"0x") || rest.starts_with(b"0X") {
        rest = &rest[2..];
    }
    if rest.is_empty() {
        return Err("missing address");
    }
    while rest.len() > 16 && rest[0] == b'0' {
        rest = &rest[1..];
    }
    if rest.len() > 16 {
        return Err("address does not fit in 64 bits");
    }
    let mut address: u64 = 0;
    for &byte in rest {
        match hex_value(byte) {
            Some(value) => address = (address << 4) | u64::from(value),
            None => return Err("invalid hex digit in address"),
        }
    }
    debug_assert!(TRACE_LINE.is_match(std::str::from_utf8(line).unwrap()));
    debug_assert_eq!(
        {
            let addr_as_str = std::str::from_utf8(rest).unwrap();
            u64::from_str_radix(addr_as_str, 16).unwrap()
        },
        address
    );
    Ok((rw, address))
}

const fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}
