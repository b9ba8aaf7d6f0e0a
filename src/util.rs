use std::fmt::Write;

use crate::simulator::Access;

/// Generates a deterministic pseudo-random access sequence
///
/// Uses xorshift64 so the same seed always produces the same sequence, which
/// keeps tests and benchmarks reproducible without shipping trace files.
/// Addresses are confined to a modest range so runs mix conflict and capacity
/// behaviour instead of missing on everything
pub fn synth_accesses(events: usize, seed: u64) -> Vec<(Access, u64)> {
    let mut state = seed | 1;
    let mut out = Vec::with_capacity(events);
    for _ in 0..events {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        let rw = if state & 0x4 == 0 {
            Access::Read
        } else {
            Access::Write
        };
        let address = state & 0x3_FFFF;
        out.push((rw, address));
    }
    out
}

/// Renders a synthetic access sequence in the `<r|w> <hex address>` trace
/// format
pub fn synth_trace(events: usize, seed: u64) -> String {
    let mut out = String::with_capacity(events * 10);
    for (rw, address) in synth_accesses(events, seed) {
        let letter = match rw {
            Access::Read => 'r',
            Access::Write => 'w',
        };
        writeln!(out, "{letter} {address:x}").unwrap();
    }
    out
}
