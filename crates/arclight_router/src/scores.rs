//! Rip-up score accounting.
//!
//! Every time a wire binding is evicted or a whole net is torn out, its
//! score is bumped. The A\* cost model multiplies rip-up penalties by
//! `1 + score`, so resources that keep getting fought over become
//! progressively more expensive and the negotiation converges.

use arclight_fabric::{NetId, WireId};
use std::collections::HashMap;

/// Per-wire and per-net rip-up counters.
///
/// Counters start at zero, only ever increase during a routing invocation,
/// and are read by the search and written by the rip-up engine.
#[derive(Debug, Default)]
pub struct ScoreBook {
    wires: HashMap<WireId, u32>,
    nets: HashMap<NetId, u32>,
}

impl ScoreBook {
    /// Creates an empty score book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the wire's rip-up count.
    pub fn bump_wire(&mut self, wire: WireId) {
        *self.wires.entry(wire).or_insert(0) += 1;
    }

    /// Increments the net's rip-up count.
    pub fn bump_net(&mut self, net: NetId) {
        *self.nets.entry(net).or_insert(0) += 1;
    }

    /// Returns the wire's rip-up count (zero if never ripped).
    pub fn wire(&self, wire: WireId) -> u32 {
        self.wires.get(&wire).copied().unwrap_or(0)
    }

    /// Returns the net's rip-up count (zero if never ripped).
    pub fn net(&self, net: NetId) -> u32 {
        self.nets.get(&net).copied().unwrap_or(0)
    }
}
