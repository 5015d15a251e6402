//! Arc identity and work-queue entries.
//!
//! An arc is one (net, user-index) pair: the problem of connecting a net's
//! source wire to one of its sink wires. Arcs carry no routing state of
//! their own; the [`ArcIndex`](crate::index::ArcIndex) records which wires
//! they occupy.

use arclight_fabric::{Delay, NetId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// One source-to-sink routing problem: a net and a user index into it.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct ArcKey {
    /// The net being routed.
    pub net: NetId,
    /// The index of the user (sink) within the net.
    pub user: usize,
}

impl ArcKey {
    /// Creates an arc key.
    pub fn new(net: NetId, user: usize) -> Self {
        Self { net, user }
    }
}

impl fmt::Display for ArcKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.net, self.user)
    }
}

/// A work-queue entry: an arc and its routing priority.
///
/// Priority is `estimate_delay(source, sink) - budget`; arcs whose estimated
/// cost is high relative to their slack sort first, so tight arcs route
/// before the graph congests. Ties fall back to the arc key so heap order
/// is total and runs reproduce.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ArcEntry {
    /// The arc to route.
    pub arc: ArcKey,
    /// The arc's routing priority; larger pops first.
    pub priority: Delay,
}

impl Ord for ArcEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| self.arc.cmp(&other.arc))
    }
}

impl PartialOrd for ArcEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
