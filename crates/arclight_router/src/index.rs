//! The bidirectional wire-to-arc occupancy index.
//!
//! Tracks which arcs currently traverse which wires and the inverse. The
//! two maps are mutual inverses after every public operation; all mutation
//! goes through this type so the invariant cannot drift.

use crate::arc::ArcKey;
use arclight_fabric::WireId;
use std::collections::{HashMap, HashSet};

/// Two inverse mappings: wire to the arcs routed through it, and arc to the
/// wires it occupies.
///
/// Detaching the last arc from a wire is the caller's cue to unbind the
/// wire in the fabric; the index itself never talks to the fabric.
#[derive(Debug, Default)]
pub struct ArcIndex {
    wire_to_arcs: HashMap<WireId, HashSet<ArcKey>>,
    arc_to_wires: HashMap<ArcKey, HashSet<WireId>>,
}

impl ArcIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `arc` occupies `wire`.
    pub fn attach(&mut self, arc: ArcKey, wire: WireId) {
        self.wire_to_arcs.entry(wire).or_default().insert(arc);
        self.arc_to_wires.entry(arc).or_default().insert(wire);
    }

    /// Removes `arc` from `wire`. Returns `true` if the wire now has no
    /// remaining arcs.
    pub fn detach(&mut self, arc: ArcKey, wire: WireId) -> bool {
        if let Some(arcs) = self.wire_to_arcs.get_mut(&wire) {
            arcs.remove(&arc);
            if arcs.is_empty() {
                self.wire_to_arcs.remove(&wire);
            }
        }
        if let Some(wires) = self.arc_to_wires.get_mut(&arc) {
            wires.remove(&wire);
            if wires.is_empty() {
                self.arc_to_wires.remove(&arc);
            }
        }
        !self.wire_to_arcs.contains_key(&wire)
    }

    /// Returns whether `arc` currently occupies `wire`.
    pub fn uses(&self, arc: ArcKey, wire: WireId) -> bool {
        self.wire_to_arcs
            .get(&wire)
            .is_some_and(|arcs| arcs.contains(&arc))
    }

    /// Returns the wires occupied by `arc`.
    pub fn wires_of(&self, arc: ArcKey) -> Vec<WireId> {
        self.arc_to_wires
            .get(&arc)
            .map(|wires| wires.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Returns the arcs routed through `wire`.
    pub fn arcs_of(&self, wire: WireId) -> Vec<ArcKey> {
        self.wire_to_arcs
            .get(&wire)
            .map(|arcs| arcs.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Returns whether any arc is routed through `wire`.
    pub fn wire_in_use(&self, wire: WireId) -> bool {
        self.wire_to_arcs.contains_key(&wire)
    }

    /// Detaches `arc` from every wire it occupies and returns those wires.
    ///
    /// The caller unbinds whichever of the returned wires ended up with no
    /// remaining arcs.
    pub fn drop_arc(&mut self, arc: ArcKey) -> Vec<WireId> {
        let Some(wires) = self.arc_to_wires.remove(&arc) else {
            return Vec::new();
        };
        for &wire in &wires {
            if let Some(arcs) = self.wire_to_arcs.get_mut(&wire) {
                arcs.remove(&arc);
                if arcs.is_empty() {
                    self.wire_to_arcs.remove(&wire);
                }
            }
        }
        wires.into_iter().collect()
    }

    /// Detaches every arc from `wire` and returns those arcs.
    ///
    /// Used by the rip-up engine when a wire's binding is evicted.
    pub fn clear_wire(&mut self, wire: WireId) -> Vec<ArcKey> {
        let Some(arcs) = self.wire_to_arcs.remove(&wire) else {
            return Vec::new();
        };
        for &arc in &arcs {
            if let Some(wires) = self.arc_to_wires.get_mut(&arc) {
                wires.remove(&wire);
                if wires.is_empty() {
                    self.arc_to_wires.remove(&arc);
                }
            }
        }
        arcs.into_iter().collect()
    }

    /// Iterates over all (wire, arcs) entries.
    pub fn wires(&self) -> impl Iterator<Item = (WireId, &HashSet<ArcKey>)> {
        self.wire_to_arcs.iter().map(|(&w, arcs)| (w, arcs))
    }

    /// Iterates over all (arc, wires) entries.
    pub fn arcs(&self) -> impl Iterator<Item = (ArcKey, &HashSet<WireId>)> {
        self.arc_to_wires.iter().map(|(&a, wires)| (a, wires))
    }

    /// Verifies that the two maps are mutual inverses. Used by the debug
    /// integrity check.
    pub fn check_inverse(&self) -> Result<(), String> {
        for (&wire, arcs) in &self.wire_to_arcs {
            for arc in arcs {
                if !self
                    .arc_to_wires
                    .get(arc)
                    .is_some_and(|wires| wires.contains(&wire))
                {
                    return Err(format!("wire {wire} lists arc {arc} but not inversely"));
                }
            }
        }
        for (&arc, wires) in &self.arc_to_wires {
            for wire in wires {
                if !self
                    .wire_to_arcs
                    .get(wire)
                    .is_some_and(|arcs| arcs.contains(&arc))
                {
                    return Err(format!("arc {arc} lists wire {wire} but not inversely"));
                }
            }
        }
        Ok(())
    }
}
