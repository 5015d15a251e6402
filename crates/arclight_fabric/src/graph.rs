//! An in-memory routing fabric built programmatically.
//!
//! [`GraphFabric`] is a complete software model of a routing fabric: wires,
//! pips, nets with budgeted users, binding state, conflict reporting, a
//! seeded PRNG stream, and a binding-state checksum. It backs the router's
//! tests and serves as the reference for what a device-database
//! implementation of [`Fabric`] must provide.

use crate::ids::{NetId, PipId, WireId};
use crate::types::{Delay, DelayRange, Strength, WireBinding};
use crate::Fabric;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::collections::HashMap;

/// How the fabric answers conflict queries for occupied resources.
///
/// Real fabrics differ: some can name the exact wire whose eviction frees a
/// resource, others can only name the owning net. The router handles both;
/// tests pick the granularity they want to exercise.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ConflictReport {
    /// Conflict queries name the specific occupied wire.
    Wire,
    /// Conflict queries name only the owning net.
    Net,
}

#[derive(Debug, Clone)]
struct WireData {
    name: String,
    delay: DelayRange,
    position: Option<(i32, i32)>,
    downhill: Vec<PipId>,
}

#[derive(Debug, Clone)]
struct PipData {
    name: String,
    src: WireId,
    dst: WireId,
    delay: DelayRange,
}

#[derive(Debug, Clone)]
struct NetUser {
    wire: WireId,
    budget: Delay,
}

#[derive(Debug, Clone)]
struct NetData {
    name: String,
    source: Option<WireId>,
    users: Vec<NetUser>,
    skip: bool,
}

#[derive(Debug, Clone)]
struct BoundWire {
    net: NetId,
    pip: Option<PipId>,
    strength: Strength,
}

/// A programmatically-built in-memory routing fabric.
///
/// Wires, pips, and nets are added through the `add_*` methods; binding
/// state is mutated through the [`Fabric`] trait. The PRNG stream is seeded
/// (default seed 1) so that routing runs against the same graph reproduce
/// exactly.
pub struct GraphFabric {
    wires: Vec<WireData>,
    pips: Vec<PipData>,
    nets: Vec<NetData>,
    wire_bindings: HashMap<WireId, BoundWire>,
    pip_bindings: HashMap<PipId, NetId>,
    conflict_report: ConflictReport,
    ripup_penalty: Delay,
    epsilon: Delay,
    estimate_scale: i64,
    rng: StdRng,
    locked: bool,
}

impl GraphFabric {
    /// Creates an empty fabric with PRNG seed 1, net-granular conflict
    /// reporting, and a base rip-up penalty of 100 fabric units.
    pub fn new() -> Self {
        Self::with_seed(1)
    }

    /// Creates an empty fabric with the given PRNG seed.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            wires: Vec::new(),
            pips: Vec::new(),
            nets: Vec::new(),
            wire_bindings: HashMap::new(),
            pip_bindings: HashMap::new(),
            conflict_report: ConflictReport::Net,
            ripup_penalty: Delay::new(100),
            epsilon: Delay::ZERO,
            estimate_scale: 1,
            rng: StdRng::seed_from_u64(seed),
            locked: false,
        }
    }

    /// Re-seeds the PRNG stream.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Sets the conflict reporting granularity.
    pub fn set_conflict_report(&mut self, report: ConflictReport) {
        self.conflict_report = report;
    }

    /// Sets the base rip-up delay penalty.
    pub fn set_ripup_penalty(&mut self, penalty: Delay) {
        self.ripup_penalty = penalty;
    }

    /// Sets the delay comparison epsilon.
    pub fn set_delay_epsilon(&mut self, epsilon: Delay) {
        self.epsilon = epsilon;
    }

    /// Sets the per-grid-unit scale of the Manhattan delay estimate.
    pub fn set_estimate_scale(&mut self, scale: i64) {
        self.estimate_scale = scale;
    }

    /// Adds a wire with no grid position and returns its ID.
    pub fn add_wire(&mut self, name: &str, delay: DelayRange) -> WireId {
        self.add_wire_data(name, delay, None)
    }

    /// Adds a wire at a grid position and returns its ID.
    ///
    /// Positioned wires participate in the Manhattan delay estimate.
    pub fn add_wire_at(&mut self, name: &str, delay: DelayRange, x: i32, y: i32) -> WireId {
        self.add_wire_data(name, delay, Some((x, y)))
    }

    fn add_wire_data(&mut self, name: &str, delay: DelayRange, position: Option<(i32, i32)>) -> WireId {
        let id = WireId::from_raw(self.wires.len() as u32);
        self.wires.push(WireData {
            name: name.to_string(),
            delay,
            position,
            downhill: Vec::new(),
        });
        id
    }

    /// Adds a pip from `src` to `dst` and returns its ID.
    pub fn add_pip(&mut self, src: WireId, dst: WireId, delay: DelayRange) -> PipId {
        let id = PipId::from_raw(self.pips.len() as u32);
        let name = format!(
            "{}->{}",
            self.wires[src.as_raw() as usize].name,
            self.wires[dst.as_raw() as usize].name
        );
        self.pips.push(PipData {
            name,
            src,
            dst,
            delay,
        });
        self.wires[src.as_raw() as usize].downhill.push(id);
        id
    }

    /// Adds a net and returns its ID. The net starts with no source, no
    /// users, and is therefore skipped until a source is set.
    pub fn add_net(&mut self, name: &str) -> NetId {
        let id = NetId::from_raw(self.nets.len() as u32);
        self.nets.push(NetData {
            name: name.to_string(),
            source: None,
            users: Vec::new(),
            skip: false,
        });
        id
    }

    /// Sets the net's source wire.
    pub fn set_source(&mut self, net: NetId, wire: WireId) {
        self.nets[net.as_raw() as usize].source = Some(wire);
    }

    /// Adds a user (sink wire + timing budget) to the net and returns its
    /// user index.
    pub fn add_user(&mut self, net: NetId, wire: WireId, budget: Delay) -> usize {
        let users = &mut self.nets[net.as_raw() as usize].users;
        users.push(NetUser { wire, budget });
        users.len() - 1
    }

    /// Marks the net as skipped regardless of its driver.
    pub fn set_skip(&mut self, net: NetId, skip: bool) {
        self.nets[net.as_raw() as usize].skip = skip;
    }

    /// Returns the net a wire is currently bound to, if any.
    pub fn bound_net(&self, wire: WireId) -> Option<NetId> {
        self.wire_bindings.get(&wire).map(|b| b.net)
    }

    /// Returns the number of wires currently bound across all nets.
    pub fn bound_wire_count(&self) -> usize {
        self.wire_bindings.len()
    }

    /// Returns whether the fabric lock is currently held.
    pub fn is_locked(&self) -> bool {
        self.locked
    }
}

impl Default for GraphFabric {
    fn default() -> Self {
        Self::new()
    }
}

impl Fabric for GraphFabric {
    fn nets(&self) -> Vec<NetId> {
        (0..self.nets.len() as u32).map(NetId::from_raw).collect()
    }

    fn net_name(&self, net: NetId) -> String {
        self.nets[net.as_raw() as usize].name.clone()
    }

    fn skip_net(&self, net: NetId) -> bool {
        let data = &self.nets[net.as_raw() as usize];
        data.skip || data.source.is_none()
    }

    fn user_count(&self, net: NetId) -> usize {
        self.nets[net.as_raw() as usize].users.len()
    }

    fn user_budget(&self, net: NetId, user: usize) -> Delay {
        self.nets[net.as_raw() as usize].users[user].budget
    }

    fn source_wire(&self, net: NetId) -> Option<WireId> {
        self.nets[net.as_raw() as usize].source
    }

    fn sink_wire(&self, net: NetId, user: usize) -> Option<WireId> {
        self.nets[net.as_raw() as usize]
            .users
            .get(user)
            .map(|u| u.wire)
    }

    fn net_wires(&self, net: NetId) -> Vec<WireId> {
        let mut wires: Vec<WireId> = self
            .wire_bindings
            .iter()
            .filter(|(_, b)| b.net == net)
            .map(|(&w, _)| w)
            .collect();
        wires.sort();
        wires
    }

    fn net_binding(&self, net: NetId, wire: WireId) -> Option<WireBinding> {
        self.wire_bindings
            .get(&wire)
            .filter(|b| b.net == net)
            .map(|b| WireBinding {
                pip: b.pip,
                strength: b.strength,
            })
    }

    fn wire_name(&self, wire: WireId) -> String {
        self.wires[wire.as_raw() as usize].name.clone()
    }

    fn pip_name(&self, pip: PipId) -> String {
        self.pips[pip.as_raw() as usize].name.clone()
    }

    fn pips_downhill(&self, wire: WireId) -> Vec<PipId> {
        self.wires[wire.as_raw() as usize].downhill.clone()
    }

    fn pip_src_wire(&self, pip: PipId) -> WireId {
        self.pips[pip.as_raw() as usize].src
    }

    fn pip_dst_wire(&self, pip: PipId) -> WireId {
        self.pips[pip.as_raw() as usize].dst
    }

    fn wire_delay(&self, wire: WireId) -> DelayRange {
        self.wires[wire.as_raw() as usize].delay
    }

    fn pip_delay(&self, pip: PipId) -> DelayRange {
        self.pips[pip.as_raw() as usize].delay
    }

    fn estimate_delay(&self, src: WireId, dst: WireId) -> Delay {
        let a = self.wires[src.as_raw() as usize].position;
        let b = self.wires[dst.as_raw() as usize].position;
        match (a, b) {
            (Some((ax, ay)), Some((bx, by))) => {
                let dist = (ax - bx).abs() as i64 + (ay - by).abs() as i64;
                Delay::new(dist * self.estimate_scale)
            }
            _ => Delay::ZERO,
        }
    }

    fn delay_epsilon(&self) -> Delay {
        self.epsilon
    }

    fn ripup_delay_penalty(&self) -> Delay {
        self.ripup_penalty
    }

    fn wire_available(&self, wire: WireId) -> bool {
        !self.wire_bindings.contains_key(&wire)
    }

    fn pip_available(&self, pip: PipId) -> bool {
        !self.pip_bindings.contains_key(&pip)
    }

    fn conflicting_wire_wire(&self, wire: WireId) -> Option<WireId> {
        match self.conflict_report {
            ConflictReport::Wire if self.wire_bindings.contains_key(&wire) => Some(wire),
            _ => None,
        }
    }

    fn conflicting_wire_net(&self, wire: WireId) -> Option<NetId> {
        self.wire_bindings.get(&wire).map(|b| b.net)
    }

    fn conflicting_pip_wire(&self, pip: PipId) -> Option<WireId> {
        match self.conflict_report {
            ConflictReport::Wire if self.pip_bindings.contains_key(&pip) => {
                Some(self.pip_dst_wire(pip))
            }
            _ => None,
        }
    }

    fn conflicting_pip_net(&self, pip: PipId) -> Option<NetId> {
        self.pip_bindings.get(&pip).copied()
    }

    fn bind_wire(&mut self, wire: WireId, net: NetId, strength: Strength) {
        debug_assert!(
            self.wire_available(wire),
            "bind_wire on occupied wire {}",
            self.wire_name(wire)
        );
        self.wire_bindings.insert(
            wire,
            BoundWire {
                net,
                pip: None,
                strength,
            },
        );
    }

    fn bind_pip(&mut self, pip: PipId, net: NetId, strength: Strength) {
        let dst = self.pip_dst_wire(pip);
        debug_assert!(
            self.pip_available(pip),
            "bind_pip on occupied pip {}",
            self.pip_name(pip)
        );
        debug_assert!(
            self.wire_available(dst),
            "bind_pip onto occupied wire {}",
            self.wire_name(dst)
        );
        self.pip_bindings.insert(pip, net);
        self.wire_bindings.insert(
            dst,
            BoundWire {
                net,
                pip: Some(pip),
                strength,
            },
        );
    }

    fn unbind_wire(&mut self, wire: WireId) {
        if let Some(bound) = self.wire_bindings.remove(&wire) {
            if let Some(pip) = bound.pip {
                self.pip_bindings.remove(&pip);
            }
        }
    }

    fn prng(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn checksum(&self) -> u64 {
        let mut entries: Vec<(WireId, NetId, Option<PipId>)> = self
            .wire_bindings
            .iter()
            .map(|(&w, b)| (w, b.net, b.pip))
            .collect();
        entries.sort();
        let mut bytes = Vec::with_capacity(entries.len() * 12);
        for (w, n, p) in entries {
            bytes.extend_from_slice(&w.as_raw().to_le_bytes());
            bytes.extend_from_slice(&n.as_raw().to_le_bytes());
            bytes.extend_from_slice(&p.map_or(u32::MAX, PipId::as_raw).to_le_bytes());
        }
        xxhash_rust::xxh3::xxh3_64(&bytes)
    }

    fn lock(&mut self) {
        self.locked = true;
    }

    fn unlock(&mut self) {
        self.locked = false;
    }
}
