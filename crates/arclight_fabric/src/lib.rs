//! Routing fabric oracle abstraction for the Arclight detailed router.
//!
//! This crate provides the [`Fabric`] trait that abstracts over FPGA routing
//! fabrics: the routing graph (wires connected by programmable switches),
//! resource availability and conflict queries, binding mutators, delay
//! estimates, and a deterministic PRNG stream. The router core consumes the
//! trait and never sees any fabric-specific encoding.
//!
//! A concrete in-memory implementation, [`GraphFabric`], is provided as a
//! software device model. Real device databases implement [`Fabric`] in
//! their own crates.
//!
//! # Usage
//!
//! ```
//! use arclight_fabric::{DelayRange, Fabric, GraphFabric};
//!
//! let mut fabric = GraphFabric::new();
//! let a = fabric.add_wire("a", DelayRange::uniform(5));
//! let b = fabric.add_wire("b", DelayRange::uniform(5));
//! let pip = fabric.add_pip(a, b, DelayRange::uniform(2));
//!
//! assert_eq!(fabric.pips_downhill(a), vec![pip]);
//! assert!(fabric.wire_available(b));
//! ```

#![warn(missing_docs)]

pub mod graph;
pub mod ids;
pub mod types;

pub use graph::{ConflictReport, GraphFabric};
pub use ids::{NetId, PipId, WireId};
pub use types::{Delay, DelayRange, Strength, WireBinding};

/// The oracle interface between a routing fabric and the router core.
///
/// A fabric owns the routing graph, the netlist view the router operates on
/// (nets, their source and sink wires, per-sink timing budgets), and the
/// binding state that records which net claims which wire or pip. The router
/// holds an exclusive `&mut dyn Fabric` for the duration of one routing
/// invocation and mutates bindings only through [`bind_wire`](Self::bind_wire),
/// [`bind_pip`](Self::bind_pip), and [`unbind_wire`](Self::unbind_wire).
///
/// Read methods take `&self`; mutators and the PRNG take `&mut self`.
/// [`lock`](Self::lock)/[`unlock`](Self::unlock) bracket a routing invocation
/// for fabrics shared with other subsystems and default to no-ops.
pub trait Fabric {
    // --- Netlist view ---

    /// Returns all nets in the design, in a stable order.
    fn nets(&self) -> Vec<NetId>;

    /// Returns a human-readable name for the net, used in diagnostics.
    fn net_name(&self, net: NetId) -> String {
        format!("net_{net}")
    }

    /// Returns whether the router must leave this net alone (no driver, or
    /// routed entirely through dedicated resources).
    fn skip_net(&self, net: NetId) -> bool;

    /// Returns the number of users (sinks) of the net.
    fn user_count(&self, net: NetId) -> usize;

    /// Returns the timing budget (signed slack) of one user of the net.
    fn user_budget(&self, net: NetId, user: usize) -> Delay;

    /// Resolves the net's driver pin to a routing wire.
    fn source_wire(&self, net: NetId) -> Option<WireId>;

    /// Resolves one user's pin to a routing wire.
    fn sink_wire(&self, net: NetId, user: usize) -> Option<WireId>;

    /// Returns the wires currently bound to the net, in a stable order.
    fn net_wires(&self, net: NetId) -> Vec<WireId>;

    /// Returns the number of wires currently bound to the net.
    fn net_wire_count(&self, net: NetId) -> usize {
        self.net_wires(net).len()
    }

    /// Returns the net's binding record for a wire, or `None` if the wire is
    /// not bound to this net.
    fn net_binding(&self, net: NetId, wire: WireId) -> Option<WireBinding>;

    // --- Routing graph ---

    /// Returns a human-readable name for the wire, used in diagnostics.
    fn wire_name(&self, wire: WireId) -> String {
        format!("wire_{wire}")
    }

    /// Returns a human-readable name for the pip, used in diagnostics.
    fn pip_name(&self, pip: PipId) -> String {
        format!("pip_{pip}")
    }

    /// Returns the switches leaving the wire (outgoing edges).
    fn pips_downhill(&self, wire: WireId) -> Vec<PipId>;

    /// Returns the wire a pip switches from.
    fn pip_src_wire(&self, pip: PipId) -> WireId;

    /// Returns the wire a pip switches onto.
    fn pip_dst_wire(&self, pip: PipId) -> WireId;

    // --- Timing ---

    /// Returns the propagation delay along a wire segment.
    fn wire_delay(&self, wire: WireId) -> DelayRange;

    /// Returns the propagation delay through a pip.
    fn pip_delay(&self, pip: PipId) -> DelayRange;

    /// Estimates the routed delay between two wires.
    ///
    /// Used as the A\* heuristic and in work-queue priorities. Need not be a
    /// strict lower bound; the search tolerates estimate slack up to the
    /// configured precision.
    fn estimate_delay(&self, src: WireId, dst: WireId) -> Delay;

    /// Returns the smallest delay difference the fabric considers
    /// significant. Candidate paths must beat a visited wire's score by more
    /// than this to replace it.
    fn delay_epsilon(&self) -> Delay {
        Delay::ZERO
    }

    /// Returns the base penalty unit from which rip-up penalties, reuse
    /// bonuses, and the estimate precision are derived.
    fn ripup_delay_penalty(&self) -> Delay;

    // --- Availability and conflicts ---

    /// Returns whether the wire is free to be bound.
    fn wire_available(&self, wire: WireId) -> bool;

    /// Returns whether the pip is free to be bound.
    fn pip_available(&self, pip: PipId) -> bool;

    /// Names the specific wire whose eviction would free `wire`, if the
    /// conflict is that precise. Preempts
    /// [`conflicting_wire_net`](Self::conflicting_wire_net).
    fn conflicting_wire_wire(&self, wire: WireId) -> Option<WireId>;

    /// Names the net whose eviction would free `wire`, when no single wire
    /// resolves the conflict.
    fn conflicting_wire_net(&self, wire: WireId) -> Option<NetId>;

    /// Names the specific wire whose eviction would free `pip`, if the
    /// conflict is that precise. Preempts
    /// [`conflicting_pip_net`](Self::conflicting_pip_net).
    fn conflicting_pip_wire(&self, pip: PipId) -> Option<WireId>;

    /// Names the net whose eviction would free `pip`, when no single wire
    /// resolves the conflict.
    fn conflicting_pip_net(&self, pip: PipId) -> Option<NetId>;

    // --- Binding mutators ---

    /// Binds a wire to a net with no driving pip (the net's source wire).
    ///
    /// The wire must be available.
    fn bind_wire(&mut self, wire: WireId, net: NetId, strength: Strength);

    /// Binds a pip and its destination wire to a net.
    ///
    /// Records the pip as the destination wire's driver. Both the pip and
    /// its destination wire must be available.
    fn bind_pip(&mut self, pip: PipId, net: NetId, strength: Strength);

    /// Releases a wire's binding, including the pip recorded as its driver.
    ///
    /// Unbinding a wire that is not bound is a no-op.
    fn unbind_wire(&mut self, wire: WireId);

    // --- Miscellaneous ---

    /// Returns the next value of the fabric's deterministic PRNG stream.
    ///
    /// Used for search tie-breaking; re-seeding is the fabric's concern.
    fn prng(&mut self) -> u32;

    /// Returns an opaque fingerprint of the whole design's binding state.
    fn checksum(&self) -> u64;

    /// Takes the fabric lock for a routing invocation. Default no-op.
    fn lock(&mut self) {}

    /// Releases the fabric lock. Default no-op.
    fn unlock(&mut self) {}
}
