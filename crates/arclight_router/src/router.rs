//! Router state: the fabric borrow, occupancy index, score book, work
//! queue, setup/adoption of pre-existing routes, the rip-up engine, and the
//! integrity check.

use crate::arc::ArcKey;
use crate::astar::QueuedNode;
use crate::config::RouterConfig;
use crate::error::RouteError;
use crate::index::ArcIndex;
use crate::queue::ArcQueue;
use crate::scores::ScoreBook;
use arclight_fabric::{Fabric, NetId, PipId, Strength, WireId};
use std::collections::{BinaryHeap, HashMap, HashSet};

/// One routing invocation's mutable state.
///
/// Holds the exclusive fabric borrow for its lifetime. All mutation of the
/// occupancy index, score book, work queue, and fabric bindings happens in
/// a single well-defined sequential order through this type.
pub(crate) struct Router<'a> {
    pub(crate) fabric: &'a mut dyn Fabric,
    pub(crate) cfg: &'a RouterConfig,
    pub(crate) index: ArcIndex,
    pub(crate) scores: ScoreBook,
    pub(crate) queue: ArcQueue,
    /// Search frontier, reused across arcs to avoid reallocation.
    pub(crate) frontier: BinaryHeap<QueuedNode>,
    /// Best known search node per wire, reused across arcs.
    pub(crate) visited: HashMap<WireId, QueuedNode>,
    pub(crate) arcs_with_ripup: usize,
    pub(crate) arcs_without_ripup: usize,
    /// Set when the current `route_arc` call evicts anything.
    pub(crate) ripup_flag: bool,
}

impl<'a> Router<'a> {
    pub(crate) fn new(fabric: &'a mut dyn Fabric, cfg: &'a RouterConfig) -> Self {
        Self {
            fabric,
            cfg,
            index: ArcIndex::new(),
            scores: ScoreBook::new(),
            queue: ArcQueue::new(),
            frontier: BinaryHeap::new(),
            visited: HashMap::new(),
            arcs_with_ripup: 0,
            arcs_without_ripup: 0,
            ripup_flag: false,
        }
    }

    /// Resolves an arc's source and sink wires. They were validated during
    /// setup, so absence afterward is an internal error.
    pub(crate) fn arc_endpoints(&self, arc: ArcKey) -> Result<(WireId, WireId), RouteError> {
        let src = self.fabric.source_wire(arc.net).ok_or_else(|| {
            RouteError::invariant(format!(
                "net {} lost its source wire",
                self.fabric.net_name(arc.net)
            ))
        })?;
        let dst = self.fabric.sink_wire(arc.net, arc.user).ok_or_else(|| {
            RouteError::invariant(format!(
                "net {} lost the sink wire of user {}",
                self.fabric.net_name(arc.net),
                arc.user
            ))
        })?;
        Ok((src, dst))
    }

    /// Enqueues an arc with the standard priority: estimated source-to-sink
    /// delay minus the user's budget. Tight-slack arcs sort first.
    pub(crate) fn enqueue_arc_between(&mut self, arc: ArcKey, src: WireId, dst: WireId) {
        let priority =
            self.fabric.estimate_delay(src, dst) - self.fabric.user_budget(arc.net, arc.user);
        self.queue.push(arc, priority);
    }

    /// Enqueues an arc, resolving its endpoints first.
    pub(crate) fn enqueue_arc(&mut self, arc: ArcKey) -> Result<(), RouteError> {
        if self.queue.contains(arc) {
            return Ok(());
        }
        let (src, dst) = self.arc_endpoints(arc)?;
        self.enqueue_arc_between(arc, src, dst);
        Ok(())
    }

    /// Evicts one wire's binding: detaches every arc routed through it,
    /// re-enqueues them, unbinds the wire, and bumps its score.
    fn evict_wire(&mut self, wire: WireId) -> Result<(), RouteError> {
        for arc in self.index.clear_wire(wire) {
            self.enqueue_arc(arc)?;
        }
        self.fabric.unbind_wire(wire);
        self.scores.bump_wire(wire);
        Ok(())
    }

    /// Tears out an entire net: every wire it holds is evicted and the net's
    /// score is bumped.
    pub(crate) fn ripup_net(&mut self, net: NetId) -> Result<(), RouteError> {
        self.scores.bump_net(net);
        for wire in self.fabric.net_wires(net) {
            self.evict_wire(wire)?;
        }
        self.ripup_flag = true;
        Ok(())
    }

    /// Frees a wire by evicting the conflicting wire the fabric names, or
    /// the whole conflicting net if no single wire resolves it.
    pub(crate) fn ripup_wire(&mut self, wire: WireId) -> Result<(), RouteError> {
        match self.fabric.conflicting_wire_wire(wire) {
            Some(conflict) => self.evict_wire(conflict)?,
            None => {
                if let Some(net) = self.fabric.conflicting_wire_net(wire) {
                    self.ripup_net(net)?;
                }
            }
        }
        self.ripup_flag = true;
        Ok(())
    }

    /// Frees a pip by evicting the conflicting wire the fabric names, or the
    /// whole conflicting net if no single wire resolves it.
    pub(crate) fn ripup_pip(&mut self, pip: PipId) -> Result<(), RouteError> {
        match self.fabric.conflicting_pip_wire(pip) {
            Some(conflict) => self.evict_wire(conflict)?,
            None => {
                if let Some(net) = self.fabric.conflicting_pip_net(pip) {
                    self.ripup_net(net)?;
                }
            }
        }
        self.ripup_flag = true;
        Ok(())
    }

    /// Adopts whatever routing is already present and fills the work queue.
    ///
    /// For each non-skipped net: validates cross-net wire usage, walks each
    /// user's stored route backward from the sink attaching wires to the
    /// arc, enqueues unrouted or broken arcs, and unbinds orphaned wires
    /// (bound to the net, covered by no arc, below locked strength).
    pub(crate) fn setup(&mut self) -> Result<(), RouteError> {
        let mut src_to_net: HashMap<WireId, NetId> = HashMap::new();
        let mut dst_to_arc: HashMap<WireId, ArcKey> = HashMap::new();

        for net in self.fabric.nets() {
            if self.fabric.skip_net(net) {
                continue;
            }

            let src_wire = self.fabric.source_wire(net).ok_or_else(|| {
                RouteError::MissingSourceWire {
                    net: self.fabric.net_name(net),
                }
            })?;

            if let Some(&other) = src_to_net.get(&src_wire) {
                return Err(RouteError::SharedSourceWire {
                    wire: self.fabric.wire_name(src_wire),
                    first: self.fabric.net_name(other),
                    second: self.fabric.net_name(net),
                });
            }
            if let Some(&arc) = dst_to_arc.get(&src_wire) {
                return Err(RouteError::SourceSinkOverlap {
                    wire: self.fabric.wire_name(src_wire),
                    source_net: self.fabric.net_name(net),
                    sink_net: self.fabric.net_name(arc.net),
                    user: arc.user,
                });
            }

            for user in 0..self.fabric.user_count(net) {
                let dst_wire = self.fabric.sink_wire(net, user).ok_or_else(|| {
                    RouteError::MissingSinkWire {
                        net: self.fabric.net_name(net),
                        user,
                    }
                })?;

                if let Some(&prev) = dst_to_arc.get(&dst_wire) {
                    if prev.net == net {
                        // Same sink wire twice within one net is one routing
                        // problem; the first user's arc covers it.
                        continue;
                    }
                    return Err(RouteError::SharedSinkWire {
                        wire: self.fabric.wire_name(dst_wire),
                        first: format!("{} ({})", self.fabric.net_name(prev.net), prev.user),
                        second: format!("{} ({})", self.fabric.net_name(net), user),
                    });
                }
                if let Some(&other) = src_to_net.get(&dst_wire) {
                    return Err(RouteError::SourceSinkOverlap {
                        wire: self.fabric.wire_name(dst_wire),
                        source_net: self.fabric.net_name(other),
                        sink_net: self.fabric.net_name(net),
                        user,
                    });
                }

                let arc = ArcKey::new(net, user);
                dst_to_arc.insert(dst_wire, arc);

                if self.fabric.net_binding(net, src_wire).is_none() {
                    self.enqueue_arc_between(arc, src_wire, dst_wire);
                    continue;
                }

                // Walk the stored route backward from the sink. A wire
                // missing from the net's map means the route is broken:
                // enqueue the arc and leave the attached prefix for rip-up
                // to clean.
                let mut cursor = dst_wire;
                self.index.attach(arc, cursor);
                while cursor != src_wire {
                    let Some(binding) = self.fabric.net_binding(net, cursor) else {
                        self.enqueue_arc_between(arc, src_wire, dst_wire);
                        break;
                    };
                    let Some(pip) = binding.pip else {
                        return Err(RouteError::invariant(format!(
                            "wire {} of net {} has no driving pip but is not the source",
                            self.fabric.wire_name(cursor),
                            self.fabric.net_name(net)
                        )));
                    };
                    cursor = self.fabric.pip_src_wire(pip);
                    self.index.attach(arc, cursor);
                }
            }

            src_to_net.insert(src_wire, net);

            // Orphan cleanup: bound wires no arc's walk covered.
            let mut unbind_wires = Vec::new();
            for wire in self.fabric.net_wires(net) {
                let Some(binding) = self.fabric.net_binding(net, wire) else {
                    continue;
                };
                if binding.strength < Strength::Locked && !self.index.wire_in_use(wire) {
                    unbind_wires.push(wire);
                }
            }
            for wire in unbind_wires {
                self.fabric.unbind_wire(wire);
            }
        }

        Ok(())
    }

    /// Full consistency check of the router's view against the fabric.
    ///
    /// Verifies index inversion, that every indexed arc is valid (net not
    /// skipped, user in range), that wires attached to routed arcs are bound
    /// to the arc's net, and that every bound wire is covered by some arc.
    /// Arcs still in the work queue may carry an adopted prefix of unbound
    /// wires, so the binding requirement is waived for them.
    pub(crate) fn check(&self) -> Result<(), RouteError> {
        self.index.check_inverse().map_err(RouteError::Invariant)?;

        let mut valid_arcs: HashSet<ArcKey> = HashSet::new();

        for net in self.fabric.nets() {
            if self.fabric.skip_net(net) {
                continue;
            }

            if self.fabric.source_wire(net).is_none() {
                return Err(RouteError::invariant(format!(
                    "net {} has no source wire",
                    self.fabric.net_name(net)
                )));
            }

            let mut valid_wires: HashSet<WireId> = HashSet::new();

            for user in 0..self.fabric.user_count(net) {
                if self.fabric.sink_wire(net, user).is_none() {
                    return Err(RouteError::invariant(format!(
                        "net {} has no sink wire for user {user}",
                        self.fabric.net_name(net)
                    )));
                }

                let arc = ArcKey::new(net, user);
                valid_arcs.insert(arc);
                let routed = !self.queue.contains(arc);

                for wire in self.index.wires_of(arc) {
                    valid_wires.insert(wire);
                    if routed && self.fabric.net_binding(net, wire).is_none() {
                        return Err(RouteError::invariant(format!(
                            "wire {} is attached to routed arc {arc} but not bound to net {}",
                            self.fabric.wire_name(wire),
                            self.fabric.net_name(net)
                        )));
                    }
                }
            }

            for wire in self.fabric.net_wires(net) {
                if !valid_wires.contains(&wire) {
                    return Err(RouteError::invariant(format!(
                        "wire {} is bound to net {} but covered by no arc",
                        self.fabric.wire_name(wire),
                        self.fabric.net_name(net)
                    )));
                }
            }
        }

        for (wire, arcs) in self.index.wires() {
            for &arc in arcs {
                if !valid_arcs.contains(&arc) {
                    return Err(RouteError::invariant(format!(
                        "stale arc {arc} indexed on wire {}",
                        self.fabric.wire_name(wire)
                    )));
                }
            }
        }
        for (arc, _) in self.index.arcs() {
            if !valid_arcs.contains(&arc) {
                return Err(RouteError::invariant(format!("stale arc {arc} in index")));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arclight_fabric::{Delay, DelayRange, GraphFabric};

    fn simple_delay() -> DelayRange {
        DelayRange::uniform(10)
    }

    /// One net `s -> t` through a single pip, unrouted.
    fn unrouted_single_arc() -> (GraphFabric, WireId, WireId) {
        let mut fabric = GraphFabric::new();
        let s = fabric.add_wire("s", simple_delay());
        let t = fabric.add_wire("t", simple_delay());
        fabric.add_pip(s, t, simple_delay());
        let n = fabric.add_net("n");
        fabric.set_source(n, s);
        fabric.add_user(n, t, Delay::ZERO);
        (fabric, s, t)
    }

    #[test]
    fn setup_enqueues_unrouted_arc() {
        let (mut fabric, ..) = unrouted_single_arc();
        let cfg = RouterConfig::from_fabric(&fabric);
        let mut router = Router::new(&mut fabric, &cfg);
        router.setup().unwrap();
        assert_eq!(router.queue.len(), 1);
        router.check().unwrap();
    }

    #[test]
    fn setup_skips_driverless_net() {
        let mut fabric = GraphFabric::new();
        let t = fabric.add_wire("t", simple_delay());
        let n = fabric.add_net("floating");
        fabric.add_user(n, t, Delay::ZERO);
        // No source wire: the net is skipped, not an error.
        let cfg = RouterConfig::from_fabric(&fabric);
        let mut router = Router::new(&mut fabric, &cfg);
        router.setup().unwrap();
        assert!(router.queue.is_empty());
    }

    #[test]
    fn setup_rejects_shared_source_wire() {
        let mut fabric = GraphFabric::new();
        let s = fabric.add_wire("s", simple_delay());
        let a = fabric.add_net("a");
        let b = fabric.add_net("b");
        fabric.set_source(a, s);
        fabric.set_source(b, s);

        let cfg = RouterConfig::from_fabric(&fabric);
        let mut router = Router::new(&mut fabric, &cfg);
        let err = router.setup().unwrap_err();
        assert!(matches!(err, RouteError::SharedSourceWire { .. }));
    }

    #[test]
    fn setup_rejects_cross_net_shared_sink() {
        let mut fabric = GraphFabric::new();
        let s1 = fabric.add_wire("s1", simple_delay());
        let s2 = fabric.add_wire("s2", simple_delay());
        let t = fabric.add_wire("t", simple_delay());
        let a = fabric.add_net("a");
        fabric.set_source(a, s1);
        fabric.add_user(a, t, Delay::ZERO);
        let b = fabric.add_net("b");
        fabric.set_source(b, s2);
        fabric.add_user(b, t, Delay::ZERO);

        let cfg = RouterConfig::from_fabric(&fabric);
        let mut router = Router::new(&mut fabric, &cfg);
        let err = router.setup().unwrap_err();
        assert!(matches!(err, RouteError::SharedSinkWire { .. }));
    }

    #[test]
    fn setup_skips_duplicate_sink_within_net() {
        let mut fabric = GraphFabric::new();
        let s = fabric.add_wire("s", simple_delay());
        let t = fabric.add_wire("t", simple_delay());
        fabric.add_pip(s, t, simple_delay());
        let n = fabric.add_net("n");
        fabric.set_source(n, s);
        fabric.add_user(n, t, Delay::ZERO);
        fabric.add_user(n, t, Delay::ZERO);

        let cfg = RouterConfig::from_fabric(&fabric);
        let mut router = Router::new(&mut fabric, &cfg);
        router.setup().unwrap();
        // Only the first user becomes an arc.
        assert_eq!(router.queue.len(), 1);
    }

    #[test]
    fn setup_rejects_source_used_as_sink() {
        let mut fabric = GraphFabric::new();
        let s1 = fabric.add_wire("s1", simple_delay());
        let s2 = fabric.add_wire("s2", simple_delay());
        let a = fabric.add_net("a");
        fabric.set_source(a, s1);
        fabric.add_user(a, s2, Delay::ZERO);
        let b = fabric.add_net("b");
        fabric.set_source(b, s2);

        let cfg = RouterConfig::from_fabric(&fabric);
        let mut router = Router::new(&mut fabric, &cfg);
        let err = router.setup().unwrap_err();
        assert!(matches!(err, RouteError::SourceSinkOverlap { .. }));
    }

    #[test]
    fn setup_adopts_existing_route() {
        let (mut fabric, s, t) = unrouted_single_arc();
        let n = NetId::from_raw(0);
        let pip = fabric.pips_downhill(s)[0];
        fabric.bind_wire(s, n, Strength::Weak);
        fabric.bind_pip(pip, n, Strength::Weak);

        let cfg = RouterConfig::from_fabric(&fabric);
        let mut router = Router::new(&mut fabric, &cfg);
        router.setup().unwrap();

        // Fully adopted: nothing to route, both wires covered by the arc.
        assert!(router.queue.is_empty());
        let arc = ArcKey::new(n, 0);
        let mut wires = router.index.wires_of(arc);
        wires.sort();
        assert_eq!(wires, vec![s, t]);
        router.check().unwrap();
    }

    #[test]
    fn setup_unbinds_weak_orphan() {
        let (mut fabric, s, t) = unrouted_single_arc();
        let x = fabric.add_wire("x", simple_delay());
        let px = fabric.add_pip(t, x, simple_delay());
        let n = NetId::from_raw(0);
        let pip = fabric.pips_downhill(s)[0];
        fabric.bind_wire(s, n, Strength::Weak);
        fabric.bind_pip(pip, n, Strength::Weak);
        fabric.bind_pip(px, n, Strength::Weak); // dangles past the sink

        let cfg = RouterConfig::from_fabric(&fabric);
        let mut router = Router::new(&mut fabric, &cfg);
        router.setup().unwrap();

        assert!(router.fabric.wire_available(x));
        router.check().unwrap();
    }

    #[test]
    fn setup_keeps_locked_orphan() {
        let (mut fabric, s, t) = unrouted_single_arc();
        let x = fabric.add_wire("x", simple_delay());
        let px = fabric.add_pip(t, x, simple_delay());
        let n = NetId::from_raw(0);
        let pip = fabric.pips_downhill(s)[0];
        fabric.bind_wire(s, n, Strength::Weak);
        fabric.bind_pip(pip, n, Strength::Weak);
        fabric.bind_pip(px, n, Strength::Locked);

        let cfg = RouterConfig::from_fabric(&fabric);
        let mut router = Router::new(&mut fabric, &cfg);
        router.setup().unwrap();

        assert!(!router.fabric.wire_available(x));
    }

    #[test]
    fn setup_enqueues_broken_route() {
        // Chain s -> m -> t fully bound, then m's binding removed: the
        // backward walk from t breaks at m and the arc is re-queued.
        let mut fabric = GraphFabric::new();
        let s = fabric.add_wire("s", simple_delay());
        let m = fabric.add_wire("m", simple_delay());
        let t = fabric.add_wire("t", simple_delay());
        let p1 = fabric.add_pip(s, m, simple_delay());
        let p2 = fabric.add_pip(m, t, simple_delay());
        let n = fabric.add_net("n");
        fabric.set_source(n, s);
        fabric.add_user(n, t, Delay::ZERO);
        fabric.bind_wire(s, n, Strength::Weak);
        fabric.bind_pip(p1, n, Strength::Weak);
        fabric.bind_pip(p2, n, Strength::Weak);
        fabric.unbind_wire(m);

        let cfg = RouterConfig::from_fabric(&fabric);
        let mut router = Router::new(&mut fabric, &cfg);
        router.setup().unwrap();

        let arc = ArcKey::new(n, 0);
        assert!(router.queue.contains(arc));
        // The attached prefix (t and the unbound m) remains for cleanup.
        assert!(router.index.uses(arc, t));
        assert!(router.index.uses(arc, m));
        router.check().unwrap();
    }

    #[test]
    fn tight_budget_arc_pops_first() {
        let mut fabric = GraphFabric::new();
        let s1 = fabric.add_wire("s1", simple_delay());
        let t1 = fabric.add_wire("t1", simple_delay());
        let s2 = fabric.add_wire("s2", simple_delay());
        let t2 = fabric.add_wire("t2", simple_delay());
        fabric.add_pip(s1, t1, simple_delay());
        fabric.add_pip(s2, t2, simple_delay());

        let loose = fabric.add_net("loose");
        fabric.set_source(loose, s1);
        fabric.add_user(loose, t1, Delay::new(50));
        let tight = fabric.add_net("tight");
        fabric.set_source(tight, s2);
        fabric.add_user(tight, t2, Delay::new(-50));

        let cfg = RouterConfig::from_fabric(&fabric);
        let mut router = Router::new(&mut fabric, &cfg);
        router.setup().unwrap();

        assert_eq!(router.queue.pop(), Some(ArcKey::new(tight, 0)));
        assert_eq!(router.queue.pop(), Some(ArcKey::new(loose, 0)));
    }

    #[test]
    fn ripup_net_requeues_and_scores() {
        let (mut fabric, s, t) = unrouted_single_arc();
        let n = NetId::from_raw(0);
        let pip = fabric.pips_downhill(s)[0];
        fabric.bind_wire(s, n, Strength::Weak);
        fabric.bind_pip(pip, n, Strength::Weak);

        let cfg = RouterConfig::from_fabric(&fabric);
        let mut router = Router::new(&mut fabric, &cfg);
        router.setup().unwrap();
        assert!(router.queue.is_empty());

        router.ripup_net(n).unwrap();

        assert_eq!(router.scores.net(n), 1);
        assert_eq!(router.scores.wire(s), 1);
        assert_eq!(router.scores.wire(t), 1);
        assert!(router.queue.contains(ArcKey::new(n, 0)));
        assert!(router.fabric.wire_available(s));
        assert!(router.fabric.wire_available(t));
        assert!(router.ripup_flag);
        router.check().unwrap();
    }

    #[test]
    fn ripup_wire_with_net_granularity_evicts_owner_net() {
        let (mut fabric, s, _t) = unrouted_single_arc();
        let n = NetId::from_raw(0);
        let pip = fabric.pips_downhill(s)[0];
        fabric.bind_wire(s, n, Strength::Weak);
        fabric.bind_pip(pip, n, Strength::Weak);

        let cfg = RouterConfig::from_fabric(&fabric);
        let mut router = Router::new(&mut fabric, &cfg);
        router.setup().unwrap();
        router.ripup_wire(s).unwrap();

        // Net-granular conflict reporting delegates to whole-net rip-up.
        assert_eq!(router.scores.net(n), 1);
        assert!(router.fabric.wire_available(s));
    }

    #[test]
    fn ripup_wire_with_wire_granularity_evicts_single_wire() {
        let (mut fabric, s, t) = unrouted_single_arc();
        fabric.set_conflict_report(arclight_fabric::ConflictReport::Wire);
        let n = NetId::from_raw(0);
        let pip = fabric.pips_downhill(s)[0];
        fabric.bind_wire(s, n, Strength::Weak);
        fabric.bind_pip(pip, n, Strength::Weak);

        let cfg = RouterConfig::from_fabric(&fabric);
        let mut router = Router::new(&mut fabric, &cfg);
        router.setup().unwrap();
        router.ripup_wire(s).unwrap();

        assert_eq!(router.scores.net(n), 0);
        assert_eq!(router.scores.wire(s), 1);
        assert!(router.fabric.wire_available(s));
        // Only the named wire is evicted; the sink stays bound.
        assert!(!router.fabric.wire_available(t));
    }
}
