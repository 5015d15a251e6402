//! Post-route structural validation.
//!
//! Walks each routed net as a directed graph (pip source wire to pip
//! destination wire) and checks that the routing is a tree rooted at the
//! net's source: every sink reached, no loops, no stub leaves, no dangling
//! fragments. The walk is iterative; stored pip maps from a buggy router or
//! a hostile adoption could cycle, so recursion is not safe here.

use crate::error::ValidateError;
use arclight_fabric::{Fabric, NetId, WireId};
use std::collections::{HashMap, HashSet};

/// Validates the routing of every non-skipped net in the design.
///
/// Returns the first structural defect found. A net with no users must hold
/// no wires; any other net must have its source and every sink bound, with
/// all bound wires forming a tree rooted at the source whose leaves are all
/// sinks.
pub fn verify_routing(fabric: &dyn Fabric) -> Result<(), ValidateError> {
    for net in fabric.nets() {
        if fabric.skip_net(net) {
            continue;
        }
        verify_net(fabric, net)?;
    }
    Ok(())
}

fn verify_net(fabric: &dyn Fabric, net: NetId) -> Result<(), ValidateError> {
    let name = fabric.net_name(net);
    let users = fabric.user_count(net);
    let bound = fabric.net_wires(net);

    if users == 0 {
        if !bound.is_empty() {
            return Err(ValidateError::SinklessNetHasWires { net: name });
        }
        return Ok(());
    }

    // Forward edges of the routing tree: pip source wire -> driven wires.
    let mut children: HashMap<WireId, Vec<WireId>> = HashMap::new();
    for &wire in &bound {
        let Some(binding) = fabric.net_binding(net, wire) else {
            continue;
        };
        if let Some(pip) = binding.pip {
            if fabric.pip_dst_wire(pip) != wire {
                return Err(ValidateError::PipMismatch {
                    net: name,
                    wire: fabric.wire_name(wire),
                });
            }
            children.entry(fabric.pip_src_wire(pip)).or_default().push(wire);
        }
    }

    let Some(src) = fabric.source_wire(net) else {
        return Err(ValidateError::Unrouted { net: name });
    };

    let mut found_unrouted = fabric.net_binding(net, src).is_none();

    let mut dest_wires: HashMap<WireId, usize> = HashMap::new();
    for user in 0..users {
        let Some(dst) = fabric.sink_wire(net, user) else {
            return Err(ValidateError::Unrouted { net: name });
        };
        dest_wires.insert(dst, user);
        if fabric.net_binding(net, dst).is_none() {
            found_unrouted = true;
        }
    }

    let mut found_loop = false;
    let mut stub_wire: Option<WireId> = None;
    let mut visited: HashSet<WireId> = HashSet::new();
    let mut stack = vec![src];

    while let Some(wire) = stack.pop() {
        if !visited.insert(wire) {
            found_loop = true;
            continue;
        }
        match children.get(&wire) {
            Some(kids) => {
                for &child in kids {
                    if visited.contains(&child) {
                        found_loop = true;
                    } else {
                        stack.push(child);
                    }
                }
            }
            None => {
                if !dest_wires.contains_key(&wire) && stub_wire.is_none() {
                    stub_wire = Some(wire);
                }
            }
        }
    }

    let dangling = children.keys().any(|wire| !visited.contains(wire));

    if found_unrouted {
        return Err(ValidateError::Unrouted { net: name });
    }
    if found_loop {
        return Err(ValidateError::Loop { net: name });
    }
    if let Some(wire) = stub_wire {
        return Err(ValidateError::Stub {
            net: name,
            wire: fabric.wire_name(wire),
        });
    }
    if dangling {
        return Err(ValidateError::Dangling { net: name });
    }
    Ok(())
}
