//! Negotiated rip-up-and-reroute detailed routing core.
//!
//! The router embeds logical nets into a fabric's routing graph one arc
//! (source-to-sink connection) at a time. Each arc is routed by an A\*
//! search whose cost model prices in evicting whatever currently occupies a
//! resource; committing a path performs those evictions and re-enqueues the
//! disturbed arcs. Every eviction bumps the victim's score, raising its
//! future eviction price, so contested resources settle with whoever values
//! them most. That negotiation is what drives convergence.
//!
//! # Pipeline
//!
//! 1. **Setup**: adopt routing already present on the nets, queue
//!    unrouted or broken arcs by timing criticality
//! 2. **Drain**: pop the tightest arc, route it with rip-up allowed,
//!    repeat until the queue is empty or an arc is unroutable
//! 3. **Validate**: walk every routed net and reject loops, stubs, and
//!    dangling fragments
//!
//! # Usage
//!
//! ```
//! use arclight_diagnostics::DiagnosticSink;
//! use arclight_fabric::{Delay, DelayRange, GraphFabric};
//! use arclight_router::{route, RouterConfig};
//!
//! let mut fabric = GraphFabric::new();
//! let s = fabric.add_wire("src", DelayRange::uniform(5));
//! let t = fabric.add_wire("dst", DelayRange::uniform(5));
//! fabric.add_pip(s, t, DelayRange::uniform(2));
//! let n = fabric.add_net("q");
//! fabric.set_source(n, s);
//! fabric.add_user(n, t, Delay::ZERO);
//!
//! let config = RouterConfig::from_fabric(&fabric);
//! let sink = DiagnosticSink::new();
//! let summary = route(&mut fabric, &config, &sink).unwrap();
//! assert_eq!(summary.arcs_without_ripup, 1);
//! ```

#![warn(missing_docs)]

pub mod arc;
mod astar;
pub mod config;
pub mod error;
pub mod index;
pub mod queue;
mod router;
pub mod scores;
pub mod validate;

pub use arc::{ArcEntry, ArcKey};
pub use config::RouterConfig;
pub use error::{RouteError, ValidateError};
pub use validate::verify_routing;

use arclight_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};
use arclight_fabric::{Delay, Fabric, WireId};
use router::Router;
use serde::{Deserialize, Serialize};

/// Outer-loop iterations between progress reports (and, in debug builds,
/// integrity checks).
const PROGRESS_INTERVAL: usize = 1000;

/// Totals reported by a successful routing invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSummary {
    /// Outer-loop iterations executed (arcs popped from the work queue).
    pub iterations: usize,
    /// Arcs whose routing evicted at least one resource.
    pub arcs_with_ripup: usize,
    /// Arcs routed without disturbing anything.
    pub arcs_without_ripup: usize,
    /// The fabric's whole-design fingerprint after routing.
    pub checksum: u64,
}

/// Routes every arc of every non-skipped net in the fabric.
///
/// Takes the fabric lock for the whole invocation and releases it on every
/// return path. On success the fabric holds a complete, validated routing
/// and the returned [`RouteSummary`] carries the totals. On failure,
/// bindings made before the failure remain in the fabric; discarding or
/// retrying is the caller's decision.
///
/// Progress is reported through `sink` as note-severity diagnostics every
/// 1000 iterations; an unroutable arc is additionally reported as a
/// warning before the error is returned.
pub fn route(
    fabric: &mut dyn Fabric,
    config: &RouterConfig,
    sink: &DiagnosticSink,
) -> Result<RouteSummary, RouteError> {
    fabric.lock();
    let result = run(&mut *fabric, config, sink);
    fabric.unlock();
    result
}

fn run(
    fabric: &mut dyn Fabric,
    config: &RouterConfig,
    sink: &DiagnosticSink,
) -> Result<RouteSummary, RouteError> {
    sink.emit(Diagnostic::note(
        DiagnosticCode::new(Category::Setup, 1),
        "setting up routing queue",
    ));

    let mut router = Router::new(&mut *fabric, config);
    router.setup()?;
    if cfg!(debug_assertions) {
        router.check()?;
    }

    sink.emit(Diagnostic::note(
        DiagnosticCode::new(Category::Routing, 1),
        format!("routing {} arcs", router.queue.len()),
    ));

    let mut iterations = 0usize;
    let mut last_with_ripup = 0usize;
    let mut last_without_ripup = 0usize;

    while !router.queue.is_empty() {
        iterations += 1;

        if iterations % PROGRESS_INTERVAL == 0 {
            sink.emit(progress_line(
                iterations,
                &router,
                last_with_ripup,
                last_without_ripup,
            ));
            last_with_ripup = router.arcs_with_ripup;
            last_without_ripup = router.arcs_without_ripup;
            if cfg!(debug_assertions) {
                router.check()?;
            }
        }

        let Some(arc) = router.queue.pop() else {
            break;
        };

        if !router.route_arc(arc, true)? {
            let net = router.fabric.net_name(arc.net);
            sink.emit(Diagnostic::warning(
                DiagnosticCode::new(Category::Routing, 101),
                format!("failed to find a route for arc {} of net {net}", arc.user),
            ));
            return Err(RouteError::Unroutable {
                net,
                user: arc.user,
            });
        }
    }

    sink.emit(progress_line(
        iterations,
        &router,
        last_with_ripup,
        last_without_ripup,
    ));
    sink.emit(Diagnostic::note(
        DiagnosticCode::new(Category::Routing, 2),
        "routing complete",
    ));

    if cfg!(debug_assertions) {
        router.check()?;
    }

    let arcs_with_ripup = router.arcs_with_ripup;
    let arcs_without_ripup = router.arcs_without_ripup;
    drop(router);

    verify_routing(fabric)?;

    let checksum = fabric.checksum();
    sink.emit(Diagnostic::note(
        DiagnosticCode::new(Category::Routing, 3),
        format!("design checksum: {checksum:#018x}"),
    ));

    Ok(RouteSummary {
        iterations,
        arcs_with_ripup,
        arcs_without_ripup,
        checksum,
    })
}

fn progress_line(
    iterations: usize,
    router: &Router<'_>,
    last_with_ripup: usize,
    last_without_ripup: usize,
) -> Diagnostic {
    Diagnostic::note(
        DiagnosticCode::new(Category::Routing, 100),
        format!(
            "iteration {iterations}: {} arcs with rip-up, {} without (+{} +{}), {} remaining",
            router.arcs_with_ripup,
            router.arcs_without_ripup,
            router.arcs_with_ripup - last_with_ripup,
            router.arcs_without_ripup - last_without_ripup,
            router.queue.len()
        ),
    )
}

/// Extracts the as-built delay of the routed connection between two wires.
///
/// Not yet implemented: always returns `None`. The contract is stable: a
/// future implementation walks the owning net's stored pip map backward
/// from `dst` to `src`, summing wire and pip delays, and returns `None`
/// when no routed connection exists between the two wires.
pub fn actual_route_delay(_fabric: &dyn Fabric, _src: WireId, _dst: WireId) -> Option<Delay> {
    // TODO: walk the stored pip map from dst to src and sum the delays
    None
}
