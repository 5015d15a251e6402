//! Router configuration and the congestion cost model.

use arclight_fabric::{Delay, Fabric};
use serde::{Deserialize, Serialize};

/// Configuration for one routing invocation.
///
/// The penalty and bonus constants are derived from the fabric's base
/// rip-up penalty by [`from_fabric`](Self::from_fabric); all fields are
/// public and may be overridden afterward for experiments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Upper-bound hint on outer iterations for surrounding schedulers.
    /// The core loop itself drains the queue to completion.
    pub max_iter_count: usize,
    /// Whether surrounding schedulers should reset adopted partial routes
    /// before rerouting. The core always detaches an arc before searching.
    pub cleanup_reroute: bool,
    /// Aggressive variant of [`cleanup_reroute`](Self::cleanup_reroute).
    pub full_cleanup_reroute: bool,
    /// Enables the delay-estimate heuristic; without it the search
    /// degenerates to uniform-cost.
    pub use_estimate: bool,
    /// Penalty per conflicting wire, scaled by `1 + wire score`.
    pub wire_ripup_penalty: Delay,
    /// Penalty per conflicting net, scaled by `1 + net score`.
    pub net_ripup_penalty: Delay,
    /// Bonus for stepping onto a wire this net already owns.
    pub wire_reuse_bonus: Delay,
    /// Bonus for additionally reusing the stored driving pip.
    pub pip_reuse_bonus: Delay,
    /// Slack allowed when pruning against the best estimate or the best
    /// found goal score; absorbs heuristic inaccuracy.
    pub estimate_precision: Delay,
}

impl RouterConfig {
    /// Builds a configuration with defaults derived from the fabric's base
    /// rip-up penalty.
    pub fn from_fabric(fabric: &dyn Fabric) -> Self {
        let base = fabric.ripup_delay_penalty();
        Self {
            max_iter_count: 200,
            cleanup_reroute: true,
            full_cleanup_reroute: true,
            use_estimate: true,
            wire_ripup_penalty: base,
            net_ripup_penalty: base * 10,
            wire_reuse_bonus: base / 8,
            pip_reuse_bonus: base / 2,
            estimate_precision: base * 100,
        }
    }
}
