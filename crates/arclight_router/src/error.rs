//! Router error types.

use thiserror::Error;

/// A fatal condition during a routing invocation.
///
/// Setup errors abort before any mutation. An unroutable arc aborts the
/// outer loop; bindings made so far remain in the fabric and it is the
/// caller's choice to discard or retry. Invariant and validation errors
/// indicate router bugs or inconsistent adopted state.
#[derive(Debug, Error)]
pub enum RouteError {
    /// A net's driver pin resolved to no routing wire.
    #[error("no source wire found for net {net}")]
    MissingSourceWire {
        /// The offending net.
        net: String,
    },

    /// A user's pin resolved to no routing wire.
    #[error("no sink wire found for user {user} of net {net}")]
    MissingSinkWire {
        /// The offending net.
        net: String,
        /// The user index within the net.
        user: usize,
    },

    /// Two nets resolved to the same source wire.
    #[error("nets {first} and {second} share source wire {wire}")]
    SharedSourceWire {
        /// The shared wire.
        wire: String,
        /// The net seen first.
        first: String,
        /// The net seen second.
        second: String,
    },

    /// A wire is a source in one net and a sink in another.
    #[error("wire {wire} is used as both source and sink: {source_net} vs {sink_net} (user {user})")]
    SourceSinkOverlap {
        /// The overlapping wire.
        wire: String,
        /// The net using the wire as a source.
        source_net: String,
        /// The net using the wire as a sink.
        sink_net: String,
        /// The sink's user index.
        user: usize,
    },

    /// Two arcs of different nets resolved to the same sink wire.
    #[error("arcs {first} and {second} share sink wire {wire}")]
    SharedSinkWire {
        /// The shared wire.
        wire: String,
        /// The arc seen first, as `net (user)`.
        first: String,
        /// The arc seen second, as `net (user)`.
        second: String,
    },

    /// The search exhausted its frontier without reaching the sink, even
    /// with rip-up allowed.
    #[error("failed to find a route for arc {user} of net {net}")]
    Unroutable {
        /// The offending net.
        net: String,
        /// The user index within the net.
        user: usize,
    },

    /// An internal consistency assertion failed. This is a router bug, not
    /// a property of the design.
    #[error("routing invariant violated: {0}")]
    Invariant(String),

    /// The post-route validator rejected the design.
    #[error(transparent)]
    Validation(#[from] ValidateError),
}

impl RouteError {
    /// Creates an invariant-violation error.
    pub fn invariant(message: impl Into<String>) -> Self {
        RouteError::Invariant(message.into())
    }
}

/// A structural defect found by the post-route validator.
#[derive(Debug, Error)]
pub enum ValidateError {
    /// A net with no users holds bound wires.
    #[error("net {net} has no users but holds bound wires")]
    SinklessNetHasWires {
        /// The offending net.
        net: String,
    },

    /// The net's source or one of its sinks is not bound.
    #[error("net {net} is not fully routed")]
    Unrouted {
        /// The offending net.
        net: String,
    },

    /// The net's bound switches form a cycle.
    #[error("net {net} routing contains a loop")]
    Loop {
        /// The offending net.
        net: String,
    },

    /// A leaf of the net's routing tree is not a sink.
    #[error("net {net} has a stub at wire {wire}")]
    Stub {
        /// The offending net.
        net: String,
        /// The leaf wire that is not a sink.
        wire: String,
    },

    /// Wires are bound to the net but unreachable from its source.
    #[error("net {net} has dangling wires not reached from its source")]
    Dangling {
        /// The offending net.
        net: String,
    },

    /// A bound wire's stored driving pip does not actually drive it.
    #[error("net {net}: wire {wire} is driven by a pip with a different destination")]
    PipMismatch {
        /// The offending net.
        net: String,
        /// The inconsistently-bound wire.
        wire: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let err = RouteError::Unroutable {
            net: "lut4_q".to_string(),
            user: 2,
        };
        assert_eq!(format!("{err}"), "failed to find a route for arc 2 of net lut4_q");

        let err = RouteError::invariant("wire still occupied after rip-up");
        assert!(format!("{err}").contains("invariant"));
    }

    #[test]
    fn validation_error_wraps_transparently() {
        let err: RouteError = ValidateError::Loop {
            net: "clk_buf".to_string(),
        }
        .into();
        assert_eq!(format!("{err}"), "net clk_buf routing contains a loop");
    }

    #[test]
    fn setup_errors_name_participants() {
        let err = RouteError::SharedSourceWire {
            wire: "io_3".to_string(),
            first: "a".to_string(),
            second: "b".to_string(),
        };
        let text = format!("{err}");
        assert!(text.contains("io_3"));
        assert!(text.contains('a'));
        assert!(text.contains('b'));
    }
}
