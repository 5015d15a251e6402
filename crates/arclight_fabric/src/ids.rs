//! Opaque ID newtypes for routing fabric entities.
//!
//! [`NetId`], [`WireId`], and [`PipId`] are thin `u32` wrappers identifying
//! entities owned by the fabric oracle. The router never dereferences them;
//! it only stores, compares, and hashes them. They are `Copy`, `Ord`,
//! `Hash`, and `Serialize`/`Deserialize`.

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Creates an ID from a raw `u32` index.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw `u32` index.
            pub fn as_raw(self) -> u32 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Opaque, copyable ID for a logical net (one driver, any number of users).
    NetId
);

define_id!(
    /// Opaque, copyable ID for a routing-graph node (a wire segment).
    WireId
);

define_id!(
    /// Opaque, copyable ID for a programmable switch (pip) between two wires.
    PipId
);
