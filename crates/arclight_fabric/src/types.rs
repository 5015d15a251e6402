//! Shared value types for the routing fabric: delays, binding strengths,
//! and per-wire binding records.
//!
//! Delays are integer quantities in fabric-defined units (typically
//! picoseconds). Integer delays keep search-frontier ordering total and
//! routing runs reproducible across platforms.

use crate::ids::PipId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

/// A signed delay value in fabric units.
///
/// Signed so that timing budgets (slack) and budget-relative priorities can
/// go negative. Supports the arithmetic the router needs: addition,
/// subtraction, scaling by an integer factor, and halving.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default, Serialize, Deserialize,
)]
pub struct Delay(i64);

impl Delay {
    /// The zero delay.
    pub const ZERO: Delay = Delay(0);

    /// Creates a delay from a raw value in fabric units.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the raw value in fabric units.
    pub fn value(self) -> i64 {
        self.0
    }
}

impl Add for Delay {
    type Output = Delay;
    fn add(self, rhs: Delay) -> Delay {
        Delay(self.0 + rhs.0)
    }
}

impl AddAssign for Delay {
    fn add_assign(&mut self, rhs: Delay) {
        self.0 += rhs.0;
    }
}

impl Sub for Delay {
    type Output = Delay;
    fn sub(self, rhs: Delay) -> Delay {
        Delay(self.0 - rhs.0)
    }
}

impl SubAssign for Delay {
    fn sub_assign(&mut self, rhs: Delay) {
        self.0 -= rhs.0;
    }
}

impl Neg for Delay {
    type Output = Delay;
    fn neg(self) -> Delay {
        Delay(-self.0)
    }
}

impl Mul<i64> for Delay {
    type Output = Delay;
    fn mul(self, rhs: i64) -> Delay {
        Delay(self.0 * rhs)
    }
}

impl Div<i64> for Delay {
    type Output = Delay;
    fn div(self, rhs: i64) -> Delay {
        Delay(self.0 / rhs)
    }
}

impl fmt::Display for Delay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A min/max delay pair for a wire or pip.
///
/// The router consumes the pessimistic bound ([`max`](Self::max)); the
/// minimum is carried for hold-time consumers outside the router.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct DelayRange {
    /// Best-case (minimum) delay.
    pub min: Delay,
    /// Worst-case (maximum) delay.
    pub max: Delay,
}

impl DelayRange {
    /// A zero-width range at zero delay.
    pub const ZERO: DelayRange = DelayRange {
        min: Delay::ZERO,
        max: Delay::ZERO,
    };

    /// Creates a delay range from raw min/max values in fabric units.
    pub fn new(min: i64, max: i64) -> Self {
        Self {
            min: Delay::new(min),
            max: Delay::new(max),
        }
    }

    /// Creates a zero-width range at the given delay.
    pub fn uniform(value: i64) -> Self {
        Self::new(value, value)
    }
}

/// The strength of a binding claim on a wire or pip.
///
/// Ordered from weakest to strongest. The router binds routed resources at
/// [`Weak`](Strength::Weak); setup's orphan cleanup only releases bindings
/// below [`Locked`](Strength::Locked).
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize,
)]
pub enum Strength {
    /// A claim the router itself placed; freely rippable.
    Weak,
    /// A claim placed by an upstream pass; rippable under negotiation.
    Strong,
    /// A claim fixed by a constraint; rippable only by whole-net eviction.
    Fixed,
    /// An immovable claim. Never released by the router.
    Locked,
}

/// A net's binding record for one wire: the switch that drives the wire and
/// the strength of the claim.
///
/// `pip` is `None` exactly when the wire is the net's source (nothing
/// upstream drives it).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct WireBinding {
    /// The switch driving this wire, or `None` for the net's source wire.
    pub pip: Option<PipId>,
    /// How firmly the net claims this wire.
    pub strength: Strength,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_arithmetic() {
        let a = Delay::new(100);
        let b = Delay::new(30);
        assert_eq!((a + b).value(), 130);
        assert_eq!((a - b).value(), 70);
        assert_eq!((-b).value(), -30);
        assert_eq!((b * 4).value(), 120);
        assert_eq!((a / 2).value(), 50);
    }

    #[test]
    fn delay_assign_ops() {
        let mut d = Delay::new(5);
        d += Delay::new(10);
        assert_eq!(d.value(), 15);
        d -= Delay::new(20);
        assert_eq!(d.value(), -5);
    }

    #[test]
    fn delay_ordering() {
        assert!(Delay::new(-1) < Delay::ZERO);
        assert!(Delay::new(100) > Delay::new(99));
    }

    #[test]
    fn delay_display() {
        assert_eq!(format!("{}", Delay::new(-42)), "-42");
    }

    #[test]
    fn range_constructors() {
        let r = DelayRange::new(10, 25);
        assert_eq!(r.min.value(), 10);
        assert_eq!(r.max.value(), 25);
        assert_eq!(DelayRange::uniform(7).min, DelayRange::uniform(7).max);
        assert_eq!(DelayRange::ZERO.max, Delay::ZERO);
    }

    #[test]
    fn strength_ordering() {
        assert!(Strength::Weak < Strength::Strong);
        assert!(Strength::Strong < Strength::Fixed);
        assert!(Strength::Fixed < Strength::Locked);
    }

    #[test]
    fn binding_source_has_no_pip() {
        let b = WireBinding {
            pip: None,
            strength: Strength::Weak,
        };
        assert!(b.pip.is_none());
    }

    #[test]
    fn serde_roundtrip() {
        let b = WireBinding {
            pip: Some(PipId::from_raw(3)),
            strength: Strength::Locked,
        };
        let json = serde_json::to_string(&b).unwrap();
        let restored: WireBinding = serde_json::from_str(&json).unwrap();
        assert_eq!(b, restored);
    }
}
