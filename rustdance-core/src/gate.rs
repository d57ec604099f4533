//! Selection windows.
//!
//! Two bound conventions are in use and both are intentional:
//! multiplicity, energy-sum and isomer gates are half-open `[low, high)`,
//! while the neutron-energy windows of the angular analysis are open
//! `(low, high)`.

use serde::{Deserialize, Serialize};

/// A window on one observable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gate {
    /// Lower bound.
    pub low: f64,
    /// Upper bound.
    pub high: f64,
}

impl Gate {
    /// Creates a new gate.
    #[must_use]
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// Half-open membership: `low <= value < high`.
    #[inline]
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.low && value < self.high
    }

    /// Open membership: `low < value < high`.
    #[inline]
    #[must_use]
    pub fn contains_exclusive(&self, value: f64) -> bool {
        value > self.low && value < self.high
    }

    /// Width of the window.
    #[inline]
    #[must_use]
    pub fn width(&self) -> f64 {
        self.high - self.low
    }

    /// Returns true if the bounds are finite and ordered.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.low.is_finite() && self.high.is_finite() && self.low <= self.high
    }
}

impl std::fmt::Display for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.low, self.high)
    }
}
