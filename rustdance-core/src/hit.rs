//! Raw detector hits and channel addressing.

use serde::{Deserialize, Serialize};

/// Number of crystal channels in the calorimeter array (ids `0..162`).
pub const NUM_CRYSTALS: usize = 162;

/// Number of addressable channel ids (crystals, markers and monitors).
pub const CHANNEL_SLOTS: usize = 256;

/// Identifier of a readout channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub u16);

impl ChannelId {
    /// Creates a new channel id.
    #[inline]
    #[must_use]
    pub fn new(id: u16) -> Self {
        Self(id)
    }

    /// Returns true if this channel belongs to the crystal array.
    #[inline]
    #[must_use]
    pub fn is_crystal(self) -> bool {
        usize::from(self.0) < NUM_CRYSTALS
    }

    /// Returns the id as an index into per-channel tables.
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    /// Returns the id as a floating-point distribution coordinate.
    #[inline]
    #[must_use]
    pub fn as_f64(self) -> f64 {
        f64::from(self.0)
    }
}

impl From<u16> for ChannelId {
    fn from(id: u16) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One detector readout as delivered by the unpacker.
///
/// Times are in nanoseconds. `tof` is measured from the most recent marker;
/// `tof_corr` additionally carries the per-crystal timing correction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawHit {
    /// Readout channel.
    pub channel: ChannelId,
    /// Absolute timestamp (ns).
    pub timestamp: f64,
    /// Slow (long) integrated pulse height.
    pub islow: f64,
    /// Fast (short) integrated pulse height.
    pub ifast: f64,
    /// Raw time of flight (ns).
    pub tof: f64,
    /// Corrected time of flight (ns).
    pub tof_corr: f64,
    /// Calibrated energy (MeV).
    pub energy: f64,
    /// Gamma/particle discriminator: true for gamma-like pulses.
    pub is_gamma: bool,
    /// Digitizer pileup flag.
    pub pileup: bool,
    /// Unpacker validity flag.
    pub valid: bool,
}

impl RawHit {
    /// Creates a valid gamma hit on `channel` at `timestamp` with calibrated `energy`.
    ///
    /// TOF fields default to the timestamp; use [`RawHit::with_tof`] to override.
    #[must_use]
    pub fn gamma(channel: u16, timestamp: f64, energy: f64) -> Self {
        Self {
            channel: ChannelId(channel),
            timestamp,
            islow: 0.0,
            ifast: 0.0,
            tof: timestamp,
            tof_corr: timestamp,
            energy,
            is_gamma: true,
            pileup: false,
            valid: true,
        }
    }

    /// Creates a non-gamma hit (marker or monitor readout).
    #[must_use]
    pub fn readout(channel: u16, timestamp: f64) -> Self {
        Self {
            is_gamma: false,
            energy: 0.0,
            ..Self::gamma(channel, timestamp, 0.0)
        }
    }

    /// Sets raw and corrected TOF.
    #[must_use]
    pub fn with_tof(mut self, tof: f64, tof_corr: f64) -> Self {
        self.tof = tof;
        self.tof_corr = tof_corr;
        self
    }

    /// Sets slow and fast integrals.
    #[must_use]
    pub fn with_integrals(mut self, islow: f64, ifast: f64) -> Self {
        self.islow = islow;
        self.ifast = ifast;
        self
    }

    /// Sets the pileup flag.
    #[must_use]
    pub fn with_pileup(mut self, pileup: bool) -> Self {
        self.pileup = pileup;
        self
    }

    /// Sets the validity flag.
    #[must_use]
    pub fn with_valid(mut self, valid: bool) -> Self {
        self.valid = valid;
        self
    }

    /// Returns true if this hit contributes to a composite event.
    #[inline]
    #[must_use]
    pub fn is_valid_gamma(&self) -> bool {
        self.channel.is_crystal() && self.is_gamma && self.valid
    }
}
