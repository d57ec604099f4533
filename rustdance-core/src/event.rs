//! Composite and monitor event records.
//!
//! `CompositeEvent` stores its per-hit data in parallel vectors
//! (structure of arrays) so that clustering and classification can walk one
//! observable at a time.

use crate::hit::{ChannelId, RawHit, NUM_CRYSTALS};
use serde::{Deserialize, Serialize};

/// All valid gamma hits of one burst.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompositeEvent {
    /// Crystal id per hit.
    pub crystal_id: Vec<ChannelId>,
    /// Cluster label per hit (1-based once clustered).
    pub cluster_id: Vec<usize>,
    /// Slow integral per hit.
    pub islow: Vec<f64>,
    /// Fast integral per hit.
    pub ifast: Vec<f64>,
    /// Timestamp per hit (ns).
    pub timestamp: Vec<f64>,
    /// Raw TOF per hit (ns).
    pub tof: Vec<f64>,
    /// Corrected TOF per hit (ns).
    pub tof_corr: Vec<f64>,
    /// Calibrated crystal energy per hit (MeV).
    pub energy: Vec<f64>,
    /// Neutron energy from raw TOF per hit (eV).
    pub en: Vec<f64>,
    /// Neutron energy from corrected TOF per hit (eV).
    pub en_corr: Vec<f64>,
    /// Summed energy per cluster, indexed by `label - 1`.
    pub cluster_energy: Vec<f64>,
    /// Summed crystal energy.
    pub esum: f64,
    /// Number of clusters.
    pub cluster_mult: usize,
    /// Any constituent hit flagged pileup.
    pub pileup: bool,
    /// Event validity.
    pub valid: bool,
}

impl CompositeEvent {
    /// Creates an empty event with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            crystal_id: Vec::with_capacity(capacity),
            cluster_id: Vec::with_capacity(capacity),
            islow: Vec::with_capacity(capacity),
            ifast: Vec::with_capacity(capacity),
            timestamp: Vec::with_capacity(capacity),
            tof: Vec::with_capacity(capacity),
            tof_corr: Vec::with_capacity(capacity),
            energy: Vec::with_capacity(capacity),
            en: Vec::with_capacity(capacity),
            en_corr: Vec::with_capacity(capacity),
            cluster_energy: Vec::with_capacity(capacity),
            esum: 0.0,
            cluster_mult: 0,
            pileup: false,
            valid: false,
        }
    }

    /// Crystal multiplicity (Mcr).
    #[inline]
    #[must_use]
    pub fn crystal_mult(&self) -> usize {
        self.crystal_id.len()
    }

    /// Returns true if no hit has been added.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.crystal_id.is_empty()
    }

    /// Resets the event to the empty, invalid state.
    pub fn clear(&mut self) {
        self.crystal_id.clear();
        self.cluster_id.clear();
        self.islow.clear();
        self.ifast.clear();
        self.timestamp.clear();
        self.tof.clear();
        self.tof_corr.clear();
        self.energy.clear();
        self.en.clear();
        self.en_corr.clear();
        self.cluster_energy.clear();
        self.esum = 0.0;
        self.cluster_mult = 0;
        self.pileup = false;
        self.valid = false;
    }

    /// Appends a gamma hit. Each hit starts in its own provisional cluster.
    ///
    /// Returns `false` without modifying the event when the crystal
    /// multiplicity is already at its maximum.
    pub fn push(&mut self, hit: &RawHit) -> bool {
        if self.crystal_mult() >= NUM_CRYSTALS {
            return false;
        }
        let label = self.crystal_mult() + 1;
        self.crystal_id.push(hit.channel);
        self.cluster_id.push(label);
        self.islow.push(hit.islow);
        self.ifast.push(hit.ifast);
        self.timestamp.push(hit.timestamp);
        self.tof.push(hit.tof);
        self.tof_corr.push(hit.tof_corr);
        self.energy.push(hit.energy);
        self.en.push(0.0);
        self.en_corr.push(0.0);
        self.esum += hit.energy;
        self.pileup |= hit.pileup;
        self.valid = true;
        true
    }

    /// Timestamp of the first hit, which stands for the whole event.
    #[must_use]
    pub fn lead_timestamp(&self) -> Option<f64> {
        self.timestamp.first().copied()
    }

    /// Largest gap between consecutive hit timestamps (0 for Mcr < 2).
    #[must_use]
    pub fn largest_time_gap(&self) -> f64 {
        self.timestamp
            .windows(2)
            .map(|pair| pair[1] - pair[0])
            .fold(0.0, f64::max)
    }

    /// Number of crystals in each cluster, indexed by `label - 1`.
    #[must_use]
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0usize; self.cluster_mult];
        for &label in &self.cluster_id {
            if let Some(size) = label.checked_sub(1).and_then(|i| sizes.get_mut(i)) {
                *size += 1;
            }
        }
        sizes
    }
}

/// Beam-monitor channel classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorKind {
    /// U-235 fission chamber.
    FissionChamber,
    /// He-3 proportional counter.
    He3,
    /// Li-6 glass scintillator.
    Li6,
    /// Background monitor.
    Background,
}

impl MonitorKind {
    /// All monitor kinds in a fixed order.
    pub const ALL: [MonitorKind; 4] = [
        MonitorKind::FissionChamber,
        MonitorKind::He3,
        MonitorKind::Li6,
        MonitorKind::Background,
    ];

    /// Position of this kind in [`MonitorKind::ALL`].
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            MonitorKind::FissionChamber => 0,
            MonitorKind::He3 => 1,
            MonitorKind::Li6 => 2,
            MonitorKind::Background => 3,
        }
    }

    /// Short label used in distribution names.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            MonitorKind::FissionChamber => "u235",
            MonitorKind::He3 => "he3",
            MonitorKind::Li6 => "li6",
            MonitorKind::Background => "bkg",
        }
    }
}

/// A single beam-monitor readout within one burst.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorEvent {
    /// Which monitor produced the readout.
    pub kind: MonitorKind,
    /// Raw TOF (ns).
    pub tof: f64,
    /// Corrected TOF (ns).
    pub tof_corr: f64,
    /// Fast integral.
    pub ifast: f64,
    /// Slow integral.
    pub islow: f64,
    /// Neutron energy from raw TOF (eV).
    pub en: f64,
    /// Neutron energy from corrected TOF (eV).
    pub en_corr: f64,
    /// Event validity.
    pub valid: bool,
}

impl MonitorEvent {
    /// Builds a valid monitor event from a readout.
    #[must_use]
    pub fn from_hit(kind: MonitorKind, hit: &RawHit) -> Self {
        Self {
            kind,
            tof: hit.tof,
            tof_corr: hit.tof_corr,
            ifast: hit.ifast,
            islow: hit.islow,
            en: 0.0,
            en_corr: 0.0,
            valid: true,
        }
    }
}

/// Running totals maintained across bursts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounters {
    /// Hits walked.
    pub entries_analyzed: u64,
    /// Events handled (markers, composite events, monitor events).
    pub events_analyzed: u64,
    /// Valid gamma hits added to composite events.
    pub dance_entries_analyzed: u64,
    /// Composite events handled.
    pub dance_events_analyzed: u64,
    /// Marker hits.
    pub t0_entries_analyzed: u64,
    /// Marker events.
    pub t0_events_analyzed: u64,
    /// Monitor hits, indexed by [`MonitorKind::index`].
    pub monitor_entries_analyzed: [u64; 4],
    /// Monitor events, indexed by [`MonitorKind::index`].
    pub monitor_events_analyzed: [u64; 4],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composite_push_and_clear() {
        let mut event = CompositeEvent::with_capacity(4);
        assert!(event.is_empty());
        assert!(!event.valid);

        event.push(&RawHit::gamma(5, 100.0, 1.0));
        event.push(&RawHit::gamma(6, 102.0, 2.5).with_pileup(true));

        assert_eq!(event.crystal_mult(), 2);
        assert_eq!(event.cluster_id, vec![1, 2]);
        assert!((event.esum - 3.5).abs() < 1e-12);
        assert!(event.pileup);
        assert!(event.valid);
        assert_eq!(event.lead_timestamp(), Some(100.0));

        event.clear();
        assert!(event.is_empty());
        assert!(!event.valid);
        assert!(!event.pileup);
        assert_eq!(event.esum, 0.0);
    }

    #[test]
    fn test_largest_time_gap() {
        let mut event = CompositeEvent::default();
        assert_eq!(event.largest_time_gap(), 0.0);
        for (i, t) in [0.0, 3.0, 4.0, 10.0].into_iter().enumerate() {
            event.push(&RawHit::gamma(i as u16, t, 1.0));
        }
        assert!((event.largest_time_gap() - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_crystal_mult_capped() {
        let mut event = CompositeEvent::default();
        for i in 0..NUM_CRYSTALS {
            assert!(event.push(&RawHit::gamma(i as u16, 0.0, 0.1)));
        }
        assert!(!event.push(&RawHit::gamma(0, 0.0, 0.1)));
        assert_eq!(event.crystal_mult(), NUM_CRYSTALS);
    }

    #[test]
    fn test_monitor_kind_indices() {
        for (i, kind) in MonitorKind::ALL.into_iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }
}
