//! Per-burst status values.

use rustdance_core::MonitorKind;
use std::fmt;

/// What happened to one event record of a burst.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum EventStatus {
    /// The burst produced no such record.
    #[default]
    Absent,
    /// Counted but not classified (physics distributions disabled).
    Counted,
    /// Classified into the physics distributions.
    Accepted,
    /// Rejected: no marker seen yet this run.
    NoMarker,
    /// Rejected: inside the dead time of the previous accepted event.
    Blocked,
}

impl EventStatus {
    /// Returns true if the record was classified.
    #[must_use]
    pub fn is_accepted(self) -> bool {
        self == EventStatus::Accepted
    }
}

/// Recoverable condition raised while processing a burst.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BurstWarning {
    /// A record arrived before the first marker of the run.
    NoMarker,
    /// Composite event rejected by the dead time.
    DeadTimeBlocked {
        /// Time since the previous accepted event (ns).
        gap: f64,
    },
    /// Accepted with a gap below the coincidence window.
    NarrowGap {
        /// Time since the previous accepted event (ns).
        gap: f64,
        /// Configured coincidence window (ns).
        window: f64,
    },
    /// Valid gamma hits dropped at the crystal multiplicity limit.
    CrystalOverflow {
        /// Number of hits dropped.
        dropped: usize,
    },
}

impl fmt::Display for BurstWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BurstWarning::NoMarker => write!(f, "no marker seen yet, event rejected"),
            BurstWarning::DeadTimeBlocked { gap } => {
                write!(f, "event {gap} ns after the last accepted event is inside the dead time")
            }
            BurstWarning::NarrowGap { gap, window } => {
                write!(f, "gap of {gap} ns is smaller than the {window} ns coincidence window")
            }
            BurstWarning::CrystalOverflow { dropped } => {
                write!(f, "{dropped} gamma hits dropped at the crystal multiplicity limit")
            }
        }
    }
}

/// Outcome of [`crate::Analyzer::process_burst`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BurstReport {
    /// Status of the composite event.
    pub composite: EventStatus,
    /// Status of every monitor readout in the burst.
    pub monitors: Vec<(MonitorKind, EventStatus)>,
    /// Warnings raised, in order.
    pub warnings: Vec<BurstWarning>,
    /// Crystal multiplicity of the composite event.
    pub crystal_mult: usize,
    /// Cluster multiplicity (0 unless the event was clustered).
    pub cluster_mult: usize,
    /// Isomer time differences recorded at markers in the burst.
    pub isomer_pairs: usize,
}

impl BurstReport {
    /// Logs and stores a warning. Repeated `NoMarker` warnings are kept once.
    pub(crate) fn warn(&mut self, warning: BurstWarning) {
        if warning == BurstWarning::NoMarker && self.warnings.contains(&warning) {
            return;
        }
        log::warn!("{warning}");
        self.warnings.push(warning);
    }

    /// Status of the monitor of `kind`, `Absent` if it did not fire.
    #[must_use]
    pub fn monitor(&self, kind: MonitorKind) -> EventStatus {
        self.monitors
            .iter()
            .find(|(k, _)| *k == kind)
            .map_or(EventStatus::Absent, |&(_, status)| status)
    }
}
