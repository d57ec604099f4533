//! Burst-sequential reduction pipeline.
//!
//! [`Analyzer`] owns the calibration tables, the geometry and every piece of
//! state that must see bursts in order (per-channel timestamps, dead-time
//! clock, isomer buffers, removal sampler). One analyzer serves one run;
//! parallel reductions shard runs across analyzers and merge their sinks.

use crate::angular::AngularCorrelator;
use crate::assembler::{Admission, EventAssembler};
use crate::clustering::{AdjacencyClustering, ClusterState};
use crate::isomer::IsomerTracker;
use crate::observables::Classifier;
use crate::removal::RemovalSampler;
use crate::report::{BurstReport, BurstWarning, EventStatus};
use crate::spectra;
use rustdance_core::{
    AdjacencyTable, AnalysisConfig, CompositeEvent, DetectorGeometry, DistributionSink, Error,
    MonitorKind, RawHit, Result, RunCounters, TimingPairTable, NUM_CRYSTALS,
};

/// Pipeline context for one run.
#[derive(Debug)]
pub struct Analyzer {
    config: AnalysisConfig,
    adjacency: AdjacencyTable,
    timing: TimingPairTable,
    geometry: DetectorGeometry,
    assembler: EventAssembler,
    isomers: IsomerTracker,
    removal: Option<RemovalSampler>,
    cluster_state: ClusterState,
    event: CompositeEvent,
}

impl Analyzer {
    /// Builds the pipeline.
    ///
    /// # Errors
    /// Returns [`Error::EmptyTimingTable`] if `timing` has no pairs and
    /// [`Error::Config`] if the configuration does not validate.
    pub fn new(config: AnalysisConfig, adjacency: AdjacencyTable, timing: TimingPairTable) -> Result<Self> {
        config.validate()?;
        if timing.is_empty() {
            return Err(Error::EmptyTimingTable);
        }
        log::info!(
            "analyzer ready: {} adjacency rows, {} timing pairs, stage {}{}",
            adjacency.len(),
            timing.len(),
            config.analysis_stage,
            if config.read_simulation { " (simulation)" } else { "" }
        );
        if !config.physics_enabled() {
            log::info!("physics distributions disabled, recording diagnostics only");
        }

        Ok(Self {
            assembler: EventAssembler::new(config.channels),
            isomers: IsomerTracker::new(config.isomers.clone()),
            removal: config.removed_spectra.as_ref().map(RemovalSampler::new),
            geometry: DetectorGeometry::dance(),
            cluster_state: ClusterState::with_capacity(NUM_CRYSTALS),
            event: CompositeEvent::with_capacity(32),
            config,
            adjacency,
            timing,
        })
    }

    /// Replaces the built-in crystal geometry.
    #[must_use]
    pub fn with_geometry(mut self, geometry: DetectorGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    /// Declares every distribution this pipeline records into.
    pub fn declare<S: DistributionSink + ?Sized>(&self, sink: &mut S) {
        spectra::declare_all(sink, &self.config);
    }

    /// Analysis configuration.
    #[must_use]
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Timing-pair table.
    #[must_use]
    pub fn timing(&self) -> &TimingPairTable {
        &self.timing
    }

    /// Composite event of the most recent burst.
    #[must_use]
    pub fn event(&self) -> &CompositeEvent {
        &self.event
    }

    /// Burst walker state.
    #[must_use]
    pub fn assembler(&self) -> &EventAssembler {
        &self.assembler
    }

    /// Reduces one time-ordered burst into `sink`.
    pub fn process_burst<S: DistributionSink + ?Sized>(
        &mut self,
        burst: &[RawHit],
        counters: &mut RunCounters,
        sink: &mut S,
    ) -> BurstReport {
        let assembled = self.assembler.assemble(
            burst,
            &self.timing,
            &mut self.event,
            &mut self.isomers,
            counters,
            sink,
        );

        let mut report = BurstReport {
            crystal_mult: self.event.crystal_mult(),
            isomer_pairs: assembled.isomer_pairs,
            ..BurstReport::default()
        };
        if assembled.dropped_hits > 0 {
            report.warn(BurstWarning::CrystalOverflow {
                dropped: assembled.dropped_hits,
            });
        }

        if self.event.valid {
            counters.events_analyzed += 1;
            counters.dance_events_analyzed += 1;
            report.composite = self.process_composite(assembled.tof_span, &mut report, sink);
            report.cluster_mult = self.event.cluster_mult;
        }

        let classifier = Classifier::new(&self.config);
        for kind in MonitorKind::ALL {
            let Some(mut monitor) = assembled.monitors[kind.index()] else {
                continue;
            };
            counters.events_analyzed += 1;
            counters.monitor_events_analyzed[kind.index()] += 1;

            let status = if self.assembler.marker_seen() {
                classifier.record_monitor(&mut monitor, sink);
                EventStatus::Accepted
            } else {
                report.warn(BurstWarning::NoMarker);
                EventStatus::NoMarker
            };
            report.monitors.push((kind, status));
        }

        report
    }

    fn process_composite<S: DistributionSink + ?Sized>(
        &mut self,
        tof_span: f64,
        report: &mut BurstReport,
        sink: &mut S,
    ) -> EventStatus {
        if !self.config.physics_enabled() {
            return EventStatus::Counted;
        }
        let Some(lead) = self.event.lead_timestamp() else {
            return EventStatus::Absent;
        };

        match self.assembler.admit(lead, self.config.blocking_time_ns, sink) {
            Admission::NoMarker => {
                self.event.valid = false;
                report.warn(BurstWarning::NoMarker);
                return EventStatus::NoMarker;
            }
            Admission::Blocked { gap } => {
                self.event.valid = false;
                report.warn(BurstWarning::DeadTimeBlocked { gap });
                return EventStatus::Blocked;
            }
            Admission::Accepted { gap } => {
                let window = self.config.coincidence_window_ns;
                if let Some(gap) = gap.filter(|&g| g < window) {
                    report.warn(BurstWarning::NarrowGap { gap, window });
                }
            }
        }

        let classifier = Classifier::new(&self.config);
        classifier.derive_energies(&mut self.event);
        classifier.record_crystals(&self.event, sink);

        let clusters = AdjacencyClustering::new(&self.adjacency).cluster(&mut self.event, &mut self.cluster_state);
        log::trace!("event at {lead} ns: Mcr {} Mcl {clusters}", self.event.crystal_mult());

        classifier.record_event(&self.event, tof_span, sink);
        self.isomers.observe(
            self.event.tof_corr[0],
            self.event.cluster_mult,
            self.event.esum,
            sink,
        );

        AngularCorrelator::new(&self.geometry, &self.config.angular, self.config.channels.beam_dump)
            .record(&self.event, sink);

        if let Some(removal) = self.removal.as_mut() {
            removal.record(&self.event, sink);
        }

        EventStatus::Accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustdance_core::{HistogramSet, TupleLog};

    fn analyzer(config: AnalysisConfig) -> Analyzer {
        let adjacency = AdjacencyTable::from_neighbors(&[&[], &[2], &[1, 3], &[2]]).unwrap();
        let timing = TimingPairTable::from_pairs(vec![(0, 1), (1, 2)]).unwrap();
        Analyzer::new(config, adjacency, timing).unwrap()
    }

    #[test]
    fn test_empty_timing_table_is_fatal() {
        let adjacency = AdjacencyTable::from_neighbors(&[]).unwrap();
        let timing = TimingPairTable::from_pairs(Vec::new()).unwrap();
        let err = Analyzer::new(AnalysisConfig::default(), adjacency, timing).unwrap_err();
        assert!(matches!(err, Error::EmptyTimingTable));
    }

    #[test]
    fn test_event_before_marker_rejected() {
        let mut analyzer = analyzer(AnalysisConfig::default());
        let mut counters = RunCounters::default();
        let mut log = TupleLog::new();
        let report = analyzer.process_burst(&[RawHit::gamma(1, 10.0, 1.0)], &mut counters, &mut log);
        assert_eq!(report.composite, EventStatus::NoMarker);
        assert_eq!(report.warnings, vec![BurstWarning::NoMarker]);
        assert!(!analyzer.event().valid);
        assert_eq!(counters.dance_events_analyzed, 1);
    }

    #[test]
    fn test_accepted_event_is_clustered() {
        let mut analyzer = analyzer(AnalysisConfig::default());
        let mut counters = RunCounters::default();
        let mut sink = HistogramSet::new();
        analyzer.declare(&mut sink);

        analyzer.process_burst(&[RawHit::readout(200, 0.0)], &mut counters, &mut sink);
        let burst = [
            RawHit::gamma(1, 100.0, 1.0).with_tof(100.0, 100.0),
            RawHit::gamma(2, 101.0, 2.0).with_tof(101.0, 101.0),
            RawHit::gamma(3, 102.0, 3.0).with_tof(102.0, 102.0),
        ];
        let report = analyzer.process_burst(&burst, &mut counters, &mut sink);

        assert!(report.composite.is_accepted());
        assert_eq!(report.crystal_mult, 3);
        assert_eq!(report.cluster_mult, 1);
        assert!((analyzer.event().cluster_energy[0] - 6.0).abs() < 1e-12);
        assert_eq!(sink.get(spectra::ESUM).map(|h| h.entries()), Some(1));
        assert_eq!(sink.undeclared_records(), 0);
    }

    #[test]
    fn test_diagnostics_only_stage() {
        let config = AnalysisConfig {
            analysis_stage: 0,
            ..AnalysisConfig::default()
        };
        let mut analyzer = analyzer(config);
        let mut counters = RunCounters::default();
        let mut log = TupleLog::new();
        analyzer.process_burst(&[RawHit::readout(200, 0.0)], &mut counters, &mut log);
        let report = analyzer.process_burst(&[RawHit::gamma(1, 10.0, 1.0)], &mut counters, &mut log);
        assert_eq!(report.composite, EventStatus::Counted);
        assert_eq!(log.count(spectra::ESUM), 0);
    }

    #[test]
    fn test_monitor_needs_marker() {
        let mut analyzer = analyzer(AnalysisConfig::default());
        let mut counters = RunCounters::default();
        let mut log = TupleLog::new();
        let report = analyzer.process_burst(&[RawHit::readout(201, 5.0)], &mut counters, &mut log);
        assert_eq!(report.monitor(MonitorKind::FissionChamber), EventStatus::NoMarker);

        let report = analyzer.process_burst(
            &[RawHit::readout(200, 10.0), RawHit::readout(201, 15.0)],
            &mut counters,
            &mut log,
        );
        assert!(report.monitor(MonitorKind::FissionChamber).is_accepted());
        assert_eq!(counters.monitor_events_analyzed[MonitorKind::FissionChamber.index()], 2);
    }
}
