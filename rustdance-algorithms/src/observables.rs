//! Observable derivation and classification.
//!
//! Neutron energies are derived from raw and corrected TOF, then an
//! accepted event is fanned out into its unconditional, pileup-split,
//! Q-gated and single-crystal distributions. Q-gates are half-open.
#![allow(clippy::cast_precision_loss)]

use crate::spectra::{self, MonitorSpectra};
use rustdance_core::{
    neutron_energy, AnalysisConfig, CompositeEvent, DistributionSink, MonitorEvent, MonitorKind,
};

/// Classifies accepted composite and monitor events.
#[derive(Debug, Clone, Copy)]
pub struct Classifier<'a> {
    config: &'a AnalysisConfig,
}

impl<'a> Classifier<'a> {
    /// Creates a classifier over `config`.
    #[must_use]
    pub fn new(config: &'a AnalysisConfig) -> Self {
        Self { config }
    }

    /// Fills raw and corrected neutron energy for every crystal hit.
    pub fn derive_energies(&self, event: &mut CompositeEvent) {
        let path = self.config.flight_paths.crystal_array;
        for (en, &tof) in event.en.iter_mut().zip(&event.tof) {
            *en = neutron_energy(path, tof);
        }
        for (en, &tof) in event.en_corr.iter_mut().zip(&event.tof_corr) {
            *en = neutron_energy(path, tof);
        }
    }

    /// Per-crystal TOF and energy spectra.
    pub fn record_crystals<S: DistributionSink + ?Sized>(&self, event: &CompositeEvent, sink: &mut S) {
        for i in 0..event.crystal_mult() {
            let id = event.crystal_id[i].as_f64();
            sink.record(spectra::CRYSTAL_EN_CORR, &[event.en_corr[i]]);
            sink.record(spectra::CRYSTAL_ECR_EN_CORR, &[event.en_corr[i], event.energy[i]]);
            sink.record(spectra::CRYSTAL_ID_TOF, &[event.tof[i], id]);
            sink.record(spectra::CRYSTAL_TOF, &[event.tof[i]]);
            sink.record(spectra::CRYSTAL_ID_TOF_CORR, &[event.tof_corr[i], id]);
            sink.record(spectra::CRYSTAL_TOF_CORR, &[event.tof_corr[i]]);
        }
    }

    /// Event-level distributions of a clustered, accepted composite event.
    ///
    /// `tof_span` is the TOF extent of the burst the event came from.
    pub fn record_event<S: DistributionSink + ?Sized>(
        &self,
        event: &CompositeEvent,
        tof_span: f64,
        sink: &mut S,
    ) {
        if event.is_empty() {
            return;
        }
        let mcr = event.crystal_mult() as f64;
        let mcl = event.cluster_mult as f64;
        let esum = event.esum;
        let (tof, tof_corr) = (event.tof[0], event.tof_corr[0]);
        let (en, en_corr) = (event.en[0], event.en_corr[0]);

        sink.record(spectra::EN, &[en]);
        sink.record(spectra::EN_CORR, &[en_corr]);
        sink.record(spectra::TOF, &[tof]);
        sink.record(spectra::TOF_CORR, &[tof_corr]);

        sink.record(spectra::MCL_TOF, &[tof, mcl]);
        sink.record(spectra::MCL_TOF_CORR, &[tof_corr, mcl]);
        sink.record(spectra::EN_ESUM_MCL, &[en_corr, esum, mcl]);
        sink.record(spectra::EN_ESUM_MCR, &[en_corr, esum, mcr]);

        let pileup_split = if event.pileup {
            spectra::EN_ESUM_MCR_PILEUP
        } else {
            spectra::EN_ESUM_MCR_NO_PILEUP
        };
        sink.record(pileup_split, &[en_corr, esum, mcr]);

        sink.record(spectra::TOF_ESUM_MCL, &[tof_corr, esum, mcl]);
        sink.record(spectra::TOF_ESUM_MCR, &[tof_corr, esum, mcr]);

        sink.record(spectra::ESUM, &[esum]);
        if (2..=5).contains(&event.cluster_mult) {
            sink.record(&spectra::esum_mcl(event.cluster_mult), &[esum]);
        }

        self.record_q_gated(event, sink);
        self.record_low_multiplicity(event, sink);

        sink.record(spectra::EVENT_TIME_GAP_ESUM, &[event.largest_time_gap(), esum]);
        sink.record(spectra::BURST_TOF_SPAN_ESUM, &[tof_span, esum]);
    }

    fn record_q_gated<S: DistributionSink + ?Sized>(&self, event: &CompositeEvent, sink: &mut S) {
        let mcr = event.crystal_mult() as f64;
        let mcl = event.cluster_mult as f64;
        let (tof_corr, en_corr) = (event.tof_corr[0], event.en_corr[0]);

        for (index, gate) in self.config.q_gates.iter().enumerate() {
            if !gate.contains(event.esum) {
                continue;
            }
            let en_ecl = spectra::en_ecl_mcl_q(index);
            let mcl_tof = spectra::mcl_tof_q(index);
            for &ecl in &event.cluster_energy {
                sink.record(&en_ecl, &[en_corr, ecl, mcl]);
                sink.record(&mcl_tof, &[tof_corr, mcl]);
            }

            let en_ecr = spectra::en_ecr_mcr_q(index);
            let id_ecr = spectra::id_ecr_mcr_q(index);
            for (&id, &ecr) in event.crystal_id.iter().zip(&event.energy) {
                sink.record(&en_ecr, &[en_corr, ecr, mcr]);
                sink.record(&id_ecr, &[id.as_f64(), ecr, mcr]);
            }
        }
    }

    fn record_low_multiplicity<S: DistributionSink + ?Sized>(&self, event: &CompositeEvent, sink: &mut S) {
        let late = event.tof_corr[0] > self.config.late_tof_ns;
        match event.crystal_mult() {
            1 => {
                let id = event.crystal_id[0].as_f64();
                sink.record(spectra::ISLOW_ID_MCR1, &[event.islow[0], id]);
                sink.record(spectra::ECR_ID_MCR1, &[event.energy[0], id]);
                if late {
                    sink.record(spectra::ECR_ID_MCR1_LATE, &[event.energy[0], id]);
                }
            }
            2 if late => {
                for (&id, &ecr) in event.crystal_id.iter().zip(&event.energy) {
                    sink.record(spectra::ECR_ID_MCR2_LATE, &[ecr, id.as_f64()]);
                }
            }
            _ => {}
        }
    }

    /// Spectra and derived energies of a monitor readout taken after a marker.
    pub fn record_monitor<S: DistributionSink + ?Sized>(&self, monitor: &mut MonitorEvent, sink: &mut S) {
        let names = MonitorSpectra::of(monitor.kind);

        sink.record(&names.pulse_height, &[monitor.islow]);
        sink.record(&names.tof, &[monitor.tof]);
        sink.record(&names.tof_corr, &[monitor.tof_corr]);

        match monitor.kind {
            MonitorKind::FissionChamber => {
                sink.record(spectra::FISSION_CHAMBER_ISLOW_TOF, &[monitor.tof, monitor.islow]);
            }
            MonitorKind::Li6 => {
                sink.record(spectra::LI6_ISLOW_IFAST, &[monitor.islow, monitor.ifast]);
            }
            MonitorKind::He3 | MonitorKind::Background => {}
        }

        if let Some(gate) = self.config.monitor_gates.for_kind(monitor.kind) {
            if gate.contains_exclusive(monitor.islow) {
                sink.record(&names.tof_gated, &[monitor.tof]);
                sink.record(&names.tof_long_gated, &[monitor.tof]);
            }
        }

        let path = self.config.flight_paths.monitor(monitor.kind);
        monitor.en = neutron_energy(path, monitor.tof);
        monitor.en_corr = neutron_energy(path, monitor.tof_corr);
        sink.record(&names.en, &[monitor.en]);
        sink.record(&names.en_corr, &[monitor.en_corr]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rustdance_core::{Gate, RawHit, TupleLog};

    fn clustered(hits: &[(u16, f64)], tof: f64) -> CompositeEvent {
        let mut event = CompositeEvent::default();
        for &(ch, e) in hits {
            event.push(&RawHit::gamma(ch, 0.0, e).with_tof(tof, tof));
        }
        event.cluster_mult = hits.len();
        event.cluster_id = (1..=hits.len()).collect();
        event.cluster_energy = event.energy.clone();
        event
    }

    #[test]
    fn test_derive_energies_uses_array_path() {
        let config = AnalysisConfig::default();
        let classifier = Classifier::new(&config);
        let mut event = clustered(&[(1, 1.0)], 1000.0);
        classifier.derive_energies(&mut event);
        assert_relative_eq!(event.en[0], neutron_energy(20.25, 1000.0));
        assert_relative_eq!(event.en_corr[0], event.en[0]);
    }

    #[test]
    fn test_q_gate_half_open() {
        let config = AnalysisConfig {
            q_gates: vec![Gate::new(3.0, 5.0)],
            ..AnalysisConfig::default()
        };
        let classifier = Classifier::new(&config);

        let mut log = TupleLog::new();
        classifier.record_event(&clustered(&[(1, 1.0), (2, 2.0)], 1000.0), 0.0, &mut log);
        assert_eq!(log.count("en_ecr_mcr_q0"), 2);
        assert_eq!(log.count("en_ecl_mcl_q0"), 2);
        assert_eq!(log.count("mcl_tof_q0"), 2);

        log.clear();
        classifier.record_event(&clustered(&[(1, 2.0), (2, 3.0)], 1000.0), 0.0, &mut log);
        assert_eq!(log.count("en_ecr_mcr_q0"), 0);
    }

    #[test]
    fn test_pileup_partition() {
        let config = AnalysisConfig::default();
        let classifier = Classifier::new(&config);
        let mut log = TupleLog::new();
        let mut event = clustered(&[(1, 1.0)], 1000.0);
        classifier.record_event(&event, 0.0, &mut log);
        event.pileup = true;
        classifier.record_event(&event, 0.0, &mut log);
        assert_eq!(log.count(spectra::EN_ESUM_MCR_NO_PILEUP), 1);
        assert_eq!(log.count(spectra::EN_ESUM_MCR_PILEUP), 1);
        assert_eq!(log.count(spectra::ECR_ID_MCR1), 2);
    }

    #[test]
    fn test_late_tof_spectra() {
        let config = AnalysisConfig::default();
        let classifier = Classifier::new(&config);
        let mut log = TupleLog::new();
        classifier.record_event(&clustered(&[(1, 1.0)], 15.0e6), 0.0, &mut log);
        classifier.record_event(&clustered(&[(1, 1.0), (9, 2.0)], 15.0e6), 0.0, &mut log);
        classifier.record_event(&clustered(&[(1, 1.0)], 1.0e6), 0.0, &mut log);
        assert_eq!(log.count(spectra::ECR_ID_MCR1_LATE), 1);
        assert_eq!(log.count(spectra::ECR_ID_MCR2_LATE), 2);
        assert_eq!(log.count(&spectra::esum_mcl(2)), 1);
    }

    #[test]
    fn test_monitor_gate_and_energy() {
        let config = AnalysisConfig::default();
        let classifier = Classifier::new(&config);
        let mut log = TupleLog::new();
        let hit = RawHit::readout(203, 0.0).with_tof(1.0e5, 1.0e5).with_integrals(20_000.0, 5_000.0);
        let mut monitor = MonitorEvent::from_hit(MonitorKind::Li6, &hit);
        classifier.record_monitor(&mut monitor, &mut log);
        assert_eq!(log.count("li6_tof_gated"), 1);
        assert_eq!(log.count(spectra::LI6_ISLOW_IFAST), 1);
        assert_relative_eq!(monitor.en, neutron_energy(22.75, 1.0e5));
    }
}
