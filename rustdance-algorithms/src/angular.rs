//! Angular correlation classification.
//!
//! Opening angles come from [`DetectorGeometry::angle`]. Each composite
//! event is recorded in every neutron-energy window that contains its lead
//! corrected neutron energy; windows are matched with open bounds.

use crate::spectra::{self, MAX_ANGULAR_MULT};
use rustdance_core::{AngularConfig, ChannelId, CompositeEvent, DetectorGeometry, DistributionSink, Gate};

/// Records angular distributions for accepted composite events.
#[derive(Debug, Clone, Copy)]
pub struct AngularCorrelator<'a> {
    geometry: &'a DetectorGeometry,
    config: &'a AngularConfig,
    beam_dump: ChannelId,
}

impl<'a> AngularCorrelator<'a> {
    /// Creates a correlator measuring neutron-gamma angles from `beam_dump`.
    #[must_use]
    pub fn new(geometry: &'a DetectorGeometry, config: &'a AngularConfig, beam_dump: ChannelId) -> Self {
        Self {
            geometry,
            config,
            beam_dump,
        }
    }

    fn matching_gates(&self, en_corr: f64) -> impl Iterator<Item = &'a Gate> + 'a {
        self.config
            .neutron_energy_gates
            .iter()
            .filter(move |gate| gate.contains_exclusive(en_corr))
    }

    /// Records every angular distribution the event qualifies for.
    pub fn record<S: DistributionSink + ?Sized>(&self, event: &CompositeEvent, sink: &mut S) {
        if !self.config.enabled || event.is_empty() {
            return;
        }
        let en_corr = event.en_corr[0];

        self.record_cluster_sizes(event, sink);
        self.record_neutron_gamma(event, en_corr, sink);
        self.record_gamma_gamma(event, en_corr, sink);
        self.record_max_energy_pair(event, en_corr, sink);
    }

    #[allow(clippy::unused_self, clippy::cast_precision_loss)]
    fn record_cluster_sizes<S: DistributionSink + ?Sized>(&self, event: &CompositeEvent, sink: &mut S) {
        for size in event.cluster_sizes().into_iter().filter(|&s| s > 0) {
            sink.record(spectra::CLUSTER_SIZE, &[size as f64]);
        }
    }

    /// Beam axis vs each crystal, for `1 <= Mcr < MAX_ANGULAR_MULT` with every crystal its own cluster.
    fn record_neutron_gamma<S: DistributionSink + ?Sized>(
        &self,
        event: &CompositeEvent,
        en_corr: f64,
        sink: &mut S,
    ) {
        let mult = event.crystal_mult();
        if mult == 0 || mult >= MAX_ANGULAR_MULT || event.cluster_mult != mult {
            return;
        }
        for i in 0..mult {
            let Some(angle) = self.geometry.angle(self.beam_dump, event.crystal_id[i]) else {
                continue;
            };
            let ecl = event
                .cluster_id
                .get(i)
                .and_then(|&label| label.checked_sub(1))
                .and_then(|c| event.cluster_energy.get(c))
                .copied()
                .unwrap_or(0.0);
            for gate in self.matching_gates(en_corr) {
                sink.record(&spectra::ng_angle_esum(mult, gate), &[angle, event.esum]);
                sink.record(&spectra::ng_angle_ecr(mult, gate), &[angle, event.energy[i]]);
                sink.record(&spectra::ng_angle_ecl(mult, gate), &[angle, ecl]);
            }
        }
    }

    /// Direct pair for Mcr = Mcl = 2.
    fn record_gamma_gamma<S: DistributionSink + ?Sized>(
        &self,
        event: &CompositeEvent,
        en_corr: f64,
        sink: &mut S,
    ) {
        if event.crystal_mult() != 2 || event.cluster_mult != 2 {
            return;
        }
        let Some(angle) = self.geometry.angle(event.crystal_id[0], event.crystal_id[1]) else {
            return;
        };
        for gate in self.matching_gates(en_corr) {
            sink.record(&spectra::gg_angle_esum_m2(gate), &[angle, event.esum]);
        }
    }

    /// Most energetic crystal of each of exactly two clusters, for `1 < Mcr < MAX_ANGULAR_MULT`.
    fn record_max_energy_pair<S: DistributionSink + ?Sized>(
        &self,
        event: &CompositeEvent,
        en_corr: f64,
        sink: &mut S,
    ) {
        let mult = event.crystal_mult();
        if event.cluster_mult != 2 || mult <= 1 || mult >= MAX_ANGULAR_MULT {
            return;
        }
        let Some((a, b)) = max_energy_representatives(event) else {
            return;
        };
        let Some(angle) = self.geometry.angle(a, b) else {
            return;
        };
        for gate in self.matching_gates(en_corr) {
            sink.record(&spectra::gg_angle_esum_mcl2_max_ecr(gate), &[angle, event.esum]);
        }
    }
}

/// Highest-energy crystal of clusters 1 and 2.
fn max_energy_representatives(event: &CompositeEvent) -> Option<(ChannelId, ChannelId)> {
    let mut best: [Option<(ChannelId, f64)>; 2] = [None, None];
    for ((&label, &channel), &energy) in event
        .cluster_id
        .iter()
        .zip(&event.crystal_id)
        .zip(&event.energy)
    {
        let Some(slot) = label.checked_sub(1).and_then(|c| best.get_mut(c)) else {
            continue;
        };
        if slot.is_none_or(|(_, e)| energy > e) {
            *slot = Some((channel, energy));
        }
    }
    Some((best[0]?.0, best[1]?.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustdance_core::{RawHit, TupleLog};

    fn clustered(hits: &[(u16, u16, f64)], en_corr: f64) -> CompositeEvent {
        let mut event = CompositeEvent::default();
        for &(ch, _, e) in hits {
            event.push(&RawHit::gamma(ch, 0.0, e));
        }
        event.cluster_id = hits.iter().map(|&(_, label, _)| usize::from(label)).collect();
        event.cluster_mult = event.cluster_id.iter().copied().max().unwrap_or(0);
        event.cluster_energy = vec![0.0; event.cluster_mult];
        for (&label, &e) in event.cluster_id.iter().zip(&event.energy) {
            event.cluster_energy[label - 1] += e;
        }
        event.en_corr = vec![en_corr; hits.len()];
        event
    }

    fn config() -> AngularConfig {
        AngularConfig {
            enabled: true,
            neutron_energy_gates: vec![Gate::new(1.0, 10.0), Gate::new(5.0, 20.0)],
        }
    }

    #[test]
    fn test_overlapping_windows_all_recorded() {
        let geometry = DetectorGeometry::dance();
        let config = config();
        let correlator = AngularCorrelator::new(&geometry, &config, ChannelId(76));
        let event = clustered(&[(10, 1, 1.0)], 7.0);
        let mut log = TupleLog::new();
        correlator.record(&event, &mut log);
        assert_eq!(log.count("ng_angle_esum_m1_en_1_10"), 1);
        assert_eq!(log.count("ng_angle_esum_m1_en_5_20"), 1);
        assert_eq!(log.count(spectra::CLUSTER_SIZE), 1);
    }

    #[test]
    fn test_window_bounds_are_open() {
        let geometry = DetectorGeometry::dance();
        let config = config();
        let correlator = AngularCorrelator::new(&geometry, &config, ChannelId(76));
        let mut log = TupleLog::new();
        correlator.record(&clustered(&[(10, 1, 1.0)], 10.0), &mut log);
        assert_eq!(log.count("ng_angle_esum_m1_en_1_10"), 0);
        assert_eq!(log.count("ng_angle_esum_m1_en_5_20"), 1);
        log.clear();
        correlator.record(&clustered(&[(10, 1, 1.0)], 1.0), &mut log);
        assert_eq!(log.count("ng_angle_esum_m1_en_1_10"), 0);
    }

    #[test]
    fn test_gamma_gamma_direct_pair() {
        let geometry = DetectorGeometry::dance();
        let config = config();
        let correlator = AngularCorrelator::new(&geometry, &config, ChannelId(76));
        let mut log = TupleLog::new();
        correlator.record(&clustered(&[(76, 1, 1.0), (86, 2, 2.0)], 2.0), &mut log);
        let values = log.values("gg_angle_esum_m2_en_1_10");
        assert_eq!(values.len(), 1);
        assert!((values[0][0] - 180.0).abs() < 1e-6);
        assert!((values[0][1] - 3.0).abs() < 1e-12);
        assert_eq!(log.count("gg_angle_esum_mcl2_max_ecr_en_1_10"), 1);
    }

    #[test]
    fn test_max_energy_representatives() {
        let event = clustered(&[(1, 1, 0.5), (2, 1, 2.0), (40, 2, 1.0)], 2.0);
        assert_eq!(
            max_energy_representatives(&event),
            Some((ChannelId(2), ChannelId(40)))
        );
    }

    #[test]
    fn test_disabled_records_nothing() {
        let geometry = DetectorGeometry::dance();
        let config = AngularConfig::default();
        let correlator = AngularCorrelator::new(&geometry, &config, ChannelId(76));
        let mut log = TupleLog::new();
        correlator.record(&clustered(&[(10, 1, 1.0)], 2.0), &mut log);
        assert!(log.records().is_empty());
    }
}
