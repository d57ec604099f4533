#![allow(clippy::uninlined_format_args)]
use rustdance_algorithms::spectra;
use rustdance_algorithms::{
    AdjacencyClustering, Analyzer, BurstWarning, ClusterState, EventStatus,
};
use rustdance_core::{
    AdjacencyTable, AnalysisConfig, CompositeEvent, Gate, IsomerDefinition, IsomerWindow, RawHit,
    RunCounters, TimingPairTable, TupleLog,
};

fn adjacency() -> AdjacencyTable {
    // 1-2-3 is a mutually adjacent triangle, 10-11 a pair, 20 isolated.
    let mut rows: Vec<&[u16]> = vec![&[]; 21];
    rows[1] = &[2, 3];
    rows[2] = &[1, 3];
    rows[3] = &[1, 2];
    rows[10] = &[11];
    rows[11] = &[10];
    AdjacencyTable::from_neighbors(&rows).unwrap()
}

fn analyzer(config: AnalysisConfig) -> Analyzer {
    let timing = TimingPairTable::from_pairs(vec![(0, 1), (1, 2), (2, 3)]).unwrap();
    Analyzer::new(config, adjacency(), timing).unwrap()
}

fn marker(t: f64) -> Vec<RawHit> {
    vec![RawHit::readout(200, t)]
}

fn event_at(t: f64, tof: f64) -> Vec<RawHit> {
    vec![RawHit::gamma(20, t, 1.0).with_tof(tof, tof)]
}

#[test]
fn test_coincidence_symmetry() {
    let mut analyzer = analyzer(AnalysisConfig::default());
    let mut counters = RunCounters::default();
    let mut log = TupleLog::new();
    let burst = [
        RawHit::gamma(3, 100.0, 1.0),
        RawHit::readout(202, 101.0),
        RawHit::gamma(7, 104.0, 1.0),
        RawHit::gamma(9, 109.0, 1.0),
    ];
    analyzer.process_burst(&burst, &mut counters, &mut log);

    let pairs = log.values(spectra::COINCIDENCE);
    assert_eq!(pairs.len(), 6, "three crystals give three unordered pairs");
    for (a, b) in [(3.0, 7.0), (3.0, 9.0), (7.0, 9.0)] {
        assert_eq!(pairs.iter().filter(|v| v[0] == a && v[1] == b).count(), 1);
        assert_eq!(pairs.iter().filter(|v| v[0] == b && v[1] == a).count(), 1);
    }
}

#[test]
fn test_cluster_labels_and_energy_conservation() {
    let table = adjacency();
    let clustering = AdjacencyClustering::new(&table);
    let mut state = ClusterState::default();

    let mut event = CompositeEvent::default();
    for (ch, e) in [(10u16, 0.5), (1, 1.0), (20, 4.0), (2, 2.0), (11, 0.25), (3, 3.0)] {
        event.push(&RawHit::gamma(ch, 0.0, e));
    }
    let clusters = clustering.cluster(&mut event, &mut state);

    assert_eq!(clusters, 3);
    assert_eq!(event.cluster_mult, 3);
    for &label in &event.cluster_id {
        assert!((1..=clusters).contains(&label), "label {} out of range", label);
    }
    let total: f64 = event.cluster_energy.iter().sum();
    assert!((total - event.esum).abs() < 1e-12);

    let triangle = event.cluster_id[1];
    assert_eq!(event.cluster_id[3], triangle);
    assert_eq!(event.cluster_id[5], triangle);
    assert!((event.cluster_energy[triangle - 1] - 6.0).abs() < 1e-12);
}

#[test]
fn test_dead_time_is_non_paralyzable() {
    let config = AnalysisConfig {
        blocking_time_ns: 10.0,
        coincidence_window_ns: 1.0,
        ..AnalysisConfig::default()
    };
    let mut analyzer = analyzer(config);
    let mut counters = RunCounters::default();
    let mut log = TupleLog::new();

    analyzer.process_burst(&marker(-100.0), &mut counters, &mut log);
    let statuses: Vec<_> = [0.0, 5.0, 20.0]
        .iter()
        .map(|&t| analyzer.process_burst(&event_at(t, 100.0 + t), &mut counters, &mut log))
        .collect();

    assert_eq!(statuses[0].composite, EventStatus::Accepted);
    assert_eq!(statuses[1].composite, EventStatus::Blocked);
    assert_eq!(statuses[1].warnings, vec![BurstWarning::DeadTimeBlocked { gap: 5.0 }]);
    assert_eq!(statuses[2].composite, EventStatus::Accepted);
    // Measured from the last accepted event, not the blocked one.
    assert_eq!(log.values(spectra::TIME_BETWEEN_EVENTS), vec![&[20.0][..]]);
}

#[test]
fn test_narrow_gap_is_accepted_with_warning() {
    let config = AnalysisConfig {
        blocking_time_ns: 0.0,
        coincidence_window_ns: 10.0,
        ..AnalysisConfig::default()
    };
    let mut analyzer = analyzer(config);
    let mut counters = RunCounters::default();
    let mut log = TupleLog::new();

    analyzer.process_burst(&marker(0.0), &mut counters, &mut log);
    analyzer.process_burst(&event_at(100.0, 100.0), &mut counters, &mut log);
    let report = analyzer.process_burst(&event_at(104.0, 104.0), &mut counters, &mut log);

    assert!(report.composite.is_accepted());
    assert_eq!(
        report.warnings,
        vec![BurstWarning::NarrowGap {
            gap: 4.0,
            window: 10.0
        }]
    );
}

#[test]
fn test_isomer_correlation_completeness() {
    let window = |tof: Gate| IsomerWindow {
        tof,
        cluster_mult: Gate::new(1.0, 10.0),
        esum: Gate::new(0.0, 20.0),
    };
    let config = AnalysisConfig {
        isomers: vec![IsomerDefinition {
            prompt: window(Gate::new(0.0, 100.0)),
            delayed: window(Gate::new(100.0, 500.0)),
        }],
        ..AnalysisConfig::default()
    };
    let mut analyzer = analyzer(config);
    let mut counters = RunCounters::default();
    let mut log = TupleLog::new();

    analyzer.process_burst(&marker(0.0), &mut counters, &mut log);
    for (i, tof) in [50.0, 60.0, 200.0, 300.0, 400.0].into_iter().enumerate() {
        let t = 1000.0 * (i as f64 + 1.0);
        analyzer.process_burst(&event_at(t, tof), &mut counters, &mut log);
    }
    let report = analyzer.process_burst(&marker(1.0e6), &mut counters, &mut log);

    assert_eq!(report.isomer_pairs, 2 * 3);
    let diffs = log.values(&spectra::isomer_tdiff(0));
    assert_eq!(diffs.len(), 6);
    assert!(diffs.iter().any(|v| (v[0] - 350.0).abs() < 1e-9));

    // Buffers were emptied by the marker.
    let report = analyzer.process_burst(&marker(2.0e6), &mut counters, &mut log);
    assert_eq!(report.isomer_pairs, 0);
}

#[test]
fn test_gate_boundaries() {
    let gate = Gate::new(1.0, 2.0);
    assert!(gate.contains(1.0));
    assert!(!gate.contains(2.0));
    assert!(!gate.contains_exclusive(1.0));
    assert!(!gate.contains_exclusive(2.0));
    assert!(gate.contains_exclusive(1.5));
}

#[test]
fn test_q_gate_lower_bound_included() {
    let config = AnalysisConfig {
        q_gates: vec![Gate::new(1.0, 2.0), Gate::new(0.0, 1.0)],
        ..AnalysisConfig::default()
    };
    let mut analyzer = analyzer(config);
    let mut counters = RunCounters::default();
    let mut log = TupleLog::new();

    analyzer.process_burst(&marker(0.0), &mut counters, &mut log);
    analyzer.process_burst(&event_at(100.0, 100.0), &mut counters, &mut log);

    assert_eq!(log.count(&spectra::en_ecr_mcr_q(0)), 1);
    assert_eq!(log.count(&spectra::en_ecr_mcr_q(1)), 0);
}

#[test]
fn test_time_deviation_round_trip() {
    use rustdance_algorithms::estimate_time_deviations;
    use rustdance_core::HistogramSet;

    let mut analyzer = analyzer(AnalysisConfig::default());
    let mut counters = RunCounters::default();
    let mut sink = HistogramSet::new();
    analyzer.declare(&mut sink);

    // Channel 2 lags channel 1 by 3 ns, channel 3 lags channel 2 by 2 ns.
    for k in 0..50 {
        let t = 1.0e4 * f64::from(k);
        let burst = [
            RawHit::gamma(1, t + 0.01, 1.0),
            RawHit::gamma(2, t + 3.01, 1.0),
            RawHit::gamma(3, t + 5.01, 1.0),
        ];
        analyzer.process_burst(&burst, &mut counters, &mut sink);
    }

    let time_dev = sink.get(spectra::TIME_DEV).unwrap();
    let offsets = estimate_time_deviations(
        time_dev,
        analyzer.timing(),
        &analyzer.config().time_deviation,
    );
    assert_eq!(offsets.len(), 3);
    assert!((offsets[1].offset - offsets[0].offset - -3.0).abs() < 0.1);
    assert!((offsets[2].offset - offsets[1].offset - -2.0).abs() < 0.1);
}

#[test]
fn test_time_deviation_pairs_sharing_left_channel() {
    use approx::assert_abs_diff_eq;
    use rustdance_algorithms::estimate_time_deviations;
    use rustdance_core::{ChannelId, HistogramSet};

    // Channel 1 anchors two pairs; the table then returns to it after a detour.
    let timing = TimingPairTable::from_pairs(vec![(1, 3), (3, 10), (1, 2)]).unwrap();
    let mut analyzer = Analyzer::new(AnalysisConfig::default(), adjacency(), timing).unwrap();
    let mut counters = RunCounters::default();
    let mut sink = HistogramSet::new();
    analyzer.declare(&mut sink);

    // Relative to channel 1: channel 2 lags ~3 ns, channel 3 ~7 ns, channel 10 ~9 ns.
    for k in 0..50 {
        let t = 1.0e4 * f64::from(k);
        let burst = [
            RawHit::gamma(1, t + 0.03, 1.0),
            RawHit::gamma(2, t + 3.0, 1.0),
            RawHit::gamma(3, t + 7.0, 1.0),
            RawHit::gamma(10, t + 9.04, 1.0),
        ];
        analyzer.process_burst(&burst, &mut counters, &mut sink);
    }

    let offsets = estimate_time_deviations(
        sink.get(spectra::TIME_DEV).unwrap(),
        analyzer.timing(),
        &analyzer.config().time_deviation,
    );
    let channels: Vec<ChannelId> = offsets.iter().map(|d| d.channel).collect();
    assert_eq!(channels, vec![ChannelId(3), ChannelId(10), ChannelId(2)]);

    // Each step of the prefix sum is that pair's own mean.
    assert_abs_diff_eq!(offsets[0].offset, -6.95, epsilon = 0.1);
    assert_abs_diff_eq!(offsets[1].offset - offsets[0].offset, -2.05, epsilon = 0.1);
    assert_abs_diff_eq!(offsets[2].offset - offsets[1].offset, -2.95, epsilon = 0.1);
}
