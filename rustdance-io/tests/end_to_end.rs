use approx::assert_abs_diff_eq;
use rustdance_algorithms::{estimate_time_deviations, spectra, Analyzer, EventStatus};
use rustdance_core::{AnalysisConfig, ChannelId, HistogramSet, RawHit, RunCounters};
use rustdance_io::{bursts, load_adjacency_table, load_timing_pairs, DataFileWriter, HitFileReader};
use std::io::Write;
use tempfile::{tempdir, NamedTempFile};

fn tables() -> (NamedTempFile, NamedTempFile) {
    let mut adjacency = NamedTempFile::new().unwrap();
    for k in 0..167 {
        let next = if k > 0 && k < 161 { k + 1 } else { 0 };
        writeln!(adjacency, "{k} {next} 0 0 0 0 0").unwrap();
    }
    adjacency.flush().unwrap();

    let mut timing = NamedTempFile::new().unwrap();
    writeln!(timing, "0 1\n1 2\n2 3").unwrap();
    timing.flush().unwrap();
    (adjacency, timing)
}

fn run() -> Vec<RawHit> {
    let mut hits = vec![RawHit::readout(200, 0.0)];
    for k in 1..=40 {
        let t = 1000.0 * f64::from(k);
        let tof = 500.0 + f64::from(k);
        hits.push(RawHit::gamma(1, t + 0.01, 1.0).with_tof(tof, tof));
        hits.push(RawHit::gamma(2, t + 3.01, 2.0).with_tof(tof + 3.0, tof + 3.0));
        hits.push(RawHit::gamma(40, t + 4.01, 0.5).with_tof(tof + 4.0, tof + 4.0));
    }
    hits.push(RawHit::readout(200, 1.0e5));
    hits
}

#[test]
fn test_hit_file_to_histograms() {
    let (adjacency, timing) = tables();
    let dir = tempdir().unwrap();
    let hit_path = dir.path().join("run.hits");
    DataFileWriter::create(&hit_path).unwrap().write_hits(&run()).unwrap();

    let config = AnalysisConfig::default();
    let window = config.coincidence_window_ns;
    let marker = config.channels.t0;
    let mut analyzer = Analyzer::new(
        config,
        load_adjacency_table(adjacency.path()).unwrap(),
        load_timing_pairs(timing.path()).unwrap(),
    )
    .unwrap();

    let mut sink = HistogramSet::new();
    analyzer.declare(&mut sink);
    let mut counters = RunCounters::default();

    let reader = HitFileReader::open(&hit_path).unwrap();
    let mut accepted = 0;
    for burst in bursts(reader.iter_hits(), window, marker) {
        let report = analyzer.process_burst(&burst, &mut counters, &mut sink);
        if report.composite == EventStatus::Accepted {
            accepted += 1;
            assert_eq!(report.crystal_mult, 3);
            assert_eq!(report.cluster_mult, 2);
        }
    }

    assert_eq!(accepted, 40);
    assert_eq!(counters.entries_analyzed, 122);
    assert_eq!(counters.t0_events_analyzed, 2);
    assert_eq!(sink.get(spectra::ESUM).unwrap().entries(), 40);
    assert_eq!(sink.get(spectra::TIME_BETWEEN_EVENTS).unwrap().entries(), 39);
    assert_eq!(sink.undeclared_records(), 0);

    let offsets = estimate_time_deviations(
        sink.get(spectra::TIME_DEV).unwrap(),
        analyzer.timing(),
        &analyzer.config().time_deviation,
    );
    assert_eq!(offsets.len(), 3);
    assert_eq!(offsets[2].channel, ChannelId(3));
    assert_abs_diff_eq!(offsets[1].offset, -3.0, epsilon = 0.1);

    let out = dir.path().join("timedev.txt");
    DataFileWriter::create(&out)
        .unwrap()
        .write_time_deviations(&offsets)
        .unwrap();
    let table = std::fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = table.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "0\t0");
    assert!(lines[1].starts_with("1\t"));
}
