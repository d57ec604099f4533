//! Distribution names and declarations.
//!
//! Every distribution the reduction records into is named here and declared
//! by [`declare_all`] with its binning. Parameterised families (per gate,
//! per isomer, per monitor) are built by the helper functions.
#![allow(missing_docs)]

use rustdance_core::{AnalysisConfig, Axis, DistributionSink, Gate, MonitorKind, NUM_CRYSTALS};

/// Largest crystal multiplicity covered by the angular distributions (exclusive).
pub const MAX_ANGULAR_MULT: usize = 4;

pub const COINCIDENCE: &str = "coincidence";
pub const TIME_DEV_REL_REF: &str = "time_dev_rel_ref";
pub const TIME_DEV: &str = "time_dev";

pub const BURST_LENGTH: &str = "burst_length";
pub const BURST_LENGTH_SIZE: &str = "burst_length_size";
pub const BURST_TOF_SPAN_ESUM: &str = "burst_tof_span_esum";
pub const EVENT_TIME_GAP_ESUM: &str = "event_time_gap_esum";
pub const TIME_BETWEEN_EVENTS: &str = "time_between_events";
pub const TIME_BETWEEN_T0: &str = "time_between_t0";
pub const ENTRIES_PER_T0: &str = "entries_per_t0";
pub const EVENTS_PER_T0: &str = "events_per_t0";

pub const CRYSTAL_TOF: &str = "crystal_tof";
pub const CRYSTAL_TOF_CORR: &str = "crystal_tof_corr";
pub const CRYSTAL_ID_TOF: &str = "crystal_id_tof";
pub const CRYSTAL_ID_TOF_CORR: &str = "crystal_id_tof_corr";
pub const CRYSTAL_EN_CORR: &str = "crystal_en_corr";
pub const CRYSTAL_ECR_EN_CORR: &str = "crystal_ecr_en_corr";

pub const TOF: &str = "tof";
pub const TOF_CORR: &str = "tof_corr";
pub const EN: &str = "en";
pub const EN_CORR: &str = "en_corr";
pub const MCL_TOF: &str = "mcl_tof";
pub const MCL_TOF_CORR: &str = "mcl_tof_corr";
pub const EN_ESUM_MCL: &str = "en_esum_mcl";
pub const EN_ESUM_MCR: &str = "en_esum_mcr";
pub const EN_ESUM_MCR_PILEUP: &str = "en_esum_mcr_pileup";
pub const EN_ESUM_MCR_NO_PILEUP: &str = "en_esum_mcr_no_pileup";
pub const TOF_ESUM_MCL: &str = "tof_esum_mcl";
pub const TOF_ESUM_MCR: &str = "tof_esum_mcr";
pub const ESUM: &str = "esum";

pub const ISLOW_ID_MCR1: &str = "islow_id_mcr1";
pub const ECR_ID_MCR1: &str = "ecr_id_mcr1";
pub const ECR_ID_MCR1_LATE: &str = "ecr_id_mcr1_late";
pub const ECR_ID_MCR2_LATE: &str = "ecr_id_mcr2_late";

pub const CLUSTER_SIZE: &str = "cluster_size";

/// Summed energy for events of cluster multiplicity `mcl` (2 to 5).
#[must_use]
pub fn esum_mcl(mcl: usize) -> String {
    format!("esum_mcl{mcl}")
}

/// Neutron energy vs cluster energy vs Mcl for Q-gate `index`.
#[must_use]
pub fn en_ecl_mcl_q(index: usize) -> String {
    format!("en_ecl_mcl_q{index}")
}

/// Corrected TOF vs Mcl for Q-gate `index`.
#[must_use]
pub fn mcl_tof_q(index: usize) -> String {
    format!("mcl_tof_q{index}")
}

/// Neutron energy vs crystal energy vs Mcr for Q-gate `index`.
#[must_use]
pub fn en_ecr_mcr_q(index: usize) -> String {
    format!("en_ecr_mcr_q{index}")
}

/// Crystal id vs crystal energy vs Mcr for Q-gate `index`.
#[must_use]
pub fn id_ecr_mcr_q(index: usize) -> String {
    format!("id_ecr_mcr_q{index}")
}

/// Prompt singles of isomer `index`.
#[must_use]
pub fn isomer_prompt(index: usize) -> String {
    format!("isomer_prompt{index}")
}

/// Delayed singles of isomer `index`.
#[must_use]
pub fn isomer_delayed(index: usize) -> String {
    format!("isomer_delayed{index}")
}

/// Delayed minus prompt time differences of isomer `index`.
#[must_use]
pub fn isomer_tdiff(index: usize) -> String {
    format!("isomer_tdiff{index}")
}

/// Neutron-gamma angle vs summed energy, multiplicity `mult`, energy window `gate`.
#[must_use]
pub fn ng_angle_esum(mult: usize, gate: &Gate) -> String {
    format!("ng_angle_esum_m{mult}_en_{gate}")
}

/// Neutron-gamma angle vs crystal energy.
#[must_use]
pub fn ng_angle_ecr(mult: usize, gate: &Gate) -> String {
    format!("ng_angle_ecr_m{mult}_en_{gate}")
}

/// Neutron-gamma angle vs cluster energy.
#[must_use]
pub fn ng_angle_ecl(mult: usize, gate: &Gate) -> String {
    format!("ng_angle_ecl_m{mult}_en_{gate}")
}

/// Gamma-gamma angle for Mcl = Mcr = 2.
#[must_use]
pub fn gg_angle_esum_m2(gate: &Gate) -> String {
    format!("gg_angle_esum_m2_en_{gate}")
}

/// Gamma-gamma angle between the most energetic crystals of two clusters.
#[must_use]
pub fn gg_angle_esum_mcl2_max_ecr(gate: &Gate) -> String {
    format!("gg_angle_esum_mcl2_max_ecr_en_{gate}")
}

/// TOF vs summed energy vs Mcr with `removed` crystals dropped.
#[must_use]
pub fn tof_esum_mcr_removed(removed: usize) -> String {
    format!("tof_esum_mcr_removed{removed}")
}

/// Neutron energy vs summed energy vs Mcr with `removed` crystals dropped.
#[must_use]
pub fn en_esum_mcr_removed(removed: usize) -> String {
    format!("en_esum_mcr_removed{removed}")
}

/// Names of the per-monitor distribution family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSpectra {
    pub pulse_height: String,
    pub tof: String,
    pub tof_corr: String,
    pub en: String,
    pub en_corr: String,
    pub time_between: String,
    pub tof_gated: String,
    pub tof_long_gated: String,
}

impl MonitorSpectra {
    /// Names for monitor `kind`.
    #[must_use]
    pub fn of(kind: MonitorKind) -> Self {
        let label = kind.label();
        Self {
            pulse_height: format!("{label}_islow"),
            tof: format!("{label}_tof"),
            tof_corr: format!("{label}_tof_corr"),
            en: format!("{label}_en"),
            en_corr: format!("{label}_en_corr"),
            time_between: format!("{label}_time_between"),
            tof_gated: format!("{label}_tof_gated"),
            tof_long_gated: format!("{label}_tof_long_gated"),
        }
    }
}

pub const FISSION_CHAMBER_ISLOW_TOF: &str = "u235_islow_tof";
pub const LI6_ISLOW_IFAST: &str = "li6_islow_ifast";

#[allow(clippy::cast_precision_loss)]
fn crystal_axis() -> Axis {
    Axis::uniform(NUM_CRYSTALS, 0.0, NUM_CRYSTALS as f64)
}

fn mult_axis() -> Axis {
    Axis::uniform(20, 0.0, 20.0)
}

fn angle_axis() -> Axis {
    Axis::uniform(180, 0.0, 180.0)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn window_axis(low: f64, high: f64) -> Axis {
    let bins = (high - low).round().max(1.0) as usize;
    Axis::uniform(bins, low, high)
}

/// Declares every distribution the configuration enables.
pub fn declare_all<S: DistributionSink + ?Sized>(sink: &mut S, config: &AnalysisConfig) {
    let b = &config.binning;
    let en_axis = || {
        Axis::log_decades(
            b.neutron_energy_from,
            b.neutron_energy_to,
            b.neutron_energy_bins_per_decade,
        )
    };
    let gamma_axis = || Axis::uniform(b.gamma_energy_bins, b.gamma_energy_from, b.gamma_energy_to);

    sink.declare(COINCIDENCE, vec![crystal_axis(), crystal_axis()]);
    sink.declare(TIME_DEV_REL_REF, vec![Axis::uniform(10_000, -500.0, 500.0), crystal_axis()]);
    sink.declare(TIME_DEV, vec![Axis::uniform(10_000, -500.0, 500.0), crystal_axis()]);

    sink.declare(BURST_LENGTH, vec![Axis::uniform(10_000, 0.0, 100.0)]);
    sink.declare(BURST_LENGTH_SIZE, vec![Axis::uniform(1000, 0.0, 10.0), Axis::uniform(30, 0.0, 30.0)]);
    sink.declare(BURST_TOF_SPAN_ESUM, vec![Axis::uniform(1000, 0.0, 10.0), Axis::uniform(400, 0.0, 20.0)]);
    sink.declare(EVENT_TIME_GAP_ESUM, vec![Axis::uniform(1000, 0.0, 10.0), Axis::uniform(400, 0.0, 20.0)]);
    sink.declare(TIME_BETWEEN_EVENTS, vec![Axis::uniform(1000, 0.0, 10_000.0)]);
    sink.declare(TIME_BETWEEN_T0, vec![Axis::uniform(1_000_000, 0.0, 1.0e8)]);
    sink.declare(ENTRIES_PER_T0, vec![Axis::uniform(100_000, 0.0, 100_000.0)]);
    sink.declare(EVENTS_PER_T0, vec![Axis::uniform(100_000, 0.0, 100_000.0)]);

    sink.declare(CRYSTAL_TOF, vec![Axis::uniform(6_000_000, 0.0, 6.0e7)]);
    sink.declare(CRYSTAL_TOF_CORR, vec![Axis::uniform(600_000, 0.0, 6.0e7)]);
    sink.declare(CRYSTAL_ID_TOF, vec![Axis::uniform(10_000, 0.0, 1.0e6), crystal_axis()]);
    sink.declare(CRYSTAL_ID_TOF_CORR, vec![Axis::uniform(10_000, 0.0, 1.0e7), crystal_axis()]);
    sink.declare(TOF, vec![Axis::uniform(6_000_000, 0.0, 6.0e7)]);
    sink.declare(TOF_CORR, vec![Axis::uniform(6_000_000, 0.0, 6.0e7)]);
    sink.declare(MCL_TOF, vec![Axis::uniform(10_000, 0.0, 1.0e6), Axis::uniform(8, 0.0, 8.0)]);
    sink.declare(MCL_TOF_CORR, vec![Axis::uniform(10_000, 0.0, 1.0e6), Axis::uniform(8, 0.0, 8.0)]);

    sink.declare(ISLOW_ID_MCR1, vec![Axis::uniform(3500, 0.0, 70_000.0), crystal_axis()]);
    sink.declare(ECR_ID_MCR1, vec![Axis::uniform(2000, 0.0, 20.0), crystal_axis()]);
    sink.declare(ECR_ID_MCR1_LATE, vec![Axis::uniform(2000, 0.0, 20.0), crystal_axis()]);
    sink.declare(ECR_ID_MCR2_LATE, vec![Axis::uniform(2000, 0.0, 20.0), crystal_axis()]);

    sink.declare(ESUM, vec![Axis::uniform(400, 0.0, 20.0)]);
    for mcl in 2..=5 {
        sink.declare(&esum_mcl(mcl), vec![Axis::uniform(400, 0.0, 20.0)]);
    }

    for kind in MonitorKind::ALL {
        let names = MonitorSpectra::of(kind);
        sink.declare(&names.pulse_height, vec![Axis::uniform(10_000, 0.0, 100_000.0)]);
        sink.declare(&names.tof, vec![Axis::uniform(600_000, 0.0, 6.0e7)]);
        sink.declare(&names.tof_corr, vec![Axis::uniform(600_000, 0.0, 6.0e7)]);
        sink.declare(&names.en, vec![en_axis()]);
        sink.declare(&names.en_corr, vec![en_axis()]);
        sink.declare(&names.time_between, vec![Axis::uniform(100_000, 0.0, 1.0e7)]);
        if config.monitor_gates.for_kind(kind).is_some() {
            sink.declare(&names.tof_gated, vec![Axis::uniform(10_000, 0.0, 1.0e6)]);
            sink.declare(&names.tof_long_gated, vec![Axis::uniform(45_000, 0.0, 4.5e7)]);
        }
    }
    sink.declare(
        FISSION_CHAMBER_ISLOW_TOF,
        vec![Axis::uniform(6000, 0.0, 6.0e7), Axis::uniform(250, 0.0, 100_000.0)],
    );
    sink.declare(
        LI6_ISLOW_IFAST,
        vec![Axis::uniform(600, 0.0, 60_000.0), Axis::uniform(600, 0.0, 60_000.0)],
    );

    if !config.physics_enabled() {
        return;
    }

    sink.declare(EN, vec![en_axis()]);
    sink.declare(EN_CORR, vec![en_axis()]);
    sink.declare(CRYSTAL_EN_CORR, vec![en_axis()]);
    sink.declare(CRYSTAL_ECR_EN_CORR, vec![en_axis(), gamma_axis()]);

    for name in [EN_ESUM_MCL, EN_ESUM_MCR, EN_ESUM_MCR_PILEUP, EN_ESUM_MCR_NO_PILEUP] {
        sink.declare(name, vec![en_axis(), gamma_axis(), mult_axis()]);
    }
    for name in [TOF_ESUM_MCL, TOF_ESUM_MCR] {
        sink.declare(name, vec![Axis::uniform(2000, 0.0, 1.0e6), gamma_axis(), mult_axis()]);
    }

    if let Some(removal) = &config.removed_spectra {
        for k in 1..removal.max_removed {
            sink.declare(
                &tof_esum_mcr_removed(k),
                vec![Axis::uniform(2000, 0.0, 1.0e6), gamma_axis(), mult_axis()],
            );
            sink.declare(&en_esum_mcr_removed(k), vec![en_axis(), gamma_axis(), mult_axis()]);
        }
    }

    for index in 0..config.q_gates.len() {
        sink.declare(&en_ecl_mcl_q(index), vec![en_axis(), gamma_axis(), mult_axis()]);
        sink.declare(&en_ecr_mcr_q(index), vec![en_axis(), gamma_axis(), mult_axis()]);
        sink.declare(
            &id_ecr_mcr_q(index),
            vec![crystal_axis(), Axis::uniform(400, 0.0, 20.0), mult_axis()],
        );
        sink.declare(&mcl_tof_q(index), vec![Axis::uniform(2000, 0.0, 1.0e6), Axis::uniform(8, 0.0, 8.0)]);
    }

    if config.angular.enabled {
        sink.declare(CLUSTER_SIZE, vec![Axis::uniform(20, -0.5, 19.5)]);
        for gate in &config.angular.neutron_energy_gates {
            for mult in 1..MAX_ANGULAR_MULT {
                sink.declare(&ng_angle_esum(mult, gate), vec![angle_axis(), gamma_axis()]);
                sink.declare(&ng_angle_ecr(mult, gate), vec![angle_axis(), gamma_axis()]);
                sink.declare(&ng_angle_ecl(mult, gate), vec![angle_axis(), gamma_axis()]);
            }
            sink.declare(&gg_angle_esum_m2(gate), vec![angle_axis(), gamma_axis()]);
            sink.declare(&gg_angle_esum_mcl2_max_ecr(gate), vec![angle_axis(), gamma_axis()]);
        }
    }

    for (index, isomer) in config.isomers.iter().enumerate() {
        let p = isomer.prompt.tof;
        let d = isomer.delayed.tof;
        sink.declare(&isomer_prompt(index), vec![window_axis(p.low, p.high)]);
        sink.declare(&isomer_delayed(index), vec![window_axis(d.low, d.high)]);
        sink.declare(&isomer_tdiff(index), vec![window_axis(d.low - p.low, d.high - p.high)]);
    }
}
