//! Analysis input parameters.
//!
//! Loaded from JSON. Every field has a default, so a configuration file only
//! needs to name what it changes.

use crate::error::{Error, Result};
use crate::event::MonitorKind;
use crate::gate::Gate;
use crate::hit::ChannelId;
use crate::kinematics::FlightPaths;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Channel assignments for the non-crystal readouts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelMap {
    /// Beam-burst marker.
    pub t0: ChannelId,
    /// U-235 fission chamber.
    pub fission_chamber: ChannelId,
    /// He-3 monitor.
    pub he3: ChannelId,
    /// Li-6 monitor.
    pub li6: ChannelId,
    /// Background monitor.
    pub background: ChannelId,
    /// Crystal the relative time-deviation spectrum is referenced to.
    pub reference: ChannelId,
    /// Crystal facing the neutron beam dump, used as the beam axis.
    pub beam_dump: ChannelId,
}

impl Default for ChannelMap {
    fn default() -> Self {
        Self {
            t0: ChannelId(200),
            fission_chamber: ChannelId(201),
            he3: ChannelId(202),
            li6: ChannelId(203),
            background: ChannelId(204),
            reference: ChannelId(0),
            beam_dump: ChannelId(76),
        }
    }
}

impl ChannelMap {
    /// Channel of a monitor class.
    #[must_use]
    pub fn monitor(&self, kind: MonitorKind) -> ChannelId {
        match kind {
            MonitorKind::FissionChamber => self.fission_chamber,
            MonitorKind::He3 => self.he3,
            MonitorKind::Li6 => self.li6,
            MonitorKind::Background => self.background,
        }
    }

    /// Monitor class read out on `channel`, if any.
    #[must_use]
    pub fn monitor_kind(&self, channel: ChannelId) -> Option<MonitorKind> {
        MonitorKind::ALL
            .into_iter()
            .find(|&kind| self.monitor(kind) == channel)
    }
}

/// One prompt or delayed selection of an isomer definition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IsomerWindow {
    /// Corrected TOF window (ns).
    pub tof: Gate,
    /// Cluster multiplicity window.
    pub cluster_mult: Gate,
    /// Summed energy window (MeV).
    pub esum: Gate,
}

impl IsomerWindow {
    /// Returns true if all three observables fall in their `[low, high)` windows.
    #[must_use]
    pub fn matches(&self, tof: f64, cluster_mult: usize, esum: f64) -> bool {
        #[allow(clippy::cast_precision_loss)]
        let mcl = cluster_mult as f64;
        self.tof.contains(tof) && self.cluster_mult.contains(mcl) && self.esum.contains(esum)
    }

    fn validate(&self) -> bool {
        self.tof.is_well_formed() && self.cluster_mult.is_well_formed() && self.esum.is_well_formed()
    }
}

/// Prompt and delayed selections of one isomer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IsomerDefinition {
    /// Prompt selection.
    pub prompt: IsomerWindow,
    /// Delayed selection.
    pub delayed: IsomerWindow,
}

/// Angular correlation settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AngularConfig {
    /// Enables the angular distributions.
    pub enabled: bool,
    /// Neutron-energy windows (eV), matched with open bounds.
    pub neutron_energy_gates: Vec<Gate>,
}

/// Histogram binning parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinningConfig {
    /// Lower edge of the log-spaced neutron-energy axis (eV).
    pub neutron_energy_from: f64,
    /// Upper limit of the log-spaced neutron-energy axis (eV).
    pub neutron_energy_to: f64,
    /// Neutron-energy bins per decade.
    pub neutron_energy_bins_per_decade: f64,
    /// Lower edge of the gamma-energy axis (MeV).
    pub gamma_energy_from: f64,
    /// Upper edge of the gamma-energy axis (MeV).
    pub gamma_energy_to: f64,
    /// Number of gamma-energy bins.
    pub gamma_energy_bins: usize,
}

impl Default for BinningConfig {
    fn default() -> Self {
        Self {
            neutron_energy_from: 0.01,
            neutron_energy_to: 1.0e7,
            neutron_energy_bins_per_decade: 100.0,
            gamma_energy_from: 0.0,
            gamma_energy_to: 16.0,
            gamma_energy_bins: 128,
        }
    }
}

/// Pulse-height windows selecting monitor TOF spectra.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorGates {
    /// Fission-chamber slow integral window.
    pub fission_chamber: Gate,
    /// He-3 slow integral window.
    pub he3: Gate,
    /// Li-6 slow integral window.
    pub li6: Gate,
}

impl Default for MonitorGates {
    fn default() -> Self {
        Self {
            fission_chamber: Gate::new(2000.0, 20000.0),
            he3: Gate::new(0.0, 35000.0),
            li6: Gate::new(17000.0, 24000.0),
        }
    }
}

impl MonitorGates {
    /// Pulse-height window for a monitor class; the background monitor has none.
    #[must_use]
    pub fn for_kind(&self, kind: MonitorKind) -> Option<Gate> {
        match kind {
            MonitorKind::FissionChamber => Some(self.fission_chamber),
            MonitorKind::He3 => Some(self.he3),
            MonitorKind::Li6 => Some(self.li6),
            MonitorKind::Background => None,
        }
    }
}

/// Random crystal removal diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemovalConfig {
    /// Number of removal stages; stage `k` drops `k` crystals for `k` in `1..max_removed`.
    pub max_removed: usize,
    /// Seed of the sampler.
    pub seed: u64,
}

impl Default for RemovalConfig {
    fn default() -> Self {
        Self {
            max_removed: 4,
            seed: 0x00da_4ce0,
        }
    }
}

/// Window schedule of the time-deviation estimator (ns).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeDeviationConfig {
    /// Half-width of the initial window centred on zero.
    pub initial_half_width: f64,
    /// Half-width of the first refinement around the running mean.
    pub start_half_width: f64,
    /// Half-width of the last refinement.
    pub final_half_width: f64,
    /// Shrink per refinement step.
    pub step: f64,
}

impl Default for TimeDeviationConfig {
    fn default() -> Self {
        Self {
            initial_half_width: 500.0,
            start_half_width: 100.0,
            final_half_width: 1.0,
            step: 1.0,
        }
    }
}

impl TimeDeviationConfig {
    /// Upper bound on the refinement steps of one schedule.
    pub const MAX_STEPS: f64 = 100_000.0;

    /// Returns true if widths are positive, finite and non-increasing, and
    /// the step yields a bounded schedule.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        let widths = [self.initial_half_width, self.start_half_width, self.final_half_width];
        widths.iter().all(|w| w.is_finite() && *w > 0.0)
            && self.step.is_finite()
            && self.step > 0.0
            && self.initial_half_width >= self.start_half_width
            && self.start_half_width >= self.final_half_width
            && (self.start_half_width - self.final_half_width) / self.step <= Self::MAX_STEPS
    }

    /// Half-widths of the refinement steps, widest first.
    #[must_use]
    pub fn schedule(&self) -> Vec<f64> {
        let mut widths = Vec::new();
        if self.step <= 0.0 {
            return widths;
        }
        let mut width = self.start_half_width;
        while width >= self.final_half_width {
            widths.push(width);
            width -= self.step;
        }
        widths
    }
}

/// Complete set of analysis input parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Analysis stage; physics distributions are produced at stage 1.
    pub analysis_stage: u8,
    /// Input is simulated data; enables physics distributions at any stage.
    pub read_simulation: bool,
    /// Dead time after an accepted composite event (ns).
    pub blocking_time_ns: f64,
    /// Nominal coincidence window (ns).
    pub coincidence_window_ns: f64,
    /// Channel assignments.
    pub channels: ChannelMap,
    /// Flight paths (m).
    pub flight_paths: FlightPaths,
    /// Summed-energy windows (MeV).
    pub q_gates: Vec<Gate>,
    /// Isomer definitions.
    pub isomers: Vec<IsomerDefinition>,
    /// Angular correlation settings.
    pub angular: AngularConfig,
    /// Histogram binning.
    pub binning: BinningConfig,
    /// Monitor pulse-height windows.
    pub monitor_gates: MonitorGates,
    /// Corrected TOF beyond which single-crystal spectra count as late (ns).
    pub late_tof_ns: f64,
    /// Random crystal removal diagnostic, disabled when absent.
    pub removed_spectra: Option<RemovalConfig>,
    /// Time-deviation estimator windows.
    pub time_deviation: TimeDeviationConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            analysis_stage: 1,
            read_simulation: false,
            blocking_time_ns: 0.0,
            coincidence_window_ns: 10.0,
            channels: ChannelMap::default(),
            flight_paths: FlightPaths::default(),
            q_gates: Vec::new(),
            isomers: Vec::new(),
            angular: AngularConfig::default(),
            binning: BinningConfig::default(),
            monitor_gates: MonitorGates::default(),
            late_tof_ns: 14.0e6,
            removed_spectra: None,
            time_deviation: TimeDeviationConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Loads and validates a configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let config: Self = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Returns true if physics distributions are produced.
    #[must_use]
    pub fn physics_enabled(&self) -> bool {
        self.analysis_stage == 1 || self.read_simulation
    }

    /// Checks gates, binning and channel assignments for consistency.
    pub fn validate(&self) -> Result<()> {
        if !(self.blocking_time_ns >= 0.0) || !(self.coincidence_window_ns >= 0.0) {
            return Err(Error::Config(
                "blocking time and coincidence window must be non-negative".into(),
            ));
        }

        for (i, gate) in self.q_gates.iter().enumerate() {
            if !gate.is_well_formed() {
                return Err(Error::Config(format!("q gate {i} is inverted or not finite: {gate}")));
            }
        }
        for (i, gate) in self.angular.neutron_energy_gates.iter().enumerate() {
            if !gate.is_well_formed() {
                return Err(Error::Config(format!(
                    "neutron energy gate {i} is inverted or not finite: {gate}"
                )));
            }
        }
        for (i, isomer) in self.isomers.iter().enumerate() {
            if !isomer.prompt.validate() || !isomer.delayed.validate() {
                return Err(Error::Config(format!("isomer {i} has an inverted window")));
            }
        }

        let b = &self.binning;
        if !(b.neutron_energy_from > 0.0 && b.neutron_energy_to > b.neutron_energy_from) {
            return Err(Error::Config(
                "neutron energy axis needs 0 < from < to".into(),
            ));
        }
        if !(b.neutron_energy_bins_per_decade > 0.0) {
            return Err(Error::Config("neutron energy bins per decade must be positive".into()));
        }
        if b.gamma_energy_bins == 0 || !(b.gamma_energy_to > b.gamma_energy_from) {
            return Err(Error::Config(
                "gamma energy axis needs bins > 0 and from < to".into(),
            ));
        }

        let t = &self.time_deviation;
        if !t.is_well_formed() {
            return Err(Error::Config(format!(
                "time deviation windows {} > {} > {} with step {} do not form a bounded schedule",
                t.initial_half_width, t.start_half_width, t.final_half_width, t.step
            )));
        }

        let c = &self.channels;
        if c.t0.is_crystal() {
            return Err(Error::Config(format!("marker channel {} is a crystal", c.t0)));
        }
        for kind in MonitorKind::ALL {
            let channel = c.monitor(kind);
            if channel.is_crystal() || channel == c.t0 {
                return Err(Error::Config(format!(
                    "{} monitor channel {channel} collides with the crystal array or the marker",
                    kind.label()
                )));
            }
        }
        if !c.reference.is_crystal() || !c.beam_dump.is_crystal() {
            return Err(Error::Config(
                "reference and beam-dump channels must be crystals".into(),
            ));
        }

        if let Some(removal) = &self.removed_spectra {
            if removal.max_removed < 2 {
                log::debug!("removed spectra enabled with max_removed < 2, no stage will run");
            }
        }
        Ok(())
    }
}
