//! Neutron kinematics from time of flight.

use crate::event::MonitorKind;
use serde::{Deserialize, Serialize};

/// Neutron rest mass energy (eV).
pub const NEUTRON_MASS_EV: f64 = 939.565_420_52e6;

/// Speed of light (m/s).
pub const SPEED_OF_LIGHT: f64 = 2.997_924_58e8;

/// Non-relativistic neutron kinetic energy in eV.
///
/// `flight_path_m` is the source-to-detector distance in metres and `tof_ns`
/// the time of flight in nanoseconds: `E = m L^2 / (2 t^2 c^2)`.
#[inline]
#[must_use]
pub fn neutron_energy(flight_path_m: f64, tof_ns: f64) -> f64 {
    let t = tof_ns / 1e9;
    0.5 * NEUTRON_MASS_EV * flight_path_m * flight_path_m / t / t / (SPEED_OF_LIGHT * SPEED_OF_LIGHT)
}

/// Flight-path lengths (m) per channel class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightPaths {
    /// Crystal array.
    pub crystal_array: f64,
    /// U-235 fission chamber.
    pub fission_chamber: f64,
    /// He-3 monitor.
    pub he3: f64,
    /// Li-6 monitor.
    pub li6: f64,
    /// Background monitor.
    pub background: f64,
}

impl Default for FlightPaths {
    fn default() -> Self {
        Self {
            crystal_array: 20.25,
            fission_chamber: 22.6,
            he3: 22.9,
            li6: 22.75,
            background: 22.75,
        }
    }
}

impl FlightPaths {
    /// Flight path for a monitor class.
    #[must_use]
    pub fn monitor(&self, kind: MonitorKind) -> f64 {
        match kind {
            MonitorKind::FissionChamber => self.fission_chamber,
            MonitorKind::He3 => self.he3,
            MonitorKind::Li6 => self.li6,
            MonitorKind::Background => self.background,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_halved_tof_quadruples_energy() {
        let l = 9.47;
        let e_long = neutron_energy(l, 1000.0);
        let e_short = neutron_energy(l, 500.0);
        assert_relative_eq!(e_short, 4.0 * e_long, max_relative = 1e-12);
    }

    #[test]
    fn test_known_energy() {
        // 1 eV neutrons cover 20.25 m in ~1.464 ms.
        let e = neutron_energy(20.25, 1_464_020.0);
        assert_relative_eq!(e, 1.0, max_relative = 1e-4);
    }

    #[test]
    fn test_monitor_paths_are_distinct_from_array() {
        let paths = FlightPaths::default();
        for kind in MonitorKind::ALL {
            assert!(paths.monitor(kind) > paths.crystal_array);
        }
    }
}
