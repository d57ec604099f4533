//! Fixed crystal-array geometry and opening angles.

use crate::hit::{ChannelId, NUM_CRYSTALS};

/// Polar angle (degrees) of each crystal centre relative to the beam axis.
#[rustfmt::skip]
const THETA_DEG: [f64; NUM_CRYSTALS] = [
    90.0, 99.6795, 105.786, 90.0, 74.2137, 80.3205, 90.0, 108.001,
    117.284, 120.001, 106.458, 90.0, 73.5423, 59.9987, 62.716, 71.9993,
    97.41, 115.379, 125.971, 131.842, 133.908, 119.471, 106.458, 90.0,
    73.5423, 60.529, 46.0923, 48.1581, 54.0294, 64.6209, 82.59, 89.9979,
    105.097, 121.719, 134.479, 144.002, 149.499, 148.287, 133.907, 120.003,
    105.786, 90.0, 74.2137, 60.0005, 46.0934, 31.7134, 30.501, 35.9954,
    45.5211, 58.281, 74.9026, 97.4085, 115.378, 134.478, 150.535, 161.868,
    164.908, 149.496, 131.839, 117.284, 99.6795, 80.3205, 62.716, 48.1612,
    30.5037, 15.0917, 18.1315, 29.4654, 45.5223, 64.6224, 82.5915, 90.0,
    107.998, 125.968, 143.998, 161.864, 180.0, 161.864, 144.002, 125.968,
    108.002, 90.0, 72.0019, 54.0322, 36.0019, 18.1361, 0.0, 18.1361,
    35.9981, 54.0322, 71.9981, 99.6795, 117.284, 131.839, 149.496, 164.908,
    161.868, 150.535, 134.478, 115.378, 97.4085, 82.5915, 64.6224, 45.5223,
    29.4654, 18.1315, 15.0918, 30.5037, 48.1612, 62.716, 80.3205, 90.0,
    105.786, 120.0, 133.907, 148.287, 149.499, 144.005, 134.479, 121.719,
    105.097, 90.0021, 74.9026, 58.281, 45.5211, 35.9976, 30.501, 31.7134,
    46.0935, 59.9966, 74.2137, 90.0, 106.458, 119.471, 133.908, 131.842,
    125.971, 115.379, 97.41, 82.59, 64.6209, 54.0294, 48.1581, 46.0923,
    60.529, 73.5423, 90.0, 106.458, 120.001, 117.284, 108.001, 90.0,
    71.9993, 62.716, 59.9987, 73.5423, 90.0, 105.786, 99.6795, 80.3205,
    74.2137, 90.0,
];

/// Azimuthal angle (degrees) of each crystal centre.
#[rustfmt::skip]
const PHI_DEG: [f64; NUM_CRYSTALS] = [
    0.0, 346.422, 5.27057, 16.6216, 5.27057, 346.422, 331.184, 333.434,
    350.352, 10.8129, 23.9913, 31.7189, 23.9913, 10.8129, 350.352, 333.434,
    318.313, 319.236, 336.211, 353.747, 18.2257, 31.7205, 39.4487, 46.8184,
    39.4487, 31.7205, 18.2257, 353.747, 336.211, 319.236, 318.313, 301.713,
    301.713, 301.712, 315.341, 333.428, 359.312, 31.7231, 45.2171, 52.6262,
    58.1694, 63.44, 58.1694, 52.6279, 45.2171, 31.7231, 359.312, 333.434,
    315.341, 301.712, 301.713, 285.113, 284.188, 288.081, 301.709, 326.181,
    31.7284, 64.1331, 69.6945, 73.0877, 77.0176, 77.0176, 73.0877, 69.6945,
    64.1331, 31.7284, 326.181, 301.709, 288.081, 284.188, 285.113, 272.256,
    270.0, 267.213, 270.0, 277.264, 0.0, 97.2639, 90.0, 87.2127,
    90.0, 92.2556, 90.0, 87.2126, 90.0, 97.2639, 0.0, 277.264,
    270.0, 267.213, 270.0, 257.018, 253.088, 249.694, 244.133, 211.728,
    146.181, 121.709, 108.081, 104.188, 105.113, 105.113, 104.188, 108.081,
    121.709, 146.181, 211.728, 244.133, 249.694, 253.088, 257.018, 243.44,
    238.169, 232.628, 225.217, 211.723, 179.312, 153.434, 135.341, 121.712,
    121.713, 121.713, 121.713, 121.712, 135.341, 153.428, 179.312, 211.723,
    225.217, 232.626, 238.169, 226.818, 219.449, 211.72, 198.226, 173.747,
    156.211, 139.236, 138.313, 138.313, 139.236, 156.211, 173.747, 198.226,
    211.72, 219.449, 211.719, 203.991, 190.813, 170.352, 153.434, 151.184,
    153.434, 170.352, 190.813, 203.991, 196.622, 185.271, 166.422, 166.422,
    185.271, 180.0,
];

/// Spherical coordinates of the crystal array.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorGeometry {
    theta: Vec<f64>,
    phi: Vec<f64>,
}

impl Default for DetectorGeometry {
    fn default() -> Self {
        Self::dance()
    }
}

impl DetectorGeometry {
    /// The 162-crystal DANCE ball.
    #[must_use]
    pub fn dance() -> Self {
        Self {
            theta: THETA_DEG.to_vec(),
            phi: PHI_DEG.to_vec(),
        }
    }

    /// Builds a geometry from explicit polar/azimuthal angles in degrees.
    ///
    /// Returns `None` if the two slices differ in length.
    #[must_use]
    pub fn from_angles(theta_deg: &[f64], phi_deg: &[f64]) -> Option<Self> {
        (theta_deg.len() == phi_deg.len()).then(|| Self {
            theta: theta_deg.to_vec(),
            phi: phi_deg.to_vec(),
        })
    }

    /// Number of channels with a known position.
    #[must_use]
    pub fn len(&self) -> usize {
        self.theta.len()
    }

    /// Returns true if no positions are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.theta.is_empty()
    }

    /// Opening angle in degrees, in `[0, 180]`, between two crystal centres.
    ///
    /// Returns `None` if either channel has no known position.
    #[must_use]
    pub fn angle(&self, a: ChannelId, b: ChannelId) -> Option<f64> {
        let (theta_a, phi_a) = (self.theta.get(a.index())?, self.phi.get(a.index())?);
        let (theta_b, phi_b) = (self.theta.get(b.index())?, self.phi.get(b.index())?);

        let ta = theta_a.to_radians();
        let tb = theta_b.to_radians();
        let dphi = (phi_a - phi_b).abs().to_radians();

        let cos_angle = ta.cos() * tb.cos() + ta.sin() * tb.sin() * dphi.cos();
        Some(cos_angle.clamp(-1.0, 1.0).acos().to_degrees())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_angle_bounds_and_symmetry() {
        let geometry = DetectorGeometry::dance();
        for a in (0..NUM_CRYSTALS as u16).step_by(7) {
            for b in (0..NUM_CRYSTALS as u16).step_by(5) {
                let ab = geometry.angle(ChannelId(a), ChannelId(b)).unwrap();
                let ba = geometry.angle(ChannelId(b), ChannelId(a)).unwrap();
                assert!((0.0..=180.0).contains(&ab));
                assert_abs_diff_eq!(ab, ba, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_self_angle_is_zero() {
        let geometry = DetectorGeometry::dance();
        for a in 0..NUM_CRYSTALS as u16 {
            assert_abs_diff_eq!(geometry.angle(ChannelId(a), ChannelId(a)).unwrap(), 0.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_beam_axis_crystals_are_opposite() {
        // Crystal 76 sits at theta = 180 (beam dump side), crystal 86 at theta = 0.
        let geometry = DetectorGeometry::dance();
        let angle = geometry.angle(ChannelId(76), ChannelId(86)).unwrap();
        assert_abs_diff_eq!(angle, 180.0, epsilon = 1e-9);
    }

    #[test]
    fn test_unknown_channel() {
        let geometry = DetectorGeometry::dance();
        assert!(geometry.angle(ChannelId(0), ChannelId(200)).is_none());
    }

    #[test]
    fn test_custom_geometry() {
        let geometry = DetectorGeometry::from_angles(&[90.0, 90.0], &[0.0, 90.0]).unwrap();
        assert_abs_diff_eq!(
            geometry.angle(ChannelId(0), ChannelId(1)).unwrap(),
            90.0,
            epsilon = 1e-9
        );
        assert!(DetectorGeometry::from_angles(&[0.0], &[]).is_none());
    }
}
