//! Per-pair timing deviation estimation.
//!
//! For every timing pair the time-difference row of its right channel is
//! reduced to a stable local mean: a broad window centred on zero first,
//! then windows shrinking around the running mean. Pair means are
//! independent and computed in parallel; chaining them into cumulative
//! offsets is a prefix sum in table order.

use rayon::prelude::*;
use rustdance_core::{ChannelId, Histogram, TimeDeviationConfig, TimingPairTable};

/// Cumulative timing offset of one calibrated channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeDeviation {
    /// Right-hand channel of the pair.
    pub channel: ChannelId,
    /// Offset accumulated along the pair chain (ns).
    pub offset: f64,
}

/// Weighted mean of the `(centre, content)` points inside `[low, high]`.
fn window_mean(points: &[(f64, f64)], low: f64, high: f64) -> Option<f64> {
    let (sum, weight) = points
        .iter()
        .filter(|(x, _)| *x >= low && *x <= high)
        .fold((0.0, 0.0), |(s, w), &(x, c)| (s + x * c, w + c));
    (weight > 0.0).then(|| sum / weight)
}

/// Converging-window mean of one time-difference row.
///
/// A window that contains nothing keeps the previous mean.
#[must_use]
pub fn converged_mean(points: &[(f64, f64)], config: &TimeDeviationConfig) -> f64 {
    let half = config.initial_half_width;
    let mut mean = window_mean(points, -half, half).unwrap_or(0.0);
    for width in config.schedule() {
        if let Some(next) = window_mean(points, mean - width, mean + width) {
            mean = next;
        }
    }
    mean
}

/// Estimates cumulative offsets from the neighbour time-difference histogram.
///
/// `time_dev` has the time difference on its first axis and the right
/// channel of each pair on its second. A channel is calibrated by at most
/// one pair, so pairs sharing a left channel keep separate rows.
#[must_use]
pub fn estimate_time_deviations(
    time_dev: &Histogram,
    pairs: &TimingPairTable,
    config: &TimeDeviationConfig,
) -> Vec<TimeDeviation> {
    let means: Vec<f64> = pairs
        .pairs()
        .par_iter()
        .map(|&(_, right)| converged_mean(&time_dev.row_x(right.as_f64()), config))
        .collect();

    let mut cumulative = 0.0;
    pairs
        .pairs()
        .iter()
        .zip(means)
        .map(|(&(_, right), mean)| {
            cumulative += mean;
            TimeDeviation {
                channel: right,
                offset: cumulative,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rustdance_core::Axis;

    fn time_dev() -> Histogram {
        Histogram::new(vec![Axis::uniform(10_000, -500.0, 500.0), Axis::uniform(162, 0.0, 162.0)])
    }

    #[test]
    fn test_converged_mean_ignores_far_outliers() {
        let points = vec![(9.95, 10.0), (10.05, 10.0), (300.0, 1.0)];
        let mean = converged_mean(&points, &TimeDeviationConfig::default());
        assert_relative_eq!(mean, 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_empty_row_is_zero() {
        assert_eq!(converged_mean(&[], &TimeDeviationConfig::default()), 0.0);
    }

    #[test]
    fn test_offsets_are_chained() {
        let mut h = time_dev();
        for _ in 0..20 {
            h.fill(&[4.03, 1.0], 1.0);
            h.fill(&[-2.07, 2.0], 1.0);
        }
        let pairs = TimingPairTable::from_pairs(vec![(0, 1), (1, 2)]).unwrap();
        let out = estimate_time_deviations(&h, &pairs, &TimeDeviationConfig::default());
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].channel, ChannelId(1));
        assert_relative_eq!(out[0].offset, 4.05, epsilon = 1e-6);
        assert_eq!(out[1].channel, ChannelId(2));
        assert_relative_eq!(out[1].offset, 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_shared_left_channel_keeps_pairs_apart() {
        let mut h = time_dev();
        for _ in 0..30 {
            h.fill(&[-3.03, 1.0], 1.0);
            h.fill(&[-7.03, 2.0], 1.0);
        }
        let pairs = TimingPairTable::from_pairs(vec![(0, 1), (0, 2)]).unwrap();
        let out = estimate_time_deviations(&h, &pairs, &TimeDeviationConfig::default());
        assert_relative_eq!(out[0].offset, -3.05, epsilon = 1e-6);
        assert_relative_eq!(out[1].offset - out[0].offset, -7.05, epsilon = 1e-6);
    }
}
