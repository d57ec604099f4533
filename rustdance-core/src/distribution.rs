//! Named output distributions.
//!
//! The reduction only ever declares distributions and records tuples into
//! them through [`DistributionSink`]. [`HistogramSet`] is the in-memory
//! implementation used by the command line tools; [`TupleLog`] keeps every
//! recorded tuple verbatim.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Binning of one distribution axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Axis {
    /// `bins` equal-width bins over `[low, high)`.
    Uniform { bins: usize, low: f64, high: f64 },
    /// Bins delimited by ascending edges.
    Variable { edges: Vec<f64> },
}

impl Axis {
    /// Equal-width binning.
    #[must_use]
    pub fn uniform(bins: usize, low: f64, high: f64) -> Self {
        Self::Uniform { bins, low, high }
    }

    /// Variable-width binning from ascending edges.
    #[must_use]
    pub fn variable(edges: Vec<f64>) -> Self {
        Self::Variable { edges }
    }

    /// Logarithmic binning: edges step by `1 / bins_per_decade` in `log10`
    /// starting at `log10(from)` while below `log10(to)`.
    #[must_use]
    pub fn log_decades(from: f64, to: f64, bins_per_decade: f64) -> Self {
        let step = 1.0 / bins_per_decade;
        let stop = to.log10();
        let mut edges = Vec::new();
        let mut lx = from.log10();
        while lx < stop {
            edges.push(10f64.powf(lx));
            lx += step;
        }
        Self::Variable { edges }
    }

    /// Number of in-range bins.
    #[must_use]
    pub fn bins(&self) -> usize {
        match self {
            Axis::Uniform { bins, .. } => *bins,
            Axis::Variable { edges } => edges.len().saturating_sub(1),
        }
    }

    /// Bin index of `value`: 0 is underflow, `bins() + 1` is overflow.
    #[must_use]
    pub fn find_bin(&self, value: f64) -> usize {
        let n = self.bins();
        match self {
            Axis::Uniform { bins, low, high } => {
                if value.is_nan() || value < *low || *bins == 0 {
                    0
                } else if value >= *high {
                    n + 1
                } else {
                    let width = (high - low) / *bins as f64;
                    (((value - low) / width) as usize).min(n - 1) + 1
                }
            }
            Axis::Variable { edges } => {
                if n == 0 || value.is_nan() || value < edges[0] {
                    0
                } else if value >= edges[n] {
                    n + 1
                } else {
                    edges.partition_point(|&edge| edge <= value)
                }
            }
        }
    }

    /// Centre of in-range bin `bin` (1-based).
    #[must_use]
    pub fn center(&self, bin: usize) -> f64 {
        match self {
            Axis::Uniform { bins, low, high } => {
                let width = (high - low) / *bins as f64;
                low + (bin as f64 - 0.5) * width
            }
            Axis::Variable { edges } => 0.5 * (edges[bin - 1] + edges[bin]),
        }
    }
}

/// Receiver of declared distributions and recorded tuples.
pub trait DistributionSink {
    /// Declares a distribution with one to three axes.
    fn declare(&mut self, name: &str, axes: Vec<Axis>);

    /// Records one tuple with an explicit weight.
    fn record_weighted(&mut self, name: &str, values: &[f64], weight: f64);

    /// Records one tuple with unit weight.
    fn record(&mut self, name: &str, values: &[f64]) {
        self.record_weighted(name, values, 1.0);
    }
}

/// Sparse histogram over up to three axes.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    axes: Vec<Axis>,
    counts: HashMap<u64, f64>,
    entries: u64,
}

impl Histogram {
    /// Creates an empty histogram.
    #[must_use]
    pub fn new(axes: Vec<Axis>) -> Self {
        Self {
            axes,
            counts: HashMap::new(),
            entries: 0,
        }
    }

    /// Axes of this histogram.
    #[must_use]
    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    /// Number of `fill` calls.
    #[must_use]
    pub fn entries(&self) -> u64 {
        self.entries
    }

    /// Sum of all weights including under/overflow.
    #[must_use]
    pub fn integral(&self) -> f64 {
        self.counts.values().sum()
    }

    fn key(&self, bins: &[usize]) -> u64 {
        let mut key = 0u64;
        let mut stride = 1u64;
        for (axis, &bin) in self.axes.iter().zip(bins) {
            key += bin as u64 * stride;
            stride *= axis.bins() as u64 + 2;
        }
        key
    }

    fn unkey(&self, mut key: u64) -> Vec<usize> {
        self.axes
            .iter()
            .map(|axis| {
                let span = axis.bins() as u64 + 2;
                let bin = key % span;
                key /= span;
                bin as usize
            })
            .collect()
    }

    /// Adds `weight` at the coordinates `values` (missing values read as 0).
    pub fn fill(&mut self, values: &[f64], weight: f64) {
        let bins: Vec<usize> = self
            .axes
            .iter()
            .enumerate()
            .map(|(i, axis)| axis.find_bin(values.get(i).copied().unwrap_or(0.0)))
            .collect();
        let key = self.key(&bins);
        *self.counts.entry(key).or_insert(0.0) += weight;
        self.entries += 1;
    }

    /// Content of the bin addressed by per-axis indices (0 = underflow).
    #[must_use]
    pub fn bin_content(&self, bins: &[usize]) -> f64 {
        self.counts.get(&self.key(bins)).copied().unwrap_or(0.0)
    }

    /// Content of the bin containing `values`.
    #[must_use]
    pub fn content_at(&self, values: &[f64]) -> f64 {
        let bins: Vec<usize> = self
            .axes
            .iter()
            .enumerate()
            .map(|(i, axis)| axis.find_bin(values.get(i).copied().unwrap_or(0.0)))
            .collect();
        self.bin_content(&bins)
    }

    /// Non-empty bins as (per-axis indices, content), in ascending key order.
    #[must_use]
    pub fn nonzero_bins(&self) -> Vec<(Vec<usize>, f64)> {
        let ordered: BTreeMap<u64, f64> = self
            .counts
            .iter()
            .filter(|(_, &w)| w != 0.0)
            .map(|(&k, &w)| (k, w))
            .collect();
        ordered
            .into_iter()
            .map(|(k, w)| (self.unkey(k), w))
            .collect()
    }

    /// In-range first-axis contents of the row whose second-axis coordinate is `y`,
    /// as (bin centre, content) pairs in ascending order.
    #[must_use]
    pub fn row_x(&self, y: f64) -> Vec<(f64, f64)> {
        let (Some(x_axis), Some(y_axis)) = (self.axes.first(), self.axes.get(1)) else {
            return Vec::new();
        };
        let y_bin = y_axis.find_bin(y);
        (1..=x_axis.bins())
            .filter_map(|x_bin| {
                let content = self.bin_content(&[x_bin, y_bin]);
                (content != 0.0).then(|| (x_axis.center(x_bin), content))
            })
            .collect()
    }
}

/// In-memory collection of named histograms.
#[derive(Debug, Clone, Default)]
pub struct HistogramSet {
    histograms: BTreeMap<String, Histogram>,
    undeclared: u64,
}

impl HistogramSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a histogram by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Histogram> {
        self.histograms.get(name)
    }

    /// Iterates over histograms in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Histogram)> {
        self.histograms.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of declared histograms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.histograms.len()
    }

    /// Returns true if nothing has been declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.histograms.is_empty()
    }

    /// Records addressed to names that were never declared.
    #[must_use]
    pub fn undeclared_records(&self) -> u64 {
        self.undeclared
    }
}

impl DistributionSink for HistogramSet {
    fn declare(&mut self, name: &str, axes: Vec<Axis>) {
        self.histograms
            .insert(name.to_string(), Histogram::new(axes));
    }

    fn record_weighted(&mut self, name: &str, values: &[f64], weight: f64) {
        if let Some(histogram) = self.histograms.get_mut(name) {
            histogram.fill(values, weight);
        } else {
            if self.undeclared == 0 {
                log::warn!("record into undeclared distribution {name:?}");
            }
            self.undeclared += 1;
        }
    }
}

/// Sink that keeps every recorded tuple in order. Declarations are ignored.
#[derive(Debug, Clone, Default)]
pub struct TupleLog {
    records: Vec<(String, Vec<f64>, f64)>,
}

impl TupleLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All records in order.
    #[must_use]
    pub fn records(&self) -> &[(String, Vec<f64>, f64)] {
        &self.records
    }

    /// Tuples recorded into `name`.
    #[must_use]
    pub fn values(&self, name: &str) -> Vec<&[f64]> {
        self.records
            .iter()
            .filter(|(n, _, _)| n == name)
            .map(|(_, v, _)| v.as_slice())
            .collect()
    }

    /// Number of tuples recorded into `name`.
    #[must_use]
    pub fn count(&self, name: &str) -> usize {
        self.records.iter().filter(|(n, _, _)| n == name).count()
    }

    /// Drops all records, keeping declarations.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl DistributionSink for TupleLog {
    fn declare(&mut self, _name: &str, _axes: Vec<Axis>) {}

    fn record_weighted(&mut self, name: &str, values: &[f64], weight: f64) {
        self.records.push((name.to_string(), values.to_vec(), weight));
    }
}
