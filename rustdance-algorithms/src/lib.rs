//! rustdance-algorithms: burst reduction for the calorimeter array.
//!
//! This crate provides the reduction stages and the pipeline that runs them:
//! - **Assembler** - burst walking, marker periods, dead time
//! - **Clustering** - adjacency-table connected components
//! - **Classification** - neutron energy, gated distributions, isomers
//! - **Angular** - opening-angle distributions in neutron-energy windows
//! - **Time deviations** - offline converging-window timing calibration
//!
#![warn(missing_docs)]

mod angular;
mod assembler;
mod clustering;
mod isomer;
mod observables;
mod pipeline;
mod removal;
mod report;
pub mod spectra;
mod timedev;

pub use angular::AngularCorrelator;
pub use assembler::{Admission, AssembledBurst, EventAssembler};
pub use clustering::{AdjacencyClustering, ClusterState};
pub use isomer::IsomerTracker;
pub use observables::Classifier;
pub use pipeline::Analyzer;
pub use removal::RemovalSampler;
pub use report::{BurstReport, BurstWarning, EventStatus};
pub use timedev::{converged_mean, estimate_time_deviations, TimeDeviation};

// Re-export the core types every caller needs
pub use rustdance_core::{AnalysisConfig, DistributionSink, HistogramSet, RawHit, RunCounters};
