//! rustdance-core: core types for calorimeter time-of-flight event reduction.
//!
//! This crate provides the hit and event records, calibration tables,
//! detector geometry, selection gates, analysis configuration, and the
//! distribution sink abstraction that the reduction writes into.
//!

pub mod config;
pub mod distribution;
pub mod error;
pub mod event;
pub mod gate;
pub mod geometry;
pub mod hit;
pub mod kinematics;
pub mod tables;

pub use config::{
    AnalysisConfig, AngularConfig, BinningConfig, ChannelMap, IsomerDefinition, IsomerWindow,
    MonitorGates, RemovalConfig, TimeDeviationConfig,
};
pub use distribution::{Axis, DistributionSink, Histogram, HistogramSet, TupleLog};
pub use error::{Error, Result};
pub use event::{CompositeEvent, MonitorEvent, MonitorKind, RunCounters};
pub use gate::Gate;
pub use geometry::DetectorGeometry;
pub use hit::{ChannelId, RawHit, CHANNEL_SLOTS, NUM_CRYSTALS};
pub use kinematics::{neutron_energy, FlightPaths};
pub use tables::{AdjacencyTable, TimingPairTable};
