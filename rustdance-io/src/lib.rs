//! rustdance-io: file access for rustdance.
//!
//! This crate loads the calibration tables, reads pre-unpacked hit lists
//! through memory-mapped files via memmap2, groups hits into bursts, and
//! writes the time-deviation table and histogram summaries.
//!

mod burst;
pub mod calibration;
mod error;
mod reader;
mod writer;

pub use burst::{bursts, BurstBuilder, Bursts};
pub use calibration::{load_adjacency_table, load_timing_pairs};
pub use error::{Error, Result};
pub use reader::{decode_hit, encode_hit, HitFileReader, MappedFileReader, HIT_RECORD_SIZE};
pub use writer::{DataFileWriter, HistogramSummary};
