//! Calibration table loading.

use crate::{Error, Result};
use rustdance_core::{AdjacencyTable, TimingPairTable};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Loads the crystal adjacency table.
///
/// # Errors
/// Returns an error if the file cannot be opened or does not hold the
/// expected number of seven-integer rows.
pub fn load_adjacency_table<P: AsRef<Path>>(path: P) -> Result<AdjacencyTable> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let table = AdjacencyTable::from_reader(BufReader::new(file))?;
    log::info!("read {} adjacency rows from {}", table.len(), path.display());
    Ok(table)
}

/// Loads the timing-pair table.
///
/// # Errors
/// Returns an error if the file cannot be opened, a token is malformed, or
/// no pair was read.
pub fn load_timing_pairs<P: AsRef<Path>>(path: P) -> Result<TimingPairTable> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let table = TimingPairTable::from_reader(BufReader::new(file))?;
    log::info!("read {} timing pairs from {}", table.len(), path.display());
    if table.is_empty() {
        return Err(Error::CoreError(rustdance_core::Error::EmptyTimingTable));
    }
    Ok(table)
}
