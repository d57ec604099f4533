//! Error types for rustdance-core.

use thiserror::Error;

/// Result type alias for rustdance operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types.
///
/// Every variant is fatal for pipeline initialization. Per-burst conditions
/// (dead-time blocking, missing marker) are reported through status values,
/// never through this type.
#[derive(Error, Debug)]
pub enum Error {
    /// Underlying I/O failure while reading a table or configuration.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A token in a calibration table could not be parsed as an integer.
    #[error("parse error on line {line}: invalid integer {token:?}")]
    Parse { line: usize, token: String },

    /// The adjacency table did not have the required shape.
    #[error("adjacency table has {found} complete rows, expected {expected}")]
    TableShape { expected: usize, found: usize },

    /// A neighbour list does not fit in one adjacency row.
    #[error("channel {channel} lists {count} neighbours, at most {max} fit")]
    TooManyNeighbors { channel: usize, count: usize, max: usize },

    /// A channel id outside the addressable range.
    #[error("channel id {0} out of range")]
    InvalidChannel(i64),

    /// The timing-pair table contained no pairs.
    #[error("timing pair table is empty")]
    EmptyTimingTable,

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// JSON configuration could not be decoded.
    #[error("configuration decode error: {0}")]
    Json(#[from] serde_json::Error),
}
