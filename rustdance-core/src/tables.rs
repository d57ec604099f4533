//! Static calibration tables: crystal adjacency and timing pairs.
//!
//! Both tables are plain whitespace-delimited integer text. Parsing lives
//! here; opening files is left to `rustdance-io`.

use crate::error::{Error, Result};
use crate::hit::{ChannelId, CHANNEL_SLOTS, NUM_CRYSTALS};
use std::io::Read;

/// Rows in an adjacency table file.
pub const ADJACENCY_ROWS: usize = 167;

/// Integers per adjacency row: the channel itself plus up to six neighbours.
pub const ADJACENCY_COLUMNS: usize = 7;

/// Integer tokens of a text table, each tagged with its 1-based line number.
fn tokens(text: &str) -> Result<Vec<(usize, i64)>> {
    let mut out = Vec::new();
    for (line_idx, line) in text.lines().enumerate() {
        for token in line.split_whitespace() {
            let value = token.parse::<i64>().map_err(|_| Error::Parse {
                line: line_idx + 1,
                token: token.to_string(),
            })?;
            out.push((line_idx + 1, value));
        }
    }
    Ok(out)
}

fn read_text<R: Read>(mut reader: R) -> Result<String> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    Ok(text)
}

/// Spatial neighbour table of the crystal array.
///
/// Row `k` lists channel `k` followed by up to six neighbouring channels.
/// A neighbour entry of `0` or below marks an empty slot. Because an empty
/// slot cannot be told apart from a real neighbour with id 0, adjacency is
/// evaluated symmetrically: `a` and `b` are neighbours if either row lists
/// the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjacencyTable {
    rows: Vec<[i32; ADJACENCY_COLUMNS]>,
}

impl AdjacencyTable {
    /// Builds a table from explicit rows.
    #[must_use]
    pub fn from_rows(rows: Vec<[i32; ADJACENCY_COLUMNS]>) -> Self {
        Self { rows }
    }

    /// Builds a table from neighbour lists, one per channel in id order.
    ///
    /// # Errors
    /// Returns [`Error::TooManyNeighbors`] if a list has more than six entries.
    pub fn from_neighbors(neighbors: &[&[u16]]) -> Result<Self> {
        let rows = neighbors
            .iter()
            .enumerate()
            .map(|(k, list)| {
                if list.len() >= ADJACENCY_COLUMNS {
                    return Err(Error::TooManyNeighbors {
                        channel: k,
                        count: list.len(),
                        max: ADJACENCY_COLUMNS - 1,
                    });
                }
                let mut row = [0i32; ADJACENCY_COLUMNS];
                row[0] = i32::try_from(k).map_err(|_| Error::InvalidChannel(i64::try_from(k).unwrap_or(i64::MAX)))?;
                for (slot, &n) in row[1..].iter_mut().zip(list.iter()) {
                    *slot = i32::from(n);
                }
                Ok(row)
            })
            .collect::<Result<_>>()?;
        Ok(Self { rows })
    }

    /// Parses a table of exactly [`ADJACENCY_ROWS`] rows of seven integers.
    ///
    /// # Errors
    /// Returns [`Error::Parse`] for non-integer tokens and
    /// [`Error::TableShape`] if fewer than [`ADJACENCY_ROWS`] complete rows are present.
    pub fn parse(text: &str) -> Result<Self> {
        let values = tokens(text)?;
        let complete = values.len() / ADJACENCY_COLUMNS;
        if complete < ADJACENCY_ROWS {
            return Err(Error::TableShape {
                expected: ADJACENCY_ROWS,
                found: complete,
            });
        }

        let rows: Vec<[i32; ADJACENCY_COLUMNS]> = values
            .chunks_exact(ADJACENCY_COLUMNS)
            .take(ADJACENCY_ROWS)
            .map(|chunk| {
                let mut row = [0i32; ADJACENCY_COLUMNS];
                for (slot, &(line, value)) in row.iter_mut().zip(chunk) {
                    *slot = i32::try_from(value).map_err(|_| Error::Parse {
                        line,
                        token: value.to_string(),
                    })?;
                }
                Ok(row)
            })
            .collect::<Result<_>>()?;

        for (k, row) in rows.iter().enumerate().take(NUM_CRYSTALS) {
            if usize::try_from(row[0]).ok() != Some(k) {
                log::debug!("adjacency row {k} is labelled {}", row[0]);
            }
        }

        Ok(Self { rows })
    }

    /// Reads and parses a table from any reader.
    ///
    /// # Errors
    /// Propagates I/O failures and the errors of [`AdjacencyTable::parse`].
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Self::parse(&read_text(reader)?)
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Neighbour ids listed in the row of `channel`.
    pub fn listed_neighbors(&self, channel: ChannelId) -> impl Iterator<Item = ChannelId> + '_ {
        self.rows
            .get(channel.index())
            .into_iter()
            .flat_map(|row| row[1..].iter())
            .filter_map(|&n| u16::try_from(n).ok().filter(|&n| n > 0).map(ChannelId))
    }

    /// Returns true if `a` and `b` are spatial neighbours.
    #[must_use]
    pub fn is_neighbor(&self, a: ChannelId, b: ChannelId) -> bool {
        a != b
            && (self.listed_neighbors(a).any(|n| n == b) || self.listed_neighbors(b).any(|n| n == a))
    }
}

/// Ordered list of neighbouring crystal pairs used for timing calibration.
///
/// Pair `(a, b)` means `b` is calibrated relative to `a`. A left channel
/// may anchor several pairs; the right channel identifies the pair, and a
/// reverse index maps it to its row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimingPairTable {
    pairs: Vec<(ChannelId, ChannelId)>,
    right_index: Vec<Option<usize>>,
}

impl TimingPairTable {
    /// Builds a table from explicit pairs.
    ///
    /// # Errors
    /// Returns [`Error::InvalidChannel`] if an id is outside the channel range.
    pub fn from_pairs(pairs: Vec<(u16, u16)>) -> Result<Self> {
        let mut right_index = vec![None; CHANNEL_SLOTS];
        let mut out = Vec::with_capacity(pairs.len());

        for (row, (a, b)) in pairs.into_iter().enumerate() {
            for id in [a, b] {
                if usize::from(id) >= CHANNEL_SLOTS {
                    return Err(Error::InvalidChannel(i64::from(id)));
                }
            }
            right_index[usize::from(b)] = Some(row);
            out.push((ChannelId(a), ChannelId(b)));
        }

        Ok(Self {
            pairs: out,
            right_index,
        })
    }

    /// Parses whitespace-separated channel pairs until end of input.
    ///
    /// A dangling final token (odd token count) is not a pair and is dropped.
    ///
    /// # Errors
    /// Returns [`Error::Parse`] for non-integer tokens and
    /// [`Error::InvalidChannel`] for ids outside the channel range.
    pub fn parse(text: &str) -> Result<Self> {
        let values = tokens(text)?;
        let chunks = values.chunks_exact(2);
        if let [(line, value)] = chunks.remainder() {
            log::debug!("dropping incomplete timing pair on line {line}: {value}");
        }

        let pairs = chunks
            .map(|chunk| {
                let a = u16::try_from(chunk[0].1).map_err(|_| Error::InvalidChannel(chunk[0].1))?;
                let b = u16::try_from(chunk[1].1).map_err(|_| Error::InvalidChannel(chunk[1].1))?;
                Ok((a, b))
            })
            .collect::<Result<Vec<_>>>()?;

        Self::from_pairs(pairs)
    }

    /// Reads and parses a table from any reader.
    ///
    /// # Errors
    /// Propagates I/O failures and the errors of [`TimingPairTable::parse`].
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Self::parse(&read_text(reader)?)
    }

    /// Number of pairs read.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns true if no pairs were read.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Pairs in table order.
    #[must_use]
    pub fn pairs(&self) -> &[(ChannelId, ChannelId)] {
        &self.pairs
    }

    /// Row where `channel` was last listed on the right.
    #[must_use]
    pub fn row_as_right(&self, channel: ChannelId) -> Option<usize> {
        self.right_index.get(channel.index()).copied().flatten()
    }

    /// Row of the pair `(left, right)`, if registered in that orientation.
    ///
    /// A channel is calibrated exactly once, so the right-hand index is
    /// authoritative; a left channel may anchor several pairs.
    #[must_use]
    pub fn pair_row(&self, left: ChannelId, right: ChannelId) -> Option<usize> {
        self.row_as_right(right)
            .filter(|&row| self.pairs[row].0 == left)
    }
}
