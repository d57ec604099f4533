//! Memory-mapped hit-list readers.
//!
//! A hit list is a flat sequence of fixed-size little-endian records, one
//! per unpacked readout, already in time order:
//!
//! | offset | type | field |
//! |--------|------|-------|
//! | 0  | u16 | channel id |
//! | 2  | u16 | flags: bit 0 gamma, bit 1 pileup, bit 2 valid |
//! | 4  | f32 | slow integral |
//! | 8  | f32 | fast integral |
//! | 12 | f32 | calibrated energy (MeV) |
//! | 16 | f64 | timestamp (ns) |
//! | 24 | f64 | raw TOF (ns) |
//! | 32 | f64 | corrected TOF (ns) |

use crate::{Error, Result};
use memmap2::Mmap;
use rayon::prelude::*;
use rustdance_core::{ChannelId, RawHit};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Size of one hit record in bytes.
pub const HIT_RECORD_SIZE: usize = 40;

const FLAG_GAMMA: u16 = 1;
const FLAG_PILEUP: u16 = 1 << 1;
const FLAG_VALID: u16 = 1 << 2;

/// A memory-mapped file reader.
///
/// Uses memmap2 to access file contents without loading the entire file
/// into memory.
pub struct MappedFileReader {
    mmap: Mmap,
    path: PathBuf,
}

impl MappedFileReader {
    /// Opens a file for memory-mapped reading.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or memory-mapped.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)?;
        // SAFETY: The file is opened read-only and we assume it is not modified concurrently.
        // This is the standard safety contract for memory mapping.
        #[allow(unsafe_code)]
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self {
            mmap,
            path: path.as_ref().to_path_buf(),
        })
    }

    /// Returns the file contents as a byte slice.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.mmap[..]
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    /// Returns true if the file is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    /// Path the mapping was opened from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn u16_at(record: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([record[offset], record[offset + 1]])
}

fn f32_at(record: &[u8], offset: usize) -> f64 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&record[offset..offset + 4]);
    f64::from(f32::from_le_bytes(bytes))
}

fn f64_at(record: &[u8], offset: usize) -> f64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&record[offset..offset + 8]);
    f64::from_le_bytes(bytes)
}

/// Decodes one [`HIT_RECORD_SIZE`]-byte record.
#[must_use]
pub fn decode_hit(record: &[u8; HIT_RECORD_SIZE]) -> RawHit {
    let flags = u16_at(record, 2);
    RawHit {
        channel: ChannelId(u16_at(record, 0)),
        islow: f32_at(record, 4),
        ifast: f32_at(record, 8),
        energy: f32_at(record, 12),
        timestamp: f64_at(record, 16),
        tof: f64_at(record, 24),
        tof_corr: f64_at(record, 32),
        is_gamma: flags & FLAG_GAMMA != 0,
        pileup: flags & FLAG_PILEUP != 0,
        valid: flags & FLAG_VALID != 0,
    }
}

/// Encodes one hit into its record. Integrals and energy are narrowed to `f32`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn encode_hit(hit: &RawHit) -> [u8; HIT_RECORD_SIZE] {
    let mut flags = 0u16;
    if hit.is_gamma {
        flags |= FLAG_GAMMA;
    }
    if hit.pileup {
        flags |= FLAG_PILEUP;
    }
    if hit.valid {
        flags |= FLAG_VALID;
    }

    let mut record = [0u8; HIT_RECORD_SIZE];
    record[0..2].copy_from_slice(&hit.channel.0.to_le_bytes());
    record[2..4].copy_from_slice(&flags.to_le_bytes());
    record[4..8].copy_from_slice(&(hit.islow as f32).to_le_bytes());
    record[8..12].copy_from_slice(&(hit.ifast as f32).to_le_bytes());
    record[12..16].copy_from_slice(&(hit.energy as f32).to_le_bytes());
    record[16..24].copy_from_slice(&hit.timestamp.to_le_bytes());
    record[24..32].copy_from_slice(&hit.tof.to_le_bytes());
    record[32..40].copy_from_slice(&hit.tof_corr.to_le_bytes());
    record
}

/// Reader for hit-list files.
pub struct HitFileReader {
    reader: MappedFileReader,
}

impl HitFileReader {
    /// Opens a hit-list file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be mapped or its size is not a
    /// whole number of records.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = MappedFileReader::open(path)?;
        if reader.len() % HIT_RECORD_SIZE != 0 {
            return Err(Error::InvalidFormat(format!(
                "file size {} is not a multiple of {HIT_RECORD_SIZE} (file: {})",
                reader.len(),
                reader.path().display()
            )));
        }
        log::debug!(
            "mapped {} hits from {}",
            reader.len() / HIT_RECORD_SIZE,
            reader.path().display()
        );
        Ok(Self { reader })
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub fn file_size(&self) -> usize {
        self.reader.len()
    }

    /// Returns the number of hit records in the file.
    #[must_use]
    pub fn hit_count(&self) -> usize {
        self.reader.len() / HIT_RECORD_SIZE
    }

    fn records(&self) -> impl Iterator<Item = &[u8; HIT_RECORD_SIZE]> + '_ {
        self.reader
            .as_bytes()
            .chunks_exact(HIT_RECORD_SIZE)
            .filter_map(|chunk| chunk.try_into().ok())
    }

    /// Decodes every hit, in file order.
    #[must_use]
    pub fn read_hits(&self) -> Vec<RawHit> {
        self.reader
            .as_bytes()
            .par_chunks_exact(HIT_RECORD_SIZE)
            .filter_map(|chunk| chunk.try_into().ok().map(decode_hit))
            .collect()
    }

    /// Iterates over hits without materializing them.
    pub fn iter_hits(&self) -> impl Iterator<Item = RawHit> + '_ {
        self.records().map(decode_hit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_mapped_file_reader() {
        let mut file = NamedTempFile::new().unwrap();
        let data: Vec<u8> = (0..64).collect();
        file.write_all(&data).unwrap();
        file.flush().unwrap();

        let reader = MappedFileReader::open(file.path()).unwrap();
        assert_eq!(reader.len(), 64);
        assert!(!reader.is_empty());
        assert_eq!(reader.as_bytes(), &data[..]);
    }

    #[test]
    fn test_record_layout() {
        let hit = RawHit::gamma(17, 123.5, 2.5)
            .with_tof(1000.25, 998.75)
            .with_integrals(4096.0, 512.0)
            .with_pileup(true);
        let record = encode_hit(&hit);
        assert_eq!(&record[0..2], &17u16.to_le_bytes());
        assert_eq!(u16_at(&record, 2), FLAG_GAMMA | FLAG_PILEUP | FLAG_VALID);
        assert_eq!(decode_hit(&record), hit);
    }

    #[test]
    fn test_hit_file_reader() {
        let mut file = NamedTempFile::new().unwrap();
        let hits = [
            RawHit::readout(200, 0.0),
            RawHit::gamma(3, 10.0, 1.0),
            RawHit::gamma(4, 11.0, 0.5).with_valid(false),
        ];
        for hit in &hits {
            file.write_all(&encode_hit(hit)).unwrap();
        }
        file.flush().unwrap();

        let reader = HitFileReader::open(file.path()).unwrap();
        assert_eq!(reader.hit_count(), 3);
        assert_eq!(reader.read_hits(), hits.to_vec());
        assert_eq!(reader.iter_hits().filter(RawHit::is_valid_gamma).count(), 1);
    }

    #[test]
    fn test_hit_file_reader_invalid_size() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0u8; HIT_RECORD_SIZE + 3]).unwrap();
        file.flush().unwrap();
        assert!(matches!(
            HitFileReader::open(file.path()),
            Err(Error::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_empty_hit_file() {
        let file = NamedTempFile::new().unwrap();
        let reader = HitFileReader::open(file.path()).unwrap();
        assert_eq!(reader.file_size(), 0);
        assert!(reader.read_hits().is_empty());
    }
}
