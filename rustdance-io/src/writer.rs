//! File writers for reduction results.

use crate::reader::encode_hit;
use crate::Result;
use rustdance_algorithms::TimeDeviation;
use rustdance_core::{Axis, Histogram, HistogramSet, RawHit};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Summary of one histogram for the JSON report.
#[derive(Debug, Clone, Serialize)]
pub struct HistogramSummary<'a> {
    /// Distribution name.
    pub name: &'a str,
    /// Axis binning.
    pub axes: &'a [Axis],
    /// Number of fills.
    pub entries: u64,
    /// Sum of weights, including under- and overflow.
    pub integral: f64,
}

impl<'a> HistogramSummary<'a> {
    /// Summarizes `histogram`.
    #[must_use]
    pub fn new(name: &'a str, histogram: &'a Histogram) -> Self {
        Self {
            name,
            axes: histogram.axes(),
            entries: histogram.entries(),
            integral: histogram.integral(),
        }
    }
}

/// Writer for reduction output files.
pub struct DataFileWriter {
    writer: BufWriter<File>,
}

impl DataFileWriter {
    /// Creates a new file writer.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        Ok(Self { writer })
    }

    /// Writes the time-deviation table: a `0\t0` line for the reference
    /// channel, then one `channel\toffset` line per pair in table order.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_time_deviations(&mut self, deviations: &[TimeDeviation]) -> Result<()> {
        writeln!(self.writer, "0\t0")?;
        for d in deviations {
            writeln!(self.writer, "{}\t{}", d.channel, d.offset)?;
        }
        self.writer.flush()?;
        Ok(())
    }

    /// Writes a JSON array with one [`HistogramSummary`] per histogram.
    ///
    /// # Errors
    /// Returns an error if encoding or writing fails.
    pub fn write_summary_json(&mut self, histograms: &HistogramSet) -> Result<()> {
        let summaries: Vec<HistogramSummary<'_>> = histograms
            .iter()
            .map(|(name, h)| HistogramSummary::new(name, h))
            .collect();
        serde_json::to_writer_pretty(&mut self.writer, &summaries)?;
        writeln!(self.writer)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Writes every non-empty bin as CSV.
    ///
    /// Bin indices follow [`Axis::find_bin`]: 0 is underflow, `bins + 1`
    /// overflow. Unused axes are left blank.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_bins_csv(&mut self, histograms: &HistogramSet) -> Result<()> {
        writeln!(self.writer, "name,bin_x,bin_y,bin_z,content")?;
        for (name, histogram) in histograms.iter() {
            for (bins, content) in histogram.nonzero_bins() {
                let index = |axis: usize| bins.get(axis).map(ToString::to_string).unwrap_or_default();
                writeln!(
                    self.writer,
                    "{name},{},{},{},{content}",
                    index(0),
                    index(1),
                    index(2)
                )?;
            }
        }
        self.writer.flush()?;
        Ok(())
    }

    /// Writes hits as fixed-size records readable by [`crate::HitFileReader`].
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_hits(&mut self, hits: &[RawHit]) -> Result<()> {
        for hit in hits {
            self.writer.write_all(&encode_hit(hit))?;
        }
        self.writer.flush()?;
        Ok(())
    }

    /// Flushes the writer.
    ///
    /// # Errors
    /// Returns an error if flushing fails.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
