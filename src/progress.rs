//! Per-iteration progress reporting for the greedy stage.

use std::io::Write;

use serde::Serialize;

use crate::error::{CoverError, Result};

/// One committed greedy step.
///
/// Serialized field names double as the TSV header.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProgressRecord {
    #[serde(rename = "itr")]
    pub iteration: usize,
    #[serde(rename = "module_id")]
    pub module: usize,
    #[serde(rename = "selected_item")]
    pub item: String,
    /// `k - min(remaining)`.
    pub max_covered: f64,
    /// `k - max(remaining)`.
    pub min_covered: f64,
    /// `k - mean(remaining)`.
    pub avg_covered: f64,
    pub benefit: f64,
    pub cost: f64,
}

/// Receives progress records. Not part of the cover's correctness: a sink
/// only observes.
pub trait ProgressSink {
    fn record(&mut self, record: &ProgressRecord) -> Result<()>;

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

impl ProgressSink for Vec<ProgressRecord> {
    fn record(&mut self, record: &ProgressRecord) -> Result<()> {
        self.push(record.clone());
        Ok(())
    }
}

/// Tab-separated writer, one row per iteration after a header line.
pub struct TsvProgressSink<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> TsvProgressSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            writer: csv::WriterBuilder::new().delimiter(b'\t').from_writer(out),
        }
    }

    /// Flush and hand back the underlying writer.
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| CoverError::Io(e.into_error()))
    }
}

impl<W: Write> ProgressSink for TsvProgressSink<W> {
    fn record(&mut self, record: &ProgressRecord) -> Result<()> {
        self.writer.serialize(record)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
