//! Append-only CSV sink for job records.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use crate::error::{Result, ScrapeError};
use crate::types::record::{JobRecord, HEADER};

/// Appends records to a CSV file.
///
/// The header row is written once, on the first append, and only if the file
/// did not exist when the sink was opened. Re-running against an existing
/// file keeps appending rows; nothing is deduplicated across runs.
pub struct RecordSink {
    path: PathBuf,
    header_pending: bool,
    rows_written: usize,
}

impl RecordSink {
    /// Open a sink on `path`. Nothing is written until the first append.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let header_pending = !path.exists();

        tracing::debug!(
            path = %path.display(),
            new_file = header_pending,
            "Opened record sink"
        );

        Self {
            path,
            header_pending,
            rows_written: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Data rows appended by this sink so far.
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Append one row per record, in order, and flush before returning.
    ///
    /// An empty batch still creates the file (with its header) on first use.
    pub fn append(&mut self, records: &[JobRecord]) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.write_failed(e.into()))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if self.header_pending {
            writer
                .write_record(HEADER)
                .map_err(|e| self.write_failed(e))?;
        }

        for record in records {
            writer
                .write_record(record.to_row())
                .map_err(|e| self.write_failed(e))?;
        }

        writer.flush().map_err(|e| self.write_failed(e.into()))?;

        self.header_pending = false;
        self.rows_written += records.len();
        Ok(())
    }

    fn write_failed(&self, source: csv::Error) -> ScrapeError {
        ScrapeError::SinkWriteFailed {
            path: self.path.clone(),
            source,
        }
    }
}
