//! Tabular outputs: the final metadata table, the discard report, and the
//! append-only processing log the orchestrator writes collaborator results to.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use chrono::Utc;
use csv::WriterBuilder;

use crate::constants::table::METADATA_COLUMNS;
use crate::data::MetadataRow;
use crate::errors::ReconcileError;
use crate::overlap::DiscardEntry;
use crate::types::{Url, VideoFileName};

/// Write the final metadata table, one row per surviving instance.
///
/// Columns are exactly `instance_id, source_dataset, label_text,
/// video_filename, final_split, url`.
pub fn write_metadata(path: &Path, rows: &[MetadataRow]) -> Result<(), ReconcileError> {
    let mut writer = WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record(METADATA_COLUMNS)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the discard report: every removed record with its reason.
pub fn write_discards(path: &Path, discards: &[DiscardEntry]) -> Result<(), ReconcileError> {
    let mut writer = WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record(["instance_id", "url", "reason"])?;
    for entry in discards {
        writer.write_record([
            entry.key.as_str(),
            entry.url.as_deref().unwrap_or(""),
            entry.reason.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Outcome of one collaborator step, recorded in the processing log.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessingStatus {
    /// Materialized and verified.
    Success,
    /// Output already existed; nothing done.
    SkippedExisting,
    /// Fetch failed.
    FailedFetch,
    /// Trim failed.
    FailedTrim,
    /// Record data was unusable.
    InvalidData,
}

impl ProcessingStatus {
    fn as_str(self) -> &'static str {
        match self {
            ProcessingStatus::Success => "SUCCESS",
            ProcessingStatus::SkippedExisting => "SKIPPED_EXISTING",
            ProcessingStatus::FailedFetch => "FAILED_FETCH",
            ProcessingStatus::FailedTrim => "FAILED_TRIM",
            ProcessingStatus::InvalidData => "INVALID_DATA",
        }
    }
}

/// Append-only CSV status log, one line per collaborator outcome.
#[derive(Clone, Debug)]
pub struct ProcessingLog {
    path: PathBuf,
}

impl ProcessingLog {
    /// Log writing to `path`; the file is created on first append.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// Append one status line, writing the header first when the file is new.
    pub fn append(
        &self,
        instance_id: &str,
        url: Option<&Url>,
        filename: &VideoFileName,
        status: ProcessingStatus,
        error: &str,
    ) -> Result<(), ReconcileError> {
        let needs_header = self
            .path
            .metadata()
            .map(|meta| meta.len() == 0)
            .unwrap_or(true);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        if needs_header {
            writer.write_record([
                "instance_id",
                "url",
                "video_filename",
                "status",
                "error",
                "timestamp",
            ])?;
        }
        let timestamp = Utc::now().to_rfc3339();
        writer.write_record([
            instance_id,
            url.map(String::as_str).unwrap_or(""),
            filename.as_str(),
            status.as_str(),
            error,
            timestamp.as_str(),
        ])?;
        writer.flush()?;
        Ok(())
    }
}
