//! Seams toward the download/trim/upload collaborators.
//!
//! The engine decides *what* has to happen to each surviving record's bytes;
//! fetching, codec work, and uploads live behind these traits in the
//! orchestrator.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::constants::filenames::VIDEO_EXT;
use crate::errors::ReconcileError;
use crate::types::{Url, VideoFileName};

/// Trim boundaries for a segment-needing record.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum TrimSpec {
    /// Frame-accurate bounds `[start_frame, end_frame)` when the frame rate
    /// is known.
    Frames { start_frame: u64, end_frame: u64 },
    /// Seconds-based bounds when no frame rate is available.
    Seconds { start_secs: f64, end_secs: f64 },
}

/// What the materialization collaborator must do for one surviving record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ProcessingInstruction {
    /// Bytes exist locally and cover the whole record; copy as-is.
    CopyLocal { path: PathBuf },
    /// Fetch the whole video from its URL.
    Fetch { url: Url },
    /// Fetch into a working area, then trim.
    FetchThenTrim { url: Url, trim: TrimSpec },
    /// Trim an existing local file.
    TrimLocal { path: PathBuf, trim: TrimSpec },
}

impl ProcessingInstruction {
    /// Whether this instruction requires network access.
    pub fn needs_fetch(&self) -> bool {
        matches!(
            self,
            ProcessingInstruction::Fetch { .. } | ProcessingInstruction::FetchThenTrim { .. }
        )
    }

    /// Whether this instruction requires the trimming collaborator.
    pub fn needs_trim(&self) -> bool {
        matches!(
            self,
            ProcessingInstruction::TrimLocal { .. } | ProcessingInstruction::FetchThenTrim { .. }
        )
    }
}

/// Downloads a video into a working area.
pub trait VideoFetcher {
    /// Fetch `url` and return the path of the downloaded file.
    fn fetch(&self, url: &Url, working_dir: &Path) -> Result<PathBuf, ReconcileError>;
}

/// Cuts a video to a trim spec.
pub trait VideoTrimmer {
    /// Trim `input` to `spec`, writing the result to `output`.
    fn trim(&self, input: &Path, output: &Path, spec: &TrimSpec) -> Result<(), ReconcileError>;
}

/// Pushes finished videos to remote storage.
pub trait VideoUploader {
    /// Upload the file at `path` under its canonical `filename`.
    fn upload(&self, path: &Path, filename: &VideoFileName) -> Result<(), ReconcileError>;
}

/// Filenames already materialized under `dir`, so the orchestrator can skip
/// finished work on re-runs.
pub fn scan_existing(dir: &Path) -> Result<Vec<VideoFileName>, ReconcileError> {
    let mut existing = Vec::new();
    if !dir.exists() {
        return Ok(existing);
    }
    for dir_entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let dir_entry = dir_entry.map_err(|err| {
            ReconcileError::Configuration(format!("cannot scan {}: {err}", dir.display()))
        })?;
        let path = dir_entry.path();
        let is_video = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case(VIDEO_EXT))
            .unwrap_or(false);
        let non_empty = dir_entry
            .metadata()
            .map(|meta| meta.len() > 0)
            .unwrap_or(false);
        if is_video
            && non_empty
            && let Some(name) = path.file_name().and_then(|name| name.to_str())
        {
            existing.push(name.to_string());
        }
    }
    existing.sort();
    Ok(existing)
}
