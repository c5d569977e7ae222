use std::io;

use thiserror::Error;

use crate::data::SourceDataset;
use crate::types::{InstanceId, Url, VideoFileName};

/// Error type for configuration, reconciliation, and table-output failures.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("overlap entry at {url} references missing {dataset} record '{instance_id}'")]
    MissingReference {
        url: Url,
        dataset: SourceDataset,
        instance_id: InstanceId,
    },
    #[error("records {first} and {second} would share output filename '{filename}'")]
    FilenameCollision {
        filename: VideoFileName,
        first: String,
        second: String,
    },
    #[error("source '{path}' could not be parsed: {reason}")]
    SourceParse { path: String, reason: String },
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("metadata table failure: {0}")]
    Table(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}
