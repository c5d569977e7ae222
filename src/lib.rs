#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Command-line runner for the full reconciliation.
pub mod app;
/// Reconciliation configuration types.
pub mod config;
/// Centralized constants used across resolver, splits, and tables.
pub mod constants;
/// Instance record, overlap entry, and output row types.
pub mod data;
/// Reconciliation driver and diagnostics.
pub mod engine;
/// Canonical filename assignment and materialization planning.
pub mod filename;
mod hash;
/// Collaborator seams for download, trim, and upload.
pub mod materialize;
/// Balance metrics over final split counts.
pub mod metrics;
/// Label and URL canonicalization helpers.
pub mod normalize;
/// Cross-corpus overlap classification.
pub mod overlap;
/// Corpus normalizers and URL-overlap detection.
pub mod source;
/// Split labels, target ratios, and leak-free split assignment.
pub mod splits;
/// CSV outputs: metadata table, discard report, processing log.
pub mod table;
/// Shared type aliases.
pub mod types;

mod errors;

pub use config::ReconcileConfig;
pub use data::{
    Disposition, InstanceRecord, MetadataRow, OverlapEntry, RecordKey, SourceDataset,
    SourceVideoRef, TimeSpan,
};
pub use engine::{Diagnostics, ReconcileOutput, Reconciler, output_fingerprint};
pub use errors::ReconcileError;
pub use filename::{FilenamePlan, PlannedOutput, RenameNote, assign_filenames};
pub use materialize::{
    ProcessingInstruction, TrimSpec, VideoFetcher, VideoTrimmer, VideoUploader, scan_existing,
};
pub use overlap::{
    AmbiguityFlag, DiscardEntry, MissingReference, OverlapOutcome, resolve_overlaps,
};
pub use source::{detect_overlaps, load_msasl_records, load_wlasl_records};
pub use splits::{
    RatioWarning, SplitLabel, SplitOutcome, SplitRatios, assign_final_splits,
};
pub use table::{ProcessingLog, ProcessingStatus, write_discards, write_metadata};
pub use types::{InstanceId, LabelText, Url, VideoFileName};
