use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::splits::SplitLabel;

pub use crate::types::{InstanceId, LabelText, Url, VideoFileName};

/// Globally unique record key pairing source and instance id.
/// Example: `wlasl::69241`
pub type RecordKey = String;

/// Origin corpus for an instance record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceDataset {
    /// WLASL-style corpus (gloss entries holding frame-indexed instances).
    #[serde(rename = "WLASL")]
    Wlasl,
    /// MS-ASL-style corpus (per-split files with time-indexed instances).
    #[serde(rename = "MSASL")]
    Msasl,
}

impl SourceDataset {
    /// Lowercase tag used in record keys and output filenames.
    pub fn tag(self) -> &'static str {
        match self {
            SourceDataset::Wlasl => "wlasl",
            SourceDataset::Msasl => "msasl",
        }
    }
}

impl fmt::Display for SourceDataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceDataset::Wlasl => write!(f, "WLASL"),
            SourceDataset::Msasl => write!(f, "MSASL"),
        }
    }
}

/// Time interval within a source video, in seconds.
///
/// Absence on a record means the whole video.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeSpan {
    /// Inclusive start, non-negative seconds.
    pub start_secs: f64,
    /// Exclusive end, strictly greater than `start_secs`.
    pub end_secs: f64,
}

impl TimeSpan {
    /// Segment length in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.end_secs - self.start_secs
    }
}

/// Where the bytes for a record currently live.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceVideoRef {
    /// Already on disk at this path.
    LocalFile(PathBuf),
    /// Not yet fetched; bytes must come from the record's URL.
    Unfetched,
}

/// One labeled video segment from either corpus.
///
/// Records are annotated or marked for removal downstream; label, URL, and
/// span fields are never rewritten in place.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InstanceRecord {
    /// Identifier unique within `source`.
    pub instance_id: InstanceId,
    /// Origin corpus.
    pub source: SourceDataset,
    /// Gloss/word label as annotated.
    pub label_text: LabelText,
    /// Canonical video location; `None` rules out URL-based overlap.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<Url>,
    /// Annotated segment; `None` means the whole video.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<TimeSpan>,
    /// Frame rate when the source annotations carry one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fps: Option<f64>,
    /// Partition assigned by the source corpus.
    pub original_split: SplitLabel,
    /// Current byte location for this record.
    pub video_ref: SourceVideoRef,
}

impl InstanceRecord {
    /// Globally unique key: `<source_tag>::<instance_id>`.
    pub fn key(&self) -> RecordKey {
        format!("{}::{}", self.source.tag(), self.instance_id)
    }

    /// Whether the record names a strict sub-interval rather than the whole video.
    pub fn has_nontrivial_span(&self) -> bool {
        self.span.is_some()
    }
}

/// One detected cross-corpus URL match.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OverlapEntry {
    /// URL shared by both sides.
    pub url: Url,
    /// WLASL-side instance id.
    pub wlasl_id: InstanceId,
    /// WLASL-side label.
    pub wlasl_label: LabelText,
    /// MS-ASL-side instance id.
    pub msasl_id: InstanceId,
    /// MS-ASL-side label.
    pub msasl_label: LabelText,
    /// MS-ASL-side annotated segment, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msasl_span: Option<TimeSpan>,
    /// Full duration of the WLASL-side video, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wlasl_duration_secs: Option<f64>,
}

impl OverlapEntry {
    /// Key of the WLASL-side record this entry references.
    pub fn wlasl_key(&self) -> RecordKey {
        format!("{}::{}", SourceDataset::Wlasl.tag(), self.wlasl_id)
    }

    /// Key of the MS-ASL-side record this entry references.
    pub fn msasl_key(&self) -> RecordKey {
        format!("{}::{}", SourceDataset::Msasl.tag(), self.msasl_id)
    }
}

/// Keep/discard decision made for one record during reconciliation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Survives unchanged.
    KeepOriginal,
    /// Survives as a distinct trimmed segment of a shared video.
    KeepAsSegment,
    /// Exact duplicate of a record from the other corpus; removed from output.
    DiscardDuplicate,
}

impl Disposition {
    /// Whether a record with this disposition reaches the output set.
    pub fn survives(self) -> bool {
        !matches!(self, Disposition::DiscardDuplicate)
    }
}

/// Final output row, one per surviving record. Immutable once built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetadataRow {
    /// Globally unique instance key.
    pub instance_id: RecordKey,
    /// Origin corpus.
    pub source_dataset: SourceDataset,
    /// Gloss/word label as annotated.
    pub label_text: LabelText,
    /// Canonical collision-free output filename.
    pub video_filename: VideoFileName,
    /// Final leak-free partition.
    pub final_split: SplitLabel,
    /// Canonical video location, when the record had one.
    pub url: Option<Url>,
}
