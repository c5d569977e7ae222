//! MS-ASL-style corpus normalizer.
//!
//! Three JSON files (train/val/test), each an array of time-indexed
//! instances. The file a record came from determines its original split.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::data::{InstanceRecord, SourceDataset, SourceVideoRef, TimeSpan};
use crate::errors::ReconcileError;
use crate::normalize::normalize_url;
use crate::splits::SplitLabel;

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    clean_text: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    fps: Option<f64>,
    #[serde(default)]
    start_time: Option<f64>,
    #[serde(default)]
    end_time: Option<f64>,
    #[serde(default)]
    start: Option<i64>,
    #[serde(default)]
    end: Option<i64>,
}

/// Load and normalize the three MS-ASL split files.
///
/// Instance ids are synthesized from the split tag and the record's position
/// in its file, which is stable across runs of the same inputs. Entries
/// without a URL or label are skipped with a warning.
pub fn load_msasl_records(
    train: &Path,
    val: &Path,
    test: &Path,
) -> Result<Vec<InstanceRecord>, ReconcileError> {
    let mut records = Vec::new();
    for (path, split) in [
        (train, SplitLabel::Train),
        (val, SplitLabel::Validation),
        (test, SplitLabel::Test),
    ] {
        load_split_file(path, split, &mut records)?;
    }
    info!(records = records.len(), "msasl corpus loaded");
    Ok(records)
}

fn load_split_file(
    path: &Path,
    split: SplitLabel,
    records: &mut Vec<InstanceRecord>,
) -> Result<(), ReconcileError> {
    let raw = fs::read_to_string(path)?;
    let entries: Vec<RawEntry> =
        serde_json::from_str(&raw).map_err(|err| ReconcileError::SourceParse {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;

    let mut skipped = 0usize;
    for (idx, entry) in entries.into_iter().enumerate() {
        let label = entry
            .clean_text
            .as_deref()
            .or(entry.text.as_deref())
            .map(str::trim)
            .filter(|label| !label.is_empty());
        let url = entry.url.as_deref().and_then(normalize_url);
        let (Some(label), Some(url)) = (label, url) else {
            warn!(
                index = idx,
                path = %path.display(),
                "skipping entry without url or label"
            );
            skipped += 1;
            continue;
        };
        records.push(InstanceRecord {
            instance_id: format!("{split}_{idx:06}"),
            source: SourceDataset::Msasl,
            label_text: label.to_string(),
            url: Some(url),
            span: time_span(&entry),
            fps: entry.fps.filter(|fps| *fps > 0.0),
            original_split: split,
            video_ref: SourceVideoRef::Unfetched,
        });
    }
    if skipped > 0 {
        warn!(skipped, path = %path.display(), "entries skipped during load");
    }
    Ok(())
}

/// Prefer the seconds-based bounds; fall back to frame bounds over fps.
fn time_span(entry: &RawEntry) -> Option<TimeSpan> {
    if let (Some(start_secs), Some(end_secs)) = (entry.start_time, entry.end_time)
        && start_secs >= 0.0
        && end_secs > start_secs
    {
        return Some(TimeSpan {
            start_secs,
            end_secs,
        });
    }
    let fps = entry.fps.filter(|fps| *fps > 0.0)?;
    let (start, end) = (entry.start?, entry.end?);
    if start < 0 || end <= start {
        return None;
    }
    Some(TimeSpan {
        start_secs: start as f64 / fps,
        end_secs: end as f64 / fps,
    })
}
