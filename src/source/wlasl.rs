//! WLASL-style corpus normalizer.
//!
//! One JSON file of gloss entries, each holding frame-indexed instances.
//! Frame numbering is 1-based with `frame_end == -1` meaning end of video;
//! both convert to seconds here so downstream code only sees time spans.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::data::{InstanceRecord, SourceDataset, SourceVideoRef, TimeSpan};
use crate::errors::ReconcileError;
use crate::normalize::normalize_url;
use crate::source::parse_split;

#[derive(Debug, Deserialize)]
struct GlossEntry {
    gloss: String,
    #[serde(default)]
    instances: Vec<RawInstance>,
}

#[derive(Debug, Deserialize)]
struct RawInstance {
    video_id: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    fps: Option<f64>,
    #[serde(default)]
    frame_start: Option<i64>,
    #[serde(default)]
    frame_end: Option<i64>,
    #[serde(default)]
    split: Option<String>,
}

/// Load and normalize a WLASL-style JSON file.
///
/// `videos_dir`, when given, is probed for `<video_id>.mp4` so records whose
/// bytes already exist locally skip the fetch step. Instances with an
/// unusable split tag are skipped with a warning, matching the source
/// corpus's own tolerance for incomplete entries.
pub fn load_wlasl_records(
    path: &Path,
    videos_dir: Option<&Path>,
) -> Result<Vec<InstanceRecord>, ReconcileError> {
    let raw = fs::read_to_string(path)?;
    let glosses: Vec<GlossEntry> =
        serde_json::from_str(&raw).map_err(|err| ReconcileError::SourceParse {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for entry in glosses {
        for instance in entry.instances {
            let Some(split) = instance.split.as_deref().and_then(parse_split) else {
                warn!(
                    video_id = %instance.video_id,
                    gloss = %entry.gloss,
                    "skipping instance without a usable split tag"
                );
                skipped += 1;
                continue;
            };
            let span = frame_span(&instance);
            let video_ref = videos_dir
                .map(|dir| dir.join(format!("{}.mp4", instance.video_id)))
                .filter(|candidate| candidate.is_file())
                .map(SourceVideoRef::LocalFile)
                .unwrap_or(SourceVideoRef::Unfetched);
            records.push(InstanceRecord {
                instance_id: instance.video_id,
                source: SourceDataset::Wlasl,
                label_text: entry.gloss.clone(),
                url: instance.url.as_deref().and_then(normalize_url),
                span,
                fps: instance.fps.filter(|fps| *fps > 0.0),
                original_split: split,
                video_ref,
            });
        }
    }
    info!(
        records = records.len(),
        skipped,
        path = %path.display(),
        "wlasl corpus loaded"
    );
    Ok(records)
}

/// Convert 1-based inclusive frame bounds to a seconds span.
/// `frame_end == -1` means the whole video.
fn frame_span(instance: &RawInstance) -> Option<TimeSpan> {
    let frame_end = instance.frame_end?;
    if frame_end < 0 {
        return None;
    }
    let frame_start = instance.frame_start.unwrap_or(1);
    let fps = instance.fps.filter(|fps| *fps > 0.0)?;
    let start_secs = (frame_start - 1).max(0) as f64 / fps;
    let end_secs = frame_end as f64 / fps;
    if end_secs <= start_secs {
        return None;
    }
    Some(TimeSpan {
        start_secs,
        end_secs,
    })
}
