//! Record normalizers for the two corpus formats, plus URL-overlap detection.

mod msasl;
mod wlasl;

pub use msasl::load_msasl_records;
pub use wlasl::load_wlasl_records;

use std::collections::HashMap;

use tracing::info;

use crate::data::{InstanceRecord, OverlapEntry, SourceDataset};
use crate::splits::SplitLabel;

/// Parse a source split tag (`train`, `val`/`validation`, `test`).
pub(crate) fn parse_split(raw: &str) -> Option<SplitLabel> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "train" => Some(SplitLabel::Train),
        "val" | "validation" => Some(SplitLabel::Validation),
        "test" => Some(SplitLabel::Test),
        _ => None,
    }
}

/// Build the cross-corpus overlap table from URL intersection.
///
/// For every MS-ASL record whose URL also appears in the WLASL set, one entry
/// per matching WLASL record; many-to-many pairings are preserved. The WLASL
/// duration field carries that record's segment end when the segment starts
/// at zero, the best available stand-in for the video's full length.
pub fn detect_overlaps(
    wlasl: &[InstanceRecord],
    msasl: &[InstanceRecord],
) -> Vec<OverlapEntry> {
    let mut wlasl_by_url: HashMap<&str, Vec<&InstanceRecord>> = HashMap::new();
    for record in wlasl {
        debug_assert_eq!(record.source, SourceDataset::Wlasl);
        if let Some(url) = record.url.as_deref() {
            wlasl_by_url.entry(url).or_default().push(record);
        }
    }

    let mut entries = Vec::new();
    for record in msasl {
        debug_assert_eq!(record.source, SourceDataset::Msasl);
        let Some(url) = record.url.as_deref() else {
            continue;
        };
        let Some(matches) = wlasl_by_url.get(url) else {
            continue;
        };
        for wlasl_record in matches {
            let wlasl_duration_secs = wlasl_record
                .span
                .filter(|span| span.start_secs <= f64::EPSILON)
                .map(|span| span.end_secs);
            entries.push(OverlapEntry {
                url: url.to_string(),
                wlasl_id: wlasl_record.instance_id.clone(),
                wlasl_label: wlasl_record.label_text.clone(),
                msasl_id: record.instance_id.clone(),
                msasl_label: record.label_text.clone(),
                msasl_span: record.span,
                wlasl_duration_secs,
            });
        }
    }
    info!(
        entries = entries.len(),
        "cross-corpus url overlaps detected"
    );
    entries
}
