//! Cross-corpus overlap classification.
//!
//! Each overlap entry pairs one WLASL record with one MS-ASL record sharing a
//! URL. Pairings are resolved independently under a fixed precedence: exact
//! duplicate, then partial segment, then content mismatch. Discards are
//! sticky across the many-to-many pairings of a single URL.

use indexmap::IndexMap;
use std::collections::HashMap;

use tracing::debug;

use crate::config::ReconcileConfig;
use crate::data::{Disposition, InstanceRecord, OverlapEntry, RecordKey, SourceDataset};
use crate::errors::ReconcileError;
use crate::normalize::{label_similarity, labels_equivalent};
use crate::types::{DiscardReason, InstanceId, Url};

/// An overlap entry that landed near a threshold boundary; resolved to the
/// non-destructive choice and flagged for manual audit.
#[derive(Clone, Debug)]
pub struct AmbiguityFlag {
    /// Shared URL of the borderline pairing.
    pub url: Url,
    /// MS-ASL-side record the flag concerns.
    pub msasl_key: RecordKey,
    /// What was borderline.
    pub detail: String,
}

/// An overlap entry referencing a record absent from the normalized sets.
#[derive(Clone, Debug)]
pub struct MissingReference {
    /// URL of the offending entry.
    pub url: Url,
    /// Which side could not be found.
    pub dataset: SourceDataset,
    /// Identifier that failed to resolve.
    pub instance_id: InstanceId,
}

/// One discarded record with its reason, for the discard report.
#[derive(Clone, Debug)]
pub struct DiscardEntry {
    /// Key of the discarded record.
    pub key: RecordKey,
    /// URL the duplicate was detected through.
    pub url: Option<Url>,
    /// Human-readable reason.
    pub reason: DiscardReason,
}

/// Per-record dispositions plus audit reports.
///
/// Every input record appears in `dispositions`; nothing is dropped silently.
#[derive(Clone, Debug)]
pub struct OverlapOutcome {
    /// Disposition keyed by record, WLASL records first in input order.
    pub dispositions: IndexMap<RecordKey, Disposition>,
    /// Every discarded record with its reason.
    pub discards: Vec<DiscardEntry>,
    /// Borderline classifications needing manual audit.
    pub ambiguities: Vec<AmbiguityFlag>,
    /// Overlap entries skipped because a referenced record was missing.
    pub missing: Vec<MissingReference>,
}

impl OverlapOutcome {
    /// Records that survive reconciliation, in disposition order.
    pub fn surviving_keys(&self) -> impl Iterator<Item = &RecordKey> {
        self.dispositions
            .iter()
            .filter(|(_, disposition)| disposition.survives())
            .map(|(key, _)| key)
    }
}

/// How the MS-ASL span relates to the WLASL video.
enum Coverage {
    /// Covers the whole video within tolerance.
    Full { borderline: bool },
    /// Strict sub-interval.
    Partial { borderline: bool },
    /// Full duration unknown; coverage cannot be decided.
    Unknown,
}

/// Resolve every overlap entry into per-record dispositions.
///
/// Records without an overlap entry default to `KeepOriginal` (WLASL) or, for
/// MS-ASL, `KeepAsSegment` when they name a non-trivial span and
/// `KeepOriginal` otherwise. In strict mode the first missing reference
/// aborts; otherwise missing references are aggregated and the remaining
/// entries still resolve.
pub fn resolve_overlaps(
    wlasl: &[InstanceRecord],
    msasl: &[InstanceRecord],
    entries: &[OverlapEntry],
    config: &ReconcileConfig,
) -> Result<OverlapOutcome, ReconcileError> {
    let mut dispositions: IndexMap<RecordKey, Disposition> = IndexMap::new();
    for record in wlasl {
        dispositions.insert(record.key(), Disposition::KeepOriginal);
    }
    for record in msasl {
        let default = if record.has_nontrivial_span() {
            Disposition::KeepAsSegment
        } else {
            Disposition::KeepOriginal
        };
        dispositions.insert(record.key(), default);
    }

    let wlasl_by_id: HashMap<&str, &InstanceRecord> = wlasl
        .iter()
        .map(|record| (record.instance_id.as_str(), record))
        .collect();
    let msasl_by_id: HashMap<&str, &InstanceRecord> = msasl
        .iter()
        .map(|record| (record.instance_id.as_str(), record))
        .collect();

    let mut discards = Vec::new();
    let mut ambiguities = Vec::new();
    let mut missing = Vec::new();

    for entry in entries {
        let wlasl_record = wlasl_by_id.get(entry.wlasl_id.as_str()).copied();
        let msasl_record = msasl_by_id.get(entry.msasl_id.as_str()).copied();
        let (Some(_wlasl_record), Some(_msasl_record)) = (wlasl_record, msasl_record) else {
            let (dataset, instance_id) = if wlasl_record.is_none() {
                (SourceDataset::Wlasl, entry.wlasl_id.clone())
            } else {
                (SourceDataset::Msasl, entry.msasl_id.clone())
            };
            if config.strict_references {
                return Err(ReconcileError::MissingReference {
                    url: entry.url.clone(),
                    dataset,
                    instance_id,
                });
            }
            missing.push(MissingReference {
                url: entry.url.clone(),
                dataset,
                instance_id,
            });
            continue;
        };

        let msasl_key = entry.msasl_key();
        if dispositions.get(&msasl_key) == Some(&Disposition::DiscardDuplicate) {
            // Discard is sticky: no later pairing revives the record.
            continue;
        }

        classify_pairing(
            entry,
            &msasl_key,
            config,
            &mut dispositions,
            &mut discards,
            &mut ambiguities,
        );
    }

    Ok(OverlapOutcome {
        dispositions,
        discards,
        ambiguities,
        missing,
    })
}

fn classify_pairing(
    entry: &OverlapEntry,
    msasl_key: &RecordKey,
    config: &ReconcileConfig,
    dispositions: &mut IndexMap<RecordKey, Disposition>,
    discards: &mut Vec<DiscardEntry>,
    ambiguities: &mut Vec<AmbiguityFlag>,
) {
    let labels_eq = labels_equivalent(&entry.wlasl_label, &entry.msasl_label);
    let similarity = label_similarity(&entry.wlasl_label, &entry.msasl_label);
    let coverage = span_coverage(entry, config);

    if labels_eq {
        match coverage {
            Coverage::Full { borderline: false } => {
                dispositions.insert(msasl_key.clone(), Disposition::DiscardDuplicate);
                discards.push(DiscardEntry {
                    key: msasl_key.clone(),
                    url: Some(entry.url.clone()),
                    reason: format!("exact duplicate of {}", entry.wlasl_key()),
                });
                debug!(url = %entry.url, record = %msasl_key, "exact duplicate discarded");
                return;
            }
            Coverage::Full { borderline: true } => {
                ambiguities.push(AmbiguityFlag {
                    url: entry.url.clone(),
                    msasl_key: msasl_key.clone(),
                    detail: "segment boundary within the ambiguity margin of full coverage"
                        .to_string(),
                });
            }
            Coverage::Partial { borderline: true } => {
                ambiguities.push(AmbiguityFlag {
                    url: entry.url.clone(),
                    msasl_key: msasl_key.clone(),
                    detail: "segment boundary within the ambiguity margin of the time tolerance"
                        .to_string(),
                });
            }
            Coverage::Unknown => {
                let starts_at_zero = entry
                    .msasl_span
                    .map(|span| span.start_secs <= config.time_tolerance_secs)
                    .unwrap_or(false);
                if starts_at_zero {
                    ambiguities.push(AmbiguityFlag {
                        url: entry.url.clone(),
                        msasl_key: msasl_key.clone(),
                        detail: "full duration unknown; possible exact duplicate".to_string(),
                    });
                }
            }
            Coverage::Partial { borderline: false } => {}
        }
    } else if similarity >= config.label_similarity_threshold {
        // Similar-but-unequal labels over a shared URL sit between exact
        // match and mismatch; keep both sides and flag.
        if (similarity - config.label_similarity_threshold).abs() <= config.ambiguity_margin
            || matches!(coverage, Coverage::Full { .. })
        {
            ambiguities.push(AmbiguityFlag {
                url: entry.url.clone(),
                msasl_key: msasl_key.clone(),
                detail: format!("label similarity {similarity:.3} near threshold"),
            });
        }
    } else {
        debug!(
            url = %entry.url,
            wlasl_label = %entry.wlasl_label,
            msasl_label = %entry.msasl_label,
            "shared url with mismatched labels kept as distinct instances"
        );
    }

    // Non-destructive default for every surviving pairing.
    dispositions.insert(msasl_key.clone(), Disposition::KeepAsSegment);
    dispositions.insert(entry.wlasl_key(), Disposition::KeepOriginal);
}

fn span_coverage(entry: &OverlapEntry, config: &ReconcileConfig) -> Coverage {
    let tolerance = config.time_tolerance_secs;
    let margin = config.ambiguity_margin;
    match (entry.msasl_span, entry.wlasl_duration_secs) {
        (None, _) => Coverage::Full { borderline: false },
        (Some(span), Some(duration)) => {
            let start_gap = span.start_secs;
            let end_gap = (duration - span.end_secs).abs();
            let covers = start_gap <= tolerance && end_gap <= tolerance;
            let borderline = (start_gap - tolerance).abs() <= margin
                || (end_gap - tolerance).abs() <= margin;
            if covers {
                Coverage::Full { borderline }
            } else {
                Coverage::Partial { borderline }
            }
        }
        (Some(_), None) => Coverage::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{SourceVideoRef, TimeSpan};
    use crate::splits::SplitLabel;

    fn record(
        source: SourceDataset,
        id: &str,
        label: &str,
        url: Option<&str>,
        span: Option<TimeSpan>,
    ) -> InstanceRecord {
        InstanceRecord {
            instance_id: id.to_string(),
            source,
            label_text: label.to_string(),
            url: url.map(|u| u.to_string()),
            span,
            fps: None,
            original_split: SplitLabel::Train,
            video_ref: SourceVideoRef::Unfetched,
        }
    }

    fn entry(
        url: &str,
        wlasl_id: &str,
        msasl_id: &str,
        label: &str,
        msasl_label: &str,
        msasl_span: Option<TimeSpan>,
        duration: Option<f64>,
    ) -> OverlapEntry {
        OverlapEntry {
            url: url.to_string(),
            wlasl_id: wlasl_id.to_string(),
            wlasl_label: label.to_string(),
            msasl_id: msasl_id.to_string(),
            msasl_label: msasl_label.to_string(),
            msasl_span,
            wlasl_duration_secs: duration,
        }
    }

    fn span(start: f64, end: f64) -> TimeSpan {
        TimeSpan {
            start_secs: start,
            end_secs: end,
        }
    }

    #[test]
    fn exact_duplicate_discards_the_msasl_side() {
        let wlasl = vec![record(
            SourceDataset::Wlasl,
            "a1",
            "cat",
            Some("https://v/1"),
            None,
        )];
        let msasl = vec![record(
            SourceDataset::Msasl,
            "b1",
            "cat",
            Some("https://v/1"),
            Some(span(0.0, 5.0)),
        )];
        let entries = vec![entry(
            "https://v/1",
            "a1",
            "b1",
            "cat",
            "cat",
            Some(span(0.0, 5.0)),
            Some(5.0),
        )];
        let outcome =
            resolve_overlaps(&wlasl, &msasl, &entries, &ReconcileConfig::default()).unwrap();
        assert_eq!(
            outcome.dispositions["wlasl::a1"],
            Disposition::KeepOriginal
        );
        assert_eq!(
            outcome.dispositions["msasl::b1"],
            Disposition::DiscardDuplicate
        );
        assert_eq!(outcome.discards.len(), 1);
        assert!(outcome.discards[0].reason.contains("wlasl::a1"));
    }

    #[test]
    fn strict_sub_interval_keeps_both_sides() {
        let wlasl = vec![record(
            SourceDataset::Wlasl,
            "a1",
            "cat",
            Some("https://v/1"),
            None,
        )];
        let msasl = vec![record(
            SourceDataset::Msasl,
            "b1",
            "cat",
            Some("https://v/1"),
            Some(span(1.0, 2.0)),
        )];
        let entries = vec![entry(
            "https://v/1",
            "a1",
            "b1",
            "cat",
            "cat",
            Some(span(1.0, 2.0)),
            Some(5.0),
        )];
        let outcome =
            resolve_overlaps(&wlasl, &msasl, &entries, &ReconcileConfig::default()).unwrap();
        assert_eq!(
            outcome.dispositions["msasl::b1"],
            Disposition::KeepAsSegment
        );
        assert_eq!(
            outcome.dispositions["wlasl::a1"],
            Disposition::KeepOriginal
        );
        assert!(outcome.discards.is_empty());
    }

    #[test]
    fn mismatched_labels_stay_distinct() {
        let wlasl = vec![record(
            SourceDataset::Wlasl,
            "a1",
            "cat",
            Some("https://v/1"),
            None,
        )];
        let msasl = vec![record(
            SourceDataset::Msasl,
            "b1",
            "xylophone",
            Some("https://v/1"),
            Some(span(0.0, 5.0)),
        )];
        let entries = vec![entry(
            "https://v/1",
            "a1",
            "b1",
            "cat",
            "xylophone",
            Some(span(0.0, 5.0)),
            Some(5.0),
        )];
        let outcome =
            resolve_overlaps(&wlasl, &msasl, &entries, &ReconcileConfig::default()).unwrap();
        assert_eq!(
            outcome.dispositions["msasl::b1"],
            Disposition::KeepAsSegment
        );
        assert!(outcome.discards.is_empty());
    }

    #[test]
    fn discard_is_sticky_across_pairings() {
        let wlasl = vec![
            record(SourceDataset::Wlasl, "a1", "cat", Some("https://v/1"), None),
            record(
                SourceDataset::Wlasl,
                "a2",
                "cat",
                Some("https://v/1"),
                Some(span(1.0, 2.0)),
            ),
        ];
        let msasl = vec![record(
            SourceDataset::Msasl,
            "b1",
            "cat",
            Some("https://v/1"),
            Some(span(0.0, 5.0)),
        )];
        // First pairing discards b1; the second, a partial view of the same
        // URL, must not revive it.
        let entries = vec![
            entry(
                "https://v/1",
                "a1",
                "b1",
                "cat",
                "cat",
                Some(span(0.0, 5.0)),
                Some(5.0),
            ),
            entry(
                "https://v/1",
                "a2",
                "b1",
                "cat",
                "cat",
                Some(span(0.0, 5.0)),
                Some(8.0),
            ),
        ];
        let outcome =
            resolve_overlaps(&wlasl, &msasl, &entries, &ReconcileConfig::default()).unwrap();
        assert_eq!(
            outcome.dispositions["msasl::b1"],
            Disposition::DiscardDuplicate
        );
        assert_eq!(outcome.discards.len(), 1);
    }

    #[test]
    fn missing_reference_aggregates_by_default_and_fails_in_strict_mode() {
        let wlasl = vec![record(
            SourceDataset::Wlasl,
            "a1",
            "cat",
            Some("https://v/1"),
            None,
        )];
        let msasl: Vec<InstanceRecord> = Vec::new();
        let entries = vec![entry(
            "https://v/1",
            "a1",
            "ghost",
            "cat",
            "cat",
            None,
            None,
        )];

        let outcome =
            resolve_overlaps(&wlasl, &msasl, &entries, &ReconcileConfig::default()).unwrap();
        assert_eq!(outcome.missing.len(), 1);
        assert_eq!(outcome.missing[0].dataset, SourceDataset::Msasl);
        assert_eq!(outcome.missing[0].instance_id, "ghost");

        let strict = ReconcileConfig {
            strict_references: true,
            ..ReconcileConfig::default()
        };
        let err = resolve_overlaps(&wlasl, &msasl, &entries, &strict).unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::MissingReference { dataset: SourceDataset::Msasl, .. }
        ));
    }

    #[test]
    fn borderline_coverage_resolves_to_segment_and_flags() {
        let wlasl = vec![record(
            SourceDataset::Wlasl,
            "a1",
            "cat",
            Some("https://v/1"),
            None,
        )];
        let msasl = vec![record(
            SourceDataset::Msasl,
            "b1",
            "cat",
            Some("https://v/1"),
            Some(span(0.52, 5.0)),
        )];
        // Start gap 0.52 vs tolerance 0.5: inside the 0.05 ambiguity margin.
        let entries = vec![entry(
            "https://v/1",
            "a1",
            "b1",
            "cat",
            "cat",
            Some(span(0.52, 5.0)),
            Some(5.0),
        )];
        let outcome =
            resolve_overlaps(&wlasl, &msasl, &entries, &ReconcileConfig::default()).unwrap();
        assert_eq!(
            outcome.dispositions["msasl::b1"],
            Disposition::KeepAsSegment
        );
        assert_eq!(outcome.ambiguities.len(), 1);
        assert!(outcome.ambiguities[0].detail.contains("ambiguity margin"));
    }

    #[test]
    fn unknown_duration_never_discards() {
        let wlasl = vec![record(
            SourceDataset::Wlasl,
            "a1",
            "cat",
            Some("https://v/1"),
            None,
        )];
        let msasl = vec![record(
            SourceDataset::Msasl,
            "b1",
            "cat",
            Some("https://v/1"),
            Some(span(0.0, 5.0)),
        )];
        let entries = vec![entry(
            "https://v/1",
            "a1",
            "b1",
            "cat",
            "cat",
            Some(span(0.0, 5.0)),
            None,
        )];
        let outcome =
            resolve_overlaps(&wlasl, &msasl, &entries, &ReconcileConfig::default()).unwrap();
        assert_eq!(
            outcome.dispositions["msasl::b1"],
            Disposition::KeepAsSegment
        );
        assert_eq!(outcome.ambiguities.len(), 1);
        assert!(outcome.ambiguities[0].detail.contains("full duration unknown"));
    }

    #[test]
    fn records_without_entries_keep_their_defaults() {
        let wlasl = vec![record(SourceDataset::Wlasl, "a1", "cat", None, None)];
        let msasl = vec![
            record(
                SourceDataset::Msasl,
                "b1",
                "dog",
                None,
                Some(span(1.0, 2.0)),
            ),
            record(SourceDataset::Msasl, "b2", "bird", None, None),
        ];
        let outcome =
            resolve_overlaps(&wlasl, &msasl, &[], &ReconcileConfig::default()).unwrap();
        assert_eq!(
            outcome.dispositions["wlasl::a1"],
            Disposition::KeepOriginal
        );
        assert_eq!(
            outcome.dispositions["msasl::b1"],
            Disposition::KeepAsSegment
        );
        assert_eq!(
            outcome.dispositions["msasl::b2"],
            Disposition::KeepOriginal
        );
        assert_eq!(outcome.surviving_keys().count(), 3);
    }
}
