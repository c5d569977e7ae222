//! Canonical output filenames and materialization plans for survivors.

use indexmap::IndexMap;

use tracing::warn;

use crate::config::ReconcileConfig;
use crate::constants::filenames::VIDEO_EXT;
use crate::data::{Disposition, InstanceRecord, RecordKey, SourceVideoRef};
use crate::errors::ReconcileError;
use crate::materialize::{ProcessingInstruction, TrimSpec};
use crate::normalize::normalize_label;
use crate::types::VideoFileName;

/// One surviving record's output name and the work needed to produce it.
#[derive(Clone, Debug)]
pub struct PlannedOutput {
    /// Record the plan belongs to.
    pub key: RecordKey,
    /// Canonical collision-free filename.
    pub filename: VideoFileName,
    /// What the materialization collaborator must do.
    pub instruction: ProcessingInstruction,
}

/// A collision repair, reported so silent renames stay visible.
#[derive(Clone, Debug)]
pub struct RenameNote {
    /// Record whose filename was disambiguated.
    pub key: RecordKey,
    /// Name both records would have produced.
    pub contested: VideoFileName,
    /// Name actually assigned.
    pub assigned: VideoFileName,
}

/// Filenames plus processing instructions, ordered by record key.
#[derive(Clone, Debug)]
pub struct FilenamePlan {
    pub outputs: Vec<PlannedOutput>,
    /// Every collision repair that was applied.
    pub renames: Vec<RenameNote>,
}

impl FilenamePlan {
    /// Filename assigned to `key`, when the record survived.
    pub fn filename_for(&self, key: &str) -> Option<&VideoFileName> {
        self.outputs
            .iter()
            .find(|output| output.key == key)
            .map(|output| &output.filename)
    }
}

/// Assign every surviving record a unique canonical filename and a
/// processing instruction.
///
/// The base name is deterministic in the record alone: source tag, instance
/// id, and normalized label. Distinct records can only collide through
/// sanitization; collisions repair with a counter suffix in stable key order
/// (reported via `renames`), or fail with `FilenameCollision` when repair is
/// disabled.
pub fn assign_filenames(
    survivors: &[InstanceRecord],
    dispositions: &IndexMap<RecordKey, Disposition>,
    config: &ReconcileConfig,
) -> Result<FilenamePlan, ReconcileError> {
    let mut ordered: Vec<&InstanceRecord> = survivors
        .iter()
        .filter(|record| {
            dispositions
                .get(&record.key())
                .map(|disposition| disposition.survives())
                .unwrap_or(false)
        })
        .collect();
    ordered.sort_by_key(|record| record.key());

    let mut taken: IndexMap<VideoFileName, RecordKey> = IndexMap::new();
    let mut outputs = Vec::with_capacity(ordered.len());
    let mut renames = Vec::new();

    for record in ordered {
        let key = record.key();
        let base = base_filename(record);
        let filename = match taken.get(&base) {
            None => base.clone(),
            Some(holder) => {
                if !config.repair_collisions {
                    return Err(ReconcileError::FilenameCollision {
                        filename: base,
                        first: holder.clone(),
                        second: key,
                    });
                }
                let repaired = disambiguate(&base, &taken);
                warn!(
                    record = %key,
                    contested = %base,
                    assigned = %repaired,
                    "filename collision repaired"
                );
                renames.push(RenameNote {
                    key: key.clone(),
                    contested: base.clone(),
                    assigned: repaired.clone(),
                });
                repaired
            }
        };
        taken.insert(filename.clone(), key.clone());
        outputs.push(PlannedOutput {
            key,
            filename,
            instruction: instruction_for(record)?,
        });
    }

    Ok(FilenamePlan { outputs, renames })
}

fn base_filename(record: &InstanceRecord) -> VideoFileName {
    let label = normalize_label(&record.label_text);
    let id = sanitize_component(&record.instance_id);
    if label.is_empty() {
        format!("{}_{}.{}", record.source.tag(), id, VIDEO_EXT)
    } else {
        format!("{}_{}_{}.{}", record.source.tag(), id, label, VIDEO_EXT)
    }
}

/// Keep filename components portable: alphanumerics, dash, underscore.
fn sanitize_component(raw: &str) -> String {
    raw.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '-'
            }
        })
        .collect()
}

fn disambiguate(base: &str, taken: &IndexMap<VideoFileName, RecordKey>) -> VideoFileName {
    let stem = base.strip_suffix(&format!(".{VIDEO_EXT}")).unwrap_or(base);
    let mut counter = 2;
    loop {
        let candidate = format!("{stem}_{counter}.{VIDEO_EXT}");
        if !taken.contains_key(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

fn instruction_for(record: &InstanceRecord) -> Result<ProcessingInstruction, ReconcileError> {
    let trim = record.span.map(|span| match record.fps {
        Some(fps) if fps > 0.0 => TrimSpec::Frames {
            start_frame: (span.start_secs * fps).round() as u64,
            end_frame: (span.end_secs * fps).round() as u64,
        },
        _ => TrimSpec::Seconds {
            start_secs: span.start_secs,
            end_secs: span.end_secs,
        },
    });

    match (&record.video_ref, trim) {
        (SourceVideoRef::LocalFile(path), None) => Ok(ProcessingInstruction::CopyLocal {
            path: path.clone(),
        }),
        (SourceVideoRef::LocalFile(path), Some(trim)) => Ok(ProcessingInstruction::TrimLocal {
            path: path.clone(),
            trim,
        }),
        (SourceVideoRef::Unfetched, trim) => {
            let url = record.url.clone().ok_or_else(|| {
                ReconcileError::Configuration(format!(
                    "record {} has no local bytes and no url to fetch from",
                    record.key()
                ))
            })?;
            Ok(match trim {
                None => ProcessingInstruction::Fetch { url },
                Some(trim) => ProcessingInstruction::FetchThenTrim { url, trim },
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{SourceDataset, TimeSpan};
    use crate::splits::SplitLabel;
    use std::path::PathBuf;

    fn record(
        source: SourceDataset,
        id: &str,
        label: &str,
        span: Option<TimeSpan>,
        fps: Option<f64>,
        video_ref: SourceVideoRef,
    ) -> InstanceRecord {
        InstanceRecord {
            instance_id: id.to_string(),
            source,
            label_text: label.to_string(),
            url: Some(format!("https://v/{id}")),
            span,
            fps,
            original_split: SplitLabel::Train,
            video_ref,
        }
    }

    fn all_surviving(records: &[InstanceRecord]) -> IndexMap<RecordKey, Disposition> {
        records
            .iter()
            .map(|r| (r.key(), Disposition::KeepOriginal))
            .collect()
    }

    #[test]
    fn filenames_combine_source_id_and_label() {
        let records = vec![record(
            SourceDataset::Wlasl,
            "69241",
            "Deaf School",
            None,
            None,
            SourceVideoRef::Unfetched,
        )];
        let plan =
            assign_filenames(&records, &all_surviving(&records), &ReconcileConfig::default())
                .unwrap();
        assert_eq!(
            plan.filename_for("wlasl::69241").map(String::as_str),
            Some("wlasl_69241_deaf_school.mp4")
        );
        assert!(plan.renames.is_empty());
    }

    #[test]
    fn discarded_records_get_no_filename() {
        let records = vec![
            record(
                SourceDataset::Wlasl,
                "a1",
                "cat",
                None,
                None,
                SourceVideoRef::Unfetched,
            ),
            record(
                SourceDataset::Msasl,
                "b1",
                "cat",
                None,
                None,
                SourceVideoRef::Unfetched,
            ),
        ];
        let mut dispositions = all_surviving(&records);
        dispositions.insert("msasl::b1".to_string(), Disposition::DiscardDuplicate);
        let plan =
            assign_filenames(&records, &dispositions, &ReconcileConfig::default()).unwrap();
        assert_eq!(plan.outputs.len(), 1);
        assert!(plan.filename_for("msasl::b1").is_none());
    }

    #[test]
    fn sanitization_collisions_repair_with_counter_suffix() {
        // Ids differ only in a character that sanitizes to '-'.
        let records = vec![
            record(
                SourceDataset::Msasl,
                "clip.1",
                "cat",
                None,
                None,
                SourceVideoRef::Unfetched,
            ),
            record(
                SourceDataset::Msasl,
                "clip/1",
                "cat",
                None,
                None,
                SourceVideoRef::Unfetched,
            ),
        ];
        let plan =
            assign_filenames(&records, &all_surviving(&records), &ReconcileConfig::default())
                .unwrap();
        let names: Vec<&str> = plan
            .outputs
            .iter()
            .map(|output| output.filename.as_str())
            .collect();
        assert_eq!(
            names,
            vec!["msasl_clip-1_cat.mp4", "msasl_clip-1_cat_2.mp4"]
        );
        assert_eq!(plan.renames.len(), 1);
        assert_eq!(plan.renames[0].contested, "msasl_clip-1_cat.mp4");
    }

    #[test]
    fn collisions_fail_when_repair_is_disabled() {
        let records = vec![
            record(
                SourceDataset::Msasl,
                "clip.1",
                "cat",
                None,
                None,
                SourceVideoRef::Unfetched,
            ),
            record(
                SourceDataset::Msasl,
                "clip/1",
                "cat",
                None,
                None,
                SourceVideoRef::Unfetched,
            ),
        ];
        let config = ReconcileConfig {
            repair_collisions: false,
            ..ReconcileConfig::default()
        };
        let err = assign_filenames(&records, &all_surviving(&records), &config).unwrap_err();
        assert!(matches!(err, ReconcileError::FilenameCollision { .. }));
    }

    #[test]
    fn frame_trims_round_from_seconds_when_fps_is_known() {
        let records = vec![record(
            SourceDataset::Msasl,
            "b1",
            "cat",
            Some(TimeSpan {
                start_secs: 1.0,
                end_secs: 2.5,
            }),
            Some(29.97),
            SourceVideoRef::Unfetched,
        )];
        let plan =
            assign_filenames(&records, &all_surviving(&records), &ReconcileConfig::default())
                .unwrap();
        match &plan.outputs[0].instruction {
            ProcessingInstruction::FetchThenTrim {
                trim: TrimSpec::Frames {
                    start_frame,
                    end_frame,
                },
                ..
            } => {
                assert_eq!(*start_frame, 30);
                assert_eq!(*end_frame, 75);
            }
            other => panic!("unexpected instruction: {other:?}"),
        }
    }

    #[test]
    fn local_whole_video_copies_and_local_segment_trims() {
        let records = vec![
            record(
                SourceDataset::Wlasl,
                "a1",
                "cat",
                None,
                None,
                SourceVideoRef::LocalFile(PathBuf::from("videos/a1.mp4")),
            ),
            record(
                SourceDataset::Wlasl,
                "a2",
                "dog",
                Some(TimeSpan {
                    start_secs: 0.5,
                    end_secs: 1.5,
                }),
                None,
                SourceVideoRef::LocalFile(PathBuf::from("videos/a2.mp4")),
            ),
        ];
        let plan =
            assign_filenames(&records, &all_surviving(&records), &ReconcileConfig::default())
                .unwrap();
        assert!(matches!(
            plan.outputs[0].instruction,
            ProcessingInstruction::CopyLocal { .. }
        ));
        assert!(matches!(
            plan.outputs[1].instruction,
            ProcessingInstruction::TrimLocal {
                trim: TrimSpec::Seconds { .. },
                ..
            }
        ));
    }

    #[test]
    fn unfetched_record_without_url_is_rejected() {
        let mut rec = record(
            SourceDataset::Msasl,
            "b1",
            "cat",
            None,
            None,
            SourceVideoRef::Unfetched,
        );
        rec.url = None;
        let records = vec![rec];
        let err = assign_filenames(&records, &all_surviving(&records), &ReconcileConfig::default())
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Configuration(_)));
    }
}
