//! Reconciliation driver: dispositions, filenames, final splits, output rows.

use std::collections::HashSet;
use std::hash::Hash;

use indexmap::IndexMap;
use tracing::info;

use crate::config::ReconcileConfig;
use crate::data::{InstanceRecord, MetadataRow, OverlapEntry, RecordKey};
use crate::errors::ReconcileError;
use crate::filename::{FilenamePlan, PlannedOutput, RenameNote, assign_filenames};
use crate::hash::stable_hash_with;
use crate::metrics::SplitBalance;
use crate::overlap::{AmbiguityFlag, DiscardEntry, MissingReference, resolve_overlaps};
use crate::splits::{RatioWarning, SplitLabel, SplitRatios, assign_final_splits};

/// Summary numbers the orchestrator logs after a run.
#[derive(Clone, Debug)]
pub struct Diagnostics {
    /// Records consumed from both corpora.
    pub total_records: usize,
    /// Records discarded as exact duplicates.
    pub discarded_duplicates: usize,
    /// Records that reached the output.
    pub survivors: usize,
    /// Records locked by URL-group conflicts.
    pub locked: usize,
    /// Records moved train → validation during rebalancing.
    pub moved_to_validation: usize,
    /// Records moved train → test during rebalancing.
    pub moved_to_test: usize,
    /// Ratio that was asked for.
    pub target: SplitRatios,
    /// Balance actually reached.
    pub achieved: SplitBalance,
}

/// Everything a run produces: the final rows, per-record materialization
/// plans, and every report the operator should see.
#[derive(Clone, Debug)]
pub struct ReconcileOutput {
    /// Final metadata rows, stably sorted by instance key.
    pub rows: Vec<MetadataRow>,
    /// Materialization plan per surviving record, same order as `rows`.
    pub plans: Vec<PlannedOutput>,
    /// Every discarded record with its reason.
    pub discards: Vec<DiscardEntry>,
    /// Borderline overlap classifications for manual audit.
    pub ambiguities: Vec<AmbiguityFlag>,
    /// Overlap entries that referenced missing records.
    pub missing: Vec<MissingReference>,
    /// Filename collision repairs.
    pub renames: Vec<RenameNote>,
    /// Present when the target ratio was unreachable.
    pub ratio_warning: Option<RatioWarning>,
    /// Summary counters.
    pub diagnostics: Diagnostics,
}

/// Pure reconciliation engine over the two normalized record collections.
#[derive(Clone, Debug)]
pub struct Reconciler {
    config: ReconcileConfig,
}

impl Reconciler {
    /// Build an engine from a validated configuration.
    pub fn new(config: ReconcileConfig) -> Result<Self, ReconcileError> {
        Ok(Self {
            config: config.validated()?,
        })
    }

    /// Run the full reconciliation: resolve overlaps, assign filenames,
    /// assign leak-free final splits, and build the output rows.
    ///
    /// Deterministic: identical inputs and seed yield identical output,
    /// rows stably sorted by instance key.
    pub fn run(
        &self,
        wlasl: &[InstanceRecord],
        msasl: &[InstanceRecord],
        entries: &[OverlapEntry],
    ) -> Result<ReconcileOutput, ReconcileError> {
        ensure_unique_within_source(wlasl)?;
        ensure_unique_within_source(msasl)?;

        let overlap = resolve_overlaps(wlasl, msasl, entries, &self.config)?;

        let mut survivors: Vec<InstanceRecord> = wlasl
            .iter()
            .chain(msasl.iter())
            .filter(|record| {
                overlap
                    .dispositions
                    .get(&record.key())
                    .map(|disposition| disposition.survives())
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        survivors.sort_by_key(|record| record.key());

        let plan = assign_filenames(&survivors, &overlap.dispositions, &self.config)?;
        let splits = assign_final_splits(&survivors, entries, &self.config);

        let rows = build_rows(&survivors, &plan, &splits.assignments)?;
        let diagnostics = Diagnostics {
            total_records: wlasl.len() + msasl.len(),
            discarded_duplicates: overlap.discards.len(),
            survivors: survivors.len(),
            locked: splits.locked.len(),
            moved_to_validation: splits.moved_to_validation,
            moved_to_test: splits.moved_to_test,
            target: self.config.ratios,
            achieved: splits.achieved.clone(),
        };
        info!(
            total = diagnostics.total_records,
            discarded = diagnostics.discarded_duplicates,
            survivors = diagnostics.survivors,
            moved = splits.moved_total(),
            "reconciliation complete"
        );

        Ok(ReconcileOutput {
            rows,
            plans: plan.outputs,
            discards: overlap.discards,
            ambiguities: overlap.ambiguities,
            missing: overlap.missing,
            renames: plan.renames,
            ratio_warning: splits.ratio_warning,
            diagnostics,
        })
    }
}

fn ensure_unique_within_source(records: &[InstanceRecord]) -> Result<(), ReconcileError> {
    let mut seen = HashSet::with_capacity(records.len());
    for record in records {
        if !seen.insert(record.instance_id.as_str()) {
            return Err(ReconcileError::Configuration(format!(
                "duplicate instance id '{}' within {}",
                record.instance_id, record.source
            )));
        }
    }
    Ok(())
}

fn build_rows(
    survivors: &[InstanceRecord],
    plan: &FilenamePlan,
    assignments: &IndexMap<RecordKey, SplitLabel>,
) -> Result<Vec<MetadataRow>, ReconcileError> {
    let by_key: std::collections::HashMap<RecordKey, &InstanceRecord> = survivors
        .iter()
        .map(|record| (record.key(), record))
        .collect();
    let mut rows = Vec::with_capacity(plan.outputs.len());
    for output in &plan.outputs {
        let record = *by_key.get(&output.key).ok_or_else(|| {
            ReconcileError::Configuration(format!(
                "planned output '{}' has no surviving record",
                output.key
            ))
        })?;
        let final_split = assignments.get(&output.key).copied().ok_or_else(|| {
            ReconcileError::Configuration(format!(
                "surviving record '{}' has no final split",
                output.key
            ))
        })?;
        rows.push(MetadataRow {
            instance_id: output.key.clone(),
            source_dataset: record.source,
            label_text: record.label_text.clone(),
            video_filename: output.filename.clone(),
            final_split,
            url: record.url.clone(),
        });
    }
    Ok(rows)
}

/// Order-sensitive fingerprint of an output row collection; equal inputs and
/// seed reproduce the same value.
pub fn output_fingerprint(rows: &[MetadataRow]) -> u64 {
    stable_hash_with(|hasher| {
        for row in rows {
            row.instance_id.hash(hasher);
            row.source_dataset.tag().hash(hasher);
            row.label_text.hash(hasher);
            row.video_filename.hash(hasher);
            row.final_split.to_string().hash(hasher);
            row.url.hash(hasher);
        }
    })
}
