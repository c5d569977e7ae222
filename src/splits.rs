use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use indexmap::IndexMap;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ReconcileConfig;
use crate::constants::splits::{
    DEFAULT_TEST_RATIO, DEFAULT_TRAIN_RATIO, DEFAULT_VALIDATION_RATIO,
};
use crate::data::{InstanceRecord, OverlapEntry, RecordKey};
use crate::errors::ReconcileError;
use crate::metrics::{SplitBalance, split_balance};
use crate::normalize::normalize_label;
use crate::types::CanonicalLabel;

/// Logical dataset partitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SplitLabel {
    /// Training split.
    #[serde(rename = "train")]
    Train,
    /// Validation split.
    #[serde(rename = "val")]
    Validation,
    /// Test split.
    #[serde(rename = "test")]
    Test,
}

impl SplitLabel {
    /// Strictness used for URL-group conflict resolution: test > val > train.
    fn strictness(self) -> u8 {
        match self {
            SplitLabel::Train => 0,
            SplitLabel::Validation => 1,
            SplitLabel::Test => 2,
        }
    }

    /// The stricter of two splits.
    pub fn strictest(a: SplitLabel, b: SplitLabel) -> SplitLabel {
        if b.strictness() > a.strictness() { b } else { a }
    }
}

impl fmt::Display for SplitLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SplitLabel::Train => write!(f, "train"),
            SplitLabel::Validation => write!(f, "val"),
            SplitLabel::Test => write!(f, "test"),
        }
    }
}

/// Ratio configuration for train/validation/test assignment.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SplitRatios {
    /// Fraction assigned to train.
    pub train: f32,
    /// Fraction assigned to validation.
    pub validation: f32,
    /// Fraction assigned to test.
    pub test: f32,
}

impl Default for SplitRatios {
    fn default() -> Self {
        Self {
            train: DEFAULT_TRAIN_RATIO,
            validation: DEFAULT_VALIDATION_RATIO,
            test: DEFAULT_TEST_RATIO,
        }
    }
}

impl SplitRatios {
    /// Validate that ratios are non-negative and sum to `1.0` (within epsilon).
    pub fn normalized(self) -> Result<Self, ReconcileError> {
        if self.train < 0.0 || self.validation < 0.0 || self.test < 0.0 {
            return Err(ReconcileError::Configuration(
                "split ratios must be non-negative".to_string(),
            ));
        }
        let sum = self.train + self.validation + self.test;
        if (sum - 1.0).abs() > 1e-6 {
            return Err(ReconcileError::Configuration(
                "split ratios must sum to 1.0".to_string(),
            ));
        }
        Ok(self)
    }

    /// Target share for one split.
    pub fn share(self, label: SplitLabel) -> f32 {
        match label {
            SplitLabel::Train => self.train,
            SplitLabel::Validation => self.validation,
            SplitLabel::Test => self.test,
        }
    }
}

#[derive(Debug, Clone)]
/// Small deterministic RNG (splitmix64) for reproducible rebalancing.
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64_internal(&mut self) -> u64 {
        let mut z = self.state.wrapping_add(0x9E3779B97F4A7C15);
        self.state = z;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
        z ^ (z >> 31)
    }
}

impl rand::RngCore for DeterministicRng {
    fn next_u32(&mut self) -> u32 {
        self.next_u64_internal() as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.next_u64_internal()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        let mut offset = 0;
        while offset < dest.len() {
            let value = self.next_u64_internal();
            let bytes = value.to_le_bytes();
            let remaining = dest.len() - offset;
            let copy_len = remaining.min(bytes.len());
            dest[offset..offset + copy_len].copy_from_slice(&bytes[..copy_len]);
            offset += copy_len;
        }
    }
}

/// Emitted when locked records prevent reaching the target ratio.
#[derive(Clone, Debug)]
pub struct RatioWarning {
    /// Ratio that was asked for.
    pub target: SplitRatios,
    /// Best balance rebalancing could reach without touching locked records.
    pub achieved: SplitBalance,
}

/// Final split per surviving record plus rebalancing diagnostics.
#[derive(Clone, Debug)]
pub struct SplitOutcome {
    /// Final split keyed by record, in input order.
    pub assignments: IndexMap<RecordKey, SplitLabel>,
    /// Records locked by a URL-group conflict; never touched by rebalancing.
    pub locked: HashSet<RecordKey>,
    /// Records moved train → validation by rebalancing.
    pub moved_to_validation: usize,
    /// Records moved train → test by rebalancing.
    pub moved_to_test: usize,
    /// Balance after rebalancing.
    pub achieved: SplitBalance,
    /// Present when the target ratio was unreachable.
    pub ratio_warning: Option<RatioWarning>,
}

impl SplitOutcome {
    /// Total records moved by rebalancing.
    pub fn moved_total(&self) -> usize {
        self.moved_to_validation + self.moved_to_test
    }
}

/// Assign every surviving record exactly one final split.
///
/// A URL-group whose members disagree on their original split is forced
/// whole onto the strictest member split and locked; everyone else inherits
/// their own original split. Rebalancing then moves unlocked train records
/// (seeded, optionally label-stratified) to whichever of validation and
/// test sits furthest below its target share, until every share is within
/// `rebalance_slack` of target or no eligible record remains.
///
/// Movement is one-directional: locked records never move, nothing ever
/// moves back into train, and no member of a multi-record URL-group moves at
/// all, so overlapping content can never be separated across splits.
pub fn assign_final_splits(
    survivors: &[InstanceRecord],
    entries: &[OverlapEntry],
    config: &ReconcileConfig,
) -> SplitOutcome {
    let groups = url_groups(survivors, entries);

    let mut assignments: IndexMap<RecordKey, SplitLabel> = survivors
        .iter()
        .map(|record| (record.key(), record.original_split))
        .collect();
    let mut locked: HashSet<RecordKey> = HashSet::new();
    // Members of any multi-record group are pinned: moving one member alone
    // would leak the shared video across splits, even when the group agrees
    // on its original split and carries no lock.
    let mut grouped: HashSet<RecordKey> = HashSet::new();

    for group in &groups {
        if group.len() > 1 {
            for &idx in group {
                grouped.insert(survivors[idx].key());
            }
        }
        let conflicting = group.len() > 1
            && group
                .iter()
                .any(|&idx| survivors[idx].original_split != survivors[group[0]].original_split);
        if !conflicting {
            continue;
        }
        let strictest = group
            .iter()
            .map(|&idx| survivors[idx].original_split)
            .fold(SplitLabel::Train, SplitLabel::strictest);
        for &idx in group {
            let key = survivors[idx].key();
            assignments.insert(key.clone(), strictest);
            locked.insert(key);
        }
        debug!(
            members = group.len(),
            split = %strictest,
            "url group locked to strictest split"
        );
    }

    rebalance(survivors, assignments, locked, grouped, config)
}

/// Group surviving record indices by shared video: same URL, or linked by an
/// overlap entry whose sides survived under different URL spellings.
fn url_groups(survivors: &[InstanceRecord], entries: &[OverlapEntry]) -> Vec<Vec<usize>> {
    let mut parent: Vec<usize> = (0..survivors.len()).collect();

    fn find(parent: &mut Vec<usize>, mut idx: usize) -> usize {
        while parent[idx] != idx {
            parent[idx] = parent[parent[idx]];
            idx = parent[idx];
        }
        idx
    }
    fn union(parent: &mut Vec<usize>, a: usize, b: usize) {
        let ra = find(parent, a);
        let rb = find(parent, b);
        if ra != rb {
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            parent[hi] = lo;
        }
    }

    let mut first_by_url: HashMap<&str, usize> = HashMap::new();
    let mut by_key: HashMap<RecordKey, usize> = HashMap::new();
    for (idx, record) in survivors.iter().enumerate() {
        by_key.insert(record.key(), idx);
        if let Some(url) = record.url.as_deref() {
            match first_by_url.get(url) {
                Some(&seen) => union(&mut parent, seen, idx),
                None => {
                    first_by_url.insert(url, idx);
                }
            }
        }
    }
    for entry in entries {
        if let Some(&a) = by_key.get(&entry.wlasl_key())
            && let Some(&b) = by_key.get(&entry.msasl_key())
        {
            union(&mut parent, a, b);
        }
    }

    let mut groups: IndexMap<usize, Vec<usize>> = IndexMap::new();
    for idx in 0..survivors.len() {
        let root = find(&mut parent, idx);
        groups.entry(root).or_default().push(idx);
    }
    groups.into_values().collect()
}

fn rebalance(
    survivors: &[InstanceRecord],
    mut assignments: IndexMap<RecordKey, SplitLabel>,
    locked: HashSet<RecordKey>,
    grouped: HashSet<RecordKey>,
    config: &ReconcileConfig,
) -> SplitOutcome {
    let total = survivors.len();
    let mut counts: HashMap<SplitLabel, usize> = HashMap::new();
    for label in assignments.values() {
        *counts.entry(*label).or_insert(0) += 1;
    }

    let empty_balance = SplitBalance {
        total: 0,
        per_split: Vec::new(),
    };
    if total == 0 {
        return SplitOutcome {
            assignments,
            locked,
            moved_to_validation: 0,
            moved_to_test: 0,
            achieved: empty_balance,
            ratio_warning: None,
        };
    }

    let mut queue = CandidateQueue::new(survivors, &assignments, &locked, &grouped, config);
    let target = config.ratios;
    let mut moved_to_validation = 0;
    let mut moved_to_test = 0;
    let mut ratio_warning = None;

    loop {
        let balance = match split_balance(&counts) {
            Some(balance) => balance,
            None => break,
        };
        if balance.max_deviation(target) <= config.rebalance_slack {
            break;
        }
        // max_by keeps the last maximal element, so listing test first makes
        // validation win exact deficit ties.
        let destination = [SplitLabel::Test, SplitLabel::Validation]
            .into_iter()
            .map(|label| (label, target.share(label) as f64 - balance.share(label)))
            .filter(|&(_, deficit)| deficit > 0.0)
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(label, _)| label);
        let Some(destination) = destination else {
            ratio_warning = Some(RatioWarning {
                target,
                achieved: balance,
            });
            break;
        };
        let Some(key) = queue.next() else {
            ratio_warning = Some(RatioWarning {
                target,
                achieved: balance,
            });
            break;
        };
        assignments.insert(key, destination);
        *counts.entry(SplitLabel::Train).or_insert(1) -= 1;
        *counts.entry(destination).or_insert(0) += 1;
        match destination {
            SplitLabel::Validation => moved_to_validation += 1,
            _ => moved_to_test += 1,
        }
    }

    let achieved = split_balance(&counts).unwrap_or(empty_balance);
    if let Some(warning) = &ratio_warning {
        debug!(
            target_train = warning.target.train,
            achieved_train = achieved.share(SplitLabel::Train),
            "target ratio unreachable with current locks"
        );
    }

    SplitOutcome {
        assignments,
        locked,
        moved_to_validation,
        moved_to_test,
        achieved,
        ratio_warning,
    }
}

/// Seeded, optionally label-stratified supply of movable train records.
///
/// Candidates are sorted by key before shuffling so the draw order depends
/// only on the seed and the surviving set, never on input order.
struct CandidateQueue {
    buckets: IndexMap<CanonicalLabel, VecDeque<RecordKey>>,
}

impl CandidateQueue {
    fn new(
        survivors: &[InstanceRecord],
        assignments: &IndexMap<RecordKey, SplitLabel>,
        locked: &HashSet<RecordKey>,
        grouped: &HashSet<RecordKey>,
        config: &ReconcileConfig,
    ) -> Self {
        let mut eligible: Vec<&InstanceRecord> = survivors
            .iter()
            .filter(|record| {
                let key = record.key();
                !locked.contains(&key)
                    && !grouped.contains(&key)
                    && assignments.get(&key).copied() == Some(SplitLabel::Train)
            })
            .collect();
        eligible.sort_by_key(|record| record.key());

        let mut keys: Vec<(CanonicalLabel, RecordKey)> = eligible
            .iter()
            .map(|record| {
                let label = if config.stratify_by_label {
                    normalize_label(&record.label_text)
                } else {
                    CanonicalLabel::new()
                };
                (label, record.key())
            })
            .collect();
        let mut rng = DeterministicRng::new(config.seed);
        keys.shuffle(&mut rng);

        let mut buckets: IndexMap<CanonicalLabel, VecDeque<RecordKey>> = IndexMap::new();
        for (label, key) in keys {
            buckets.entry(label).or_default().push_back(key);
        }
        buckets.sort_keys();
        Self { buckets }
    }

    /// Pop from the label with the most remaining candidates, so heavy labels
    /// shed records first and per-label shares stay roughly proportional.
    fn next(&mut self) -> Option<RecordKey> {
        let label = self
            .buckets
            .iter()
            .filter(|(_, queue)| !queue.is_empty())
            .max_by(|a, b| a.1.len().cmp(&b.1.len()).then_with(|| b.0.cmp(a.0)))
            .map(|(label, _)| label.clone())?;
        self.buckets.get_mut(&label)?.pop_front()
    }
}
