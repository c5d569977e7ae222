use std::collections::HashMap;

use crate::constants::splits::ALL_SPLITS;
use crate::splits::{SplitLabel, SplitRatios};

/// Aggregate balance metrics for per-split record counts.
#[derive(Clone, Debug, PartialEq)]
pub struct SplitBalance {
    pub total: usize,
    pub per_split: Vec<SplitShare>,
}

/// One split's share of the surviving set.
#[derive(Clone, Debug, PartialEq)]
pub struct SplitShare {
    pub label: SplitLabel,
    pub count: usize,
    pub share: f64,
}

impl SplitBalance {
    /// Current count for `label` (0 when the split is empty).
    pub fn count(&self, label: SplitLabel) -> usize {
        self.per_split
            .iter()
            .find(|entry| entry.label == label)
            .map(|entry| entry.count)
            .unwrap_or(0)
    }

    /// Current share for `label` (0.0 when the split is empty).
    pub fn share(&self, label: SplitLabel) -> f64 {
        self.per_split
            .iter()
            .find(|entry| entry.label == label)
            .map(|entry| entry.share)
            .unwrap_or(0.0)
    }

    /// Largest absolute deviation of any split's share from its target.
    pub fn max_deviation(&self, target: SplitRatios) -> f64 {
        ALL_SPLITS
            .iter()
            .map(|&label| (self.share(label) - target.share(label) as f64).abs())
            .fold(0.0, f64::max)
    }
}

/// Compute balance metrics from per-split counts in canonical split order.
pub fn split_balance(counts: &HashMap<SplitLabel, usize>) -> Option<SplitBalance> {
    let total: usize = counts.values().sum();
    if total == 0 {
        return None;
    }
    let per_split = ALL_SPLITS
        .iter()
        .map(|&label| {
            let count = counts.get(&label).copied().unwrap_or(0);
            SplitShare {
                label,
                count,
                share: count as f64 / total as f64,
            }
        })
        .collect();
    Some(SplitBalance { total, per_split })
}
