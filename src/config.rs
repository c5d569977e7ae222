use crate::constants::overlap::{
    DEFAULT_AMBIGUITY_MARGIN, DEFAULT_LABEL_SIMILARITY_THRESHOLD, DEFAULT_TIME_TOLERANCE_SECS,
};
use crate::constants::splits::DEFAULT_REBALANCE_SLACK;
use crate::errors::ReconcileError;
use crate::splits::SplitRatios;

/// Top-level reconciliation configuration.
#[derive(Clone, Debug)]
pub struct ReconcileConfig {
    /// RNG seed driving Rule-3 selection; identical inputs and seed reproduce
    /// the output bit for bit.
    pub seed: u64,
    /// Target split ratios for rebalancing.
    pub ratios: SplitRatios,
    /// Tolerance (seconds) for exact-duplicate duration matching.
    pub time_tolerance_secs: f64,
    /// Jaro-Winkler similarity below which shared-URL labels count as
    /// distinct content.
    pub label_similarity_threshold: f64,
    /// Margin around either threshold inside which the resolver flags the
    /// entry for manual audit.
    pub ambiguity_margin: f64,
    /// Keep each label's representation across splits proportional during
    /// rebalancing.
    pub stratify_by_label: bool,
    /// Allowed deviation of a split's share from its target before
    /// rebalancing moves records.
    pub rebalance_slack: f64,
    /// Abort on the first overlap entry referencing a missing record instead
    /// of aggregating it into the report.
    pub strict_references: bool,
    /// Repair filename collisions with a deterministic counter suffix instead
    /// of failing.
    pub repair_collisions: bool,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            ratios: SplitRatios::default(),
            time_tolerance_secs: DEFAULT_TIME_TOLERANCE_SECS,
            label_similarity_threshold: DEFAULT_LABEL_SIMILARITY_THRESHOLD,
            ambiguity_margin: DEFAULT_AMBIGUITY_MARGIN,
            stratify_by_label: true,
            rebalance_slack: DEFAULT_REBALANCE_SLACK,
            strict_references: false,
            repair_collisions: true,
        }
    }
}

impl ReconcileConfig {
    /// Validate ratios and threshold ranges.
    pub fn validated(self) -> Result<Self, ReconcileError> {
        self.ratios.normalized()?;
        if self.time_tolerance_secs < 0.0 {
            return Err(ReconcileError::Configuration(
                "time tolerance must be non-negative".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.label_similarity_threshold) {
            return Err(ReconcileError::Configuration(
                "label similarity threshold must be within [0, 1]".to_string(),
            ));
        }
        if self.ambiguity_margin < 0.0 {
            return Err(ReconcileError::Configuration(
                "ambiguity margin must be non-negative".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.rebalance_slack) {
            return Err(ReconcileError::Configuration(
                "rebalance slack must be within [0, 1)".to_string(),
            ));
        }
        Ok(self)
    }
}
