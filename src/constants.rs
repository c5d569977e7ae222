use crate::splits::SplitLabel;

/// Constants used by overlap classification.
pub mod overlap {
    /// Default tolerance (seconds) when matching a segment boundary against
    /// the start or full duration of a video.
    pub const DEFAULT_TIME_TOLERANCE_SECS: f64 = 0.5;
    /// Default Jaro-Winkler similarity below which shared-URL labels are
    /// treated as distinct content.
    pub const DEFAULT_LABEL_SIMILARITY_THRESHOLD: f64 = 0.85;
    /// Default margin around a threshold inside which a classification is
    /// flagged for manual audit.
    pub const DEFAULT_AMBIGUITY_MARGIN: f64 = 0.05;
}

/// Constants used by split assignment and rebalancing.
pub mod splits {
    use super::SplitLabel;

    /// Default target share assigned to train.
    pub const DEFAULT_TRAIN_RATIO: f32 = 0.75;
    /// Default target share assigned to validation.
    pub const DEFAULT_VALIDATION_RATIO: f32 = 0.15;
    /// Default target share assigned to test.
    pub const DEFAULT_TEST_RATIO: f32 = 0.15;
    /// Default allowed deviation of a split's share from its target.
    pub const DEFAULT_REBALANCE_SLACK: f64 = 0.02;
    /// Canonical split iteration order; also the tie-break order when two
    /// destinations are equally far below target.
    pub const ALL_SPLITS: [SplitLabel; 3] =
        [SplitLabel::Train, SplitLabel::Validation, SplitLabel::Test];
}

/// Constants used by filename assignment and materialization planning.
pub mod filenames {
    /// Container extension for every output video.
    pub const VIDEO_EXT: &str = "mp4";
}

/// Constants used by output tables.
pub mod table {
    /// Column order of the final metadata table.
    pub const METADATA_COLUMNS: [&str; 6] = [
        "instance_id",
        "source_dataset",
        "label_text",
        "video_filename",
        "final_split",
        "url",
    ];
    /// Default filename for the metadata table.
    pub const METADATA_FILENAME: &str = "metadata.csv";
    /// Default filename for the discard report.
    pub const DISCARDS_FILENAME: &str = "discards.csv";
    /// Default filename for the processing status log.
    pub const PROCESSING_LOG_FILENAME: &str = "processing_log.csv";
}
