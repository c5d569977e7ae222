/// Instance identifier, unique within its source corpus.
/// Examples: `69241`, `msasl_003412`
pub type InstanceId = String;
/// Canonical video location shared by overlapping records.
/// Example: `https://www.youtube.com/watch?v=aXcVvT1mPcc`
pub type Url = String;
/// Gloss/word label attached to a video segment.
/// Examples: `book`, `Deaf School`, `cat`
pub type LabelText = String;
/// Canonical output filename assigned to a surviving record.
/// Example: `wlasl_69241_book.mp4`
pub type VideoFileName = String;
/// Normalized label used for filenames and similarity comparison.
/// Examples: `book`, `deaf_school`
pub type CanonicalLabel = String;
/// Reason text attached to discard-report entries.
/// Example: `exact duplicate of wlasl::69241`
pub type DiscardReason = String;
