//! Domain types for the identity engine.
//!
//! These types represent validated domain objects separate from raw
//! database rows. Detection and merge artifacts serialize with `serde`
//! so they can land in JSON reports and JSONB audit snapshots.

mod detection;
mod merge;
mod user;

pub use detection::{
    DetectionLogEntry, DetectionResult, DuplicateCandidate, NewDetectionLogEntry,
};
pub use merge::{MergeDataCounts, MergePreview, MergeRecord, MergeRequest, UserSnapshot};
pub use user::{Identity, OrganizerProfile, TalentProfile, User, UserIdentity};
