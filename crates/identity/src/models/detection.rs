//! Duplicate-detection domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stagelink_core::{DetectionLogId, DetectionType, UserId};

use super::UserSnapshot;

/// Outcome of a single duplicate-detection evaluation.
///
/// Ephemeral: returned to the caller and optionally persisted as a
/// [`DetectionLogEntry`] through the audit sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Whether the candidate is considered a duplicate of an existing user.
    pub is_duplicate: bool,
    /// The existing user the candidate matched, when flagged.
    pub matched_user_id: Option<UserId>,
    /// Combined similarity score in `[0, 1]`. `1.0` is reserved for exact
    /// case-insensitive email equality.
    pub similarity_score: f64,
    /// Human-readable composite of the triggered heuristics.
    pub reason: String,
}

impl DetectionResult {
    /// The negative outcome: no existing user resembles the candidate.
    #[must_use]
    pub fn no_match() -> Self {
        Self {
            is_duplicate: false,
            matched_user_id: None,
            similarity_score: 0.0,
            reason: String::new(),
        }
    }

    /// The exact-email short-circuit outcome.
    #[must_use]
    pub fn exact_match(matched: UserId) -> Self {
        Self {
            is_duplicate: true,
            matched_user_id: Some(matched),
            similarity_score: stagelink_core::similarity::EXACT_EMAIL_SCORE,
            reason: "Exact email match".to_owned(),
        }
    }
}

/// One batch-scan hit: a newer user flagged as a duplicate of an older one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateCandidate {
    /// The older account, canonical by convention.
    pub original: UserSnapshot,
    /// The newer account flagged as the duplicate.
    pub duplicate: UserSnapshot,
    /// Combined similarity score in `[0, 1]`.
    pub similarity_score: f64,
    /// Every heuristic that triggered for this pair.
    pub reasons: Vec<String>,
}

/// Append-only record of one detection evaluation.
///
/// Never mutated except to flip `resolved` when a merge consumes it.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DetectionLogEntry {
    /// Database ID of this entry.
    pub id: DetectionLogId,
    /// Canonical email of the evaluated candidate.
    pub normalized_email: String,
    /// What triggered the evaluation.
    pub detection_type: DetectionType,
    /// The evaluated user, when it already exists (scans); `None` for
    /// registration attempts where no account has been created yet.
    pub candidate_user_id: Option<UserId>,
    /// The existing user the candidate matched, if any.
    pub matched_user_id: Option<UserId>,
    /// Combined similarity score.
    pub similarity_score: f64,
    /// Human-readable composite of the triggered heuristics.
    pub reason: String,
    /// Whether a merge has consumed this detection.
    pub resolved: bool,
    /// How the detection was resolved (e.g. `MERGED`).
    pub resolution_action: Option<String>,
    /// When the evaluation ran.
    pub created_at: DateTime<Utc>,
    /// When the entry was last touched (resolution flip only).
    pub updated_at: DateTime<Utc>,
}

/// Insert form of a [`DetectionLogEntry`].
#[derive(Debug, Clone)]
pub struct NewDetectionLogEntry {
    /// Canonical email of the evaluated candidate.
    pub normalized_email: String,
    /// What triggered the evaluation.
    pub detection_type: DetectionType,
    /// The evaluated user, when it already exists.
    pub candidate_user_id: Option<UserId>,
    /// The existing user the candidate matched, if any.
    pub matched_user_id: Option<UserId>,
    /// Combined similarity score.
    pub similarity_score: f64,
    /// Human-readable composite of the triggered heuristics.
    pub reason: String,
}

impl NewDetectionLogEntry {
    /// Build a log entry from a detection outcome.
    #[must_use]
    pub fn from_result(
        normalized_email: String,
        detection_type: DetectionType,
        candidate_user_id: Option<UserId>,
        result: &DetectionResult,
    ) -> Self {
        Self {
            normalized_email,
            detection_type,
            candidate_user_id,
            matched_user_id: result.matched_user_id,
            similarity_score: result.similarity_score,
            reason: result.reason.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_match_is_zero_scored() {
        let result = DetectionResult::no_match();
        assert!(!result.is_duplicate);
        assert!(result.matched_user_id.is_none());
        assert!(result.similarity_score.abs() < f64::EPSILON);
    }

    #[test]
    fn test_exact_match_is_full_score() {
        let id = UserId::generate();
        let result = DetectionResult::exact_match(id);
        assert!(result.is_duplicate);
        assert_eq!(result.matched_user_id, Some(id));
        assert!((result.similarity_score - 1.0).abs() < f64::EPSILON);
        assert_eq!(result.reason, "Exact email match");
    }
}
