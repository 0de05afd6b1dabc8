//! Audit repository: detection log and merge records.
//!
//! Both tables are purely additive apart from the `resolved` flip a merge
//! performs on detection-log rows it consumes.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use stagelink_core::{DetectionLogId, UserId};

use super::RepositoryError;
use crate::models::{DetectionLogEntry, MergeDataCounts, MergeRequest, NewDetectionLogEntry, User};

/// Repository for audit storage.
pub struct AuditRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AuditRepository<'a> {
    /// Create a new audit repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Append one detection evaluation to the log.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert_detection(
        &self,
        entry: &NewDetectionLogEntry,
    ) -> Result<DetectionLogId, RepositoryError> {
        let id: DetectionLogId = sqlx::query_scalar(
            r"
            INSERT INTO detection_log
                (normalized_email, detection_type, candidate_user_id,
                 matched_user_id, similarity_score, reason)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            ",
        )
        .bind(&entry.normalized_email)
        .bind(entry.detection_type)
        .bind(entry.candidate_user_id)
        .bind(entry.matched_user_id)
        .bind(entry.similarity_score)
        .bind(&entry.reason)
        .fetch_one(self.pool)
        .await?;

        Ok(id)
    }

    /// Registration-attempt detections at or above a score since a cutoff.
    ///
    /// Feeds the monitoring job's "duplicate signups in the last hour" view.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn registration_attempts_since(
        &self,
        since: DateTime<Utc>,
        min_score: f64,
    ) -> Result<Vec<DetectionLogEntry>, RepositoryError> {
        let entries = sqlx::query_as::<_, DetectionLogEntry>(
            r"
            SELECT id, normalized_email, detection_type, candidate_user_id,
                   matched_user_id, similarity_score, reason, resolved,
                   resolution_action, created_at, updated_at
            FROM detection_log
            WHERE detection_type = 'REGISTRATION_ATTEMPT'
              AND created_at >= $1
              AND similarity_score >= $2
            ORDER BY created_at DESC
            ",
        )
        .bind(since)
        .bind(min_score)
        .fetch_all(self.pool)
        .await?;

        Ok(entries)
    }

    /// Unresolved detections at or above a score, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn unresolved_above(
        &self,
        min_score: f64,
    ) -> Result<Vec<DetectionLogEntry>, RepositoryError> {
        let entries = sqlx::query_as::<_, DetectionLogEntry>(
            r"
            SELECT id, normalized_email, detection_type, candidate_user_id,
                   matched_user_id, similarity_score, reason, resolved,
                   resolution_action, created_at, updated_at
            FROM detection_log
            WHERE resolved = FALSE
              AND similarity_score >= $1
            ORDER BY created_at DESC
            ",
        )
        .bind(min_score)
        .fetch_all(self.pool)
        .await?;

        Ok(entries)
    }
}

// ---------------------------------------------------------------------------
// Transaction-scoped operations (merge execution)
// ---------------------------------------------------------------------------

/// Write the merge record inside the merge transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_merge_record(
    conn: &mut PgConnection,
    request: &MergeRequest,
    primary: &User,
    merged: &User,
    data_to_merge: &MergeDataCounts,
) -> Result<(), RepositoryError> {
    let snapshot = serde_json::to_value(data_to_merge)
        .map_err(|e| RepositoryError::DataCorruption(format!("merge snapshot: {e}")))?;

    sqlx::query(
        r"
        INSERT INTO merge_records
            (primary_user_id, merged_user_id, primary_email, merged_email,
             reason, merged_data, merge_type, performed_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ",
    )
    .bind(request.primary_id)
    .bind(request.merged_id)
    .bind(primary.email.as_str())
    .bind(merged.email.as_str())
    .bind(&request.reason)
    .bind(snapshot)
    .bind(request.merge_type)
    .bind(&request.performed_by)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Mark every detection-log row touching this pair as consumed by a merge.
///
/// Rows match when either user id appears on either side, or when the
/// logged email is the merged user's (registration attempts have no
/// candidate id).
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn resolve_detections_for_pair(
    conn: &mut PgConnection,
    primary_id: UserId,
    merged_id: UserId,
    merged_normalized_email: &str,
) -> Result<u64, RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE detection_log
        SET resolved = TRUE,
            resolution_action = 'MERGED',
            updated_at = NOW()
        WHERE resolved = FALSE
          AND (candidate_user_id IN ($1, $2)
               OR matched_user_id IN ($1, $2)
               OR normalized_email = $3)
        ",
    )
    .bind(primary_id)
    .bind(merged_id)
    .bind(merged_normalized_email)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}
