//! Merge execution: the atomic, irreversible account consolidation.
//!
//! Everything happens inside one database transaction: FK rewrites,
//! profile reconciliation, audit artifacts, and the final delete of the
//! duplicate. Any failure rolls the whole transaction back - a partially
//! merged identity must never be observable.

use sqlx::PgPool;
use thiserror::Error;

use stagelink_core::UserId;

use crate::db::{RepositoryError, audit, profiles, relations, users};
use crate::models::{MergeRequest, OrganizerProfile, TalentProfile, User};

/// Errors from merge preview and execution.
#[derive(Debug, Error)]
pub enum MergeError {
    /// Referenced user id does not exist.
    #[error("user not found: {0}")]
    NotFound(UserId),

    /// Attempted to merge a user into itself.
    #[error("cannot merge a user into itself")]
    SelfMerge,

    /// The merge transaction failed and was rolled back.
    #[error("merge transaction failed: {0}")]
    Transaction(#[from] RepositoryError),
}

/// Performs atomic account merges.
pub struct MergeExecutor {
    pool: PgPool,
    audit_enabled: bool,
}

impl MergeExecutor {
    /// Create an executor.
    ///
    /// `audit_enabled` mirrors the audit-sink capability chosen at engine
    /// construction; when set, the merge record and detection-log
    /// resolution are written inside the merge transaction.
    #[must_use]
    pub const fn new(pool: PgPool, audit_enabled: bool) -> Self {
        Self { pool, audit_enabled }
    }

    /// Merge one account into another and delete the duplicate.
    ///
    /// Re-validates existence under row locks, rewrites every registered
    /// user FK from the merged account to the primary, reconciles role
    /// profiles with a fill-gaps policy, records the audit artifacts when
    /// enabled, deletes the merged user, and commits.
    ///
    /// Not idempotent by id: once the merged user is gone, a second call
    /// fails with `NotFound`. Safe to retry after a failed attempt since
    /// nothing partial persists.
    ///
    /// # Errors
    ///
    /// `MergeError::SelfMerge` when both ids are equal,
    /// `MergeError::NotFound` when either user is missing, and
    /// `MergeError::Transaction` for any storage failure (after rollback).
    pub async fn merge(&self, request: &MergeRequest) -> Result<(), MergeError> {
        if request.primary_id == request.merged_id {
            return Err(MergeError::SelfMerge);
        }

        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        let primary = users::fetch_for_update(&mut tx, request.primary_id)
            .await?
            .ok_or(MergeError::NotFound(request.primary_id))?;
        let merged = users::fetch_for_update(&mut tx, request.merged_id)
            .await?
            .ok_or(MergeError::NotFound(request.merged_id))?;

        // Snapshot what is about to move while the rows still point at the
        // merged user.
        let data_to_merge = if self.audit_enabled {
            Some(relations::counts_for_user_tx(&mut tx, request.merged_id).await?)
        } else {
            None
        };

        let rewritten =
            relations::rewrite_user_references(&mut tx, request.merged_id, request.primary_id)
                .await?;

        reconcile_profiles(&mut tx, &primary, &merged).await?;

        if let Some(counts) = &data_to_merge {
            audit::insert_merge_record(&mut tx, request, &primary, &merged, counts).await?;
            audit::resolve_detections_for_pair(
                &mut tx,
                request.primary_id,
                request.merged_id,
                &merged.email.normalized(),
            )
            .await?;
        }

        users::delete_user(&mut tx, request.merged_id).await?;

        tx.commit().await.map_err(RepositoryError::from)?;

        tracing::info!(
            primary = %request.primary_id,
            merged = %request.merged_id,
            rows = rewritten,
            merge_type = %request.merge_type,
            "Merged duplicate account"
        );

        Ok(())
    }
}

/// Move or reconcile the role-specific profiles of the two accounts.
///
/// A profile kind only the merged user owns is re-pointed to the primary.
/// When both own the same kind, the primary's profile absorbs the merged
/// one field-by-field (fill gaps) and the merged profile row is deleted.
async fn reconcile_profiles(
    conn: &mut sqlx::PgConnection,
    primary: &User,
    merged: &User,
) -> Result<(), RepositoryError> {
    let primary_talent = profiles::talent_profile(conn, primary.id).await?;
    let merged_talent = profiles::talent_profile(conn, merged.id).await?;
    match (primary_talent, merged_talent) {
        (None, Some(theirs)) => {
            profiles::repoint_talent_profile(conn, theirs.id, primary.id).await?;
        }
        (Some(ours), Some(theirs)) => {
            let reconciled = fill_talent_gaps(ours, &theirs);
            profiles::update_talent_profile(conn, &reconciled).await?;
            profiles::delete_talent_profile(conn, theirs.id).await?;
        }
        _ => {}
    }

    let primary_organizer = profiles::organizer_profile(conn, primary.id).await?;
    let merged_organizer = profiles::organizer_profile(conn, merged.id).await?;
    match (primary_organizer, merged_organizer) {
        (None, Some(theirs)) => {
            profiles::repoint_organizer_profile(conn, theirs.id, primary.id).await?;
        }
        (Some(ours), Some(theirs)) => {
            let reconciled = fill_organizer_gaps(ours, &theirs);
            profiles::update_organizer_profile(conn, &reconciled).await?;
            profiles::delete_organizer_profile(conn, theirs.id).await?;
        }
        _ => {}
    }

    Ok(())
}

/// Fill-gaps policy for scalar fields: keep the primary's value unless it
/// is empty, then take the merged user's. Pure.
fn fill_scalar(ours: Option<String>, theirs: &Option<String>) -> Option<String> {
    match ours {
        Some(v) if !v.trim().is_empty() => Some(v),
        _ => theirs.clone(),
    }
}

/// Fill-gaps policy for array fields: keep the merged user's array only
/// when it is strictly longer. Pure.
fn fill_array(ours: Vec<String>, theirs: &[String]) -> Vec<String> {
    if theirs.len() > ours.len() {
        theirs.to_vec()
    } else {
        ours
    }
}

fn fill_talent_gaps(ours: TalentProfile, theirs: &TalentProfile) -> TalentProfile {
    TalentProfile {
        phone: fill_scalar(ours.phone, &theirs.phone),
        bio: fill_scalar(ours.bio, &theirs.bio),
        location: fill_scalar(ours.location, &theirs.location),
        skills: fill_array(ours.skills, &theirs.skills),
        ..ours
    }
}

fn fill_organizer_gaps(ours: OrganizerProfile, theirs: &OrganizerProfile) -> OrganizerProfile {
    OrganizerProfile {
        phone: fill_scalar(ours.phone, &theirs.phone),
        company_name: fill_scalar(ours.company_name, &theirs.company_name),
        location: fill_scalar(ours.location, &theirs.location),
        event_types: fill_array(ours.event_types, &theirs.event_types),
        ..ours
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use stagelink_core::ProfileId;

    use super::*;

    fn talent(phone: Option<&str>, bio: Option<&str>, skills: &[&str]) -> TalentProfile {
        TalentProfile {
            id: ProfileId::generate(),
            user_id: UserId::generate(),
            phone: phone.map(str::to_owned),
            bio: bio.map(str::to_owned),
            location: None,
            skills: skills.iter().map(|s| (*s).to_owned()).collect(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_fill_scalar_prefers_primary() {
        assert_eq!(
            fill_scalar(Some("ours".into()), &Some("theirs".into())),
            Some("ours".into())
        );
    }

    #[test]
    fn test_fill_scalar_takes_merged_when_empty() {
        assert_eq!(
            fill_scalar(None, &Some("theirs".into())),
            Some("theirs".into())
        );
        assert_eq!(
            fill_scalar(Some("  ".into()), &Some("theirs".into())),
            Some("theirs".into())
        );
    }

    #[test]
    fn test_fill_array_strictly_longer_wins() {
        let ours = vec!["vocals".to_owned()];
        let theirs = vec!["vocals".to_owned(), "dj".to_owned()];
        assert_eq!(fill_array(ours.clone(), &theirs), theirs);

        // Equal length keeps ours.
        let same_len = vec!["mc".to_owned()];
        assert_eq!(fill_array(ours.clone(), &same_len), ours);
    }

    #[test]
    fn test_fill_talent_gaps_keeps_identity_fields() {
        let ours = talent(None, Some("Original bio"), &["vocals"]);
        let ours_id = ours.id;
        let ours_user = ours.user_id;
        let theirs = talent(Some("+254700000000"), Some("Other bio"), &["dj", "mc"]);

        let reconciled = fill_talent_gaps(ours, &theirs);
        assert_eq!(reconciled.id, ours_id);
        assert_eq!(reconciled.user_id, ours_user);
        assert_eq!(reconciled.phone.as_deref(), Some("+254700000000"));
        assert_eq!(reconciled.bio.as_deref(), Some("Original bio"));
        assert_eq!(reconciled.skills, vec!["dj".to_owned(), "mc".to_owned()]);
    }
}
