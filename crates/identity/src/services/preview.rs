//! Merge preview: read-only computation of what a merge would move.

use sqlx::PgPool;

use stagelink_core::UserId;

use crate::db::relations;
use crate::db::users::UserRepository;
use crate::models::{MergePreview, User};
use crate::services::merge::MergeError;

/// Computes merge previews without mutating anything.
pub struct MergePreviewer {
    pool: PgPool,
}

impl MergePreviewer {
    /// Create a previewer over a pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Compute the volume of data a merge would move and any attribute
    /// conflicts, for an ordered pair of users.
    ///
    /// Safe to call repeatedly and concurrently; performs no writes.
    ///
    /// # Errors
    ///
    /// Returns `MergeError::SelfMerge` when both ids are the same and
    /// `MergeError::NotFound` when either id does not resolve.
    pub async fn preview(
        &self,
        primary_id: UserId,
        merged_id: UserId,
    ) -> Result<MergePreview, MergeError> {
        if primary_id == merged_id {
            return Err(MergeError::SelfMerge);
        }

        let repo = UserRepository::new(&self.pool);
        let primary = repo
            .get_by_id(primary_id)
            .await?
            .ok_or(MergeError::NotFound(primary_id))?;
        let merged = repo
            .get_by_id(merged_id)
            .await?
            .ok_or(MergeError::NotFound(merged_id))?;

        let data_to_merge = relations::counts_for_user(&self.pool, merged_id).await?;
        let conflicts = detect_conflicts(&primary, &merged);

        Ok(MergePreview {
            primary: (&primary).into(),
            merged: (&merged).into(),
            data_to_merge,
            conflicts,
        })
    }
}

/// Informational attribute conflicts between the two accounts. Pure.
///
/// Conflicts never block a merge; they give the operator something to
/// double-check before confirming.
pub(crate) fn detect_conflicts(primary: &User, merged: &User) -> Vec<String> {
    let mut conflicts = Vec::new();

    if primary.role != merged.role {
        conflicts.push(format!(
            "Role mismatch: primary is {}, merged is {}",
            primary.role, merged.role
        ));
    }

    if primary.email.normalized() != merged.email.normalized() {
        conflicts.push(format!(
            "Email mismatch: {} vs {}",
            primary.email, merged.email
        ));
    }

    let merged_name = merged.name.as_deref().unwrap_or("").trim();
    if !merged_name.is_empty() && Some(merged_name) != primary.name.as_deref().map(str::trim) {
        conflicts.push(format!(
            "Name mismatch: {} vs {}",
            primary.name.as_deref().unwrap_or("(none)"),
            merged_name
        ));
    }

    conflicts
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use stagelink_core::{Email, UserRole};

    use super::*;

    fn make_user(email: &str, name: Option<&str>, role: UserRole) -> User {
        let now = Utc::now();
        User {
            id: UserId::generate(),
            email: Email::parse(email).unwrap(),
            name: name.map(str::to_owned),
            role,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_identical_attributes_no_conflicts() {
        let primary = make_user("alice@test.com", Some("Alice"), UserRole::Talent);
        let mut merged = make_user("Alice@Test.com", Some("Alice"), UserRole::Talent);
        merged.id = UserId::generate();

        assert!(detect_conflicts(&primary, &merged).is_empty());
    }

    #[test]
    fn test_role_mismatch_flagged() {
        let primary = make_user("alice@test.com", None, UserRole::Talent);
        let merged = make_user("alice@test.com", None, UserRole::Organizer);

        let conflicts = detect_conflicts(&primary, &merged);
        assert_eq!(conflicts.len(), 1);
        assert!(conflicts[0].starts_with("Role mismatch"));
    }

    #[test]
    fn test_email_mismatch_flagged() {
        let primary = make_user("alice@test.com", None, UserRole::Talent);
        let merged = make_user("alice@test.co", None, UserRole::Talent);

        let conflicts = detect_conflicts(&primary, &merged);
        assert!(conflicts.iter().any(|c| c.starts_with("Email mismatch")));
    }

    #[test]
    fn test_empty_merged_name_not_flagged() {
        let primary = make_user("alice@test.com", Some("Alice"), UserRole::Talent);
        let merged = make_user("alice@test.com", None, UserRole::Talent);
        assert!(detect_conflicts(&primary, &merged).is_empty());

        let merged_blank = make_user("alice@test.com", Some("  "), UserRole::Talent);
        assert!(detect_conflicts(&primary, &merged_blank).is_empty());
    }

    #[test]
    fn test_differing_names_flagged() {
        let primary = make_user("alice@test.com", Some("Alice W"), UserRole::Talent);
        let merged = make_user("alice@test.com", Some("Alice Walker"), UserRole::Talent);

        let conflicts = detect_conflicts(&primary, &merged);
        assert!(conflicts.iter().any(|c| c.starts_with("Name mismatch")));
    }
}
