//! Role-specific profile operations, transaction-scoped.
//!
//! All functions here run inside the merge transaction and take the
//! transaction connection directly.

use sqlx::PgConnection;

use stagelink_core::{ProfileId, UserId};

use super::RepositoryError;
use crate::models::{OrganizerProfile, TalentProfile};

/// Fetch a user's talent profile.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn talent_profile(
    conn: &mut PgConnection,
    user_id: UserId,
) -> Result<Option<TalentProfile>, RepositoryError> {
    let profile = sqlx::query_as::<_, TalentProfile>(
        r"
        SELECT id, user_id, phone, bio, location, skills, created_at
        FROM talent_profiles
        WHERE user_id = $1
        ",
    )
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(profile)
}

/// Fetch a user's organizer profile.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn organizer_profile(
    conn: &mut PgConnection,
    user_id: UserId,
) -> Result<Option<OrganizerProfile>, RepositoryError> {
    let profile = sqlx::query_as::<_, OrganizerProfile>(
        r"
        SELECT id, user_id, phone, company_name, location, event_types, created_at
        FROM organizer_profiles
        WHERE user_id = $1
        ",
    )
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(profile)
}

/// Re-point a talent profile to a new owner.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn repoint_talent_profile(
    conn: &mut PgConnection,
    profile_id: ProfileId,
    new_owner: UserId,
) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE talent_profiles SET user_id = $1 WHERE id = $2")
        .bind(new_owner)
        .bind(profile_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Re-point an organizer profile to a new owner.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn repoint_organizer_profile(
    conn: &mut PgConnection,
    profile_id: ProfileId,
    new_owner: UserId,
) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE organizer_profiles SET user_id = $1 WHERE id = $2")
        .bind(new_owner)
        .bind(profile_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Overwrite the reconcilable fields of a talent profile.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn update_talent_profile(
    conn: &mut PgConnection,
    profile: &TalentProfile,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        UPDATE talent_profiles
        SET phone = $1, bio = $2, location = $3, skills = $4
        WHERE id = $5
        ",
    )
    .bind(&profile.phone)
    .bind(&profile.bio)
    .bind(&profile.location)
    .bind(&profile.skills)
    .bind(profile.id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Overwrite the reconcilable fields of an organizer profile.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn update_organizer_profile(
    conn: &mut PgConnection,
    profile: &OrganizerProfile,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        UPDATE organizer_profiles
        SET phone = $1, company_name = $2, location = $3, event_types = $4
        WHERE id = $5
        ",
    )
    .bind(&profile.phone)
    .bind(&profile.company_name)
    .bind(&profile.location)
    .bind(&profile.event_types)
    .bind(profile.id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Delete a talent profile row.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn delete_talent_profile(
    conn: &mut PgConnection,
    profile_id: ProfileId,
) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM talent_profiles WHERE id = $1")
        .bind(profile_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Delete an organizer profile row.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn delete_organizer_profile(
    conn: &mut PgConnection,
    profile_id: ProfileId,
) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM organizer_profiles WHERE id = $1")
        .bind(profile_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
