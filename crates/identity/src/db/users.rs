//! User repository for database operations.
//!
//! Read paths serve the duplicate detector (candidate gathering) and the
//! merge previewer; the transaction-scoped functions at the bottom are the
//! building blocks of merge execution. All queries use the runtime sqlx
//! API with bound parameters.

use sqlx::{PgConnection, PgPool, Row};

use stagelink_core::{UserId, UserRole, normalize};

use super::RepositoryError;
use crate::models::{User, UserIdentity};

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(
            r"
            SELECT id, email, name, role, created_at, updated_at
            FROM users
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Find the user whose email equals the candidate's, case-insensitively.
    ///
    /// The caller passes an already-normalized (trimmed, lowercased) email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_normalized_email(
        &self,
        normalized_email: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(
            r"
            SELECT id, email, name, role, created_at, updated_at
            FROM users
            WHERE LOWER(email) = $1
            ",
        )
        .bind(normalized_email)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Gather fuzzy-match candidates for a normalized email.
    ///
    /// Returns users whose email contains the candidate's local part as a
    /// substring, or whose email domain equals the candidate's. This bounds
    /// the fuzzy search to a plausible candidate set instead of scanning
    /// the whole user base.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn fuzzy_candidates(
        &self,
        local_part: &str,
        domain: &str,
    ) -> Result<Vec<UserIdentity>, RepositoryError> {
        let rows = sqlx::query(
            r"
            SELECT u.id, u.email, u.name, u.role, u.created_at,
                   COALESCE(tp.phone, op.phone) AS phone
            FROM users u
            LEFT JOIN talent_profiles tp ON tp.user_id = u.id
            LEFT JOIN organizer_profiles op ON op.user_id = u.id
            WHERE strpos(LOWER(u.email), $1) > 0
               OR split_part(LOWER(u.email), '@', 2) = $2
            ",
        )
        .bind(local_part)
        .bind(domain)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(|row| identity_from_row(&row)).collect()
    }

    /// Find user IDs whose stored profile phone matches a normalized phone.
    ///
    /// Phones are stored as entered; this loads the phone-bearing profile
    /// rows from both profile tables and compares in canonical form,
    /// keeping the detector free of cross-table SQL.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn user_ids_by_normalized_phone(
        &self,
        normalized_phone: &str,
    ) -> Result<Vec<UserId>, RepositoryError> {
        let rows = sqlx::query(
            r"
            SELECT user_id, phone FROM talent_profiles WHERE phone IS NOT NULL
            UNION ALL
            SELECT user_id, phone FROM organizer_profiles WHERE phone IS NOT NULL
            ",
        )
        .fetch_all(self.pool)
        .await?;

        let mut ids = Vec::new();
        for row in rows {
            let phone: String = row.try_get("phone")?;
            if normalize::phone(&phone).as_deref() == Some(normalized_phone) {
                ids.push(row.try_get::<UserId, _>("user_id")?);
            }
        }
        Ok(ids)
    }

    /// Load every user's identity attributes, oldest account first.
    ///
    /// Feeds the batch scan; the oldest account in a duplicate cluster is
    /// treated as the canonical original.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn all_user_identities(&self) -> Result<Vec<UserIdentity>, RepositoryError> {
        let rows = sqlx::query(
            r"
            SELECT u.id, u.email, u.name, u.role, u.created_at,
                   COALESCE(tp.phone, op.phone) AS phone
            FROM users u
            LEFT JOIN talent_profiles tp ON tp.user_id = u.id
            LEFT JOIN organizer_profiles op ON op.user_id = u.id
            ORDER BY u.created_at ASC
            ",
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(|row| identity_from_row(&row)).collect()
    }
}

fn identity_from_row(row: &sqlx::postgres::PgRow) -> Result<UserIdentity, RepositoryError> {
    let id: UserId = row.try_get("id")?;
    let email: String = row.try_get("email")?;
    let name: Option<String> = row.try_get("name")?;
    let role: UserRole = row.try_get("role")?;
    let phone: Option<String> = row.try_get("phone")?;
    let created_at = row.try_get("created_at")?;

    Ok(UserIdentity::from_stored(
        id,
        email,
        name,
        role,
        phone.as_deref(),
        created_at,
    ))
}

// ---------------------------------------------------------------------------
// Transaction-scoped operations (merge execution)
// ---------------------------------------------------------------------------

/// Fetch a user inside a transaction, locking the row for update.
///
/// The lock serializes concurrent merges touching the same user: the loser
/// of a race observes the committed delete and gets `None`.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn fetch_for_update(
    conn: &mut PgConnection,
    id: UserId,
) -> Result<Option<User>, RepositoryError> {
    let user = sqlx::query_as::<_, User>(
        r"
        SELECT id, email, name, role, created_at, updated_at
        FROM users
        WHERE id = $1
        FOR UPDATE
        ",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(user)
}

/// Delete a user row inside a transaction.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the row no longer exists and
/// `RepositoryError::Database` for other failures.
pub async fn delete_user(conn: &mut PgConnection, id: UserId) -> Result<(), RepositoryError> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }

    Ok(())
}

