//! The relation registry: every table column that references a user.
//!
//! Both merge preview (counting) and merge execution (rewriting) walk
//! [`RELATION_CATEGORIES`], so adding a new user-referencing table is a
//! one-line change here and nowhere else. Table and column names are
//! compile-time constants from this registry only - they are interpolated
//! into SQL text, never taken from input.

use sqlx::{PgConnection, PgPool};

use stagelink_core::UserId;

use super::RepositoryError;
use crate::models::MergeDataCounts;

/// One relation category: a table with one or more user FK columns.
///
/// Bidirectional categories (a booking has both an organizer and a talent)
/// list both columns; their counts are summed into one category count.
#[derive(Debug, Clone, Copy)]
pub struct RelationCategory {
    /// Category name used in previews, reports, and audit snapshots.
    pub name: &'static str,
    /// Table holding the rows.
    pub table: &'static str,
    /// Every column of the table that references `users.id`.
    pub user_columns: &'static [&'static str],
}

/// Every relation that must move during a merge.
pub const RELATION_CATEGORIES: &[RelationCategory] = &[
    RelationCategory {
        name: "bookings",
        table: "bookings",
        user_columns: &["organizer_id", "talent_id"],
    },
    RelationCategory {
        name: "events",
        table: "events",
        user_columns: &["organizer_id"],
    },
    RelationCategory {
        name: "proposals",
        table: "proposals",
        user_columns: &["talent_id"],
    },
    RelationCategory {
        name: "messages",
        table: "messages",
        user_columns: &["sender_id", "receiver_id"],
    },
    RelationCategory {
        name: "direct_messages",
        table: "direct_messages",
        user_columns: &["sender_id", "receiver_id"],
    },
    RelationCategory {
        name: "reviews",
        table: "reviews",
        user_columns: &["giver_id", "receiver_id"],
    },
    RelationCategory {
        name: "transactions",
        table: "transactions",
        user_columns: &["user_id"],
    },
    RelationCategory {
        name: "notifications",
        table: "notifications",
        user_columns: &["user_id"],
    },
    RelationCategory {
        name: "payouts",
        table: "payouts",
        user_columns: &["user_id"],
    },
    RelationCategory {
        name: "disputes",
        table: "disputes",
        user_columns: &["raised_by"],
    },
    RelationCategory {
        name: "referrals",
        table: "referrals",
        user_columns: &["referrer_id", "referred_id"],
    },
    RelationCategory {
        name: "activity_log",
        table: "activity_log",
        user_columns: &["user_id"],
    },
    RelationCategory {
        name: "kyc_submissions",
        table: "kyc_submissions",
        user_columns: &["user_id"],
    },
    RelationCategory {
        name: "availability",
        table: "availability",
        user_columns: &["user_id"],
    },
];

/// Count the rows a user participates in, per relation category.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if any count query fails.
pub async fn counts_for_user(
    pool: &PgPool,
    user_id: UserId,
) -> Result<MergeDataCounts, RepositoryError> {
    let mut counts = MergeDataCounts::new();
    for category in RELATION_CATEGORIES {
        let mut total: i64 = 0;
        for column in category.user_columns {
            let sql = format!(
                "SELECT COUNT(*) FROM {table} WHERE {column} = $1",
                table = category.table
            );
            let count: i64 = sqlx::query_scalar(&sql)
                .bind(user_id)
                .fetch_one(pool)
                .await?;
            total += count;
        }
        counts.insert(category.name, total);
    }
    Ok(counts)
}

/// Count variant for use inside the merge transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if any count query fails.
pub async fn counts_for_user_tx(
    conn: &mut PgConnection,
    user_id: UserId,
) -> Result<MergeDataCounts, RepositoryError> {
    let mut counts = MergeDataCounts::new();
    for category in RELATION_CATEGORIES {
        let mut total: i64 = 0;
        for column in category.user_columns {
            let sql = format!(
                "SELECT COUNT(*) FROM {table} WHERE {column} = $1",
                table = category.table
            );
            let count: i64 = sqlx::query_scalar(&sql)
                .bind(user_id)
                .fetch_one(&mut *conn)
                .await?;
            total += count;
        }
        counts.insert(category.name, total);
    }
    Ok(counts)
}

/// Rewrite every registered user FK from one user to another.
///
/// Runs inside the merge transaction; returns the total number of rows
/// repointed across all categories.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if any update fails.
pub async fn rewrite_user_references(
    conn: &mut PgConnection,
    from: UserId,
    to: UserId,
) -> Result<u64, RepositoryError> {
    let mut rewritten: u64 = 0;
    for category in RELATION_CATEGORIES {
        for column in category.user_columns {
            let sql = format!(
                "UPDATE {table} SET {column} = $1 WHERE {column} = $2",
                table = category.table
            );
            let result = sqlx::query(&sql)
                .bind(to)
                .bind(from)
                .execute(&mut *conn)
                .await?;
            rewritten += result.rows_affected();
        }
    }
    Ok(rewritten)
}

/// Count rows in any registered relation still referencing a user.
///
/// Used by integration tests to assert a merge left no dangling FK.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if any count query fails.
pub async fn total_references(pool: &PgPool, user_id: UserId) -> Result<i64, RepositoryError> {
    let counts = counts_for_user(pool, user_id).await?;
    Ok(counts.total())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_has_no_duplicate_categories() {
        let mut names: Vec<_> = RELATION_CATEGORIES.iter().map(|c| c.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), RELATION_CATEGORIES.len());
    }

    #[test]
    fn test_registry_columns_are_nonempty() {
        for category in RELATION_CATEGORIES {
            assert!(
                !category.user_columns.is_empty(),
                "category {} has no FK columns",
                category.name
            );
        }
    }

    #[test]
    fn test_bidirectional_categories_list_both_sides() {
        let bookings = RELATION_CATEGORIES
            .iter()
            .find(|c| c.name == "bookings")
            .expect("bookings category");
        assert_eq!(bookings.user_columns, &["organizer_id", "talent_id"]);
    }
}
