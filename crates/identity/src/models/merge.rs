//! Merge preview and execution domain types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stagelink_core::{MergeRecordId, MergeType, UserId, UserRole};

use super::{User, UserIdentity};

/// Point-in-time view of a user involved in a merge or scan report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSnapshot {
    /// The user's ID.
    pub id: UserId,
    /// Email exactly as stored.
    pub email: String,
    /// Display name, if any.
    pub name: Option<String>,
    /// Marketplace role.
    pub role: UserRole,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserSnapshot {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.as_str().to_owned(),
            name: user.name.clone(),
            role: user.role,
            created_at: user.created_at,
        }
    }
}

impl From<&UserIdentity> for UserSnapshot {
    fn from(user: &UserIdentity) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            created_at: user.created_at,
        }
    }
}

/// Row counts per relation category that a merge would move.
///
/// Keys are the category names of the relation registry
/// (see `db::relations::RELATION_CATEGORIES`); bidirectional categories
/// (e.g. bookings as organizer plus bookings as talent) are summed into
/// one count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MergeDataCounts(BTreeMap<String, i64>);

impl MergeDataCounts {
    /// Empty count set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the count for a relation category.
    pub fn insert(&mut self, category: &str, count: i64) {
        self.0.insert(category.to_owned(), count);
    }

    /// Count for one relation category (0 when absent).
    #[must_use]
    pub fn get(&self, category: &str) -> i64 {
        self.0.get(category).copied().unwrap_or(0)
    }

    /// Total rows across every category.
    #[must_use]
    pub fn total(&self) -> i64 {
        self.0.values().sum()
    }

    /// Iterate categories and counts in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Read-only computation of what a prospective merge would move.
///
/// Always recomputed on demand, never persisted or cached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergePreview {
    /// The surviving account.
    pub primary: UserSnapshot,
    /// The account that would be deleted.
    pub merged: UserSnapshot,
    /// Volume of data that would move, per relation category.
    pub data_to_merge: MergeDataCounts,
    /// Informational attribute conflicts; never blocks a merge.
    pub conflicts: Vec<String>,
}

/// Parameters of a merge execution.
#[derive(Debug, Clone)]
pub struct MergeRequest {
    /// The surviving account.
    pub primary_id: UserId,
    /// The account to fold into the primary and delete.
    pub merged_id: UserId,
    /// Operator-supplied justification, recorded in the audit trail.
    pub reason: String,
    /// Who or what initiated the merge.
    pub merge_type: MergeType,
    /// Acting operator or tool identifier, if known.
    pub performed_by: Option<String>,
}

/// Audit artifact of one executed merge.
///
/// Created exactly once, inside the merge transaction, when the audit
/// store is enabled.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MergeRecord {
    /// Database ID of this record.
    pub id: MergeRecordId,
    /// The surviving account.
    pub primary_user_id: UserId,
    /// The deleted account.
    pub merged_user_id: UserId,
    /// Email of the surviving account at merge time.
    pub primary_email: String,
    /// Email of the deleted account at merge time.
    pub merged_email: String,
    /// Operator-supplied justification.
    pub reason: String,
    /// JSON snapshot of the per-category counts that moved.
    pub merged_data: serde_json::Value,
    /// Who or what initiated the merge.
    pub merge_type: MergeType,
    /// Acting operator or tool identifier, if known.
    pub performed_by: Option<String>,
    /// When the merge committed.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_default_to_zero() {
        let counts = MergeDataCounts::new();
        assert_eq!(counts.get("bookings"), 0);
        assert_eq!(counts.total(), 0);
    }

    #[test]
    fn test_counts_total_sums_categories() {
        let mut counts = MergeDataCounts::new();
        counts.insert("bookings", 3);
        counts.insert("messages", 7);
        assert_eq!(counts.get("bookings"), 3);
        assert_eq!(counts.total(), 10);
    }

    #[test]
    fn test_counts_serialize_as_flat_map() {
        let mut counts = MergeDataCounts::new();
        counts.insert("bookings", 2);
        let json = serde_json::to_value(&counts).unwrap();
        assert_eq!(json, serde_json::json!({"bookings": 2}));

        let back: MergeDataCounts = serde_json::from_value(json).unwrap();
        assert_eq!(back, counts);
    }
}
