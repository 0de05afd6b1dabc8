//! User and profile domain types.

use chrono::{DateTime, Utc};

use stagelink_core::{Email, ProfileId, UserId, UserRole, normalize};

/// A marketplace user (domain type).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// Display name, if the user has set one.
    pub name: Option<String>,
    /// Marketplace role.
    pub role: UserRole,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Role-specific profile owned by talent users.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TalentProfile {
    /// Database ID of this profile.
    pub id: ProfileId,
    /// User who owns this profile.
    pub user_id: UserId,
    /// Contact phone number as entered by the user.
    pub phone: Option<String>,
    /// Free-form biography.
    pub bio: Option<String>,
    /// City or region.
    pub location: Option<String>,
    /// Offered skills (e.g. "vocals", "dj", "mc").
    pub skills: Vec<String>,
    /// When this profile was created.
    pub created_at: DateTime<Utc>,
}

/// Role-specific profile owned by organizer users.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrganizerProfile {
    /// Database ID of this profile.
    pub id: ProfileId,
    /// User who owns this profile.
    pub user_id: UserId,
    /// Contact phone number as entered by the user.
    pub phone: Option<String>,
    /// Organization or company name.
    pub company_name: Option<String>,
    /// City or region.
    pub location: Option<String>,
    /// Kinds of events this organizer runs.
    pub event_types: Vec<String>,
    /// When this profile was created.
    pub created_at: DateTime<Utc>,
}

/// The identity attributes of a prospective user, used for matching.
///
/// Built per detection call and never stored; the phone number is
/// canonicalized on construction.
#[derive(Debug, Clone)]
pub struct Identity {
    /// Candidate email address.
    pub email: Email,
    /// Candidate display name, if provided.
    pub name: Option<String>,
    /// Canonicalized phone number, if one was provided and usable.
    pub normalized_phone: Option<String>,
}

impl Identity {
    /// Build an identity from registration input, normalizing the phone.
    #[must_use]
    pub fn new(email: Email, name: Option<String>, phone: Option<&str>) -> Self {
        let normalized_phone = phone.and_then(normalize::phone);
        Self {
            email,
            name,
            normalized_phone,
        }
    }
}

/// An existing user's identity attributes as seen by the matcher.
///
/// Loaded in bulk for scans and candidate evaluation; email and phone are
/// pre-normalized once at load time so pairwise comparisons stay cheap.
#[derive(Debug, Clone)]
pub struct UserIdentity {
    /// The user's ID.
    pub id: UserId,
    /// Email exactly as stored.
    pub email: String,
    /// Canonical (trimmed, lowercased) email used for comparison.
    pub normalized_email: String,
    /// Display name, if any.
    pub name: Option<String>,
    /// Marketplace role.
    pub role: UserRole,
    /// Canonicalized contact phone from the user's profile, if any.
    pub normalized_phone: Option<String>,
    /// When the user was created. Older accounts are canonical.
    pub created_at: DateTime<Utc>,
}

impl UserIdentity {
    /// Build the matcher view from stored values, normalizing email/phone.
    #[must_use]
    pub fn from_stored(
        id: UserId,
        email: String,
        name: Option<String>,
        role: UserRole,
        phone: Option<&str>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let normalized_email = normalize::email(&email);
        let normalized_phone = phone.and_then(normalize::phone);
        Self {
            id,
            email,
            normalized_email,
            name,
            role,
            normalized_phone,
            created_at,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_normalizes_phone() {
        let email = Email::parse("alice@test.com").unwrap();
        let identity = Identity::new(email, None, Some("+254 700 000 000"));
        assert_eq!(identity.normalized_phone.as_deref(), Some("+254700000000"));
    }

    #[test]
    fn test_identity_drops_unusable_phone() {
        let email = Email::parse("alice@test.com").unwrap();
        let identity = Identity::new(email, None, Some("n/a"));
        assert!(identity.normalized_phone.is_none());
    }

    #[test]
    fn test_user_identity_normalizes_on_load() {
        let ui = UserIdentity::from_stored(
            UserId::generate(),
            " Alice@Test.COM ".to_owned(),
            Some("Alice".to_owned()),
            UserRole::Talent,
            Some("(0700) 123-456"),
            Utc::now(),
        );
        assert_eq!(ui.normalized_email, "alice@test.com");
        assert_eq!(ui.normalized_phone.as_deref(), Some("0700123456"));
    }
}
