//! Role and audit enums shared across the engine.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Marketplace user role.
///
/// Every user has exactly one role; talent and organizer users own a
/// role-specific profile row in addition to the base user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    /// Platform administrator.
    Admin,
    /// Performing talent offering services.
    Talent,
    /// Event organizer booking talent.
    Organizer,
}

impl UserRole {
    /// Stable string form as stored in the database.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Talent => "TALENT",
            Self::Organizer => "ORGANIZER",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(Self::Admin),
            "TALENT" => Ok(Self::Talent),
            "ORGANIZER" => Ok(Self::Organizer),
            other => Err(format!("unknown user role: {other}")),
        }
    }
}

/// What triggered a duplicate-detection evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "detection_type", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DetectionType {
    /// Pre-registration check for a candidate that may not exist yet.
    RegistrationAttempt,
    /// Retroactive batch scan over the existing user base.
    ExistingScan,
    /// One-off check requested by an operator.
    ManualCheck,
}

impl fmt::Display for DetectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::RegistrationAttempt => "REGISTRATION_ATTEMPT",
            Self::ExistingScan => "EXISTING_SCAN",
            Self::ManualCheck => "MANUAL_CHECK",
        };
        f.write_str(s)
    }
}

/// Who or what initiated an account merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "merge_type", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MergeType {
    /// An administrator reviewed and approved the merge.
    AdminInitiated,
    /// The affected user requested account consolidation.
    UserInitiated,
    /// A batch tool merged a high-confidence pair without review.
    Automatic,
}

impl fmt::Display for MergeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::AdminInitiated => "ADMIN_INITIATED",
            Self::UserInitiated => "USER_INITIATED",
            Self::Automatic => "AUTOMATIC",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_role_from_str_case_insensitive() {
        assert_eq!("talent".parse::<UserRole>().unwrap(), UserRole::Talent);
        assert_eq!("ORGANIZER".parse::<UserRole>().unwrap(), UserRole::Organizer);
        assert!("promoter".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_role_display_roundtrip() {
        for role in [UserRole::Admin, UserRole::Talent, UserRole::Organizer] {
            let parsed: UserRole = role.to_string().parse().unwrap();
            assert_eq!(parsed, role);
        }
    }

    #[test]
    fn test_serde_uses_screaming_snake_case() {
        let json = serde_json::to_string(&DetectionType::RegistrationAttempt).unwrap();
        assert_eq!(json, "\"REGISTRATION_ATTEMPT\"");

        let json = serde_json::to_string(&MergeType::AdminInitiated).unwrap();
        assert_eq!(json, "\"ADMIN_INITIATED\"");
    }
}
