//! Database operations for the identity engine.
//!
//! # Tables
//!
//! Marketplace schema (owned elsewhere in the platform, repointed here
//! during merges):
//!
//! - `users` - Base accounts, one row per person (ideally)
//! - `talent_profiles` / `organizer_profiles` - Role-specific profiles
//! - Dependent relations: `bookings`, `events`, `proposals`, `messages`,
//!   `direct_messages`, `reviews`, `transactions`, `notifications`,
//!   `payouts`, `disputes`, `referrals`, `activity_log`,
//!   `kyc_submissions`, `availability`
//!
//! Audit tables (optional, see `services::audit`):
//!
//! - `detection_log` - Append-only record of detection evaluations
//! - `merge_records` - One row per executed merge
//!
//! # Migrations
//!
//! Migrations are stored in `crates/identity/migrations/` and run via:
//! ```bash
//! cargo run -p stagelink-cli -- migrate
//! ```

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub mod audit;
pub mod profiles;
pub mod relations;
pub mod users;

/// Errors from the repository layer.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
