//! Integration tests for the StageLink identity engine.
//!
//! # Running Tests
//!
//! ```bash
//! # Start a PostgreSQL instance and apply migrations
//! docker compose up -d postgres
//! cargo run -p stagelink-cli -- migrate
//!
//! # Run integration tests (ignored by default)
//! cargo test -p stagelink-integration-tests -- --ignored
//! ```
//!
//! Tests seed users with unique random emails so they can run against a
//! shared database without stepping on each other or on existing data.

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::unwrap_used)]

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use sqlx::PgPool;
use uuid::Uuid;

use stagelink_core::{UserId, UserRole};

/// Connect to the test database.
///
/// Reads `STAGELINK_DATABASE_URL` with a `DATABASE_URL` fallback, like the
/// engine itself.
///
/// # Panics
///
/// Panics when no database URL is configured or the connection fails;
/// these tests require a running `PostgreSQL`.
pub async fn test_pool() -> PgPool {
    let url = std::env::var("STAGELINK_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .expect("STAGELINK_DATABASE_URL or DATABASE_URL must be set for integration tests");

    stagelink_identity::db::create_pool(&SecretString::from(url))
        .await
        .expect("Failed to connect to test database")
}

/// A unique email that cannot collide with other test runs.
#[must_use]
pub fn unique_email(tag: &str) -> String {
    format!("{tag}-{}@itest.stagelink.io", Uuid::new_v4().simple())
}

/// Insert a user with an explicit creation time and return its id.
///
/// # Panics
///
/// Panics if the insert fails.
pub async fn seed_user(
    pool: &PgPool,
    email: &str,
    name: Option<&str>,
    role: UserRole,
    created_at: DateTime<Utc>,
) -> UserId {
    sqlx::query_scalar::<_, UserId>(
        r"
        INSERT INTO users (email, name, role, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $4)
        RETURNING id
        ",
    )
    .bind(email)
    .bind(name)
    .bind(role)
    .bind(created_at)
    .fetch_one(pool)
    .await
    .expect("Failed to seed user")
}

/// Attach a talent profile with an optional phone to a user.
///
/// # Panics
///
/// Panics if the insert fails.
pub async fn seed_talent_profile(
    pool: &PgPool,
    user_id: UserId,
    phone: Option<&str>,
    skills: &[&str],
) {
    let skills: Vec<String> = skills.iter().map(|s| (*s).to_owned()).collect();
    sqlx::query("INSERT INTO talent_profiles (user_id, phone, skills) VALUES ($1, $2, $3)")
        .bind(user_id)
        .bind(phone)
        .bind(&skills)
        .execute(pool)
        .await
        .expect("Failed to seed talent profile");
}

/// Attach an organizer profile to a user.
///
/// # Panics
///
/// Panics if the insert fails.
pub async fn seed_organizer_profile(pool: &PgPool, user_id: UserId, phone: Option<&str>) {
    sqlx::query("INSERT INTO organizer_profiles (user_id, phone) VALUES ($1, $2)")
        .bind(user_id)
        .bind(phone)
        .execute(pool)
        .await
        .expect("Failed to seed organizer profile");
}

/// Insert a booking between an organizer and a talent.
///
/// # Panics
///
/// Panics if the insert fails.
pub async fn seed_booking(pool: &PgPool, organizer_id: UserId, talent_id: UserId) {
    sqlx::query("INSERT INTO bookings (organizer_id, talent_id) VALUES ($1, $2)")
        .bind(organizer_id)
        .bind(talent_id)
        .execute(pool)
        .await
        .expect("Failed to seed booking");
}

/// Insert a message between two users.
///
/// # Panics
///
/// Panics if the insert fails.
pub async fn seed_message(pool: &PgPool, sender_id: UserId, receiver_id: UserId) {
    sqlx::query("INSERT INTO messages (sender_id, receiver_id, body) VALUES ($1, $2, 'hello')")
        .bind(sender_id)
        .bind(receiver_id)
        .execute(pool)
        .await
        .expect("Failed to seed message");
}

/// Insert a transaction for a user.
///
/// # Panics
///
/// Panics if the insert fails.
pub async fn seed_transaction(pool: &PgPool, user_id: UserId) {
    sqlx::query("INSERT INTO transactions (user_id, amount_cents, kind) VALUES ($1, 5000, 'fee')")
        .bind(user_id)
        .execute(pool)
        .await
        .expect("Failed to seed transaction");
}

/// Insert a notification for a user.
///
/// # Panics
///
/// Panics if the insert fails.
pub async fn seed_notification(pool: &PgPool, user_id: UserId) {
    sqlx::query("INSERT INTO notifications (user_id, kind) VALUES ($1, 'booking_update')")
        .bind(user_id)
        .execute(pool)
        .await
        .expect("Failed to seed notification");
}

/// Whether a user row still exists.
///
/// # Panics
///
/// Panics if the query fails.
pub async fn user_exists(pool: &PgPool, user_id: UserId) -> bool {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .expect("Failed to check user existence")
        > 0
}
