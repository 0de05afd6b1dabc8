//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! sl-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `STAGELINK_DATABASE_URL` - `PostgreSQL` connection string (falls
//!   back to `DATABASE_URL`)
//!
//! Migration files live in `crates/identity/migrations/` and are embedded
//! into the binary at compile time.

use stagelink_identity::{IdentityConfig, db};

use super::CliError;

/// Run all pending migrations.
///
/// # Errors
///
/// Returns `CliError` if configuration, connection, or any migration
/// fails.
pub async fn run() -> Result<(), CliError> {
    let config = IdentityConfig::from_env()?;

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&config.database_url).await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../identity/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
