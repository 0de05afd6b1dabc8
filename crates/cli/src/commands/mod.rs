//! CLI command implementations.

use thiserror::Error;

use stagelink_identity::ConfigError;
use stagelink_identity::db::RepositoryError;
use stagelink_identity::services::{AlertError, MergeError};

pub mod find_duplicates;
pub mod merge_accounts;
pub mod migrate;
pub mod monitor;

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Database connection error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Repository-layer failure.
    #[error("storage error: {0}")]
    Repository(#[from] RepositoryError),

    /// Merge preview or execution failure.
    #[error("merge error: {0}")]
    Merge(#[from] MergeError),

    /// Alert channel could not be constructed.
    #[error("alert setup error: {0}")]
    Alert(#[from] AlertError),

    /// Report file could not be written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Report serialization failed.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed command-line argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
