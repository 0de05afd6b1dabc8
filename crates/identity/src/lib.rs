//! StageLink identity deduplication and account consolidation engine.
//!
//! This crate detects when two user records represent the same real person
//! (typos, repeat signups, near-identical contact data) and, once confirmed,
//! atomically merges one account's entire transactional history into another
//! before deleting the duplicate.
//!
//! # Modules
//!
//! - [`config`] - Environment-driven engine configuration
//! - [`db`] - `PostgreSQL` repositories and the relation registry
//! - [`models`] - Domain types (users, detections, merge artifacts)
//! - [`services`] - Detector, previewer, merge executor, audit sink, alerts
//! - [`engine`] - The [`engine::IdentityEngine`] facade consumed by callers
//!
//! # Entry points
//!
//! ```rust,ignore
//! let config = IdentityConfig::from_env()?;
//! let pool = db::create_pool(&config.database_url).await?;
//! let engine = IdentityEngine::new(pool, config.audit_enabled);
//!
//! let result = engine.check_for_duplicate_user(&identity).await;
//! let hits = engine.find_existing_duplicates().await?;
//! let preview = engine.preview_account_merge(primary, merged).await?;
//! engine.merge_accounts(&request).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod engine;
pub mod models;
pub mod services;

pub use config::{ConfigError, IdentityConfig};
pub use engine::IdentityEngine;
