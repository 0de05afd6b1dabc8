//! Audit sink: best-effort recording of detection events.
//!
//! The sink is a capability chosen once at engine construction - either
//! the Postgres-backed sink or a no-op when audit storage is not
//! configured. Callers never probe for table existence per call, and a
//! sink failure never alters a caller's primary outcome.

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::db::audit::AuditRepository;
use crate::models::NewDetectionLogEntry;

/// Errors from audit storage.
///
/// Only ever surfaced as warnings; audit unavailability degrades
/// observability, not correctness.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The audit store rejected or could not service the write.
    #[error("audit store unavailable: {0}")]
    Unavailable(#[from] RepositoryError),
}

/// Destination for detection events.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Whether a real audit store backs this sink.
    ///
    /// The merge executor consults this to decide whether to write its
    /// in-transaction audit artifacts.
    fn enabled(&self) -> bool;

    /// Append one detection evaluation.
    ///
    /// # Errors
    ///
    /// Returns `AuditError` when the store cannot be written; callers log
    /// and continue.
    async fn log_detection(&self, entry: NewDetectionLogEntry) -> Result<(), AuditError>;
}

/// Postgres-backed audit sink.
pub struct PgAuditSink {
    pool: PgPool,
}

impl PgAuditSink {
    /// Create a sink writing to the `detection_log` table.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for PgAuditSink {
    fn enabled(&self) -> bool {
        true
    }

    async fn log_detection(&self, entry: NewDetectionLogEntry) -> Result<(), AuditError> {
        AuditRepository::new(&self.pool)
            .insert_detection(&entry)
            .await?;
        Ok(())
    }
}

/// Sink used when audit storage is not configured.
pub struct NoopAuditSink;

#[async_trait]
impl AuditSink for NoopAuditSink {
    fn enabled(&self) -> bool {
        false
    }

    async fn log_detection(&self, _entry: NewDetectionLogEntry) -> Result<(), AuditError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use stagelink_core::DetectionType;

    use super::*;

    #[tokio::test]
    async fn test_noop_sink_accepts_everything() {
        let sink = NoopAuditSink;
        assert!(!sink.enabled());

        let entry = NewDetectionLogEntry {
            normalized_email: "a@b.c".to_owned(),
            detection_type: DetectionType::ManualCheck,
            candidate_user_id: None,
            matched_user_id: None,
            similarity_score: 0.0,
            reason: String::new(),
        };
        assert!(sink.log_detection(entry).await.is_ok());
    }
}
