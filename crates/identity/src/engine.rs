//! The engine facade consumed by the web/admin layer and the CLI.

use std::sync::Arc;

use sqlx::PgPool;

use stagelink_core::UserId;

use crate::db::RepositoryError;
use crate::models::{
    DetectionResult, DuplicateCandidate, Identity, MergePreview, MergeRequest,
};
use crate::services::{
    AuditSink, DuplicateDetector, MergeError, MergeExecutor, MergePreviewer, NoopAuditSink,
    PgAuditSink,
};

/// Identity deduplication and account consolidation engine.
///
/// Wires the detector, previewer, and merge executor over one connection
/// pool, with the audit capability selected once at construction.
pub struct IdentityEngine {
    pool: PgPool,
    detector: DuplicateDetector,
    previewer: MergePreviewer,
    executor: MergeExecutor,
}

impl IdentityEngine {
    /// Build the engine over an existing pool.
    ///
    /// When `audit_enabled` is false, detection events are discarded and
    /// merges skip their audit artifacts; everything else behaves
    /// identically.
    #[must_use]
    pub fn new(pool: PgPool, audit_enabled: bool) -> Self {
        let audit: Arc<dyn AuditSink> = if audit_enabled {
            Arc::new(PgAuditSink::new(pool.clone()))
        } else {
            Arc::new(NoopAuditSink)
        };

        let detector = DuplicateDetector::new(pool.clone(), audit);
        let previewer = MergePreviewer::new(pool.clone());
        let executor = MergeExecutor::new(pool.clone(), audit_enabled);

        Self {
            pool,
            detector,
            previewer,
            executor,
        }
    }

    /// The underlying connection pool (monitor queries, tests).
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check a prospective user against the existing user base.
    ///
    /// Advisory: failures degrade to a no-match result rather than
    /// erroring, so registration flows are never blocked by this check.
    pub async fn check_for_duplicate_user(&self, identity: &Identity) -> DetectionResult {
        self.detector.check_single(identity).await
    }

    /// Batch-scan the whole user base for duplicate pairs.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the user base cannot be loaded.
    pub async fn find_existing_duplicates(
        &self,
    ) -> Result<Vec<DuplicateCandidate>, RepositoryError> {
        self.detector.scan_all().await
    }

    /// Compute what a merge of `merged_id` into `primary_id` would move.
    ///
    /// # Errors
    ///
    /// Returns `MergeError::NotFound`/`MergeError::SelfMerge` on invalid
    /// pairs.
    pub async fn preview_account_merge(
        &self,
        primary_id: UserId,
        merged_id: UserId,
    ) -> Result<MergePreview, MergeError> {
        self.previewer.preview(primary_id, merged_id).await
    }

    /// Execute an atomic account merge.
    ///
    /// # Errors
    ///
    /// Returns `MergeError` on invalid pairs or any transaction failure
    /// (fully rolled back).
    pub async fn merge_accounts(&self, request: &MergeRequest) -> Result<(), MergeError> {
        self.executor.merge(request).await
    }
}
