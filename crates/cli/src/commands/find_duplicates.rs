//! Batch duplicate scan with a confidence-tiered report.
//!
//! # Usage
//!
//! ```bash
//! # Report only
//! sl-cli find-duplicates
//!
//! # Merge high-confidence pairs (oldest account survives)
//! sl-cli find-duplicates --fix
//!
//! # Also merge medium-confidence pairs
//! sl-cli find-duplicates --fix --merge-similar
//!
//! # Show what --fix would do
//! sl-cli find-duplicates --fix --dry-run
//! ```
//!
//! Every run writes a dated JSON report (`duplicate-report-YYYY-MM-DD.json`)
//! to the working directory.

use chrono::{DateTime, Utc};
use serde::Serialize;

use stagelink_core::MergeType;
use stagelink_identity::models::{DuplicateCandidate, MergeRequest};
use stagelink_identity::{IdentityConfig, IdentityEngine, db};

use super::CliError;

/// Confidence tier cutoffs for the report.
const HIGH_CONFIDENCE: f64 = 0.95;
const MEDIUM_CONFIDENCE: f64 = 0.85;

/// Arguments of `find-duplicates`.
pub struct Args {
    pub fix: bool,
    pub merge_similar: bool,
    pub dry_run: bool,
    pub verbose: bool,
}

/// Confidence tier of a scan hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tier {
    High,
    Medium,
    Low,
}

fn tier(score: f64) -> Tier {
    if score >= HIGH_CONFIDENCE {
        Tier::High
    } else if score >= MEDIUM_CONFIDENCE {
        Tier::Medium
    } else {
        Tier::Low
    }
}

/// Dated JSON report of one scan run.
#[derive(Serialize)]
struct DuplicateReport<'a> {
    generated_at: DateTime<Utc>,
    total: usize,
    high_confidence: Vec<&'a DuplicateCandidate>,
    medium_confidence: Vec<&'a DuplicateCandidate>,
    low_confidence: Vec<&'a DuplicateCandidate>,
}

/// Run the batch scan.
///
/// # Errors
///
/// Returns `CliError` on configuration, storage, or report-file failures.
/// Per-pair merge failures are logged and skipped so one bad pair cannot
/// abort the rest of a fix run.
pub async fn run(args: Args) -> Result<(), CliError> {
    let config = IdentityConfig::from_env()?;
    let pool = db::create_pool(&config.database_url).await?;
    let engine = IdentityEngine::new(pool, config.audit_enabled);

    tracing::info!("Scanning user base for duplicate accounts...");
    let candidates = engine.find_existing_duplicates().await?;

    let high: Vec<_> = candidates
        .iter()
        .filter(|c| tier(c.similarity_score) == Tier::High)
        .collect();
    let medium: Vec<_> = candidates
        .iter()
        .filter(|c| tier(c.similarity_score) == Tier::Medium)
        .collect();
    let low: Vec<_> = candidates
        .iter()
        .filter(|c| tier(c.similarity_score) == Tier::Low)
        .collect();

    tracing::info!(
        total = candidates.len(),
        high = high.len(),
        medium = medium.len(),
        low = low.len(),
        "Scan complete"
    );

    if args.verbose {
        for candidate in &candidates {
            tracing::info!(
                score = candidate.similarity_score,
                original = %candidate.original.email,
                duplicate = %candidate.duplicate.email,
                reasons = %candidate.reasons.join("; "),
                "Flagged pair"
            );
        }
    }

    let report = DuplicateReport {
        generated_at: Utc::now(),
        total: candidates.len(),
        high_confidence: high.clone(),
        medium_confidence: medium.clone(),
        low_confidence: low,
    };
    let report_path = format!("duplicate-report-{}.json", Utc::now().format("%Y-%m-%d"));
    std::fs::write(&report_path, serde_json::to_string_pretty(&report)?)?;
    tracing::info!(path = %report_path, "Wrote duplicate report");

    if args.fix {
        let mut to_merge: Vec<&DuplicateCandidate> = high;
        if args.merge_similar {
            to_merge.extend(medium);
        }
        merge_pairs(&engine, &to_merge, args.dry_run).await;
    } else if args.merge_similar || args.dry_run {
        tracing::warn!("--merge-similar/--dry-run have no effect without --fix");
    }

    Ok(())
}

/// Merge flagged pairs, oldest account surviving.
async fn merge_pairs(engine: &IdentityEngine, pairs: &[&DuplicateCandidate], dry_run: bool) {
    let mut merged = 0_usize;
    let mut failed = 0_usize;

    for candidate in pairs {
        let primary_id = candidate.original.id;
        let merged_id = candidate.duplicate.id;

        match engine.preview_account_merge(primary_id, merged_id).await {
            Ok(preview) => {
                if dry_run {
                    tracing::info!(
                        primary = %preview.primary.email,
                        duplicate = %preview.merged.email,
                        rows = preview.data_to_merge.total(),
                        conflicts = preview.conflicts.len(),
                        "Would merge (dry run)"
                    );
                    continue;
                }
            }
            Err(e) => {
                // A pair can vanish mid-run when an earlier merge in a
                // duplicate cluster already consumed one of its accounts.
                tracing::warn!(
                    primary = %primary_id,
                    duplicate = %merged_id,
                    error = %e,
                    "Skipping pair"
                );
                failed += 1;
                continue;
            }
        }

        let request = MergeRequest {
            primary_id,
            merged_id,
            reason: format!(
                "Automatic merge of detected duplicate: {}",
                candidate.reasons.join("; ")
            ),
            merge_type: MergeType::Automatic,
            performed_by: Some("sl-cli find-duplicates".to_owned()),
        };

        match engine.merge_accounts(&request).await {
            Ok(()) => {
                tracing::info!(
                    primary = %candidate.original.email,
                    duplicate = %candidate.duplicate.email,
                    "Merged duplicate account"
                );
                merged += 1;
            }
            Err(e) => {
                tracing::error!(
                    primary = %primary_id,
                    duplicate = %merged_id,
                    error = %e,
                    "Merge failed; pair left untouched"
                );
                failed += 1;
            }
        }
    }

    if dry_run {
        tracing::info!(pairs = pairs.len(), "Dry run complete, nothing written");
    } else {
        tracing::info!(merged, failed, "Fix pass complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(tier(1.0), Tier::High);
        assert_eq!(tier(0.95), Tier::High);
        assert_eq!(tier(0.949), Tier::Medium);
        assert_eq!(tier(0.85), Tier::Medium);
        assert_eq!(tier(0.849), Tier::Low);
        assert_eq!(tier(0.0), Tier::Low);
    }
}
