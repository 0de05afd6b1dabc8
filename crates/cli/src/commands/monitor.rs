//! Periodic duplicate-activity monitoring and alerting.
//!
//! Designed to run from cron. Checks two signals: duplicate registration
//! attempts logged in the last hour, and high-confidence duplicates among
//! existing users. Findings above the alert threshold are dispatched to
//! the configured sinks; a sink being down never fails the run.
//!
//! # Usage
//!
//! ```bash
//! sl-cli monitor-duplicates --alert-threshold 0.9 \
//!     --email ops@stagelink.io \
//!     --slack-webhook https://hooks.slack.com/services/...
//! ```

use std::fmt::Write as _;

use chrono::{Duration, Utc};

use stagelink_identity::db::audit::AuditRepository;
use stagelink_identity::services::{AlertDispatcher, AlertMessage};
use stagelink_identity::{IdentityConfig, IdentityEngine, db};

use super::CliError;

/// Arguments of `monitor-duplicates`.
pub struct Args {
    pub alert_threshold: f64,
    pub email: Option<String>,
    pub slack_webhook: Option<String>,
    pub verbose: bool,
}

/// Run one monitoring pass.
///
/// # Errors
///
/// Returns `CliError::InvalidArgument` for an out-of-range threshold and
/// propagates storage failures. Alert delivery failures are logged inside
/// the dispatcher, never returned.
pub async fn run(args: Args) -> Result<(), CliError> {
    if !(0.0..=1.0).contains(&args.alert_threshold) {
        return Err(CliError::InvalidArgument(format!(
            "alert threshold must be between 0.0 and 1.0, got {}",
            args.alert_threshold
        )));
    }

    let config = IdentityConfig::from_env()?;
    let pool = db::create_pool(&config.database_url).await?;
    let engine = IdentityEngine::new(pool.clone(), config.audit_enabled);

    // Signal 1: duplicate registration attempts in the last hour.
    let recent_attempts = if config.audit_enabled {
        AuditRepository::new(&pool)
            .registration_attempts_since(Utc::now() - Duration::hours(1), args.alert_threshold)
            .await?
    } else {
        tracing::warn!("Audit store disabled; registration-attempt history unavailable");
        Vec::new()
    };

    // Signal 2: high-confidence duplicates among existing users.
    let scan_hits: Vec<_> = engine
        .find_existing_duplicates()
        .await?
        .into_iter()
        .filter(|c| c.similarity_score >= args.alert_threshold)
        .collect();

    if args.verbose {
        for attempt in &recent_attempts {
            tracing::info!(
                email = %attempt.normalized_email,
                score = attempt.similarity_score,
                reason = %attempt.reason,
                "Recent duplicate registration attempt"
            );
        }
        for hit in &scan_hits {
            tracing::info!(
                original = %hit.original.email,
                duplicate = %hit.duplicate.email,
                score = hit.similarity_score,
                "Existing duplicate pair"
            );
        }
    }

    if recent_attempts.is_empty() && scan_hits.is_empty() {
        tracing::info!("No duplicate activity above threshold");
        return Ok(());
    }

    tracing::info!(
        attempts = recent_attempts.len(),
        pairs = scan_hits.len(),
        threshold = args.alert_threshold,
        "Duplicate activity detected"
    );

    let mut dispatcher = AlertDispatcher::new();
    if let Some(to) = args.email {
        if let Some(smtp) = &config.smtp {
            dispatcher = dispatcher.with_email(smtp, to)?;
        } else {
            tracing::warn!("--email given but SMTP is not configured; skipping email channel");
        }
    }
    if let Some(url) = args.slack_webhook {
        dispatcher = dispatcher.with_slack(url);
    }

    if !dispatcher.has_channels() {
        tracing::warn!("No alert channels configured; findings logged only");
        return Ok(());
    }

    let alert = build_alert(&recent_attempts, &scan_hits, args.alert_threshold);
    let delivered = dispatcher.dispatch(&alert).await;
    tracing::info!(delivered, "Alert dispatch complete");

    Ok(())
}

fn build_alert(
    attempts: &[stagelink_identity::models::DetectionLogEntry],
    hits: &[stagelink_identity::models::DuplicateCandidate],
    threshold: f64,
) -> AlertMessage {
    let mut body = String::new();
    let _ = writeln!(
        body,
        "Duplicate activity above threshold {threshold:.2} on StageLink:"
    );

    if !attempts.is_empty() {
        let _ = writeln!(
            body,
            "\n{} duplicate registration attempt(s) in the last hour:",
            attempts.len()
        );
        for attempt in attempts {
            let _ = writeln!(
                body,
                "  - {} (score {:.2}): {}",
                attempt.normalized_email, attempt.similarity_score, attempt.reason
            );
        }
    }

    if !hits.is_empty() {
        let _ = writeln!(
            body,
            "\n{} high-confidence duplicate pair(s) among existing users:",
            hits.len()
        );
        for hit in hits {
            let _ = writeln!(
                body,
                "  - {} duplicates {} (score {:.2}): {}",
                hit.duplicate.email,
                hit.original.email,
                hit.similarity_score,
                hit.reasons.join("; ")
            );
        }
    }

    AlertMessage {
        subject: format!(
            "StageLink duplicate alert: {} attempt(s), {} pair(s)",
            attempts.len(),
            hits.len()
        ),
        body,
    }
}
