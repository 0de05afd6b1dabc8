//! Preview and execute one account merge.
//!
//! # Usage
//!
//! ```bash
//! # Interactive merge with confirmation
//! sl-cli merge-accounts <primary-id> <merged-id> --reason "support ticket #4821"
//!
//! # Preview only
//! sl-cli merge-accounts <primary-id> <merged-id> --preview
//!
//! # Non-interactive (cron/scripts)
//! sl-cli merge-accounts <primary-id> <merged-id> --force --admin-id ops@stagelink.io
//! ```

use std::io::{BufRead, Write};

use stagelink_core::{MergeType, UserId};
use stagelink_identity::models::{MergePreview, MergeRequest};
use stagelink_identity::{IdentityConfig, IdentityEngine, db};

use super::CliError;

/// Arguments of `merge-accounts`.
pub struct Args {
    pub primary_id: String,
    pub merged_id: String,
    pub reason: Option<String>,
    pub admin_id: Option<String>,
    pub force: bool,
    pub preview: bool,
}

/// Run the merge command.
///
/// # Errors
///
/// Returns `CliError::InvalidArgument` for malformed ids and propagates
/// preview/merge failures (`NotFound`, self-merge, transaction errors) so
/// the process exits non-zero.
pub async fn run(args: Args) -> Result<(), CliError> {
    let primary_id: UserId = args
        .primary_id
        .parse()
        .map_err(|_| CliError::InvalidArgument(format!("invalid primary id: {}", args.primary_id)))?;
    let merged_id: UserId = args
        .merged_id
        .parse()
        .map_err(|_| CliError::InvalidArgument(format!("invalid merged id: {}", args.merged_id)))?;

    let config = IdentityConfig::from_env()?;
    let pool = db::create_pool(&config.database_url).await?;
    let engine = IdentityEngine::new(pool, config.audit_enabled);

    let preview = engine.preview_account_merge(primary_id, merged_id).await?;
    log_preview(&preview);

    if args.preview {
        tracing::info!("Preview only, nothing merged");
        return Ok(());
    }

    if !args.force && !confirm("Proceed with merge? This cannot be undone.")? {
        tracing::info!("Merge aborted");
        return Ok(());
    }

    let request = MergeRequest {
        primary_id,
        merged_id,
        reason: args
            .reason
            .unwrap_or_else(|| "Manual account merge via CLI".to_owned()),
        merge_type: MergeType::AdminInitiated,
        performed_by: args.admin_id,
    };

    engine.merge_accounts(&request).await?;

    tracing::info!(
        primary = %preview.primary.email,
        merged = %preview.merged.email,
        "Merge complete; {} is gone",
        merged_id
    );

    Ok(())
}

fn log_preview(preview: &MergePreview) {
    tracing::info!(
        id = %preview.primary.id,
        email = %preview.primary.email,
        role = %preview.primary.role,
        "Primary (survives)"
    );
    tracing::info!(
        id = %preview.merged.id,
        email = %preview.merged.email,
        role = %preview.merged.role,
        "Merged (deleted)"
    );

    for (category, count) in preview.data_to_merge.iter() {
        if count > 0 {
            tracing::info!("  {category}: {count} rows will move");
        }
    }
    tracing::info!(
        "Total rows to move: {}",
        preview.data_to_merge.total()
    );

    for conflict in &preview.conflicts {
        tracing::warn!("Conflict: {conflict}");
    }
}

/// Ask the operator a yes/no question on the terminal.
#[allow(clippy::print_stdout)]
fn confirm(question: &str) -> Result<bool, CliError> {
    print!("{question} [y/N] ");
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;

    Ok(matches!(answer.trim(), "y" | "Y" | "yes" | "YES"))
}
