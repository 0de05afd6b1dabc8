//! StageLink CLI - Identity engine operator tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! sl-cli migrate
//!
//! # Scan the user base and write a tiered duplicate report
//! sl-cli find-duplicates --verbose
//!
//! # Scan and merge high-confidence pairs automatically
//! sl-cli find-duplicates --fix
//!
//! # Merge one account into another, interactively
//! sl-cli merge-accounts <primary-id> <merged-id> --reason "support ticket #4821"
//!
//! # Hourly cron: alert on duplicate activity
//! sl-cli monitor-duplicates --alert-threshold 0.9 --slack-webhook https://...
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `find-duplicates` - Batch scan with confidence-tiered report
//! - `merge-accounts` - Preview and execute one account merge
//! - `monitor-duplicates` - Periodic duplicate-activity alerting

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "sl-cli")]
#[command(author, version, about = "StageLink identity engine CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Scan the user base for duplicate accounts
    FindDuplicates {
        /// Merge high-confidence pairs (score >= 0.95) after the scan
        #[arg(long)]
        fix: bool,

        /// With --fix, also merge medium-confidence pairs (0.85-0.94)
        #[arg(long)]
        merge_similar: bool,

        /// Preview what --fix would do without writing anything
        #[arg(long)]
        dry_run: bool,

        /// Log every flagged pair, not just the summary
        #[arg(short, long)]
        verbose: bool,
    },
    /// Merge one account into another, deleting the duplicate
    MergeAccounts {
        /// ID of the account that survives
        primary_id: String,

        /// ID of the account to fold into the primary and delete
        merged_id: String,

        /// Justification recorded in the audit trail
        #[arg(long)]
        reason: Option<String>,

        /// Acting administrator identifier
        #[arg(long)]
        admin_id: Option<String>,

        /// Skip the interactive confirmation
        #[arg(long)]
        force: bool,

        /// Print the preview and exit without merging
        #[arg(long)]
        preview: bool,
    },
    /// Check for recent duplicate activity and dispatch alerts
    MonitorDuplicates {
        /// Minimum similarity score that triggers an alert
        #[arg(long, default_value_t = 0.9)]
        alert_threshold: f64,

        /// Email address to send alerts to (requires SMTP configuration)
        #[arg(long)]
        email: Option<String>,

        /// Slack incoming-webhook URL to post alerts to
        #[arg(long)]
        slack_webhook: Option<String>,

        /// Log every finding, not just the summary
        #[arg(short, long)]
        verbose: bool,
    },
}

impl Commands {
    const fn verbose(&self) -> bool {
        match self {
            Self::FindDuplicates { verbose, .. } | Self::MonitorDuplicates { verbose, .. } => {
                *verbose
            }
            _ => false,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.command.verbose());

    let result: Result<(), commands::CliError> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default_filter = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await,
        Commands::FindDuplicates {
            fix,
            merge_similar,
            dry_run,
            verbose,
        } => {
            commands::find_duplicates::run(commands::find_duplicates::Args {
                fix,
                merge_similar,
                dry_run,
                verbose,
            })
            .await
        }
        Commands::MergeAccounts {
            primary_id,
            merged_id,
            reason,
            admin_id,
            force,
            preview,
        } => {
            commands::merge_accounts::run(commands::merge_accounts::Args {
                primary_id,
                merged_id,
                reason,
                admin_id,
                force,
                preview,
            })
            .await
        }
        Commands::MonitorDuplicates {
            alert_threshold,
            email,
            slack_webhook,
            verbose,
        } => {
            commands::monitor::run(commands::monitor::Args {
                alert_threshold,
                email,
                slack_webhook,
                verbose,
            })
            .await
        }
    }
}
