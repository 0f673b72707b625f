//! Flagman CLI
//!
//! Run with: cargo run -- <PROJECT_ID> run --job-name daily_kpis
//!
//! Environment variables:
//! - FLAGMAN_ROOT: Workspace root holding pipelines/ and monitoring/ (default: current dir)
//! - FLAGMAN_ENGINE_URL: Query endpoint (default: http://127.0.0.1:8080/query)
//! - FLAGMAN_WEBHOOK_URL: Alert webhook URL; unset disables delivery
//! - FLAGMAN_SUMMARY_ONLY: "true" to send alert counts without row details
//! - FLAGMAN_SEND_SUCCESS: "true" to also notify when all checks pass
//! - RUST_LOG: Log level (default: flagman=info)

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use flagman::alerts::Notifier;
use flagman::engine::HttpEngine;
use flagman::monitor::{run_kpis, run_logs, run_tables};
use flagman::run::{run_pipeline, Action, RunContext, TaskStatus};
use flagman::workspace::Workspace;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(version, about = "Configuration-driven SQL pipeline runner and monitor")]
struct Cli {
    /// Cloud project the rendered queries run against
    project_id: String,

    #[command(subcommand)]
    command: Command,
}

/// Flags shared by every subcommand
#[derive(Debug, Args)]
struct Common {
    /// Which task sequence to execute
    #[arg(long, value_enum, default_value_t = Action::Daily)]
    job_action: Action,

    /// Render and persist SQL without executing anything
    #[arg(long)]
    dry_run: bool,

    /// Shift the reporting date this many days into the past
    #[arg(long, default_value_t = 0)]
    days_back: i64,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Execute a pipeline job's task sequence
    Run {
        /// Job directory under pipelines/
        #[arg(long)]
        job_name: String,

        #[command(flatten)]
        common: Common,
    },
    /// KPI threshold monitoring
    Kpis {
        #[arg(long, default_value = "kpis")]
        job_name: String,

        #[command(flatten)]
        common: Common,
    },
    /// Scheduled-process log freshness monitoring
    Logs {
        #[arg(long, default_value = "log")]
        job_name: String,

        #[command(flatten)]
        common: Common,
    },
    /// Source table freshness monitoring
    Tables {
        #[arg(long, default_value = "tables")]
        job_name: String,

        #[command(flatten)]
        common: Common,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flagman=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let root = match std::env::var("FLAGMAN_ROOT") {
        Ok(root) => PathBuf::from(root),
        Err(_) => std::env::current_dir()?,
    };
    let ws = Workspace::new(root);
    let engine = HttpEngine::from_env();
    let notifier = Notifier::from_env()?;

    match cli.command {
        Command::Run { job_name, common } => {
            let ctx = RunContext::new(
                cli.project_id,
                job_name,
                common.job_action,
                common.days_back,
                common.dry_run,
            );
            tracing::info!(
                job = %ctx.job_name,
                action = %ctx.action,
                date = %ctx.y_m_d,
                dry_run = ctx.dry_run,
                "starting pipeline run"
            );
            let outcomes = run_pipeline(&ctx, &ws, &engine).await?;
            let failed = outcomes
                .iter()
                .filter(|o| o.status == TaskStatus::Failed)
                .count();
            if failed > 0 {
                tracing::warn!(failed, "run finished with task failures; see error artifacts");
            }
        }
        Command::Kpis { job_name, common } => {
            let ctx = RunContext::new(
                cli.project_id,
                job_name,
                common.job_action,
                common.days_back,
                common.dry_run,
            );
            run_kpis(&ctx, &ws, &engine, &notifier).await?;
        }
        Command::Logs { job_name, common } => {
            let ctx = RunContext::new(
                cli.project_id,
                job_name,
                common.job_action,
                common.days_back,
                common.dry_run,
            );
            run_logs(&ctx, &ws, &engine, &notifier).await?;
        }
        Command::Tables { job_name, common } => {
            let ctx = RunContext::new(
                cli.project_id,
                job_name,
                common.job_action,
                common.days_back,
                common.dry_run,
            );
            run_tables(&ctx, &ws, &engine, &notifier).await?;
        }
    }

    Ok(())
}
