//! Pipeline run orchestration
//!
//! Control flow: resolve the action into an ordered task list, then hand it
//! to the dispatcher. Configuration errors abort before any task executes;
//! everything after that point is best-effort per task.

pub mod context;
pub mod dispatcher;
pub mod resolver;
pub mod template;

pub use context::{Action, RunContext};
pub use dispatcher::{TaskOutcome, TaskStatus};
pub use template::TemplateError;

use crate::config::{ActionConfig, ConfigError, JobDefinition};
use crate::engine::{EngineError, QueryEngine};
use crate::logsink::RunLogger;
use crate::workspace::Workspace;

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Table(#[from] crate::data::TableError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Run the ETL pipeline for the context's (job, action) pair.
///
/// An action with no configured tasks is a clean no-op, not an error.
/// Per-task failures are captured in the returned outcomes and never
/// bubble up.
pub async fn run_pipeline(
    ctx: &RunContext,
    ws: &Workspace,
    engine: &dyn QueryEngine,
) -> Result<Vec<TaskOutcome>, RunError> {
    let logger = RunLogger::new(engine, ctx, "etl_runner");
    logger.log("init_config", "Loading configuration files").await;

    let actions = ActionConfig::load(&ws.action_config_path())?;
    let selected = resolver::resolve(&actions, ctx.action, &ctx.job_name);
    if selected.is_empty() {
        tracing::info!(action = %ctx.action, "no tasks found for action");
        return Ok(Vec::new());
    }

    let job = JobDefinition::load(&ws.job_config_path(&ctx.job_name), &ctx.job_name)?;
    let artifacts = ws.job_artifacts(&ctx.job_name)?;

    let outcomes =
        dispatcher::dispatch(&selected, &job, ctx, ws, &artifacts, engine, &logger).await;

    let failed = outcomes
        .iter()
        .filter(|o| o.status == TaskStatus::Failed)
        .count();
    tracing::info!(
        tasks = outcomes.len(),
        failed,
        "pipeline completed"
    );
    logger.log("end", "ETL pipeline completed").await;
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ResultTable;
    use crate::workspace::write_file;
    use async_trait::async_trait;

    struct OkEngine;

    #[async_trait]
    impl QueryEngine for OkEngine {
        async fn execute(&self, _sql: &str) -> Result<ResultTable, EngineError> {
            Ok(ResultTable::empty())
        }
    }

    #[tokio::test]
    async fn test_unknown_action_is_a_clean_noop() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path());
        write_file(&ws.action_config_path(), r#"{"daily": ["load_{job_name}"]}"#).unwrap();

        let ctx = RunContext::new("proj", "fact", Action::Delete, 0, false);
        let outcomes = run_pipeline(&ctx, &ws, &OkEngine).await.unwrap();
        assert!(outcomes.is_empty());
    }

    #[tokio::test]
    async fn test_missing_action_config_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path());

        let ctx = RunContext::new("proj", "fact", Action::Daily, 0, false);
        let err = run_pipeline(&ctx, &ws, &OkEngine).await.unwrap_err();
        assert!(matches!(err, RunError::Config(ConfigError::Io { .. })));
    }

    #[tokio::test]
    async fn test_full_pipeline_renders_and_executes() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path());
        write_file(&ws.action_config_path(), r#"{"daily": ["load_{job_name}"]}"#).unwrap();
        write_file(
            &ws.job_config_path("fact"),
            r#"{"fact": {"tasks": {"load_fact": {"target_table": "facts.daily"}}}}"#,
        )
        .unwrap();
        write_file(
            &dir.path().join("pipelines/fact/load_fact.sql"),
            "INSERT INTO `{project}.{target_table}` SELECT 1",
        )
        .unwrap();

        let ctx = RunContext::new("proj", "fact", Action::Daily, 0, false);
        let outcomes = run_pipeline(&ctx, &ws, &OkEngine).await.unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].status, TaskStatus::Succeeded);
    }
}
