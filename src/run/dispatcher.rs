//! Task dispatch loop
//!
//! Executes the resolved task list strictly in order, one task at a time.
//! Failures are isolated per task: a failed render or query never stops the
//! batch. Each failed task leaves a readable error artifact next to its
//! rendered SQL.

use std::path::Path;

use crate::config::JobDefinition;
use crate::engine::{execute_with_retry, QueryEngine, RETRY_BACKOFF};
use crate::logsink::RunLogger;
use crate::workspace::{write_file, ArtifactPaths, Workspace};

use super::context::RunContext;
use super::template::{load_template, render};

/// Terminal state of one dispatched task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Referenced by the action order but not defined in the job document
    SkippedUndefined,
    /// Defined but disabled via `isEnable: false`
    SkippedDisabled,
    /// Rendered and persisted, execution suppressed
    DryRun,
    Succeeded,
    Failed,
}

#[derive(Debug)]
pub struct TaskOutcome {
    pub task: String,
    pub status: TaskStatus,
    pub error: Option<String>,
}

impl TaskOutcome {
    fn ok(task: &str, status: TaskStatus) -> Self {
        Self {
            task: task.to_string(),
            status,
            error: None,
        }
    }
}

/// Run every resolved task, collecting per-task outcomes.
///
/// The rendered SQL is persisted for every task that reaches rendering,
/// dry run included; the engine is only invoked outside dry run.
pub async fn dispatch(
    tasks: &[String],
    job: &JobDefinition,
    ctx: &RunContext,
    ws: &Workspace,
    artifacts: &ArtifactPaths,
    engine: &dyn QueryEngine,
    logger: &RunLogger<'_>,
) -> Vec<TaskOutcome> {
    let mut outcomes = Vec::with_capacity(tasks.len());

    for task_name in tasks {
        let Some(task_conf) = job.task(task_name) else {
            tracing::warn!(task = %task_name, "task not defined in config, skipping");
            outcomes.push(TaskOutcome::ok(task_name, TaskStatus::SkippedUndefined));
            continue;
        };

        if !task_conf.enabled {
            tracing::info!(task = %task_name, "task disabled, skipping");
            outcomes.push(TaskOutcome::ok(task_name, TaskStatus::SkippedDisabled));
            continue;
        }

        logger
            .log("load_query", &format!("Loading SQL template for task: {task_name}"))
            .await;
        let template_path = ws.task_template_path(&job.job_name, task_name);
        let template = match load_template(&template_path) {
            Ok(t) => t,
            Err(err) => {
                outcomes.push(record_failure(task_name, &err.to_string(), None, artifacts));
                continue;
            }
        };

        logger
            .log("render_query", &format!("Rendering SQL template for task: {task_name}"))
            .await;
        let sql = match render(&template, &task_conf.params, ctx) {
            Ok(sql) => sql,
            Err(err) => {
                outcomes.push(record_failure(task_name, &err.to_string(), None, artifacts));
                continue;
            }
        };

        let sql_path = artifacts.logs.join(format!("{task_name}.sql"));
        if let Err(err) = write_file(&sql_path, &sql) {
            outcomes.push(record_failure(task_name, &err.to_string(), None, artifacts));
            continue;
        }

        if ctx.dry_run {
            tracing::info!(task = %task_name, "[DRY-RUN] would execute");
            outcomes.push(TaskOutcome::ok(task_name, TaskStatus::DryRun));
            continue;
        }

        logger
            .log("execute_query", &format!("Executing query for task: {task_name}"))
            .await;
        tracing::info!(task = %task_name, "running task");
        match execute_with_retry(engine, &sql, &RETRY_BACKOFF).await {
            Ok(_) => outcomes.push(TaskOutcome::ok(task_name, TaskStatus::Succeeded)),
            Err(err) => {
                outcomes.push(record_failure(
                    task_name,
                    &err.to_string(),
                    Some(&sql_path),
                    artifacts,
                ));
            }
        }
    }

    outcomes
}

/// Persist an error artifact and point the operator at it
fn record_failure(
    task_name: &str,
    error: &str,
    sql_path: Option<&Path>,
    artifacts: &ArtifactPaths,
) -> TaskOutcome {
    let mut message = format!("Error in task '{task_name}': {error}\n");
    if let Some(path) = sql_path {
        message.push_str(&format!("Rendered SQL: {}\n", path.display()));
    }

    let error_path = artifacts.errors.join(format!("{task_name}_error.md"));
    if let Err(err) = write_file(&error_path, &message) {
        tracing::warn!(error = %err, "could not write error artifact");
    }
    tracing::error!(
        task = %task_name,
        "Hi BI Developer we have a problem, open file {}",
        error_path.display()
    );

    TaskOutcome {
        task: task_name.to_string(),
        status: TaskStatus::Failed,
        error: Some(error.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ActionConfig, JobDefinition};
    use crate::data::ResultTable;
    use crate::engine::EngineError;
    use crate::run::context::Action;
    use crate::run::resolver::resolve;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails any statement containing "boom"; counts non-log executions
    #[derive(Default)]
    struct ScriptedEngine {
        queries: AtomicUsize,
    }

    #[async_trait]
    impl QueryEngine for ScriptedEngine {
        async fn execute(&self, sql: &str) -> Result<ResultTable, EngineError> {
            if sql.starts_with("INSERT INTO `") && sql.contains("daily_logs") {
                return Ok(ResultTable::empty());
            }
            self.queries.fetch_add(1, Ordering::SeqCst);
            if sql.contains("boom") {
                Err(EngineError::Rejected {
                    status: 400,
                    message: "syntax error".to_string(),
                })
            } else {
                Ok(ResultTable::empty())
            }
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        ws: Workspace,
        artifacts: ArtifactPaths,
        job: JobDefinition,
    }

    fn fixture(templates: &[(&str, &str)], config: &str) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path());
        for (task, sql) in templates {
            write_file(
                &dir.path().join("pipelines").join("fact").join(format!("{task}.sql")),
                sql,
            )
            .unwrap();
        }
        let config_path = ws.job_config_path("fact");
        write_file(&config_path, config).unwrap();
        let job = JobDefinition::load(&config_path, "fact").unwrap();
        let artifacts = ws.job_artifacts("fact").unwrap();
        Fixture {
            _dir: dir,
            ws,
            artifacts,
            job,
        }
    }

    fn selected(entries: &str, job_name: &str) -> Vec<String> {
        let actions: ActionConfig =
            serde_json::from_str(&format!(r#"{{"daily": {entries}}}"#)).unwrap();
        resolve(&actions, Action::Daily, job_name)
    }

    #[tokio::test]
    async fn test_failed_task_does_not_stop_the_batch() {
        let fx = fixture(
            &[
                ("first", "SELECT 1"),
                ("second", "SELECT boom"),
                ("third", "SELECT 3"),
            ],
            r#"{"fact": {"tasks": {"first": {}, "second": {}, "third": {}}}}"#,
        );
        let ctx = RunContext::new("proj", "fact", Action::Daily, 0, false);
        let engine = ScriptedEngine::default();
        let logger = RunLogger::new(&engine, &ctx, "etl_runner");

        let tasks = selected(r#"["first", "second", "third"]"#, "fact");
        let outcomes =
            dispatch(&tasks, &fx.job, &ctx, &fx.ws, &fx.artifacts, &engine, &logger).await;

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].status, TaskStatus::Succeeded);
        assert_eq!(outcomes[1].status, TaskStatus::Failed);
        assert_eq!(outcomes[2].status, TaskStatus::Succeeded);

        let artifact = fx.artifacts.errors.join("second_error.md");
        let content = std::fs::read_to_string(artifact).unwrap();
        assert!(content.contains("Error in task 'second'"));
        assert!(content.contains("Rendered SQL:"));
    }

    #[tokio::test]
    async fn test_disabled_and_undefined_tasks_are_skipped() {
        let fx = fixture(
            &[("active", "SELECT 1"), ("dormant", "SELECT 2")],
            r#"{"fact": {"tasks": {"active": {}, "dormant": {"isEnable": false}}}}"#,
        );
        let ctx = RunContext::new("proj", "fact", Action::Daily, 0, false);
        let engine = ScriptedEngine::default();
        let logger = RunLogger::new(&engine, &ctx, "etl_runner");

        let tasks = selected(r#"["ghost", "dormant", "active"]"#, "fact");
        let outcomes =
            dispatch(&tasks, &fx.job, &ctx, &fx.ws, &fx.artifacts, &engine, &logger).await;

        assert_eq!(outcomes[0].status, TaskStatus::SkippedUndefined);
        assert_eq!(outcomes[1].status, TaskStatus::SkippedDisabled);
        assert_eq!(outcomes[2].status, TaskStatus::Succeeded);
        // Skipped tasks render nothing
        assert!(!fx.artifacts.logs.join("dormant.sql").exists());
        assert_eq!(engine.queries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dry_run_renders_but_never_executes() {
        let fx = fixture(
            &[("first", "SELECT '{date}'"), ("second", "SELECT 2")],
            r#"{"fact": {"tasks": {"first": {}, "second": {}}}}"#,
        );
        let ctx = RunContext::new("proj", "fact", Action::Daily, 0, true);
        let engine = ScriptedEngine::default();
        let logger = RunLogger::new(&engine, &ctx, "etl_runner");

        let tasks = selected(r#"["first", "second"]"#, "fact");
        let outcomes =
            dispatch(&tasks, &fx.job, &ctx, &fx.ws, &fx.artifacts, &engine, &logger).await;

        assert!(outcomes.iter().all(|o| o.status == TaskStatus::DryRun));
        assert!(fx.artifacts.logs.join("first.sql").exists());
        assert!(fx.artifacts.logs.join("second.sql").exists());
        assert_eq!(engine.queries.load(Ordering::SeqCst), 0);

        let rendered = std::fs::read_to_string(fx.artifacts.logs.join("first.sql")).unwrap();
        assert!(rendered.contains(&ctx.y_m_d));
    }

    #[tokio::test]
    async fn test_missing_template_fails_only_that_task() {
        let fx = fixture(
            &[("present", "SELECT 1")],
            r#"{"fact": {"tasks": {"absent": {}, "present": {}}}}"#,
        );
        let ctx = RunContext::new("proj", "fact", Action::Daily, 0, false);
        let engine = ScriptedEngine::default();
        let logger = RunLogger::new(&engine, &ctx, "etl_runner");

        let tasks = selected(r#"["absent", "present"]"#, "fact");
        let outcomes =
            dispatch(&tasks, &fx.job, &ctx, &fx.ws, &fx.artifacts, &engine, &logger).await;

        assert_eq!(outcomes[0].status, TaskStatus::Failed);
        assert!(outcomes[0].error.as_deref().unwrap().contains("template not found"));
        assert_eq!(outcomes[1].status, TaskStatus::Succeeded);
    }
}
