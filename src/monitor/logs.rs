//! Log-freshness monitoring
//!
//! One shared query template runs per configured check group against the
//! run-log table; the query sets `raise_flag` for processes that have not
//! logged within their threshold. The free-form `message` column is dropped
//! from alert details.

use crate::alerts::{aggregate, Notifier};
use crate::config::LogsConfig;
use crate::data::ResultTable;
use crate::engine::{execute_with_retry, QueryEngine, RETRY_BACKOFF};
use crate::logsink::RunLogger;
use crate::run::template::{build_params, load_template, substitute};
use crate::run::{RunContext, RunError};
use crate::workspace::{write_file, Workspace};

use super::{alert_or_success, record_check_failure, FLAG_COLUMN};

pub async fn run_logs(
    ctx: &RunContext,
    ws: &Workspace,
    engine: &dyn QueryEngine,
    notifier: &Notifier,
) -> Result<(), RunError> {
    let artifacts = ws.monitor_artifacts("logs")?;
    let logger = RunLogger::new(engine, ctx, "logs_monitoring");

    logger.log("init_config", "Loading logs configuration").await;
    let config = LogsConfig::load(&ws.logs_config_path())?;
    logger
        .log("load_query_template", "Loading SQL template")
        .await;
    let template = load_template(&ws.logs_query_path())?;

    let mut results: Vec<ResultTable> = Vec::new();

    for (group_name, group_conf) in &config.tables {
        tracing::info!(group = %group_name, "checking log group");

        logger
            .log("render_query", &format!("Rendering SQL query for group: {group_name}"))
            .await;
        let params = build_params(group_conf, &[], ctx);
        let sql = match substitute(&template, &params) {
            Ok(sql) => sql,
            Err(err) => {
                record_check_failure(group_name, &err.to_string(), &artifacts);
                continue;
            }
        };

        logger
            .log("write_outputs", &format!("Writing SQL to temp folder for group: {group_name}"))
            .await;
        write_file(&artifacts.logs.join(format!("log_{group_name}.sql")), &sql)?;

        if ctx.dry_run {
            continue;
        }

        logger
            .log("execute_query", &format!("Executing query for group: {group_name}"))
            .await;
        match execute_with_retry(engine, &sql, &RETRY_BACKOFF).await {
            Ok(table) => {
                logger
                    .log("aggregate_results", &format!("Merging results for group: {group_name}"))
                    .await;
                results.push(table.drop_column("message"));
            }
            Err(err) => record_check_failure(group_name, &err.to_string(), &artifacts),
        }
    }

    if !ctx.dry_run {
        let payload = aggregate(
            &results,
            FLAG_COLUMN,
            format!("Logs Monitoring Alert - {}", ctx.y_m_d),
            "*These processes have not run within their freshness threshold*",
            ctx.run_time,
        )?;
        alert_or_success(
            "Logs",
            payload.as_ref(),
            "All monitored processes have run recently",
            &format!("{}_monitoring_alert_{}", ctx.job_name, ctx.y_m_d),
            &artifacts,
            notifier,
        )
        .await?;
    }

    logger.log("end", "Logs monitoring completed").await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::NotifySettings;
    use crate::data::Value;
    use crate::engine::EngineError;
    use crate::run::Action;
    use async_trait::async_trait;

    /// Returns one stale row per query, with a message column to be dropped
    struct StaleEngine;

    #[async_trait]
    impl QueryEngine for StaleEngine {
        async fn execute(&self, sql: &str) -> Result<ResultTable, EngineError> {
            if sql.starts_with("INSERT INTO `") && sql.contains("daily_logs") {
                return Ok(ResultTable::empty());
            }
            Ok(ResultTable::new(
                vec![
                    "job_name".to_string(),
                    "message".to_string(),
                    "raise_flag".to_string(),
                ],
                vec![vec![
                    Value::String("fact".to_string()),
                    Value::String("secret details".to_string()),
                    Value::Bool(true),
                ]],
            ))
        }
    }

    fn notifier() -> Notifier {
        Notifier::new(NotifySettings {
            webhook_url: None,
            summary_only: false,
            send_success: false,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_alert_detail_drops_message_column() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path());
        write_file(
            &ws.logs_config_path(),
            r#"{"tables": {"etl_jobs": {"thresh_in_hours": 24}}}"#,
        )
        .unwrap();
        write_file(
            &ws.logs_query_path(),
            "SELECT job_name, message, hours > {thresh_in_hours} AS raise_flag FROM `{project}.logs.daily_logs`",
        )
        .unwrap();

        let ctx = RunContext::new("proj", "log", Action::Daily, 0, false);
        run_logs(&ctx, &ws, &StaleEngine, &notifier()).await.unwrap();

        let alert_path = dir
            .path()
            .join("temp/monitoring/logs/alerts")
            .join(format!("log_monitoring_alert_{}.md", ctx.y_m_d));
        let content = std::fs::read_to_string(alert_path).unwrap();
        assert!(content.contains("fact"));
        assert!(!content.contains("secret details"));
    }

    #[tokio::test]
    async fn test_missing_shared_template_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path());
        write_file(&ws.logs_config_path(), r#"{"tables": {"g": {}}}"#).unwrap();

        let ctx = RunContext::new("proj", "log", Action::Daily, 0, false);
        let err = run_logs(&ctx, &ws, &StaleEngine, &notifier())
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::Template(_)));
    }
}
