//! Table-freshness monitoring
//!
//! One shared query template reports `hours_diff` since each table's last
//! update; the flag is computed client-side against the configured
//! threshold. Besides alerts, every run writes a summary report covering
//! all checked tables.

use std::collections::HashMap;

use crate::alerts::{aggregate, Notifier};
use crate::config::TablesConfig;
use crate::data::{ResultTable, Value};
use crate::engine::{execute_with_retry, QueryEngine, RETRY_BACKOFF};
use crate::logsink::RunLogger;
use crate::run::context::DATETIME_FMT;
use crate::run::template::{load_template, substitute};
use crate::run::{RunContext, RunError};
use crate::workspace::{write_file, Workspace};

use super::{alert_or_success, record_check_failure, FLAG_COLUMN};

/// Column the shared template must return
const HOURS_COLUMN: &str = "hours_diff";

pub async fn run_tables(
    ctx: &RunContext,
    ws: &Workspace,
    engine: &dyn QueryEngine,
    notifier: &Notifier,
) -> Result<(), RunError> {
    let artifacts = ws.monitor_artifacts("tables")?;
    let logger = RunLogger::new(engine, ctx, "table_monitoring");

    logger.log("init_config", "Loading table configuration").await;
    let config = TablesConfig::load(&ws.tables_config_path())?;
    logger
        .log("load_query_template", "Loading SQL template")
        .await;
    let template = load_template(&ws.tables_query_path())?;

    let mut results: Vec<ResultTable> = Vec::new();

    for (table_id, check) in &config.tables {
        if !check.enabled {
            continue;
        }
        tracing::info!(table = %table_id, "checking table freshness");

        logger
            .log("render_query", &format!("Rendering SQL query for table: {table_id}"))
            .await;
        let params: HashMap<String, String> = [
            ("project_id".to_string(), ctx.project_id.clone()),
            ("dataset".to_string(), check.dataset.clone()),
            ("table".to_string(), check.table.clone()),
            ("description".to_string(), check.description.clone()),
            ("thresh_in_hours".to_string(), check.thresh_in_hours.to_string()),
            ("run_time".to_string(), ctx.run_time_str()),
        ]
        .into_iter()
        .collect();
        let sql = match substitute(&template, &params) {
            Ok(sql) => sql,
            Err(err) => {
                record_check_failure(&check.table, &err.to_string(), &artifacts);
                continue;
            }
        };

        logger
            .log("write_outputs", &format!("Writing SQL to temp folder for table: {table_id}"))
            .await;
        write_file(&artifacts.logs.join(format!("table_{}.sql", check.table)), &sql)?;

        if ctx.dry_run {
            continue;
        }

        logger
            .log("execute_query", &format!("Executing query for table: {table_id}"))
            .await;
        let mut table = match execute_with_retry(engine, &sql, &RETRY_BACKOFF).await {
            Ok(table) => table,
            Err(err) => {
                record_check_failure(&check.table, &err.to_string(), &artifacts);
                continue;
            }
        };
        if table.is_empty() {
            continue;
        }

        // Threshold comparison happens here, not in the warehouse
        let Some(hours_idx) = table.column_index(HOURS_COLUMN) else {
            record_check_failure(
                &check.table,
                &format!("result is missing the '{HOURS_COLUMN}' column"),
                &artifacts,
            );
            continue;
        };
        let thresholds = vec![Value::Float64(check.thresh_in_hours); table.row_count()];
        let flags: Vec<Value> = table
            .rows
            .iter()
            .map(|row| {
                let hours = row.get(hours_idx).and_then(Value::as_f64);
                Value::Bool(hours.map(|h| h > check.thresh_in_hours).unwrap_or(false))
            })
            .collect();
        table.add_column("thresh_in_hours", thresholds)?;
        table.add_column(FLAG_COLUMN, flags)?;

        logger
            .log("aggregate_results", &format!("Processing results for table: {table_id}"))
            .await;
        results.push(table);
    }

    if !ctx.dry_run {
        let payload = aggregate(
            &results,
            FLAG_COLUMN,
            format!("Table Freshness Alert - {}", ctx.y_m_d),
            "*These tables are not fresh (exceeded freshness threshold)*",
            ctx.run_time,
        )?;
        alert_or_success(
            "Table Freshness",
            payload.as_ref(),
            "All tables are fresh and up to date",
            &format!("{}_monitoring_alert_{}", ctx.job_name, ctx.y_m_d),
            &artifacts,
            notifier,
        )
        .await?;

        if !results.is_empty() {
            logger.log("write_summary", "Writing summary report").await;
            let combined = ResultTable::concat(&results)?;
            let report = summary_report(ctx, &combined)?;
            write_file(
                &artifacts.logs.join(format!("table_monitoring_{}.md", ctx.y_m_d)),
                &report,
            )?;
        }
    }

    logger.log("end", "Table monitoring completed").await;
    Ok(())
}

/// Per-run report over all checked tables, alerting or not
fn summary_report(ctx: &RunContext, combined: &ResultTable) -> Result<String, RunError> {
    let flagged = combined.flagged_rows(FLAG_COLUMN)?;
    let alerts_section = if flagged.is_empty() {
        "All tables are fresh!".to_string()
    } else {
        flagged.to_text_table()
    };
    Ok(format!(
        "# Table Freshness Report - {}\n\n\
         ## Summary\n\
         - **Total Tables Checked**: {}\n\
         - **Tables with Alerts**: {}\n\
         - **Check Time**: {}\n\n\
         ## Results\n\n{}\n\
         ## Alerts\n\n{}\n",
        ctx.y_m_d,
        combined.row_count(),
        flagged.row_count(),
        ctx.run_time.format(DATETIME_FMT),
        combined.to_text_table(),
        alerts_section,
    ))
}
