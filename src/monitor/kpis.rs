//! KPI deviation monitoring
//!
//! Each KPI has a dedicated query template that compares today's value
//! against a trailing window and sets `raise_flag` when the deviation
//! exceeds `thresh_in_percent`.

use crate::alerts::{aggregate, Notifier};
use crate::config::{require_keys, KpisConfig, KPI_REQUIRED_KEYS};
use crate::data::ResultTable;
use crate::engine::{execute_with_retry, QueryEngine, RETRY_BACKOFF};
use crate::logsink::RunLogger;
use crate::run::template::{build_params, load_template, substitute};
use crate::run::{RunContext, RunError};
use crate::workspace::{write_file, Workspace};

use super::{alert_or_success, record_check_failure, FLAG_COLUMN};

pub async fn run_kpis(
    ctx: &RunContext,
    ws: &Workspace,
    engine: &dyn QueryEngine,
    notifier: &Notifier,
) -> Result<(), RunError> {
    let artifacts = ws.monitor_artifacts("kpis")?;
    let logger = RunLogger::new(engine, ctx, "kpis_monitoring");

    logger.log("init_config", "Loading KPI configuration").await;
    let config = KpisConfig::load(&ws.kpis_config_path())?;
    logger
        .log("validate_config", "Configuration validation completed")
        .await;

    let mut results: Vec<ResultTable> = Vec::new();

    for (group_name, group) in &config.tables {
        tracing::info!(group = %group_name, "checking KPI group");
        for (kpi_name, spec) in &group.kpis {
            if !spec.enabled {
                continue;
            }
            require_keys(
                &spec.params,
                &KPI_REQUIRED_KEYS,
                &format!("kpis_config.tables[{group_name}].kpis[{kpi_name}]"),
            )?;

            logger
                .log("load_query", &format!("Loading SQL template for KPI: {kpi_name}"))
                .await;
            let template = match load_template(&ws.kpi_query_path(kpi_name)) {
                Ok(t) => t,
                Err(err) => {
                    record_check_failure(kpi_name, &err.to_string(), &artifacts);
                    continue;
                }
            };

            logger
                .log("render_query", &format!("Rendering SQL query for KPI: {kpi_name}"))
                .await;
            let params = build_params(&spec.params, &[("kpi_name", kpi_name.clone())], ctx);
            let sql = match substitute(&template, &params) {
                Ok(sql) => sql,
                Err(err) => {
                    record_check_failure(kpi_name, &err.to_string(), &artifacts);
                    continue;
                }
            };

            logger
                .log("write_outputs", &format!("Writing SQL to temp folder for KPI: {kpi_name}"))
                .await;
            write_file(&artifacts.logs.join(format!("kpi_{kpi_name}.sql")), &sql)?;

            if ctx.dry_run {
                continue;
            }

            logger
                .log("execute_query", &format!("Executing query for KPI: {kpi_name}"))
                .await;
            match execute_with_retry(engine, &sql, &RETRY_BACKOFF).await {
                Ok(table) => {
                    logger
                        .log("aggregate_results", &format!("Merging results for KPI: {kpi_name}"))
                        .await;
                    results.push(table);
                }
                Err(err) => record_check_failure(kpi_name, &err.to_string(), &artifacts),
            }
        }
    }

    if !ctx.dry_run {
        let payload = aggregate(
            &results,
            FLAG_COLUMN,
            format!("KPI Monitoring Alert - {}", ctx.y_m_d),
            "*There is a significant change in the KPIs*",
            ctx.run_time,
        )?;
        alert_or_success(
            "KPI",
            payload.as_ref(),
            "All KPIs within normal ranges",
            &format!("{}_monitoring_alert_{}", ctx.job_name, ctx.y_m_d),
            &artifacts,
            notifier,
        )
        .await?;
    }

    logger.log("end", "KPI monitoring completed").await;
    Ok(())
}
