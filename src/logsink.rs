//! Append-only run log
//!
//! Every pipeline/monitoring step writes one record into the warehouse's
//! `logs.daily_logs` table for post-hoc run reconstruction. Entries are
//! best-effort: a failed insert is a warning, never a run failure. Dry runs
//! write nothing.

use chrono::Local;
use serde::Serialize;

use crate::engine::QueryEngine;
use crate::run::context::{RunContext, DATETIME_FMT, DATE_FMT};

/// One run-log row
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub ts: String,
    pub dt: String,
    /// 8 hex chars, fresh per record
    pub uid: String,
    pub host: String,
    pub job_name: String,
    pub job_action: String,
    /// Logical source component, passed explicitly by the caller
    pub source: String,
    pub step_id: u64,
    pub step_name: String,
    pub message: String,
}

impl StepRecord {
    pub fn new(ctx: &RunContext, source: &str, step_name: &str, message: &str) -> Self {
        let now = Local::now().naive_local();
        Self {
            ts: now.format(DATETIME_FMT).to_string(),
            dt: now.format(DATE_FMT).to_string(),
            uid: format!("{:08x}", rand::random::<u32>()),
            host: hostname::get()
                .map(|h| h.to_string_lossy().into_owned())
                .unwrap_or_else(|_| "unknown".to_string()),
            job_name: ctx.job_name.clone(),
            job_action: ctx.action.to_string(),
            source: source.to_string(),
            step_id: ctx.next_step_id(),
            step_name: step_name.to_string(),
            message: message.to_string(),
        }
    }

    /// Render the record as an INSERT against `<project>.logs.daily_logs`
    pub fn to_insert_sql(&self, project_id: &str) -> String {
        format!(
            "INSERT INTO `{project}.logs.daily_logs` \
             (ts, dt, uid, username, job_name, job_action, file_name, step_id, step_name, message) \
             VALUES ('{ts}', '{dt}', '{uid}', '{host}', '{job}', '{action}', '{source}', {step_id}, '{step}', '{message}')",
            project = project_id,
            ts = self.ts,
            dt = self.dt,
            uid = self.uid,
            host = escape(&self.host),
            job = escape(&self.job_name),
            action = self.job_action,
            source = escape(&self.source),
            step_id = self.step_id,
            step = escape(&self.step_name),
            message = escape(&self.message),
        )
    }
}

fn escape(s: &str) -> String {
    s.replace('\'', "''")
}

/// Run-log writer bound to one run and one source component
pub struct RunLogger<'a> {
    engine: &'a dyn QueryEngine,
    ctx: &'a RunContext,
    source: &'static str,
}

impl<'a> RunLogger<'a> {
    pub fn new(engine: &'a dyn QueryEngine, ctx: &'a RunContext, source: &'static str) -> Self {
        Self {
            engine,
            ctx,
            source,
        }
    }

    /// Record one step; skipped entirely in dry run
    pub async fn log(&self, step_name: &str, message: &str) {
        if self.ctx.dry_run {
            return;
        }
        let record = StepRecord::new(self.ctx, self.source, step_name, message);
        tracing::debug!(step_id = record.step_id, step = step_name, "run log");
        let sql = record.to_insert_sql(&self.ctx.project_id);
        if let Err(err) = self.engine.execute(&sql).await {
            tracing::warn!(error = %err, step = step_name, "could not write run log entry");
        }
    }
}
