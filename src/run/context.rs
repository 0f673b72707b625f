//! Per-invocation run state

use std::cell::Cell;

use chrono::{Duration, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

pub const DATE_FMT: &str = "%Y-%m-%d";
pub const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

/// Which task sequence a run executes
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// First-time setup
    Init,
    /// Recurring run
    Daily,
    /// Teardown
    Delete,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Init => write!(f, "init"),
            Action::Daily => write!(f, "daily"),
            Action::Delete => write!(f, "delete"),
        }
    }
}

/// Values derived once at process start and threaded through every call.
///
/// The step counter is process-local and intentionally not shareable across
/// threads; the whole runner is single-threaded by design.
#[derive(Debug)]
pub struct RunContext {
    pub project_id: String,
    pub job_name: String,
    pub action: Action,
    pub date_today: NaiveDate,
    pub run_time: NaiveDateTime,
    /// Run date minus `days_back`, formatted `YYYY-MM-DD`
    pub y_m_d: String,
    pub dry_run: bool,
    step: Cell<u64>,
}

impl RunContext {
    pub fn new(
        project_id: impl Into<String>,
        job_name: impl Into<String>,
        action: Action,
        days_back: i64,
        dry_run: bool,
    ) -> Self {
        let run_time = Local::now().naive_local();
        let date_today = run_time.date();
        let y_m_d = (date_today - Duration::days(days_back))
            .format(DATE_FMT)
            .to_string();
        Self {
            project_id: project_id.into(),
            job_name: job_name.into(),
            action,
            date_today,
            run_time,
            y_m_d,
            dry_run,
            step: Cell::new(0),
        }
    }

    /// Next strictly-increasing step id for run-log entries
    pub fn next_step_id(&self) -> u64 {
        let next = self.step.get() + 1;
        self.step.set(next);
        next
    }

    /// Run timestamp in the one canonical format used everywhere,
    /// SQL rendering included
    pub fn run_time_str(&self) -> String {
        self.run_time.format(DATETIME_FMT).to_string()
    }
}
