//! Flagman: Configuration-Driven SQL Pipeline Runner and Monitor
//!
//! Flagman renders parameterized SQL templates from JSON configuration,
//! submits them to a cloud warehouse over HTTP, and raises alerts when
//! monitored KPIs drift, scheduled processes stop running, or source
//! tables go stale.
//!
//! # Features
//!
//! - **Action Sequences**: Ordered task lists per run action (init/daily/delete)
//! - **Template Rendering**: `{placeholder}` substitution from task config,
//!   with reserved run-scoped keys that always win
//! - **Failure Isolation**: One broken task never stops the rest of the run
//! - **Monitoring Suites**: KPI thresholds, log freshness, table freshness
//! - **Webhook Alerts**: Slack-style attachments with retry and truncation
//! - **Run Logging**: Per-step audit rows written back into the warehouse
//!
//! # Example
//!
//! ```no_run
//! use flagman::engine::HttpEngine;
//! use flagman::run::{run_pipeline, Action, RunContext};
//! use flagman::workspace::Workspace;
//!
//! # async fn example() -> Result<(), flagman::run::RunError> {
//! let ws = Workspace::new(".");
//! let engine = HttpEngine::from_env();
//! let ctx = RunContext::new("my-project", "daily_kpis", Action::Daily, 0, false);
//! let outcomes = run_pipeline(&ctx, &ws, &engine).await?;
//! println!("ran {} tasks", outcomes.len());
//! # Ok(())
//! # }
//! ```

pub mod alerts;
pub mod config;
pub mod data;
pub mod engine;
pub mod logsink;
pub mod monitor;
pub mod run;
pub mod workspace;

// Re-export commonly used types
pub use data::{ResultTable, TableError, Value};
pub use engine::{EngineError, QueryEngine};
pub use run::{run_pipeline, Action, RunContext, RunError};
pub use workspace::Workspace;
