//! Monitoring suites
//!
//! Three variants of the same pipeline: render a check query per configured
//! entry, run it, union the results, and evaluate the `raise_flag` column.
//! KPI and log checks compute the flag inside the warehouse query; table
//! freshness compares hours client-side. Check failures are isolated like
//! pipeline task failures; only configuration problems abort a suite.

use std::path::PathBuf;

use crate::alerts::{AlertPayload, Notifier};
use crate::run::RunError;
use crate::workspace::{write_file, ArtifactPaths};

pub mod kpis;
pub mod logs;
pub mod tables;

pub use kpis::run_kpis;
pub use logs::run_logs;
pub use tables::run_tables;

/// Boolean column marking a result row as alert-worthy
pub const FLAG_COLUMN: &str = "raise_flag";

/// Persist a per-check error artifact and point the operator at it
pub(crate) fn record_check_failure(check_name: &str, error: &str, artifacts: &ArtifactPaths) {
    let message = format!("The error is {error}\n");
    let error_path = artifacts.errors.join(format!("{check_name}_error.md"));
    if let Err(err) = write_file(&error_path, &message) {
        tracing::warn!(error = %err, "could not write error artifact");
    }
    tracing::error!(
        check = %check_name,
        "Hi BI Developer we have a problem, open file {}",
        error_path.display()
    );
}

/// Persist the alert artifact and deliver the notification, or send the
/// success message when there is nothing to alert on.
///
/// Delivery failures are warnings; the artifact is the durable record.
pub(crate) async fn alert_or_success(
    alert_type: &str,
    payload: Option<&AlertPayload>,
    success_message: &str,
    filename_stem: &str,
    artifacts: &ArtifactPaths,
    notifier: &Notifier,
) -> Result<Option<PathBuf>, RunError> {
    match payload {
        Some(payload) => {
            let alert_path = artifacts.alerts.join(format!("{filename_stem}.md"));
            write_file(&alert_path, &payload.to_markdown())?;
            if let Err(err) = notifier.send_alert(alert_type, payload, &alert_path).await {
                tracing::warn!(error = %err, "could not deliver alert notification");
            }
            tracing::warn!(
                count = payload.count,
                "{alert_type} alerts found, report at {}",
                alert_path.display()
            );
            Ok(Some(alert_path))
        }
        None => {
            if let Err(err) = notifier.send_success(alert_type, success_message).await {
                tracing::warn!(error = %err, "could not deliver success notification");
            }
            Ok(None)
        }
    }
}
