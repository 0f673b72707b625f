//! Alert aggregation
//!
//! The three monitoring suites share one algorithm: union per-check result
//! tables, scan a boolean flag column, and build an alert payload covering
//! exactly the flagged subset. Threshold semantics live upstream (in the
//! warehouse query or a prior comparison step); this module only consumes
//! the resulting flag.

use chrono::NaiveDateTime;

use crate::data::{ResultTable, TableError};
use crate::run::context::DATETIME_FMT;

/// An operator-facing alert, immutable once built
#[derive(Debug, Clone)]
pub struct AlertPayload {
    pub title: String,
    pub summary: String,
    /// Flagged subset rendered as a plain-text table
    pub detail: String,
    /// Number of flagged rows
    pub count: usize,
    pub generated_at: NaiveDateTime,
}

impl AlertPayload {
    /// The persisted markdown artifact, the durable record of the alert
    pub fn to_markdown(&self) -> String {
        format!(
            "# {}\n\n## Summary\n{}\n\n## Alert Details\n\n{}\n\n## Generated at\n{}\n",
            self.title,
            self.summary,
            self.detail,
            self.generated_at.format(DATETIME_FMT),
        )
    }
}

/// Combine per-check results and evaluate the flag column.
///
/// Returns `Ok(None)` when the combined table is empty or no row is
/// flagged. Row order in the payload is source order: earlier checks'
/// rows precede later ones, making output reproducible for a fixed input.
pub fn aggregate(
    results: &[ResultTable],
    flag_column: &str,
    title: impl Into<String>,
    summary: impl Into<String>,
    generated_at: NaiveDateTime,
) -> Result<Option<AlertPayload>, TableError> {
    let combined = ResultTable::concat(results)?;
    if combined.is_empty() {
        return Ok(None);
    }
    let flagged = combined.flagged_rows(flag_column)?;
    if flagged.is_empty() {
        return Ok(None);
    }
    Ok(Some(AlertPayload {
        title: title.into(),
        summary: summary.into(),
        detail: flagged.to_text_table(),
        count: flagged.row_count(),
        generated_at,
    }))
}
