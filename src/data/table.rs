//! Tabular result sets returned by the query engine.
//!
//! Monitoring checks run one query per table/KPI and union the results into
//! a single table before alert evaluation. Concatenation enforces a shared
//! schema contract: differing column sets are an error, never silently
//! reconciled.

use serde::{Deserialize, Serialize};

use super::value::Value;

/// Maximum rendered width of a column in the plain-text table
const MAX_COLUMN_WIDTH: usize = 30;

/// An ordered result set with named columns
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultTable {
    /// Column names
    pub columns: Vec<String>,
    /// Result rows
    pub rows: Vec<Vec<Value>>,
}

/// Result-table shape errors
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("schema mismatch: expected columns {expected:?}, found {found:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("column not found: {0}")]
    ColumnNotFound(String),

    #[error("column length mismatch: table has {expected} rows, got {found} values")]
    LengthMismatch { expected: usize, found: usize },
}

impl ResultTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Build a table from the engine's JSON wire format
    pub fn from_json_rows(columns: Vec<String>, rows: Vec<Vec<serde_json::Value>>) -> Self {
        let rows = rows
            .into_iter()
            .map(|row| row.iter().map(Value::from_json).collect())
            .collect();
        Self { columns, rows }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Concatenate result tables, preserving source order.
    ///
    /// Empty parts are skipped; the first non-empty part defines the schema
    /// and every later part must match it exactly.
    pub fn concat(parts: &[ResultTable]) -> Result<ResultTable, TableError> {
        let mut combined = ResultTable::empty();
        for part in parts {
            if part.is_empty() {
                continue;
            }
            if combined.columns.is_empty() {
                combined.columns = part.columns.clone();
            } else if combined.columns != part.columns {
                return Err(TableError::SchemaMismatch {
                    expected: combined.columns.clone(),
                    found: part.columns.clone(),
                });
            }
            combined.rows.extend(part.rows.iter().cloned());
        }
        Ok(combined)
    }

    /// Append a column of pre-computed values
    pub fn add_column(&mut self, name: &str, values: Vec<Value>) -> Result<(), TableError> {
        if values.len() != self.rows.len() {
            return Err(TableError::LengthMismatch {
                expected: self.rows.len(),
                found: values.len(),
            });
        }
        self.columns.push(name.to_string());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
        Ok(())
    }

    /// Remove a column by name; a no-op when the column is absent
    pub fn drop_column(&self, name: &str) -> ResultTable {
        match self.column_index(name) {
            None => self.clone(),
            Some(idx) => {
                let columns = self
                    .columns
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != idx)
                    .map(|(_, c)| c.clone())
                    .collect();
                let rows = self
                    .rows
                    .iter()
                    .map(|row| {
                        row.iter()
                            .enumerate()
                            .filter(|(i, _)| *i != idx)
                            .map(|(_, v)| v.clone())
                            .collect()
                    })
                    .collect();
                ResultTable { columns, rows }
            }
        }
    }

    /// Whether any row has `flag_column = true`.
    ///
    /// Non-boolean and null cells count as not flagged. Empty tables never
    /// flag, regardless of schema.
    pub fn any_flagged(&self, flag_column: &str) -> Result<bool, TableError> {
        Ok(!self.flagged_rows(flag_column)?.is_empty())
    }

    /// The subset of rows where `flag_column = true`, in source order
    pub fn flagged_rows(&self, flag_column: &str) -> Result<ResultTable, TableError> {
        if self.is_empty() {
            return Ok(ResultTable::empty());
        }
        let idx = self
            .column_index(flag_column)
            .ok_or_else(|| TableError::ColumnNotFound(flag_column.to_string()))?;
        let rows = self
            .rows
            .iter()
            .filter(|row| row.get(idx).and_then(Value::as_bool).unwrap_or(false))
            .cloned()
            .collect();
        Ok(ResultTable {
            columns: self.columns.clone(),
            rows,
        })
    }

    /// Render as an aligned plain-text table for reports and alert files
    pub fn to_text_table(&self) -> String {
        if self.is_empty() {
            return "No data to display".to_string();
        }

        // Widths count chars, not bytes, so non-ASCII cells stay aligned
        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let content = self
                    .rows
                    .iter()
                    .map(|row| row.get(i).map(|v| v.to_string().chars().count()).unwrap_or(0))
                    .max()
                    .unwrap_or(0);
                content.max(name.chars().count()).min(MAX_COLUMN_WIDTH)
            })
            .collect();

        let mut out = String::new();
        let header: Vec<String> = self
            .columns
            .iter()
            .zip(&widths)
            .map(|(name, w)| center(name, *w))
            .collect();
        out.push_str(&header.join(" | "));
        out.push('\n');

        let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        out.push_str(&separator.join("-+-"));
        out.push('\n');

        for row in &self.rows {
            let cells: Vec<String> = row
                .iter()
                .zip(&widths)
                .map(|(value, w)| {
                    let s: String = value.to_string().chars().take(*w).collect();
                    format!("{:<width$}", s, width = w)
                })
                .collect();
            out.push_str(&cells.join(" | "));
            out.push('\n');
        }
        out
    }
}

fn center(s: &str, width: usize) -> String {
    let chars = s.chars().count();
    if chars >= width {
        return s.to_string();
    }
    let pad = width - chars;
    let left = pad / 2;
    format!("{}{}{}", " ".repeat(left), s, " ".repeat(pad - left))
}
