//! Result table accumulation
//!
//! Rows are appended through a [`TableBuilder`] in processing order.
//! [`TableBuilder::finish`] consumes the builder, so once a table is frozen
//! nothing can be appended to it.

use crate::engine::FeatureVector;
use std::collections::HashSet;

/// Header of the identifying column
pub const ID_COLUMN: &str = "ID_Name";

/// Header of the error column, present only when a case failed
pub const ERROR_COLUMN: &str = "Error";

/// Outcome of one case
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
#[cfg_attr(feature = "json", serde(rename_all = "lowercase"))]
pub enum RowOutcome {
    Features(FeatureVector),
    Failed(String),
}

/// One row of the result table
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct FeatureRow {
    name: String,
    outcome: RowOutcome,
}

impl FeatureRow {
    /// Creates a successful row
    pub fn success(name: impl Into<String>, features: FeatureVector) -> Self {
        Self {
            name: name.into(),
            outcome: RowOutcome::Features(features),
        }
    }

    /// Creates a failure row carrying only the error message
    pub fn failure(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome: RowOutcome::Failed(message.into()),
        }
    }

    /// Identifying case name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn outcome(&self) -> &RowOutcome {
        &self.outcome
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, RowOutcome::Failed(_))
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            RowOutcome::Failed(msg) => Some(msg),
            RowOutcome::Features(_) => None,
        }
    }

    pub fn features(&self) -> Option<&FeatureVector> {
        match &self.outcome {
            RowOutcome::Features(f) => Some(f),
            RowOutcome::Failed(_) => None,
        }
    }

    /// Feature value, `None` when the row has no such feature
    pub fn value(&self, feature: &str) -> Option<f64> {
        self.features().and_then(|f| f.get(feature))
    }
}

/// A single table cell
///
/// `Absent` marks a feature that was not computed for this row; it is
/// never the same as a computed zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell<'a> {
    Text(&'a str),
    Number(f64),
    Absent,
}

/// Append-only accumulator for [`FeatureRow`]s
#[derive(Debug, Default)]
pub struct TableBuilder {
    rows: Vec<FeatureRow>,
    feature_columns: Vec<String>,
    seen: HashSet<String>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a row, registering any feature names not yet seen
    pub fn push(&mut self, row: FeatureRow) {
        if let Some(features) = row.features() {
            for name in features.names() {
                if !self.seen.contains(name) {
                    self.seen.insert(name.to_string());
                    self.feature_columns.push(name.to_string());
                }
            }
        }
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Freezes the accumulated rows into an immutable table
    pub fn finish(self) -> ResultTable {
        ResultTable {
            rows: self.rows,
            feature_columns: self.feature_columns,
        }
    }
}

/// Frozen result of a batch run
///
/// Columns are the identifying column, the error column when any row
/// failed, then every feature name in first-seen order.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct ResultTable {
    rows: Vec<FeatureRow>,
    feature_columns: Vec<String>,
}

impl ResultTable {
    /// All column headers in output order
    pub fn columns(&self) -> Vec<&str> {
        let mut columns = vec![ID_COLUMN];
        if self.failure_count() > 0 {
            columns.push(ERROR_COLUMN);
        }
        columns.extend(self.feature_columns.iter().map(String::as_str));
        columns
    }

    pub fn feature_columns(&self) -> &[String] {
        &self.feature_columns
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn failure_count(&self) -> usize {
        self.rows.iter().filter(|r| r.is_failure()).count()
    }

    pub fn success_count(&self) -> usize {
        self.len() - self.failure_count()
    }

    /// Looks up one cell by row index and column header
    pub fn cell(&self, row: usize, column: &str) -> Cell<'_> {
        let Some(row) = self.rows.get(row) else {
            return Cell::Absent;
        };
        match column {
            ID_COLUMN => Cell::Text(row.name()),
            ERROR_COLUMN => row.error().map(Cell::Text).unwrap_or(Cell::Absent),
            feature => row.value(feature).map(Cell::Number).unwrap_or(Cell::Absent),
        }
    }

    /// Cells of one row, aligned with [`ResultTable::columns`]
    pub fn row_cells(&self, row: usize) -> Vec<Cell<'_>> {
        self.columns()
            .into_iter()
            .map(|column| self.cell(row, column))
            .collect()
    }
}
