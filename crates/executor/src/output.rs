//! Results of routed statements.
//!
//! A routed statement produces either rows (select) or an update count
//! (insert, delete). A statement that was not routed produces nothing at
//! all: executors return `Ok(None)` and the caller runs the statement the
//! ordinary way.

use clusterbind_core::{Error, Result, Value};
use serde::{Deserialize, Serialize};

/// Successful result of a routed statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExecutorResult {
    /// Rows of a select
    Rows(ResultRows),
    /// Rows written or deleted
    UpdateCount(usize),
}

impl ExecutorResult {
    /// Rows, if this is a select result
    pub fn into_rows(self) -> Option<ResultRows> {
        match self {
            ExecutorResult::Rows(rows) => Some(rows),
            ExecutorResult::UpdateCount(_) => None,
        }
    }

    /// Update count, if this is a write result
    pub fn update_count(&self) -> Option<usize> {
        match self {
            ExecutorResult::UpdateCount(n) => Some(*n),
            ExecutorResult::Rows(_) => None,
        }
    }
}

/// Row cursor over a select result
///
/// Columns are in select-list order. The cursor starts before the first
/// row; `next` advances it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRows {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    #[serde(skip)]
    position: Option<usize>,
}

impl ResultRows {
    /// Rows with the given column labels
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns,
            rows,
            position: None,
        }
    }

    /// Column labels
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Every row
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Advance to the next row; false past the last one
    pub fn next(&mut self) -> bool {
        let next = self.position.map_or(0, |p| p + 1);
        self.position = Some(next.min(self.rows.len()));
        next < self.rows.len()
    }

    /// Value of a column (0-based) in the current row
    pub fn get(&self, column: usize) -> Result<&Value> {
        let row = self
            .position
            .and_then(|p| self.rows.get(p))
            .ok_or_else(|| Error::user("Result cursor is not on a row"))?;
        row.get(column)
            .ok_or_else(|| Error::user(format!("Column index {} out of range ({} columns)", column, self.columns.len())))
    }

    /// Value of a column by label in the current row
    pub fn get_by_name(&self, label: &str) -> Result<&Value> {
        let column = self
            .columns
            .iter()
            .position(|c| c == label)
            .ok_or_else(|| Error::user(format!("No column {} in result", label)))?;
        self.get(column)
    }
}
