//! Feature rows and the table that holds them.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum FeatureError {
    #[error("feature column '{0}' is not present in the table")]
    MissingColumn(String),

    #[error("row {index} is out of range for a table of {len} rows")]
    RowOutOfRange { index: usize, len: usize },
}

/// One retained bar: its timestamp, its close and one value per column.
///
/// Every value is finite; rows with an incomplete look-back never get here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub timestamp: NaiveDateTime,
    pub close: f64,
    pub values: Vec<f64>,
}

/// Named columns plus rows in bar order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureTable {
    columns: Vec<String>,
    rows: Vec<FeatureRow>,
}

impl FeatureTable {
    pub fn new(columns: Vec<String>, rows: Vec<FeatureRow>) -> Self {
        debug_assert!(rows.iter().all(|r| r.values.len() == columns.len()));
        Self { columns, rows }
    }

    /// A table with the given columns and no rows.
    pub fn empty(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
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

    pub fn last(&self) -> Option<&FeatureRow> {
        self.rows.last()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Values of one column, in row order.
    pub fn column(&self, name: &str) -> Result<Vec<f64>, FeatureError> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| FeatureError::MissingColumn(name.to_string()))?;
        Ok(self.rows.iter().map(|r| r.values[idx]).collect())
    }

    /// Resolve column names to positions, failing on the first unknown one.
    pub fn resolve(&self, names: &[&str]) -> Result<Vec<usize>, FeatureError> {
        names
            .iter()
            .map(|name| {
                self.column_index(name)
                    .ok_or_else(|| FeatureError::MissingColumn(name.to_string()))
            })
            .collect()
    }

    /// Values of row `index` restricted to `names`, in the order given.
    pub fn select_row(&self, index: usize, names: &[&str]) -> Result<Vec<f64>, FeatureError> {
        let positions = self.resolve(names)?;
        let row = self.rows.get(index).ok_or(FeatureError::RowOutOfRange {
            index,
            len: self.rows.len(),
        })?;
        Ok(positions.iter().map(|&p| row.values[p]).collect())
    }
}
