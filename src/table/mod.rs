// src/table/mod.rs
//! In-memory tables passed between pipeline stages.
//!
//! Every operation here returns a fresh [`Table`]; stages hold shared
//! references to their inputs and never mutate them.

pub mod date_parser;
pub mod utils;
pub mod value;

pub use value::{Value, ValueKey};

use crate::error::{EtlError, Result};

/// Ordered column names plus rows of typed values, one value per column.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// An empty table with the given header.
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Build a table, rejecting rows whose width differs from the header.
    pub fn from_rows<S: Into<String>>(
        columns: impl IntoIterator<Item = S>,
        rows: Vec<Vec<Value>>,
    ) -> Result<Self> {
        let mut table = Self::new(columns);
        table.rows.reserve(rows.len());
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(EtlError::RowWidth {
                row: self.rows.len(),
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Like [`Table::column_index`], but a missing column is an error
    /// attributed to `table`.
    pub fn require_column(&self, table: &str, name: &str) -> Result<usize> {
        self.column_index(name).ok_or_else(|| EtlError::MissingColumn {
            table: table.to_string(),
            column: name.to_string(),
        })
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// Iterate over one column's values in row order.
    pub fn column_values<'a>(&'a self, name: &str) -> Option<impl Iterator<Item = &'a Value> + 'a> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |r| &r[idx]))
    }

    /// Lowercase every column name and turn whitespace into underscores.
    pub fn with_normalized_columns(&self) -> Table {
        Table {
            columns: self
                .columns
                .iter()
                .map(|c| utils::normalize_column_name(c))
                .collect(),
            rows: self.rows.clone(),
        }
    }

    /// Keep only rows without a single null.
    pub fn drop_null_rows(&self) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .filter(|row| !row.iter().any(Value::is_null))
                .cloned()
                .collect(),
        }
    }

    /// Append `name`, or replace it in place if it already exists.
    pub fn with_column(&self, name: &str, values: Vec<Value>) -> Result<Table> {
        if values.len() != self.rows.len() {
            return Err(EtlError::RowWidth {
                row: values.len().min(self.rows.len()),
                expected: self.rows.len(),
                found: values.len(),
            });
        }
        let mut out = self.clone();
        match out.column_index(name) {
            Some(idx) => {
                for (row, v) in out.rows.iter_mut().zip(values) {
                    row[idx] = v;
                }
            }
            None => {
                out.columns.push(name.to_string());
                for (row, v) in out.rows.iter_mut().zip(values) {
                    row.push(v);
                }
            }
        }
        Ok(out)
    }

    /// Apply `f` to every value of an existing column.
    pub fn map_column<F>(&self, table: &str, name: &str, f: F) -> Result<Table>
    where
        F: Fn(&Value) -> Value,
    {
        let idx = self.require_column(table, name)?;
        let mut out = self.clone();
        for row in &mut out.rows {
            row[idx] = f(&row[idx]);
        }
        Ok(out)
    }

    /// Project onto `names`, in that order.
    pub fn select(&self, table: &str, names: &[&str]) -> Result<Table> {
        let idxs = names
            .iter()
            .map(|n| self.require_column(table, n))
            .collect::<Result<Vec<_>>>()?;
        Ok(Table {
            columns: names.iter().map(|n| n.to_string()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| idxs.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        })
    }
}
