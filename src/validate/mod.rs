// src/validate/mod.rs
//! Validation gate: applies a [`TableSchema`] to a [`Table`].
//!
//! `check`/`validate` are pure. `gate` adds the pre/post policy: a pre-gate
//! violation is reported to the observer and the input goes through
//! untouched, a post-gate violation aborts the run.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{EtlError, Result};
use crate::observe::{PipelineEvent, PipelineObserver};
use crate::schema::TableSchema;
use crate::table::{Table, Value, ValueKey};

/// Which side of a transformation a gate guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// Advisory: log and pass the original table through.
    Pre,
    /// Fatal: a violation is a defect in the transformation.
    Post,
}

/// One failed (row, column, check) triple.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureCase {
    /// `None` when the failure concerns the whole column.
    pub row: Option<usize>,
    pub column: String,
    pub check: String,
    pub value: Option<Value>,
}

/// Every failure found by one schema application.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViolationReport {
    pub schema: String,
    pub failures: Vec<FailureCase>,
}

impl ViolationReport {
    pub fn failing_rows(&self) -> BTreeSet<usize> {
        self.failures.iter().filter_map(|f| f.row).collect()
    }

    pub fn failing_columns(&self) -> BTreeSet<String> {
        self.failures.iter().map(|f| f.column.clone()).collect()
    }

    /// The first `limit` failure cases, in report order.
    pub fn sample(&self, limit: usize) -> &[FailureCase] {
        &self.failures[..self.failures.len().min(limit)]
    }
}

impl fmt::Display for ViolationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "schema `{}`: {} failure case(s) in columns {:?}, rows {:?}",
            self.schema,
            self.failures.len(),
            self.failing_columns(),
            self.failing_rows()
        )
    }
}

impl std::error::Error for ViolationReport {}

/// Apply `schema` to `table`, collecting every failure case.
pub fn check(table: &Table, schema: &TableSchema) -> std::result::Result<(), ViolationReport> {
    let mut failures = Vec::new();

    for col in &schema.columns {
        let Some(idx) = table.column_index(&col.name) else {
            failures.push(FailureCase {
                row: None,
                column: col.name.clone(),
                check: "column_in_dataframe".into(),
                value: None,
            });
            continue;
        };

        let mut fail = |row: usize, check: String, value: &Value| {
            failures.push(FailureCase {
                row: Some(row),
                column: col.name.clone(),
                check,
                value: Some(value.clone()),
            });
        };

        let mut seen: BTreeMap<ValueKey, Vec<usize>> = BTreeMap::new();
        for (row_idx, row) in table.rows().iter().enumerate() {
            let raw = &row[idx];
            if raw.is_null() {
                if !col.nullable {
                    fail(row_idx, "not_nullable".into(), raw);
                }
                continue;
            }

            let coerced;
            let value = if schema.coerce {
                coerced = raw.coerce(col.ty);
                if coerced.is_null() {
                    fail(row_idx, format!("coerce_dtype('{}')", col.ty), raw);
                    continue;
                }
                &coerced
            } else {
                if !col.ty.admits(raw) {
                    fail(row_idx, format!("dtype('{}')", col.ty), raw);
                    continue;
                }
                raw
            };

            for c in &col.checks {
                if !c.holds(value) {
                    fail(row_idx, c.to_string(), raw);
                }
            }
            if col.unique {
                if let Some(key) = value.key() {
                    seen.entry(key).or_default().push(row_idx);
                }
            }
        }

        for rows in seen.values().filter(|rows| rows.len() > 1) {
            for &r in rows {
                fail(r, "field_uniqueness".into(), &table.rows()[r][idx]);
            }
        }
    }

    if failures.is_empty() {
        return Ok(());
    }
    failures.sort_by(|a, b| (a.row, &a.column).cmp(&(b.row, &b.column)));
    Err(ViolationReport {
        schema: schema.name.clone(),
        failures,
    })
}

/// Owned variant of [`check`]: hands the table back when it conforms.
pub fn validate(table: Table, schema: &TableSchema) -> std::result::Result<Table, ViolationReport> {
    check(&table, schema).map(|()| table)
}

/// Run `schema` as a pre- or post-gate.
pub fn gate(
    table: Table,
    schema: &TableSchema,
    mode: ValidationMode,
    observer: &dyn PipelineObserver,
) -> Result<Table> {
    match (check(&table, schema), mode) {
        (Ok(()), _) => Ok(table),
        (Err(report), ValidationMode::Pre) => {
            observer.observe(PipelineEvent::AdvisoryViolation { report });
            Ok(table)
        }
        (Err(report), ValidationMode::Post) => Err(EtlError::PostValidation(Box::new(report))),
    }
}
