// src/schema/types.rs

use regex::Regex;
use std::fmt;

use crate::table::Value;

/// Declared type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Int,
    Float,
    Str,
    DateTime,
}

impl ColumnType {
    /// Whether a non-null `value` has exactly this type.
    pub fn admits(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (ColumnType::Int, Value::Int(_))
                | (ColumnType::Float, Value::Float(_))
                | (ColumnType::Str, Value::Str(_))
                | (ColumnType::DateTime, Value::Timestamp(_))
        )
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ColumnType::Int => "int64",
            ColumnType::Float => "float64",
            ColumnType::Str => "str",
            ColumnType::DateTime => "datetime64[ns]",
        })
    }
}

/// A business-rule constraint on a single value.
#[derive(Debug, Clone)]
pub enum Check {
    GreaterThan(f64),
    GreaterThanOrEqual(f64),
    /// Inclusive on both ends.
    Between { min: f64, max: f64 },
    /// Length in chars, inclusive on both ends.
    StrLength { min: usize, max: usize },
    Matches(Regex),
    IsIn(Vec<String>),
}

impl Check {
    /// Evaluate against a non-null value. A value of the wrong kind never
    /// satisfies a check.
    pub fn holds(&self, value: &Value) -> bool {
        match self {
            Check::GreaterThan(min) => value.as_f64().is_some_and(|v| v > *min),
            Check::GreaterThanOrEqual(min) => value.as_f64().is_some_and(|v| v >= *min),
            Check::Between { min, max } => {
                value.as_f64().is_some_and(|v| v >= *min && v <= *max)
            }
            Check::StrLength { min, max } => value.as_str().is_some_and(|s| {
                let n = s.chars().count();
                n >= *min && n <= *max
            }),
            Check::Matches(re) => value.as_str().is_some_and(|s| re.is_match(s)),
            Check::IsIn(allowed) => value
                .as_str()
                .is_some_and(|s| allowed.iter().any(|a| a == s)),
        }
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Check::GreaterThan(v) => write!(f, "greater_than({v})"),
            Check::GreaterThanOrEqual(v) => write!(f, "greater_than_or_equal_to({v})"),
            Check::Between { min, max } => write!(f, "in_range({min}, {max})"),
            Check::StrLength { min, max } => write!(f, "str_length({min}, {max})"),
            Check::Matches(re) => write!(f, "str_matches('{}')", re.as_str()),
            Check::IsIn(allowed) => write!(f, "isin({allowed:?})"),
        }
    }
}

/// Type, nullability and constraints for one column.
#[derive(Debug, Clone)]
pub struct ColumnSchema {
    pub name: String,
    pub ty: ColumnType,
    pub nullable: bool,
    pub unique: bool,
    pub checks: Vec<Check>,
}

impl ColumnSchema {
    /// A non-nullable, non-unique column with no checks.
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable: false,
            unique: false,
            checks: Vec::new(),
        }
    }

    pub fn check(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// A named set of column declarations. Columns not declared here are
/// allowed in a validated table.
#[derive(Debug, Clone)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnSchema>,
    /// When set, a value passes the type check if it can be coerced to the
    /// declared type, and checks run on the coerced value.
    pub coerce: bool,
}

impl TableSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            coerce: false,
        }
    }

    pub fn coerce(mut self) -> Self {
        self.coerce = true;
        self
    }

    pub fn column(mut self, column: ColumnSchema) -> Self {
        self.columns.push(column);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }
}
