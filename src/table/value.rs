use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;

use super::date_parser::parse_datetime;
use crate::schema::ColumnType;

/// Layout used when a timestamp has to be rendered as text.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single cell.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Int(i64),
    Float(f64),
    Str(String),
    Timestamp(NaiveDateTime),
}

/// Hashable, totally ordered projection of a non-null [`Value`], used for
/// join keys, grouping and uniqueness checks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueKey {
    Int(i64),
    Float(u64),
    Str(String),
    Timestamp(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    /// `None` for `Null`; `-0.0` and `0.0` share a key.
    pub fn key(&self) -> Option<ValueKey> {
        match self {
            Value::Null => None,
            Value::Int(i) => Some(ValueKey::Int(*i)),
            Value::Float(f) if *f == 0.0 => Some(ValueKey::Float(0f64.to_bits())),
            Value::Float(f) => Some(ValueKey::Float(f.to_bits())),
            Value::Str(s) => Some(ValueKey::Str(s.clone())),
            Value::Timestamp(ts) => Some(ValueKey::Timestamp(*ts)),
        }
    }

    /// Cast to `ty`, yielding `Null` when the value cannot be represented.
    pub fn coerce(&self, ty: ColumnType) -> Value {
        match (ty, self) {
            (_, Value::Null) => Value::Null,

            (ColumnType::Int, Value::Int(i)) => Value::Int(*i),
            (ColumnType::Int, Value::Float(f)) => float_to_int(*f),
            (ColumnType::Int, Value::Str(s)) => {
                let s = s.trim();
                match s.parse::<i64>() {
                    Ok(i) => Value::Int(i),
                    Err(_) => s.parse::<f64>().map(float_to_int).unwrap_or(Value::Null),
                }
            }

            (ColumnType::Float, Value::Int(i)) => Value::Float(*i as f64),
            (ColumnType::Float, Value::Float(f)) if f.is_finite() => Value::Float(*f),
            (ColumnType::Float, Value::Str(s)) => match s.trim().parse::<f64>() {
                Ok(f) if f.is_finite() => Value::Float(f),
                _ => Value::Null,
            },

            (ColumnType::Str, Value::Str(s)) => Value::Str(s.clone()),
            (ColumnType::Str, Value::Int(_) | Value::Float(_) | Value::Timestamp(_)) => {
                Value::Str(self.to_string())
            }

            (ColumnType::DateTime, Value::Timestamp(ts)) => Value::Timestamp(*ts),
            (ColumnType::DateTime, Value::Str(s)) => {
                parse_datetime(s).map(Value::Timestamp).unwrap_or(Value::Null)
            }
            // compact `YYYYMMDD` dates come out of CSV inference as integers
            (ColumnType::DateTime, Value::Int(i)) => parse_datetime(&i.to_string())
                .map(Value::Timestamp)
                .unwrap_or(Value::Null),

            _ => Value::Null,
        }
    }
}

fn float_to_int(f: f64) -> Value {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Value::Int(f as i64)
    } else {
        Value::Null
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => f.write_str(s),
            Value::Timestamp(ts) => write!(f, "{}", ts.format(TIMESTAMP_FORMAT)),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn coerces_numbers() {
        assert_eq!(Value::Float(2.0).coerce(ColumnType::Int), Value::Int(2));
        assert_eq!(Value::Float(2.5).coerce(ColumnType::Int), Value::Null);
        assert_eq!(Value::Str("7".into()).coerce(ColumnType::Int), Value::Int(7));
        assert_eq!(Value::Str("7.0".into()).coerce(ColumnType::Int), Value::Int(7));
        assert_eq!(Value::Int(3).coerce(ColumnType::Float), Value::Float(3.0));
        assert_eq!(Value::Str("x".into()).coerce(ColumnType::Float), Value::Null);
        assert_eq!(Value::Float(f64::NAN).coerce(ColumnType::Float), Value::Null);
    }

    #[test]
    fn coerces_strings_and_dates() {
        assert_eq!(Value::Int(1001).coerce(ColumnType::Str), Value::Str("1001".into()));
        let ts = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(
            Value::Str("2025-01-01".into()).coerce(ColumnType::DateTime),
            Value::Timestamp(ts)
        );
        assert_eq!(
            Value::Str("soon".into()).coerce(ColumnType::DateTime),
            Value::Null
        );
        assert_eq!(Value::Int(5).coerce(ColumnType::DateTime), Value::Null);
        assert_eq!(
            Value::Int(20250101).coerce(ColumnType::DateTime),
            Value::Timestamp(ts)
        );
        assert_eq!(Value::Int(20251301).coerce(ColumnType::DateTime), Value::Null);
        assert_eq!(
            Value::Timestamp(ts).coerce(ColumnType::Str),
            Value::Str("2025-01-01 00:00:00".into())
        );
    }

    #[test]
    fn keys_ignore_null_and_fold_signed_zero() {
        assert_eq!(Value::Null.key(), None);
        assert_eq!(Value::Float(-0.0).key(), Value::Float(0.0).key());
        assert_ne!(Value::Int(1).key(), Value::Float(1.0).key());
    }
}
