// src/load/mod.rs
//! Warehouse load step. The engine only hands over a finished table and a
//! destination; [`ParquetLoader`] lays those out as files on disk.

use anyhow::{Context, Result};
use arrow::{
    array::{ArrayRef, Float64Builder, Int64Builder, StringBuilder, TimestampMillisecondBuilder},
    datatypes::{DataType, Field, Schema, TimeUnit},
    record_batch::RecordBatch,
};
use parquet::{arrow::ArrowWriter, basic::Compression, file::properties::WriterProperties};
use std::{
    fmt,
    fs::{self, File},
    path::PathBuf,
    sync::Arc,
};
use tracing::info;

use crate::table::{Table, Value};

/// `database.schema.table` triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Destination {
    pub database: String,
    pub schema: String,
    pub table: String,
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.database, self.schema, self.table)
    }
}

pub trait WarehouseLoader {
    fn load(&self, table: &Table, destination: &Destination) -> Result<()>;
}

/// Writes `<root>/<database>/<schema>/<table>.parquet`, replacing any
/// previous file.
pub struct ParquetLoader {
    root: PathBuf,
}

impl ParquetLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, destination: &Destination) -> PathBuf {
        self.root
            .join(&destination.database)
            .join(&destination.schema)
            .join(format!("{}.parquet", destination.table))
    }
}

impl WarehouseLoader for ParquetLoader {
    fn load(&self, table: &Table, destination: &Destination) -> Result<()> {
        let path = self.path_for(destination);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }

        let batch = to_record_batch(table).with_context(|| format!("converting {}", destination))?;
        let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
            .context("creating Arrow writer")?;
        writer.write(&batch).context("writing batch")?;
        writer.close().context("closing writer")?;

        info!(%destination, rows = table.len(), path = %path.display(), "loaded");
        Ok(())
    }
}

/// Arrow type for a column, from its first non-null value. Columns with no
/// values, or mixed kinds, are written as strings.
fn column_type<'a>(values: impl Iterator<Item = &'a Value>) -> DataType {
    let mut ty: Option<DataType> = None;
    for v in values {
        let this = match v {
            Value::Null => continue,
            Value::Int(_) => DataType::Int64,
            Value::Float(_) => DataType::Float64,
            Value::Str(_) => DataType::Utf8,
            Value::Timestamp(_) => DataType::Timestamp(TimeUnit::Millisecond, None),
        };
        match &ty {
            None => ty = Some(this),
            Some(t) if *t == this => {}
            Some(_) => return DataType::Utf8,
        }
    }
    ty.unwrap_or(DataType::Utf8)
}

pub fn to_record_batch(table: &Table) -> Result<RecordBatch> {
    let mut fields = Vec::with_capacity(table.columns().len());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(table.columns().len());

    for (idx, name) in table.columns().iter().enumerate() {
        let values = || table.rows().iter().map(move |r| &r[idx]);
        let ty = column_type(values());
        let array: ArrayRef = match &ty {
            DataType::Int64 => {
                let mut b = Int64Builder::new();
                for v in values() {
                    b.append_option(match v {
                        Value::Int(i) => Some(*i),
                        _ => None,
                    });
                }
                Arc::new(b.finish())
            }
            DataType::Float64 => {
                let mut b = Float64Builder::new();
                for v in values() {
                    b.append_option(v.as_f64());
                }
                Arc::new(b.finish())
            }
            DataType::Timestamp(_, _) => {
                let mut b = TimestampMillisecondBuilder::new();
                for v in values() {
                    b.append_option(v.as_timestamp().map(|ts| ts.and_utc().timestamp_millis()));
                }
                Arc::new(b.finish())
            }
            _ => {
                let mut b = StringBuilder::new();
                for v in values() {
                    b.append_option((!v.is_null()).then(|| v.to_string()));
                }
                Arc::new(b.finish())
            }
        };
        fields.push(Field::new(name, ty, true));
        arrays.push(array);
    }

    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).context("building record batch")
}
