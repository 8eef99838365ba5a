// src/transform/aggregate.rs

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, HashSet};

use crate::error::Result;
use crate::observe::{PipelineEvent, PipelineObserver, Stage};
use crate::schema::registry::{POST_AGGREGATES, PRE_AGGREGATES};
use crate::schema::ColumnType;
use crate::table::{Table, Value, ValueKey};
use crate::validate::{gate, ValidationMode};

/// First instant of the calendar month containing `ts`.
pub fn month_start(ts: NaiveDateTime) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(ts.year(), ts.month(), 1)?.and_hms_opt(0, 0, 0)
}

#[derive(Default)]
struct Bucket {
    total_sales: f64,
    customers: HashSet<ValueKey>,
}

/// Monthly `total_sales` (Σ total_revenue) and `unique_customers` over the
/// merged table. Months without orders produce no row.
#[tracing::instrument(level = "debug", skip_all, fields(rows = merged.len()))]
pub fn aggregate(merged: &Table, observer: &dyn PipelineObserver) -> Result<Table> {
    observer.observe(PipelineEvent::StageStarted {
        stage: Stage::Aggregate,
        input_rows: merged.len(),
    });

    let input = gate(merged.clone(), &PRE_AGGREGATES, ValidationMode::Pre, observer)?;
    let input = input.map_column("merged", "order_date", |v| v.coerce(ColumnType::DateTime))?;

    let date = input.require_column("merged", "order_date")?;
    let revenue = input.require_column("merged", "total_revenue")?;
    let customer = input.require_column("merged", "customer_id")?;

    let mut buckets: BTreeMap<NaiveDateTime, Bucket> = BTreeMap::new();
    let mut undated_rows = 0;
    for row in input.rows() {
        let Some(month) = row[date].as_timestamp().and_then(month_start) else {
            undated_rows += 1;
            continue;
        };
        let bucket = buckets.entry(month).or_default();
        bucket.total_sales += row[revenue].as_f64().unwrap_or(0.0);
        if let Some(k) = row[customer].key() {
            bucket.customers.insert(k);
        }
    }

    let rows = buckets
        .into_iter()
        .map(|(month, b)| {
            vec![
                Value::Timestamp(month),
                Value::Float(b.total_sales),
                Value::Int(b.customers.len() as i64),
            ]
        })
        .collect();
    let out = Table::from_rows(["order_date", "total_sales", "unique_customers"], rows)?;

    observer.observe(PipelineEvent::MonthlyAggregated {
        buckets: out.len(),
        undated_rows,
    });
    let out = gate(out, &POST_AGGREGATES, ValidationMode::Post, observer)?;
    observer.observe(PipelineEvent::StageFinished {
        stage: Stage::Aggregate,
        output_rows: out.len(),
    });
    Ok(out)
}
