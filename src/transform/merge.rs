// src/transform/merge.rs

use std::collections::HashMap;

use crate::error::Result;
use crate::observe::{PipelineEvent, PipelineObserver, Stage};
use crate::pipeline::TableRole;
use crate::table::{Table, Value, ValueKey};

/// Inner equi-join on `key`, keeping left row order. Non-key columns present
/// on both sides get `_x` (left) / `_y` (right) suffixes.
///
/// Returns the joined table and the number of left rows that found no
/// partner.
pub fn inner_join(
    left: &Table,
    right: &Table,
    key: &str,
    left_name: &str,
    right_name: &str,
) -> Result<(Table, usize)> {
    let lk = left.require_column(left_name, key)?;
    let rk = right.require_column(right_name, key)?;

    let mut index: HashMap<ValueKey, Vec<usize>> = HashMap::new();
    for (i, row) in right.rows().iter().enumerate() {
        if let Some(k) = row[rk].key() {
            index.entry(k).or_default().push(i);
        }
    }

    let right_cols: Vec<usize> = (0..right.columns().len()).filter(|&i| i != rk).collect();
    let mut columns = Vec::with_capacity(left.columns().len() + right_cols.len());
    for (i, name) in left.columns().iter().enumerate() {
        let clash = i != lk && right_cols.iter().any(|&j| &right.columns()[j] == name);
        columns.push(if clash { format!("{name}_x") } else { name.clone() });
    }
    for &j in &right_cols {
        let name = &right.columns()[j];
        let clash = left.columns().iter().enumerate().any(|(i, c)| i != lk && c == name);
        columns.push(if clash { format!("{name}_y") } else { name.clone() });
    }

    let mut out = Table::new(columns);
    let mut dropped = 0;
    for row in left.rows() {
        let partners = row[lk].key().and_then(|k| index.get(&k));
        let Some(partners) = partners else {
            dropped += 1;
            continue;
        };
        for &p in partners {
            let mut joined = row.clone();
            joined.extend(right_cols.iter().map(|&j| right.rows()[p][j].clone()));
            out.push_row(joined)?;
        }
    }
    Ok((out, dropped))
}

/// `profit / total_revenue`; undefined (null) when revenue is zero or either
/// operand is missing.
pub fn profit_margin(profit: &Value, total_revenue: &Value) -> Value {
    match (profit.as_f64(), total_revenue.as_f64()) {
        (Some(p), Some(r)) if r != 0.0 => {
            let m = p / r;
            if m.is_finite() {
                Value::Float(m)
            } else {
                Value::Null
            }
        }
        _ => Value::Null,
    }
}

/// sales ⨝ customers on `customer_id`, then ⨝ products on `product_id`,
/// plus `profit_margin`.
pub fn merge(
    sales: &Table,
    customers: &Table,
    products: &Table,
    observer: &dyn PipelineObserver,
) -> Result<Table> {
    observer.observe(PipelineEvent::StageStarted {
        stage: Stage::Merge,
        input_rows: sales.len(),
    });

    let (with_customers, dropped) =
        inner_join(sales, customers, "customer_id", "sales", "customers")?;
    observer.observe(PipelineEvent::JoinDropped {
        right: TableRole::Customers,
        dropped,
    });

    let (merged, dropped) =
        inner_join(&with_customers, products, "product_id", "sales", "products")?;
    observer.observe(PipelineEvent::JoinDropped {
        right: TableRole::Products,
        dropped,
    });

    let profit = merged.require_column("merged", "profit")?;
    let revenue = merged.require_column("merged", "total_revenue")?;
    let margins: Vec<Value> = merged
        .rows()
        .iter()
        .map(|row| profit_margin(&row[profit], &row[revenue]))
        .collect();
    observer.observe(PipelineEvent::UndefinedProfitMargin {
        rows: margins.iter().filter(|m| m.is_null()).count(),
    });

    let merged = merged.with_column("profit_margin", margins)?;
    observer.observe(PipelineEvent::StageFinished {
        stage: Stage::Merge,
        output_rows: merged.len(),
    });
    Ok(merged)
}
