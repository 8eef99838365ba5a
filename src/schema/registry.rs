// src/schema/registry.rs
//! Declared schemas for every gated table.
//!
//! Each business table has a loose `pre_*` schema (presence, and values
//! coercible to the declared type) and a strict `post_*` schema carrying the
//! business rules.

use once_cell::sync::Lazy;
use regex::Regex;

use super::types::{Check, ColumnSchema, ColumnType, TableSchema};
use crate::transform::segment::CustomerSegment;

pub const EMAIL_REGEX: &str = r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$";

static EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(EMAIL_REGEX).expect("EMAIL_REGEX compiles"));

fn col(name: &str, ty: ColumnType) -> ColumnSchema {
    ColumnSchema::new(name, ty)
}

// ─── sales ──────────────────────────────────────────────────────────────

pub static PRE_SALES: Lazy<TableSchema> = Lazy::new(|| {
    TableSchema::new("pre_sales")
        .coerce()
        .column(col("order_id", ColumnType::Str))
        .column(col("customer_id", ColumnType::Int))
        .column(col("product_id", ColumnType::Int))
        .column(col("order_date", ColumnType::DateTime))
        .column(col("amount", ColumnType::Float))
        .column(col("quantity", ColumnType::Float))
        .column(col("discount", ColumnType::Float))
        .column(col("profit", ColumnType::Float))
});

pub static POST_SALES: Lazy<TableSchema> = Lazy::new(|| {
    TableSchema::new("post_sales")
        .column(col("order_id", ColumnType::Str))
        .column(col("customer_id", ColumnType::Int).check(Check::GreaterThan(0.0)))
        .column(col("product_id", ColumnType::Int).check(Check::GreaterThan(0.0)))
        .column(col("order_date", ColumnType::DateTime))
        .column(col("amount", ColumnType::Float).check(Check::GreaterThanOrEqual(0.0)))
        .column(col("quantity", ColumnType::Int).check(Check::GreaterThanOrEqual(0.0)))
        .column(col("discount", ColumnType::Float).check(Check::Between {
            min: 0.0,
            max: 100.0,
        }))
        .column(col("profit", ColumnType::Float))
        .column(col("total_revenue", ColumnType::Float).check(Check::GreaterThanOrEqual(0.0)))
});

// ─── customers ──────────────────────────────────────────────────────────

pub static PRE_CUSTOMERS: Lazy<TableSchema> = Lazy::new(|| {
    TableSchema::new("pre_customers")
        .coerce()
        .column(col("customer_id", ColumnType::Int).unique())
        .column(col("name", ColumnType::Str))
        .column(col("email", ColumnType::Str))
        .column(col("signup_date", ColumnType::DateTime))
});

pub static POST_CUSTOMERS: Lazy<TableSchema> = Lazy::new(|| {
    TableSchema::new("post_customers")
        .column(
            col("customer_id", ColumnType::Int)
                .check(Check::GreaterThan(0.0))
                .unique(),
        )
        .column(col("name", ColumnType::Str).check(Check::StrLength { min: 0, max: 100 }))
        .column(col("email", ColumnType::Str).check(Check::Matches(EMAIL.clone())))
        .column(col("signup_date", ColumnType::DateTime))
});

// ─── products ───────────────────────────────────────────────────────────

pub static PRE_PRODUCTS: Lazy<TableSchema> = Lazy::new(|| {
    TableSchema::new("pre_products")
        .coerce()
        .column(col("product_id", ColumnType::Int))
        .column(col("product_name", ColumnType::Str))
        .column(col("category", ColumnType::Str))
        .column(col("price", ColumnType::Float))
});

pub static POST_PRODUCTS: Lazy<TableSchema> = Lazy::new(|| {
    TableSchema::new("post_products")
        .column(col("product_id", ColumnType::Int).check(Check::GreaterThan(0.0)))
        .column(col("product_name", ColumnType::Str).check(Check::StrLength { min: 0, max: 100 }))
        .column(col("category", ColumnType::Str))
        .column(col("price", ColumnType::Float).check(Check::GreaterThanOrEqual(0.0)))
});

// ─── monthly aggregates ─────────────────────────────────────────────────

/// Applied to the merged table going into aggregation.
pub static PRE_AGGREGATES: Lazy<TableSchema> = Lazy::new(|| {
    TableSchema::new("pre_aggregates")
        .coerce()
        .column(col("order_date", ColumnType::DateTime))
        .column(col("customer_id", ColumnType::Int))
        .column(col("total_revenue", ColumnType::Float))
});

pub static POST_AGGREGATES: Lazy<TableSchema> = Lazy::new(|| {
    TableSchema::new("post_aggregates")
        .column(col("order_date", ColumnType::DateTime))
        .column(col("total_sales", ColumnType::Float).check(Check::GreaterThanOrEqual(0.0)))
        .column(col("unique_customers", ColumnType::Int).check(Check::GreaterThanOrEqual(0.0)))
});

// ─── customer segments ──────────────────────────────────────────────────

pub static POST_SEGMENTS: Lazy<TableSchema> = Lazy::new(|| {
    let tiers = CustomerSegment::ALL
        .iter()
        .map(|s| s.as_str().to_string())
        .collect();
    TableSchema::new("post_segments")
        .column(
            col("customer_id", ColumnType::Int)
                .check(Check::GreaterThan(0.0))
                .unique(),
        )
        .column(col("total_spent", ColumnType::Float).check(Check::GreaterThanOrEqual(0.0)))
        .column(col("customer_segment", ColumnType::Str).check(Check::IsIn(tiers)))
        .column(col("segmentation_date", ColumnType::DateTime))
});

/// Every registered schema, in pipeline order.
pub fn all() -> [&'static TableSchema; 9] {
    [
        &*PRE_SALES,
        &*POST_SALES,
        &*PRE_CUSTOMERS,
        &*POST_CUSTOMERS,
        &*PRE_PRODUCTS,
        &*POST_PRODUCTS,
        &*PRE_AGGREGATES,
        &*POST_AGGREGATES,
        &*POST_SEGMENTS,
    ]
}

/// Look up a schema by its name, e.g. `"post_sales"`.
pub fn by_name(name: &str) -> Option<&'static TableSchema> {
    all().into_iter().find(|s| s.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_unique_and_resolvable() {
        let names: Vec<&str> = all().into_iter().map(|s| s.name.as_str()).collect();
        for name in &names {
            assert_eq!(by_name(name).map(|s| s.name.as_str()), Some(*name));
        }
        let mut deduped = names.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), names.len());
        assert!(by_name("post_forecast").is_none());
    }

    #[test]
    fn email_regex_accepts_plain_addresses_only() {
        assert!(EMAIL.is_match("ann@x.com"));
        assert!(EMAIL.is_match("first.last+tag@mail.example.org"));
        assert!(!EMAIL.is_match("ann@x"));
        assert!(!EMAIL.is_match("ann x@x.com"));
        assert!(!EMAIL.is_match("@x.com"));
    }

    #[test]
    fn post_segments_lists_all_tiers() {
        let seg = POST_SEGMENTS.get("customer_segment").unwrap();
        match &seg.checks[..] {
            [Check::IsIn(tiers)] => assert_eq!(tiers, &["Low", "Medium", "High", "VIP"]),
            other => panic!("unexpected checks {other:?}"),
        }
    }
}
