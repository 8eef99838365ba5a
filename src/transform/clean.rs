// src/transform/clean.rs

use crate::error::Result;
use crate::observe::{PipelineEvent, PipelineObserver, Stage};
use crate::pipeline::TableRole;
use crate::schema::registry::{
    POST_CUSTOMERS, POST_PRODUCTS, POST_SALES, PRE_CUSTOMERS, PRE_PRODUCTS, PRE_SALES,
};
use crate::schema::TableSchema;
use crate::table::{Table, Value};
use crate::validate::{gate, ValidationMode};

/// Cast every column `schema` declares to its declared type. Values that do
/// not survive the cast become null; undeclared columns are left alone.
pub fn coerce_columns(table: &Table, schema: &TableSchema) -> Table {
    let mut out = table.clone();
    for col in &schema.columns {
        if let Ok(t) = out.map_column(&schema.name, &col.name, |v| v.coerce(col.ty)) {
            out = t;
        }
    }
    out
}

/// normalize names → pre-gate → coerce → drop nulls → derive → post-gate
fn clean_with<F>(
    raw: &Table,
    role: TableRole,
    pre: &TableSchema,
    post: &TableSchema,
    observer: &dyn PipelineObserver,
    derive: F,
) -> Result<Table>
where
    F: FnOnce(Table) -> Result<Table>,
{
    observer.observe(PipelineEvent::StageStarted {
        stage: Stage::Clean(role),
        input_rows: raw.len(),
    });

    let normalized = gate(raw.with_normalized_columns(), pre, ValidationMode::Pre, observer)?;
    let cleaned = coerce_columns(&normalized, post).drop_null_rows();
    observer.observe(PipelineEvent::RowsCleaned {
        role,
        before: raw.len(),
        after: cleaned.len(),
    });

    let derived = derive(cleaned)?;
    let out = gate(derived, post, ValidationMode::Post, observer)?;

    observer.observe(PipelineEvent::StageFinished {
        stage: Stage::Clean(role),
        output_rows: out.len(),
    });
    Ok(out)
}

/// Clean raw sales and derive `total_revenue = amount × quantity`.
pub fn clean_sales(raw: &Table, observer: &dyn PipelineObserver) -> Result<Table> {
    clean_with(
        raw,
        TableRole::Sales,
        &PRE_SALES,
        &POST_SALES,
        observer,
        |sales| {
            let amount = sales.require_column("sales", "amount")?;
            let quantity = sales.require_column("sales", "quantity")?;
            let revenue = sales
                .rows()
                .iter()
                .map(|row| match (row[amount].as_f64(), row[quantity].as_f64()) {
                    (Some(a), Some(q)) => Value::Float(a * q),
                    _ => Value::Null,
                })
                .collect();
            sales.with_column("total_revenue", revenue)
        },
    )
}

/// Clean raw customers; `signup_date` is coerced to a timestamp.
pub fn clean_customers(raw: &Table, observer: &dyn PipelineObserver) -> Result<Table> {
    clean_with(
        raw,
        TableRole::Customers,
        &PRE_CUSTOMERS,
        &POST_CUSTOMERS,
        observer,
        Ok,
    )
}

pub fn clean_products(raw: &Table, observer: &dyn PipelineObserver) -> Result<Table> {
    clean_with(
        raw,
        TableRole::Products,
        &PRE_PRODUCTS,
        &POST_PRODUCTS,
        observer,
        Ok,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EtlError;
    use crate::observe::RecordingObserver;
    use chrono::NaiveDate;

    fn raw_sales() -> Table {
        Table::from_rows(
            [
                "Order ID",
                "Customer ID",
                "Product ID",
                "Order Date",
                "Amount",
                "Quantity",
                "Discount",
                "Profit",
            ],
            vec![
                vec![
                    "A1".into(),
                    1i64.into(),
                    10i64.into(),
                    "2026-01-05".into(),
                    100i64.into(),
                    2i64.into(),
                    0i64.into(),
                    20i64.into(),
                ],
                // unparsable date: coerced to null and dropped
                vec![
                    "A2".into(),
                    1i64.into(),
                    10i64.into(),
                    "someday".into(),
                    5.5.into(),
                    1i64.into(),
                    0i64.into(),
                    1i64.into(),
                ],
                // missing amount
                vec![
                    "A3".into(),
                    2i64.into(),
                    10i64.into(),
                    "2026-02-01".into(),
                    Value::Null,
                    1i64.into(),
                    0i64.into(),
                    1i64.into(),
                ],
                // fractional quantity cannot be an integer count
                vec![
                    1004i64.into(),
                    2i64.into(),
                    11i64.into(),
                    "02/03/2026".into(),
                    9.5.into(),
                    2.5.into(),
                    10.0.into(),
                    3.0.into(),
                ],
                vec![
                    1005i64.into(),
                    3i64.into(),
                    11i64.into(),
                    "02/03/2026".into(),
                    9.5.into(),
                    2.0.into(),
                    10.0.into(),
                    3.0.into(),
                ],
            ],
        )
        .unwrap()
    }

    #[test]
    fn sales_are_normalized_coerced_and_derived() {
        let obs = RecordingObserver::default();
        let sales = clean_sales(&raw_sales(), &obs).unwrap();

        assert_eq!(
            sales.columns(),
            [
                "order_id",
                "customer_id",
                "product_id",
                "order_date",
                "amount",
                "quantity",
                "discount",
                "profit",
                "total_revenue"
            ]
        );
        assert_eq!(sales.len(), 2);
        assert_eq!(sales.value(0, "total_revenue"), Some(&Value::Float(200.0)));
        assert_eq!(sales.value(0, "amount"), Some(&Value::Float(100.0)));
        assert_eq!(sales.value(0, "quantity"), Some(&Value::Int(2)));
        assert_eq!(
            sales.value(0, "order_date"),
            Some(&Value::Timestamp(
                NaiveDate::from_ymd_opt(2026, 1, 5)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap()
            ))
        );
        assert_eq!(sales.value(1, "order_id"), Some(&Value::from("1005")));
        assert_eq!(sales.value(1, "total_revenue"), Some(&Value::Float(19.0)));

        assert!(obs.events().contains(&PipelineEvent::RowsCleaned {
            role: TableRole::Sales,
            before: 5,
            after: 2
        }));
        // the missing amount and the unparsable date trip the advisory gate
        let advisory = obs.advisory_reports();
        assert_eq!(advisory.len(), 1);
        assert_eq!(advisory[0].schema, "pre_sales");
    }

    #[test]
    fn cleaning_is_idempotent() {
        let obs = RecordingObserver::default();
        let once = clean_sales(&raw_sales(), &obs).unwrap();
        let twice = clean_sales(&once, &obs).unwrap();
        assert_eq!(once, twice);

        let customers = Table::from_rows(
            ["Customer ID", "Name", "Email", "Signup Date"],
            vec![vec![
                1i64.into(),
                "Ann".into(),
                "ann@x.com".into(),
                "2025-01-01".into(),
            ]],
        )
        .unwrap();
        let once = clean_customers(&customers, &obs).unwrap();
        assert_eq!(clean_customers(&once, &obs).unwrap(), once);
    }

    #[test]
    fn input_is_left_untouched() {
        let raw = raw_sales();
        let snapshot = raw.clone();
        clean_sales(&raw, &RecordingObserver::default()).unwrap();
        assert_eq!(raw, snapshot);
    }

    #[test]
    fn negative_amount_fails_post_gate() {
        let raw = Table::from_rows(
            [
                "order_id",
                "customer_id",
                "product_id",
                "order_date",
                "amount",
                "quantity",
                "discount",
                "profit",
            ],
            vec![vec![
                "A1".into(),
                1i64.into(),
                10i64.into(),
                "2026-01-05".into(),
                (-1.0).into(),
                1i64.into(),
                0i64.into(),
                0i64.into(),
            ]],
        )
        .unwrap();
        let err = clean_sales(&raw, &RecordingObserver::default()).unwrap_err();
        match err {
            EtlError::PostValidation(report) => {
                assert_eq!(report.schema, "post_sales");
                assert!(report.failing_columns().contains("amount"));
                assert!(report.failing_columns().contains("total_revenue"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn missing_derivation_input_is_fatal() {
        let raw = Table::from_rows(["order_id", "amount"], vec![vec!["A1".into(), 1i64.into()]])
            .unwrap();
        let err = clean_sales(&raw, &RecordingObserver::default()).unwrap_err();
        assert!(matches!(err, EtlError::MissingColumn { ref column, .. } if column == "quantity"));
    }

    #[test]
    fn customers_with_bad_email_or_duplicate_ids_are_fatal() {
        let customers = Table::from_rows(
            ["customer_id", "name", "email", "signup_date"],
            vec![
                vec![1i64.into(), "Ann".into(), "ann@x.com".into(), "2025-01-01".into()],
                vec![1i64.into(), "Bob".into(), "bob-at-x".into(), "2025-02-01".into()],
            ],
        )
        .unwrap();
        let obs = RecordingObserver::default();
        let err = clean_customers(&customers, &obs).unwrap_err();
        let EtlError::PostValidation(report) = err else {
            panic!("expected post-validation failure");
        };
        assert_eq!(
            report.failing_columns().into_iter().collect::<Vec<_>>(),
            ["customer_id", "email"]
        );
        // the duplicate id is already visible to the advisory gate
        assert_eq!(obs.advisory_reports()[0].schema, "pre_customers");
    }

    #[test]
    fn products_drop_incomplete_rows() {
        let products = Table::from_rows(
            ["Product ID", "Product Name", "Category", "Price"],
            vec![
                vec![10i64.into(), "Widget".into(), "Tools".into(), 50i64.into()],
                vec![11i64.into(), Value::Null, "Tools".into(), 5.0.into()],
            ],
        )
        .unwrap();
        let out = clean_products(&products, &RecordingObserver::default()).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.value(0, "price"), Some(&Value::Float(50.0)));
    }
}
