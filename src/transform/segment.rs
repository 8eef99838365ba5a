// src/transform/segment.rs

use std::collections::HashMap;
use std::fmt;

use crate::error::Result;
use crate::observe::{PipelineEvent, PipelineObserver, Stage};
use crate::schema::registry::POST_SEGMENTS;
use crate::table::{Table, Value, ValueKey};
use crate::validate::{gate, ValidationMode};

/// Lifetime-spend tier. Bounds are half-open: `[lower, next lower)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CustomerSegment {
    Low,
    Medium,
    High,
    Vip,
}

impl CustomerSegment {
    pub const ALL: [CustomerSegment; 4] = [
        CustomerSegment::Low,
        CustomerSegment::Medium,
        CustomerSegment::High,
        CustomerSegment::Vip,
    ];

    /// Inclusive lower bound of the tier.
    pub fn lower_bound(self) -> f64 {
        match self {
            CustomerSegment::Low => 0.0,
            CustomerSegment::Medium => 1_000.0,
            CustomerSegment::High => 5_000.0,
            CustomerSegment::Vip => 10_000.0,
        }
    }

    /// `None` for negative or non-finite totals.
    pub fn classify(total_spent: f64) -> Option<Self> {
        if !total_spent.is_finite() || total_spent < 0.0 {
            return None;
        }
        Self::ALL
            .into_iter()
            .rev()
            .find(|tier| total_spent >= tier.lower_bound())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CustomerSegment::Low => "Low",
            CustomerSegment::Medium => "Medium",
            CustomerSegment::High => "High",
            CustomerSegment::Vip => "VIP",
        }
    }
}

impl fmt::Display for CustomerSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const SEGMENT_COLUMNS: [&str; 4] = [
    "customer_id",
    "total_spent",
    "customer_segment",
    "segmentation_date",
];

/// Per-customer lifetime spend bucketed into [`CustomerSegment`]s.
///
/// Customers without any sales are dropped. `segmentation_date` carries the
/// customer's `signup_date`.
pub fn segment(
    sales: &Table,
    customers: &Table,
    observer: &dyn PipelineObserver,
) -> Result<Table> {
    observer.observe(PipelineEvent::StageStarted {
        stage: Stage::Segment,
        input_rows: customers.len(),
    });

    let s_customer = sales.require_column("sales", "customer_id")?;
    let s_revenue = sales.require_column("sales", "total_revenue")?;
    let mut totals: HashMap<ValueKey, f64> = HashMap::new();
    for row in sales.rows() {
        if let (Some(k), Some(r)) = (row[s_customer].key(), row[s_revenue].as_f64()) {
            *totals.entry(k).or_insert(0.0) += r;
        }
    }

    let c_customer = customers.require_column("customers", "customer_id")?;
    let c_signup = customers.require_column("customers", "signup_date")?;
    let mut out = Table::new(SEGMENT_COLUMNS);
    let mut without_sales = 0;
    for row in customers.rows() {
        let total = row[c_customer].key().and_then(|k| totals.get(&k)).copied();
        let Some(total) = total else {
            without_sales += 1;
            continue;
        };
        let tier = CustomerSegment::classify(total).map(|t| Value::from(t.as_str()));
        out.push_row(vec![
            row[c_customer].clone(),
            Value::Float(total),
            tier.unwrap_or_default(),
            row[c_signup].clone(),
        ])?;
    }

    observer.observe(PipelineEvent::CustomersSegmented {
        segmented: out.len(),
        without_sales,
    });
    let out = gate(out, &POST_SEGMENTS, ValidationMode::Post, observer)?;
    observer.observe(PipelineEvent::StageFinished {
        stage: Stage::Segment,
        output_rows: out.len(),
    });
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EtlError;
    use crate::observe::RecordingObserver;
    use chrono::NaiveDate;

    fn day(y: i32, m: u32, d: u32) -> Value {
        Value::Timestamp(NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap())
    }

    #[test]
    fn tier_boundaries_are_half_open() {
        use CustomerSegment::*;
        assert_eq!(CustomerSegment::classify(0.0), Some(Low));
        assert_eq!(CustomerSegment::classify(999.99), Some(Low));
        assert_eq!(CustomerSegment::classify(1_000.0), Some(Medium));
        assert_eq!(CustomerSegment::classify(4_999.999), Some(Medium));
        assert_eq!(CustomerSegment::classify(5_000.0), Some(High));
        assert_eq!(CustomerSegment::classify(9_999.0), Some(High));
        assert_eq!(CustomerSegment::classify(10_000.0), Some(Vip));
        assert_eq!(CustomerSegment::classify(1e12), Some(Vip));
        assert_eq!(CustomerSegment::classify(-0.01), None);
        assert_eq!(CustomerSegment::classify(f64::NAN), None);
        assert_eq!(Vip.to_string(), "VIP");
    }

    #[test]
    fn segments_customers_with_sales_only() {
        let sales = Table::from_rows(
            ["customer_id", "total_revenue"],
            vec![
                vec![1i64.into(), 600.0.into()],
                vec![2i64.into(), 10_000.0.into()],
                vec![1i64.into(), 400.0.into()],
                vec![42i64.into(), 5.0.into()],
            ],
        )
        .unwrap();
        let customers = Table::from_rows(
            ["customer_id", "name", "signup_date"],
            vec![
                vec![1i64.into(), "Ann".into(), day(2025, 1, 1)],
                vec![2i64.into(), "Bob".into(), day(2024, 6, 30)],
                vec![3i64.into(), "Cid".into(), day(2023, 3, 3)],
            ],
        )
        .unwrap();

        let obs = RecordingObserver::default();
        let out = segment(&sales, &customers, &obs).unwrap();

        assert_eq!(out.columns(), SEGMENT_COLUMNS);
        assert_eq!(
            out.rows(),
            [
                vec![1i64.into(), 1_000.0.into(), "Medium".into(), day(2025, 1, 1)],
                vec![2i64.into(), 10_000.0.into(), "VIP".into(), day(2024, 6, 30)],
            ]
        );
        assert!(obs.events().contains(&PipelineEvent::CustomersSegmented {
            segmented: 2,
            without_sales: 1
        }));
    }

    #[test]
    fn negative_spend_fails_post_gate() {
        let sales = Table::from_rows(
            ["customer_id", "total_revenue"],
            vec![vec![1i64.into(), (-5.0).into()]],
        )
        .unwrap();
        let customers = Table::from_rows(
            ["customer_id", "signup_date"],
            vec![vec![1i64.into(), day(2025, 1, 1)]],
        )
        .unwrap();
        let err = segment(&sales, &customers, &RecordingObserver::default()).unwrap_err();
        let EtlError::PostValidation(report) = err else {
            panic!("expected post-validation failure");
        };
        assert_eq!(
            report.failing_columns().into_iter().collect::<Vec<_>>(),
            ["customer_segment", "total_spent"]
        );
    }
}
