// src/observe.rs
//! Injected event sink for the engine.
//!
//! Stages never log directly; they describe what happened as a
//! [`PipelineEvent`] and hand it to whatever [`PipelineObserver`] the caller
//! passed in. Nothing here feeds back into control flow.

use std::fmt;
use std::sync::Mutex;
use tracing::{info, warn};

use crate::pipeline::TableRole;
use crate::validate::ViolationReport;

/// The transformation a [`PipelineEvent`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Clean(TableRole),
    Merge,
    Aggregate,
    Segment,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Clean(role) => write!(f, "clean_{role}"),
            Stage::Merge => f.write_str("merge"),
            Stage::Aggregate => f.write_str("aggregate"),
            Stage::Segment => f.write_str("segment"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    StageStarted {
        stage: Stage,
        input_rows: usize,
    },
    /// A pre-gate failed; the unvalidated table was used.
    AdvisoryViolation {
        report: ViolationReport,
    },
    /// Rows removed by null elimination (including values that failed
    /// coercion) during cleaning.
    RowsCleaned {
        role: TableRole,
        before: usize,
        after: usize,
    },
    /// Rows of the left side with no partner on `right` in an inner join.
    JoinDropped {
        right: TableRole,
        dropped: usize,
    },
    /// Merged rows whose `profit_margin` is undefined (zero revenue).
    UndefinedProfitMargin {
        rows: usize,
    },
    MonthlyAggregated {
        buckets: usize,
        undated_rows: usize,
    },
    CustomersSegmented {
        segmented: usize,
        without_sales: usize,
    },
    StageFinished {
        stage: Stage,
        output_rows: usize,
    },
}

pub trait PipelineObserver: Send + Sync {
    fn observe(&self, event: PipelineEvent);
}

/// Failure cases included in an advisory warning.
const LOGGED_FAILURE_CASES: usize = 10;

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn observe(&self, event: PipelineEvent) {
        match event {
            PipelineEvent::StageStarted { stage, input_rows } => {
                info!(%stage, input_rows, "stage started")
            }
            PipelineEvent::AdvisoryViolation { report } => warn!(
                schema = %report.schema,
                failures = report.failures.len(),
                rows = ?report.failing_rows(),
                columns = ?report.failing_columns(),
                failure_cases = ?report.sample(LOGGED_FAILURE_CASES),
                "pre-validation failed, continuing with unvalidated table"
            ),
            PipelineEvent::RowsCleaned {
                role,
                before,
                after,
            } => info!(%role, before, after, "cleaned {} from {} to {} rows", role, before, after),
            PipelineEvent::JoinDropped { right, dropped } => {
                if dropped > 0 {
                    warn!(%right, dropped, "rows without a join partner dropped");
                }
            }
            PipelineEvent::UndefinedProfitMargin { rows } => {
                if rows > 0 {
                    warn!(rows, "profit_margin undefined for zero-revenue rows");
                }
            }
            PipelineEvent::MonthlyAggregated {
                buckets,
                undated_rows,
            } => info!(buckets, undated_rows, "computed monthly aggregates"),
            PipelineEvent::CustomersSegmented {
                segmented,
                without_sales,
            } => info!(segmented, without_sales, "segmented customers"),
            PipelineEvent::StageFinished { stage, output_rows } => {
                info!(%stage, output_rows, "stage finished")
            }
        }
    }
}

/// Keeps every event in memory, in arrival order.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<PipelineEvent>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Reports of every advisory (pre-gate) violation seen so far.
    pub fn advisory_reports(&self) -> Vec<ViolationReport> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PipelineEvent::AdvisoryViolation { report } => Some(report),
                _ => None,
            })
            .collect()
    }
}

impl PipelineObserver for RecordingObserver {
    fn observe(&self, event: PipelineEvent) {
        let mut events = self
            .events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        events.push(event);
    }
}
