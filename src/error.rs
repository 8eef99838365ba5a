use thiserror::Error;

use crate::pipeline::TableRole;
use crate::validate::ViolationReport;

/// Failures that abort a pipeline run.
///
/// Advisory (pre-gate) violations never surface here; they are reported to
/// the [`PipelineObserver`](crate::observe::PipelineObserver) instead.
#[derive(Debug, Error)]
pub enum EtlError {
    #[error("no extracted table matches role `{role}` (available keys: {available:?})")]
    MissingSourceTable {
        role: TableRole,
        available: Vec<String>,
    },

    #[error("post-validation failed: {0}")]
    PostValidation(Box<ViolationReport>),

    #[error("table `{table}` has no column `{column}`")]
    MissingColumn { table: String, column: String },

    #[error("row {row} has {found} values, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },
}

pub type Result<T, E = EtlError> = std::result::Result<T, E>;
