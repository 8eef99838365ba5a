//! Batch transform-and-validate engine for sales, customer and product
//! extracts.
//!
//! Raw tables are cleaned behind pre/post schema gates, joined into a fact
//! table, and reduced to a monthly sales aggregate and a customer spend
//! segmentation. See [`pipeline::run`].

pub mod config;
pub mod error;
pub mod extract;
pub mod load;
pub mod observe;
pub mod pipeline;
pub mod schema;
pub mod table;
pub mod transform;
pub mod validate;

pub use error::{EtlError, Result};
pub use observe::{PipelineEvent, PipelineObserver, RecordingObserver, TracingObserver};
pub use pipeline::{run, PipelineOutput, SourceKeys, SourceTables, TableRole};
pub use table::{Table, Value};
pub use validate::{ValidationMode, ViolationReport};
