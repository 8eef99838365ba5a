pub mod registry;
pub mod types;

pub use registry::{by_name, EMAIL_REGEX};
pub use types::{Check, ColumnSchema, ColumnType, TableSchema};
