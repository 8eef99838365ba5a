pub mod aggregate;
pub mod clean;
pub mod merge;
pub mod segment;

pub use aggregate::aggregate;
pub use clean::{clean_customers, clean_products, clean_sales};
pub use merge::merge;
pub use segment::{segment, CustomerSegment};
