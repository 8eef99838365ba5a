// src/pipeline.rs
//! Pipeline boundary: resolve source tables by role, then run every stage.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{EtlError, Result};
use crate::observe::PipelineObserver;
use crate::table::Table;
use crate::transform::{aggregate, clean_customers, clean_products, clean_sales, merge, segment};

/// Logical role of a raw source table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TableRole {
    Sales,
    Customers,
    Products,
}

impl TableRole {
    pub fn as_str(self) -> &'static str {
        match self {
            TableRole::Sales => "sales",
            TableRole::Customers => "customers",
            TableRole::Products => "products",
        }
    }
}

impl fmt::Display for TableRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Substrings that identify each role among extracted source keys.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SourceKeys {
    pub sales: String,
    pub customers: String,
    pub products: String,
}

impl Default for SourceKeys {
    fn default() -> Self {
        Self {
            sales: "sales".into(),
            customers: "customer".into(),
            products: "product".into(),
        }
    }
}

impl SourceKeys {
    pub fn pattern(&self, role: TableRole) -> &str {
        match role {
            TableRole::Sales => &self.sales,
            TableRole::Customers => &self.customers,
            TableRole::Products => &self.products,
        }
    }
}

/// The three raw inputs, each bound to its role.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceTables {
    pub sales: Table,
    pub customers: Table,
    pub products: Table,
}

impl SourceTables {
    /// Bind each role to the first extracted key (in sorted order) containing
    /// its pattern, case-insensitively.
    pub fn resolve(extracted: &BTreeMap<String, Table>, keys: &SourceKeys) -> Result<Self> {
        let find = |role: TableRole| -> Result<Table> {
            let pattern = keys.pattern(role).to_lowercase();
            extracted
                .iter()
                .find(|(k, _)| k.to_lowercase().contains(&pattern))
                .map(|(_, t)| t.clone())
                .ok_or_else(|| EtlError::MissingSourceTable {
                    role,
                    available: extracted.keys().cloned().collect(),
                })
        };
        Ok(Self {
            sales: find(TableRole::Sales)?,
            customers: find(TableRole::Customers)?,
            products: find(TableRole::Products)?,
        })
    }
}

/// Every table a run produces.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub sales: Table,
    pub customers: Table,
    pub products: Table,
    pub merged: Table,
    pub monthly: Table,
    pub segments: Table,
}

/// Clean the three sources concurrently, merge them, then aggregate and
/// segment concurrently. The first fatal error aborts the run.
#[tracing::instrument(level = "info", skip_all)]
pub fn run(sources: &SourceTables, observer: &dyn PipelineObserver) -> Result<PipelineOutput> {
    let (sales, (customers, products)) = rayon::join(
        || clean_sales(&sources.sales, observer),
        || {
            rayon::join(
                || clean_customers(&sources.customers, observer),
                || clean_products(&sources.products, observer),
            )
        },
    );
    let (sales, customers, products) = (sales?, customers?, products?);

    let merged = merge(&sales, &customers, &products, observer)?;

    let (monthly, segments) = rayon::join(
        || aggregate(&merged, observer),
        || segment(&sales, &customers, observer),
    );

    Ok(PipelineOutput {
        monthly: monthly?,
        segments: segments?,
        sales,
        customers,
        products,
        merged,
    })
}
