// src/config.rs

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, path::Path, path::PathBuf};

use crate::load::Destination;
use crate::pipeline::SourceKeys;

/// Per-run settings, read from YAML.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    pub warehouse: WarehouseConfig,
}

/// Where raw extracts live: `<root>/<folder>/**/*.csv`.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub root: PathBuf,
    #[serde(default)]
    pub folder: String,
    #[serde(default)]
    pub keys: SourceKeys,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WarehouseConfig {
    pub root: PathBuf,
    pub database: String,
    pub targets: Targets,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Targets {
    pub sales: Target,
    pub customers: Target,
    pub products: Target,
    pub monthly_sales: Target,
    #[serde(default)]
    pub customer_segments: Option<Target>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Target {
    pub schema: String,
    #[serde(alias = "tables")]
    pub table: String,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("invalid pipeline config")
    }

    pub fn destination(&self, target: &Target) -> Destination {
        Destination {
            database: self.warehouse.database.clone(),
            schema: target.schema.clone(),
            table: target.table.clone(),
        }
    }
}
