// src/extract/mod.rs
//! Local stand-in for the object-store extraction step: every CSV under a
//! folder becomes a raw [`Table`] keyed by its path relative to the root.

use anyhow::{anyhow, Context, Result};
use csv::ReaderBuilder;
use glob::glob;
use std::{collections::BTreeMap, fs::File, io::Read, path::Path};
use tracing::{debug, info};

use crate::table::{utils::parse_cell, Table};

/// Parse CSV (with a header row) into a raw table; every cell goes through
/// [`parse_cell`].
pub fn read_csv<R: Read>(reader: R) -> Result<Table> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);
    let headers: Vec<String> = rdr
        .headers()
        .context("reading CSV header")?
        .iter()
        .map(str::to_string)
        .collect();

    let mut table = Table::new(headers);
    for (idx, record) in rdr.records().enumerate() {
        let record = record.with_context(|| format!("CSV parse error at record {}", idx))?;
        table.push_row(record.iter().map(parse_cell).collect())?;
    }
    Ok(table)
}

pub fn read_csv_file(path: &Path) -> Result<Table> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    read_csv(file).with_context(|| format!("reading {}", path.display()))
}

/// Read every `.csv` under `<root>/<folder>`. Other files and CSVs without
/// data rows are skipped; finding no files at all is an error.
#[tracing::instrument(level = "info", skip(root), fields(root = %root.display()))]
pub fn extract_folder(root: &Path, folder: &str) -> Result<BTreeMap<String, Table>> {
    let base = root.join(folder);
    let pattern = format!("{}/**/*", base.display());

    let mut seen_any = false;
    let mut tables = BTreeMap::new();
    for entry in glob(&pattern).with_context(|| format!("invalid glob pattern {}", pattern))? {
        let path = entry?;
        if !path.is_file() {
            continue;
        }
        seen_any = true;

        let key = path
            .strip_prefix(root)
            .unwrap_or(&path)
            .to_string_lossy()
            .replace('\\', "/");
        if !key.to_lowercase().ends_with(".csv") {
            info!(%key, "skipping file, not csv");
            continue;
        }

        info!(%key, "extracting");
        let table = read_csv_file(&path)?;
        if table.is_empty() {
            info!(%key, "skipping file, empty");
            continue;
        }
        debug!(%key, rows = table.len(), columns = table.columns().len(), "extracted");
        tables.insert(key, table);
    }

    if !seen_any {
        return Err(anyhow!(
            "no files found under {} with prefix {}",
            root.display(),
            folder
        ));
    }
    Ok(tables)
}
