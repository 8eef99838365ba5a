// src/bin/schema_check.rs
// Validate one CSV against a registered schema and print the failure cases.

use anyhow::{anyhow, Result};
use clap::Parser;
use salesflow::{extract::read_csv_file, schema, validate};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "schema_check")]
struct Args {
    /// Registered schema name, e.g. `post_sales`.
    schema: String,

    /// CSV file to check. Column names are normalised first.
    csv: PathBuf,
}

fn main() -> Result<ExitCode> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let args = Args::parse();
    let schema = schema::by_name(&args.schema).ok_or_else(|| {
        let known: Vec<&str> = schema::registry::all()
            .into_iter()
            .map(|s| s.name.as_str())
            .collect();
        anyhow!("unknown schema `{}` (known: {})", args.schema, known.join(", "))
    })?;

    let table = read_csv_file(&args.csv)?.with_normalized_columns();
    match validate::check(&table, schema) {
        Ok(()) => {
            println!("✔ {} rows conform to {}", table.len(), schema.name);
            Ok(ExitCode::SUCCESS)
        }
        Err(report) => {
            println!("{}", report);
            print!("{}", serde_yaml::to_string(&report.failures)?);
            Ok(ExitCode::FAILURE)
        }
    }
}
