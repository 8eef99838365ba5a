use anyhow::{Context, Result};
use clap::Parser;
use salesflow::{
    config::Config,
    extract,
    load::{ParquetLoader, WarehouseLoader},
    pipeline::{self, SourceTables},
    TracingObserver,
};
use std::{path::PathBuf, time::Instant};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Extract raw CSVs, clean/merge/aggregate/segment them, load the results.
#[derive(Debug, Parser)]
#[command(name = "salesflow", version)]
struct Args {
    /// Path to the YAML run configuration.
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Run every stage but skip the load step.
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();

    let args = Args::parse();
    let config = Config::load(&args.config)?;
    info!(config = %args.config.display(), "startup");

    // ─── 2) extract ──────────────────────────────────────────────────
    let extracted = extract::extract_folder(&config.source.root, &config.source.folder)?;
    info!("extracted {} tables", extracted.len());
    let sources = SourceTables::resolve(&extracted, &config.source.keys)?;

    // ─── 3) transform ────────────────────────────────────────────────
    let start = Instant::now();
    let output = pipeline::run(&sources, &TracingObserver)?;
    info!(
        elapsed = ?start.elapsed(),
        merged = output.merged.len(),
        months = output.monthly.len(),
        segments = output.segments.len(),
        "transform done"
    );

    if args.dry_run {
        info!("dry run; skipping load");
        return Ok(());
    }

    // ─── 4) load ─────────────────────────────────────────────────────
    let loader = ParquetLoader::new(&config.warehouse.root);
    let targets = &config.warehouse.targets;
    let mut jobs = vec![
        (&output.sales, &targets.sales),
        (&output.customers, &targets.customers),
        (&output.products, &targets.products),
        (&output.monthly, &targets.monthly_sales),
    ];
    if let Some(t) = &targets.customer_segments {
        jobs.push((&output.segments, t));
    }
    for (table, target) in jobs {
        let dest = config.destination(target);
        loader
            .load(table, &dest)
            .with_context(|| format!("loading {}", dest))?;
    }

    info!("all done");
    Ok(())
}
