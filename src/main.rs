use anyhow::{Context, Result};
use clap::Parser;
use mstload::{
    pipeline,
    sink::{MemorySink, ParquetSink, TableSink},
    Config,
};
use std::{path::PathBuf, process::ExitCode, time::Instant};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

/// Decode vendor master files and write normalized tables.
#[derive(Parser, Debug)]
#[command(name = "mstload", version)]
struct Args {
    /// YAML config; built-in defaults when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the downloaded master files.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Directory receiving `<table>/<label>.parquet` and the run summary.
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Load a single source by label (e.g. KOSPI).
    #[arg(long)]
    only: Option<String>,

    /// Parse and validate without writing any table.
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<ExitCode> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,mstload=info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) resolve config ───────────────────────────────────────────
    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => Config::from_yaml_file(path)?,
        None => Config::default(),
    };
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }
    if let Some(dir) = args.out_dir {
        config.out_dir = dir;
    }
    info!(
        data_dir = %config.data_dir.display(),
        out_dir = %config.out_dir.display(),
        sources = config.sources.len(),
        dry_run = args.dry_run,
        "configured"
    );

    // ─── 3) run every source into the sink ───────────────────────────
    let start = Instant::now();
    let mut parquet;
    let mut memory;
    let sink: &mut dyn TableSink = if args.dry_run {
        memory = MemorySink::default();
        &mut memory
    } else {
        parquet = ParquetSink::new(&config.out_dir, config.batch_size);
        &mut parquet
    };
    let summary = pipeline::run(&config, sink, args.only.as_deref())?;

    // ─── 4) report ───────────────────────────────────────────────────
    if args.dry_run {
        let json = serde_json::to_string_pretty(&summary).context("serializing run summary")?;
        println!("{}", json);
    } else {
        summary.write_json(&config.out_dir.join("run_summary.json"))?;
    }
    info!(elapsed = ?start.elapsed(), "done");

    if summary.success() {
        Ok(ExitCode::SUCCESS)
    } else {
        error!("a primary source failed or produced no rows");
        Ok(ExitCode::FAILURE)
    }
}
