// src/bin/verify.rs
//
// Recount every raw master file and compare against the Parquet row counts
// of the last run.

use anyhow::{Context, Result};
use clap::Parser;
use glob::glob;
use mstload::{
    layout::for_category,
    sink::parquet_row_count,
    validate::{analyze_master_file, reconcile, CATEGORY_FLOOR},
    Config,
};
use std::{collections::HashMap, path::PathBuf};

#[derive(Parser, Debug)]
struct Args {
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(long)]
    data_dir: Option<PathBuf>,
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
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

    // 1) Find all Parquet files under <out_dir>/
    let parquet_pattern = format!("{}/**/*.parquet", config.out_dir.display());
    let parquet_paths: HashMap<String, PathBuf> = glob(&parquet_pattern)
        .with_context(|| format!("Failed to read glob pattern '{}'", parquet_pattern))?
        .filter_map(|entry| entry.ok())
        .filter_map(|p| {
            let stem = p.file_stem()?.to_string_lossy().to_string();
            Some((stem, p))
        })
        .collect();
    if parquet_paths.is_empty() {
        return Err(anyhow::anyhow!(
            "No Parquet files found under '{}'",
            parquet_pattern
        ));
    }

    // 2) Per source: raw record count vs stored rows
    println!(
        "\n{: <12} {: <14} {:>10} {:>10} {:>8} {:>8}",
        "Source", "Table", "Raw", "Parquet", "Delta", "Match"
    );
    println!("{:-<67}", "");

    let mut mismatches = 0usize;
    for source in &config.sources {
        let layout = for_category(source.category, config.member_layout);
        let raw = analyze_master_file(
            &config.master_path(source),
            layout.record_size(),
            &config.extensions(),
        )
        .map(|a| a.record_count);
        let stored = parquet_paths
            .get(&source.label)
            .map(|p| parquet_row_count(p))
            .transpose()?;

        match (raw, stored) {
            (Ok(raw), Some(stored)) => {
                let r = reconcile(raw, stored, CATEGORY_FLOOR);
                if !r.matched {
                    mismatches += 1;
                }
                println!(
                    "{: <12} {: <14} {:>10} {:>10} {:>8} {:>8}",
                    source.label,
                    source.category.table_name(),
                    raw,
                    stored,
                    r.difference,
                    if r.matched { "ok" } else { "MISMATCH" }
                );
            }
            (raw, stored) => {
                mismatches += 1;
                println!(
                    "{: <12} {: <14} {:>10} {:>10} {:>8} {:>8}",
                    source.label,
                    source.category.table_name(),
                    raw.map(|n| n.to_string()).unwrap_or_else(|_| "-".into()),
                    stored.map(|n| n.to_string()).unwrap_or_else(|| "-".into()),
                    "",
                    "MISSING"
                );
            }
        }
    }

    if mismatches > 0 {
        return Err(anyhow::anyhow!("{} source(s) did not reconcile", mismatches));
    }
    Ok(())
}
