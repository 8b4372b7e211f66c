use anyhow::{anyhow, Result};
use clap::Parser;
use mstload::{
    layout::{for_category, Layout},
    parse::{EquityParser, MemberParser, SectorParser, ThemeParser, WarrantParser},
    validate::analyze_master_file,
    Category, Config, MasterParser,
};
use std::path::{Path, PathBuf};

/// Print raw-file metadata and the first decoded records of one source.
#[derive(Parser, Debug)]
struct Args {
    /// Source label, e.g. KOSPI or ELW.
    label: String,
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Records to print.
    #[arg(short = 'n', long, default_value_t = 5)]
    records: usize,
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
    let source = config
        .sources
        .iter()
        .find(|s| s.label.eq_ignore_ascii_case(&args.label))
        .ok_or_else(|| anyhow!("no configured source labelled {:?}", args.label))?;
    let path = config.master_path(source);
    let layout = for_category(source.category, config.member_layout);

    // 1) File-level metadata
    let analysis = analyze_master_file(&path, layout.record_size(), &config.extensions())?;
    println!("=== Master File: {} ===", path.display());
    println!("Entry read:           {}", analysis.file_name);
    println!("Category:             {}", source.category.as_str());
    println!("Target table:         {}", source.category.table_name());
    println!("Size:                 {} bytes", analysis.size_bytes);
    match analysis.record_size {
        Some(size) => {
            println!("Record size:          {} bytes", size);
            println!("Remainder:            {} bytes", analysis.remainder);
        }
        None => println!("Record size:          newline-delimited"),
    }
    println!("Raw records:          {}", analysis.record_count);
    println!();

    // 2) Layout
    print_layout(layout);

    // 3) Decoded records
    match source.category {
        Category::Equity => show(&EquityParser::new(source, &config), &path, args.records),
        Category::Warrant => show(&WarrantParser::new(source, &config), &path, args.records),
        Category::Member => show(&MemberParser::new(source, &config), &path, args.records),
        Category::Sector => show(&SectorParser::new(source, &config), &path, args.records),
        Category::Theme => show(&ThemeParser::new(source, &config), &path, args.records),
    }
}

fn print_layout(layout: &Layout) {
    println!("=== Layout: {} ===", layout.name);
    println!("Minimum length:       {}", layout.min_len);
    for field in layout.fields() {
        println!("- {:<20} | {:?} | {:?}", field.name, field.span, field.kind);
    }
    println!();
}

fn show<P: MasterParser>(parser: &P, path: &Path, n: usize) -> Result<()> {
    let raw = parser.parse(path)?;
    let rows = parser.transform(&raw);
    println!("=== Records ===");
    println!("Accepted:             {}", raw.len());
    println!("After dedup:          {}", rows.len());
    for (i, rec) in raw.iter().take(n).enumerate() {
        println!("--- Record {} ---", i + 1);
        for (name, value) in rec.iter() {
            println!("  {:<20} \"{}\"", name, value);
        }
    }
    Ok(())
}
