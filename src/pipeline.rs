// src/pipeline.rs
//
// Runs every configured source through parse → transform → sink, one at a
// time, and collects what happened into a `RunSummary`.

use anyhow::{bail, Context, Result};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{fs::File, io::BufWriter, path::Path, sync::Arc};
use tracing::{error, info, instrument, warn};

use crate::config::{Config, SourceConfig};
use crate::layout::for_category;
use crate::model::{Category, Instrument};
use crate::parse::{EquityParser, MasterParser, MemberParser, SectorParser, ThemeParser, WarrantParser};
use crate::sink::TableSink;
use crate::table::TableRow;
use crate::validate::{
    self, FileAnalysis, FormatCheck, Reconciliation, SpotCheck, CATEGORY_FLOOR,
    INSTRUMENT_TOTAL_FLOOR,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    Loaded,
    /// Parsed fine but produced no rows.
    Empty,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub label: String,
    pub category: Category,
    pub table: &'static str,
    pub primary: bool,
    pub status: SourceStatus,
    /// Records that passed slicing and the validity gate.
    pub parsed: usize,
    pub written: usize,
    pub analysis: Option<FileAnalysis>,
    pub reconciliation: Option<Reconciliation>,
    pub error: Option<String>,
}

impl SourceReport {
    fn new(source: &SourceConfig) -> Self {
        Self {
            label: source.label.clone(),
            category: source.category,
            table: source.category.table_name(),
            primary: source.primary,
            status: SourceStatus::Failed,
            parsed: 0,
            written: 0,
            analysis: None,
            reconciliation: None,
            error: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub sources: Vec<SourceReport>,
    /// All instrument sources together, with the wider floor.
    pub instruments_total: Option<Reconciliation>,
    pub spot_checks: Vec<SpotCheck>,
    pub format_checks: Vec<FormatCheck>,
}

impl RunSummary {
    /// A run fails when any primary source failed or came back empty.
    pub fn success(&self) -> bool {
        !self
            .sources
            .iter()
            .any(|s| s.primary && s.status != SourceStatus::Loaded)
    }

    pub fn count(&self, status: SourceStatus) -> usize {
        self.sources.iter().filter(|s| s.status == status).count()
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("could not create `{}`", dir.display()))?;
        }
        let file = File::create(path).with_context(|| format!("creating {:?}", path))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)
            .with_context(|| format!("writing run summary to {:?}", path))?;
        info!(path = %path.display(), "run summary written");
        Ok(())
    }
}

/// Load every configured source (or only the one labelled `only`) into `sink`.
///
/// Source failures are recorded and the run moves on; the returned error is
/// reserved for a bad invocation.
pub fn run(config: &Config, sink: &mut dyn TableSink, only: Option<&str>) -> Result<RunSummary> {
    let started_at = Utc::now();
    let sources: Vec<&SourceConfig> = config
        .sources
        .iter()
        .filter(|s| only.map_or(true, |label| s.label.eq_ignore_ascii_case(label)))
        .collect();
    if sources.is_empty() {
        bail!("no configured source matches {:?}", only.unwrap_or_default());
    }
    info!(sources = sources.len(), data_dir = %config.data_dir.display(), "run started");

    let mut reports = Vec::with_capacity(sources.len());
    let mut equities: Vec<Instrument> = Vec::new();

    for source in sources {
        let mut report = SourceReport::new(source);
        match load_source(config, source, sink, &mut report) {
            Ok(Loaded::Instruments(rows)) if source.category == Category::Equity => {
                equities.extend(rows)
            }
            Ok(_) => {}
            Err(e) => {
                error!(label = %source.label, error = %format!("{:#}", e), "source failed");
                report.error = Some(format!("{:#}", e));
            }
        }
        reports.push(report);
    }

    let instruments_total = reconcile_instruments(&reports);
    let spot_checks = validate::spot_check(&equities, &validate::KNOWN_STOCKS);
    let format_checks = if equities.is_empty() {
        Vec::new()
    } else {
        validate::check_code_formats(&equities)
    };

    let summary = RunSummary {
        started_at,
        finished_at: Utc::now(),
        sources: reports,
        instruments_total,
        spot_checks,
        format_checks,
    };
    info!(
        loaded = summary.count(SourceStatus::Loaded),
        empty = summary.count(SourceStatus::Empty),
        failed = summary.count(SourceStatus::Failed),
        success = summary.success(),
        "run finished"
    );
    Ok(summary)
}

/// Rows handed back for run-level checks. Only instruments are checked.
enum Loaded {
    Instruments(Vec<Instrument>),
    Other,
}

#[instrument(level = "info", skip_all, fields(label = %source.label, category = source.category.as_str()))]
fn load_source(
    config: &Config,
    source: &SourceConfig,
    sink: &mut dyn TableSink,
    report: &mut SourceReport,
) -> Result<Loaded> {
    if let Some(header) = config.header_path(source) {
        if header.exists() {
            info!(header = %header.display(), "header file present (not parsed)");
        } else {
            warn!(header = %header.display(), "declared header file not found");
        }
    }

    let path = config.master_path(source);
    let layout = for_category(source.category, config.member_layout);
    match validate::analyze_master_file(&path, layout.record_size(), &config.extensions()) {
        Ok(analysis) => report.analysis = Some(analysis),
        Err(e) => warn!(error = %e, "raw file analysis unavailable"),
    }

    let loaded = match source.category {
        Category::Equity => {
            Loaded::Instruments(load(&EquityParser::new(source, config), &path, sink, report)?)
        }
        Category::Warrant => {
            Loaded::Instruments(load(&WarrantParser::new(source, config), &path, sink, report)?)
        }
        Category::Member => {
            load(&MemberParser::new(source, config), &path, sink, report)?;
            Loaded::Other
        }
        Category::Sector => {
            load(&SectorParser::new(source, config), &path, sink, report)?;
            Loaded::Other
        }
        Category::Theme => {
            load(&ThemeParser::new(source, config), &path, sink, report)?;
            Loaded::Other
        }
    };

    report.status = if report.written == 0 {
        warn!(primary = source.primary, "source produced no rows");
        SourceStatus::Empty
    } else {
        SourceStatus::Loaded
    };
    report.reconciliation = report
        .analysis
        .as_ref()
        .map(|a| validate::reconcile(a.record_count, report.written, CATEGORY_FLOOR));
    if let Some(r) = report.reconciliation.as_ref().filter(|r| !r.matched) {
        warn!(
            expected = r.expected,
            stored = r.stored,
            tolerance = r.tolerance,
            "stored rows outside tolerance of raw record count"
        );
    }
    Ok(loaded)
}

/// Parse, transform and write one source. A batch that cannot be built is
/// replaced by an empty table so the store still reflects the run.
fn load<P: MasterParser>(
    parser: &P,
    path: &Path,
    sink: &mut dyn TableSink,
    report: &mut SourceReport,
) -> Result<Vec<P::Record>> {
    let raw = parser
        .parse(path)
        .with_context(|| format!("parsing {} master", parser.label()))?;
    report.parsed = raw.len();

    let rows = parser.transform(&raw);
    let (batch, rows) = match P::Record::to_batch(&rows) {
        Ok(batch) => (batch, rows),
        Err(e) => {
            error!(error = %e, "transform failed, writing an empty table");
            (RecordBatch::new_empty(Arc::new(P::Record::schema())), Vec::new())
        }
    };

    report.written = sink
        .write(P::Record::TABLE, parser.label(), &batch)
        .with_context(|| format!("writing {} rows for {}", P::Record::TABLE, parser.label()))?;
    Ok(rows)
}

fn reconcile_instruments(reports: &[SourceReport]) -> Option<Reconciliation> {
    let instrument_sources: Vec<&SourceReport> = reports
        .iter()
        .filter(|r| matches!(r.category, Category::Equity | Category::Warrant))
        .filter(|r| r.status != SourceStatus::Failed)
        .collect();
    if instrument_sources.is_empty() {
        return None;
    }
    let expected = instrument_sources
        .iter()
        .filter_map(|r| r.analysis.as_ref())
        .map(|a| a.record_count)
        .sum();
    let stored = instrument_sources.iter().map(|r| r.written).sum();
    Some(validate::reconcile(expected, stored, INSTRUMENT_TOTAL_FLOOR))
}
