// src/config.rs

use anyhow::{Context, Result};
use chrono::NaiveDate;
use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    path::{Path, PathBuf},
};
use tracing::warn;

use crate::layout::MemberLayout;
use crate::model::Category;

/// One master file to load, as handed over by the acquisition side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Unique label, also used as the output file stem ("KOSPI", "ELW", ...).
    pub label: String,
    pub category: Category,
    /// Master file (raw or `.zip`), relative to `data_dir` unless absolute.
    pub master_file: PathBuf,
    /// Vendor header file. Accepted and logged, never parsed.
    #[serde(default)]
    pub header_file: Option<PathBuf>,
    /// Market segment tag written to instrument rows.
    #[serde(default)]
    pub market: String,
    /// A primary source producing zero rows fails the whole run.
    #[serde(default)]
    pub primary: bool,
}

impl SourceConfig {
    pub fn new(label: &str, category: Category, master_file: &str, market: &str) -> Self {
        Self {
            label: label.to_string(),
            category,
            master_file: PathBuf::from(master_file),
            header_file: None,
            market: market.to_string(),
            primary: false,
        }
    }

    pub fn with_header(mut self, header_file: &str) -> Self {
        self.header_file = Some(PathBuf::from(header_file));
        self
    }

    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }
}

/// Run configuration, passed explicitly to every component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    pub out_dir: PathBuf,
    /// WHATWG label of the vendor code page.
    pub encoding: String,
    /// Rows per Parquet row group handed to the store.
    pub batch_size: usize,
    pub progress_every: usize,
    /// Market-warning code treated as "under warning". Unverified against
    /// vendor documentation, hence configurable.
    pub market_warning_code: String,
    /// Listing date used when an equity record carries none.
    pub listing_date_fallback: NaiveDate,
    pub member_layout: MemberLayout,
    /// Master-file extensions looked for inside archives.
    pub master_extensions: Vec<String>,
    pub sources: Vec<SourceConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("kis_download"),
            out_dir: PathBuf::from("parquet"),
            encoding: "cp949".into(),
            batch_size: 1000,
            progress_every: 500,
            market_warning_code: "01".into(),
            listing_date_fallback: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap_or_default(),
            member_layout: MemberLayout::Detailed,
            master_extensions: vec!["mst".into(), "cod".into()],
            sources: default_sources(),
        }
    }
}

fn default_sources() -> Vec<SourceConfig> {
    vec![
        SourceConfig::new("KOSPI", Category::Equity, "kospi_code.mst.zip", "KOSPI")
            .with_header("kospi_code.h")
            .primary(),
        SourceConfig::new("KOSDAQ", Category::Equity, "kosdaq_code.mst.zip", "KOSDAQ")
            .with_header("kosdaq_code.h"),
        SourceConfig::new("KONEX", Category::Equity, "konex_code.mst.zip", "KONEX")
            .with_header("konex_code.h"),
        SourceConfig::new("ELW", Category::Warrant, "elw_code.mst.zip", "ELW")
            .with_header("elw_code.h"),
        SourceConfig::new("MEMBER", Category::Member, "memcode.mst.zip", "회원사코드"),
        SourceConfig::new("SECTOR", Category::Sector, "idxcode.mst.zip", "업종코드")
            .with_header("idxcode.h"),
        SourceConfig::new("THEME", Category::Theme, "theme_code.mst.zip", "테마코드")
            .with_header("theme_code.h"),
    ]
}

impl Config {
    /// Load a YAML config; missing keys keep their defaults.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("opening config {:?}", path))?;
        let config: Config = serde_yaml::from_reader(file)
            .with_context(|| format!("parsing config {:?}", path))?;
        Ok(config)
    }

    /// Resolve the configured label, falling back to CP949's WHATWG alias.
    pub fn encoding(&self) -> &'static Encoding {
        Encoding::for_label(self.encoding.as_bytes()).unwrap_or_else(|| {
            warn!(label = %self.encoding, "unknown encoding label, using EUC-KR (CP949)");
            encoding_rs::EUC_KR
        })
    }

    pub fn master_path(&self, source: &SourceConfig) -> PathBuf {
        self.under_data_dir(&source.master_file)
    }

    pub fn header_path(&self, source: &SourceConfig) -> Option<PathBuf> {
        source.header_file.as_deref().map(|p| self.under_data_dir(p))
    }

    fn under_data_dir(&self, p: &Path) -> PathBuf {
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.data_dir.join(p)
        }
    }

    pub fn extensions(&self) -> Vec<&str> {
        self.master_extensions.iter().map(String::as_str).collect()
    }
}
