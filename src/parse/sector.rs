// src/parse/sector.rs

use tracing::info;

use super::{require_code_and_name, MasterParser, ParseOptions, RawRecord};
use crate::config::{Config, SourceConfig};
use crate::error::RecordError;
use crate::layout::{Layout, SECTOR};
use crate::model::SectorCode;
use crate::normalize;

/// Sector code lines. The vendor hierarchy is not modeled, so every code is a
/// top-level entry.
pub struct SectorParser {
    label: String,
    options: ParseOptions,
}

impl SectorParser {
    pub fn new(source: &SourceConfig, config: &Config) -> Self {
        Self {
            label: source.label.clone(),
            options: ParseOptions::from_config(config),
        }
    }
}

impl MasterParser for SectorParser {
    type Record = SectorCode;

    fn label(&self) -> &str {
        &self.label
    }

    fn layout(&self) -> &'static Layout {
        &*SECTOR
    }

    fn options(&self) -> &ParseOptions {
        &self.options
    }

    fn accept(&self, raw: RawRecord) -> Result<RawRecord, RecordError> {
        require_code_and_name(&raw, "code", "name")?;
        Ok(raw)
    }

    fn transform(&self, raw: &[RawRecord]) -> Vec<SectorCode> {
        let rows = normalize::dedup_first(
            raw.iter()
                .map(|r| SectorCode {
                    code: r.text("code").to_string(),
                    name: r.text("name").to_string(),
                    level: 1,
                    parent_code: None,
                    active: true,
                })
                .collect(),
        );
        info!(label = %self.label, rows = rows.len(), "sector codes transformed");
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Category;
    use crate::parse::tests::cp949;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn parses_sector_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("idxcode.mst");
        let text = "U0001   종합주가지수\nU0002   대형주\n\nU0001   중복\nU    \n";
        fs::write(&path, cp949(text)).unwrap();

        let source = SourceConfig::new("SECTOR", Category::Sector, "idxcode.mst", "업종코드");
        let p = SectorParser::new(&source, &Config::default());
        let raw = p.parse(&path).unwrap();
        // blank line and the code-only line fail the gate
        assert_eq!(raw.len(), 3);

        let rows = p.transform(&raw);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].code, "0001");
        // the name span starts inside the code
        assert_eq!(rows[0].name, "01   종합주가지수");
        assert_eq!(rows[1].code, "0002");
        assert!(rows.iter().all(|r| r.level == 1 && r.parent_code.is_none() && r.active));
    }

    #[test]
    fn empty_input_gives_empty_table() {
        let source = SourceConfig::new("SECTOR", Category::Sector, "idxcode.mst", "업종코드");
        let p = SectorParser::new(&source, &Config::default());
        assert!(p.transform(&[]).is_empty());
    }
}
