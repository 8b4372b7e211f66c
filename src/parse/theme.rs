// src/parse/theme.rs

use tracing::info;

use super::{require_code_and_name, MasterParser, ParseOptions, RawRecord};
use crate::config::{Config, SourceConfig};
use crate::error::RecordError;
use crate::layout::{Layout, THEME};
use crate::model::ThemeCode;
use crate::normalize;

/// Theme membership lines: one (theme, stock) pair per line.
pub struct ThemeParser {
    label: String,
    options: ParseOptions,
}

impl ThemeParser {
    pub fn new(source: &SourceConfig, config: &Config) -> Self {
        Self {
            label: source.label.clone(),
            options: ParseOptions::from_config(config),
        }
    }
}

impl MasterParser for ThemeParser {
    type Record = ThemeCode;

    fn label(&self) -> &str {
        &self.label
    }

    fn layout(&self) -> &'static Layout {
        &*THEME
    }

    fn options(&self) -> &ParseOptions {
        &self.options
    }

    fn accept(&self, raw: RawRecord) -> Result<RawRecord, RecordError> {
        require_code_and_name(&raw, "theme_code", "theme_name")?;
        Ok(raw)
    }

    fn transform(&self, raw: &[RawRecord]) -> Vec<ThemeCode> {
        let rows = normalize::dedup_first(
            raw.iter()
                .map(|r| ThemeCode {
                    theme_code: r.text("theme_code").to_string(),
                    theme_name: r.text("theme_name").to_string(),
                    stock_code: r.non_blank("stock_code"),
                    active: true,
                })
                .collect(),
        );
        info!(label = %self.label, rows = rows.len(), "theme codes transformed");
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::tests::write_zip;
    use crate::model::Category;
    use crate::parse::tests::{cp949, init_test_logging};
    use std::fs;
    use tempfile::tempdir;

    fn line(theme: &str, name: &str, stock: &str) -> String {
        format!("{theme:<3}{name:<20}{stock:<9}\n")
    }

    fn parser() -> ThemeParser {
        let source = SourceConfig::new("THEME", Category::Theme, "theme_code.mst", "테마코드");
        ThemeParser::new(&source, &Config::default())
    }

    #[test]
    fn parses_theme_pairs() {
        init_test_logging();
        let dir = tempdir().unwrap();
        let path = dir.path().join("theme_code.mst");
        let text = [
            line("001", "반도체", "005930"),
            line("001", "반도체", "000660"),
            line("001", "반도체", "005930"),
            line("002", "2차전지", "373220"),
        ]
        .concat();
        fs::write(&path, cp949(&text)).unwrap();

        let p = parser();
        let raw = p.parse(&path).unwrap();
        assert_eq!(raw.len(), 4);
        let rows = p.transform(&raw);
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[0],
            ThemeCode {
                theme_code: "001".into(),
                theme_name: "반도체".into(),
                stock_code: Some("005930".into()),
                active: true,
            }
        );
        assert_eq!(rows[1].stock_code.as_deref(), Some("000660"));
        assert_eq!(rows[2].theme_code, "002");
    }

    #[test]
    fn missing_stock_is_null_and_blank_theme_is_dropped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("theme_code.mst");
        // last line has no terminator, so its 10-character stock field is
        // the 9-character code plus the last character of the name padding
        let text = format!(
            "{}{}{:<3}{:<20}{:<9}",
            line("003", "로봇", ""),
            line("", "이름만", "005930"),
            "004",
            "AI",
            "035420"
        );
        fs::write(&path, cp949(&text)).unwrap();

        let p = parser();
        let rows = p.transform(&p.parse(&path).unwrap());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].stock_code, None);
        assert_eq!(rows[1].theme_name, "AI");
        assert_eq!(rows[1].stock_code.as_deref(), Some("035420"));
    }

    #[test]
    fn splits_first_three_middle_and_last_ten() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("theme_code.mst");
        fs::write(&path, cp949("001SomeTheme Name          0005930")).unwrap();

        let p = parser();
        let rows = p.transform(&p.parse(&path).unwrap());
        assert_eq!(
            rows,
            vec![ThemeCode {
                theme_code: "001".into(),
                theme_name: "SomeTheme Name".into(),
                stock_code: Some("0005930".into()),
                active: true,
            }]
        );
    }

    #[test]
    fn unterminated_last_line_keeps_a_full_width_stock_code() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("theme_code.mst");
        let text = format!("{}001SomeTheme NameA000005930", line("002", "로봇", "005930"));
        fs::write(&path, cp949(&text)).unwrap();

        let p = parser();
        let rows = p.transform(&p.parse(&path).unwrap());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].stock_code.as_deref(), Some("005930"));
        assert_eq!(rows[1].theme_name, "SomeTheme Name");
        assert_eq!(rows[1].stock_code.as_deref(), Some("A000005930"));
    }

    #[test]
    fn reads_theme_file_from_archive() {
        let dir = tempdir().unwrap();
        let zip_path = dir.path().join("theme_code.mst.zip");
        let bytes = cp949(&line("001", "반도체", "005930"));
        write_zip(&zip_path, &[("theme_code.mst", bytes.as_slice())]);

        let p = parser();
        let rows = p.transform(&p.parse(&zip_path).unwrap());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].theme_name, "반도체");
    }
}
