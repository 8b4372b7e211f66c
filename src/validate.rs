// src/validate.rs
//
// Count reconciliation and sanity checks over loaded masters.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

use crate::archive;
use crate::error::ParseError;
use crate::model::{Instrument, InstrumentType};

/// Minimum tolerance when reconciling one category.
pub const CATEGORY_FLOOR: usize = 5;
/// Minimum tolerance when reconciling all instrument sources together.
pub const INSTRUMENT_TOTAL_FLOOR: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecordCount {
    pub count: usize,
    pub remainder: usize,
}

/// Whole records in `total_bytes` of fixed `record_size` records.
pub fn expected_record_count(total_bytes: usize, record_size: usize) -> RecordCount {
    if record_size == 0 {
        return RecordCount {
            count: 0,
            remainder: total_bytes,
        };
    }
    let count = RecordCount {
        count: total_bytes / record_size,
        remainder: total_bytes % record_size,
    };
    if count.remainder != 0 {
        warn!(
            total_bytes,
            record_size,
            remainder = count.remainder,
            "file size is not a multiple of the record size"
        );
    }
    count
}

/// Number of lines in `bytes`; a last line without terminator still counts.
pub fn count_lines(bytes: &[u8]) -> usize {
    let newlines = bytes.iter().filter(|b| **b == b'\n').count();
    match bytes.last() {
        Some(b'\n') | None => newlines,
        Some(_) => newlines + 1,
    }
}

/// Expected vs. stored counts for one source (or a group of them).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reconciliation {
    pub expected: usize,
    pub stored: usize,
    /// `stored - expected`.
    pub difference: i64,
    pub tolerance: usize,
    pub matched: bool,
    pub match_percentage: f64,
}

pub fn reconcile(expected: usize, stored: usize, floor: usize) -> Reconciliation {
    let tolerance = floor.max(expected / 10);
    let difference = stored as i64 - expected as i64;
    let (lo, hi) = (expected.min(stored), expected.max(stored));
    let match_percentage = if hi == 0 {
        0.0
    } else {
        (lo as f64 / hi as f64 * 10_000.0).round() / 100.0
    };
    let matched = difference.unsigned_abs() as usize <= tolerance;
    debug!(expected, stored, tolerance, matched, "reconciled");
    Reconciliation {
        expected,
        stored,
        difference,
        tolerance,
        matched,
        match_percentage,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileAnalysis {
    /// Name of the file actually measured (the archive entry for zips).
    pub file_name: String,
    pub size_bytes: usize,
    /// `None` for newline-delimited files.
    pub record_size: Option<usize>,
    pub record_count: usize,
    pub remainder: usize,
}

/// Measure a master file without parsing it. Fixed-width files are counted by
/// size, text files by lines.
#[instrument(level = "debug", skip(path, extensions), fields(file = %path.display()))]
pub fn analyze_master_file(
    path: &Path,
    record_size: Option<usize>,
    extensions: &[&str],
) -> Result<FileAnalysis, ParseError> {
    let (file_name, bytes) = archive::read_master_bytes(path, extensions)?;
    let (record_count, remainder) = match record_size {
        Some(size) => {
            let c = expected_record_count(bytes.len(), size);
            (c.count, c.remainder)
        }
        None => (count_lines(&bytes), 0),
    };
    let analysis = FileAnalysis {
        file_name,
        size_bytes: bytes.len(),
        record_size,
        record_count,
        remainder,
    };
    info!(
        entry = %analysis.file_name,
        size = analysis.size_bytes,
        records = analysis.record_count,
        "master file analyzed"
    );
    Ok(analysis)
}

/// A well-known listing expected in every complete load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownStock {
    pub code: &'static str,
    pub name: &'static str,
    pub market: &'static str,
}

const fn known(code: &'static str, name: &'static str, market: &'static str) -> KnownStock {
    KnownStock { code, name, market }
}

pub const KNOWN_STOCKS: [KnownStock; 9] = [
    known("005930", "삼성전자", "KOSPI"),
    known("000660", "SK하이닉스", "KOSPI"),
    known("035420", "NAVER", "KOSPI"),
    known("051910", "LG화학", "KOSPI"),
    known("207940", "삼성바이오로직스", "KOSPI"),
    known("373220", "LG에너지솔루션", "KOSPI"),
    known("122870", "와이지엔터테인먼트", "KOSDAQ"),
    known("247540", "에코프로비엠", "KOSDAQ"),
    known("086520", "에코프로", "KOSDAQ"),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpotCheck {
    pub code: String,
    pub expected_name: String,
    pub found_name: Option<String>,
    pub found_market: Option<String>,
    pub passed: bool,
}

fn name_matches(expected: &str, found: &str, aliases: Option<&str>) -> bool {
    found.contains(expected)
        || expected.contains(found)
        || aliases.is_some_and(|a| a.split(',').any(|alias| alias == expected))
}

/// Look every `known` listing up by short code among `rows`.
///
/// Only the markets present in `rows` are checked, so a partial run (one
/// source) does not report the other market's listings as missing.
pub fn spot_check(rows: &[Instrument], known: &[KnownStock]) -> Vec<SpotCheck> {
    known
        .iter()
        .filter(|k| rows.iter().any(|r| r.market == k.market))
        .map(|k| {
            let found = rows
                .iter()
                .find(|r| r.short_code.as_deref() == Some(k.code));
            let passed = found.is_some_and(|r| {
                r.market == k.market && name_matches(k.name, &r.name, r.alias_names.as_deref())
            });
            if !passed {
                warn!(code = k.code, expected = k.name, found = ?found.map(|r| &r.name), "spot check failed");
            }
            SpotCheck {
                code: k.code.to_string(),
                expected_name: k.name.to_string(),
                found_name: found.map(|r| r.name.clone()),
                found_market: found.map(|r| r.market.clone()),
                passed,
            }
        })
        .collect()
}

static STOCK_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{6}$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatCheck {
    pub name: &'static str,
    pub invalid: usize,
    pub passed: bool,
}

impl FormatCheck {
    fn new(name: &'static str, invalid: usize) -> Self {
        if invalid > 0 {
            warn!(check = name, invalid, "format check failed");
        }
        Self {
            name,
            invalid,
            passed: invalid == 0,
        }
    }
}

pub fn check_code_formats(rows: &[Instrument]) -> Vec<FormatCheck> {
    let stock_codes = rows
        .iter()
        .filter(|r| r.instrument_type == InstrumentType::Stock)
        .filter(|r| {
            !r.short_code
                .as_deref()
                .is_some_and(|c| STOCK_CODE.is_match(c))
        })
        .count();
    let short_codes = rows
        .iter()
        .filter_map(|r| r.short_code.as_deref())
        .filter(|c| !(3..=12).contains(&c.chars().count()))
        .count();
    let names = rows
        .iter()
        .filter(|r| !(2..=100).contains(&r.name.chars().count()))
        .count();

    vec![
        FormatCheck::new("domestic_stock_code_format", stock_codes),
        FormatCheck::new("short_code_length", short_codes),
        FormatCheck::new("instrument_name_length", names),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::tests::write_zip;
    use crate::model::StatusFlags;
    use std::fs;
    use tempfile::tempdir;

    fn stock(short: &str, name: &str, market: &str) -> Instrument {
        Instrument {
            code: format!("KR7{short}003"),
            short_code: Some(short.to_string()),
            name: name.to_string(),
            name_eng: None,
            instrument_type: InstrumentType::Stock,
            subtype: None,
            market: market.to_string(),
            country_code: "KOR".into(),
            currency_code: "KRW".into(),
            listing_date: None,
            maturity_date: None,
            face_value: Some(100),
            exercise_price: None,
            industry_code: None,
            underlying_code: None,
            underlying_name: None,
            issuer_code: None,
            flags: StatusFlags::default(),
            alias_names: None,
        }
    }

    #[test]
    fn record_counts() {
        assert_eq!(
            expected_record_count(900, 300),
            RecordCount { count: 3, remainder: 0 }
        );
        assert_eq!(
            expected_record_count(905, 300),
            RecordCount { count: 3, remainder: 5 }
        );
        assert_eq!(count_lines(b""), 0);
        assert_eq!(count_lines(b"a\nb\n"), 2);
        assert_eq!(count_lines(b"a\nb"), 2);
    }

    #[test]
    fn tolerance_uses_floor_then_ten_percent() {
        let r = reconcile(20, 24, CATEGORY_FLOOR);
        assert_eq!(r.tolerance, 5);
        assert_eq!(r.difference, 4);
        assert!(r.matched);
        assert_eq!(r.match_percentage, 83.33);

        let r = reconcile(1000, 880, CATEGORY_FLOOR);
        assert_eq!(r.tolerance, 100);
        assert_eq!(r.difference, -120);
        assert!(!r.matched);

        let r = reconcile(300, 260, INSTRUMENT_TOTAL_FLOOR);
        assert_eq!(r.tolerance, 50);
        assert!(r.matched);

        let r = reconcile(0, 0, CATEGORY_FLOOR);
        assert!(r.matched);
        assert_eq!(r.match_percentage, 0.0);
    }

    #[test]
    fn analyzes_plain_and_archived_files() {
        let dir = tempdir().unwrap();
        let fixed = dir.path().join("memcode.mst");
        fs::write(&fixed, vec![b' '; 125]).unwrap();
        let a = analyze_master_file(&fixed, Some(50), &["mst"]).unwrap();
        assert_eq!((a.record_count, a.remainder, a.size_bytes), (2, 25, 125));
        assert_eq!(a.file_name, "memcode.mst");

        let zipped = dir.path().join("theme_code.mst.zip");
        write_zip(&zipped, &[("theme_code.mst", &b"one\ntwo\nthree"[..])]);
        let a = analyze_master_file(&zipped, None, &["mst"]).unwrap();
        assert_eq!(a.record_count, 3);
        assert_eq!(a.record_size, None);
    }

    #[test]
    fn spot_checks_match_names_loosely() {
        let mut hynix = stock("000660", "SK hynix", "KOSPI");
        hynix.alias_names = Some("000660,SK hynix,SK하이닉스".into());
        let rows = vec![
            stock("005930", "삼성전자", "KOSPI"),
            hynix,
            stock("035420", "네이버", "KOSPI"),
        ];
        let checks = spot_check(&rows, &KNOWN_STOCKS);
        // only KOSPI listings are checked
        assert_eq!(checks.len(), 6);
        assert!(checks[0].passed);
        assert!(checks[1].passed);
        assert!(!checks[2].passed);
        assert_eq!(checks[2].found_name.as_deref(), Some("네이버"));
        assert!(checks[3..].iter().all(|c| !c.passed && c.found_name.is_none()));
    }

    #[test]
    fn format_checks_count_offenders() {
        let mut etf = stock("A1234", "KODEX 200", "KOSPI");
        etf.instrument_type = InstrumentType::Etf;
        let rows = vec![
            stock("005930", "삼성전자", "KOSPI"),
            stock("12345A", "X", "KOSDAQ"),
            stock("12", "정상이름", "KOSDAQ"),
            etf,
        ];
        let checks = check_code_formats(&rows);
        assert_eq!(checks[0].invalid, 2);
        assert_eq!(checks[1].invalid, 1);
        assert_eq!(checks[2].invalid, 1);
        assert!(checks.iter().all(|c| !c.passed));

        let clean = check_code_formats(&rows[..1]);
        assert!(clean.iter().all(|c| c.passed));
    }
}
