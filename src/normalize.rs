// src/normalize.rs
//
// Field derivations shared by the category transformers.

use chrono::NaiveDate;
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

use crate::table::TableRow;

/// Accepted date layouts, tried in order.
pub const DATE_FORMATS: [&str; 3] = ["%Y%m%d", "%Y/%m/%d", "%Y-%m-%d"];

const AFFIRMATIVE: &str = "Y";
const NEGATIVE: &str = "N";

/// Empty, all-zero and all-blank values carry no date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() || s.chars().all(|c| c == '0') {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Equity listing dates are never null: anything that is not a valid
/// 8-digit date becomes `fallback`.
pub fn listing_date(raw: &str, fallback: NaiveDate) -> NaiveDate {
    let s = raw.trim();
    if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return fallback;
    }
    parse_date(s).unwrap_or(fallback)
}

pub fn parse_int(raw: &str) -> Option<i64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    s.parse().ok()
}

pub fn parse_float(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    s.parse().ok()
}

/// `Y` is the only affirmative value.
pub fn flag(raw: &str) -> bool {
    raw.trim() == AFFIRMATIVE
}

pub fn yn(value: bool) -> &'static str {
    if value {
        AFFIRMATIVE
    } else {
        NEGATIVE
    }
}

/// `Some` only for non-blank text, trimmed.
pub fn non_blank(raw: &str) -> Option<String> {
    let s = raw.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// Corporate suffixes stripped to form short aliases.
const CORPORATE_MARKERS: [&str; 2] = ["주식회사", "(주)"];

/// Comma-joined search aliases: the name, the short code, the name without
/// each corporate marker it contains, and the English name. Duplicates and
/// blanks are dropped; the set is sorted so output is stable.
pub fn aliases(name: &str, short_code: Option<&str>, name_eng: Option<&str>) -> String {
    let mut set = BTreeSet::new();
    let mut add = |s: &str| {
        let s = s.trim();
        if !s.is_empty() {
            set.insert(s.to_string());
        }
    };

    add(name);
    if let Some(code) = short_code {
        add(code);
    }
    for marker in CORPORATE_MARKERS {
        if name.contains(marker) {
            add(&name.replace(marker, ""));
        }
    }
    if let Some(eng) = name_eng {
        add(eng);
    }

    set.into_iter().collect::<Vec<_>>().join(",")
}

/// Keep the first row for every natural key, preserving order.
pub fn dedup_first<R: TableRow>(rows: Vec<R>) -> Vec<R> {
    let before = rows.len();
    let mut seen = HashSet::with_capacity(before);
    let kept: Vec<R> = rows
        .into_iter()
        .filter(|r| seen.insert(r.unique_key()))
        .collect();
    if kept.len() < before {
        debug!(
            table = R::TABLE,
            dropped = before - kept.len(),
            "dropped duplicate keys"
        );
    }
    kept
}
