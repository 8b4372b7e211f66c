// src/parse/warrant.rs
//
// ELW masters: 300-byte binary records.

use tracing::info;

use super::{require_code_and_name, MasterParser, ParseOptions, RawRecord};
use crate::config::{Config, SourceConfig};
use crate::error::RecordError;
use crate::layout::{Layout, WARRANT};
use crate::model::{Instrument, InstrumentType, StatusFlags, WarrantRight};
use crate::normalize;
use crate::parse::equity::{COUNTRY_CODE, CURRENCY_CODE};

/// Codes shorter than this are not real listings.
const MIN_CODE_LEN: usize = 6;
/// Width of the short code derived from the standard code.
const SHORT_CODE_LEN: usize = 6;

pub struct WarrantParser {
    label: String,
    market: String,
    options: ParseOptions,
}

impl WarrantParser {
    pub fn new(source: &SourceConfig, config: &Config) -> Self {
        Self {
            label: source.label.clone(),
            market: source.market.clone(),
            options: ParseOptions::from_config(config),
        }
    }

    fn instrument(&self, raw: &RawRecord) -> Instrument {
        Instrument {
            code: raw.text("code").to_string(),
            short_code: raw.non_blank("short_code"),
            name: raw.text("name").to_string(),
            name_eng: None,
            instrument_type: InstrumentType::Elw,
            subtype: WarrantRight::from_code(raw.text("right_type")),
            market: self.market.clone(),
            country_code: COUNTRY_CODE.to_string(),
            currency_code: CURRENCY_CODE.to_string(),
            listing_date: normalize::parse_date(raw.text("listing_date")),
            maturity_date: normalize::parse_date(raw.text("maturity_date")),
            face_value: None,
            exercise_price: normalize::parse_float(raw.text("exercise_price")),
            industry_code: None,
            underlying_code: raw.non_blank("underlying_code"),
            underlying_name: raw.non_blank("underlying_name"),
            issuer_code: raw.non_blank("issuer_code"),
            flags: StatusFlags {
                elw: true,
                ..StatusFlags::default()
            },
            alias_names: None,
        }
    }
}

/// The last `SHORT_CODE_LEN` characters of `code`.
fn derived_short_code(code: &str) -> String {
    let chars: Vec<char> = code.chars().collect();
    chars[chars.len().saturating_sub(SHORT_CODE_LEN)..]
        .iter()
        .collect()
}

impl MasterParser for WarrantParser {
    type Record = Instrument;

    fn label(&self) -> &str {
        &self.label
    }

    fn layout(&self) -> &'static Layout {
        &*WARRANT
    }

    fn options(&self) -> &ParseOptions {
        &self.options
    }

    fn accept(&self, mut raw: RawRecord) -> Result<RawRecord, RecordError> {
        require_code_and_name(&raw, "code", "name")?;
        let code = raw.text("code").to_string();
        if code.chars().count() < MIN_CODE_LEN {
            return Err(RecordError::CodeTooShort {
                code,
                min: MIN_CODE_LEN,
            });
        }
        if raw.text("short_code").is_empty() {
            raw.insert("short_code", derived_short_code(&code));
        }
        Ok(raw)
    }

    fn transform(&self, raw: &[RawRecord]) -> Vec<Instrument> {
        let rows = normalize::dedup_first(raw.iter().map(|r| self.instrument(r)).collect());
        info!(label = %self.label, rows = rows.len(), "warrants transformed");
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseError;
    use crate::layout::WARRANT_RECORD_SIZE;
    use crate::model::Category;
    use crate::parse::tests::{init_test_logging, padded};
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::tempdir;

    struct Elw<'a> {
        code: &'a str,
        short: &'a str,
        name: &'a str,
        right: &'a str,
        strike: &'a str,
        maturity: &'a str,
    }

    fn record(e: &Elw) -> Vec<u8> {
        let mut rec = Vec::with_capacity(WARRANT_RECORD_SIZE);
        rec.extend(padded(e.code, 12));
        rec.extend(padded(e.short, 6));
        rec.extend(padded(e.name, 40));
        rec.extend(padded("KR7005930003", 12));
        rec.extend(padded("삼성전자", 40));
        rec.extend(padded(e.right, 1));
        rec.extend(padded(e.strike, 15));
        rec.extend(padded(e.maturity, 8));
        rec.extend(padded("20240102", 8));
        rec.extend(padded("00001", 8));
        rec.resize(WARRANT_RECORD_SIZE, b' ');
        rec
    }

    fn parser() -> WarrantParser {
        let source = SourceConfig::new("ELW", Category::Warrant, "elw_code.mst", "ELW");
        WarrantParser::new(&source, &Config::default())
    }

    const CALL: Elw<'static> = Elw {
        code: "KRA5800001A1",
        short: "58A001",
        name: "한국A001삼성전자콜",
        right: "1",
        strike: "000085000.00",
        maturity: "20240627",
    };

    #[test]
    fn parses_warrant_records() {
        init_test_logging();
        let dir = tempdir().unwrap();
        let path = dir.path().join("elw_code.mst");
        let put = Elw {
            code: "KRA5800002B2",
            short: "",
            name: "한국A002삼성전자풋",
            right: "2",
            strike: "",
            maturity: "00000000",
        };
        let mut bytes = record(&CALL);
        bytes.extend(record(&put));
        bytes.extend(b"partial"); // remainder is ignored
        fs::write(&path, bytes).unwrap();

        let p = parser();
        let raw = p.parse(&path).unwrap();
        assert_eq!(raw.len(), 2);
        let rows = p.transform(&raw);

        let call = &rows[0];
        assert_eq!(call.code, "KRA5800001A1");
        assert_eq!(call.short_code.as_deref(), Some("58A001"));
        assert_eq!(call.instrument_type, InstrumentType::Elw);
        assert_eq!(call.subtype, Some(WarrantRight::Call));
        assert_eq!(call.exercise_price, Some(85000.0));
        assert_eq!(call.maturity_date, NaiveDate::from_ymd_opt(2024, 6, 27));
        assert_eq!(call.listing_date, NaiveDate::from_ymd_opt(2024, 1, 2));
        assert_eq!(call.underlying_name.as_deref(), Some("삼성전자"));
        assert_eq!(call.issuer_code.as_deref(), Some("00001"));
        assert!(call.flags.elw && !call.flags.etf && !call.flags.warning);

        let put = &rows[1];
        assert_eq!(put.short_code.as_deref(), Some("0002B2"));
        assert_eq!(put.subtype, Some(WarrantRight::Put));
        assert_eq!(put.exercise_price, None);
        assert_eq!(put.maturity_date, None);
    }

    #[test]
    fn gate_drops_short_codes_and_blank_names() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("elw_code.mst");
        let short_code = Elw {
            code: "12345",
            ..CALL
        };
        let nameless = Elw {
            code: "KRA5800003C3",
            name: "",
            ..CALL
        };
        let odd_right = Elw {
            code: "KRA5800004D4",
            right: "9",
            ..CALL
        };
        let mut bytes = record(&short_code);
        bytes.extend(record(&nameless));
        bytes.extend(record(&odd_right));
        bytes.extend(record(&CALL));
        bytes.extend(record(&CALL));
        fs::write(&path, bytes).unwrap();

        let p = parser();
        let raw = p.parse(&path).unwrap();
        assert_eq!(raw.len(), 3);
        let rows = p.transform(&raw);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].subtype, None);
    }

    #[test]
    fn file_shorter_than_one_record_is_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("elw_code.mst");
        fs::write(&path, b"too short").unwrap();
        assert!(matches!(
            parser().parse(&path),
            Err(ParseError::TooShort { record_size: 300, .. })
        ));
    }

    #[test]
    fn short_code_is_derived_from_the_tail() {
        assert_eq!(derived_short_code("KRA5800002B2"), "0002B2");
        assert_eq!(derived_short_code("ABC"), "ABC");
    }
}
