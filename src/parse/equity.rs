// src/parse/equity.rs
//
// KOSPI / KOSDAQ / KONEX stock masters. Each line is a variable-width head
// (short code, standard code, name) followed by a fixed 228-character block.

use chrono::NaiveDate;
use tracing::info;

use super::{require_code_and_name, MasterParser, ParseOptions, RawRecord};
use crate::config::{Config, SourceConfig};
use crate::error::RecordError;
use crate::layout::{Layout, EQUITY};
use crate::model::{Instrument, InstrumentType, StatusFlags};
use crate::normalize;

/// Group codes of exchange-traded funds and notes.
const FUND_GROUPS: [&str; 2] = ["EF", "EN"];
/// Name fragments that mark a fund even when the group code does not.
const FUND_NAME_MARKERS: [&str; 2] = ["ETF", "ETN"];

pub const COUNTRY_CODE: &str = "KOR";
pub const CURRENCY_CODE: &str = "KRW";

pub struct EquityParser {
    label: String,
    market: String,
    warning_code: String,
    listing_fallback: NaiveDate,
    options: ParseOptions,
}

impl EquityParser {
    pub fn new(source: &SourceConfig, config: &Config) -> Self {
        Self {
            label: source.label.clone(),
            market: source.market.clone(),
            warning_code: config.market_warning_code.clone(),
            listing_fallback: config.listing_date_fallback,
            options: ParseOptions::from_config(config),
        }
    }

    fn is_fund(name: &str, group_code: &str) -> bool {
        FUND_NAME_MARKERS.iter().any(|m| name.contains(m))
            || FUND_GROUPS.iter().any(|g| *g == group_code)
    }

    fn instrument(&self, raw: &RawRecord) -> Instrument {
        let name = raw.text("name").to_string();
        let short_code = raw.non_blank("short_code");
        let fund = Self::is_fund(&name, raw.text("group_code"));
        let alias_names = normalize::aliases(&name, short_code.as_deref(), None);

        Instrument {
            code: raw.text("code").to_string(),
            short_code,
            name,
            name_eng: None,
            instrument_type: if fund {
                InstrumentType::Etf
            } else {
                InstrumentType::Stock
            },
            subtype: None,
            market: self.market.clone(),
            country_code: COUNTRY_CODE.to_string(),
            currency_code: CURRENCY_CODE.to_string(),
            listing_date: Some(normalize::listing_date(
                raw.text("listing_date"),
                self.listing_fallback,
            )),
            maturity_date: None,
            face_value: Some(normalize::parse_int(raw.text("face_value")).unwrap_or(0)),
            exercise_price: None,
            industry_code: raw.non_blank("industry_large"),
            underlying_code: None,
            underlying_name: None,
            issuer_code: None,
            flags: StatusFlags {
                etf: fund,
                warning: raw.text("market_warning") == self.warning_code,
                managed: normalize::flag(raw.text("managed")),
                halted: normalize::flag(raw.text("halted")),
                clearing: normalize::flag(raw.text("clearing")),
                ..StatusFlags::default()
            },
            alias_names: Some(alias_names),
        }
    }
}

impl MasterParser for EquityParser {
    type Record = Instrument;

    fn label(&self) -> &str {
        &self.label
    }

    fn layout(&self) -> &'static Layout {
        &*EQUITY
    }

    fn options(&self) -> &ParseOptions {
        &self.options
    }

    fn accept(&self, raw: RawRecord) -> Result<RawRecord, RecordError> {
        require_code_and_name(&raw, "code", "name")?;
        Ok(raw)
    }

    fn transform(&self, raw: &[RawRecord]) -> Vec<Instrument> {
        let rows = normalize::dedup_first(raw.iter().map(|r| self.instrument(r)).collect());
        let funds = rows.iter().filter(|r| r.flags.etf).count();
        info!(label = %self.label, rows = rows.len(), funds, "equities transformed");
        rows
    }
}
