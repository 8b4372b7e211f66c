// src/model.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The closed set of master-file categories this crate understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// KOSPI / KOSDAQ / KONEX stock masters (newline-delimited text).
    Equity,
    /// ELW masters (300-byte binary records).
    Warrant,
    /// Exchange member firm codes.
    Member,
    /// Sector (index industry) codes.
    Sector,
    /// Theme codes with their member instruments.
    Theme,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Equity => "equity",
            Category::Warrant => "warrant",
            Category::Member => "member",
            Category::Sector => "sector",
            Category::Theme => "theme",
        }
    }

    /// Target table in the relational store.
    pub fn table_name(&self) -> &'static str {
        match self {
            Category::Equity | Category::Warrant => "instruments",
            Category::Member => "member_code",
            Category::Sector => "sector_code",
            Category::Theme => "theme_code",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstrumentType {
    Stock,
    Etf,
    Elw,
    // Reserved by the target schema; no current layout produces these.
    Etn,
    Reit,
    Spac,
}

impl InstrumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstrumentType::Stock => "STOCK",
            InstrumentType::Etf => "ETF",
            InstrumentType::Elw => "ELW",
            InstrumentType::Etn => "ETN",
            InstrumentType::Reit => "REIT",
            InstrumentType::Spac => "SPAC",
        }
    }
}

/// Exercise right of a warrant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarrantRight {
    Call,
    Put,
}

impl WarrantRight {
    /// Vendor code `1` is a call, `2` a put; anything else is unknown.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "1" => Some(WarrantRight::Call),
            "2" => Some(WarrantRight::Put),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WarrantRight::Call => "콜",
            WarrantRight::Put => "풋",
        }
    }
}

/// Yes/no status flags carried by every instrument row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct StatusFlags {
    pub etf: bool,
    pub etn: bool,
    pub elw: bool,
    pub reit: bool,
    pub spac: bool,
    pub warning: bool,
    pub risk: bool,
    pub caution: bool,
    pub managed: bool,
    pub halted: bool,
    pub clearing: bool,
    pub credit_available: bool,
    pub foreign: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instrument {
    pub code: String,
    pub short_code: Option<String>,
    pub name: String,
    pub name_eng: Option<String>,
    pub instrument_type: InstrumentType,
    pub subtype: Option<WarrantRight>,
    pub market: String,
    pub country_code: String,
    pub currency_code: String,
    pub listing_date: Option<NaiveDate>,
    pub maturity_date: Option<NaiveDate>,
    pub face_value: Option<i64>,
    pub exercise_price: Option<f64>,
    pub industry_code: Option<String>,
    pub underlying_code: Option<String>,
    pub underlying_name: Option<String>,
    pub issuer_code: Option<String>,
    pub flags: StatusFlags,
    pub alias_names: Option<String>,
}

/// Member firm classification, from the single-character vendor code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberClass {
    Securities,
    Futures,
    SecuritiesAndFutures,
    Bank,
    Insurance,
    MerchantBank,
    Other,
}

impl MemberClass {
    /// Unknown codes fall back to `Other`.
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "1" => MemberClass::Securities,
            "2" => MemberClass::Futures,
            "3" => MemberClass::SecuritiesAndFutures,
            "4" => MemberClass::Bank,
            "5" => MemberClass::Insurance,
            "6" => MemberClass::MerchantBank,
            _ => MemberClass::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MemberClass::Securities => "증권",
            MemberClass::Futures => "선물",
            MemberClass::SecuritiesAndFutures => "증권+선물",
            MemberClass::Bank => "은행",
            MemberClass::Insurance => "보험",
            MemberClass::MerchantBank => "종금",
            MemberClass::Other => "기타",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberFirm {
    pub code: String,
    pub name: String,
    pub abbreviation: Option<String>,
    pub name_eng: Option<String>,
    pub class: MemberClass,
    pub registration_date: Option<NaiveDate>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectorCode {
    pub code: String,
    pub name: String,
    /// Always 1 until the vendor hierarchy is modeled.
    pub level: u8,
    pub parent_code: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThemeCode {
    pub theme_code: String,
    pub theme_name: String,
    pub stock_code: Option<String>,
    pub active: bool,
}
