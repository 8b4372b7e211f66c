// src/table.rs
//
// Arrow shape of every target table. Column names follow the relational
// store; audit timestamps are left to the store.

use arrow::{
    array::{ArrayRef, Date32Array, Float64Array, Int64Array, StringArray},
    datatypes::{DataType as ArrowDataType, Field, Schema as ArrowSchema},
    record_batch::RecordBatch,
};
use chrono::NaiveDate;
use std::{hash::Hash, sync::Arc};

use crate::error::TransformError;
use crate::model::{Instrument, MemberFirm, SectorCode, StatusFlags, ThemeCode};
use crate::normalize::yn;

/// A typed row bound for one target table.
/// - Defines schema and column construction for batch writes.
/// - `unique_key` is the natural key used for deduplication.
pub trait TableRow: Sized {
    /// Target table name in the store.
    const TABLE: &'static str;
    /// Natural key; compared field by field, never joined into one string.
    type Key: Eq + Hash;
    /// Arrow schema for this row type
    fn schema() -> ArrowSchema;
    /// Column arrays for `rows`, in schema order
    fn columns(rows: &[Self]) -> Vec<ArrayRef>;
    fn unique_key(&self) -> Self::Key;

    fn to_batch(rows: &[Self]) -> Result<RecordBatch, TransformError> {
        RecordBatch::try_new(Arc::new(Self::schema()), Self::columns(rows)).map_err(|source| {
            TransformError::Batch {
                table: Self::TABLE,
                source,
            }
        })
    }
}

fn utf8(name: &str) -> Field {
    Field::new(name, ArrowDataType::Utf8, false)
}

fn utf8_null(name: &str) -> Field {
    Field::new(name, ArrowDataType::Utf8, true)
}

fn date(name: &str) -> Field {
    Field::new(name, ArrowDataType::Date32, true)
}

/// Days since the Unix epoch, as Arrow's Date32 stores them.
pub fn date32(d: NaiveDate) -> i32 {
    let epoch = NaiveDate::default();
    d.signed_duration_since(epoch).num_days() as i32
}

fn strings<R>(rows: &[R], f: impl Fn(&R) -> &str) -> ArrayRef {
    Arc::new(StringArray::from(rows.iter().map(f).collect::<Vec<_>>()))
}

fn opt_strings<R>(rows: &[R], f: impl Fn(&R) -> Option<&str>) -> ArrayRef {
    Arc::new(StringArray::from(rows.iter().map(f).collect::<Vec<_>>()))
}

fn dates<R>(rows: &[R], f: impl Fn(&R) -> Option<NaiveDate>) -> ArrayRef {
    Arc::new(Date32Array::from(
        rows.iter().map(|r| f(r).map(date32)).collect::<Vec<_>>(),
    ))
}

fn flags<R>(rows: &[R], f: impl Fn(&R) -> bool) -> ArrayRef {
    strings(rows, |r| yn(f(r)))
}

/// Flag columns of the instruments table, in schema order.
const FLAG_COLUMNS: [&str; 13] = [
    "is_etf",
    "is_etn",
    "is_elw",
    "is_reit",
    "is_spac",
    "is_warning",
    "is_risk",
    "is_caution",
    "is_managed",
    "is_halted",
    "is_clearing",
    "is_credit_available",
    "is_foreign",
];

fn flag_values(f: &StatusFlags) -> [bool; 13] {
    [
        f.etf,
        f.etn,
        f.elw,
        f.reit,
        f.spac,
        f.warning,
        f.risk,
        f.caution,
        f.managed,
        f.halted,
        f.clearing,
        f.credit_available,
        f.foreign,
    ]
}

impl TableRow for Instrument {
    const TABLE: &'static str = "instruments";

    fn schema() -> ArrowSchema {
        let mut fields = vec![
            utf8("instrument_code"),
            utf8_null("short_code"),
            utf8("instrument_name"),
            utf8_null("instrument_name_eng"),
            utf8("instrument_type"),
            utf8_null("instrument_subtype"),
            utf8("market_type"),
            utf8("country_code"),
            utf8("currency_code"),
            date("listing_date"),
            date("maturity_date"),
            Field::new("face_value", ArrowDataType::Int64, true),
            Field::new("exercise_price", ArrowDataType::Float64, true),
            utf8_null("industry_code"),
            utf8_null("underlying_code"),
            utf8_null("underlying_asset"),
            utf8_null("issuer_code"),
        ];
        fields.extend(FLAG_COLUMNS.iter().map(|name| utf8(name)));
        fields.push(utf8_null("alias_names"));
        ArrowSchema::new(fields)
    }

    fn columns(rows: &[Self]) -> Vec<ArrayRef> {
        let mut cols = vec![
            strings(rows, |r| &r.code),
            opt_strings(rows, |r| r.short_code.as_deref()),
            strings(rows, |r| &r.name),
            opt_strings(rows, |r| r.name_eng.as_deref()),
            strings(rows, |r| r.instrument_type.as_str()),
            opt_strings(rows, |r| r.subtype.map(|s| s.as_str())),
            strings(rows, |r| &r.market),
            strings(rows, |r| &r.country_code),
            strings(rows, |r| &r.currency_code),
            dates(rows, |r| r.listing_date),
            dates(rows, |r| r.maturity_date),
            Arc::new(Int64Array::from(
                rows.iter().map(|r| r.face_value).collect::<Vec<_>>(),
            )) as ArrayRef,
            Arc::new(Float64Array::from(
                rows.iter().map(|r| r.exercise_price).collect::<Vec<_>>(),
            )) as ArrayRef,
            opt_strings(rows, |r| r.industry_code.as_deref()),
            opt_strings(rows, |r| r.underlying_code.as_deref()),
            opt_strings(rows, |r| r.underlying_name.as_deref()),
            opt_strings(rows, |r| r.issuer_code.as_deref()),
        ];
        cols.extend((0..FLAG_COLUMNS.len()).map(|i| flags(rows, |r| flag_values(&r.flags)[i])));
        cols.push(opt_strings(rows, |r| r.alias_names.as_deref()));
        cols
    }

    type Key = String;

    fn unique_key(&self) -> String {
        self.code.clone()
    }
}

impl TableRow for MemberFirm {
    const TABLE: &'static str = "member_code";

    fn schema() -> ArrowSchema {
        ArrowSchema::new(vec![
            utf8("member_code"),
            utf8("member_name"),
            utf8_null("member_abbr"),
            utf8_null("member_eng_name"),
            utf8("member_type"),
            date("reg_date"),
            utf8("is_active"),
        ])
    }

    fn columns(rows: &[Self]) -> Vec<ArrayRef> {
        vec![
            strings(rows, |r| &r.code),
            strings(rows, |r| &r.name),
            opt_strings(rows, |r| r.abbreviation.as_deref()),
            opt_strings(rows, |r| r.name_eng.as_deref()),
            strings(rows, |r| r.class.as_str()),
            dates(rows, |r| r.registration_date),
            flags(rows, |r| r.active),
        ]
    }

    type Key = String;

    fn unique_key(&self) -> String {
        self.code.clone()
    }
}

impl TableRow for SectorCode {
    const TABLE: &'static str = "sector_code";

    fn schema() -> ArrowSchema {
        ArrowSchema::new(vec![
            utf8("sector_code"),
            utf8("sector_name"),
            Field::new("sector_level", ArrowDataType::Int64, false),
            utf8_null("parent_sector_code"),
            utf8("is_active"),
        ])
    }

    fn columns(rows: &[Self]) -> Vec<ArrayRef> {
        vec![
            strings(rows, |r| &r.code),
            strings(rows, |r| &r.name),
            Arc::new(Int64Array::from(
                rows.iter().map(|r| i64::from(r.level)).collect::<Vec<_>>(),
            )) as ArrayRef,
            opt_strings(rows, |r| r.parent_code.as_deref()),
            flags(rows, |r| r.active),
        ]
    }

    type Key = String;

    fn unique_key(&self) -> String {
        self.code.clone()
    }
}

impl TableRow for ThemeCode {
    const TABLE: &'static str = "theme_code";

    fn schema() -> ArrowSchema {
        ArrowSchema::new(vec![
            utf8("theme_code"),
            utf8("theme_name"),
            utf8_null("stock_code"),
            utf8("is_active"),
        ])
    }

    fn columns(rows: &[Self]) -> Vec<ArrayRef> {
        vec![
            strings(rows, |r| &r.theme_code),
            strings(rows, |r| &r.theme_name),
            opt_strings(rows, |r| r.stock_code.as_deref()),
            flags(rows, |r| r.active),
        ]
    }

    type Key = (String, Option<String>);

    fn unique_key(&self) -> Self::Key {
        (self.theme_code.clone(), self.stock_code.clone())
    }
}
