// src/parse/member.rs
//
// Exchange member firms: 50-byte binary records in one of two layouts.

use tracing::info;

use super::{require_code_and_name, MasterParser, ParseOptions, RawRecord};
use crate::config::{Config, SourceConfig};
use crate::error::RecordError;
use crate::layout::{for_category, Layout, MemberLayout};
use crate::model::{Category, MemberClass, MemberFirm};
use crate::normalize;

pub struct MemberParser {
    label: String,
    layout: MemberLayout,
    options: ParseOptions,
}

impl MemberParser {
    pub fn new(source: &SourceConfig, config: &Config) -> Self {
        Self {
            label: source.label.clone(),
            layout: config.member_layout,
            options: ParseOptions::from_config(config),
        }
    }

    fn firm(raw: &RawRecord) -> MemberFirm {
        MemberFirm {
            code: raw.text("code").to_string(),
            name: raw.text("name").to_string(),
            abbreviation: raw.non_blank("abbreviation"),
            name_eng: raw.non_blank("name_eng"),
            class: MemberClass::from_code(raw.text("member_type")),
            registration_date: normalize::parse_date(raw.text("registration_date")),
            active: true,
        }
    }
}

impl MasterParser for MemberParser {
    type Record = MemberFirm;

    fn label(&self) -> &str {
        &self.label
    }

    fn layout(&self) -> &'static Layout {
        for_category(Category::Member, self.layout)
    }

    fn options(&self) -> &ParseOptions {
        &self.options
    }

    fn accept(&self, raw: RawRecord) -> Result<RawRecord, RecordError> {
        require_code_and_name(&raw, "code", "name")?;
        Ok(raw)
    }

    fn transform(&self, raw: &[RawRecord]) -> Vec<MemberFirm> {
        let rows = normalize::dedup_first(raw.iter().map(Self::firm).collect());
        info!(label = %self.label, rows = rows.len(), layout = ?self.layout, "member firms transformed");
        rows
    }
}
