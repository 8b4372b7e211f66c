// src/layout/registry.rs
//
// The vendor record layouts. Offsets are fixed by the vendor file formats; the
// trailing equity block and the warrant record are documented in the vendor's
// header files, which this crate never parses.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::{FieldKind, FieldSpec, Layout, RecordFormat, Segment, Span};
use crate::model::Category;

/// Width of the fixed block at the end of every equity line, counting the
/// terminator when the line has one.
pub const EQUITY_TAIL_WIDTH: usize = 228;
/// Short code (9) plus standard code (12) must fit before the trailing block.
const EQUITY_HEAD_MIN: usize = 21;

pub const WARRANT_RECORD_SIZE: usize = 300;
pub const MEMBER_RECORD_SIZE: usize = 50;

/// Which of the two tolerated member-firm record layouts to apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberLayout {
    /// Code, name, abbreviation, English name, class and registration date.
    #[default]
    Detailed,
    /// Code and a 40-byte name only.
    Compact,
}

pub static EQUITY: Lazy<Layout> = Lazy::new(|| Layout {
    name: "equity",
    format: RecordFormat::Lines,
    min_len: EQUITY_TAIL_WIDTH + EQUITY_HEAD_MIN,
    segments: vec![
        Segment {
            span: Span::Between {
                start: 0,
                trailing: EQUITY_TAIL_WIDTH,
            },
            fields: vec![
                FieldSpec::text("short_code", 0, 9),
                FieldSpec::text("code", 9, 12),
                FieldSpec::spanning("name", Span::From { start: 21 }),
            ],
        },
        Segment {
            span: Span::Last {
                len: EQUITY_TAIL_WIDTH,
            },
            fields: vec![
                FieldSpec::text("group_code", 0, 2),
                FieldSpec::text("market_cap_scale", 2, 1),
                FieldSpec::text("industry_large", 3, 4),
                FieldSpec::text("industry_medium", 7, 4),
                FieldSpec::text("industry_small", 11, 4),
                // 15..41: 26 one-character classification flags, unused
                FieldSpec::new("base_price", 41, 9, FieldKind::Number),
                FieldSpec::new("trade_unit", 50, 5, FieldKind::Number),
                FieldSpec::new("after_hours_unit", 55, 5, FieldKind::Number),
                FieldSpec::new("halted", 60, 1, FieldKind::Flag),
                FieldSpec::new("clearing", 61, 1, FieldKind::Flag),
                FieldSpec::new("managed", 62, 1, FieldKind::Flag),
                FieldSpec::text("market_warning", 63, 2),
                // 65..89: notice, disclosure, lock, margin and credit codes,
                // previous-day volume
                FieldSpec::new("face_value", 89, 12, FieldKind::Number),
                FieldSpec::new("listing_date", 101, 8, FieldKind::Date),
            ],
        },
    ],
});

pub static WARRANT: Lazy<Layout> = Lazy::new(|| Layout {
    name: "warrant",
    format: RecordFormat::Fixed {
        record_size: WARRANT_RECORD_SIZE,
    },
    min_len: 0,
    segments: vec![Segment {
        span: Span::From { start: 0 },
        fields: vec![
            FieldSpec::text("code", 0, 12),
            FieldSpec::text("short_code", 12, 6),
            FieldSpec::text("name", 18, 40),
            FieldSpec::text("underlying_code", 58, 12),
            FieldSpec::text("underlying_name", 70, 40),
            FieldSpec::text("right_type", 110, 1),
            FieldSpec::new("exercise_price", 111, 15, FieldKind::Number),
            FieldSpec::new("maturity_date", 126, 8, FieldKind::Date),
            FieldSpec::new("listing_date", 134, 8, FieldKind::Date),
            FieldSpec::text("issuer_code", 142, 8),
        ],
    }],
});

pub static MEMBER_DETAILED: Lazy<Layout> = Lazy::new(|| Layout {
    name: "member_detailed",
    format: RecordFormat::Fixed {
        record_size: MEMBER_RECORD_SIZE,
    },
    min_len: 0,
    segments: vec![Segment {
        span: Span::From { start: 0 },
        fields: vec![
            FieldSpec::text("code", 0, 5),
            FieldSpec::text("name", 5, 20),
            FieldSpec::text("abbreviation", 25, 10),
            FieldSpec::text("name_eng", 35, 12),
            FieldSpec::text("member_type", 47, 1),
            // runs past the 50-byte record; the span is clamped
            FieldSpec::new("registration_date", 48, 8, FieldKind::Date),
        ],
    }],
});

pub static MEMBER_COMPACT: Lazy<Layout> = Lazy::new(|| Layout {
    name: "member_compact",
    format: RecordFormat::Fixed {
        record_size: MEMBER_RECORD_SIZE,
    },
    min_len: 0,
    segments: vec![Segment {
        span: Span::From { start: 0 },
        fields: vec![FieldSpec::text("code", 0, 5), FieldSpec::text("name", 5, 40)],
    }],
});

pub static SECTOR: Lazy<Layout> = Lazy::new(|| Layout {
    name: "sector",
    format: RecordFormat::Lines,
    min_len: 0,
    segments: vec![Segment {
        span: Span::From { start: 0 },
        fields: vec![
            // char 0 is a marker; the name span overlaps the code
            FieldSpec::text("code", 1, 4),
            FieldSpec::text("name", 3, 40),
        ],
    }],
});

pub static THEME: Lazy<Layout> = Lazy::new(|| Layout {
    name: "theme",
    format: RecordFormat::Lines,
    min_len: 0,
    segments: vec![Segment {
        span: Span::From { start: 0 },
        fields: vec![
            FieldSpec::text("theme_code", 0, 3),
            FieldSpec::spanning(
                "theme_name",
                Span::Between {
                    start: 3,
                    trailing: 10,
                },
            ),
            FieldSpec::spanning("stock_code", Span::Last { len: 10 }),
        ],
    }],
});

/// Layout for a category. Members have two layouts; the rest exactly one.
pub fn for_category(category: Category, member: MemberLayout) -> &'static Layout {
    match category {
        Category::Equity => &*EQUITY,
        Category::Warrant => &*WARRANT,
        Category::Member => match member {
            MemberLayout::Detailed => &*MEMBER_DETAILED,
            MemberLayout::Compact => &*MEMBER_COMPACT,
        },
        Category::Sector => &*SECTOR,
        Category::Theme => &*THEME,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn field_names_are_unique_per_layout() {
        for layout in [
            &*EQUITY,
            &*WARRANT,
            &*MEMBER_DETAILED,
            &*MEMBER_COMPACT,
            &*SECTOR,
            &*THEME,
        ] {
            let mut seen = HashSet::new();
            for f in layout.fields() {
                assert!(seen.insert(f.name), "{}: duplicate {}", layout.name, f.name);
            }
        }
    }

    #[test]
    fn fixed_fields_stay_inside_their_record() {
        for layout in [&*WARRANT, &*MEMBER_COMPACT] {
            let size = layout.record_size().unwrap();
            for f in layout.fields() {
                let r = f.span.range(usize::MAX);
                assert!(r.end <= size, "{}.{} ends at {}", layout.name, f.name, r.end);
            }
        }
    }

    #[test]
    fn equity_tail_fields_fit_the_tail() {
        let tail = &EQUITY.segments[1];
        for f in &tail.fields {
            assert!(f.span.range(usize::MAX).end <= EQUITY_TAIL_WIDTH, "{}", f.name);
        }
    }

    #[test]
    fn member_layout_is_selected_by_config() {
        assert_eq!(
            for_category(Category::Member, MemberLayout::Detailed).name,
            "member_detailed"
        );
        assert_eq!(
            for_category(Category::Member, MemberLayout::Compact).name,
            "member_compact"
        );
        assert_eq!(for_category(Category::Theme, MemberLayout::Compact).name, "theme");
    }
}
