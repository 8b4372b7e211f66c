// src/layout/mod.rs
//
// Fixed-width record layouts. A layout is plain data: the record format plus
// ordered segments of named field spans. Binary layouts count bytes, text
// layouts count characters.

pub mod registry;

pub use registry::{
    for_category, MemberLayout, EQUITY, EQUITY_TAIL_WIDTH, MEMBER_RECORD_SIZE, SECTOR, THEME,
    WARRANT, WARRANT_RECORD_SIZE,
};

use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::decode::Decoder;
use crate::error::RecordError;
use crate::parse::RawRecord;

/// How records are delimited in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordFormat {
    /// Back-to-back records of exactly `record_size` bytes.
    Fixed { record_size: usize },
    /// Newline-delimited text; terminated lines keep their `\n`.
    Lines,
}

/// A span within a record or segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Span {
    /// `len` units starting at `start`.
    At { start: usize, len: usize },
    /// Everything from `start` to the end.
    From { start: usize },
    /// The final `len` units.
    Last { len: usize },
    /// From `start` up to, not including, the final `trailing` units.
    Between { start: usize, trailing: usize },
}

impl Span {
    /// Concrete range inside a record of `total` units. Out-of-range spans are
    /// clamped, so a short record yields short or empty fields instead of a
    /// panic.
    pub fn range(&self, total: usize) -> Range<usize> {
        match *self {
            Span::At { start, len } => {
                let s = start.min(total);
                s..start.saturating_add(len).min(total)
            }
            Span::From { start } => start.min(total)..total,
            Span::Last { len } => total.saturating_sub(len)..total,
            Span::Between { start, trailing } => {
                let s = start.min(total);
                s..total.saturating_sub(trailing).max(s)
            }
        }
    }
}

/// What a field holds once decoded. Flags are canonicalized while slicing:
/// `Y` stays `Y`, anything else becomes `N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Date,
    Flag,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub span: Span,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub const fn new(name: &'static str, start: usize, len: usize, kind: FieldKind) -> Self {
        Self {
            name,
            span: Span::At { start, len },
            kind,
        }
    }

    pub const fn text(name: &'static str, start: usize, len: usize) -> Self {
        Self::new(name, start, len, FieldKind::Text)
    }

    pub const fn spanning(name: &'static str, span: Span) -> Self {
        Self {
            name,
            span,
            kind: FieldKind::Text,
        }
    }
}

/// A sub-range of the record whose fields are offset relative to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub span: Span,
    pub fields: Vec<FieldSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub name: &'static str,
    pub format: RecordFormat,
    /// Records shorter than this fail with [`RecordError::Truncated`].
    pub min_len: usize,
    pub segments: Vec<Segment>,
}

const AFFIRMATIVE: &str = "Y";

fn finish(kind: FieldKind, value: String) -> String {
    match kind {
        FieldKind::Flag if value == AFFIRMATIVE => AFFIRMATIVE.to_string(),
        FieldKind::Flag => "N".to_string(),
        _ => value,
    }
}

impl Layout {
    pub fn record_size(&self) -> Option<usize> {
        match self.format {
            RecordFormat::Fixed { record_size } => Some(record_size),
            RecordFormat::Lines => None,
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.segments.iter().flat_map(|s| s.fields.iter())
    }

    fn check_len(&self, actual: usize) -> Result<(), RecordError> {
        if actual < self.min_len {
            return Err(RecordError::Truncated {
                needed: self.min_len,
                actual,
            });
        }
        Ok(())
    }

    /// Slice one binary record at byte offsets, decoding every field.
    pub fn slice_bytes(&self, record: &[u8], decoder: &Decoder) -> Result<RawRecord, RecordError> {
        self.check_len(record.len())?;
        let mut raw = RawRecord::default();
        for segment in &self.segments {
            let seg = &record[segment.span.range(record.len())];
            for field in &segment.fields {
                let value = decoder.field(&seg[field.span.range(seg.len())]);
                raw.insert(field.name, finish(field.kind, value));
            }
        }
        Ok(raw)
    }

    /// Slice one decoded text line at character offsets.
    pub fn slice_line(&self, line: &str) -> Result<RawRecord, RecordError> {
        let chars: Vec<char> = line.chars().collect();
        self.check_len(chars.len())?;
        let mut raw = RawRecord::default();
        for segment in &self.segments {
            let seg = &chars[segment.span.range(chars.len())];
            for field in &segment.fields {
                let value: String = seg[field.span.range(seg.len())].iter().collect();
                raw.insert(field.name, finish(field.kind, value.trim().to_string()));
            }
        }
        Ok(raw)
    }
}
