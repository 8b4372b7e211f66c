// src/parse/mod.rs

pub mod equity;
pub mod member;
pub mod sector;
pub mod theme;
pub mod warrant;

pub use equity::EquityParser;
pub use member::MemberParser;
pub use sector::SectorParser;
pub use theme::ThemeParser;
pub use warrant::WarrantParser;

use std::{collections::BTreeMap, fs, path::Path};
use tracing::{debug, info, instrument, warn};

use crate::archive;
use crate::config::Config;
use crate::decode::Decoder;
use crate::error::{ParseError, RecordError};
use crate::layout::{Layout, RecordFormat};
use crate::table::TableRow;

/// Decoded field values of one physical record, keyed by layout field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    fields: BTreeMap<&'static str, String>,
}

impl RawRecord {
    pub fn insert(&mut self, name: &'static str, value: impl Into<String>) {
        self.fields.insert(name, value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// The value of `name`, or `""` when the layout has no such field.
    pub fn text(&self, name: &str) -> &str {
        self.get(name).unwrap_or_default()
    }

    pub fn non_blank(&self, name: &str) -> Option<String> {
        crate::normalize::non_blank(self.text(name))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.fields.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

/// Settings every parser reads records with.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    pub decoder: Decoder,
    pub progress_every: usize,
    pub extensions: Vec<String>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ParseOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            decoder: Decoder::new(config.encoding()),
            progress_every: config.progress_every,
            extensions: config.master_extensions.clone(),
        }
    }

    pub fn extensions(&self) -> Vec<&str> {
        self.extensions.iter().map(String::as_str).collect()
    }
}

/// Shared contract of the category parsers: slice a master file into raw
/// records, then turn them into typed, deduplicated rows.
pub trait MasterParser {
    type Record: TableRow;

    /// Source label used in logs.
    fn label(&self) -> &str;
    fn layout(&self) -> &'static Layout;
    fn options(&self) -> &ParseOptions;

    /// Validity gate. May fill in derived raw fields.
    fn accept(&self, raw: RawRecord) -> Result<RawRecord, RecordError>;

    /// Typed rows, deduplicated on the natural key. Empty in, empty out.
    fn transform(&self, raw: &[RawRecord]) -> Vec<Self::Record>;

    fn parse(&self, path: &Path) -> Result<Vec<RawRecord>, ParseError> {
        read_records(self, path)
    }
}

/// Split text into lines, each keeping its `\n`. CRLF becomes LF; a last line
/// without terminator is kept at its raw width, since end-anchored fields
/// count from the true end of the line.
pub fn split_lines(bytes: &[u8]) -> Vec<Vec<u8>> {
    bytes
        .split_inclusive(|b| *b == b'\n')
        .map(|chunk| match chunk.strip_suffix(b"\r\n") {
            Some(body) => {
                let mut line = Vec::with_capacity(body.len() + 1);
                line.extend_from_slice(body);
                line.push(b'\n');
                line
            }
            None => chunk.to_vec(),
        })
        .collect()
}

/// Common reading path: resolve the archive, load the file, slice every
/// record and run it through the parser's gate. Failing records are logged and
/// skipped; failing files are errors.
#[instrument(level = "info", skip(parser, path), fields(label = %parser.label(), file = %path.display()))]
pub fn read_records<P: MasterParser + ?Sized>(
    parser: &P,
    path: &Path,
) -> Result<Vec<RawRecord>, ParseError> {
    if !path.exists() {
        return Err(ParseError::Missing(path.to_path_buf()));
    }
    let opts = parser.options();
    let master = archive::resolve(path, &opts.extensions())?;
    let bytes = fs::read(&master).map_err(|source| ParseError::Read {
        path: master.clone(),
        source,
    })?;

    let layout = parser.layout();
    let sliced: Vec<Result<RawRecord, RecordError>> = match layout.format {
        RecordFormat::Fixed { record_size } => {
            if bytes.len() < record_size {
                return Err(ParseError::TooShort {
                    path: master,
                    bytes: bytes.len(),
                    record_size,
                });
            }
            let remainder = bytes.len() % record_size;
            if remainder != 0 {
                warn!(remainder, record_size, "trailing partial record ignored");
            }
            bytes
                .chunks_exact(record_size)
                .map(|rec| layout.slice_bytes(rec, &opts.decoder))
                .collect()
        }
        RecordFormat::Lines => {
            let lines = split_lines(&bytes);
            if lines.is_empty() {
                return Err(ParseError::Empty(master));
            }
            lines
                .iter()
                .map(|line| layout.slice_line(&opts.decoder.line(line)))
                .collect()
        }
    };

    let total = sliced.len();
    info!(total, layout = layout.name, "parsing master file");

    let mut records = Vec::with_capacity(total);
    let mut skipped = 0usize;
    for (i, result) in sliced.into_iter().enumerate() {
        match result.and_then(|raw| parser.accept(raw)) {
            Ok(raw) => records.push(raw),
            Err(e) => {
                skipped += 1;
                debug!(record = i + 1, error = %e, "skipping record");
            }
        }
        let done = i + 1;
        if (opts.progress_every > 0 && done % opts.progress_every == 0) || done == total {
            info!("  {}/{} records parsed", done, total);
        }
    }

    info!(parsed = records.len(), skipped, "master file parsed");
    Ok(records)
}

/// Gate shared by every category: a non-blank code and display name.
pub(crate) fn require_code_and_name(
    raw: &RawRecord,
    code_field: &str,
    name_field: &str,
) -> Result<(), RecordError> {
    let code = raw.text(code_field);
    if code.is_empty() {
        return Err(RecordError::MissingCode);
    }
    if raw.text(name_field).is_empty() {
        return Err(RecordError::MissingName {
            code: code.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    pub(crate) fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,mstload::parse=debug")),
            )
            .with_test_writer()
            .finish();
        // already set by an earlier test
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    /// CP949 bytes of `s`.
    pub(crate) fn cp949(s: &str) -> Vec<u8> {
        encoding_rs::EUC_KR.encode(s).0.into_owned()
    }

    /// `s` as CP949, right-padded with spaces to `width` bytes.
    pub(crate) fn padded(s: &str, width: usize) -> Vec<u8> {
        let mut b = cp949(s);
        assert!(b.len() <= width, "{s:?} wider than {width}");
        b.resize(width, b' ');
        b
    }

    #[test]
    fn lines_are_normalized() {
        let lines = split_lines(b"a\r\nb\n\nc");
        assert_eq!(
            lines,
            vec![b"a\n".to_vec(), b"b\n".to_vec(), b"\n".to_vec(), b"c".to_vec()]
        );
        // a trailing CR without LF is data, not a terminator
        assert_eq!(split_lines(b"x\r"), vec![b"x\r".to_vec()]);
        assert!(split_lines(b"").is_empty());
    }

    #[test]
    fn raw_record_accessors() {
        let mut raw = RawRecord::default();
        raw.insert("code", "A1");
        raw.insert("name", "");
        assert_eq!(raw.get("code"), Some("A1"));
        assert_eq!(raw.text("missing"), "");
        assert_eq!(raw.non_blank("name"), None);
        assert_eq!(raw.len(), 2);
        assert_eq!(raw.iter().next(), Some(("code", "A1")));

        assert_eq!(
            require_code_and_name(&raw, "code", "name"),
            Err(RecordError::MissingName { code: "A1".into() })
        );
        assert_eq!(
            require_code_and_name(&raw, "name", "code"),
            Err(RecordError::MissingCode)
        );
    }
}
