// src/decode.rs

use encoding_rs::Encoding;
use tracing::trace;

/// Which link of the fallback chain produced a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStep {
    /// Strict decode with the vendor code page.
    Primary,
    /// UTF-8 with invalid bytes replaced by U+FFFD.
    Utf8Lossy,
    /// Nothing readable survived; lowercase hex of the raw bytes.
    Hex,
}

/// Bytes → text with the fallback chain: primary code page, lossy UTF-8, hex.
/// Every step is total, so decoding never fails a record.
#[derive(Debug, Clone, Copy)]
pub struct Decoder {
    encoding: &'static Encoding,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new(encoding_rs::EUC_KR)
    }
}

impl Decoder {
    pub fn new(encoding: &'static Encoding) -> Self {
        Self { encoding }
    }

    /// Decode a fixed-width field, stripping surrounding whitespace.
    pub fn field(&self, bytes: &[u8]) -> String {
        self.decode(bytes, true).0
    }

    /// Decode a whole text line, keeping its padding intact so character
    /// offsets still line up.
    pub fn line(&self, bytes: &[u8]) -> String {
        self.decode(bytes, false).0
    }

    pub fn decode(&self, bytes: &[u8], trim: bool) -> (String, DecodeStep) {
        let finish = |s: &str| {
            if trim {
                s.trim().to_string()
            } else {
                s.to_string()
            }
        };

        if let Some(text) = self
            .encoding
            .decode_without_bom_handling_and_without_replacement(bytes)
        {
            return (finish(&text), DecodeStep::Primary);
        }

        let lossy = String::from_utf8_lossy(bytes);
        if lossy.chars().any(|c| c != char::REPLACEMENT_CHARACTER) {
            trace!(len = bytes.len(), "primary decode failed, using lossy UTF-8");
            return (finish(&lossy), DecodeStep::Utf8Lossy);
        }

        trace!(len = bytes.len(), "undecodable bytes, keeping hex");
        (hex::encode(bytes), DecodeStep::Hex)
    }
}

/// Convenience wrapper over [`Decoder::field`].
pub fn decode(bytes: &[u8], encoding: &'static Encoding) -> String {
    Decoder::new(encoding).field(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cp949(s: &str) -> Vec<u8> {
        encoding_rs::EUC_KR.encode(s).0.into_owned()
    }

    #[test]
    fn decodes_and_trims_vendor_code_page() {
        let mut bytes = cp949("삼성전자");
        bytes.extend_from_slice(b"      ");
        let (text, step) = Decoder::default().decode(&bytes, true);
        assert_eq!(text, "삼성전자");
        assert_eq!(step, DecodeStep::Primary);
    }

    #[test]
    fn line_decoding_keeps_padding() {
        let d = Decoder::default();
        assert_eq!(d.line(b"  001 name   \n"), "  001 name   \n");
        assert_eq!(d.field(b"  001 name   \n"), "001 name");
    }

    #[test]
    fn invalid_primary_bytes_fall_back_to_lossy_utf8() {
        let (text, step) = Decoder::default().decode(&[0xFF, b'A', b'B'], true);
        assert_eq!(step, DecodeStep::Utf8Lossy);
        assert!(text.ends_with("AB"));
    }

    #[test]
    fn pure_garbage_becomes_hex() {
        // a lone CP949 lead byte and an invalid byte
        let (text, step) = Decoder::default().decode(&[0xBB, 0xFF], true);
        assert_eq!(step, DecodeStep::Hex);
        assert_eq!(text, "bbff");
    }

    #[test]
    fn never_panics_on_arbitrary_bytes() {
        let d = Decoder::default();
        for seed in 0u8..=255 {
            let bytes: Vec<u8> = (0..17u8).map(|i| seed.wrapping_mul(31).wrapping_add(i * 7)).collect();
            let _ = d.field(&bytes);
            let _ = d.line(&bytes);
        }
        assert_eq!(decode(b"", encoding_rs::EUC_KR), "");
    }
}
