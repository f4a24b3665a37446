use encoding_rs::WINDOWS_1251;
use serde::Serialize;
use std::borrow::Cow;
use tracing::warn;

/// Character encoding of the bytes a model was read from. Text we generate
/// is plain ASCII, so writing back in the same encoding reproduces every
/// untouched byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum SourceEncoding {
    #[default]
    Utf8,
    /// Legacy exports that put CP1251 bytes straight into string literals.
    Windows1251,
}

impl SourceEncoding {
    /// Decodes file bytes: UTF-8 when valid, CP1251 otherwise.
    #[must_use]
    pub fn decode(bytes: &[u8]) -> (Cow<'_, str>, Self) {
        if let Ok(text) = std::str::from_utf8(bytes) {
            return (Cow::Borrowed(text), SourceEncoding::Utf8);
        }

        let (text, had_errors) = WINDOWS_1251.decode_without_bom_handling(bytes);
        if had_errors {
            warn!("Model bytes are neither UTF-8 nor CP1251, some were replaced");
        }
        (text, SourceEncoding::Windows1251)
    }

    #[must_use]
    pub fn encode(self, text: &str) -> Cow<'_, [u8]> {
        match self {
            SourceEncoding::Utf8 => Cow::Borrowed(text.as_bytes()),
            SourceEncoding::Windows1251 => WINDOWS_1251.encode(text).0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // "Труба" in CP1251
    const PIPE_CP1251: &[u8] = &[0xD2, 0xF0, 0xF3, 0xE1, 0xE0];

    #[test]
    fn utf8_is_taken_as_is() {
        let (text, encoding) = SourceEncoding::decode("'Труба'".as_bytes());
        assert_eq!(text, "'Труба'");
        assert_eq!(encoding, SourceEncoding::Utf8);
    }

    #[test]
    fn legacy_bytes_decode_and_encode_back_unchanged() {
        let bytes = [b"'".as_slice(), PIPE_CP1251, b"'".as_slice()].concat();

        let (text, encoding) = SourceEncoding::decode(&bytes);

        assert_eq!(text, "'Труба'");
        assert_eq!(encoding, SourceEncoding::Windows1251);
        assert_eq!(encoding.encode(&text).into_owned(), bytes);
    }
}
