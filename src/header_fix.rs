//! Normalizes FILE_NAME / FILE_DESCRIPTION text through Windows-1251 and
//! stamps the encoding marker into both records.

use crate::config::HEADER_ENCODING_MARKER;
use crate::error::HeaderError;
use crate::model::Header;
use crate::parser::StepValue;
use encoding_rs::WINDOWS_1251;

const FILE_NAME: &str = "FILE_NAME";
const FILE_NAME_MARKER_SLOT: usize = 6;
const FILE_DESCRIPTION: &str = "FILE_DESCRIPTION";
const FILE_DESCRIPTION_MARKER_SLOT: usize = 1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeaderFix {
    /// Characters replaced by `?` because CP1251 cannot represent them.
    pub substituted: usize,
}

/// Round-trips a string through CP1251; unmappable characters become `?`.
#[must_use]
pub fn roundtrip_cp1251(text: &str) -> (String, usize) {
    let mut bytes = Vec::with_capacity(text.len());
    let mut substituted = 0;
    let mut buf = [0u8; 4];

    for ch in text.chars() {
        let (encoded, _, unmappable) = WINDOWS_1251.encode(ch.encode_utf8(&mut buf));
        if unmappable {
            bytes.push(b'?');
            substituted += 1;
        } else {
            bytes.extend_from_slice(&encoded);
        }
    }

    let decoded = WINDOWS_1251.decode_without_bom_handling(&bytes).0;
    (decoded.into_owned(), substituted)
}

/// Re-encodes the string members of FILE_NAME and FILE_DESCRIPTION and
/// writes `CP1251` at FILE_NAME slot 6 and FILE_DESCRIPTION slot 1. Short
/// records are padded with the marker itself.
///
/// # Errors
///
/// Returns [`HeaderError::MissingRecord`] if either record is absent; the
/// header is left untouched in that case.
pub fn fix_header(header: &mut Header) -> Result<HeaderFix, HeaderError> {
    for keyword in [FILE_NAME, FILE_DESCRIPTION] {
        if header.get(keyword).is_none() {
            return Err(HeaderError::MissingRecord(keyword));
        }
    }

    let mut fix = HeaderFix::default();
    for (keyword, slot) in [
        (FILE_NAME, FILE_NAME_MARKER_SLOT),
        (FILE_DESCRIPTION, FILE_DESCRIPTION_MARKER_SLOT),
    ] {
        let Some(record) = header.get_mut(keyword) else {
            continue;
        };

        let mut values: Vec<StepValue> = record
            .values()
            .iter()
            .map(|value| match value {
                StepValue::String(text) => {
                    let (text, substituted) = roundtrip_cp1251(text);
                    fix.substituted += substituted;
                    StepValue::String(text)
                }
                other => other.clone(),
            })
            .collect();

        if values.len() <= slot {
            values.resize(slot + 1, StepValue::String(HEADER_ENCODING_MARKER.to_string()));
        }
        values[slot] = StepValue::String(HEADER_ENCODING_MARKER.to_string());
        record.set_values(values);
    }

    Ok(fix)
}
