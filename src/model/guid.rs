//! IFC GlobalId encoding: a 128-bit UUID compressed into 22 characters of a
//! 64-symbol alphabet.

const ALPHABET: &[u8; 64] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz_$";

pub const GLOBAL_ID_LEN: usize = 22;

/// Generates a fresh random GlobalId.
#[must_use]
pub fn new_global_id() -> String {
    compress(uuid::Uuid::new_v4().as_u128())
}

/// Compresses a 128-bit value: 2 bits in the first character, 6 in each of
/// the remaining 21.
#[must_use]
pub fn compress(value: u128) -> String {
    let mut out = String::with_capacity(GLOBAL_ID_LEN);
    out.push(char::from(ALPHABET[((value >> 126) & 0x3) as usize]));
    for i in 0..21 {
        let shift = 120 - 6 * i;
        out.push(char::from(ALPHABET[((value >> shift) & 0x3F) as usize]));
    }
    out
}

#[must_use]
pub fn is_valid_global_id(candidate: &str) -> bool {
    let bytes = candidate.as_bytes();
    bytes.len() == GLOBAL_ID_LEN
        && matches!(bytes[0], b'0'..=b'3')
        && bytes.iter().all(|b| ALPHABET.contains(b))
}
