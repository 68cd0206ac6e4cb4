//! # Numeric Codec
//!
//! Converts between `u64` and a fixed-width decimal string so integers can
//! be pseudonymized by the same string-keyed mapper as hashes and keys.
//!
//! The width is 20 characters (`u64::MAX` has 20 digits), zero-padded. The
//! fixed width keeps numeric pseudonyms visually distinct from hex
//! pseudonyms, which have other lengths.

use thiserror::Error;

/// Width of an encoded integer.
pub const ENCODED_U64_WIDTH: usize = 20;

/// Decode failures. All of them are validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("Encoded integer must be {expected} characters, got {actual}")]
    InvalidWidth { expected: usize, actual: usize },

    #[error("Non-decimal character {found:?} at position {position}")]
    InvalidCharacter { position: usize, found: char },

    #[error("Encoded integer overflows u64")]
    Overflow,
}

/// Encode an integer as a 20-digit zero-padded decimal string.
pub fn encode_u64(value: u64) -> String {
    format!("{:0width$}", value, width = ENCODED_U64_WIDTH)
}

/// Decode a string produced by [`encode_u64`].
pub fn decode_u64(encoded: &str) -> Result<u64, CodecError> {
    // count chars, not bytes, so multi-byte input reports a sane width
    let width = encoded.chars().count();
    if width != ENCODED_U64_WIDTH || encoded.len() != ENCODED_U64_WIDTH {
        return Err(CodecError::InvalidWidth {
            expected: ENCODED_U64_WIDTH,
            actual: width,
        });
    }

    let mut value: u64 = 0;
    for (position, found) in encoded.chars().enumerate() {
        let digit = found
            .to_digit(10)
            .ok_or(CodecError::InvalidCharacter { position, found })?;
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add(u64::from(digit)))
            .ok_or(CodecError::Overflow)?;
    }
    Ok(value)
}

/// Whether `s` has the shape of an encoded integer.
pub fn is_encoded_u64(s: &str) -> bool {
    decode_u64(s).is_ok()
}
