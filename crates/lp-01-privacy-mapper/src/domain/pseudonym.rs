//! Pseudonym generation.
//!
//! A pseudonym keeps the shape of the real value it replaces, so a rewritten
//! payload is still well-formed for the client that parses it:
//!
//! | Real value | Pseudonym |
//! |------------|-----------|
//! | 20-digit encoded `u64` | random `u64`, same encoding |
//! | 66-hex `02`/`03` compressed public key | random valid secp256k1 key |
//! | even-length hex string | random hex, same length |
//! | anything else | random alphanumerics, same length |
//!
//! Randomness comes from the operating system CSPRNG.

use super::codec::{encode_u64, is_encoded_u64};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::SecretKey;
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::{Rng, RngCore};

/// Shape class of a real value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PseudonymShape {
    /// Output of the numeric codec.
    Numeric,
    /// SEC1 compressed secp256k1 point (node keys).
    PublicKey,
    /// Hex string with an even number of digits (hashes).
    Hex { len: usize },
    /// Free-form text.
    Text { len: usize },
}

impl PseudonymShape {
    /// Classify a real value.
    pub fn of(real: &str) -> Self {
        if is_encoded_u64(real) {
            return Self::Numeric;
        }
        if is_compressed_key(real) {
            return Self::PublicKey;
        }
        let len = real.chars().count();
        if real.len() % 2 == 0 && real.bytes().all(|b| b.is_ascii_hexdigit()) {
            Self::Hex { len: real.len() }
        } else {
            Self::Text { len }
        }
    }

    /// Draw a fresh candidate of this shape.
    pub fn generate(self) -> String {
        match self {
            Self::Numeric => encode_u64(OsRng.next_u64()),
            Self::PublicKey => {
                let point = SecretKey::random(&mut OsRng)
                    .public_key()
                    .to_encoded_point(true);
                hex::encode(point.as_bytes())
            }
            Self::Hex { len } => {
                let mut bytes = vec![0u8; len / 2];
                OsRng.fill_bytes(&mut bytes);
                hex::encode(bytes)
            }
            Self::Text { len } => OsRng
                .sample_iter(&Alphanumeric)
                .take(len)
                .map(char::from)
                .collect(),
        }
    }
}

const COMPRESSED_KEY_HEX_LEN: usize = 66;

fn is_compressed_key(value: &str) -> bool {
    value.len() == COMPRESSED_KEY_HEX_LEN
        && (value.starts_with("02") || value.starts_with("03"))
        && value.bytes().all(|b| b.is_ascii_hexdigit())
}
