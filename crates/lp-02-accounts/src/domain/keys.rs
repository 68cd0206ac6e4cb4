//! Storage layout of ledger records.
//!
//! ```text
//! 0x20 | account id      → TLV account record
//! 0x21 | label (UTF-8)   → account id
//! 0x22 | payment hash    → account id of the invoice owner
//! ```

use shared_types::{AccountId, Hash};

pub const ACCOUNT_PREFIX: u8 = 0x20;
pub const LABEL_INDEX_PREFIX: u8 = 0x21;
pub const INVOICE_OWNER_PREFIX: u8 = 0x22;

fn prefixed(prefix: u8, body: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + body.len());
    key.push(prefix);
    key.extend_from_slice(body);
    key
}

pub fn account_key(id: &AccountId) -> Vec<u8> {
    prefixed(ACCOUNT_PREFIX, id.as_bytes())
}

pub fn label_key(label: &str) -> Vec<u8> {
    prefixed(LABEL_INDEX_PREFIX, label.as_bytes())
}

pub fn invoice_owner_key(hash: &Hash) -> Vec<u8> {
    prefixed(INVOICE_OWNER_PREFIX, hash)
}
