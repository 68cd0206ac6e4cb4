//! # Account Record Codec
//!
//! Accounts are persisted as a TLV stream. Types, lengths and counts are
//! BigSize varints; fixed-width integers are big-endian.
//!
//! | Type | Field | Value |
//! |------|-------|-------|
//! | 1 | id | 8 bytes |
//! | 2 | account type | u8 |
//! | 3 | initial balance | u64 |
//! | 4 | current balance | i64 as u64 |
//! | 5 | last update | u64 |
//! | 6 | expiration | u64, only when set |
//! | 7 | invoices | count, then 32-byte hashes |
//! | 8 | payments | count, then {hash, status u8, full amount u64} |
//! | 9 | label | UTF-8, only when set |
//!
//! Records appear in strictly increasing type order. Sets and maps are
//! written in ascending key order, so encoding is deterministic. A missing
//! record 6 decodes as "never expires". Unknown odd types are skipped;
//! unknown even types are rejected.

use super::entities::{AccountType, OffChainBalanceAccount, PaymentEntry, PaymentStatus};
use shared_types::{AccountId, Hash, ACCOUNT_ID_LEN};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

const TYPE_ID: u64 = 1;
const TYPE_ACCOUNT_TYPE: u64 = 2;
const TYPE_INITIAL_BALANCE: u64 = 3;
const TYPE_CURRENT_BALANCE: u64 = 4;
const TYPE_LAST_UPDATE: u64 = 5;
const TYPE_EXPIRATION: u64 = 6;
const TYPE_INVOICES: u64 = 7;
const TYPE_PAYMENTS: u64 = 8;
const TYPE_LABEL: u64 = 9;

const HASH_LEN: usize = 32;
const PAYMENT_ENTRY_LEN: usize = HASH_LEN + 1 + 8;

/// Account record decoding errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TlvError {
    #[error("Unexpected end of stream")]
    UnexpectedEof,

    #[error("Non-canonical BigSize encoding")]
    NonCanonicalVarint,

    #[error("Record type {current} follows {previous}: types must increase")]
    OutOfOrder { previous: u64, current: u64 },

    #[error("Unknown required record type {0}")]
    UnknownEvenType(u64),

    #[error("Record {record}: expected {expected} bytes, got {actual}")]
    InvalidLength {
        record: u64,
        expected: usize,
        actual: usize,
    },

    #[error("Record {record}: {message}")]
    InvalidValue { record: u64, message: String },

    #[error("Missing record {0}")]
    MissingRecord(u64),
}

// =============================================================================
// BigSize
// =============================================================================

pub fn write_bigsize(out: &mut Vec<u8>, value: u64) {
    match value {
        0..=0xfc => out.push(value as u8),
        0xfd..=0xffff => {
            out.push(0xfd);
            out.extend_from_slice(&(value as u16).to_be_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            out.push(0xfe);
            out.extend_from_slice(&(value as u32).to_be_bytes());
        }
        _ => {
            out.push(0xff);
            out.extend_from_slice(&value.to_be_bytes());
        }
    }
}

/// Byte cursor over an encoded stream.
struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], TlvError> {
        if self.buf.len() < n {
            return Err(TlvError::UnexpectedEof);
        }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], TlvError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn bigsize(&mut self) -> Result<u64, TlvError> {
        let first = self.take_array::<1>()?[0];
        match first {
            0xfd => {
                let v = u64::from(u16::from_be_bytes(self.take_array()?));
                if v < 0xfd {
                    return Err(TlvError::NonCanonicalVarint);
                }
                Ok(v)
            }
            0xfe => {
                let v = u64::from(u32::from_be_bytes(self.take_array()?));
                if v <= 0xffff {
                    return Err(TlvError::NonCanonicalVarint);
                }
                Ok(v)
            }
            0xff => {
                let v = u64::from_be_bytes(self.take_array()?);
                if v <= 0xffff_ffff {
                    return Err(TlvError::NonCanonicalVarint);
                }
                Ok(v)
            }
            small => Ok(u64::from(small)),
        }
    }
}

// =============================================================================
// Encoding
// =============================================================================

fn write_record(out: &mut Vec<u8>, record: u64, value: &[u8]) {
    write_bigsize(out, record);
    write_bigsize(out, value.len() as u64);
    out.extend_from_slice(value);
}

/// Serialize an account into its TLV record.
pub fn encode_account(account: &OffChainBalanceAccount) -> Vec<u8> {
    let mut out = Vec::with_capacity(128 + account.payments.len() * PAYMENT_ENTRY_LEN);

    write_record(&mut out, TYPE_ID, account.id.as_bytes());
    write_record(&mut out, TYPE_ACCOUNT_TYPE, &[account.account_type as u8]);
    write_record(
        &mut out,
        TYPE_INITIAL_BALANCE,
        &account.initial_balance.to_be_bytes(),
    );
    write_record(
        &mut out,
        TYPE_CURRENT_BALANCE,
        &(account.current_balance as u64).to_be_bytes(),
    );
    write_record(&mut out, TYPE_LAST_UPDATE, &account.last_update.to_be_bytes());
    if let Some(expiration) = account.expiration {
        write_record(&mut out, TYPE_EXPIRATION, &expiration.to_be_bytes());
    }

    let mut invoices = Vec::with_capacity(9 + account.invoices.len() * HASH_LEN);
    write_bigsize(&mut invoices, account.invoices.len() as u64);
    for hash in &account.invoices {
        invoices.extend_from_slice(hash);
    }
    write_record(&mut out, TYPE_INVOICES, &invoices);

    let mut payments = Vec::with_capacity(9 + account.payments.len() * PAYMENT_ENTRY_LEN);
    write_bigsize(&mut payments, account.payments.len() as u64);
    for (hash, entry) in &account.payments {
        payments.extend_from_slice(hash);
        payments.push(entry.status as u8);
        payments.extend_from_slice(&entry.full_amount.to_be_bytes());
    }
    write_record(&mut out, TYPE_PAYMENTS, &payments);

    if let Some(label) = account.label.as_deref().filter(|l| !l.is_empty()) {
        write_record(&mut out, TYPE_LABEL, label.as_bytes());
    }

    out
}

// =============================================================================
// Decoding
// =============================================================================

fn fixed<const N: usize>(record: u64, value: &[u8]) -> Result<[u8; N], TlvError> {
    value.try_into().map_err(|_| TlvError::InvalidLength {
        record,
        expected: N,
        actual: value.len(),
    })
}

fn decode_u64(record: u64, value: &[u8]) -> Result<u64, TlvError> {
    Ok(u64::from_be_bytes(fixed::<8>(record, value)?))
}

/// Count-prefixed list of fixed-size items. The value must hold exactly
/// `count` items.
fn counted_items(record: u64, value: &[u8], item_len: usize) -> Result<Vec<&[u8]>, TlvError> {
    let mut reader = Reader::new(value);
    let count = reader.bigsize()?;
    let expected = usize::try_from(count)
        .ok()
        .and_then(|c| c.checked_mul(item_len))
        .ok_or(TlvError::InvalidValue {
            record,
            message: format!("item count {count} too large"),
        })?;
    if reader.buf.len() != expected {
        return Err(TlvError::InvalidLength {
            record,
            expected,
            actual: reader.buf.len(),
        });
    }
    Ok(reader.buf.chunks_exact(item_len).collect())
}

fn decode_invoices(value: &[u8]) -> Result<BTreeSet<Hash>, TlvError> {
    counted_items(TYPE_INVOICES, value, HASH_LEN)?
        .into_iter()
        .map(|chunk| fixed::<HASH_LEN>(TYPE_INVOICES, chunk))
        .collect()
}

fn decode_payments(value: &[u8]) -> Result<BTreeMap<Hash, PaymentEntry>, TlvError> {
    let mut payments = BTreeMap::new();
    for chunk in counted_items(TYPE_PAYMENTS, value, PAYMENT_ENTRY_LEN)? {
        let mut reader = Reader::new(chunk);
        let hash: Hash = reader.take_array()?;
        let code = reader.take_array::<1>()?[0];
        let status = PaymentStatus::from_u8(code).ok_or(TlvError::InvalidValue {
            record: TYPE_PAYMENTS,
            message: format!("unknown payment status {code}"),
        })?;
        let full_amount = u64::from_be_bytes(reader.take_array()?);
        payments.insert(
            hash,
            PaymentEntry {
                status,
                full_amount,
            },
        );
    }
    Ok(payments)
}

/// Deserialize an account from its TLV record.
pub fn decode_account(bytes: &[u8]) -> Result<OffChainBalanceAccount, TlvError> {
    let mut reader = Reader::new(bytes);
    let mut previous: Option<u64> = None;

    let mut id = None;
    let mut account_type = None;
    let mut initial_balance = None;
    let mut current_balance = None;
    let mut last_update = None;
    let mut expiration = None;
    let mut invoices = BTreeSet::new();
    let mut payments = BTreeMap::new();
    let mut label = None;

    while !reader.is_empty() {
        let record = reader.bigsize()?;
        if let Some(prev) = previous {
            if record <= prev {
                return Err(TlvError::OutOfOrder {
                    previous: prev,
                    current: record,
                });
            }
        }
        previous = Some(record);

        let len = usize::try_from(reader.bigsize()?).map_err(|_| TlvError::UnexpectedEof)?;
        let value = reader.take(len)?;

        match record {
            TYPE_ID => {
                id = Some(AccountId(fixed::<ACCOUNT_ID_LEN>(record, value)?));
            }
            TYPE_ACCOUNT_TYPE => {
                let code = fixed::<1>(record, value)?[0];
                account_type =
                    Some(AccountType::from_u8(code).ok_or(TlvError::InvalidValue {
                        record,
                        message: format!("unknown account type {code}"),
                    })?);
            }
            TYPE_INITIAL_BALANCE => initial_balance = Some(decode_u64(record, value)?),
            TYPE_CURRENT_BALANCE => current_balance = Some(decode_u64(record, value)? as i64),
            TYPE_LAST_UPDATE => last_update = Some(decode_u64(record, value)?),
            // zero and absence both mean never expires
            TYPE_EXPIRATION => expiration = Some(decode_u64(record, value)?).filter(|ts| *ts != 0),
            TYPE_INVOICES => invoices = decode_invoices(value)?,
            TYPE_PAYMENTS => payments = decode_payments(value)?,
            TYPE_LABEL => {
                let text = std::str::from_utf8(value).map_err(|e| TlvError::InvalidValue {
                    record,
                    message: e.to_string(),
                })?;
                label = Some(text.to_string());
            }
            unknown if unknown % 2 == 1 => {}
            unknown => return Err(TlvError::UnknownEvenType(unknown)),
        }
    }

    Ok(OffChainBalanceAccount {
        id: id.ok_or(TlvError::MissingRecord(TYPE_ID))?,
        account_type: account_type.ok_or(TlvError::MissingRecord(TYPE_ACCOUNT_TYPE))?,
        label,
        initial_balance: initial_balance.ok_or(TlvError::MissingRecord(TYPE_INITIAL_BALANCE))?,
        current_balance: current_balance.ok_or(TlvError::MissingRecord(TYPE_CURRENT_BALANCE))?,
        expiration,
        last_update: last_update.ok_or(TlvError::MissingRecord(TYPE_LAST_UPDATE))?,
        invoices,
        payments,
    })
}
