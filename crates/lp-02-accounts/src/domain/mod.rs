//! # Domain Layer - Account Ledger
//!
//! ## Components
//!
//! - `entities`: accounts, payment entries, updates and reservation outcomes
//! - `tlv`: persisted account record codec
//! - `keys`: storage layout
//! - `errors`: `AccountError`

pub mod entities;
pub mod errors;
pub mod keys;
pub mod tlv;

pub use entities::{
    AccountRef, AccountType, AccountUpdate, Credential, DeclineReason, Expiry,
    OffChainBalanceAccount, PaymentEntry, PaymentStatus, ReserveOutcome,
};
pub use errors::AccountError;
pub use tlv::{decode_account, encode_account, TlvError};
