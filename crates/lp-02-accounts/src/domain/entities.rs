//! Core domain entities for the account ledger.
//!
//! An account is a spending limit attached to one restricted credential.
//! Balances are in millisatoshi.
//!
//! Balance invariant, for any sequence of create, credit, reserve, settle,
//! fail and update:
//!
//! ```text
//! current_balance == initial_balance
//!                  + Σ credited invoices
//!                  − Σ full_amount of payments whose status != Failed
//! ```

use serde::{Deserialize, Serialize};
use shared_types::{AccountId, Hash, MilliSatoshi, Timestamp};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Kind of account. Only one exists today; it is still persisted so older
/// records stay readable if more are added.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum AccountType {
    /// Spending is limited by a balance set at creation.
    #[default]
    InitialBalance = 0,
}

impl AccountType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::InitialBalance),
            _ => None,
        }
    }
}

/// Payment status, using the node's numeric codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum PaymentStatus {
    Unknown = 0,
    InFlight = 1,
    Succeeded = 2,
    Failed = 3,
    Initiated = 4,
}

impl PaymentStatus {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Unknown),
            1 => Some(Self::InFlight),
            2 => Some(Self::Succeeded),
            3 => Some(Self::Failed),
            4 => Some(Self::Initiated),
            _ => None,
        }
    }

    /// Succeeded and Failed never change again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// One outgoing payment charged against an account.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaymentEntry {
    pub status: PaymentStatus,
    /// Amount reserved (or, once succeeded, actually spent) including fees.
    pub full_amount: MilliSatoshi,
}

/// Off-chain balance account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OffChainBalanceAccount {
    pub id: AccountId,
    pub account_type: AccountType,
    /// Unique among accounts when present. Never empty.
    pub label: Option<String>,
    pub initial_balance: MilliSatoshi,
    pub current_balance: i64,
    /// `None` means the account never expires.
    pub expiration: Option<Timestamp>,
    pub last_update: Timestamp,
    /// Invoices already credited to this account.
    pub invoices: BTreeSet<Hash>,
    pub payments: BTreeMap<Hash, PaymentEntry>,
}

impl OffChainBalanceAccount {
    pub fn new(
        id: AccountId,
        initial_balance: MilliSatoshi,
        current_balance: i64,
        expiration: Option<Timestamp>,
        label: Option<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            account_type: AccountType::InitialBalance,
            label,
            initial_balance,
            current_balance,
            expiration,
            last_update: now,
            invoices: BTreeSet::new(),
            payments: BTreeMap::new(),
        }
    }

    pub fn has_expired(&self, now: Timestamp) -> bool {
        matches!(self.expiration, Some(at) if now >= at)
    }

    /// Payments that are reserved but not yet settled or failed.
    pub fn pending_payments(&self) -> usize {
        self.payments
            .values()
            .filter(|entry| !entry.status.is_terminal())
            .count()
    }

    /// Σ full_amount over payments that still count against the balance.
    pub fn charged_amount(&self) -> u128 {
        self.payments
            .values()
            .filter(|entry| entry.status != PaymentStatus::Failed)
            .map(|entry| u128::from(entry.full_amount))
            .sum()
    }
}

/// New expiration requested by an update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Expiry {
    Never,
    At(Timestamp),
}

/// Administrative update. `None` fields are left unchanged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AccountUpdate {
    pub balance: Option<MilliSatoshi>,
    pub expiration: Option<Expiry>,
}

/// How a caller names an account: by id, or by label.
///
/// Labels never parse as ids, so parsing a reference is unambiguous.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AccountRef {
    Id(AccountId),
    Label(String),
}

impl AccountRef {
    /// Id when `s` parses as one, label otherwise.
    pub fn parse(s: &str) -> Self {
        match AccountId::from_str(s) {
            Ok(id) => Self::Id(id),
            Err(_) => Self::Label(s.to_string()),
        }
    }
}

impl From<AccountId> for AccountRef {
    fn from(id: AccountId) -> Self {
        Self::Id(id)
    }
}

impl fmt::Display for AccountRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id {id}"),
            Self::Label(label) => write!(f, "label {label:?}"),
        }
    }
}

/// Why a reservation was refused.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeclineReason {
    InsufficientBalance {
        required: MilliSatoshi,
        available: i64,
    },
    Expired {
        expired_at: Timestamp,
    },
}

impl fmt::Display for DeclineReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientBalance {
                required,
                available,
            } => write!(
                f,
                "insufficient balance: {required} msat required, {available} msat available"
            ),
            Self::Expired { expired_at } => write!(f, "account expired at {expired_at}"),
        }
    }
}

/// Result of `reserve_payment`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReserveOutcome {
    Reserved { remaining: i64 },
    Declined(DeclineReason),
}

impl ReserveOutcome {
    pub fn is_reserved(&self) -> bool {
        matches!(self, Self::Reserved { .. })
    }
}

/// Opaque credential minted for a new account.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(Vec<u8>);

impl Credential {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Secret material: only the length is printed.
        write!(f, "Credential({} bytes)", self.0.len())
    }
}
