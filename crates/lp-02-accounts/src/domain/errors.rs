//! Account ledger error types.

use super::tlv::TlvError;
use shared_types::{AccountId, ErrorKind, StoreError};
use thiserror::Error;

/// Account ledger error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountError {
    /// Input rejected before touching the store.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A non-empty label is already taken.
    #[error("Label {0:?} is already in use")]
    DuplicateLabel(String),

    /// The reference resolves to no account.
    #[error("Account not found: {0}")]
    NotFound(String),

    /// The account still has reservations that are neither settled nor
    /// failed.
    #[error("Account {account} has {count} payments in flight")]
    PaymentsInFlight { account: AccountId, count: usize },

    /// A non-failed payment with this hash is already charged.
    #[error("Payment {hash} is already tracked by account {account}")]
    DuplicatePayment { account: AccountId, hash: String },

    /// Settle or fail for a payment the account never reserved.
    #[error("Payment {hash} is not tracked by account {account}")]
    UnknownPayment { account: AccountId, hash: String },

    /// The invoice is already owned by another account.
    #[error("Invoice {hash} already belongs to account {owner}")]
    InvoiceOwned { hash: String, owner: AccountId },

    /// The balance would leave the representable range.
    #[error("Balance overflow on account {0}")]
    BalanceOverflow(AccountId),

    /// Stored account record could not be decoded.
    #[error("Corrupted account record: {0}")]
    Codec(#[from] TlvError),

    /// Minting the credential for a new account failed.
    #[error("Credential issuance failed: {0}")]
    Credential(String),

    /// Persistence layer failure.
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl AccountError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_)
            | Self::PaymentsInFlight { .. }
            | Self::DuplicatePayment { .. }
            | Self::InvoiceOwned { .. }
            | Self::BalanceOverflow(_) => ErrorKind::Validation,
            Self::DuplicateLabel(_) => ErrorKind::DuplicateLabel,
            Self::NotFound(_) | Self::UnknownPayment { .. } => ErrorKind::NotFound,
            Self::Codec(_) | Self::Credential(_) | Self::Storage(_) => ErrorKind::InternalStorage,
        }
    }
}
