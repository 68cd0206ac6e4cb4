//! # Inbound Port - AccountLedgerApi
//!
//! Driving port used by the interceptor's account rule and the control
//! plane.
//!
//! | Method | Caller |
//! |--------|--------|
//! | `create`, `update`, `list`, `get`, `remove` | Control plane |
//! | `associate_invoice`, `reserve_payment`, `settle_payment`, `fail_payment` | Account rule |
//! | `credit_invoice_settled`, `invoice_settled` | Settlement events |

use crate::domain::{
    AccountError, AccountRef, AccountUpdate, Credential, OffChainBalanceAccount, ReserveOutcome,
};
use shared_types::{AccountId, Hash, MilliSatoshi, Timestamp};

/// Off-chain balance ledger.
///
/// Every mutation of one account is serialized with every other mutation of
/// the same account; distinct accounts never contend.
pub trait AccountLedgerApi: Send + Sync {
    /// Create an account and mint its credential.
    ///
    /// # Errors
    /// - `DuplicateLabel`: another account already uses `label`
    /// - `InvalidInput`: label parses as an account id, expiration in the
    ///   past, or balance beyond `i64::MAX`
    fn create(
        &self,
        initial_balance: MilliSatoshi,
        expiration: Option<Timestamp>,
        label: Option<&str>,
    ) -> Result<(OffChainBalanceAccount, Credential), AccountError>;

    /// Apply an administrative update.
    ///
    /// Setting a balance makes it the spendable balance once in-flight
    /// reservations resolve: the current balance becomes the new value minus
    /// what is still reserved, and the initial balance shifts by the same
    /// amount.
    ///
    /// # Errors
    /// - `InvalidInput`: the new balance is below what settled invoices
    ///   already credited net of settled spends, or the expiration is past
    fn update(
        &self,
        account: &AccountRef,
        update: AccountUpdate,
    ) -> Result<OffChainBalanceAccount, AccountError>;

    /// All accounts, ordered by id.
    fn list(&self) -> Result<Vec<OffChainBalanceAccount>, AccountError>;

    fn get(&self, account: &AccountRef) -> Result<OffChainBalanceAccount, AccountError>;

    /// Delete an account with its label and invoice ownership entries.
    ///
    /// # Errors
    /// - `PaymentsInFlight`: reservations are still outstanding
    fn remove(&self, account: &AccountRef) -> Result<(), AccountError>;

    /// Record that `hash` is an invoice created through `account`.
    fn associate_invoice(&self, account: &AccountId, hash: &Hash) -> Result<(), AccountError>;

    /// Credit a settled invoice. Crediting the same hash twice is a no-op.
    fn credit_invoice_settled(
        &self,
        account: &AccountId,
        hash: &Hash,
        amount: MilliSatoshi,
    ) -> Result<OffChainBalanceAccount, AccountError>;

    /// Credit a settled invoice to whichever account owns it.
    ///
    /// Returns `Ok(None)` for invoices no account owns.
    fn invoice_settled(
        &self,
        hash: &Hash,
        amount: MilliSatoshi,
    ) -> Result<Option<OffChainBalanceAccount>, AccountError>;

    /// Provisionally debit `amount` for an outgoing payment.
    ///
    /// A decline is an outcome, not an error: the balance is untouched.
    ///
    /// # Errors
    /// - `DuplicatePayment`: a non-failed entry for `hash` exists
    fn reserve_payment(
        &self,
        account: &AccountId,
        hash: &Hash,
        amount: MilliSatoshi,
    ) -> Result<ReserveOutcome, AccountError>;

    /// Finalize a reservation at the amount actually spent.
    fn settle_payment(
        &self,
        account: &AccountId,
        hash: &Hash,
        actual: MilliSatoshi,
    ) -> Result<OffChainBalanceAccount, AccountError>;

    /// Release a reservation in full.
    fn fail_payment(
        &self,
        account: &AccountId,
        hash: &Hash,
    ) -> Result<OffChainBalanceAccount, AccountError>;
}
