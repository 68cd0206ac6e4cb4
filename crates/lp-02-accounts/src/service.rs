//! # Account Ledger Service
//!
//! Persists accounts through the injected `KeyValueStore`, one TLV record
//! per account plus the label and invoice-ownership indexes.
//!
//! ## Locking
//!
//! ```text
//! index lock ──→ account lock(id)
//! ```
//!
//! - Every read-modify-write of an account runs under that account's lock,
//!   so reserve/settle/fail/credit on one account are serialized and the
//!   balance invariant holds under concurrent settlement and dispatch.
//! - `create`, `remove` and `associate_invoice` additionally take the index
//!   lock, which keeps label and invoice ownership unique.
//! - Locks are always taken in the order above and never held by callers.
//!
//! Each mutation ends in exactly one atomic batch write.

use crate::domain::keys::{
    account_key, invoice_owner_key, label_key, ACCOUNT_PREFIX, INVOICE_OWNER_PREFIX,
};
use crate::domain::{
    decode_account, encode_account, AccountError, AccountRef, AccountUpdate, Credential,
    DeclineReason, Expiry, OffChainBalanceAccount, PaymentEntry, PaymentStatus, ReserveOutcome,
};
use crate::ports::{AccountLedgerApi, CredentialIssuer};
use parking_lot::Mutex;
use rand::rngs::OsRng;
use rand::RngCore;
use shared_types::{
    AccountId, BatchOperation, Hash, KeyValueStore, KeyedLocks, MilliSatoshi, StoreError,
    TimeSource, Timestamp, ACCOUNT_ID_LEN,
};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Off-chain balance ledger backed by a key-value store.
pub struct AccountService {
    store: Arc<dyn KeyValueStore>,
    time: Arc<dyn TimeSource>,
    issuer: Arc<dyn CredentialIssuer>,
    accounts: KeyedLocks<AccountId>,
    index: Mutex<()>,
}

impl AccountService {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        time: Arc<dyn TimeSource>,
        issuer: Arc<dyn CredentialIssuer>,
    ) -> Self {
        Self {
            store,
            time,
            issuer,
            accounts: KeyedLocks::new(),
            index: Mutex::new(()),
        }
    }

    fn load(&self, id: &AccountId) -> Result<Option<OffChainBalanceAccount>, AccountError> {
        match self.store.get(&account_key(id))? {
            None => Ok(None),
            Some(bytes) => Ok(Some(decode_account(&bytes)?)),
        }
    }

    fn load_existing(&self, id: &AccountId) -> Result<OffChainBalanceAccount, AccountError> {
        self.load(id)?
            .ok_or_else(|| AccountError::NotFound(AccountRef::Id(*id).to_string()))
    }

    fn save(&self, account: &OffChainBalanceAccount) -> Result<(), AccountError> {
        self.store.atomic_batch_write(vec![BatchOperation::put(
            account_key(&account.id),
            encode_account(account),
        )])?;
        Ok(())
    }

    fn resolve_id(&self, reference: &AccountRef) -> Result<AccountId, AccountError> {
        match reference {
            AccountRef::Id(id) => Ok(*id),
            AccountRef::Label(label) => {
                let key = label_key(label);
                let bytes = self
                    .store
                    .get(&key)?
                    .ok_or_else(|| AccountError::NotFound(reference.to_string()))?;
                decode_id(&key, &bytes)
            }
        }
    }

    fn fresh_id(&self) -> Result<AccountId, AccountError> {
        loop {
            let mut raw = [0u8; ACCOUNT_ID_LEN];
            OsRng.fill_bytes(&mut raw);
            let id = AccountId(raw);
            if !self.store.exists(&account_key(&id))? {
                return Ok(id);
            }
        }
    }

    fn check_future(&self, expiration: Timestamp, now: Timestamp) -> Result<(), AccountError> {
        if expiration <= now {
            return Err(AccountError::InvalidInput(format!(
                "expiration {expiration} is not in the future"
            )));
        }
        Ok(())
    }
}

/// Empty labels mean "no label". Labels must not look like account ids.
fn normalize_label(label: Option<&str>) -> Result<Option<String>, AccountError> {
    match label {
        None | Some("") => Ok(None),
        Some(label) if AccountId::from_str(label).is_ok() => Err(AccountError::InvalidInput(
            format!("label {label:?} must not be an account id"),
        )),
        Some(label) => Ok(Some(label.to_string())),
    }
}

fn to_balance(amount: MilliSatoshi) -> Result<i64, AccountError> {
    i64::try_from(amount)
        .map_err(|_| AccountError::InvalidInput(format!("amount {amount} msat out of range")))
}

fn apply_delta(account: &OffChainBalanceAccount, delta: i128) -> Result<i64, AccountError> {
    i64::try_from(i128::from(account.current_balance) + delta)
        .map_err(|_| AccountError::BalanceOverflow(account.id))
}

/// Set the spendable balance to `balance` once every in-flight reservation
/// resolves, keeping the recorded invoices and payments consistent.
///
/// `initial_balance` moves by the same delta as `current_balance`, so the
/// balance invariant keeps holding without knowing the credited amounts.
fn rebase(account: &mut OffChainBalanceAccount, balance: MilliSatoshi) -> Result<(), AccountError> {
    let in_flight: i128 = account
        .payments
        .values()
        .filter(|entry| !entry.status.is_terminal())
        .map(|entry| i128::from(entry.full_amount))
        .sum();
    let current = i128::from(to_balance(balance)?) - in_flight;
    let delta = current - i128::from(account.current_balance);
    let initial = u64::try_from(i128::from(account.initial_balance) + delta).map_err(|_| {
        AccountError::InvalidInput(format!(
            "balance {balance} msat is below the invoices already credited to the account"
        ))
    })?;
    account.current_balance =
        i64::try_from(current).map_err(|_| AccountError::BalanceOverflow(account.id))?;
    account.initial_balance = initial;
    Ok(())
}

fn decode_id(key: &[u8], bytes: &[u8]) -> Result<AccountId, AccountError> {
    AccountId::from_slice(bytes).map_err(|e| {
        AccountError::Storage(StoreError::Corruption {
            key: hex::encode(key),
            message: e.to_string(),
        })
    })
}

impl AccountLedgerApi for AccountService {
    fn create(
        &self,
        initial_balance: MilliSatoshi,
        expiration: Option<Timestamp>,
        label: Option<&str>,
    ) -> Result<(OffChainBalanceAccount, Credential), AccountError> {
        let label = normalize_label(label)?;
        let current = to_balance(initial_balance)?;
        let now = self.time.now();
        if let Some(at) = expiration {
            self.check_future(at, now)?;
        }

        let _index = self.index.lock();
        if let Some(label) = &label {
            if self.store.exists(&label_key(label))? {
                return Err(AccountError::DuplicateLabel(label.clone()));
            }
        }

        let id = self.fresh_id()?;
        let credential = self.issuer.issue(&id).map_err(AccountError::Credential)?;
        let account =
            OffChainBalanceAccount::new(id, initial_balance, current, expiration, label, now);

        let mut ops = vec![BatchOperation::put(account_key(&id), encode_account(&account))];
        if let Some(label) = &account.label {
            ops.push(BatchOperation::put(label_key(label), id.as_bytes().to_vec()));
        }
        self.store.atomic_batch_write(ops)?;

        info!(
            account = %id,
            balance = initial_balance,
            expiration = ?expiration,
            label = ?account.label,
            "Account created"
        );
        Ok((account, credential))
    }

    fn update(
        &self,
        reference: &AccountRef,
        update: AccountUpdate,
    ) -> Result<OffChainBalanceAccount, AccountError> {
        let id = self.resolve_id(reference)?;
        let _guard = self.accounts.lock(&id);

        let mut account = self.load_existing(&id)?;
        let now = self.time.now();

        if let Some(balance) = update.balance {
            rebase(&mut account, balance)?;
        }
        match update.expiration {
            None => {}
            Some(Expiry::Never) => account.expiration = None,
            Some(Expiry::At(at)) => {
                self.check_future(at, now)?;
                account.expiration = Some(at);
            }
        }
        account.last_update = now;
        self.save(&account)?;

        info!(
            account = %id,
            balance = account.current_balance,
            expiration = ?account.expiration,
            "Account updated"
        );
        Ok(account)
    }

    fn list(&self) -> Result<Vec<OffChainBalanceAccount>, AccountError> {
        let entries = self.store.prefix_scan(&[ACCOUNT_PREFIX])?;
        let accounts = entries
            .iter()
            .map(|(_, bytes)| decode_account(bytes).map_err(AccountError::from))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(count = accounts.len(), "Accounts listed");
        Ok(accounts)
    }

    fn get(&self, reference: &AccountRef) -> Result<OffChainBalanceAccount, AccountError> {
        let id = self.resolve_id(reference)?;
        let account = self.load_existing(&id)?;
        debug!(account = %id, "Account fetched");
        Ok(account)
    }

    fn remove(&self, reference: &AccountRef) -> Result<(), AccountError> {
        let _index = self.index.lock();
        let id = self.resolve_id(reference)?;
        let _guard = self.accounts.lock(&id);

        let account = self.load_existing(&id)?;
        let pending = account.pending_payments();
        if pending > 0 {
            warn!(account = %id, pending, "Refusing to remove account with payments in flight");
            return Err(AccountError::PaymentsInFlight {
                account: id,
                count: pending,
            });
        }

        let mut ops = vec![BatchOperation::delete(account_key(&id))];
        if let Some(label) = &account.label {
            ops.push(BatchOperation::delete(label_key(label)));
        }
        for (key, owner) in self.store.prefix_scan(&[INVOICE_OWNER_PREFIX])? {
            if owner.as_slice() == id.as_bytes() {
                ops.push(BatchOperation::delete(key));
            }
        }
        self.store.atomic_batch_write(ops)?;

        info!(account = %id, "Account removed");
        Ok(())
    }

    fn associate_invoice(&self, account: &AccountId, hash: &Hash) -> Result<(), AccountError> {
        let _index = self.index.lock();
        let _guard = self.accounts.lock(account);

        self.load_existing(account)?;
        let key = invoice_owner_key(hash);
        if let Some(bytes) = self.store.get(&key)? {
            let owner = decode_id(&key, &bytes)?;
            if owner == *account {
                return Ok(());
            }
            return Err(AccountError::InvoiceOwned {
                hash: hex::encode(hash),
                owner,
            });
        }
        self.store.put(&key, account.as_bytes())?;

        debug!(account = %account, hash = %hex::encode(hash), "Invoice associated");
        Ok(())
    }

    fn credit_invoice_settled(
        &self,
        account: &AccountId,
        hash: &Hash,
        amount: MilliSatoshi,
    ) -> Result<OffChainBalanceAccount, AccountError> {
        let _guard = self.accounts.lock(account);

        let mut acc = self.load_existing(account)?;
        if acc.invoices.contains(hash) {
            debug!(account = %account, hash = %hex::encode(hash), "Invoice already credited");
            return Ok(acc);
        }

        acc.current_balance = apply_delta(&acc, i128::from(amount))?;
        acc.invoices.insert(*hash);
        acc.last_update = self.time.now();
        self.save(&acc)?;

        info!(
            account = %account,
            hash = %hex::encode(hash),
            amount,
            balance = acc.current_balance,
            "Invoice credited"
        );
        Ok(acc)
    }

    fn invoice_settled(
        &self,
        hash: &Hash,
        amount: MilliSatoshi,
    ) -> Result<Option<OffChainBalanceAccount>, AccountError> {
        let key = invoice_owner_key(hash);
        let Some(bytes) = self.store.get(&key)? else {
            debug!(hash = %hex::encode(hash), "Settled invoice has no owning account");
            return Ok(None);
        };
        let owner = decode_id(&key, &bytes)?;
        self.credit_invoice_settled(&owner, hash, amount).map(Some)
    }

    fn reserve_payment(
        &self,
        account: &AccountId,
        hash: &Hash,
        amount: MilliSatoshi,
    ) -> Result<ReserveOutcome, AccountError> {
        let required = to_balance(amount)?;
        let _guard = self.accounts.lock(account);

        let mut acc = self.load_existing(account)?;
        let now = self.time.now();

        if let Some(expired_at) = acc.expiration.filter(|_| acc.has_expired(now)) {
            warn!(account = %account, expired_at, "Reservation declined: account expired");
            return Ok(ReserveOutcome::Declined(DeclineReason::Expired { expired_at }));
        }
        if let Some(entry) = acc.payments.get(hash) {
            if entry.status != PaymentStatus::Failed {
                return Err(AccountError::DuplicatePayment {
                    account: *account,
                    hash: hex::encode(hash),
                });
            }
        }
        if required > acc.current_balance {
            warn!(
                account = %account,
                required = amount,
                available = acc.current_balance,
                "Reservation declined: insufficient balance"
            );
            return Ok(ReserveOutcome::Declined(DeclineReason::InsufficientBalance {
                required: amount,
                available: acc.current_balance,
            }));
        }

        acc.current_balance -= required;
        acc.payments.insert(
            *hash,
            PaymentEntry {
                status: PaymentStatus::InFlight,
                full_amount: amount,
            },
        );
        acc.last_update = now;
        self.save(&acc)?;

        info!(
            account = %account,
            hash = %hex::encode(hash),
            amount,
            remaining = acc.current_balance,
            "Payment reserved"
        );
        Ok(ReserveOutcome::Reserved {
            remaining: acc.current_balance,
        })
    }

    fn settle_payment(
        &self,
        account: &AccountId,
        hash: &Hash,
        actual: MilliSatoshi,
    ) -> Result<OffChainBalanceAccount, AccountError> {
        let _guard = self.accounts.lock(account);

        let mut acc = self.load_existing(account)?;
        let entry = acc
            .payments
            .get(hash)
            .copied()
            .ok_or_else(|| AccountError::UnknownPayment {
                account: *account,
                hash: hex::encode(hash),
            })?;
        if entry.status.is_terminal() {
            debug!(account = %account, status = ?entry.status, "Payment already final");
            return Ok(acc);
        }

        acc.current_balance =
            apply_delta(&acc, i128::from(entry.full_amount) - i128::from(actual))?;
        acc.payments.insert(
            *hash,
            PaymentEntry {
                status: PaymentStatus::Succeeded,
                full_amount: actual,
            },
        );
        acc.last_update = self.time.now();
        self.save(&acc)?;

        info!(
            account = %account,
            hash = %hex::encode(hash),
            reserved = entry.full_amount,
            actual,
            balance = acc.current_balance,
            "Payment settled"
        );
        Ok(acc)
    }

    fn fail_payment(
        &self,
        account: &AccountId,
        hash: &Hash,
    ) -> Result<OffChainBalanceAccount, AccountError> {
        let _guard = self.accounts.lock(account);

        let mut acc = self.load_existing(account)?;
        let Some(entry) = acc.payments.get(hash).copied() else {
            return Err(AccountError::UnknownPayment {
                account: *account,
                hash: hex::encode(hash),
            });
        };
        if entry.status.is_terminal() {
            debug!(account = %account, status = ?entry.status, "Payment already final");
            return Ok(acc);
        }

        acc.current_balance = apply_delta(&acc, i128::from(entry.full_amount))?;
        acc.payments.insert(
            *hash,
            PaymentEntry {
                status: PaymentStatus::Failed,
                full_amount: entry.full_amount,
            },
        );
        acc.last_update = self.time.now();
        self.save(&acc)?;

        warn!(
            account = %account,
            hash = %hex::encode(hash),
            refunded = entry.full_amount,
            balance = acc.current_balance,
            "Payment failed, reservation released"
        );
        Ok(acc)
    }
}
