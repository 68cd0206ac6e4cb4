//! Request and response messages of the control plane.
//!
//! Amounts on this surface are satoshis; the ledger keeps millisatoshis.
//! Timestamps are unix seconds, with `0` meaning "never expires".

use lp_02_accounts::{OffChainBalanceAccount, PaymentStatus};
use serde::{Deserialize, Serialize};

pub const MSAT_PER_SAT: u64 = 1000;

/// Sentinel for "leave unchanged" in [`UpdateAccountRequest`].
pub const KEEP: i64 = -1;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateAccountRequest {
    /// Spending limit in satoshis.
    pub account_balance: u64,
    /// Unix seconds; `0` never expires.
    pub expiration_date: i64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAccountResponse {
    pub account: AccountView,
    /// Hex-encoded credential bound to the account.
    pub credential: String,
}

/// Either `id` or `label` names the account; `id` wins when both are set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateAccountRequest {
    pub id: String,
    /// New balance in satoshis, or [`KEEP`].
    pub account_balance: i64,
    /// New expiry in unix seconds, [`KEEP`], or `0` for never.
    pub expiration_date: i64,
    pub label: String,
}

impl Default for UpdateAccountRequest {
    fn default() -> Self {
        Self {
            id: String::new(),
            account_balance: KEEP,
            expiration_date: KEEP,
            label: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountInfoRequest {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoveAccountRequest {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListAccountsResponse {
    pub accounts: Vec<AccountView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInvoiceView {
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountPaymentView {
    pub hash: String,
    pub state: String,
    /// Reserved amount including the fee limit, in satoshis.
    pub full_amount: i64,
}

/// Operator view of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountView {
    pub id: String,
    pub initial_balance: u64,
    pub current_balance: i64,
    pub last_update: i64,
    pub expiration_date: i64,
    pub invoices: Vec<AccountInvoiceView>,
    pub payments: Vec<AccountPaymentView>,
    pub label: String,
}

fn status_name(status: PaymentStatus) -> &'static str {
    match status {
        PaymentStatus::Unknown => "UNKNOWN",
        PaymentStatus::InFlight => "IN_FLIGHT",
        PaymentStatus::Succeeded => "SUCCEEDED",
        PaymentStatus::Failed => "FAILED",
        PaymentStatus::Initiated => "INITIATED",
    }
}

fn to_i64(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

impl From<&OffChainBalanceAccount> for AccountView {
    fn from(acc: &OffChainBalanceAccount) -> Self {
        Self {
            id: acc.id.to_hex(),
            initial_balance: acc.initial_balance / MSAT_PER_SAT,
            current_balance: acc.current_balance / MSAT_PER_SAT as i64,
            last_update: to_i64(acc.last_update),
            expiration_date: acc.expiration.map(to_i64).unwrap_or(0),
            invoices: acc
                .invoices
                .iter()
                .map(|hash| AccountInvoiceView {
                    hash: hex::encode(hash),
                })
                .collect(),
            payments: acc
                .payments
                .iter()
                .map(|(hash, entry)| AccountPaymentView {
                    hash: hex::encode(hash),
                    state: status_name(entry.status).to_string(),
                    full_amount: to_i64(entry.full_amount / MSAT_PER_SAT),
                })
                .collect(),
            label: acc.label.clone().unwrap_or_default(),
        }
    }
}

/// Translate a value through a session's privacy map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrivacyMapConversionRequest {
    /// Hex session id.
    pub session_id: String,
    /// `true` maps real → pseudo, `false` pseudo → real.
    pub real_to_pseudo: bool,
    pub input: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivacyMapConversionResponse {
    pub output: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetInfoResponse {
    pub version: String,
}
