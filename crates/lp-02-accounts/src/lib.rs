//! # Account Ledger Subsystem
//!
//! **Subsystem ID:** 2
//!
//! ## Purpose
//!
//! Tracks a spending limit per restricted credential. Outgoing payments are
//! reserved before they are forwarded to the node and settled or released
//! once the node answers; settled invoices created through the credential
//! credit the account.
//!
//! ## Payment Lifecycle
//!
//! ```text
//! reserve_payment ──→ [IN_FLIGHT] ──settle_payment──→ [SUCCEEDED]
//!                          │
//!                          └──fail_payment──→ [FAILED] (full refund)
//! ```
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Balance = initial + credits − non-failed payments | `service.rs` - every mutation under the account lock |
//! | No overdraft on reservation | `service.rs` - `reserve_payment()` declines |
//! | Unique non-empty labels | `service.rs` - index lock around `create()` |
//! | No silently dropped reservation | `service.rs` - `remove()` rejects `PaymentsInFlight` |
//! | All-or-nothing mutations | `service.rs` - one atomic batch per call |
//!
//! ## Module Structure
//!
//! ```text
//! service.rs          - AccountService (implements AccountLedgerApi)
//! ports/inbound.rs    - AccountLedgerApi
//! ports/outbound.rs   - CredentialIssuer
//! domain/entities.rs  - OffChainBalanceAccount, PaymentEntry, ReserveOutcome
//! domain/tlv.rs       - persisted record codec
//! domain/keys.rs      - storage layout
//! ```

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::*;
pub use ports::{AccountLedgerApi, CredentialIssuer};
pub use service::AccountService;

#[cfg(any(test, feature = "test-utils"))]
pub use ports::{FailingCredentialIssuer, StaticCredentialIssuer};
