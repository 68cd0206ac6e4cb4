//! Ports (hexagonal architecture) for the account ledger.

pub mod inbound;
pub mod outbound;

pub use inbound::AccountLedgerApi;
pub use outbound::CredentialIssuer;

#[cfg(any(test, feature = "test-utils"))]
pub use outbound::{FailingCredentialIssuer, StaticCredentialIssuer};
