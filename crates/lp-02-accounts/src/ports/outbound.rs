//! Outbound (Driven) ports for the account ledger.
//!
//! Storage goes through `shared_types::KeyValueStore` and time through
//! `shared_types::TimeSource`; the only ledger-specific dependency is the
//! credential issuer.

use crate::domain::Credential;
use shared_types::AccountId;

/// Mints the restricted credential handed out for a new account.
///
/// Credential format and verification belong to the transport layer; the
/// ledger only needs the bytes.
pub trait CredentialIssuer: Send + Sync {
    fn issue(&self, account: &AccountId) -> Result<Credential, String>;
}

/// Issuer returning the raw account id, for tests.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticCredentialIssuer;

#[cfg(any(test, feature = "test-utils"))]
impl CredentialIssuer for StaticCredentialIssuer {
    fn issue(&self, account: &AccountId) -> Result<Credential, String> {
        Ok(Credential::new(account.as_bytes().to_vec()))
    }
}

/// Issuer that always fails, for tests.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingCredentialIssuer;

#[cfg(any(test, feature = "test-utils"))]
impl CredentialIssuer for FailingCredentialIssuer {
    fn issue(&self, _account: &AccountId) -> Result<Credential, String> {
        Err("issuer offline".into())
    }
}
