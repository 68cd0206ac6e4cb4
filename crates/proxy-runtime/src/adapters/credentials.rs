//! # HMAC Credential Issuer
//!
//! Account credentials are `id || HMAC-SHA256(secret, id)`: 8 + 32 bytes.
//! The proxy recognizes its own credentials without storing them, and the
//! session a credential opens is named by the SHA-256 of its bytes.

use hmac::{Hmac, Mac};
use lp_02_accounts::{Credential, CredentialIssuer};
use sha2::{Digest, Sha256};
use shared_types::{AccountId, SessionId, ACCOUNT_ID_LEN};

type HmacSha256 = Hmac<Sha256>;

pub const CREDENTIAL_LEN: usize = ACCOUNT_ID_LEN + 32;

pub struct HmacCredentialIssuer {
    secret: [u8; 32],
}

impl HmacCredentialIssuer {
    pub fn new(secret: [u8; 32]) -> Self {
        Self { secret }
    }

    fn mac(&self) -> Option<HmacSha256> {
        HmacSha256::new_from_slice(&self.secret).ok()
    }

    /// Account a credential was minted for, if it carries a valid tag.
    pub fn verify(&self, credential: &[u8]) -> Option<AccountId> {
        if credential.len() != CREDENTIAL_LEN {
            return None;
        }
        let (id, tag) = credential.split_at(ACCOUNT_ID_LEN);
        let mut mac = self.mac()?;
        mac.update(id);
        mac.verify_slice(tag).ok()?;
        AccountId::from_slice(id).ok()
    }
}

impl CredentialIssuer for HmacCredentialIssuer {
    fn issue(&self, account: &AccountId) -> Result<Credential, String> {
        let mut mac = self.mac().ok_or("invalid credential key")?;
        mac.update(account.as_bytes());
        let tag = mac.finalize().into_bytes();

        let mut bytes = Vec::with_capacity(CREDENTIAL_LEN);
        bytes.extend_from_slice(account.as_bytes());
        bytes.extend_from_slice(&tag);
        Ok(Credential::new(bytes))
    }
}

/// Session opened by `credential`.
pub fn session_id_for(credential: &[u8]) -> SessionId {
    SessionId::new(Sha256::digest(credential).to_vec())
}
