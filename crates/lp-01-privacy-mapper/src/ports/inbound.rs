//! # Inbound Port - PrivacyMapApi
//!
//! Driving port used by the interceptor pipeline and the control plane.

use crate::domain::{decode_u64, encode_u64, PrivacyMapError};
use shared_types::SessionId;

/// Session-scoped bijective mapping between real and pseudo values.
///
/// # Guarantees
///
/// - Within one session, `real_to_pseudo` is injective and stable: the same
///   real value always yields the same pseudonym, even when callers race on
///   the first encounter.
/// - `pseudo_to_real(s, real_to_pseudo(s, v)) == v`.
/// - Sessions never share pairs.
pub trait PrivacyMapApi: Send + Sync {
    /// Pseudonym for `real`, allocating one on first encounter.
    fn real_to_pseudo(&self, session: &SessionId, real: &str) -> Result<String, PrivacyMapError>;

    /// Real value behind `pseudo`.
    ///
    /// # Errors
    /// - `MappingNotFound`: the pseudonym was never issued for this session.
    ///   Callers must not pass such values through.
    fn pseudo_to_real(&self, session: &SessionId, pseudo: &str)
        -> Result<String, PrivacyMapError>;

    /// Erase the whole session namespace. Idempotent.
    fn clear(&self, session: &SessionId) -> Result<usize, PrivacyMapError>;

    /// All `(real, pseudo)` pairs of a session, ordered by real value.
    fn pairs(&self, session: &SessionId) -> Result<Vec<(String, String)>, PrivacyMapError>;

    /// Pseudonymize an integer through the numeric codec.
    fn hide_u64(&self, session: &SessionId, real: u64) -> Result<u64, PrivacyMapError> {
        let pseudo = self.real_to_pseudo(session, &encode_u64(real))?;
        Ok(decode_u64(&pseudo)?)
    }

    /// Reverse of [`PrivacyMapApi::hide_u64`].
    fn reveal_u64(&self, session: &SessionId, pseudo: u64) -> Result<u64, PrivacyMapError> {
        let real = self.pseudo_to_real(session, &encode_u64(pseudo))?;
        Ok(decode_u64(&real)?)
    }
}
