//! Storage layout for privacy map pairs.
//!
//! ```text
//! 0x10 | len(session) u16 BE | session | direction | value
//! ```
//!
//! Both directions of a pair live under the session's namespace prefix, so a
//! single prefix scan finds everything to erase when a session is revoked.

use super::errors::PrivacyMapError;
use shared_types::SessionId;

/// Key prefix for privacy pairs.
pub const PRIVACY_PAIR_PREFIX: u8 = 0x10;

/// Lookup direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Direction {
    RealToPseudo = 0x01,
    PseudoToReal = 0x02,
}

/// Prefix shared by every key of a session namespace.
pub fn namespace_prefix(session: &SessionId) -> Result<Vec<u8>, PrivacyMapError> {
    let id = session.as_bytes();
    if id.is_empty() {
        return Err(PrivacyMapError::InvalidInput("session id is empty".into()));
    }
    let len = u16::try_from(id.len()).map_err(|_| {
        PrivacyMapError::InvalidInput(format!("session id too long: {} bytes", id.len()))
    })?;

    let mut key = Vec::with_capacity(3 + id.len());
    key.push(PRIVACY_PAIR_PREFIX);
    key.extend_from_slice(&len.to_be_bytes());
    key.extend_from_slice(id);
    Ok(key)
}

/// Prefix of one direction inside a session namespace.
pub fn direction_prefix(
    session: &SessionId,
    direction: Direction,
) -> Result<Vec<u8>, PrivacyMapError> {
    let mut key = namespace_prefix(session)?;
    key.push(direction as u8);
    Ok(key)
}

/// Full key of one side of a pair.
pub fn pair_key(
    session: &SessionId,
    direction: Direction,
    value: &str,
) -> Result<Vec<u8>, PrivacyMapError> {
    let mut key = direction_prefix(session, direction)?;
    key.extend_from_slice(value.as_bytes());
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_key_layout() {
        let session = SessionId::new(vec![0xaa, 0xbb]);
        let key = pair_key(&session, Direction::PseudoToReal, "xy").unwrap();
        assert_eq!(key, vec![0x10, 0x00, 0x02, 0xaa, 0xbb, 0x02, b'x', b'y']);
    }

    #[test]
    fn test_sessions_sharing_a_prefix_do_not_overlap() {
        // the length field keeps "aa" from being a prefix of "aabb"
        let short = namespace_prefix(&SessionId::new(vec![0xaa])).unwrap();
        let long = namespace_prefix(&SessionId::new(vec![0xaa, 0xbb])).unwrap();
        assert!(!long.starts_with(&short));
    }

    #[test]
    fn test_empty_session_rejected() {
        assert!(namespace_prefix(&SessionId::default()).is_err());
    }
}
