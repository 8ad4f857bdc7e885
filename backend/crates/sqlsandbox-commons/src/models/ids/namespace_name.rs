//! Type-safe wrapper for sandbox namespace names.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::SessionId;
use crate::errors::{CommonError, Result};

/// Prefix shared by every sandbox namespace.
pub const NAMESPACE_PREFIX: &str = "ws_";

/// Hex digits of the session digest kept in the name (128 bits).
const DIGEST_HEX_LEN: usize = 32;

/// Name of the isolated namespace that holds one session's tables.
///
/// Derived from the session id as `ws_` followed by the first 128 bits of its
/// SHA-256 digest in lowercase hex. The mapping is pure, always yields a safe
/// identifier whatever characters the session id contains, and distinct
/// session ids collide only with negligible probability.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NamespaceName(String);

impl NamespaceName {
    /// Derives the namespace name owned by `session`.
    pub fn for_session(session: &SessionId) -> Self {
        let digest = Sha256::digest(session.as_str().as_bytes());
        let hex: String = digest
            .iter()
            .take(DIGEST_HEX_LEN / 2)
            .map(|byte| format!("{:02x}", byte))
            .collect();
        Self(format!("{}{}", NAMESPACE_PREFIX, hex))
    }

    /// Parses a previously derived namespace name.
    pub fn parse(name: &str) -> Result<Self> {
        let digest = name.strip_prefix(NAMESPACE_PREFIX).ok_or_else(|| {
            CommonError::invalid_input(format!(
                "Namespace name '{}' must start with '{}'",
                name, NAMESPACE_PREFIX
            ))
        })?;

        if digest.len() != DIGEST_HEX_LEN
            || !digest.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        {
            return Err(CommonError::invalid_input(format!(
                "Namespace name '{}' is not a sandbox namespace",
                name
            )));
        }

        Ok(Self(name.to_string()))
    }

    /// Returns the namespace name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NamespaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for NamespaceName {
    type Error = CommonError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<NamespaceName> for String {
    fn from(name: NamespaceName) -> Self {
        name.0
    }
}

impl AsRef<str> for NamespaceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(id: &str) -> SessionId {
        SessionId::new(id).unwrap()
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let a = NamespaceName::for_session(&session("3f2c9a1e-7b7d-4c53"));
        let b = NamespaceName::for_session(&session("3f2c9a1e-7b7d-4c53"));
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), NAMESPACE_PREFIX.len() + DIGEST_HEX_LEN);
    }

    #[test]
    fn test_separator_variants_do_not_collide() {
        // A naive '-' -> '_' rewrite would map these to the same schema.
        let dashed = NamespaceName::for_session(&session("a-b"));
        let underscored = NamespaceName::for_session(&session("a_b"));
        assert_ne!(dashed, underscored);
    }

    #[test]
    fn test_unsafe_characters_are_normalized() {
        let name = NamespaceName::for_session(&session("x\"; DROP SCHEMA public; --"));
        assert!(name
            .as_str()
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'));
    }

    #[test]
    fn test_parse_round_trips_derived_names() {
        let name = NamespaceName::for_session(&session("user-1"));
        assert_eq!(NamespaceName::parse(name.as_str()).unwrap(), name);
        assert!(NamespaceName::parse("public").is_err());
        assert!(NamespaceName::parse("ws_XYZ").is_err());
    }
}
