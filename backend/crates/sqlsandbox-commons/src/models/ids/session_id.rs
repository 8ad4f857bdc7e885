//! Type-safe wrapper for session identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{CommonError, Result};

/// Opaque identifier scoping one user's sequence of queries to one namespace.
///
/// Either supplied by the caller (to rejoin an existing namespace) or generated
/// with [`SessionId::generate`]. The content is never spliced into SQL; it only
/// feeds the namespace name derivation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    /// Longest accepted session identifier, in bytes.
    pub const MAX_LEN: usize = 256;

    /// Creates a SessionId, rejecting empty, oversized or control-character ids.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(CommonError::invalid_input("Session id cannot be empty"));
        }
        if id.len() > Self::MAX_LEN {
            return Err(CommonError::invalid_input(format!(
                "Session id exceeds {} bytes",
                Self::MAX_LEN
            )));
        }
        if id.chars().any(|c| c.is_control()) {
            return Err(CommonError::invalid_input(
                "Session id cannot contain control characters",
            ));
        }
        Ok(Self(id))
    }

    /// Generates a fresh random session id (UUID v4).
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the session id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper and returns the inner String.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for SessionId {
    type Error = CommonError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<&str> for SessionId {
    type Error = CommonError;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_distinct() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }

    #[test]
    fn test_rejects_empty_and_oversized() {
        assert!(SessionId::new("").is_err());
        assert!(SessionId::new("   ").is_err());
        assert!(SessionId::new("a".repeat(SessionId::MAX_LEN + 1)).is_err());
        assert!(SessionId::new("a".repeat(SessionId::MAX_LEN)).is_ok());
    }

    #[test]
    fn test_rejects_control_characters() {
        assert!(SessionId::new("abc\n").is_err());
        assert!(SessionId::new("abc\0def").is_err());
    }

    #[test]
    fn test_serde_validates() {
        let id: SessionId = serde_json::from_str("\"user-42\"").unwrap();
        assert_eq!(id.as_str(), "user-42");
        assert!(serde_json::from_str::<SessionId>("\"\"").is_err());
    }
}
