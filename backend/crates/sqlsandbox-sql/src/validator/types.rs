use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How strictly query text is screened before it reaches the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Substring denylist over the whole text, mandatory `SELECT` prefix, then
    /// the structural read-only check.
    #[default]
    Strict,
    /// Structural read-only check, with the denylist applied only to unquoted
    /// words. String literals, quoted identifiers and comments never trip it,
    /// and `WITH ... SELECT` is admitted.
    Parsed,
}

impl ValidationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationMode::Strict => "strict",
            ValidationMode::Parsed => "parsed",
        }
    }
}

impl fmt::Display for ValidationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValidationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(ValidationMode::Strict),
            "parsed" => Ok(ValidationMode::Parsed),
            other => Err(format!(
                "Invalid validation mode '{}'. Must be one of: strict, parsed",
                other
            )),
        }
    }
}

/// Admission decision for one query text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum ValidationVerdict {
    Accepted,
    Rejected { reason: String },
}

impl ValidationVerdict {
    pub fn rejected(reason: impl Into<String>) -> Self {
        ValidationVerdict::Rejected {
            reason: reason.into(),
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, ValidationVerdict::Accepted)
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        match self {
            ValidationVerdict::Accepted => None,
            ValidationVerdict::Rejected { reason } => Some(reason),
        }
    }
}
