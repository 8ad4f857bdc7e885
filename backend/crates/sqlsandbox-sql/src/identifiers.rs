//! Allow-list sanitizer for table and column names taken from assignment data.

use thiserror::Error;

pub const MAX_IDENTIFIER_LEN: usize = 63;

/// Names that collide with catalog internals or with SQL keywords a student
/// could not reference without quoting.
const RESERVED_IDENTIFIERS: &[&str] = &[
    "system",
    "information_schema",
    "pg_catalog",
    "datafusion",
    "sandbox",
    "all",
    "and",
    "as",
    "by",
    "case",
    "cross",
    "distinct",
    "else",
    "end",
    "except",
    "false",
    "from",
    "full",
    "group",
    "having",
    "in",
    "inner",
    "intersect",
    "is",
    "join",
    "left",
    "like",
    "limit",
    "not",
    "null",
    "offset",
    "on",
    "or",
    "order",
    "outer",
    "right",
    "select",
    "table",
    "then",
    "true",
    "union",
    "using",
    "when",
    "where",
    "with",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    #[error("identifier cannot be empty")]
    Empty,

    #[error("identifier '{name}' is longer than {max} characters", max = MAX_IDENTIFIER_LEN)]
    TooLong { name: String },

    #[error("identifier '{name}' must start with a letter or underscore and contain only letters, digits and underscores")]
    InvalidCharacters { name: String },

    #[error("identifier '{name}' is reserved")]
    Reserved { name: String },
}

/// Validates `raw` against `^[A-Za-z_][A-Za-z0-9_]{0,62}$` and the reserved
/// list, returning the lowercased form used in the catalog.
///
/// Unquoted identifiers in queries are folded to lowercase, so storing the
/// lowercased name keeps `SELECT * FROM Employees` resolving to the table.
pub fn sanitize_identifier(raw: &str) -> Result<String, IdentifierError> {
    if raw.is_empty() {
        return Err(IdentifierError::Empty);
    }

    if raw.len() > MAX_IDENTIFIER_LEN {
        return Err(IdentifierError::TooLong {
            name: raw.to_string(),
        });
    }

    let mut chars = raw.chars();
    let starts_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !starts_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(IdentifierError::InvalidCharacters {
            name: raw.to_string(),
        });
    }

    let lowered = raw.to_ascii_lowercase();
    if RESERVED_IDENTIFIERS.contains(&lowered.as_str()) {
        return Err(IdentifierError::Reserved { name: lowered });
    }

    Ok(lowered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_and_lowercases() {
        assert_eq!(sanitize_identifier("Employees").unwrap(), "employees");
        assert_eq!(sanitize_identifier("_tmp_1").unwrap(), "_tmp_1");
        assert_eq!(sanitize_identifier(&"a".repeat(63)).unwrap().len(), 63);
    }

    #[test]
    fn test_rejects_injection_shapes() {
        for raw in ["emp; DROP TABLE x", "emp\"", "1abc", "a-b", "naïve", "a b", ""] {
            assert!(sanitize_identifier(raw).is_err(), "accepted {:?}", raw);
        }
    }

    #[test]
    fn test_rejects_long_and_reserved() {
        assert!(matches!(
            sanitize_identifier(&"a".repeat(64)),
            Err(IdentifierError::TooLong { .. })
        ));
        assert!(matches!(
            sanitize_identifier("SELECT"),
            Err(IdentifierError::Reserved { .. })
        ));
        assert!(matches!(
            sanitize_identifier("information_schema"),
            Err(IdentifierError::Reserved { .. })
        ));
    }
}
