//! sqlsandbox-sql
//!
//! Static admission control for untrusted query text, and the identifier
//! sanitizer every table or column name passes before it reaches the catalog.
//!
//! # Example
//!
//! ```
//! use sqlsandbox_sql::{QueryValidator, ValidationMode};
//!
//! let validator = QueryValidator::new(ValidationMode::Strict);
//! assert!(validator.validate("SELECT name FROM employees").is_accepted());
//! assert!(!validator.validate("DROP TABLE employees").is_accepted());
//! ```

pub mod identifiers;
pub mod keywords;
pub mod parser;
pub mod redact;
pub mod validator;

pub use identifiers::{sanitize_identifier, IdentifierError, MAX_IDENTIFIER_LEN};
pub use keywords::DeniedKeyword;
pub use redact::{query_for_log, DEFAULT_LOG_QUERY_CHARS};
pub use validator::{validate, QueryValidator, ValidationMode, ValidationVerdict};
