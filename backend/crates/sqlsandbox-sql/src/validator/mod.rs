//! Query admission.
//!
//! A query is admitted only when it is a single read-only `Query` statement.
//! See [`ValidationMode`] for how the two modes differ in their text checks.

mod read_only;
mod types;

pub use types::{ValidationMode, ValidationVerdict};

use sqlparser::dialect::GenericDialect;
use sqlparser::tokenizer::Token;

use crate::keywords::DeniedKeyword;
use crate::parser::{parse_sql_statements, tokenize_sql};

pub const DEFAULT_MAX_QUERY_LENGTH: usize = 20_000;

/// Stateless validator; cheap to copy into every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryValidator {
    mode: ValidationMode,
    max_query_length: usize,
}

impl Default for QueryValidator {
    fn default() -> Self {
        Self::new(ValidationMode::Strict)
    }
}

impl QueryValidator {
    pub fn new(mode: ValidationMode) -> Self {
        Self {
            mode,
            max_query_length: DEFAULT_MAX_QUERY_LENGTH,
        }
    }

    pub fn with_max_query_length(mut self, max_query_length: usize) -> Self {
        self.max_query_length = max_query_length;
        self
    }

    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    /// Decides whether `query` may run. Pure: the same text always gets the
    /// same verdict.
    pub fn validate(&self, query: &str) -> ValidationVerdict {
        let verdict = self.check(query);
        if let ValidationVerdict::Rejected { reason } = &verdict {
            log::debug!("Query rejected ({} mode): {}", self.mode, reason);
        }
        verdict
    }

    fn check(&self, query: &str) -> ValidationVerdict {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return ValidationVerdict::rejected("Query cannot be empty");
        }

        if trimmed.chars().count() > self.max_query_length {
            return ValidationVerdict::rejected(format!(
                "Query exceeds maximum length of {} characters",
                self.max_query_length
            ));
        }

        let text_check = match self.mode {
            ValidationMode::Strict => check_strict_text(trimmed),
            ValidationMode::Parsed => check_tokens(trimmed),
        };
        if let Err(reason) = text_check {
            return ValidationVerdict::rejected(reason);
        }

        match check_structure(trimmed) {
            Ok(()) => ValidationVerdict::Accepted,
            Err(reason) => ValidationVerdict::rejected(reason),
        }
    }
}

/// Validates with the default strict settings.
pub fn validate(query: &str) -> ValidationVerdict {
    QueryValidator::default().validate(query)
}

fn check_strict_text(trimmed: &str) -> Result<(), String> {
    let upper = trimmed.to_uppercase();

    if let Some(keyword) = DeniedKeyword::find_substring(&upper) {
        return Err(format!("Operation not allowed: {}", keyword));
    }

    if !upper.starts_with("SELECT") {
        return Err("Only SELECT queries are allowed".to_string());
    }

    Ok(())
}

fn check_tokens(trimmed: &str) -> Result<(), String> {
    let tokens = tokenize_sql(trimmed, &GenericDialect {})
        .map_err(|e| format!("Invalid SQL: {}", e))?;

    for token in &tokens {
        if let Token::Word(word) = token {
            if word.quote_style.is_some() {
                continue;
            }
            if let Ok(keyword) = word.value.parse::<DeniedKeyword>() {
                return Err(format!("Operation not allowed: {}", keyword));
            }
        }
    }

    Ok(())
}

fn check_structure(trimmed: &str) -> Result<(), String> {
    let statements = parse_sql_statements(trimmed, &GenericDialect {})
        .map_err(|e| format!("Invalid SQL: {}", e))?;

    match statements.as_slice() {
        [] => Err("Query cannot be empty".to_string()),
        [statement] => read_only::check_read_only(statement),
        _ => Err("Multiple statements are not allowed".to_string()),
    }
}
