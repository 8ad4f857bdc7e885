//! Shared sqlparser entry points so every caller parses with the same options.

use sqlparser::ast::Statement;
use sqlparser::dialect::Dialect;
use sqlparser::parser::{Parser, ParserError, ParserOptions};
use sqlparser::tokenizer::{Token, Tokenizer, TokenizerError};

const DEFAULT_SQL_RECURSION_LIMIT: usize = 512;

/// Default sqlparser options used across sqlsandbox
pub fn parser_options() -> ParserOptions {
    ParserOptions::new().with_trailing_commas(true)
}

/// Parse SQL into statements using sqlsandbox defaults (options + recursion limit)
pub fn parse_sql_statements(
    sql: &str,
    dialect: &dyn Dialect,
) -> Result<Vec<Statement>, ParserError> {
    Parser::new(dialect)
        .with_options(parser_options())
        .with_recursion_limit(DEFAULT_SQL_RECURSION_LIMIT)
        .try_with_sql(sql)?
        .parse_statements()
}

/// Tokenize SQL without building an AST. Whitespace and comments are dropped.
pub fn tokenize_sql(sql: &str, dialect: &dyn Dialect) -> Result<Vec<Token>, TokenizerError> {
    let tokens = Tokenizer::new(dialect, sql).tokenize()?;
    Ok(tokens
        .into_iter()
        .filter(|token| !matches!(token, Token::Whitespace(_)))
        .collect())
}
