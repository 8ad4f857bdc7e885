// Error types module
use sqlsandbox_sql::IdentifierError;
use thiserror::Error;

/// Infrastructure failure of one sandbox request.
///
/// Rejected queries and failing queries are not errors: they come back as
/// data (`RunVerdict::Rejected` / `QueryResult { success: false }`).
#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("Namespace error: {0}")]
    Namespace(#[from] NamespaceError),

    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("Invalid session: {0}")]
    InvalidSession(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Query runtime error: {0}")]
    Runtime(String),
}

impl SandboxError {
    /// Whether retrying the same request after a backoff may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SandboxError::Pool(PoolError::Exhausted { .. }) | SandboxError::Load(LoadError::Timeout { .. })
        )
    }
}

#[derive(Error, Debug)]
pub enum NamespaceError {
    #[error("Namespace not found: {0}")]
    NotFound(String),

    #[error("Catalog error: {0}")]
    Backend(String),
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Invalid {kind} name: {source}")]
    InvalidIdentifier {
        kind: &'static str,
        #[source]
        source: IdentifierError,
    },

    #[error("Duplicate table '{0}' in assignment")]
    DuplicateTable(String),

    #[error("Duplicate column '{column}' in table '{table}'")]
    DuplicateColumn { table: String, column: String },

    #[error("Table '{0}' has no columns")]
    NoColumns(String),

    #[error("Table '{table}' row {row}: expected {expected} values, got {actual}")]
    ArityMismatch {
        table: String,
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Table '{table}' row {row}, column '{column}': {message}")]
    ValueType {
        table: String,
        row: usize,
        column: String,
        message: String,
    },

    #[error("Too many tables: {count} (max {max})")]
    TooManyTables { count: usize, max: usize },

    #[error("Table '{table}' has too many columns: {count} (max {max})")]
    TooManyColumns { table: String, count: usize, max: usize },

    #[error("Table '{table}' has too many rows: {count} (max {max})")]
    TooManyRows { table: String, count: usize, max: usize },

    #[error("Loading sample data timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Namespace not found: {0}")]
    NamespaceNotFound(String),

    #[error("Catalog error: {0}")]
    Backend(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("No execution slot became free within {waited_ms}ms")]
    Exhausted { waited_ms: u64 },

    #[error("Execution pool is closed")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        assert!(SandboxError::from(PoolError::Exhausted { waited_ms: 10 }).is_retryable());
        assert!(SandboxError::from(LoadError::Timeout { timeout_ms: 10 }).is_retryable());
        assert!(!SandboxError::from(PoolError::Closed).is_retryable());
        assert!(!SandboxError::from(LoadError::DuplicateTable("t".into())).is_retryable());
        assert!(!SandboxError::from(NamespaceError::NotFound("ws_x".into())).is_retryable());
    }

    #[test]
    fn test_messages_name_the_offender() {
        let err = LoadError::ValueType {
            table: "employees".into(),
            row: 2,
            column: "salary".into(),
            message: "cannot convert \"abc\" to INTEGER".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("employees") && msg.contains("row 2") && msg.contains("salary"));
    }
}
