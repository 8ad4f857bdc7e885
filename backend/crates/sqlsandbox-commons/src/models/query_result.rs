//! Uniform result envelope returned for every executed query.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// One result row: column name → value, in projection order.
pub type Row = Map<String, JsonValue>;

/// Outcome of running one query inside a namespace.
///
/// Query-level failures (syntax errors, unknown tables, timeouts) are reported
/// here with `success = false` instead of being raised as errors.
///
/// `row_count` is the number of rows the query produced. When it exceeds the
/// row cap only the first `cap` rows are kept in `rows` and `truncated` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub success: bool,
    #[serde(default)]
    pub rows: Vec<Row>,
    #[serde(default)]
    pub row_count: usize,
    #[serde(rename = "executionTime")]
    pub execution_time_ms: u64,
    #[serde(default)]
    pub truncated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueryResult {
    /// Builds a successful result from already-capped rows and the full row count.
    pub fn success(rows: Vec<Row>, row_count: usize, execution_time: Duration) -> Self {
        let truncated = row_count > rows.len();
        Self {
            success: true,
            rows,
            row_count,
            execution_time_ms: duration_millis(execution_time),
            truncated,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>, execution_time: Duration) -> Self {
        Self {
            success: false,
            rows: Vec::new(),
            row_count: 0,
            execution_time_ms: duration_millis(execution_time),
            truncated: false,
            error: Some(error.into()),
        }
    }

    pub fn execution_time(&self) -> Duration {
        Duration::from_millis(self.execution_time_ms)
    }

    /// Values of the first projected column, in row order.
    pub fn first_column(&self) -> Vec<&JsonValue> {
        self.rows
            .iter()
            .filter_map(|row| row.values().next())
            .collect()
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(name: &str) -> Row {
        let mut row = Row::new();
        row.insert("name".to_string(), json!(name));
        row
    }

    #[test]
    fn test_truncated_only_when_count_exceeds_rows() {
        let full = QueryResult::success(vec![row("A"), row("B")], 2, Duration::from_millis(3));
        assert!(!full.truncated);

        let capped = QueryResult::success(vec![row("A")], 2, Duration::from_millis(3));
        assert!(capped.truncated);
        assert_eq!(capped.row_count, 2);
    }

    #[test]
    fn test_serializes_camel_case_envelope() {
        let result = QueryResult::success(vec![row("B")], 1, Duration::from_millis(12));
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(
            value,
            json!({
                "success": true,
                "rows": [{ "name": "B" }],
                "rowCount": 1,
                "executionTime": 12,
                "truncated": false
            })
        );
    }

    #[test]
    fn test_failure_carries_error() {
        let result = QueryResult::failure("boom", Duration::from_millis(5));
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("boom"));
        assert_eq!(result.execution_time(), Duration::from_millis(5));
    }
}
