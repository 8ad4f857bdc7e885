//! Declarative description of the sample tables an assignment provisions.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::{ColumnType, ExpectedOutput};

/// One column of a sample table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSpec {
    #[serde(alias = "column_name", alias = "name")]
    pub column_name: String,
    #[serde(alias = "data_type", alias = "type")]
    pub data_type: ColumnType,
}

impl ColumnSpec {
    pub fn new(column_name: impl Into<String>, data_type: ColumnType) -> Self {
        Self {
            column_name: column_name.into(),
            data_type,
        }
    }
}

/// A sample table: name, ordered columns and positional rows.
///
/// Every row must have exactly one value per column; `null` is allowed in any
/// position. The loader enforces this (see `sqlsandbox-core::loader`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSpec {
    #[serde(alias = "table_name", alias = "name")]
    pub table_name: String,
    pub columns: Vec<ColumnSpec>,
    #[serde(default)]
    pub rows: Vec<Vec<JsonValue>>,
}

impl TableSpec {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Appends a column (builder style).
    pub fn column(mut self, name: impl Into<String>, data_type: ColumnType) -> Self {
        self.columns.push(ColumnSpec::new(name, data_type));
        self
    }

    /// Appends a row (builder style).
    pub fn row(mut self, values: Vec<JsonValue>) -> Self {
        self.rows.push(values);
        self
    }

    pub fn arity(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.column_name.as_str())
    }
}

/// Assignment data consumed from the assignment store.
///
/// Only the sample tables and the opaque expected-output descriptor matter to
/// the sandbox; titles, questions and tags stay with the collaborator.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    #[serde(default, alias = "sample_tables", alias = "tableSpecs")]
    pub sample_tables: Vec<TableSpec>,
    #[serde(default, alias = "expected_output", skip_serializing_if = "Option::is_none")]
    pub expected_output: Option<ExpectedOutput>,
}

impl Assignment {
    pub fn new(sample_tables: Vec<TableSpec>) -> Self {
        Self {
            sample_tables,
            expected_output: None,
        }
    }

    pub fn with_expected_output(mut self, expected: ExpectedOutput) -> Self {
        self.expected_output = Some(expected);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserializes_assignment_store_shape() {
        let raw = json!({
            "title": "Find High Salary Employees",
            "sampleTables": [{
                "tableName": "employees",
                "columns": [
                    { "columnName": "id", "dataType": "INTEGER" },
                    { "columnName": "name", "dataType": "TEXT" }
                ],
                "rows": [[1, "Alice"], [2, null]]
            }],
            "expectedOutput": { "type": "count", "value": 2 }
        });

        let assignment: Assignment = serde_json::from_value(raw).unwrap();
        assert_eq!(assignment.sample_tables.len(), 1);
        let table = &assignment.sample_tables[0];
        assert_eq!(table.table_name, "employees");
        assert_eq!(table.arity(), 2);
        assert_eq!(table.rows[1][1], JsonValue::Null);
        assert!(assignment.expected_output.is_some());
    }

    #[test]
    fn test_rows_default_to_empty() {
        let raw = json!({
            "tableName": "empty",
            "columns": [{ "columnName": "id", "dataType": "INTEGER" }]
        });
        let table: TableSpec = serde_json::from_value(raw).unwrap();
        assert!(table.rows.is_empty());
    }

    #[test]
    fn test_unknown_column_type_is_rejected() {
        let raw = json!({
            "tableName": "t",
            "columns": [{ "columnName": "blob", "dataType": "BYTEA" }]
        });
        assert!(serde_json::from_value::<TableSpec>(raw).is_err());
    }
}
