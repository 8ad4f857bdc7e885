//! Expected-output descriptor and result comparison.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::{QueryResult, Row};

/// How an assignment's expected value is compared against a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedOutputKind {
    /// Full row set, in order: `value` is an array of objects.
    Table,
    /// Exactly one row whose first column equals `value`.
    SingleValue,
    /// First-column values, in order: `value` is an array.
    Column,
    /// Row count equals `value`.
    Count,
    /// Exactly one row equal to `value` (an object).
    Row,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectedOutput {
    #[serde(rename = "type", alias = "kind")]
    pub kind: ExpectedOutputKind,
    #[serde(default)]
    pub value: JsonValue,
}

impl ExpectedOutput {
    pub fn new(kind: ExpectedOutputKind, value: JsonValue) -> Self {
        Self { kind, value }
    }

    /// Whether `result` satisfies this descriptor. Failed results never match.
    pub fn matches(&self, result: &QueryResult) -> bool {
        if !result.success {
            return false;
        }

        match self.kind {
            ExpectedOutputKind::Count => self
                .value
                .as_f64()
                .is_some_and(|expected| expected == result.row_count as f64),
            ExpectedOutputKind::SingleValue => {
                result.rows.len() == 1
                    && result
                        .first_column()
                        .first()
                        .is_some_and(|actual| values_equal(actual, &self.value))
            },
            ExpectedOutputKind::Column => match self.value.as_array() {
                Some(expected) => {
                    let actual = result.first_column();
                    actual.len() == expected.len()
                        && actual.iter().zip(expected).all(|(a, e)| values_equal(a, e))
                },
                None => false,
            },
            ExpectedOutputKind::Table => match self.value.as_array() {
                Some(expected) => {
                    result.rows.len() == expected.len()
                        && result.rows.iter().zip(expected).all(|(a, e)| row_equals(a, e))
                },
                None => false,
            },
            ExpectedOutputKind::Row => {
                result.rows.len() == 1 && row_equals(&result.rows[0], &self.value)
            },
        }
    }
}

fn row_equals(actual: &Row, expected: &JsonValue) -> bool {
    match expected.as_object() {
        Some(expected) => {
            actual.len() == expected.len()
                && expected
                    .iter()
                    .all(|(key, value)| actual.get(key).is_some_and(|a| values_equal(a, value)))
        },
        None => false,
    }
}

/// Structural equality where numbers compare by value (`60000` == `60000.0`)
/// and numeric strings compare equal to the number they spell.
pub fn values_equal(actual: &JsonValue, expected: &JsonValue) -> bool {
    match (actual, expected) {
        (JsonValue::Number(a), JsonValue::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) => a == b,
            _ => floats_equal(a.as_f64(), b.as_f64()),
        },
        (JsonValue::String(s), JsonValue::Number(n)) | (JsonValue::Number(n), JsonValue::String(s)) => {
            floats_equal(s.trim().parse::<f64>().ok(), n.as_f64())
        },
        (JsonValue::Array(a), JsonValue::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        },
        (JsonValue::Object(a), JsonValue::Object(b)) => {
            a.len() == b.len()
                && b.iter().all(|(key, value)| a.get(key).is_some_and(|x| values_equal(x, value)))
        },
        _ => actual == expected,
    }
}

fn floats_equal(a: Option<f64>, b: Option<f64>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0),
        _ => false,
    }
}
