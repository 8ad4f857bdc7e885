//! JSON ↔ ScalarValue conversion for sample-table cells and query output.
//!
//! Loading goes JSON → `ScalarValue` → Arrow array, so every cell is bound as a
//! typed value and no SQL text is ever produced from assignment data. Output
//! goes Arrow → `ScalarValue` → JSON through [`scalar_value_to_json`].
//!
//! # Output format
//!
//! - integers (including Int64) and finite floats as JSON numbers
//! - NaN / infinite floats as `null`
//! - DATE as `"YYYY-MM-DD"`, TIMESTAMP as `"YYYY-MM-DD HH:MM:SS[.ffffff]"`
//! - anything else through the scalar's display form

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use datafusion::arrow::array::{new_empty_array, ArrayRef};
use datafusion::arrow::datatypes::DataType;
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::scalar::ScalarValue;
use serde_json::{Number, Value as JsonValue};

use crate::errors::{CommonError, Result};
use crate::models::{ColumnType, Row};

/// Days between 0001-01-01 (CE day 1) and 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_OUTPUT_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
const TIMESTAMP_INPUT_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Converts one assignment cell into a typed scalar for `column_type`.
///
/// `null` always yields a typed NULL. Lenient coercions mirror what a typed SQL
/// insert would accept (numeric strings for numbers, `"t"`/`"f"` and `0`/`1`
/// for booleans, numbers and booleans for text).
pub fn json_value_to_scalar(value: &JsonValue, column_type: ColumnType) -> Result<ScalarValue> {
    if value.is_null() {
        return ScalarValue::try_from(&column_type.to_arrow_type())
            .map_err(|e| CommonError::internal(format!("typed NULL for {}: {}", column_type, e)));
    }

    match column_type {
        ColumnType::Integer => json_to_i64(value).map(|v| ScalarValue::Int64(Some(v))),
        ColumnType::Real => json_to_f64(value).map(|v| ScalarValue::Float64(Some(v))),
        ColumnType::Boolean => json_to_bool(value).map(|v| ScalarValue::Boolean(Some(v))),
        ColumnType::Text | ColumnType::Varchar => {
            json_to_text(value).map(|v| ScalarValue::Utf8(Some(v)))
        },
        ColumnType::Date => json_to_date32(value).map(|v| ScalarValue::Date32(Some(v))),
        ColumnType::Timestamp => {
            json_to_timestamp_micros(value).map(|v| ScalarValue::TimestampMicrosecond(Some(v), None))
        },
    }
}

fn mismatch(value: &JsonValue, expected: &str) -> CommonError {
    CommonError::conversion(format!("cannot convert {} to {}", value, expected))
}

fn json_to_i64(value: &JsonValue) -> Result<i64> {
    match value {
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => {
                    Ok(f as i64)
                },
                _ => Err(mismatch(value, "INTEGER")),
            }
        },
        JsonValue::String(s) => s.trim().parse::<i64>().map_err(|_| mismatch(value, "INTEGER")),
        _ => Err(mismatch(value, "INTEGER")),
    }
}

fn json_to_f64(value: &JsonValue) -> Result<f64> {
    match value {
        JsonValue::Number(n) => n.as_f64().ok_or_else(|| mismatch(value, "REAL")),
        JsonValue::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .ok_or_else(|| mismatch(value, "REAL")),
        _ => Err(mismatch(value, "REAL")),
    }
}

fn json_to_bool(value: &JsonValue) -> Result<bool> {
    match value {
        JsonValue::Bool(b) => Ok(*b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(mismatch(value, "BOOLEAN")),
        },
        JsonValue::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" => Ok(true),
            "false" | "f" => Ok(false),
            _ => Err(mismatch(value, "BOOLEAN")),
        },
        _ => Err(mismatch(value, "BOOLEAN")),
    }
}

fn json_to_text(value: &JsonValue) -> Result<String> {
    match value {
        JsonValue::String(s) => Ok(s.clone()),
        JsonValue::Number(n) => Ok(n.to_string()),
        JsonValue::Bool(b) => Ok(b.to_string()),
        _ => Err(mismatch(value, "TEXT")),
    }
}

fn json_to_date32(value: &JsonValue) -> Result<i32> {
    let text = value.as_str().ok_or_else(|| mismatch(value, "DATE"))?;
    let date = NaiveDate::parse_from_str(text.trim(), DATE_FORMAT)
        .map_err(|_| mismatch(value, "DATE (expected YYYY-MM-DD)"))?;
    Ok(date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
}

fn json_to_timestamp_micros(value: &JsonValue) -> Result<i64> {
    let text = value.as_str().ok_or_else(|| mismatch(value, "TIMESTAMP"))?.trim();

    if let Ok(with_offset) = DateTime::parse_from_rfc3339(text) {
        return Ok(with_offset.naive_utc().and_utc().timestamp_micros());
    }

    for format in TIMESTAMP_INPUT_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(naive.and_utc().timestamp_micros());
        }
    }

    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().timestamp_micros())
        .ok_or_else(|| mismatch(value, "TIMESTAMP"))
}

/// Builds one Arrow column from already-typed scalars.
///
/// An empty column still gets the right type so empty tables keep their schema.
pub fn scalars_to_array(values: Vec<ScalarValue>, data_type: &DataType) -> Result<ArrayRef> {
    if values.is_empty() {
        return Ok(new_empty_array(data_type));
    }
    ScalarValue::iter_to_array(values)
        .map_err(|e| CommonError::conversion(format!("failed to build {} column: {}", data_type, e)))
}

/// Converts a query output scalar to its JSON form. Never fails: values with no
/// natural JSON shape fall back to their display string.
pub fn scalar_value_to_json(value: &ScalarValue) -> JsonValue {
    if value.is_null() {
        return JsonValue::Null;
    }

    match value {
        ScalarValue::Boolean(Some(b)) => JsonValue::Bool(*b),
        ScalarValue::Int8(Some(i)) => JsonValue::from(*i),
        ScalarValue::Int16(Some(i)) => JsonValue::from(*i),
        ScalarValue::Int32(Some(i)) => JsonValue::from(*i),
        ScalarValue::Int64(Some(i)) => JsonValue::from(*i),
        ScalarValue::UInt8(Some(i)) => JsonValue::from(*i),
        ScalarValue::UInt16(Some(i)) => JsonValue::from(*i),
        ScalarValue::UInt32(Some(i)) => JsonValue::from(*i),
        ScalarValue::UInt64(Some(i)) => JsonValue::from(*i),
        ScalarValue::Float32(Some(f)) => float_to_json(*f as f64),
        ScalarValue::Float64(Some(f)) => float_to_json(*f),
        ScalarValue::Utf8(Some(s))
        | ScalarValue::LargeUtf8(Some(s))
        | ScalarValue::Utf8View(Some(s)) => JsonValue::String(s.clone()),
        ScalarValue::Date32(Some(days)) => {
            UNIX_EPOCH_DAYS_FROM_CE
                .checked_add(*days)
                .and_then(NaiveDate::from_num_days_from_ce_opt)
                .map(|date| JsonValue::String(date.format(DATE_FORMAT).to_string()))
                .unwrap_or_else(|| JsonValue::String(value.to_string()))
        },
        ScalarValue::TimestampSecond(Some(ts), _) => {
            timestamp_to_json(DateTime::from_timestamp(*ts, 0), value)
        },
        ScalarValue::TimestampMillisecond(Some(ts), _) => {
            timestamp_to_json(DateTime::from_timestamp_millis(*ts), value)
        },
        ScalarValue::TimestampMicrosecond(Some(ts), _) => {
            timestamp_to_json(DateTime::from_timestamp_micros(*ts), value)
        },
        ScalarValue::TimestampNanosecond(Some(ts), _) => {
            timestamp_to_json(Some(DateTime::from_timestamp_nanos(*ts)), value)
        },
        ScalarValue::Decimal128(Some(v), _precision, scale) => {
            float_to_json(*v as f64 / 10f64.powi(i32::from(*scale)))
        },
        other => JsonValue::String(other.to_string()),
    }
}

fn float_to_json(f: f64) -> JsonValue {
    Number::from_f64(f).map(JsonValue::Number).unwrap_or(JsonValue::Null)
}

fn timestamp_to_json(
    datetime: Option<DateTime<chrono::Utc>>,
    original: &ScalarValue,
) -> JsonValue {
    match datetime {
        Some(dt) => JsonValue::String(dt.naive_utc().format(TIMESTAMP_OUTPUT_FORMAT).to_string()),
        None => JsonValue::String(original.to_string()),
    }
}

/// Converts every row of a batch into a JSON row keyed by output column name,
/// in projection order. Callers slice the batch first to apply a row cap.
/// Columns are keyed by their unqualified output name. When two output
/// columns share a name (`SELECT * FROM a JOIN b ON a.id = b.id`), the later
/// one overwrites the earlier one in each row; callers that need both must
/// alias them.
pub fn record_batch_to_rows(batch: &RecordBatch) -> Result<Vec<Row>> {
    let schema = batch.schema();
    let mut rows = Vec::with_capacity(batch.num_rows());

    for row_idx in 0..batch.num_rows() {
        let mut row = Row::with_capacity(batch.num_columns());
        for (col_idx, field) in schema.fields().iter().enumerate() {
            let scalar = ScalarValue::try_from_array(batch.column(col_idx), row_idx).map_err(|e| {
                CommonError::conversion(format!("column '{}' row {}: {}", field.name(), row_idx, e))
            })?;
            if row.insert(field.name().clone(), scalar_value_to_json(&scalar)).is_some() && row_idx == 0 {
                log::debug!("Duplicate output column '{}' overwrites an earlier value", field.name());
            }
        }
        rows.push(row);
    }

    Ok(rows)
}
