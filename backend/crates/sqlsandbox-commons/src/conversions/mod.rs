//! Value conversions between assignment JSON, Arrow and result JSON.
//!
//! - `json_value_to_scalar` - typed load of one sample-table cell
//! - `scalars_to_array` - column of typed scalars → Arrow array
//! - `scalar_value_to_json` / `record_batch_to_rows` - query output → JSON rows
//!
//! ```rust,ignore
//! use sqlsandbox_commons::conversions::{json_value_to_scalar, scalar_value_to_json};
//! use sqlsandbox_commons::ColumnType;
//!
//! let scalar = json_value_to_scalar(&serde_json::json!("2024-01-15"), ColumnType::Date)?;
//! assert_eq!(scalar_value_to_json(&scalar), serde_json::json!("2024-01-15"));
//! ```

pub mod scalar_json;

pub use scalar_json::{
    json_value_to_scalar, record_batch_to_rows, scalar_value_to_json, scalars_to_array,
};
