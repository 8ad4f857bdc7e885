//! Closed set of column types sample tables may declare.

use std::fmt;
use std::str::FromStr;

use datafusion::arrow::datatypes::{DataType as ArrowDataType, TimeUnit};
use serde::{Deserialize, Serialize};

use crate::errors::CommonError;

/// Declared type of a sample-table column.
///
/// Matches the types assignment authors are allowed to use. Each maps onto one
/// Arrow type in the backing store:
/// - INTEGER → Int64
/// - TEXT, VARCHAR → Utf8
/// - REAL → Float64
/// - BOOLEAN → Boolean
/// - DATE → Date32 (days since epoch)
/// - TIMESTAMP → Timestamp(Microsecond, no zone)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ColumnType {
    Integer,
    Text,
    Real,
    Boolean,
    Date,
    Timestamp,
    Varchar,
}

impl ColumnType {
    pub const ALL: [ColumnType; 7] = [
        ColumnType::Integer,
        ColumnType::Text,
        ColumnType::Real,
        ColumnType::Boolean,
        ColumnType::Date,
        ColumnType::Timestamp,
        ColumnType::Varchar,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Text => "TEXT",
            ColumnType::Real => "REAL",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Date => "DATE",
            ColumnType::Timestamp => "TIMESTAMP",
            ColumnType::Varchar => "VARCHAR",
        }
    }

    /// Arrow type used to store values of this column.
    pub fn to_arrow_type(&self) -> ArrowDataType {
        match self {
            ColumnType::Integer => ArrowDataType::Int64,
            ColumnType::Text | ColumnType::Varchar => ArrowDataType::Utf8,
            ColumnType::Real => ArrowDataType::Float64,
            ColumnType::Boolean => ArrowDataType::Boolean,
            ColumnType::Date => ArrowDataType::Date32,
            ColumnType::Timestamp => ArrowDataType::Timestamp(TimeUnit::Microsecond, None),
        }
    }

    /// Best-effort reverse mapping used when describing a namespace.
    ///
    /// Utf8 always reports TEXT since VARCHAR is stored identically.
    pub fn from_arrow_type(arrow_type: &ArrowDataType) -> Option<Self> {
        match arrow_type {
            ArrowDataType::Int64 => Some(ColumnType::Integer),
            ArrowDataType::Utf8 => Some(ColumnType::Text),
            ArrowDataType::Float64 => Some(ColumnType::Real),
            ArrowDataType::Boolean => Some(ColumnType::Boolean),
            ArrowDataType::Date32 => Some(ColumnType::Date),
            ArrowDataType::Timestamp(TimeUnit::Microsecond, None) => Some(ColumnType::Timestamp),
            _ => None,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        ColumnType::ALL
            .iter()
            .copied()
            .find(|ty| ty.as_str() == upper)
            .ok_or_else(|| {
                CommonError::invalid_input(format!(
                    "Unsupported column type '{}'. Must be one of: {}",
                    s,
                    ColumnType::ALL.map(|ty| ty.as_str()).join(", ")
                ))
            })
    }
}

impl TryFrom<String> for ColumnType {
    type Error = CommonError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ColumnType> for String {
    fn from(ty: ColumnType) -> Self {
        ty.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("integer".parse::<ColumnType>().unwrap(), ColumnType::Integer);
        assert_eq!(" Varchar ".parse::<ColumnType>().unwrap(), ColumnType::Varchar);
    }

    #[test]
    fn test_rejects_types_outside_closed_set() {
        let err = "BLOB".parse::<ColumnType>().unwrap_err();
        assert!(err.to_string().contains("Unsupported column type 'BLOB'"));
        assert!("INTEGER; DROP TABLE x".parse::<ColumnType>().is_err());
    }

    #[test]
    fn test_arrow_mapping_round_trips_except_varchar() {
        for ty in ColumnType::ALL {
            let back = ColumnType::from_arrow_type(&ty.to_arrow_type()).unwrap();
            match ty {
                ColumnType::Varchar => assert_eq!(back, ColumnType::Text),
                other => assert_eq!(back, other),
            }
        }
    }
}
