//! # sqlsandbox-commons
//!
//! Shared types and utilities for the sqlsandbox crates.
//!
//! ## Type-Safe Wrappers
//!
//! - `SessionId`: caller-supplied or generated session identifier
//! - `NamespaceName`: the isolated namespace a session's tables live in
//!
//! ## Models
//!
//! - `TableSpec` / `ColumnSpec` / `ColumnType`: sample tables an assignment provisions
//! - `QueryResult`: the uniform result envelope of one executed query
//! - `ExpectedOutput`: the comparison descriptor supplied with an assignment
//!
//! ## Example Usage
//!
//! ```rust
//! use sqlsandbox_commons::models::{NamespaceName, SessionId};
//!
//! let session = SessionId::new("3f2c9a1e-7b7d-4c53-9a0e-1b2d3c4e5f60").unwrap();
//! let namespace = NamespaceName::for_session(&session);
//! assert!(namespace.as_str().starts_with("ws_"));
//! ```

pub mod conversions;
pub mod errors;
pub mod models;

pub use errors::{CommonError, Result};
pub use models::{
    Assignment, ColumnSpec, ColumnType, ExpectedOutput, ExpectedOutputKind, NamespaceName,
    QueryResult, Row, SessionId, TableSpec,
};
