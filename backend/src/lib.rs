//! sqlsandbox
//!
//! Runs untrusted, read-only SQL against per-session sample data. The
//! engine lives in `sqlsandbox-core`; this crate adds process bootstrap,
//! logging and a JSON-lines runner.

pub mod lifecycle;
pub mod logging;
pub mod runner;

pub use sqlsandbox_commons as commons;
pub use sqlsandbox_configs as configs;
pub use sqlsandbox_core as engine;
pub use sqlsandbox_sql as sql;
