//! sqlsandbox-core
//!
//! Runs untrusted read-only SQL against per-session sample data:
//!
//! - [`NamespaceManager`] creates and drops the isolated namespace of a session
//! - [`SampleDataLoader`] provisions an assignment's tables atomically
//! - [`BoundedExecutor`] runs one query under a timeout and a row cap
//! - [`SandboxEngine`] sequences validate → namespace → load → execute → reclaim
//!
//! # Example
//!
//! ```no_run
//! use serde_json::json;
//! use sqlsandbox_commons::{Assignment, ColumnType, TableSpec};
//! use sqlsandbox_configs::SandboxConfig;
//! use sqlsandbox_core::{RunRequest, SandboxEngine};
//!
//! # async fn example() -> Result<(), sqlsandbox_core::SandboxError> {
//! let engine = SandboxEngine::new(&SandboxConfig::default())?;
//! let assignment = Assignment::new(vec![TableSpec::new("employees")
//!     .column("name", ColumnType::Text)
//!     .column("salary", ColumnType::Integer)
//!     .row(vec![json!("B"), json!(60000)])]);
//!
//! let outcome = engine
//!     .run(RunRequest::new(&assignment, "SELECT name FROM employees WHERE salary > 50000"))
//!     .await?;
//! assert_eq!(outcome.result().map(|r| r.row_count), Some(1));
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod error;
pub mod executor;
pub mod loader;
pub mod namespace;
pub mod pool;
pub mod runtime;
pub mod session_factory;

pub use engine::{LifecycleStage, ReclaimPolicy, RunOutcome, RunRequest, RunVerdict, SandboxEngine};
pub use error::{LoadError, NamespaceError, PoolError, SandboxError};
pub use executor::BoundedExecutor;
pub use loader::{LoadSummary, LoadedTable, SampleDataLoader};
pub use namespace::{NamespaceManager, NamespaceReadGuard, NamespaceWriteGuard, TableDescription};
pub use pool::{ConnectionPool, PooledConnection};
pub use runtime::QueryRuntime;
pub use session_factory::SandboxSessionFactory;
