//! Sample-data loader
//!
//! Loading happens in two phases:
//!
//! 1. **Stage** (off the async runtime, bounded by the load timeout): sanitize
//!    names, enforce limits, convert every cell to a typed scalar and build one
//!    in-memory table per requested table. Nothing is visible yet.
//! 2. **Commit** (under the namespace write lock): swap the staged tables in.
//!    Each replaced table is recorded, and any failure restores them in reverse
//!    order, so a load either fully lands or leaves the namespace untouched.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use datafusion::arrow::datatypes::{Field, Schema};
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::catalog::{SchemaProvider, TableProvider};
use datafusion::datasource::MemTable;
use datafusion::scalar::ScalarValue;
use serde::Serialize;
use sqlsandbox_commons::conversions::{json_value_to_scalar, scalars_to_array};
use sqlsandbox_commons::{NamespaceName, TableSpec};
use sqlsandbox_configs::LimitsSettings;
use sqlsandbox_sql::sanitize_identifier;

use crate::error::{LoadError, SandboxError};
use crate::namespace::NamespaceManager;
use crate::pool::ConnectionPool;

/// What a successful load put in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadSummary {
    pub tables: Vec<LoadedTable>,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadedTable {
    pub table_name: String,
    pub row_count: usize,
    pub replaced: bool,
}

#[derive(Debug)]
struct StagedTable {
    name: String,
    provider: Arc<dyn TableProvider>,
    row_count: usize,
}

pub struct SampleDataLoader {
    namespaces: Arc<NamespaceManager>,
    pool: ConnectionPool,
    limits: LimitsSettings,
}

impl SampleDataLoader {
    pub fn new(namespaces: Arc<NamespaceManager>, pool: ConnectionPool, limits: LimitsSettings) -> Self {
        Self {
            namespaces,
            pool,
            limits,
        }
    }

    /// Provision `tables` inside `namespace`, replacing same-named tables.
    ///
    /// All-or-nothing: on any error the namespace keeps exactly the tables it
    /// had before the call.
    pub async fn load_tables(
        &self,
        namespace: &NamespaceName,
        tables: &[TableSpec],
    ) -> Result<LoadSummary, SandboxError> {
        let started = Instant::now();
        let timeout = self.limits.load_timeout();
        let timeout_ms = self.limits.load_timeout_ms;

        let _conn = self.pool.acquire().await?;

        let specs = tables.to_vec();
        let limits = self.limits.clone();
        let staging = tokio::task::spawn_blocking(move || stage_tables(&specs, &limits));

        let staged = match tokio::time::timeout(timeout, staging).await {
            Err(_) => return Err(LoadError::Timeout { timeout_ms }.into()),
            Ok(Err(join_err)) => {
                return Err(LoadError::Backend(format!("staging task failed: {}", join_err)).into())
            },
            Ok(Ok(staged)) => staged?,
        };

        let remaining = timeout.saturating_sub(started.elapsed());
        let guard = match tokio::time::timeout(remaining, self.namespaces.write(namespace)).await {
            Err(_) => return Err(LoadError::Timeout { timeout_ms }.into()),
            Ok(Err(_)) => return Err(LoadError::NamespaceNotFound(namespace.to_string()).into()),
            Ok(Ok(guard)) => guard,
        };

        let loaded = commit(guard.schema().as_ref(), staged)?;
        drop(guard);

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        log::debug!(
            "Loaded {} table(s) into {} in {}ms",
            loaded.len(),
            namespace,
            elapsed_ms
        );

        Ok(LoadSummary {
            tables: loaded,
            elapsed_ms,
        })
    }
}

fn stage_tables(specs: &[TableSpec], limits: &LimitsSettings) -> Result<Vec<StagedTable>, LoadError> {
    if specs.len() > limits.max_tables {
        return Err(LoadError::TooManyTables {
            count: specs.len(),
            max: limits.max_tables,
        });
    }

    let mut seen_tables = HashSet::with_capacity(specs.len());
    let mut staged = Vec::with_capacity(specs.len());

    for spec in specs {
        let name = sanitize_identifier(&spec.table_name).map_err(|source| {
            LoadError::InvalidIdentifier {
                kind: "table",
                source,
            }
        })?;
        if !seen_tables.insert(name.clone()) {
            return Err(LoadError::DuplicateTable(name));
        }

        staged.push(stage_table(name, spec, limits)?);
    }

    Ok(staged)
}

fn stage_table(name: String, spec: &TableSpec, limits: &LimitsSettings) -> Result<StagedTable, LoadError> {
    if spec.columns.is_empty() {
        return Err(LoadError::NoColumns(name));
    }
    if spec.columns.len() > limits.max_columns {
        return Err(LoadError::TooManyColumns {
            table: name,
            count: spec.columns.len(),
            max: limits.max_columns,
        });
    }
    if spec.rows.len() > limits.max_rows_per_table {
        return Err(LoadError::TooManyRows {
            table: name,
            count: spec.rows.len(),
            max: limits.max_rows_per_table,
        });
    }

    let mut seen_columns = HashSet::with_capacity(spec.columns.len());
    let mut fields = Vec::with_capacity(spec.columns.len());
    for column in &spec.columns {
        let column_name = sanitize_identifier(&column.column_name).map_err(|source| {
            LoadError::InvalidIdentifier {
                kind: "column",
                source,
            }
        })?;
        if !seen_columns.insert(column_name.clone()) {
            return Err(LoadError::DuplicateColumn {
                table: name,
                column: column_name,
            });
        }
        fields.push(Field::new(column_name, column.data_type.to_arrow_type(), true));
    }

    // Transpose positional rows into typed columns.
    let arity = spec.arity();
    let mut columns: Vec<Vec<ScalarValue>> =
        (0..arity).map(|_| Vec::with_capacity(spec.rows.len())).collect();

    for (row_idx, row) in spec.rows.iter().enumerate() {
        if row.len() != arity {
            return Err(LoadError::ArityMismatch {
                table: name,
                row: row_idx,
                expected: arity,
                actual: row.len(),
            });
        }
        for (col_idx, value) in row.iter().enumerate() {
            let column = &spec.columns[col_idx];
            let scalar = json_value_to_scalar(value, column.data_type).map_err(|e| {
                LoadError::ValueType {
                    table: name.clone(),
                    row: row_idx,
                    column: fields[col_idx].name().clone(),
                    message: e.to_string(),
                }
            })?;
            columns[col_idx].push(scalar);
        }
    }

    let schema = Arc::new(Schema::new(fields));
    let mut arrays = Vec::with_capacity(arity);
    for (field, values) in schema.fields().iter().zip(columns) {
        let array = scalars_to_array(values, field.data_type())
            .map_err(|e| LoadError::Backend(format!("table '{}': {}", name, e)))?;
        arrays.push(array);
    }

    let batch = RecordBatch::try_new(Arc::clone(&schema), arrays)
        .map_err(|e| LoadError::Backend(format!("table '{}': {}", name, e)))?;
    let table = MemTable::try_new(schema, vec![vec![batch]])
        .map_err(|e| LoadError::Backend(format!("table '{}': {}", name, e.strip_backtrace())))?;

    Ok(StagedTable {
        name,
        provider: Arc::new(table),
        row_count: spec.rows.len(),
    })
}

fn commit(schema: &dyn SchemaProvider, staged: Vec<StagedTable>) -> Result<Vec<LoadedTable>, LoadError> {
    let mut undo: Vec<(String, Option<Arc<dyn TableProvider>>)> = Vec::with_capacity(staged.len());
    let mut loaded = Vec::with_capacity(staged.len());

    for table in staged {
        let previous = match schema.deregister_table(&table.name) {
            Ok(previous) => previous,
            Err(e) => {
                rollback(schema, undo);
                return Err(LoadError::Backend(e.strip_backtrace()));
            },
        };
        let replaced = previous.is_some();
        undo.push((table.name.clone(), previous));

        if let Err(e) = schema.register_table(table.name.clone(), table.provider) {
            rollback(schema, undo);
            return Err(LoadError::Backend(e.strip_backtrace()));
        }

        loaded.push(LoadedTable {
            table_name: table.name,
            row_count: table.row_count,
            replaced,
        });
    }

    Ok(loaded)
}

fn rollback(schema: &dyn SchemaProvider, undo: Vec<(String, Option<Arc<dyn TableProvider>>)>) {
    for (name, previous) in undo.into_iter().rev() {
        if let Err(e) = schema.deregister_table(&name) {
            log::warn!("Rollback: failed to remove table {}: {}", name, e);
        }
        if let Some(previous) = previous {
            if let Err(e) = schema.register_table(name.clone(), previous) {
                log::warn!("Rollback: failed to restore table {}: {}", name, e);
            }
        }
    }
}
