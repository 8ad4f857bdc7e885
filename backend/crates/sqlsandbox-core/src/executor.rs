//! Bounded query execution
//!
//! Runs one admitted query inside one namespace under a wall-clock timeout
//! and a row cap. Failures of the query itself come back as
//! `QueryResult { success: false }`; only infrastructure problems (pool,
//! missing namespace) are returned as `Err`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use datafusion::error::DataFusionError;
use datafusion::execution::context::SessionContext;
use futures::StreamExt;
use sqlsandbox_commons::conversions::record_batch_to_rows;
use sqlsandbox_commons::{NamespaceName, QueryResult, Row};
use sqlsandbox_configs::LimitsSettings;
use sqlsandbox_sql::{query_for_log, QueryValidator, ValidationVerdict, DEFAULT_LOG_QUERY_CHARS};

use crate::error::{NamespaceError, SandboxError};
use crate::namespace::NamespaceManager;
use crate::pool::ConnectionPool;
use crate::runtime::QueryRuntime;
use crate::session_factory::SandboxSessionFactory;

pub struct BoundedExecutor {
    namespaces: Arc<NamespaceManager>,
    pool: ConnectionPool,
    sessions: SandboxSessionFactory,
    runtime: QueryRuntime,
    validator: QueryValidator,
    max_result_rows: usize,
    query_timeout: Duration,
    slow_query_threshold: Duration,
}

impl BoundedExecutor {
    pub fn new(
        namespaces: Arc<NamespaceManager>,
        pool: ConnectionPool,
        sessions: SandboxSessionFactory,
        runtime: QueryRuntime,
        validator: QueryValidator,
        limits: &LimitsSettings,
    ) -> Self {
        Self {
            namespaces,
            pool,
            sessions,
            runtime,
            validator,
            max_result_rows: limits.max_result_rows,
            query_timeout: limits.query_timeout(),
            slow_query_threshold: Duration::MAX,
        }
    }

    /// Queries slower than `threshold` are logged at warn level.
    pub fn with_slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_threshold = threshold;
        self
    }

    pub fn max_result_rows(&self) -> usize {
        self.max_result_rows
    }

    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    /// Run `query` inside `namespace`.
    ///
    /// The query is validated again here; a rejection is reported as a failed
    /// result without touching the namespace. The plan runs on the query
    /// runtime while the deadline is kept on the caller's runtime, so a
    /// timeout is reported on time even when the plan never yields. Elapsed
    /// time is measured from dispatch to completion or failure.
    pub async fn execute(&self, namespace: &NamespaceName, query: &str) -> Result<QueryResult, SandboxError> {
        let received = Instant::now();
        if let ValidationVerdict::Rejected { reason } = self.validator.validate(query) {
            return Ok(QueryResult::failure(reason, received.elapsed()));
        }

        let _conn = self.pool.acquire().await?;
        let guard = self.namespaces.read(namespace).await?;

        let ctx = self
            .sessions
            .create_session(namespace, guard.schema())
            .map_err(|e| NamespaceError::Backend(e.strip_backtrace()))?;

        let dispatched = Instant::now();
        let mut handle = self
            .runtime
            .spawn(run_capped(ctx, query.to_string(), self.max_result_rows))
            .ok_or_else(|| SandboxError::Runtime("query runtime is shut down".to_string()))?;

        let result = match tokio::time::timeout(self.query_timeout, &mut handle).await {
            Err(_) => {
                handle.abort();
                log::warn!(
                    "Query in {} timed out after {}ms: {}",
                    namespace,
                    self.query_timeout.as_millis(),
                    query_for_log(query, DEFAULT_LOG_QUERY_CHARS)
                );
                QueryResult::failure(
                    format!(
                        "Query execution timed out after {}ms",
                        self.query_timeout.as_millis()
                    ),
                    dispatched.elapsed(),
                )
            },
            Ok(Err(join_err)) => {
                log::error!("Query task in {} failed: {}", namespace, join_err);
                QueryResult::failure(format!("Query execution failed: {}", join_err), dispatched.elapsed())
            },
            Ok(Ok(Err(df_err))) => {
                let message = df_err.strip_backtrace();
                log::debug!(
                    "Query in {} failed: {} ({})",
                    namespace,
                    message,
                    query_for_log(query, DEFAULT_LOG_QUERY_CHARS)
                );
                QueryResult::failure(message, dispatched.elapsed())
            },
            Ok(Ok(Ok((rows, row_count)))) => QueryResult::success(rows, row_count, dispatched.elapsed()),
        };
        drop(guard);

        let elapsed = result.execution_time();
        if elapsed >= self.slow_query_threshold {
            log::warn!(
                "Slow query in {} ({}ms): {}",
                namespace,
                elapsed.as_millis(),
                query_for_log(query, DEFAULT_LOG_QUERY_CHARS)
            );
        }

        Ok(result)
    }
}

/// Plans and streams the query, keeping the first `cap` rows as JSON and only
/// counting the rest.
async fn run_capped(
    ctx: SessionContext,
    sql: String,
    cap: usize,
) -> Result<(Vec<Row>, usize), DataFusionError> {
    let df = ctx
        .sql_with_options(&sql, SandboxSessionFactory::read_only_options())
        .await?;
    let mut stream = df.execute_stream().await?;

    let mut rows = Vec::new();
    let mut row_count = 0usize;

    while let Some(batch) = stream.next().await {
        let batch = batch?;
        let remaining = cap.saturating_sub(rows.len());
        if remaining > 0 {
            let take = remaining.min(batch.num_rows());
            let converted = record_batch_to_rows(&batch.slice(0, take))
                .map_err(|e| DataFusionError::External(Box::new(e)))?;
            rows.extend(converted);
        }
        row_count += batch.num_rows();
    }

    Ok((rows, row_count))
}
