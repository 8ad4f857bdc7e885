//! Sandbox lifecycle orchestration
//!
//! One [`SandboxEngine::run`] call drives a request through
//! `Start → Validated → NamespaceReady → DataLoaded → Executed → (Reclaimed | Retained)`,
//! ending in `Failed` when it cannot complete. Every call yields exactly one
//! of: a rejection (data), an infrastructure error (`Err`), or an executed
//! result (data, possibly `success: false`).

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use sqlsandbox_commons::{Assignment, NamespaceName, QueryResult, SessionId};
use sqlsandbox_configs::{NamespaceSettings, SandboxConfig};
use sqlsandbox_sql::{QueryValidator, ValidationMode, ValidationVerdict};
use tokio::task::JoinHandle;

use crate::error::SandboxError;
use crate::executor::BoundedExecutor;
use crate::loader::{LoadSummary, SampleDataLoader};
use crate::namespace::{spawn_idle_sweeper, NamespaceManager, TableDescription};
use crate::pool::ConnectionPool;
use crate::runtime::QueryRuntime;
use crate::session_factory::SandboxSessionFactory;

/// What happens to the namespace after the query ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReclaimPolicy {
    /// Keep it so later calls with the same session reuse it.
    #[default]
    Retain,
    /// Drop it right after execution.
    Reclaim,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStage {
    Start,
    Validated,
    NamespaceReady,
    DataLoaded,
    Executed,
    Reclaimed,
    Retained,
    Failed,
}

impl LifecycleStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleStage::Start => "START",
            LifecycleStage::Validated => "VALIDATED",
            LifecycleStage::NamespaceReady => "NAMESPACE_READY",
            LifecycleStage::DataLoaded => "DATA_LOADED",
            LifecycleStage::Executed => "EXECUTED",
            LifecycleStage::Reclaimed => "RECLAIMED",
            LifecycleStage::Retained => "RETAINED",
            LifecycleStage::Failed => "FAILED",
        }
    }
}

impl fmt::Display for LifecycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One "run this query for this assignment, in this session" call.
#[derive(Debug, Clone)]
pub struct RunRequest<'a> {
    pub session_id: Option<SessionId>,
    pub assignment: &'a Assignment,
    pub query: &'a str,
    pub reclaim: ReclaimPolicy,
}

impl<'a> RunRequest<'a> {
    pub fn new(assignment: &'a Assignment, query: &'a str) -> Self {
        Self {
            session_id: None,
            assignment,
            query,
            reclaim: ReclaimPolicy::Retain,
        }
    }

    pub fn with_session(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    pub fn with_reclaim(mut self, reclaim: ReclaimPolicy) -> Self {
        self.reclaim = reclaim;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunVerdict {
    /// The query never ran.
    Rejected { reason: String },
    /// The query ran; `result.success` says whether it succeeded.
    /// `is_correct` is set when the assignment has an expected output and the
    /// query succeeded.
    Executed {
        result: QueryResult,
        #[serde(rename = "isCorrect", skip_serializing_if = "Option::is_none")]
        is_correct: Option<bool>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutcome {
    pub session_id: SessionId,
    pub namespace: Option<NamespaceName>,
    pub stage: LifecycleStage,
    pub verdict: RunVerdict,
}

impl RunOutcome {
    pub fn result(&self) -> Option<&QueryResult> {
        match &self.verdict {
            RunVerdict::Executed { result, .. } => Some(result),
            RunVerdict::Rejected { .. } => None,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self.verdict, RunVerdict::Rejected { .. })
    }
}

pub struct SandboxEngine {
    namespaces: Arc<NamespaceManager>,
    pool: ConnectionPool,
    validator: QueryValidator,
    loader: SampleDataLoader,
    executor: BoundedExecutor,
    namespace_settings: NamespaceSettings,
}

impl SandboxEngine {
    pub fn new(config: &SandboxConfig) -> Result<Self, SandboxError> {
        let mode: ValidationMode = config
            .validation
            .mode
            .parse()
            .map_err(SandboxError::InvalidConfig)?;
        let validator =
            QueryValidator::new(mode).with_max_query_length(config.validation.max_query_length);

        let namespaces = Arc::new(NamespaceManager::new());
        let pool = ConnectionPool::new(config.pool.max_connections, config.pool.acquire_timeout());
        let loader = SampleDataLoader::new(Arc::clone(&namespaces), pool.clone(), config.limits.clone());
        let runtime = QueryRuntime::new(config.datafusion.execution_threads)
            .map_err(|e| SandboxError::Runtime(format!("failed to start query runtime: {}", e)))?;
        let executor = BoundedExecutor::new(
            Arc::clone(&namespaces),
            pool.clone(),
            SandboxSessionFactory::new(&config.datafusion),
            runtime,
            validator,
            &config.limits,
        )
        .with_slow_query_threshold(std::time::Duration::from_millis(
            config.logging.slow_query_threshold_ms,
        ));

        log::info!(
            "Sandbox engine ready: validation={}, pool={}, cap={} rows, timeout={}ms",
            mode,
            pool.size(),
            config.limits.max_result_rows,
            config.limits.query_timeout_ms
        );

        Ok(Self {
            namespaces,
            pool,
            validator,
            loader,
            executor,
            namespace_settings: config.namespaces.clone(),
        })
    }

    pub fn namespaces(&self) -> &Arc<NamespaceManager> {
        &self.namespaces
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    pub fn loader(&self) -> &SampleDataLoader {
        &self.loader
    }

    pub fn executor(&self) -> &BoundedExecutor {
        &self.executor
    }

    pub fn validate(&self, query: &str) -> ValidationVerdict {
        self.validator.validate(query)
    }

    /// Parse a caller-supplied session id.
    pub fn parse_session(raw: &str) -> Result<SessionId, SandboxError> {
        SessionId::new(raw).map_err(|e| SandboxError::InvalidSession(e.to_string()))
    }

    pub async fn run(&self, request: RunRequest<'_>) -> Result<RunOutcome, SandboxError> {
        let session_id = request.session_id.unwrap_or_else(SessionId::generate);
        let mut stage = LifecycleStage::Start;
        log::debug!("[{}] {}", session_id, stage);

        if let ValidationVerdict::Rejected { reason } = self.validator.validate(request.query) {
            advance(&session_id, &mut stage, LifecycleStage::Failed);
            return Ok(RunOutcome {
                session_id,
                namespace: None,
                stage,
                verdict: RunVerdict::Rejected { reason },
            });
        }
        advance(&session_id, &mut stage, LifecycleStage::Validated);

        let namespace = match self.namespaces.ensure_namespace(&session_id) {
            Ok(namespace) => namespace,
            Err(e) => return Err(fail(&session_id, &mut stage, e.into())),
        };
        advance(&session_id, &mut stage, LifecycleStage::NamespaceReady);

        if let Err(e) = self.loader.load_tables(&namespace, &request.assignment.sample_tables).await {
            return Err(fail(&session_id, &mut stage, e));
        }
        advance(&session_id, &mut stage, LifecycleStage::DataLoaded);

        let result = match self.executor.execute(&namespace, request.query).await {
            Ok(result) => result,
            Err(e) => return Err(fail(&session_id, &mut stage, e)),
        };
        advance(&session_id, &mut stage, LifecycleStage::Executed);

        let is_correct = match (&request.assignment.expected_output, result.success) {
            (Some(expected), true) => Some(expected.matches(&result)),
            _ => None,
        };

        match request.reclaim {
            ReclaimPolicy::Retain => advance(&session_id, &mut stage, LifecycleStage::Retained),
            ReclaimPolicy::Reclaim => match self.namespaces.destroy_namespace(&namespace).await {
                Ok(_) => advance(&session_id, &mut stage, LifecycleStage::Reclaimed),
                Err(e) => {
                    log::warn!("[{}] Failed to reclaim {}: {}", session_id, namespace, e);
                    advance(&session_id, &mut stage, LifecycleStage::Retained);
                },
            },
        }

        Ok(RunOutcome {
            session_id,
            namespace: Some(namespace),
            stage,
            verdict: RunVerdict::Executed { result, is_correct },
        })
    }

    /// Load an assignment into the session's namespace without running a
    /// query.
    pub async fn prepare(
        &self,
        session_id: &SessionId,
        assignment: &Assignment,
    ) -> Result<(NamespaceName, LoadSummary), SandboxError> {
        let namespace = self.namespaces.ensure_namespace(session_id)?;
        let summary = self.loader.load_tables(&namespace, &assignment.sample_tables).await?;
        Ok((namespace, summary))
    }

    /// Drop the session's namespace. Returns whether one existed.
    pub async fn reclaim(&self, session_id: &SessionId) -> Result<bool, SandboxError> {
        let namespace = NamespaceName::for_session(session_id);
        Ok(self.namespaces.destroy_namespace(&namespace).await?)
    }

    /// Tables and columns currently in the session's namespace.
    pub async fn describe(&self, session_id: &SessionId) -> Result<Vec<TableDescription>, SandboxError> {
        let namespace = NamespaceName::for_session(session_id);
        Ok(self.namespaces.describe_namespace(&namespace).await?)
    }

    /// Start the background idle sweeper, unless idle expiry is disabled.
    pub fn spawn_idle_sweeper(&self) -> Option<JoinHandle<()>> {
        let ttl = self.namespace_settings.idle_ttl()?;
        Some(spawn_idle_sweeper(
            Arc::clone(&self.namespaces),
            ttl,
            self.namespace_settings.sweep_interval(),
        ))
    }
}

fn advance(session_id: &SessionId, stage: &mut LifecycleStage, next: LifecycleStage) {
    log::debug!("[{}] {} -> {}", session_id, stage, next);
    *stage = next;
}

fn fail(session_id: &SessionId, stage: &mut LifecycleStage, error: SandboxError) -> SandboxError {
    log::warn!("[{}] Failed at {}: {}", session_id, stage, error);
    advance(session_id, stage, LifecycleStage::Failed);
    error
}
