//! JSON-lines request runner
//!
//! Each input line is one request:
//!
//! ```json
//! {"sessionId": "s-1", "assignment": {"sampleTables": [...]}, "query": "SELECT ...", "reclaim": false}
//! ```
//!
//! Each output line is either a serialized `RunOutcome` or an error object
//! `{"sessionId": "...", "error": "...", "retryable": bool}`. Requests run
//! concurrently, so responses can arrive out of input order; `sessionId`
//! ties each response back to its request.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlsandbox_commons::Assignment;
use sqlsandbox_core::{ReclaimPolicy, RunOutcome, RunRequest, SandboxEngine, SandboxError};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub assignment: Assignment,
    pub query: String,
    /// Drop the namespace after the query runs.
    #[serde(default)]
    pub reclaim: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerError {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub error: String,
    pub retryable: bool,
}

impl RunnerError {
    fn invalid_request(message: impl std::fmt::Display) -> Self {
        Self {
            session_id: None,
            error: format!("Invalid request: {}", message),
            retryable: false,
        }
    }

    fn with_session(mut self, session_id: Option<&str>) -> Self {
        self.session_id = session_id.map(str::to_string);
        self
    }
}

impl From<SandboxError> for RunnerError {
    fn from(err: SandboxError) -> Self {
        Self {
            session_id: None,
            retryable: err.is_retryable(),
            error: err.to_string(),
        }
    }
}

/// Best-effort `sessionId` from a line that failed to deserialize.
fn raw_session_id(line: &str) -> Option<String> {
    let value: Value = serde_json::from_str(line).ok()?;
    value.get("sessionId")?.as_str().map(str::to_string)
}

pub async fn run_request(engine: &SandboxEngine, request: &RunnerRequest) -> Result<RunOutcome, RunnerError> {
    let mut run = RunRequest::new(&request.assignment, &request.query);
    if let Some(raw) = &request.session_id {
        run = run.with_session(SandboxEngine::parse_session(raw)?);
    }
    if request.reclaim {
        run = run.with_reclaim(ReclaimPolicy::Reclaim);
    }
    Ok(engine.run(run).await?)
}

/// Handle one input line and return the output line. Blank lines yield
/// `None`.
pub async fn handle_line(engine: &SandboxEngine, line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let response = match serde_json::from_str::<RunnerRequest>(line) {
        Err(e) => serde_json::to_string(
            &RunnerError::invalid_request(e).with_session(raw_session_id(line).as_deref()),
        ),
        Ok(request) => match run_request(engine, &request).await {
            Ok(outcome) => serde_json::to_string(&outcome),
            Err(err) => serde_json::to_string(&err.with_session(request.session_id.as_deref())),
        },
    };

    Some(response.unwrap_or_else(|e| {
        log::error!("Failed to serialize response: {}", e);
        r#"{"error":"Internal serialization failure","retryable":false}"#.to_string()
    }))
}

/// Read requests from `reader` until EOF, running each on its own task.
/// Responses go to `responses` as soon as they are ready. Returns once every
/// spawned request has finished.
pub async fn serve_lines<R>(
    engine: Arc<SandboxEngine>,
    reader: R,
    responses: mpsc::Sender<String>,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut in_flight = JoinSet::new();

    while let Some(line) = lines.next_line().await? {
        let engine = Arc::clone(&engine);
        let responses = responses.clone();
        in_flight.spawn(async move {
            if let Some(response) = handle_line(&engine, &line).await {
                if responses.send(response).await.is_err() {
                    log::warn!("Response writer closed; dropping response");
                }
            }
        });

        // Reap finished requests so the set stays small on long inputs.
        while let Some(joined) = in_flight.try_join_next() {
            log_join_failure(joined);
        }
    }

    while let Some(joined) = in_flight.join_next().await {
        log_join_failure(joined);
    }
    Ok(())
}

fn log_join_failure(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        log::error!("Request task failed: {}", e);
    }
}

/// Write each response as one line, in arrival order, until every sender is
/// dropped.
pub async fn write_responses<W>(mut responses: mpsc::Receiver<String>, mut writer: W) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = responses.recv().await {
        writer.write_all(response.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sqlsandbox_configs::SandboxConfig;

    fn engine() -> SandboxEngine {
        SandboxEngine::new(&SandboxConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_blank_line_is_skipped() {
        assert!(handle_line(&engine(), "   ").await.is_none());
    }

    #[tokio::test]
    async fn test_malformed_request() {
        let out = handle_line(&engine(), "{not json").await.unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();
        assert!(value["error"].as_str().unwrap().starts_with("Invalid request:"));
        assert_eq!(value["retryable"], json!(false));
    }

    #[tokio::test]
    async fn test_rejection_is_reported_as_outcome() {
        let line = json!({ "query": "DELETE FROM t" }).to_string();
        let out = handle_line(&engine(), &line).await.unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["stage"], json!("failed"));
        assert_eq!(value["verdict"]["status"], json!("rejected"));
        assert_eq!(value["verdict"]["reason"], json!("Operation not allowed: DELETE"));
    }

    #[tokio::test]
    async fn test_invalid_session_is_an_error() {
        let line = json!({ "sessionId": "", "query": "SELECT 1" }).to_string();
        let out = handle_line(&engine(), &line).await.unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();
        assert!(value["error"].as_str().unwrap().contains("Session id cannot be empty"));
    }

    #[tokio::test]
    async fn test_errors_carry_session_id() {
        let line = json!({ "sessionId": "", "query": "SELECT 1" }).to_string();
        let value: Value = serde_json::from_str(&handle_line(&engine(), &line).await.unwrap()).unwrap();
        assert_eq!(value["sessionId"], json!(""));

        // Missing `query` fails deserialization; the id is still echoed.
        let line = json!({ "sessionId": "s-9" }).to_string();
        let value: Value = serde_json::from_str(&handle_line(&engine(), &line).await.unwrap()).unwrap();
        assert_eq!(value["sessionId"], json!("s-9"));
        assert!(value["error"].as_str().unwrap().starts_with("Invalid request:"));

        let value: Value = serde_json::from_str(&handle_line(&engine(), "[1, 2]").await.unwrap()).unwrap();
        assert!(value.get("sessionId").is_none());
    }

    #[tokio::test]
    async fn test_write_responses_emits_one_line_each() {
        let (tx, rx) = mpsc::channel(4);
        tx.send("{\"a\":1}".to_string()).await.unwrap();
        tx.send("{\"b\":2}".to_string()).await.unwrap();
        drop(tx);

        let mut out = Vec::new();
        write_responses(rx, &mut out).await.unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "{\"a\":1}\n{\"b\":2}\n");
    }
}
