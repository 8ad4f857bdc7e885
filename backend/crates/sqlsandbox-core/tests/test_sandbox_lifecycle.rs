//! End-to-end tests for the sandbox lifecycle
//!
//! Tests cover:
//! - the employees example from validation to a capped result
//! - rejection before any namespace exists
//! - session reuse and reclaim policies
//! - query failures reported as data, load failures as errors
//! - expected-output checking

use serde_json::json;
use sqlsandbox_commons::{
    Assignment, ColumnType, ExpectedOutput, ExpectedOutputKind, NamespaceName, SessionId, TableSpec,
};
use sqlsandbox_configs::SandboxConfig;
use sqlsandbox_core::{
    LifecycleStage, LoadError, ReclaimPolicy, RunRequest, RunVerdict, SandboxEngine, SandboxError,
};

fn engine() -> SandboxEngine {
    SandboxEngine::new(&SandboxConfig::default()).unwrap()
}

fn employees_assignment() -> Assignment {
    Assignment::new(vec![TableSpec::new("employees")
        .column("id", ColumnType::Integer)
        .column("name", ColumnType::Text)
        .column("salary", ColumnType::Integer)
        .row(vec![json!(1), json!("A"), json!(45000)])
        .row(vec![json!(2), json!("B"), json!(60000)])])
}

#[tokio::test]
async fn test_employees_high_salary() {
    let engine = engine();
    let assignment = employees_assignment();

    let outcome = engine
        .run(RunRequest::new(&assignment, "SELECT name FROM employees WHERE salary > 50000"))
        .await
        .unwrap();

    assert_eq!(outcome.stage, LifecycleStage::Retained);
    let result = outcome.result().expect("query should have executed");
    assert!(result.success, "error: {:?}", result.error);
    assert_eq!(result.row_count, 1);
    assert!(!result.truncated);
    assert_eq!(serde_json::to_value(&result.rows).unwrap(), json!([{ "name": "B" }]));
}

#[tokio::test]
async fn test_drop_is_rejected_before_namespace_exists() {
    let engine = engine();
    let assignment = employees_assignment();
    let session = SessionId::new("drop-attempt").unwrap();

    let outcome = engine
        .run(RunRequest::new(&assignment, "DROP TABLE employees").with_session(session.clone()))
        .await
        .unwrap();

    assert!(outcome.is_rejected());
    assert_eq!(outcome.stage, LifecycleStage::Failed);
    assert!(outcome.namespace.is_none());
    match &outcome.verdict {
        RunVerdict::Rejected { reason } => assert_eq!(reason, "Operation not allowed: DROP"),
        other => panic!("unexpected verdict {:?}", other),
    }
    assert!(!engine.namespaces().contains(&NamespaceName::for_session(&session)));
    assert_eq!(engine.namespaces().namespace_count(), 0);
}

#[tokio::test]
async fn test_session_is_reused_until_reclaimed() {
    let engine = engine();
    let assignment = employees_assignment();
    let session = SessionId::new("student-42").unwrap();

    let first = engine
        .run(RunRequest::new(&assignment, "SELECT COUNT(*) AS n FROM employees").with_session(session.clone()))
        .await
        .unwrap();
    let second = engine
        .run(RunRequest::new(&assignment, "SELECT COUNT(*) AS n FROM employees").with_session(session.clone()))
        .await
        .unwrap();

    assert_eq!(first.session_id, session);
    assert_eq!(first.namespace, second.namespace);
    // Reloading overwrites, so the count does not double.
    assert_eq!(second.result().unwrap().rows[0]["n"], json!(2));
    assert_eq!(engine.namespaces().namespace_count(), 1);

    assert!(engine.reclaim(&session).await.unwrap());
    assert!(!engine.reclaim(&session).await.unwrap());
    assert_eq!(engine.namespaces().namespace_count(), 0);
}

#[tokio::test]
async fn test_reclaim_policy_drops_namespace() {
    let engine = engine();
    let assignment = employees_assignment();

    let outcome = engine
        .run(RunRequest::new(&assignment, "SELECT * FROM employees").with_reclaim(ReclaimPolicy::Reclaim))
        .await
        .unwrap();

    assert_eq!(outcome.stage, LifecycleStage::Reclaimed);
    assert!(outcome.result().unwrap().success);
    let namespace = outcome.namespace.unwrap();
    assert!(!engine.namespaces().contains(&namespace));
}

#[tokio::test]
async fn test_generated_session_ids_are_distinct() {
    let engine = engine();
    let assignment = employees_assignment();

    let a = engine.run(RunRequest::new(&assignment, "SELECT 1")).await.unwrap();
    let b = engine.run(RunRequest::new(&assignment, "SELECT 1")).await.unwrap();
    assert_ne!(a.session_id, b.session_id);
    assert_ne!(a.namespace, b.namespace);
}

#[tokio::test]
async fn test_query_error_is_data_and_namespace_is_kept() {
    let engine = engine();
    let assignment = employees_assignment();

    let outcome = engine
        .run(RunRequest::new(&assignment, "SELECT missing_column FROM employees"))
        .await
        .unwrap();

    assert_eq!(outcome.stage, LifecycleStage::Retained);
    let result = outcome.result().unwrap();
    assert!(!result.success);
    assert!(result.error.as_deref().is_some_and(|e| !e.is_empty()));
    assert!(result.rows.is_empty());
    assert!(engine.namespaces().contains(outcome.namespace.as_ref().unwrap()));
}

#[tokio::test]
async fn test_load_failure_is_an_error_and_leaves_namespace() {
    let engine = engine();
    let session = SessionId::new("bad-data").unwrap();
    let assignment = Assignment::new(vec![TableSpec::new("t")
        .column("id", ColumnType::Integer)
        .row(vec![json!("not a number")])]);

    let err = engine
        .run(RunRequest::new(&assignment, "SELECT * FROM t").with_session(session.clone()))
        .await
        .unwrap_err();

    assert!(matches!(err, SandboxError::Load(LoadError::ValueType { .. })));
    assert!(!err.is_retryable());
    assert!(engine.namespaces().contains(&NamespaceName::for_session(&session)));
}

#[tokio::test]
async fn test_expected_output_sets_is_correct() {
    let engine = engine();
    let assignment = employees_assignment().with_expected_output(ExpectedOutput::new(
        ExpectedOutputKind::Table,
        json!([{ "name": "B" }]),
    ));

    let right = engine
        .run(RunRequest::new(&assignment, "SELECT name FROM employees WHERE salary > 50000"))
        .await
        .unwrap();
    let wrong = engine
        .run(RunRequest::new(&assignment, "SELECT name FROM employees"))
        .await
        .unwrap();
    let failed = engine
        .run(RunRequest::new(&assignment, "SELECT nope FROM employees"))
        .await
        .unwrap();

    let is_correct = |verdict: &RunVerdict| match verdict {
        RunVerdict::Executed { is_correct, .. } => *is_correct,
        RunVerdict::Rejected { .. } => None,
    };
    assert_eq!(is_correct(&right.verdict), Some(true));
    assert_eq!(is_correct(&wrong.verdict), Some(false));
    assert_eq!(is_correct(&failed.verdict), None);
}

#[tokio::test]
async fn test_typed_columns_round_trip_to_json() {
    let engine = engine();
    let assignment = Assignment::new(vec![TableSpec::new("events")
        .column("id", ColumnType::Integer)
        .column("label", ColumnType::Varchar)
        .column("score", ColumnType::Real)
        .column("active", ColumnType::Boolean)
        .column("day", ColumnType::Date)
        .column("at", ColumnType::Timestamp)
        .row(vec![
            json!(7),
            json!("launch"),
            json!(9.5),
            json!(true),
            json!("2024-01-15"),
            json!("2024-01-15 10:30:00"),
        ])
        .row(vec![json!(8), json!(null), json!(null), json!(null), json!(null), json!(null)])]);

    let outcome = engine
        .run(RunRequest::new(&assignment, "SELECT * FROM events ORDER BY id"))
        .await
        .unwrap();
    let result = outcome.result().unwrap();
    assert!(result.success, "error: {:?}", result.error);

    assert_eq!(
        serde_json::Value::Object(result.rows[0].clone()),
        json!({
            "id": 7,
            "label": "launch",
            "score": 9.5,
            "active": true,
            "day": "2024-01-15",
            "at": "2024-01-15 10:30:00"
        })
    );
    assert_eq!(result.rows[1]["label"], serde_json::Value::Null);
    let keys: Vec<&String> = result.rows[0].keys().collect();
    assert_eq!(keys, vec!["id", "label", "score", "active", "day", "at"]);
}

#[tokio::test]
async fn test_describe_lists_loaded_tables() {
    let engine = engine();
    let session = SessionId::new("describe-me").unwrap();
    let assignment = Assignment::new(vec![
        TableSpec::new("orders").column("id", ColumnType::Integer),
        employees_assignment().sample_tables.remove(0),
    ]);

    engine.prepare(&session, &assignment).await.unwrap();
    let tables = engine.describe(&session).await.unwrap();

    let names: Vec<&str> = tables.iter().map(|t| t.table_name.as_str()).collect();
    assert_eq!(names, vec!["employees", "orders"]);
    let columns: Vec<&str> = tables[0].columns.iter().map(|c| c.column_name.as_str()).collect();
    assert_eq!(columns, vec!["id", "name", "salary"]);
    assert_eq!(tables[0].columns[2].data_type, ColumnType::Integer);
}

#[tokio::test]
async fn test_invalid_session_id() {
    let err = SandboxEngine::parse_session("   ").unwrap_err();
    assert!(matches!(err, SandboxError::InvalidSession(_)));
}

#[tokio::test]
async fn test_invalid_validation_mode_is_refused() {
    let mut config = SandboxConfig::default();
    config.validation.mode = "lenient".to_string();
    assert!(matches!(SandboxEngine::new(&config), Err(SandboxError::InvalidConfig(_))));
}
