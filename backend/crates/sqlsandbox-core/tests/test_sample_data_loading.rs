//! Loading sample data into namespaces: replacement and all-or-nothing commits

use std::sync::Arc;
use std::time::Duration;

use datafusion::prelude::SessionContext;
use serde_json::json;
use sqlsandbox_commons::{ColumnType, NamespaceName, SessionId, TableSpec};
use sqlsandbox_configs::LimitsSettings;
use sqlsandbox_core::{ConnectionPool, LoadError, NamespaceManager, SampleDataLoader, SandboxError};

fn setup() -> (Arc<NamespaceManager>, SampleDataLoader) {
    let namespaces = Arc::new(NamespaceManager::new());
    let pool = ConnectionPool::new(4, Duration::from_secs(1));
    let loader = SampleDataLoader::new(Arc::clone(&namespaces), pool, LimitsSettings::default());
    (namespaces, loader)
}

fn products(version: &str) -> TableSpec {
    TableSpec::new("products")
        .column("sku", ColumnType::Text)
        .column("price", ColumnType::Real)
        .row(vec![json!(format!("{}-a", version)), json!(1.5)])
        .row(vec![json!(format!("{}-b", version)), json!(2.5)])
}

fn customers(version: &str) -> TableSpec {
    TableSpec::new("customers")
        .column("id", ColumnType::Integer)
        .column("name", ColumnType::Text)
        .row(vec![json!(1), json!(format!("{}-alice", version))])
}

async fn row_count(namespaces: &NamespaceManager, name: &NamespaceName, table: &str) -> usize {
    let guard = namespaces.read(name).await.unwrap();
    let provider = guard.schema().table(table).await.unwrap().unwrap();
    let ctx = SessionContext::new();
    let df = ctx.read_table(provider).unwrap();
    df.count().await.unwrap()
}

#[tokio::test]
async fn test_load_reports_tables_and_replacements() {
    let (namespaces, loader) = setup();
    let ns = namespaces.ensure_namespace(&SessionId::new("s1").unwrap()).unwrap();

    let first = loader.load_tables(&ns, &[products("v1"), customers("v1")]).await.unwrap();
    assert_eq!(first.tables.len(), 2);
    assert!(first.tables.iter().all(|t| !t.replaced));
    assert_eq!(first.tables[0].table_name, "products");
    assert_eq!(first.tables[0].row_count, 2);

    let second = loader.load_tables(&ns, &[products("v2")]).await.unwrap();
    assert_eq!(second.tables.len(), 1);
    assert!(second.tables[0].replaced);

    // Tables not named in the second load stay.
    let described = namespaces.describe_namespace(&ns).await.unwrap();
    let names: Vec<&str> = described.iter().map(|t| t.table_name.as_str()).collect();
    assert_eq!(names, vec!["customers", "products"]);
    assert_eq!(row_count(&namespaces, &ns, "products").await, 2);
}

#[tokio::test]
async fn test_failed_load_leaves_previous_tables_untouched() {
    let (namespaces, loader) = setup();
    let ns = namespaces.ensure_namespace(&SessionId::new("s1").unwrap()).unwrap();
    loader.load_tables(&ns, &[products("v1"), customers("v1")]).await.unwrap();

    // Bad value in the last row of the last table.
    let broken = customers("v2").row(vec![json!("two"), json!("bob")]);
    let err = loader
        .load_tables(&ns, &[products("v2").row(vec![json!("v2-c"), json!(3.5)]), broken])
        .await
        .unwrap_err();

    match err {
        SandboxError::Load(LoadError::ValueType { table, row, column, .. }) => {
            assert_eq!(table, "customers");
            assert_eq!(row, 1);
            assert_eq!(column, "id");
        },
        other => panic!("unexpected error {:?}", other),
    }

    // products still has its two v1 rows, not the three v2 rows.
    assert_eq!(row_count(&namespaces, &ns, "products").await, 2);
    assert_eq!(row_count(&namespaces, &ns, "customers").await, 1);
}

#[tokio::test]
async fn test_failed_first_load_leaves_namespace_empty() {
    let (namespaces, loader) = setup();
    let ns = namespaces.ensure_namespace(&SessionId::new("s1").unwrap()).unwrap();

    let broken = TableSpec::new("t")
        .column("a", ColumnType::Integer)
        .column("b", ColumnType::Integer)
        .row(vec![json!(1)]);
    let err = loader.load_tables(&ns, &[products("v1"), broken]).await.unwrap_err();
    assert!(matches!(err, SandboxError::Load(LoadError::ArityMismatch { .. })));

    assert!(namespaces.describe_namespace(&ns).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_load_into_missing_namespace_fails() {
    let (namespaces, loader) = setup();
    let ns = namespaces.ensure_namespace(&SessionId::new("gone").unwrap()).unwrap();
    namespaces.destroy_namespace(&ns).await.unwrap();

    let err = loader.load_tables(&ns, &[products("v1")]).await.unwrap_err();
    assert!(matches!(err, SandboxError::Load(LoadError::NamespaceNotFound(_))));
}

#[tokio::test]
async fn test_namespaces_do_not_share_tables() {
    let (namespaces, loader) = setup();
    let a = namespaces.ensure_namespace(&SessionId::new("a").unwrap()).unwrap();
    let b = namespaces.ensure_namespace(&SessionId::new("b").unwrap()).unwrap();

    loader.load_tables(&a, &[products("v1")]).await.unwrap();

    assert_eq!(namespaces.describe_namespace(&a).await.unwrap().len(), 1);
    assert!(namespaces.describe_namespace(&b).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_table_list_is_a_no_op() {
    let (namespaces, loader) = setup();
    let ns = namespaces.ensure_namespace(&SessionId::new("s1").unwrap()).unwrap();
    let summary = loader.load_tables(&ns, &[]).await.unwrap();
    assert!(summary.tables.is_empty());
}
