//! Namespace lifecycle
//!
//! A namespace is one `MemorySchemaProvider` registered in the shared sandbox
//! catalog under the session's [`NamespaceName`]. The manager is the only
//! component that registers or removes them.
//!
//! Each namespace carries a read/write lock: the loader holds it for writing
//! while it swaps tables in, queries hold it for reading while they plan and
//! run. Different namespaces never contend on each other's lock.

mod sweep;

pub use sweep::spawn_idle_sweeper;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use datafusion::catalog::memory::{MemoryCatalogProvider, MemorySchemaProvider};
use datafusion::catalog::{CatalogProvider, SchemaProvider};
use serde::Serialize;
use sqlsandbox_commons::{ColumnSpec, ColumnType, NamespaceName, SessionId};
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

use crate::error::NamespaceError;

pub(crate) struct NamespaceEntry {
    name: NamespaceName,
    schema: Arc<MemorySchemaProvider>,
    lock: Arc<RwLock<()>>,
    last_used: parking_lot::Mutex<Instant>,
    dropped: AtomicBool,
}

impl NamespaceEntry {
    fn new(name: NamespaceName) -> Self {
        Self {
            name,
            schema: Arc::new(MemorySchemaProvider::new()),
            lock: Arc::new(RwLock::new(())),
            last_used: parking_lot::Mutex::new(Instant::now()),
            dropped: AtomicBool::new(false),
        }
    }

    fn touch(&self) {
        *self.last_used.lock() = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        self.last_used.lock().elapsed()
    }

    fn is_dropped(&self) -> bool {
        self.dropped.load(Ordering::Acquire)
    }
}

/// Exclusive access to one namespace's tables.
pub struct NamespaceWriteGuard {
    entry: Arc<NamespaceEntry>,
    _guard: OwnedRwLockWriteGuard<()>,
}

impl NamespaceWriteGuard {
    pub fn name(&self) -> &NamespaceName {
        &self.entry.name
    }

    pub fn schema(&self) -> &Arc<MemorySchemaProvider> {
        &self.entry.schema
    }
}

/// Shared access to one namespace's tables.
pub struct NamespaceReadGuard {
    entry: Arc<NamespaceEntry>,
    _guard: OwnedRwLockReadGuard<()>,
}

impl NamespaceReadGuard {
    pub fn name(&self) -> &NamespaceName {
        &self.entry.name
    }

    pub fn schema(&self) -> Arc<dyn SchemaProvider> {
        Arc::clone(&self.entry.schema) as Arc<dyn SchemaProvider>
    }
}

/// One table as seen by [`NamespaceManager::describe_namespace`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDescription {
    pub table_name: String,
    pub columns: Vec<ColumnSpec>,
}

pub struct NamespaceManager {
    catalog: Arc<MemoryCatalogProvider>,
    entries: DashMap<NamespaceName, Arc<NamespaceEntry>>,
    create_lock: parking_lot::Mutex<()>,
}

impl Default for NamespaceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl NamespaceManager {
    pub fn new() -> Self {
        Self {
            catalog: Arc::new(MemoryCatalogProvider::new()),
            entries: DashMap::new(),
            create_lock: parking_lot::Mutex::new(()),
        }
    }

    /// Return the session's namespace, creating it on first use.
    ///
    /// Idempotent: repeated calls return the same name and never fail because
    /// the namespace already exists.
    pub fn ensure_namespace(&self, session_id: &SessionId) -> Result<NamespaceName, NamespaceError> {
        let name = NamespaceName::for_session(session_id);
        self.ensure_entry(&name)?;
        Ok(name)
    }

    fn ensure_entry(&self, name: &NamespaceName) -> Result<Arc<NamespaceEntry>, NamespaceError> {
        if let Some(entry) = self.live_entry(name) {
            entry.touch();
            return Ok(entry);
        }

        let _create = self.create_lock.lock();
        if let Some(entry) = self.live_entry(name) {
            entry.touch();
            return Ok(entry);
        }

        let entry = Arc::new(NamespaceEntry::new(name.clone()));
        self.catalog
            .register_schema(name.as_str(), Arc::clone(&entry.schema) as Arc<dyn SchemaProvider>)
            .map_err(|e| NamespaceError::Backend(e.strip_backtrace()))?;
        self.entries.insert(name.clone(), Arc::clone(&entry));

        log::info!("Created namespace {}", name);
        Ok(entry)
    }

    fn live_entry(&self, name: &NamespaceName) -> Option<Arc<NamespaceEntry>> {
        self.entries
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .filter(|entry| !entry.is_dropped())
    }

    /// Drop a namespace and every table in it.
    ///
    /// Idempotent: dropping an absent namespace succeeds. Returns whether a
    /// namespace was actually removed. Waits for in-flight loads and queries
    /// on the namespace to finish first.
    pub async fn destroy_namespace(&self, name: &NamespaceName) -> Result<bool, NamespaceError> {
        let Some(entry) = self.live_entry(name) else {
            log::debug!("Namespace {} already absent", name);
            return Ok(false);
        };

        let _exclusive = Arc::clone(&entry.lock).write_owned().await;
        let removed = self.remove_entry(&entry)?;
        if removed {
            log::info!("Dropped namespace {}", name);
        }
        Ok(removed)
    }

    /// Caller must hold the entry's write lock.
    fn remove_entry(&self, entry: &Arc<NamespaceEntry>) -> Result<bool, NamespaceError> {
        let _create = self.create_lock.lock();
        if entry.dropped.swap(true, Ordering::AcqRel) {
            return Ok(false);
        }

        self.entries
            .remove_if(&entry.name, |_, current| Arc::ptr_eq(current, entry));
        self.catalog
            .deregister_schema(entry.name.as_str(), true)
            .map_err(|e| NamespaceError::Backend(e.strip_backtrace()))?;
        Ok(true)
    }

    /// Exclusive access for loading. Fails if the namespace does not exist or
    /// is dropped while waiting.
    pub async fn write(&self, name: &NamespaceName) -> Result<NamespaceWriteGuard, NamespaceError> {
        let entry = self
            .live_entry(name)
            .ok_or_else(|| NamespaceError::NotFound(name.to_string()))?;
        let guard = Arc::clone(&entry.lock).write_owned().await;
        if entry.is_dropped() {
            return Err(NamespaceError::NotFound(name.to_string()));
        }
        entry.touch();
        Ok(NamespaceWriteGuard {
            entry,
            _guard: guard,
        })
    }

    /// Shared access for querying.
    pub async fn read(&self, name: &NamespaceName) -> Result<NamespaceReadGuard, NamespaceError> {
        let entry = self
            .live_entry(name)
            .ok_or_else(|| NamespaceError::NotFound(name.to_string()))?;
        let guard = Arc::clone(&entry.lock).read_owned().await;
        if entry.is_dropped() {
            return Err(NamespaceError::NotFound(name.to_string()));
        }
        entry.touch();
        Ok(NamespaceReadGuard {
            entry,
            _guard: guard,
        })
    }

    /// Tables and their columns, sorted by table name; columns keep their
    /// declared order.
    pub async fn describe_namespace(
        &self,
        name: &NamespaceName,
    ) -> Result<Vec<TableDescription>, NamespaceError> {
        let guard = self.read(name).await?;
        let schema = guard.schema();

        let mut table_names = schema.table_names();
        table_names.sort();

        let mut tables = Vec::with_capacity(table_names.len());
        for table_name in table_names {
            let Some(table) = schema
                .table(&table_name)
                .await
                .map_err(|e| NamespaceError::Backend(e.strip_backtrace()))?
            else {
                continue;
            };

            let columns = table
                .schema()
                .fields()
                .iter()
                .map(|field| {
                    let data_type =
                        ColumnType::from_arrow_type(field.data_type()).unwrap_or(ColumnType::Text);
                    ColumnSpec::new(field.name().clone(), data_type)
                })
                .collect();

            tables.push(TableDescription {
                table_name,
                columns,
            });
        }

        Ok(tables)
    }

    pub fn contains(&self, name: &NamespaceName) -> bool {
        self.live_entry(name).is_some()
    }

    pub fn namespace_count(&self) -> usize {
        self.entries.len()
    }

    pub fn list_namespaces(&self) -> Vec<NamespaceName> {
        let mut names: Vec<NamespaceName> =
            self.entries.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(id: &str) -> SessionId {
        SessionId::new(id).unwrap()
    }

    #[tokio::test]
    async fn test_ensure_is_idempotent() {
        let manager = NamespaceManager::new();
        let first = manager.ensure_namespace(&session("abc")).unwrap();
        let second = manager.ensure_namespace(&session("abc")).unwrap();
        assert_eq!(first, second);
        assert_eq!(manager.namespace_count(), 1);
    }

    #[tokio::test]
    async fn test_destroy_is_idempotent() {
        let manager = NamespaceManager::new();
        let name = manager.ensure_namespace(&session("abc")).unwrap();
        assert!(manager.destroy_namespace(&name).await.unwrap());
        assert!(!manager.destroy_namespace(&name).await.unwrap());
        assert!(!manager.contains(&name));
        assert!(matches!(manager.read(&name).await, Err(NamespaceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_recreate_after_destroy_starts_empty() {
        let manager = NamespaceManager::new();
        let name = manager.ensure_namespace(&session("abc")).unwrap();
        manager.destroy_namespace(&name).await.unwrap();
        let again = manager.ensure_namespace(&session("abc")).unwrap();
        assert_eq!(name, again);
        assert!(manager.describe_namespace(&again).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_is_sorted() {
        let manager = NamespaceManager::new();
        for id in ["one", "two", "three"] {
            manager.ensure_namespace(&session(id)).unwrap();
        }
        let names = manager.list_namespaces();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert_eq!(names.len(), 3);
    }
}
