//! Per-query DataFusion session factory
//!
//! Every query gets a fresh `SessionContext` whose only catalog holds the
//! caller's namespace, set as the default schema. Unqualified table names
//! resolve there, and no other namespace can be named because it is simply not
//! registered. Each session also has its own memory pool.

use std::sync::Arc;

use datafusion::catalog::memory::MemoryCatalogProvider;
use datafusion::catalog::{CatalogProvider, SchemaProvider};
use datafusion::error::Result as DataFusionResult;
use datafusion::execution::context::{SQLOptions, SessionContext};
use datafusion::execution::runtime_env::RuntimeEnvBuilder;
use datafusion::prelude::SessionConfig;
use sqlsandbox_commons::NamespaceName;
use sqlsandbox_configs::DataFusionSettings;

/// Catalog name every per-query session sees.
pub const SANDBOX_CATALOG: &str = "sandbox";

#[derive(Debug, Clone)]
pub struct SandboxSessionFactory {
    target_partitions: usize,
    memory_limit_bytes: usize,
}

impl SandboxSessionFactory {
    pub fn new(settings: &DataFusionSettings) -> Self {
        Self {
            target_partitions: settings.target_partitions.max(1),
            memory_limit_bytes: settings.memory_limit_bytes,
        }
    }

    /// Create a session scoped to `namespace`, backed by `schema`.
    pub fn create_session(
        &self,
        namespace: &NamespaceName,
        schema: Arc<dyn SchemaProvider>,
    ) -> DataFusionResult<SessionContext> {
        let config = SessionConfig::new()
            .with_information_schema(false)
            .with_create_default_catalog_and_schema(false)
            .with_default_catalog_and_schema(SANDBOX_CATALOG, namespace.as_str())
            .with_target_partitions(self.target_partitions);

        let runtime = RuntimeEnvBuilder::new()
            .with_memory_limit(self.memory_limit_bytes, 1.0)
            .build_arc()?;

        let ctx = SessionContext::new_with_config_rt(config, runtime);

        let catalog = Arc::new(MemoryCatalogProvider::new());
        catalog.register_schema(namespace.as_str(), schema)?;
        ctx.register_catalog(SANDBOX_CATALOG, catalog);

        Ok(ctx)
    }

    /// Statement options for untrusted text: queries only.
    pub fn read_only_options() -> SQLOptions {
        SQLOptions::new()
            .with_allow_ddl(false)
            .with_allow_dml(false)
            .with_allow_statements(false)
    }
}

impl Default for SandboxSessionFactory {
    fn default() -> Self {
        Self::new(&DataFusionSettings::default())
    }
}
