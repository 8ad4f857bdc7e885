//! Process lifecycle helpers: configuration, engine bootstrap and shutdown.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use log::{debug, info};
use sqlsandbox_configs::SandboxConfig;
use sqlsandbox_core::SandboxEngine;
use tokio::task::JoinHandle;

/// Config file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "sqlsandbox.toml";

/// Everything the runner shares across requests.
pub struct SandboxApp {
    pub config: SandboxConfig,
    pub engine: Arc<SandboxEngine>,
    sweeper: Option<JoinHandle<()>>,
}

impl SandboxApp {
    pub fn engine(&self) -> &Arc<SandboxEngine> {
        &self.engine
    }

    pub fn has_sweeper(&self) -> bool {
        self.sweeper.is_some()
    }

    /// Stop background tasks and drop every remaining namespace.
    pub async fn shutdown(self) {
        if let Some(sweeper) = self.sweeper {
            sweeper.abort();
        }

        let namespaces = self.engine.namespaces();
        let mut dropped = 0usize;
        for name in namespaces.list_namespaces() {
            match namespaces.destroy_namespace(&name).await {
                Ok(true) => dropped += 1,
                Ok(false) => {},
                Err(e) => log::warn!("Failed to drop {} during shutdown: {}", name, e),
            }
        }
        info!("Sandbox shut down ({} namespace(s) dropped)", dropped);
    }
}

/// Load configuration from `path`, or from [`DEFAULT_CONFIG_FILE`] when it
/// exists, or fall back to defaults. Environment overrides are applied last.
pub fn load_config(path: Option<&Path>) -> Result<SandboxConfig> {
    let mut config = match path {
        Some(path) => SandboxConfig::from_file(path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => SandboxConfig::from_file(DEFAULT_CONFIG_FILE)?,
        None => SandboxConfig::default(),
    };
    config.apply_env_overrides()?;
    Ok(config)
}

/// Build the engine and start the idle sweeper. Must run inside a Tokio
/// runtime.
pub async fn bootstrap(config: SandboxConfig) -> Result<SandboxApp> {
    let phase_start = Instant::now();
    let engine = Arc::new(SandboxEngine::new(&config)?);
    debug!(
        "Engine initialized ({:.2}ms)",
        phase_start.elapsed().as_secs_f64() * 1000.0
    );

    let sweeper = engine.spawn_idle_sweeper();
    match config.namespaces.idle_ttl() {
        Some(ttl) => info!(
            "Idle namespaces expire after {}s (sweep every {}s)",
            ttl.as_secs(),
            config.namespaces.sweep_interval().as_secs()
        ),
        None => info!("Idle namespace expiry disabled"),
    }

    Ok(SandboxApp {
        config,
        engine,
        sweeper,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_explicit_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[limits]
max_result_rows = 25

[validation]
mode = "parsed"
"#
        )
        .unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.limits.max_result_rows, 25);
        assert_eq!(config.validation.mode, "parsed");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[tokio::test]
    async fn test_bootstrap_and_shutdown() {
        let mut config = SandboxConfig::default();
        config.namespaces.idle_ttl_seconds = 0;
        let app = bootstrap(config).await.unwrap();
        assert!(!app.has_sweeper());

        let session = sqlsandbox_commons::SessionId::new("s").unwrap();
        app.engine().namespaces().ensure_namespace(&session).unwrap();
        let engine = Arc::clone(app.engine());
        app.shutdown().await;
        assert_eq!(engine.namespaces().namespace_count(), 0);
    }
}
