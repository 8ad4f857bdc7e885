use super::defaults::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Main sandbox configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SandboxConfig {
    #[serde(default)]
    pub limits: LimitsSettings,
    #[serde(default)]
    pub pool: PoolSettings,
    #[serde(default)]
    pub validation: ValidationSettings,
    #[serde(default)]
    pub namespaces: NamespaceSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub datafusion: DataFusionSettings,
}

/// Per-query and per-load resource limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsSettings {
    /// Rows returned to the caller; rows beyond this are counted but dropped
    #[serde(default = "default_max_result_rows")]
    pub max_result_rows: usize,

    /// Wall-clock budget for one query (default: 5000ms)
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,

    /// Wall-clock budget for loading one assignment's tables
    #[serde(default = "default_load_timeout_ms")]
    pub load_timeout_ms: u64,

    #[serde(default = "default_max_tables")]
    pub max_tables: usize,

    #[serde(default = "default_max_columns")]
    pub max_columns: usize,

    #[serde(default = "default_max_rows_per_table")]
    pub max_rows_per_table: usize,
}

impl LimitsSettings {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }
}

impl Default for LimitsSettings {
    fn default() -> Self {
        Self {
            max_result_rows: default_max_result_rows(),
            query_timeout_ms: default_query_timeout_ms(),
            load_timeout_ms: default_load_timeout_ms(),
            max_tables: default_max_tables(),
            max_columns: default_max_columns(),
            max_rows_per_table: default_max_rows_per_table(),
        }
    }
}

/// Execution slot pool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolSettings {
    /// Concurrent loads/queries allowed (default: 2 × CPU cores)
    #[serde(default = "default_pool_max_connections")]
    pub max_connections: usize,

    /// How long a request waits for a free slot before failing
    #[serde(default = "default_pool_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
}

impl PoolSettings {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: default_pool_max_connections(),
            acquire_timeout_ms: default_pool_acquire_timeout_ms(),
        }
    }
}

/// Query admission settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationSettings {
    /// "strict" (substring denylist + SELECT prefix + AST walk) or
    /// "parsed" (AST walk + token-level denylist, WITH allowed)
    #[serde(default = "default_validation_mode")]
    pub mode: String,

    #[serde(default = "default_max_query_length")]
    pub max_query_length: usize,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            mode: default_validation_mode(),
            max_query_length: default_max_query_length(),
        }
    }
}

/// Namespace expiry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamespaceSettings {
    /// Namespaces unused for longer than this are dropped by the sweeper (0 = never)
    #[serde(default = "default_idle_ttl_seconds")]
    pub idle_ttl_seconds: u64,

    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,
}

impl NamespaceSettings {
    /// `None` when idle expiry is disabled.
    pub fn idle_ttl(&self) -> Option<Duration> {
        (self.idle_ttl_seconds > 0).then(|| Duration::from_secs(self.idle_ttl_seconds))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds.max(1))
    }
}

impl Default for NamespaceSettings {
    fn default() -> Self {
        Self {
            idle_ttl_seconds: default_idle_ttl_seconds(),
            sweep_interval_seconds: default_sweep_interval_seconds(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Directory for log files (default: "./logs")
    #[serde(default = "default_logs_path")]
    pub logs_path: String,
    #[serde(default = "default_true")]
    pub log_to_console: bool,
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Optional per-target log level overrides, e.g.
    /// [logging.targets]
    /// datafusion = "warn"
    #[serde(default)]
    pub targets: HashMap<String, String>,
    /// Queries slower than this are logged at warn level
    #[serde(default = "default_slow_query_threshold_ms")]
    pub slow_query_threshold_ms: u64,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            logs_path: default_logs_path(),
            log_to_console: true,
            format: default_log_format(),
            targets: HashMap::new(),
            slow_query_threshold_ms: default_slow_query_threshold_ms(),
        }
    }
}

/// Query engine tuning applied to every per-query session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataFusionSettings {
    #[serde(default = "default_target_partitions")]
    pub target_partitions: usize,

    /// Memory a single query may reserve before it fails (default: 256MB)
    #[serde(default = "default_memory_limit_bytes")]
    pub memory_limit_bytes: usize,

    /// Worker threads of the runtime that executes query plans, kept apart
    /// from the runtime that enforces timeouts
    #[serde(default = "default_execution_threads")]
    pub execution_threads: usize,
}

impl Default for DataFusionSettings {
    fn default() -> Self {
        Self {
            target_partitions: default_target_partitions(),
            memory_limit_bytes: default_memory_limit_bytes(),
            execution_threads: default_execution_threads(),
        }
    }
}
