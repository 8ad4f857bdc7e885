use super::types::SandboxConfig;
use std::fs;
use std::path::{Path, PathBuf};

const VALID_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];
const VALID_FORMATS: [&str; 3] = ["compact", "pretty", "json"];
const VALID_MODES: [&str; 2] = ["strict", "parsed"];

impl SandboxConfig {
    /// Load configuration from a TOML file
    ///
    /// Note: Environment overrides are applied separately via `apply_env_overrides()`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;

        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let mut config: SandboxConfig = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file: {}", e))?;

        config.finalize()?;

        Ok(config)
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - SQLSANDBOX_QUERY_TIMEOUT_MS (legacy: MAX_QUERY_EXECUTION_TIME)
    /// - SQLSANDBOX_MAX_RESULT_ROWS (legacy: MAX_RESULT_ROWS)
    /// - SQLSANDBOX_POOL_MAX_CONNECTIONS
    /// - SQLSANDBOX_VALIDATION_MODE
    /// - SQLSANDBOX_IDLE_TTL_SECONDS
    /// - SQLSANDBOX_LOG_LEVEL
    /// - SQLSANDBOX_LOGS_PATH
    pub fn apply_env_overrides(&mut self) -> anyhow::Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())?;
        self.finalize()
    }

    fn apply_overrides_from<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |keys: &[&'static str]| first_set(&lookup, keys);

        if let Some((key, value)) = first(&["SQLSANDBOX_QUERY_TIMEOUT_MS", "MAX_QUERY_EXECUTION_TIME"]) {
            self.limits.query_timeout_ms = parse_env(key, &value)?;
        }

        if let Some((key, value)) = first(&["SQLSANDBOX_MAX_RESULT_ROWS", "MAX_RESULT_ROWS"]) {
            self.limits.max_result_rows = parse_env(key, &value)?;
        }

        if let Some((key, value)) = first(&["SQLSANDBOX_POOL_MAX_CONNECTIONS"]) {
            self.pool.max_connections = parse_env(key, &value)?;
        }

        if let Some((_, value)) = first(&["SQLSANDBOX_VALIDATION_MODE"]) {
            self.validation.mode = value.trim().to_ascii_lowercase();
        }

        if let Some((key, value)) = first(&["SQLSANDBOX_IDLE_TTL_SECONDS"]) {
            self.namespaces.idle_ttl_seconds = parse_env(key, &value)?;
        }

        if let Some((_, value)) = first(&["SQLSANDBOX_LOG_LEVEL"]) {
            self.logging.level = value.trim().to_ascii_lowercase();
        }

        if let Some((_, value)) = first(&["SQLSANDBOX_LOGS_PATH"]) {
            self.logging.logs_path = value;
        }

        Ok(())
    }

    /// Normalize paths and validate configuration.
    ///
    /// Call this after applying environment overrides.
    pub fn finalize(&mut self) -> anyhow::Result<()> {
        self.logging.logs_path = normalize_dir_path(&self.logging.logs_path);

        self.validate()?;

        Ok(())
    }

    /// Validate configuration settings
    pub fn validate(&self) -> anyhow::Result<()> {
        if !VALID_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                VALID_LEVELS.join(", ")
            ));
        }

        if !VALID_FORMATS.contains(&self.logging.format.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                VALID_FORMATS.join(", ")
            ));
        }

        for (target, level) in &self.logging.targets {
            if !VALID_LEVELS.contains(&level.as_str()) {
                return Err(anyhow::anyhow!(
                    "Invalid log level '{}' for target '{}'. Must be one of: {}",
                    level,
                    target,
                    VALID_LEVELS.join(", ")
                ));
            }
        }

        if !VALID_MODES.contains(&self.validation.mode.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid validation mode '{}'. Must be one of: {}",
                self.validation.mode,
                VALID_MODES.join(", ")
            ));
        }

        if self.validation.max_query_length == 0 {
            return Err(anyhow::anyhow!("max_query_length cannot be 0"));
        }

        if self.limits.max_result_rows == 0 {
            return Err(anyhow::anyhow!("max_result_rows cannot be 0"));
        }

        if self.limits.query_timeout_ms == 0 {
            return Err(anyhow::anyhow!("query_timeout_ms cannot be 0"));
        }

        if self.limits.load_timeout_ms == 0 {
            return Err(anyhow::anyhow!("load_timeout_ms cannot be 0"));
        }

        if self.limits.max_tables == 0 || self.limits.max_columns == 0 {
            return Err(anyhow::anyhow!("max_tables and max_columns must be at least 1"));
        }

        if self.pool.max_connections == 0 {
            return Err(anyhow::anyhow!("pool.max_connections cannot be 0"));
        }

        if self.datafusion.target_partitions == 0 {
            return Err(anyhow::anyhow!("datafusion.target_partitions cannot be 0"));
        }
        if self.datafusion.execution_threads == 0 {
            return Err(anyhow::anyhow!("datafusion.execution_threads cannot be 0"));
        }

        Ok(())
    }
}

fn first_set<F>(lookup: &F, keys: &[&'static str]) -> Option<(&'static str, String)>
where
    F: Fn(&str) -> Option<String>,
{
    keys.iter().find_map(|key| lookup(key).map(|value| (*key, value)))
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> anyhow::Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid {} value: {}", key, value))
}

/// Makes a relative directory absolute against the current working directory.
fn normalize_dir_path(path: &str) -> String {
    let candidate = PathBuf::from(path.trim());
    if candidate.is_absolute() {
        return candidate.to_string_lossy().into_owned();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(candidate).to_string_lossy().into_owned(),
        Err(_) => path.to_string(),
    }
}
