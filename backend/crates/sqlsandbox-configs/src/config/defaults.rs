// Default value functions

pub fn default_true() -> bool {
    true
}

pub fn default_max_result_rows() -> usize {
    1000
}

pub fn default_query_timeout_ms() -> u64 {
    5000 // 5 seconds
}

pub fn default_load_timeout_ms() -> u64 {
    10_000
}

pub fn default_max_tables() -> usize {
    16
}

pub fn default_max_columns() -> usize {
    64
}

pub fn default_max_rows_per_table() -> usize {
    10_000
}

pub fn default_pool_max_connections() -> usize {
    num_cpus::get().max(1) * 2
}

pub fn default_pool_acquire_timeout_ms() -> u64 {
    3000
}

pub fn default_validation_mode() -> String {
    "strict".to_string()
}

pub fn default_max_query_length() -> usize {
    20_000
}

pub fn default_idle_ttl_seconds() -> u64 {
    1800 // 30 minutes
}

pub fn default_sweep_interval_seconds() -> u64 {
    60
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_logs_path() -> String {
    "./logs".to_string()
}

pub fn default_log_format() -> String {
    "compact".to_string()
}

pub fn default_slow_query_threshold_ms() -> u64 {
    1000
}

pub fn default_target_partitions() -> usize {
    4
}

pub fn default_memory_limit_bytes() -> usize {
    256 * 1024 * 1024 // 256MB
}

pub fn default_execution_threads() -> usize {
    num_cpus::get().max(2)
}
