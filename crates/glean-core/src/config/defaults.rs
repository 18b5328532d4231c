pub(crate) fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

pub(crate) fn default_api_prefix() -> String {
    "api".to_string()
}

pub(crate) fn default_timeout_secs() -> u64 {
    30
}

pub(crate) fn default_retry_limit() -> u32 {
    2
}

pub(crate) fn default_retry_status_codes() -> Vec<u16> {
    vec![408, 413, 429, 500, 502, 503, 504]
}

pub(crate) fn default_retry_backoff_ms() -> u64 {
    300
}

pub(crate) fn default_cache_capacity() -> usize {
    20
}

pub(crate) fn default_prune_distance() -> usize {
    10
}

pub(crate) fn default_prefetch_behind() -> usize {
    1
}

pub(crate) fn default_prefetch_ahead() -> usize {
    2
}

pub(crate) fn default_storage_dir() -> String {
    ".cache".to_string()
}

pub(crate) fn default_log_level() -> crate::config::LogLevel {
    crate::config::LogLevel::Info
}
