use serde::Deserialize;
use std::time::Duration;

/// Flattened client configuration; see `tables` for the on-disk layout.
#[derive(Debug, Clone, Deserialize, serde::Serialize, PartialEq)]
pub struct ClientConfig {
    #[serde(default = "crate::config::defaults::default_base_url")]
    pub base_url: String,
    #[serde(default = "crate::config::defaults::default_api_prefix")]
    pub api_prefix: String,
    #[serde(default = "crate::config::defaults::default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "crate::config::defaults::default_retry_limit")]
    pub retry_limit: u32,
    #[serde(default = "crate::config::defaults::default_retry_status_codes")]
    pub retry_status_codes: Vec<u16>,
    #[serde(default = "crate::config::defaults::default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default = "crate::config::defaults::default_cache_capacity")]
    pub cache_capacity: usize,
    #[serde(default = "crate::config::defaults::default_prune_distance")]
    pub prune_distance: usize,
    #[serde(default = "crate::config::defaults::default_prefetch_behind")]
    pub prefetch_behind: usize,
    #[serde(default = "crate::config::defaults::default_prefetch_ahead")]
    pub prefetch_ahead: usize,
    #[serde(default = "crate::config::defaults::default_storage_dir")]
    pub storage_dir: String,
    #[serde(default = "crate::config::defaults::default_log_level")]
    pub log_level: LogLevel,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_url: crate::config::defaults::default_base_url(),
            api_prefix: crate::config::defaults::default_api_prefix(),
            timeout_secs: crate::config::defaults::default_timeout_secs(),
            retry_limit: crate::config::defaults::default_retry_limit(),
            retry_status_codes: crate::config::defaults::default_retry_status_codes(),
            retry_backoff_ms: crate::config::defaults::default_retry_backoff_ms(),
            cache_capacity: crate::config::defaults::default_cache_capacity(),
            prune_distance: crate::config::defaults::default_prune_distance(),
            prefetch_behind: crate::config::defaults::default_prefetch_behind(),
            prefetch_ahead: crate::config::defaults::default_prefetch_ahead(),
            storage_dir: crate::config::defaults::default_storage_dir(),
            log_level: crate::config::defaults::default_log_level(),
        }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Base URL every endpoint path is joined onto, always ending in `/`.
    pub fn api_root(&self) -> String {
        let base = self.base_url.trim().trim_end_matches('/');
        let prefix = self.api_prefix.trim().trim_matches('/');
        if prefix.is_empty() {
            format!("{base}/")
        } else {
            format!("{base}/{prefix}/")
        }
    }
}

/// Supported logging verbosity levels.
#[derive(Debug, Clone, Copy, Deserialize, serde::Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_filter_str())
    }
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_root_joins_base_and_prefix_with_single_slashes() {
        let mut config = ClientConfig::default();
        config.base_url = "http://books.local:8000/".to_string();
        config.api_prefix = "/api/".to_string();
        assert_eq!(config.api_root(), "http://books.local:8000/api/");

        config.api_prefix = String::new();
        assert_eq!(config.api_root(), "http://books.local:8000/");
    }

    #[test]
    fn zero_timeout_is_raised_to_one_second() {
        let mut config = ClientConfig::default();
        config.timeout_secs = 0;
        assert_eq!(config.timeout(), Duration::from_secs(1));
    }
}
