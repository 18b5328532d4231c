use super::defaults;
use super::models::{ClientConfig, LogLevel};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize, serde::Serialize)]
pub(super) struct ConfigTables {
    #[serde(default)]
    server: ServerConfig,
    #[serde(default)]
    retry: RetryConfig,
    #[serde(default)]
    reader: ReaderConfig,
    #[serde(default)]
    storage: StorageConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

impl From<ConfigTables> for ClientConfig {
    fn from(tables: ConfigTables) -> Self {
        ClientConfig {
            base_url: tables.server.base_url,
            api_prefix: tables.server.api_prefix,
            timeout_secs: tables.server.timeout_secs,
            retry_limit: tables.retry.limit,
            retry_status_codes: tables.retry.status_codes,
            retry_backoff_ms: tables.retry.backoff_ms,
            cache_capacity: tables.reader.cache_capacity,
            prune_distance: tables.reader.prune_distance,
            prefetch_behind: tables.reader.prefetch_behind,
            prefetch_ahead: tables.reader.prefetch_ahead,
            storage_dir: tables.storage.dir,
            log_level: tables.logging.log_level,
        }
    }
}

impl From<&ClientConfig> for ConfigTables {
    fn from(config: &ClientConfig) -> Self {
        ConfigTables {
            server: ServerConfig {
                base_url: config.base_url.clone(),
                api_prefix: config.api_prefix.clone(),
                timeout_secs: config.timeout_secs,
            },
            retry: RetryConfig {
                limit: config.retry_limit,
                status_codes: config.retry_status_codes.clone(),
                backoff_ms: config.retry_backoff_ms,
            },
            reader: ReaderConfig {
                cache_capacity: config.cache_capacity,
                prune_distance: config.prune_distance,
                prefetch_behind: config.prefetch_behind,
                prefetch_ahead: config.prefetch_ahead,
            },
            storage: StorageConfig {
                dir: config.storage_dir.clone(),
            },
            logging: LoggingConfig {
                log_level: config.log_level,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct ServerConfig {
    #[serde(default = "defaults::default_base_url")]
    base_url: String,
    #[serde(default = "defaults::default_api_prefix")]
    api_prefix: String,
    #[serde(default = "defaults::default_timeout_secs")]
    timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            base_url: defaults::default_base_url(),
            api_prefix: defaults::default_api_prefix(),
            timeout_secs: defaults::default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct RetryConfig {
    #[serde(default = "defaults::default_retry_limit")]
    limit: u32,
    #[serde(default = "defaults::default_retry_status_codes")]
    status_codes: Vec<u16>,
    #[serde(default = "defaults::default_retry_backoff_ms")]
    backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            limit: defaults::default_retry_limit(),
            status_codes: defaults::default_retry_status_codes(),
            backoff_ms: defaults::default_retry_backoff_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct ReaderConfig {
    #[serde(default = "defaults::default_cache_capacity")]
    cache_capacity: usize,
    #[serde(default = "defaults::default_prune_distance")]
    prune_distance: usize,
    #[serde(default = "defaults::default_prefetch_behind")]
    prefetch_behind: usize,
    #[serde(default = "defaults::default_prefetch_ahead")]
    prefetch_ahead: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        ReaderConfig {
            cache_capacity: defaults::default_cache_capacity(),
            prune_distance: defaults::default_prune_distance(),
            prefetch_behind: defaults::default_prefetch_behind(),
            prefetch_ahead: defaults::default_prefetch_ahead(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct StorageConfig {
    #[serde(default = "defaults::default_storage_dir")]
    dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            dir: defaults::default_storage_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct LoggingConfig {
    #[serde(default = "defaults::default_log_level")]
    log_level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_level: defaults::default_log_level(),
        }
    }
}
