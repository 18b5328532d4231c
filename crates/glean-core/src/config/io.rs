use super::models::ClientConfig;
use super::tables::ConfigTables;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Load configuration from the given path, falling back to defaults on error.
pub fn load_config(path: &Path) -> ClientConfig {
    let contents = match fs::read_to_string(path) {
        Ok(data) => {
            info!(path = %path.display(), "Loaded client config");
            data
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                "Falling back to default config: {err}"
            );
            return ClientConfig::default();
        }
    };

    match parse_config(&contents) {
        Ok(cfg) => {
            debug!(base_url = %cfg.base_url, "Parsed configuration from disk");
            cfg
        }
        Err(err) => {
            warn!(path = %path.display(), "Invalid config TOML: {err}");
            ClientConfig::default()
        }
    }
}

pub fn parse_config(contents: &str) -> Result<ClientConfig, toml::de::Error> {
    toml::from_str::<ConfigTables>(contents).map(ClientConfig::from)
}

pub fn serialize_config(config: &ClientConfig) -> Result<String, toml::ser::Error> {
    toml::to_string(&ConfigTables::from(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn sectioned_toml_maps_onto_flat_config() {
        let cfg = parse_config(
            r#"
            [server]
            base_url = "http://library.lan:9000"
            timeout_secs = 10

            [retry]
            limit = 4
            status_codes = [503]

            [reader]
            cache_capacity = 8

            [logging]
            log_level = "debug"
            "#,
        )
        .expect("valid config");

        assert_eq!(cfg.base_url, "http://library.lan:9000");
        assert_eq!(cfg.api_prefix, "api");
        assert_eq!(cfg.timeout_secs, 10);
        assert_eq!(cfg.retry_limit, 4);
        assert_eq!(cfg.retry_status_codes, vec![503]);
        assert_eq!(cfg.retry_backoff_ms, 300);
        assert_eq!(cfg.cache_capacity, 8);
        assert_eq!(cfg.prune_distance, 10);
        assert_eq!(cfg.log_level, LogLevel::Debug);
    }

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = parse_config("").expect("empty config");
        assert_eq!(cfg, ClientConfig::default());
    }

    #[test]
    fn serialized_config_parses_back_to_the_same_values() {
        let mut cfg = ClientConfig::default();
        cfg.base_url = "https://glean.example".to_string();
        cfg.prefetch_ahead = 3;
        let text = serialize_config(&cfg).expect("serialize");
        assert!(text.contains("[server]"));
        assert_eq!(parse_config(&text).expect("parse"), cfg);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&dir.path().join("absent.toml"));
        assert_eq!(cfg, ClientConfig::default());
    }

    #[test]
    fn invalid_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "[server\nbase_url = ").expect("write");
        assert_eq!(load_config(&path), ClientConfig::default());
    }
}
