//! Persistent client-side key/value storage.
//!
//! This is the local-storage equivalent for the client: a flat string map
//! that survives restarts. [`FileStorage`] keeps one TOML file per server
//! under the configured cache directory, using a hash of the server URL as
//! the directory name so tokens for different servers never mix.
//!
//! Writes are best-effort: failures are logged and the in-memory value still
//! applies for the rest of the process.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Bearer token issued by `system/login`.
pub const ACCESS_TOKEN_KEY: &str = "access_token";
/// Last known answer of `system/auth-status`, as `"true"` / `"false"`.
pub const AUTH_REQUIRED_KEY: &str = "auth_required";
/// JSON-encoded reader appearance preferences.
pub const READER_CONFIG_KEY: &str = "reader-config";

const STORAGE_FILE_NAME: &str = "storage.toml";

pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// Process-local storage; nothing is persisted.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values<K, V>(values: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let map = values
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            values: Mutex::new(map),
        }
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        lock_values(&self.values).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        lock_values(&self.values).insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        lock_values(&self.values).remove(key);
    }
}

/// Write-through TOML file storage scoped to one server.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open (or lazily create) the storage file for `server_url` under
    /// `cache_dir`. An unreadable or corrupt file starts out empty.
    pub fn open(cache_dir: &Path, server_url: &str) -> Self {
        let path = server_dir(cache_dir, server_url).join(STORAGE_FILE_NAME);
        let values = match fs::read_to_string(&path) {
            Ok(data) => match toml::from_str::<BTreeMap<String, String>>(&data) {
                Ok(values) => {
                    debug!(path = %path.display(), keys = values.len(), "Loaded client storage");
                    values
                }
                Err(err) => {
                    warn!(path = %path.display(), "Ignoring corrupt client storage: {err}");
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };
        Self {
            path,
            values: Mutex::new(values),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &BTreeMap<String, String>) {
        if let Some(parent) = self.path.parent() {
            if let Err(err) = fs::create_dir_all(parent) {
                warn!(path = %parent.display(), "Failed to create storage dir: {err}");
                return;
            }
        }
        match toml::to_string(values) {
            Ok(contents) => {
                if let Err(err) = fs::write(&self.path, contents) {
                    warn!(path = %self.path.display(), "Failed to write client storage: {err}");
                }
            }
            Err(err) => warn!("Failed to serialize client storage: {err}"),
        }
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        lock_values(&self.values).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut values = lock_values(&self.values);
        values.insert(key.to_string(), value.to_string());
        self.persist(&values);
    }

    fn remove(&self, key: &str) {
        let mut values = lock_values(&self.values);
        if values.remove(key).is_some() {
            self.persist(&values);
        }
    }
}

/// Per-server directory under `cache_dir`, named by the SHA-256 of the
/// normalized server URL.
pub fn server_dir(cache_dir: &Path, server_url: &str) -> PathBuf {
    let mut hasher = Sha256::new();
    hasher.update(server_url.trim().trim_end_matches('/').as_bytes());
    let hash = format!("{:x}", hasher.finalize());
    cache_dir.join(hash)
}

fn lock_values(
    values: &Mutex<BTreeMap<String, String>>,
) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
    // A panic while holding the map cannot leave it half-written.
    values.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_storage_set_get_remove() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get(ACCESS_TOKEN_KEY), None);
        storage.set(ACCESS_TOKEN_KEY, "abc");
        assert_eq!(storage.get(ACCESS_TOKEN_KEY).as_deref(), Some("abc"));
        storage.remove(ACCESS_TOKEN_KEY);
        assert_eq!(storage.get(ACCESS_TOKEN_KEY), None);
    }

    #[test]
    fn file_storage_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let storage = FileStorage::open(dir.path(), "http://127.0.0.1:8000");
            storage.set(ACCESS_TOKEN_KEY, "token-1");
            storage.set(AUTH_REQUIRED_KEY, "true");
        }
        let reopened = FileStorage::open(dir.path(), "http://127.0.0.1:8000/");
        assert_eq!(reopened.get(ACCESS_TOKEN_KEY).as_deref(), Some("token-1"));
        assert_eq!(reopened.get(AUTH_REQUIRED_KEY).as_deref(), Some("true"));
    }

    #[test]
    fn file_storage_is_scoped_per_server() {
        let dir = tempfile::tempdir().expect("tempdir");
        let first = FileStorage::open(dir.path(), "http://one.local");
        first.set(ACCESS_TOKEN_KEY, "one");
        let second = FileStorage::open(dir.path(), "http://two.local");
        assert_eq!(second.get(ACCESS_TOKEN_KEY), None);
        assert_ne!(first.path(), second.path());
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = server_dir(dir.path(), "http://x.local").join(STORAGE_FILE_NAME);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(&path, "not = [valid").expect("write");
        let storage = FileStorage::open(dir.path(), "http://x.local");
        assert_eq!(storage.get(ACCESS_TOKEN_KEY), None);
        storage.set(ACCESS_TOKEN_KEY, "fresh");
        let reopened = FileStorage::open(dir.path(), "http://x.local");
        assert_eq!(reopened.get(ACCESS_TOKEN_KEY).as_deref(), Some("fresh"));
    }
}
