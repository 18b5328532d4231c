//! Session context shared by the HTTP layer and the auth store.

use crate::storage::{ACCESS_TOKEN_KEY, AUTH_REQUIRED_KEY, Storage};
use std::sync::Arc;

/// Token value the server hands out when no password is configured. It is
/// never persisted.
pub const NO_AUTH_TOKEN: &str = "no-auth-needed";

/// Handle over the storage keys that make up the auth session.
#[derive(Clone)]
pub struct Session {
    storage: Arc<dyn Storage>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("has_token", &self.token().is_some())
            .finish()
    }
}

impl Session {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn token(&self) -> Option<String> {
        self.storage
            .get(ACCESS_TOKEN_KEY)
            .filter(|token| !token.trim().is_empty())
    }

    pub fn set_token(&self, token: &str) {
        self.storage.set(ACCESS_TOKEN_KEY, token);
    }

    pub fn clear_token(&self) {
        self.storage.remove(ACCESS_TOKEN_KEY);
    }

    /// Cached auth-required flag; only the literal `"true"` counts.
    pub fn cached_auth_required(&self) -> Option<bool> {
        self.storage
            .get(AUTH_REQUIRED_KEY)
            .map(|value| value.trim() == "true")
    }

    pub fn cache_auth_required(&self, required: bool) {
        self.storage
            .set(AUTH_REQUIRED_KEY, if required { "true" } else { "false" });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn blank_token_counts_as_absent() {
        let session = Session::new(Arc::new(MemoryStorage::with_values([(
            ACCESS_TOKEN_KEY,
            "  ",
        )])));
        assert_eq!(session.token(), None);
    }

    #[test]
    fn auth_required_flag_only_accepts_literal_true() {
        let storage = Arc::new(MemoryStorage::new());
        let session = Session::new(storage.clone());
        assert_eq!(session.cached_auth_required(), None);
        session.cache_auth_required(true);
        assert_eq!(session.cached_auth_required(), Some(true));
        storage.set(AUTH_REQUIRED_KEY, "yes");
        assert_eq!(session.cached_auth_required(), Some(false));
    }
}
