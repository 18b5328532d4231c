use super::lock;
use crate::api::{ApiClient, system};
use crate::session::{NO_AUTH_TOKEN, Session};
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AuthSnapshot {
    pub is_auth_enabled: bool,
    pub is_authenticated: bool,
    pub is_initialized: bool,
}

/// Whether the server requires a password and whether this client holds a
/// usable session.
#[derive(Clone)]
pub struct AuthStore {
    api: ApiClient,
    session: Session,
    state: Arc<Mutex<AuthSnapshot>>,
    init_lock: Arc<tokio::sync::Mutex<()>>,
}

impl AuthStore {
    pub fn new(api: ApiClient) -> Self {
        let session = api.session().clone();
        let state = AuthSnapshot {
            is_authenticated: session.token().is_some(),
            ..AuthSnapshot::default()
        };
        Self {
            api,
            session,
            state: Arc::new(Mutex::new(state)),
            init_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        *lock(&self.state)
    }

    pub fn is_auth_enabled(&self) -> bool {
        lock(&self.state).is_auth_enabled
    }

    pub fn is_authenticated(&self) -> bool {
        lock(&self.state).is_authenticated
    }

    pub fn is_initialized(&self) -> bool {
        lock(&self.state).is_initialized
    }

    /// Ask the server whether auth is on. Runs once; concurrent callers wait
    /// for the first. When the server is unreachable the cached answer from
    /// the last successful check is used.
    pub async fn init(&self) {
        if self.is_initialized() {
            return;
        }
        let _guard = self.init_lock.lock().await;
        if self.is_initialized() {
            return;
        }

        match system::auth_status(&self.api).await {
            Ok(status) => {
                info!(auth_enabled = status.enabled, "Checked server auth status");
                self.session.cache_auth_required(status.enabled);
                let mut state = lock(&self.state);
                state.is_auth_enabled = status.enabled;
                if !status.enabled {
                    state.is_authenticated = true;
                }
                state.is_initialized = true;
            }
            Err(err) => {
                let cached = self.session.cached_auth_required().unwrap_or(false);
                warn!(cached_auth_required = cached, "Failed to check auth status: {err}");
                let mut state = lock(&self.state);
                if cached {
                    state.is_auth_enabled = true;
                }
                state.is_initialized = true;
            }
        }
    }

    /// Returns `false` on any failure, including a wrong password.
    pub async fn login(&self, password: &str) -> bool {
        match system::login(&self.api, password).await {
            Ok(reply) if !reply.access_token.is_empty() => {
                if reply.access_token != NO_AUTH_TOKEN {
                    self.session.set_token(&reply.access_token);
                }
                lock(&self.state).is_authenticated = true;
                info!("Signed in");
                true
            }
            Ok(_) => {
                warn!("Login response carried no token");
                false
            }
            Err(err) => {
                error!("Login failed: {err}");
                false
            }
        }
    }

    /// Clears the token. Navigation is left to the caller.
    pub fn logout(&self) {
        self.session.clear_token();
        lock(&self.state).is_authenticated = false;
        info!("Signed out");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Method;
    use crate::api::mock::{MockReply, MockTransport};
    use crate::storage::{ACCESS_TOKEN_KEY, AUTH_REQUIRED_KEY, MemoryStorage, Storage};
    use serde_json::json;

    fn store_with(storage: Arc<MemoryStorage>) -> (AuthStore, Arc<MockTransport>) {
        let (client, transport) = MockTransport::client_with_session(Session::new(storage));
        (AuthStore::new(client), transport)
    }

    #[tokio::test]
    async fn disabled_auth_counts_as_signed_in() {
        let storage = Arc::new(MemoryStorage::new());
        let (store, transport) = store_with(storage.clone());
        transport.respond(
            Method::Get,
            "system/auth-status",
            MockReply::json(200, json!({"enabled": false})),
        );
        assert!(!store.is_authenticated());

        store.init().await;
        assert_eq!(
            store.snapshot(),
            AuthSnapshot {
                is_auth_enabled: false,
                is_authenticated: true,
                is_initialized: true,
            }
        );
        assert_eq!(storage.get(AUTH_REQUIRED_KEY).as_deref(), Some("false"));
    }

    #[tokio::test]
    async fn init_runs_once_even_when_called_concurrently() {
        let (store, transport) = store_with(Arc::new(MemoryStorage::new()));
        transport.respond(
            Method::Get,
            "system/auth-status",
            MockReply::json(200, json!({"enabled": true})),
        );

        tokio::join!(store.init(), store.init());
        store.init().await;
        assert_eq!(transport.count(Method::Get, "system/auth-status"), 1);
        assert!(store.is_auth_enabled());
        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn offline_init_uses_the_cached_flag() {
        let storage = Arc::new(MemoryStorage::with_values([
            (AUTH_REQUIRED_KEY, "true"),
            (ACCESS_TOKEN_KEY, "saved"),
        ]));
        let (store, transport) = store_with(storage);
        transport.respond(
            Method::Get,
            "system/auth-status",
            MockReply::error(crate::ApiError::Network("connection refused".to_string())),
        );

        store.init().await;
        let snapshot = store.snapshot();
        assert!(snapshot.is_initialized);
        assert!(snapshot.is_auth_enabled);
        assert!(snapshot.is_authenticated);
    }

    #[tokio::test]
    async fn offline_init_without_cache_assumes_open_server() {
        let (store, transport) = store_with(Arc::new(MemoryStorage::new()));
        transport.respond(
            Method::Get,
            "system/auth-status",
            MockReply::json(503, json!({"detail": "starting up"})),
        );
        store.init().await;
        assert!(store.is_initialized());
        assert!(!store.is_auth_enabled());
    }

    #[tokio::test]
    async fn login_stores_real_tokens_only() {
        let storage = Arc::new(MemoryStorage::new());
        let (store, transport) = store_with(storage.clone());
        transport.respond(
            Method::Post,
            "system/login",
            MockReply::json(200, json!({"access_token": NO_AUTH_TOKEN, "token_type": "bearer"})),
        );
        assert!(store.login("anything").await);
        assert!(store.is_authenticated());
        assert_eq!(storage.get(ACCESS_TOKEN_KEY), None);

        transport.respond_only(
            Method::Post,
            "system/login",
            MockReply::json(200, json!({"access_token": "jwt-123", "token_type": "bearer"})),
        );
        assert!(store.login("secret").await);
        assert_eq!(storage.get(ACCESS_TOKEN_KEY).as_deref(), Some("jwt-123"));

        store.logout();
        assert!(!store.is_authenticated());
        assert_eq!(storage.get(ACCESS_TOKEN_KEY), None);
    }

    #[tokio::test]
    async fn wrong_password_returns_false() {
        let (store, transport) = store_with(Arc::new(MemoryStorage::new()));
        transport.respond(
            Method::Post,
            "system/login",
            MockReply::json(401, json!({"detail": "Incorrect password"})),
        );
        assert!(!store.login("nope").await);
        assert!(!store.is_authenticated());
    }
}
