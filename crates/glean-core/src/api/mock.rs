//! Scripted in-process transport for tests and offline demos.

use super::client::ApiClient;
use super::transport::{ApiRequest, ApiResponse, Method, Transport};
use crate::config::ClientConfig;
use crate::error::{ApiError, Result};
use crate::session::Session;
use crate::storage::MemoryStorage;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct MockReply {
    status: u16,
    body: String,
    error: Option<ApiError>,
    delay: Duration,
}

impl MockReply {
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self::text(status, body.to_string())
    }

    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            error: None,
            delay: Duration::ZERO,
        }
    }

    pub fn error(error: ApiError) -> Self {
        Self {
            status: 0,
            body: String::new(),
            error: Some(error),
            delay: Duration::ZERO,
        }
    }

    /// Hold the reply for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Default)]
struct MockState {
    routes: HashMap<(Method, String), VecDeque<MockReply>>,
    log: Vec<ApiRequest>,
}

/// Replies are queued per `(method, path)`. The last queued reply keeps
/// answering once the earlier ones are used up. Unscripted routes get a 404.
#[derive(Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Client over a fresh mock with in-memory storage and no retry delay.
    pub fn client() -> (ApiClient, Arc<MockTransport>) {
        Self::client_with_session(Session::new(Arc::new(MemoryStorage::new())))
    }

    pub fn client_with_session(session: Session) -> (ApiClient, Arc<MockTransport>) {
        let transport = Arc::new(MockTransport::new());
        let config = ClientConfig {
            retry_backoff_ms: 0,
            ..ClientConfig::default()
        };
        let client = ApiClient::with_transport(transport.clone(), &config, session);
        (client, transport)
    }

    pub fn respond(&self, method: Method, path: &str, reply: MockReply) -> &Self {
        self.lock()
            .routes
            .entry((method, path.trim_start_matches('/').to_string()))
            .or_default()
            .push_back(reply);
        self
    }

    /// Drop anything queued for the route and answer with `reply` from now on.
    pub fn respond_only(&self, method: Method, path: &str, reply: MockReply) -> &Self {
        self.lock()
            .routes
            .insert(
                (method, path.trim_start_matches('/').to_string()),
                VecDeque::from([reply]),
            );
        self
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.lock().log.clone()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        self.lock()
            .log
            .iter()
            .filter(|request| request.method == method && request.path == path)
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn next_reply(&self, request: &ApiRequest) -> Option<MockReply> {
        let mut state = self.lock();
        state.log.push(request.clone());
        let queue = state
            .routes
            .get_mut(&(request.method, request.path.clone()))?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let Some(reply) = self.next_reply(request) else {
            return Ok(ApiResponse {
                status: 404,
                body: r#"{"detail":"Not Found"}"#.to_string(),
            });
        };
        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }
        match reply.error {
            Some(error) => Err(error),
            None => Ok(ApiResponse {
                status: reply.status,
                body: reply.body,
            }),
        }
    }
}
