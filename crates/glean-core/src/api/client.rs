use super::events::EventBus;
use super::middleware::{
    BearerAuth, ErrorDetail, Middleware, Next, Notify, Retry, UnauthorizedBroadcast,
};
use super::transport::{ApiRequest, ApiResponse, HttpTransport, Transport};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::session::Session;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Shared HTTP client. Cheap to clone; every clone uses the same chain,
/// session and event bus.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    transport: Arc<dyn Transport>,
    chain: Vec<Arc<dyn Middleware>>,
    events: EventBus,
    session: Session,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("middleware", &self.middleware_names())
            .field("session", &self.inner.session)
            .finish()
    }
}

impl ApiClient {
    /// Client over HTTP against `config.api_root()`.
    pub fn connect(config: &ClientConfig, session: Session) -> Result<Self> {
        let root = config.api_root();
        let transport = HttpTransport::new(&root, config.timeout())?;
        info!(api_root = %root, timeout_secs = config.timeout().as_secs(), "API client ready");
        Ok(Self::with_transport(Arc::new(transport), config, session))
    }

    pub fn with_transport(
        transport: Arc<dyn Transport>,
        config: &ClientConfig,
        session: Session,
    ) -> Self {
        let events = EventBus::default();
        let chain: Vec<Arc<dyn Middleware>> = vec![
            Arc::new(Notify::new(events.clone())),
            Arc::new(ErrorDetail),
            Arc::new(UnauthorizedBroadcast::new(events.clone())),
            Arc::new(Retry::new(
                config.retry_limit,
                config.retry_status_codes.clone(),
                config.retry_backoff(),
            )),
            Arc::new(BearerAuth::new(session.clone())),
        ];
        Self {
            inner: Arc::new(ClientInner {
                transport,
                chain,
                events,
                session,
            }),
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    pub fn middleware_names(&self) -> Vec<&'static str> {
        self.inner.chain.iter().map(|stage| stage.name()).collect()
    }

    /// Run `request` through the chain. Non-2xx statuses come back as
    /// [`crate::ApiError::Status`].
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let method = request.method;
        let path = request.path.clone();
        let started = Instant::now();
        let outcome = Next::new(self.inner.transport.as_ref(), &self.inner.chain)
            .run(request)
            .await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            Ok(response) => {
                debug!(%method, %path, status = response.status, elapsed_ms, "API request finished")
            }
            Err(err) => debug!(%method, %path, elapsed_ms, "API request failed: {err}"),
        }
        outcome
    }

    pub async fn json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        self.execute(request).await?.json()
    }

    pub async fn text(&self, request: ApiRequest) -> Result<String> {
        Ok(self.execute(request).await?.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::events::ClientEvent;
    use crate::api::mock::{MockReply, MockTransport};
    use crate::api::transport::Method;
    use crate::storage::MemoryStorage;
    use serde_json::json;

    #[test]
    fn chain_order_is_fixed() {
        let client = ApiClient::with_transport(
            Arc::new(MockTransport::new()),
            &ClientConfig::default(),
            Session::new(Arc::new(MemoryStorage::new())),
        );
        assert_eq!(
            client.middleware_names(),
            vec![
                "notify",
                "error-detail",
                "unauthorized-broadcast",
                "retry",
                "bearer-auth"
            ]
        );
    }

    #[tokio::test]
    async fn failed_get_is_retried_then_reported_once() {
        let (client, transport) = MockTransport::client();
        let mut rx = client.events().subscribe();
        transport.respond(
            Method::Get,
            "books",
            MockReply::json(503, json!({"detail": "Library is busy"})),
        );

        let err = client
            .json::<Vec<serde_json::Value>>(ApiRequest::get("books"))
            .await
            .expect_err("503");
        assert_eq!(err.status(), Some(503));
        assert_eq!(transport.count(Method::Get, "books"), 3);
        assert!(matches!(
            rx.try_recv().expect("toast"),
            ClientEvent::Toast { message, .. } if message == "Library is busy"
        ));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn text_returns_the_raw_body() {
        let (client, transport) = MockTransport::client();
        transport.respond(
            Method::Get,
            "books/1/chapters/0",
            MockReply::text(200, "<p>Call me Ishmael.</p>"),
        );
        let body = client
            .text(ApiRequest::get("books/1/chapters/0"))
            .await
            .expect("body");
        assert_eq!(body, "<p>Call me Ishmael.</p>");
    }
}
