//! Request middleware around the transport.
//!
//! Each stage handles one concern and forwards to [`Next`]. The client
//! installs them outermost first:
//!
//! ```text
//! Notify -> ErrorDetail -> UnauthorizedBroadcast -> Retry -> BearerAuth -> Transport
//! ```
//!
//! So retries see raw statuses, the 401 broadcast fires once per logical
//! call, and notifications see the final outcome with `detail` applied.

use super::events::{ClientEvent, EventBus, ToastLevel};
use super::transport::{ApiRequest, ApiResponse, Method, Transport};
use crate::error::{ApiError, Result};
use crate::session::Session;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

#[async_trait]
pub trait Middleware: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle(&self, request: ApiRequest, next: Next<'_>) -> Result<ApiResponse>;
}

/// The remainder of the chain after the current stage.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    transport: &'a dyn Transport,
    chain: &'a [Arc<dyn Middleware>],
}

impl<'a> Next<'a> {
    pub fn new(transport: &'a dyn Transport, chain: &'a [Arc<dyn Middleware>]) -> Self {
        Self { transport, chain }
    }

    pub async fn run(self, request: ApiRequest) -> Result<ApiResponse> {
        match self.chain.split_first() {
            Some((stage, rest)) => {
                stage
                    .handle(
                        request,
                        Next {
                            transport: self.transport,
                            chain: rest,
                        },
                    )
                    .await
            }
            None => self.transport.send(&request).await,
        }
    }
}

/// Attaches `Authorization: Bearer <token>` when the session holds a token.
///
/// The token is read on every request so a login or logout applies to the
/// very next call.
pub struct BearerAuth {
    session: Session,
}

impl BearerAuth {
    pub fn new(session: Session) -> Self {
        Self { session }
    }
}

#[async_trait]
impl Middleware for BearerAuth {
    fn name(&self) -> &'static str {
        "bearer-auth"
    }

    async fn handle(&self, mut request: ApiRequest, next: Next<'_>) -> Result<ApiResponse> {
        if let Some(token) = self.session.token() {
            request.set_header("Authorization", format!("Bearer {token}"));
        }
        next.run(request).await
    }
}

/// Bounded retry of GET requests on transient statuses and connection
/// failures. Timeouts are not retried.
pub struct Retry {
    limit: u32,
    status_codes: Vec<u16>,
    backoff: Duration,
}

impl Retry {
    pub fn new(limit: u32, status_codes: Vec<u16>, backoff: Duration) -> Self {
        Self {
            limit,
            status_codes,
            backoff,
        }
    }

    /// Delay before retry number `attempt` (1-based): backoff doubled each time.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.backoff.saturating_mul(factor).min(MAX_RETRY_DELAY)
    }

    fn should_retry(&self, outcome: &Result<ApiResponse>) -> bool {
        match outcome {
            Ok(response) => self.status_codes.contains(&response.status),
            Err(ApiError::Network(_)) => true,
            Err(_) => false,
        }
    }
}

#[async_trait]
impl Middleware for Retry {
    fn name(&self) -> &'static str {
        "retry"
    }

    async fn handle(&self, request: ApiRequest, next: Next<'_>) -> Result<ApiResponse> {
        if request.method != Method::Get || self.limit == 0 {
            return next.run(request).await;
        }

        let mut attempt = 0;
        loop {
            let outcome = next.run(request.clone()).await;
            if attempt >= self.limit || !self.should_retry(&outcome) {
                return outcome;
            }
            attempt += 1;
            let delay = self.delay_for(attempt);
            debug!(
                path = %request.path,
                attempt,
                status = ?outcome.as_ref().ok().map(|response| response.status),
                delay_ms = delay.as_millis() as u64,
                "Retrying GET request"
            );
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Broadcasts [`ClientEvent::Unauthorized`] when the server answers 401.
pub struct UnauthorizedBroadcast {
    events: EventBus,
}

impl UnauthorizedBroadcast {
    pub fn new(events: EventBus) -> Self {
        Self { events }
    }
}

#[async_trait]
impl Middleware for UnauthorizedBroadcast {
    fn name(&self) -> &'static str {
        "unauthorized-broadcast"
    }

    async fn handle(&self, request: ApiRequest, next: Next<'_>) -> Result<ApiResponse> {
        let path = request.path.clone();
        let response = next.run(request).await?;
        if response.status == 401 {
            warn!(%path, "Server rejected the session (401)");
            self.events.emit(ClientEvent::Unauthorized);
        }
        Ok(response)
    }
}

/// Converts non-2xx responses into [`ApiError::Status`], taking the message
/// from the server's `detail` field when present.
pub struct ErrorDetail;

impl ErrorDetail {
    fn generic_message(status: u16) -> String {
        let reason = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|code| code.canonical_reason());
        match reason {
            Some(reason) => format!("Request failed with status code {status} {reason}"),
            None => format!("Request failed with status code {status}"),
        }
    }
}

#[async_trait]
impl Middleware for ErrorDetail {
    fn name(&self) -> &'static str {
        "error-detail"
    }

    async fn handle(&self, request: ApiRequest, next: Next<'_>) -> Result<ApiResponse> {
        let response = next.run(request).await?;
        if response.is_success() {
            return Ok(response);
        }
        let detail = response.json_string_field("detail");
        let message = detail
            .clone()
            .unwrap_or_else(|| Self::generic_message(response.status));
        Err(ApiError::Status {
            status: response.status,
            message,
            detail,
        })
    }
}

/// Surfaces server messages as toasts: `message` on non-GET successes,
/// `detail` on failures.
pub struct Notify {
    events: EventBus,
}

impl Notify {
    pub fn new(events: EventBus) -> Self {
        Self { events }
    }
}

#[async_trait]
impl Middleware for Notify {
    fn name(&self) -> &'static str {
        "notify"
    }

    async fn handle(&self, request: ApiRequest, next: Next<'_>) -> Result<ApiResponse> {
        let method = request.method;
        let outcome = next.run(request).await;
        match &outcome {
            Ok(response) if method != Method::Get => {
                if let Some(message) = response.json_string_field("message") {
                    self.events.emit(ClientEvent::Toast {
                        level: ToastLevel::Success,
                        message,
                    });
                }
            }
            Err(err) => {
                if let Some(detail) = err.detail() {
                    self.events.emit(ClientEvent::Toast {
                        level: ToastLevel::Error,
                        message: detail.to_string(),
                    });
                }
            }
            Ok(_) => {}
        }
        outcome
    }
}
