//! HTTP access to the Glean server.
//!
//! [`ApiClient`] owns a [`Transport`] wrapped in a fixed middleware chain
//! (notifications, error details, 401 broadcast, GET retry, bearer auth).
//! The endpoint modules are thin typed functions over that client, one per
//! backend operation.

pub mod books;
pub mod chapters;
mod client;
mod events;
pub mod middleware;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod scan;
pub mod system;
mod transport;
pub mod types;

pub use client::ApiClient;
pub use events::{ClientEvent, EventBus, ToastLevel};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Method, Transport};
