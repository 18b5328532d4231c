//! Client library for the Glean e-book server.
//!
//! Layers, bottom-up:
//! - `api`: shared HTTP client (middleware chain over a transport) and the
//!   typed endpoint functions.
//! - `store`: auth, shelf and reader state containers built on the endpoints.
//! - `view`: reader appearance preferences plus scroll/fullscreen UI state.
//! - `router`: route table and the auth-aware navigation guard.
//!
//! `session` and `storage` hold what a browser would keep in local storage.

pub mod api;
pub mod config;
pub mod error;
pub mod router;
pub mod session;
pub mod storage;
pub mod store;
pub mod view;

pub use api::{ApiClient, ClientEvent, EventBus, ToastLevel};
pub use config::ClientConfig;
pub use error::{ApiError, Result};
pub use session::Session;
pub use storage::{FileStorage, MemoryStorage, Storage};
