//! Shared state containers over the endpoint functions.
//!
//! Stores are cheap to clone and share one `Arc<Mutex<_>>` state each. Locks
//! are held only to read or replace state, never across an await.

pub mod auth;
pub mod books;
pub mod cache;
pub mod reader;

pub use auth::{AuthSnapshot, AuthStore};
pub use books::{BookFilters, BooksSnapshot, BooksStore, filter_books};
pub use cache::ChapterCache;
pub use reader::{ReaderPhase, ReaderPolicy, ReaderSnapshot, ReaderStore};

use std::sync::{Mutex, MutexGuard};

pub(crate) fn lock<T>(state: &Mutex<T>) -> MutexGuard<'_, T> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
