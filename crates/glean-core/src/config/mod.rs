//! Configuration loading for the Glean client.
//!
//! Settings live in `conf/config.toml` as sectioned tables and are flattened
//! into [`ClientConfig`]. Missing or invalid entries fall back to defaults so
//! the client can always start against a local server.

mod defaults;
mod io;
mod models;
mod tables;

pub use io::{load_config, parse_config, serialize_config};
pub use models::{ClientConfig, LogLevel};
