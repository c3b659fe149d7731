//! Server crate for the Reel Catalog service.
//!
//! This crate exposes the catalog store and the rating aggregator over HTTP.

pub mod api;
pub mod config;
pub mod error;
pub mod health;

pub use api::{AppState, router};
pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
