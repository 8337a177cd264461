//! # glossa-api
//!
//! HTTP layer for the glossa translation service: configuration, services,
//! handlers and the axum router. The `glossa-api` binary wires these to
//! PostgreSQL and Redis; tests drive the router over the in-memory store.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod services;
pub mod state;

pub use config::{CacheBackend, ServerConfig};
pub use error::ApiError;
pub use router::build_router;
pub use state::{AppState, Repositories};
