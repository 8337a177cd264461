//! # glossa-core
//!
//! Core types, traits, and abstractions for the glossa translation service.
//!
//! This crate provides the domain model, error taxonomy, validation rules and
//! the repository/cache traits that the other glossa crates implement or
//! consume.

pub mod cache;
pub mod credentials;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;
pub mod validation;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export commonly used types at crate root
pub use cache::{export_cache_key, MemoryExportCache, NoopExportCache, EXPORT_TTL_SECS};
pub use error::{Error, Result, DUPLICATE_KEY_MESSAGE};
pub use models::*;
pub use traits::*;
pub use validation::{validate, FieldValue, Mode, ValidationErrors};
