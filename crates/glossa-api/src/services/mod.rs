//! Service layer for business logic.

pub mod auth;
pub mod export_cache;
pub mod locales;
pub mod translations;

pub use auth::{AuthService, LoginPayload};
pub use export_cache::{build_export_cache, ExportCacheHandle, RedisExportCache};
pub use locales::{LocalePayload, LocaleService, TagPayload, TagService};
pub use translations::{TranslationPayload, TranslationService};
