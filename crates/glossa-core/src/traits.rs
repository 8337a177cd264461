//! Core traits for glossa abstractions.
//!
//! These traits define the storage and cache interfaces the API layer is
//! written against. The Postgres implementations live in `glossa-db`; the
//! in-memory ones in [`crate::mock`] back the test suites.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// LOCALE & TAG REPOSITORIES
// =============================================================================

#[async_trait]
pub trait LocaleRepository: Send + Sync {
    /// Insert a locale. A taken `code` is a validation error on `code`.
    async fn create(&self, req: CreateLocaleRequest) -> Result<Locale>;

    /// Fetch a locale by id, `NotFound` if absent.
    async fn fetch(&self, id: i64) -> Result<Locale>;

    async fn find(&self, id: i64) -> Result<Option<Locale>>;

    async fn find_by_code(&self, code: &str) -> Result<Option<Locale>>;

    /// All locales ordered by id.
    async fn list(&self) -> Result<Vec<Locale>>;

    async fn update(&self, id: i64, req: UpdateLocaleRequest) -> Result<Locale>;

    /// Delete a locale and, by cascade, its translations.
    async fn delete(&self, id: i64) -> Result<()>;

    async fn exists(&self, id: i64) -> Result<bool>;

    /// Whether `code` is used by a locale other than `excluding`.
    async fn code_taken(&self, code: &str, excluding: Option<i64>) -> Result<bool>;
}

#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Insert a tag. A taken `name` is a validation error on `name`.
    async fn create(&self, name: &str) -> Result<Tag>;

    async fn fetch(&self, id: i64) -> Result<Tag>;

    /// All tags ordered by id.
    async fn list(&self) -> Result<Vec<Tag>>;

    async fn update(&self, id: i64, name: &str) -> Result<Tag>;

    async fn delete(&self, id: i64) -> Result<()>;

    /// Subset of `ids` with no matching tag, in input order.
    async fn missing_ids(&self, ids: &[i64]) -> Result<Vec<i64>>;

    async fn name_taken(&self, name: &str, excluding: Option<i64>) -> Result<bool>;
}

// =============================================================================
// TRANSLATION REPOSITORY
// =============================================================================

#[async_trait]
pub trait TranslationRepository: Send + Sync {
    /// Insert a translation and attach its tags in one transaction.
    ///
    /// A duplicate `(locale_id, key)` yields `Error::Conflict`; a dangling
    /// locale or tag reference yields `Error::Validation`.
    async fn insert(&self, req: NewTranslation) -> Result<TranslationFull>;

    /// Fetch a translation with locale and tags, `NotFound` if absent.
    async fn fetch(&self, id: i64) -> Result<TranslationFull>;

    /// Apply `changes` (fields and tag set) in one transaction.
    ///
    /// Returns the updated translation. Same error mapping as `insert`.
    async fn update(&self, id: i64, changes: TranslationChanges) -> Result<TranslationFull>;

    /// Delete a translation and its tag associations. Returns the deleted row.
    async fn delete(&self, id: i64) -> Result<Translation>;

    /// Whether `(locale_id, key)` is used by a translation other than `excluding`.
    async fn key_exists(&self, locale_id: i64, key: &str, excluding: Option<i64>)
        -> Result<bool>;

    /// Filtered listing ordered by id ascending.
    async fn search(
        &self,
        filter: &TranslationFilter,
        page: PageRequest,
    ) -> Result<Page<TranslationFull>>;

    /// `key → value` for every translation of a locale.
    async fn export_locale(&self, locale_id: i64) -> Result<ExportPayload>;

    /// Bulk insert without tags; used by the seeder. Returns inserted ids.
    async fn insert_bulk(&self, rows: Vec<NewTranslation>) -> Result<Vec<i64>>;

    /// Attach `(translation_id, tag_id)` pairs, ignoring ones already present.
    async fn attach_tags_bulk(&self, pairs: &[(i64, i64)]) -> Result<u64>;
}

// =============================================================================
// IDENTITY
// =============================================================================

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Look up a user and password hash by email (case-insensitive).
    async fn find_by_email(&self, email: &str) -> Result<Option<UserCredentials>>;

    /// Create a user, or update name and password if the email exists.
    async fn upsert_user(&self, req: CreateUserRequest) -> Result<User>;

    /// Persist a token hash. Returns the token row id.
    async fn store_token(&self, token: NewApiToken) -> Result<i64>;

    /// Resolve a token hash to its owner, recording last use.
    ///
    /// Expired or unknown tokens resolve to `None`.
    async fn find_token(&self, token_hash: &str) -> Result<Option<AuthUser>>;

    /// Delete a token row. Returns whether it existed.
    async fn revoke_token(&self, token_id: i64) -> Result<bool>;
}

// =============================================================================
// EXPORT CACHE
// =============================================================================

/// Key-value store for serialized locale exports.
///
/// Implementations must be safe for concurrent use. Callers treat errors as
/// cache misses on read and log them on write.
#[async_trait]
pub trait ExportCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<ExportPayload>>;

    async fn set(&self, key: &str, payload: &ExportPayload, ttl_secs: u64) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Backend name for logs and health output.
    fn backend(&self) -> &'static str;
}
