//! Core data models for glossa.
//!
//! These types are shared across all glossa crates and represent the core
//! domain entities.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of items per page for translation listings and search.
pub const PAGE_SIZE: i64 = 20;

// =============================================================================
// LOCALE & TAG TYPES
// =============================================================================

/// A language/region identifier under which translations are grouped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locale {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateLocaleRequest {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateLocaleRequest {
    pub code: Option<String>,
    pub name: Option<String>,
}

/// A free-form label attachable to many translations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// TRANSLATION TYPES
// =============================================================================

/// A key-value pair of localized text scoped to one locale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    pub id: i64,
    pub locale_id: i64,
    pub key: String,
    pub value: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Translation with its locale and tag set denormalized for the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationFull {
    #[serde(flatten)]
    pub translation: Translation,
    pub locale: Locale,
    pub tags: Vec<Tag>,
}

impl TranslationFull {
    pub fn tag_ids(&self) -> Vec<i64> {
        self.tags.iter().map(|t| t.id).collect()
    }
}

/// Validated input for inserting a translation.
#[derive(Debug, Clone)]
pub struct NewTranslation {
    pub locale_id: i64,
    pub key: String,
    pub value: String,
    pub tag_ids: Vec<i64>,
}

/// Validated partial update for a translation.
///
/// `tag_ids`: `None` leaves tags untouched, `Some(vec![])` detaches all,
/// otherwise the tag set is replaced.
#[derive(Debug, Clone, Default)]
pub struct TranslationChanges {
    pub locale_id: Option<i64>,
    pub key: Option<String>,
    pub value: Option<String>,
    pub tag_ids: Option<Vec<i64>>,
}

impl TranslationChanges {
    pub fn is_empty(&self) -> bool {
        self.locale_id.is_none()
            && self.key.is_none()
            && self.value.is_none()
            && self.tag_ids.is_none()
    }
}

/// Independent, optional predicates ANDed together by search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationFilter {
    /// Substring of `key` (case-sensitive).
    pub key: Option<String>,
    /// Substring of `value` (case-sensitive).
    pub content: Option<String>,
    /// Translation must carry this tag.
    pub tag_id: Option<i64>,
    /// Translation must belong to this locale.
    pub locale_id: Option<i64>,
}

/// Key → value mapping for every translation of one locale.
pub type ExportPayload = BTreeMap<String, String>;

/// Attach/detach plan that turns one tag set into another.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSync {
    pub attach: Vec<i64>,
    pub detach: Vec<i64>,
}

impl TagSync {
    /// Compute the symmetric difference between `current` and `desired`.
    /// Tags present in both are left alone.
    pub fn plan(current: &[i64], desired: &[i64]) -> Self {
        let mut attach: Vec<i64> = desired
            .iter()
            .copied()
            .filter(|id| !current.contains(id))
            .collect();
        attach.sort_unstable();
        attach.dedup();

        let mut detach: Vec<i64> = current
            .iter()
            .copied()
            .filter(|id| !desired.contains(id))
            .collect();
        detach.sort_unstable();
        detach.dedup();

        Self { attach, detach }
    }

    pub fn is_noop(&self) -> bool {
        self.attach.is_empty() && self.detach.is_empty()
    }
}

// =============================================================================
// PAGINATION
// =============================================================================

/// 1-based page request with a fixed page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub per_page: i64,
}

impl PageRequest {
    /// Page numbers below 1 are clamped to the first page.
    pub fn new(page: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: PAGE_SIZE,
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Pagination metadata for list responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub current_page: i64,
    pub per_page: i64,
    /// Total number of items matching the query (across all pages)
    pub total: i64,
    pub last_page: i64,
    /// True if more items are available after this page
    pub has_more: bool,
}

/// A page of results plus pagination metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub pagination: PageMeta,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, total: i64, req: PageRequest) -> Self {
        let last_page = if total == 0 {
            1
        } else {
            (total + req.per_page - 1) / req.per_page
        };
        Self {
            data,
            pagination: PageMeta {
                current_page: req.page,
                per_page: req.per_page,
                total,
                last_page,
                has_more: req.page < last_page,
            },
        }
    }

    pub fn empty(req: PageRequest) -> Self {
        Self::new(Vec::new(), 0, req)
    }
}

// =============================================================================
// IDENTITY TYPES
// =============================================================================

/// Public view of a user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// User row including the stored password hash. Never serialized.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

/// Insert request for an API token; only the hash is persisted.
#[derive(Debug, Clone)]
pub struct NewApiToken {
    pub user_id: i64,
    pub name: String,
    pub token_hash: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// The authenticated caller of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user: User,
    /// Token the request presented (revoked on logout).
    pub token_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_sync_symmetric_difference() {
        let sync = TagSync::plan(&[1, 2, 3], &[2, 3, 4]);
        assert_eq!(sync.attach, vec![4]);
        assert_eq!(sync.detach, vec![1]);
    }

    #[test]
    fn test_tag_sync_empty_desired_detaches_all() {
        let sync = TagSync::plan(&[5, 1], &[]);
        assert!(sync.attach.is_empty());
        assert_eq!(sync.detach, vec![1, 5]);
    }

    #[test]
    fn test_tag_sync_identical_is_noop() {
        assert!(TagSync::plan(&[1, 2], &[2, 1]).is_noop());
    }

    #[test]
    fn test_tag_sync_deduplicates_desired() {
        let sync = TagSync::plan(&[], &[3, 3, 2]);
        assert_eq!(sync.attach, vec![2, 3]);
    }

    #[test]
    fn test_page_request_clamps_and_offsets() {
        assert_eq!(PageRequest::new(None).page, 1);
        assert_eq!(PageRequest::new(Some(0)).page, 1);
        assert_eq!(PageRequest::new(Some(-4)).page, 1);
        assert_eq!(PageRequest::new(Some(3)).offset(), 40);
    }

    #[test]
    fn test_page_meta() {
        let page = Page::new(vec![1; 20], 41, PageRequest::new(Some(2)));
        assert_eq!(page.pagination.last_page, 3);
        assert!(page.pagination.has_more);

        let last = Page::new(vec![1], 41, PageRequest::new(Some(3)));
        assert!(!last.pagination.has_more);

        let empty: Page<i32> = Page::empty(PageRequest::default());
        assert_eq!(empty.pagination.total, 0);
        assert_eq!(empty.pagination.last_page, 1);
        assert!(!empty.pagination.has_more);
    }

    #[test]
    fn test_translation_full_serializes_flat() {
        let now = Utc::now();
        let full = TranslationFull {
            translation: Translation {
                id: 1,
                locale_id: 2,
                key: "home.title".to_string(),
                value: "Home".to_string(),
                created_at: now,
                updated_at: now,
            },
            locale: Locale {
                id: 2,
                code: "en".to_string(),
                name: "English".to_string(),
                created_at: now,
                updated_at: now,
            },
            tags: vec![],
        };
        let json = serde_json::to_value(&full).unwrap();
        assert_eq!(json["key"], "home.title");
        assert_eq!(json["locale_id"], 2);
        assert_eq!(json["locale"]["code"], "en");
        assert_eq!(json["tags"], serde_json::json!([]));
    }

    #[test]
    fn test_translation_changes_is_empty() {
        assert!(TranslationChanges::default().is_empty());
        let changes = TranslationChanges {
            tag_ids: Some(vec![]),
            ..Default::default()
        };
        assert!(!changes.is_empty());
    }
}
