//! In-memory store for deterministic testing.
//!
//! [`MockStore`] implements every repository trait over a single mutex-guarded
//! state, mirroring the PostgreSQL constraints: unique locale codes and tag
//! names, unique `(locale_id, key)`, foreign keys with cascading deletes.
//! Each write runs under one lock acquisition, so it is atomic with respect
//! to concurrent callers the way a transaction is.
//!
//! ## Usage
//!
//! ```rust
//! use glossa_core::mock::MockStore;
//! use glossa_core::{CreateLocaleRequest, LocaleRepository};
//!
//! # tokio_test_block_on(async {
//! let store = MockStore::new();
//! let en = store
//!     .create(CreateLocaleRequest { code: "en".into(), name: "English".into() })
//!     .await
//!     .unwrap();
//! assert_eq!(store.calls(), vec!["locale.create"]);
//! # let _ = en;
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::models::*;
use crate::traits::{LocaleRepository, TagRepository, TranslationRepository, UserRepository};
use crate::validation::{already_taken, invalid_selection};

#[derive(Debug, Clone)]
struct TokenRow {
    user_id: i64,
    token_hash: String,
    expires_at: Option<DateTime<Utc>>,
    last_used_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct State {
    next_id: i64,
    locales: BTreeMap<i64, Locale>,
    tags: BTreeMap<i64, Tag>,
    translations: BTreeMap<i64, Translation>,
    /// `(translation_id, tag_id)`
    links: BTreeSet<(i64, i64)>,
    users: BTreeMap<i64, UserCredentials>,
    tokens: BTreeMap<i64, TokenRow>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn locale(&self, id: i64) -> Result<&Locale> {
        self.locales
            .get(&id)
            .ok_or_else(|| Error::NotFound(format!("Locale {}", id)))
    }

    fn key_taken(&self, locale_id: i64, key: &str, excluding: Option<i64>) -> bool {
        self.translations
            .values()
            .any(|t| t.locale_id == locale_id && t.key == key && Some(t.id) != excluding)
    }

    /// Reject dangling locale/tag references the way FK constraints would.
    fn check_references(&self, locale_id: i64, tag_ids: &[i64]) -> Result<()> {
        if !self.locales.contains_key(&locale_id) {
            return Err(Error::invalid_field("locale_id", invalid_selection("locale_id")));
        }
        if let Some(pos) = tag_ids.iter().position(|id| !self.tags.contains_key(id)) {
            let field = format!("tags.{}", pos);
            let message = invalid_selection(&field);
            return Err(Error::invalid_field(field, message));
        }
        Ok(())
    }

    fn full(&self, translation: &Translation) -> Result<TranslationFull> {
        let locale = self.locale(translation.locale_id)?.clone();
        let tags = self
            .links
            .range((translation.id, i64::MIN)..=(translation.id, i64::MAX))
            .filter_map(|(_, tag_id)| self.tags.get(tag_id).cloned())
            .collect();
        Ok(TranslationFull {
            translation: translation.clone(),
            locale,
            tags,
        })
    }

    fn tag_ids_of(&self, translation_id: i64) -> Vec<i64> {
        self.links
            .range((translation_id, i64::MIN)..=(translation_id, i64::MAX))
            .map(|(_, tag_id)| *tag_id)
            .collect()
    }

    fn matches(&self, t: &Translation, filter: &TranslationFilter) -> bool {
        filter.key.as_deref().map_or(true, |k| t.key.contains(k))
            && filter.content.as_deref().map_or(true, |c| t.value.contains(c))
            && filter.locale_id.map_or(true, |l| t.locale_id == l)
            && filter
                .tag_id
                .map_or(true, |tag| self.links.contains(&(t.id, tag)))
    }
}

/// In-memory implementation of all glossa repositories.
///
/// Clones share state.
#[derive(Clone, Default)]
pub struct MockStore {
    state: Arc<Mutex<State>>,
    call_log: Arc<StdMutex<Vec<&'static str>>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, op: &'static str) {
        if let Ok(mut log) = self.call_log.lock() {
            log.push(op);
        }
    }

    /// Operations invoked so far, in call order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.call_log.lock().map(|l| l.clone()).unwrap_or_default()
    }

    pub fn clear_calls(&self) {
        if let Ok(mut log) = self.call_log.lock() {
            log.clear();
        }
    }

    /// Number of rows in the translation↔tag join.
    pub async fn link_count(&self) -> usize {
        self.state.lock().await.links.len()
    }

    pub async fn translation_count(&self) -> usize {
        self.state.lock().await.translations.len()
    }

    /// Force a token's expiry, for expiry tests.
    pub async fn expire_token(&self, token_id: i64, at: DateTime<Utc>) {
        if let Some(row) = self.state.lock().await.tokens.get_mut(&token_id) {
            row.expires_at = Some(at);
        }
    }

    /// `last_used_at` of a token row.
    pub async fn token_last_used(&self, token_id: i64) -> Option<DateTime<Utc>> {
        self.state
            .lock()
            .await
            .tokens
            .get(&token_id)
            .and_then(|row| row.last_used_at)
    }
}

#[async_trait]
impl LocaleRepository for MockStore {
    async fn create(&self, req: CreateLocaleRequest) -> Result<Locale> {
        self.record("locale.create");
        let mut state = self.state.lock().await;
        if state.locales.values().any(|l| l.code == req.code) {
            return Err(Error::invalid_field("code", already_taken("code")));
        }
        let now = Utc::now();
        let locale = Locale {
            id: state.next_id(),
            code: req.code,
            name: req.name,
            created_at: now,
            updated_at: now,
        };
        state.locales.insert(locale.id, locale.clone());
        Ok(locale)
    }

    async fn fetch(&self, id: i64) -> Result<Locale> {
        self.record("locale.fetch");
        self.state.lock().await.locale(id).cloned()
    }

    async fn find(&self, id: i64) -> Result<Option<Locale>> {
        self.record("locale.find");
        Ok(self.state.lock().await.locales.get(&id).cloned())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Locale>> {
        self.record("locale.find_by_code");
        let state = self.state.lock().await;
        Ok(state.locales.values().find(|l| l.code == code).cloned())
    }

    async fn list(&self) -> Result<Vec<Locale>> {
        self.record("locale.list");
        Ok(self.state.lock().await.locales.values().cloned().collect())
    }

    async fn update(&self, id: i64, req: UpdateLocaleRequest) -> Result<Locale> {
        self.record("locale.update");
        let mut state = self.state.lock().await;
        if let Some(code) = &req.code {
            if state
                .locales
                .values()
                .any(|l| &l.code == code && l.id != id)
            {
                return Err(Error::invalid_field("code", already_taken("code")));
            }
        }
        let locale = state
            .locales
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("Locale {}", id)))?;
        if let Some(code) = req.code {
            locale.code = code;
        }
        if let Some(name) = req.name {
            locale.name = name;
        }
        locale.updated_at = Utc::now();
        Ok(locale.clone())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        self.record("locale.delete");
        let mut state = self.state.lock().await;
        if state.locales.remove(&id).is_none() {
            return Err(Error::NotFound(format!("Locale {}", id)));
        }
        let doomed: Vec<i64> = state
            .translations
            .values()
            .filter(|t| t.locale_id == id)
            .map(|t| t.id)
            .collect();
        for tid in &doomed {
            state.translations.remove(tid);
        }
        state.links.retain(|(tid, _)| !doomed.contains(tid));
        Ok(())
    }

    async fn exists(&self, id: i64) -> Result<bool> {
        self.record("locale.exists");
        Ok(self.state.lock().await.locales.contains_key(&id))
    }

    async fn code_taken(&self, code: &str, excluding: Option<i64>) -> Result<bool> {
        self.record("locale.code_taken");
        let state = self.state.lock().await;
        Ok(state
            .locales
            .values()
            .any(|l| l.code == code && Some(l.id) != excluding))
    }
}

#[async_trait]
impl TagRepository for MockStore {
    async fn create(&self, name: &str) -> Result<Tag> {
        self.record("tag.create");
        let mut state = self.state.lock().await;
        if state.tags.values().any(|t| t.name == name) {
            return Err(Error::invalid_field("name", already_taken("name")));
        }
        let now = Utc::now();
        let tag = Tag {
            id: state.next_id(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };
        state.tags.insert(tag.id, tag.clone());
        Ok(tag)
    }

    async fn fetch(&self, id: i64) -> Result<Tag> {
        self.record("tag.fetch");
        self.state
            .lock()
            .await
            .tags
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Tag {}", id)))
    }

    async fn list(&self) -> Result<Vec<Tag>> {
        self.record("tag.list");
        Ok(self.state.lock().await.tags.values().cloned().collect())
    }

    async fn update(&self, id: i64, name: &str) -> Result<Tag> {
        self.record("tag.update");
        let mut state = self.state.lock().await;
        if state.tags.values().any(|t| t.name == name && t.id != id) {
            return Err(Error::invalid_field("name", already_taken("name")));
        }
        let tag = state
            .tags
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("Tag {}", id)))?;
        tag.name = name.to_string();
        tag.updated_at = Utc::now();
        Ok(tag.clone())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        self.record("tag.delete");
        let mut state = self.state.lock().await;
        if state.tags.remove(&id).is_none() {
            return Err(Error::NotFound(format!("Tag {}", id)));
        }
        state.links.retain(|(_, tag_id)| *tag_id != id);
        Ok(())
    }

    async fn missing_ids(&self, ids: &[i64]) -> Result<Vec<i64>> {
        self.record("tag.missing_ids");
        let state = self.state.lock().await;
        Ok(ids
            .iter()
            .copied()
            .filter(|id| !state.tags.contains_key(id))
            .collect())
    }

    async fn name_taken(&self, name: &str, excluding: Option<i64>) -> Result<bool> {
        self.record("tag.name_taken");
        let state = self.state.lock().await;
        Ok(state
            .tags
            .values()
            .any(|t| t.name == name && Some(t.id) != excluding))
    }
}

#[async_trait]
impl TranslationRepository for MockStore {
    async fn insert(&self, req: NewTranslation) -> Result<TranslationFull> {
        self.record("translation.insert");
        let mut state = self.state.lock().await;
        state.check_references(req.locale_id, &req.tag_ids)?;
        if state.key_taken(req.locale_id, &req.key, None) {
            return Err(Error::duplicate_key());
        }

        let now = Utc::now();
        let translation = Translation {
            id: state.next_id(),
            locale_id: req.locale_id,
            key: req.key,
            value: req.value,
            created_at: now,
            updated_at: now,
        };
        for tag_id in &req.tag_ids {
            state.links.insert((translation.id, *tag_id));
        }
        state.translations.insert(translation.id, translation.clone());
        state.full(&translation)
    }

    async fn fetch(&self, id: i64) -> Result<TranslationFull> {
        self.record("translation.fetch");
        let state = self.state.lock().await;
        let translation = state
            .translations
            .get(&id)
            .ok_or_else(|| Error::NotFound(format!("Translation {}", id)))?;
        state.full(translation)
    }

    async fn update(&self, id: i64, changes: TranslationChanges) -> Result<TranslationFull> {
        self.record("translation.update");
        let mut state = self.state.lock().await;
        let current = state
            .translations
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Translation {}", id)))?;

        let locale_id = changes.locale_id.unwrap_or(current.locale_id);
        let key = changes.key.unwrap_or_else(|| current.key.clone());
        state.check_references(locale_id, changes.tag_ids.as_deref().unwrap_or(&[]))?;
        if state.key_taken(locale_id, &key, Some(id)) {
            return Err(Error::duplicate_key());
        }

        if let Some(desired) = &changes.tag_ids {
            let sync = TagSync::plan(&state.tag_ids_of(id), desired);
            for tag_id in sync.detach {
                state.links.remove(&(id, tag_id));
            }
            for tag_id in sync.attach {
                state.links.insert((id, tag_id));
            }
        }

        let updated = Translation {
            locale_id,
            key,
            value: changes.value.unwrap_or(current.value),
            updated_at: Utc::now(),
            ..current
        };
        state.translations.insert(id, updated.clone());
        state.full(&updated)
    }

    async fn delete(&self, id: i64) -> Result<Translation> {
        self.record("translation.delete");
        let mut state = self.state.lock().await;
        let removed = state
            .translations
            .remove(&id)
            .ok_or_else(|| Error::NotFound(format!("Translation {}", id)))?;
        state.links.retain(|(tid, _)| *tid != id);
        Ok(removed)
    }

    async fn key_exists(
        &self,
        locale_id: i64,
        key: &str,
        excluding: Option<i64>,
    ) -> Result<bool> {
        self.record("translation.key_exists");
        Ok(self.state.lock().await.key_taken(locale_id, key, excluding))
    }

    async fn search(
        &self,
        filter: &TranslationFilter,
        page: PageRequest,
    ) -> Result<Page<TranslationFull>> {
        self.record("translation.search");
        let state = self.state.lock().await;
        let matching: Vec<&Translation> = state
            .translations
            .values()
            .filter(|t| state.matches(t, filter))
            .collect();
        let total = matching.len() as i64;
        let data = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.per_page as usize)
            .map(|t| state.full(t))
            .collect::<Result<Vec<_>>>()?;
        Ok(Page::new(data, total, page))
    }

    async fn export_locale(&self, locale_id: i64) -> Result<ExportPayload> {
        self.record("translation.export_locale");
        let state = self.state.lock().await;
        Ok(state
            .translations
            .values()
            .filter(|t| t.locale_id == locale_id)
            .map(|t| (t.key.clone(), t.value.clone()))
            .collect())
    }

    async fn insert_bulk(&self, rows: Vec<NewTranslation>) -> Result<Vec<i64>> {
        self.record("translation.insert_bulk");
        let mut state = self.state.lock().await;
        for (i, row) in rows.iter().enumerate() {
            state.check_references(row.locale_id, &[])?;
            let clash_in_batch = rows[..i]
                .iter()
                .any(|r| r.locale_id == row.locale_id && r.key == row.key);
            if clash_in_batch || state.key_taken(row.locale_id, &row.key, None) {
                return Err(Error::duplicate_key());
            }
        }
        let now = Utc::now();
        let mut ids = Vec::with_capacity(rows.len());
        for row in rows {
            let id = state.next_id();
            state.translations.insert(
                id,
                Translation {
                    id,
                    locale_id: row.locale_id,
                    key: row.key,
                    value: row.value,
                    created_at: now,
                    updated_at: now,
                },
            );
            ids.push(id);
        }
        Ok(ids)
    }

    async fn attach_tags_bulk(&self, pairs: &[(i64, i64)]) -> Result<u64> {
        self.record("translation.attach_tags_bulk");
        let mut state = self.state.lock().await;
        let mut inserted = 0;
        for pair in pairs {
            if state.translations.contains_key(&pair.0)
                && state.tags.contains_key(&pair.1)
                && state.links.insert(*pair)
            {
                inserted += 1;
            }
        }
        Ok(inserted)
    }
}

#[async_trait]
impl UserRepository for MockStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserCredentials>> {
        self.record("user.find_by_email");
        let state = self.state.lock().await;
        Ok(state
            .users
            .values()
            .find(|u| u.user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn upsert_user(&self, req: CreateUserRequest) -> Result<User> {
        self.record("user.upsert");
        let mut state = self.state.lock().await;
        if let Some(existing) = state
            .users
            .values_mut()
            .find(|u| u.user.email.eq_ignore_ascii_case(&req.email))
        {
            existing.user.name = req.name;
            existing.password_hash = req.password_hash;
            return Ok(existing.user.clone());
        }
        let user = User {
            id: state.next_id(),
            name: req.name,
            email: req.email,
            created_at: Utc::now(),
        };
        state.users.insert(
            user.id,
            UserCredentials {
                user: user.clone(),
                password_hash: req.password_hash,
            },
        );
        Ok(user)
    }

    async fn store_token(&self, token: NewApiToken) -> Result<i64> {
        self.record("user.store_token");
        let mut state = self.state.lock().await;
        if !state.users.contains_key(&token.user_id) {
            return Err(Error::NotFound(format!("User {}", token.user_id)));
        }
        let id = state.next_id();
        state.tokens.insert(
            id,
            TokenRow {
                user_id: token.user_id,
                token_hash: token.token_hash,
                expires_at: token.expires_at,
                last_used_at: None,
            },
        );
        Ok(id)
    }

    async fn find_token(&self, token_hash: &str) -> Result<Option<AuthUser>> {
        self.record("user.find_token");
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let Some((token_id, user_id)) = state
            .tokens
            .iter()
            .find(|(_, row)| row.token_hash == token_hash)
            .filter(|(_, row)| row.expires_at.map_or(true, |at| at > now))
            .map(|(id, row)| (*id, row.user_id))
        else {
            return Ok(None);
        };
        if let Some(row) = state.tokens.get_mut(&token_id) {
            row.last_used_at = Some(now);
        }
        Ok(state.users.get(&user_id).map(|creds| AuthUser {
            user: creds.user.clone(),
            token_id,
        }))
    }

    async fn revoke_token(&self, token_id: i64) -> Result<bool> {
        self.record("user.revoke_token");
        Ok(self.state.lock().await.tokens.remove(&token_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seed(store: &MockStore) -> (Locale, Tag) {
        let locale = LocaleRepository::create(
            store,
            CreateLocaleRequest {
                code: "en".to_string(),
                name: "English".to_string(),
            },
        )
        .await
        .unwrap();
        let tag = TagRepository::create(store, "web").await.unwrap();
        (locale, tag)
    }

    fn new_translation(locale_id: i64, key: &str, tag_ids: Vec<i64>) -> NewTranslation {
        NewTranslation {
            locale_id,
            key: key.to_string(),
            value: "v".to_string(),
            tag_ids,
        }
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_pair() {
        let store = MockStore::new();
        let (en, _) = seed(&store).await;
        store.insert(new_translation(en.id, "a", vec![])).await.unwrap();
        let err = store
            .insert(new_translation(en.id, "a", vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(store.translation_count().await, 1);
    }

    #[tokio::test]
    async fn test_insert_rejects_unknown_tag_with_index() {
        let store = MockStore::new();
        let (en, web) = seed(&store).await;
        let err = store
            .insert(new_translation(en.id, "a", vec![web.id, 999]))
            .await
            .unwrap_err();
        match err {
            Error::Validation(errors) => assert!(errors.has("tags.1")),
            other => panic!("Expected Validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_locale_delete_cascades() {
        let store = MockStore::new();
        let (en, web) = seed(&store).await;
        store.insert(new_translation(en.id, "a", vec![web.id])).await.unwrap();
        LocaleRepository::delete(&store, en.id).await.unwrap();
        assert_eq!(store.translation_count().await, 0);
        assert_eq!(store.link_count().await, 0);
    }

    #[tokio::test]
    async fn test_tag_delete_detaches_only() {
        let store = MockStore::new();
        let (en, web) = seed(&store).await;
        let t = store.insert(new_translation(en.id, "a", vec![web.id])).await.unwrap();
        TagRepository::delete(&store, web.id).await.unwrap();
        let fetched = TranslationRepository::fetch(&store, t.translation.id)
            .await
            .unwrap();
        assert!(fetched.tags.is_empty());
    }

    #[tokio::test]
    async fn test_search_is_case_sensitive() {
        let store = MockStore::new();
        let (en, _) = seed(&store).await;
        store.insert(new_translation(en.id, "Home.title", vec![])).await.unwrap();
        let filter = TranslationFilter {
            key: Some("home".to_string()),
            ..Default::default()
        };
        let page = store.search(&filter, PageRequest::default()).await.unwrap();
        assert_eq!(page.pagination.total, 0);
    }

    #[tokio::test]
    async fn test_find_token_skips_expired() {
        let store = MockStore::new();
        let user = store
            .upsert_user(CreateUserRequest {
                name: "Test".to_string(),
                email: "test@example.com".to_string(),
                password_hash: "x".to_string(),
            })
            .await
            .unwrap();
        let token_id = store
            .store_token(NewApiToken {
                user_id: user.id,
                name: "api".to_string(),
                token_hash: "h".to_string(),
                expires_at: None,
            })
            .await
            .unwrap();
        assert!(store.find_token("h").await.unwrap().is_some());
        assert!(store.token_last_used(token_id).await.is_some());

        store
            .expire_token(token_id, Utc::now() - chrono::Duration::seconds(1))
            .await;
        assert!(store.find_token("h").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_call_log() {
        let store = MockStore::new();
        seed(&store).await;
        assert_eq!(store.calls(), vec!["locale.create", "tag.create"]);
        store.clear_calls();
        assert!(store.calls().is_empty());
    }
}
