//! Locale and tag management.

use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use glossa_core::validation::{already_taken, LOCALE_RULES, TAG_RULES};
use glossa_core::{
    validate, CreateLocaleRequest, Error, FieldValue, Locale, LocaleRepository, Mode, Result, Tag,
    TagRepository, UpdateLocaleRequest,
};

use super::export_cache::ExportCacheHandle;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocalePayload {
    pub code: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TagPayload {
    pub name: Option<String>,
}

#[derive(Clone)]
pub struct LocaleService {
    locales: Arc<dyn LocaleRepository>,
    cache: ExportCacheHandle,
}

impl LocaleService {
    pub fn new(locales: Arc<dyn LocaleRepository>, cache: ExportCacheHandle) -> Self {
        Self { locales, cache }
    }

    fn check(payload: &LocalePayload, mode: Mode) -> Result<()> {
        validate(
            LOCALE_RULES,
            mode,
            &[
                ("code", FieldValue::text(payload.code.as_deref())),
                ("name", FieldValue::text(payload.name.as_deref())),
            ],
        )
        .into_result()
    }

    async fn ensure_code_free(&self, code: &str, excluding: Option<i64>) -> Result<()> {
        if self.locales.code_taken(code, excluding).await? {
            return Err(Error::invalid_field("code", already_taken("code")));
        }
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<Locale>> {
        self.locales.list().await
    }

    pub async fn get(&self, id: i64) -> Result<Locale> {
        self.locales.fetch(id).await
    }

    pub async fn create(&self, payload: LocalePayload) -> Result<Locale> {
        Self::check(&payload, Mode::Full)?;
        let (Some(code), Some(name)) = (payload.code, payload.name) else {
            return Err(Error::Internal("validated payload missing fields".to_string()));
        };
        self.ensure_code_free(&code, None).await?;

        let locale = self.locales.create(CreateLocaleRequest { code, name }).await?;
        info!(subsystem = "api", component = "locales", locale_code = %locale.code, "Locale created");
        Ok(locale)
    }

    /// Partial update. A code change evicts the export entries of both codes.
    pub async fn update(&self, id: i64, payload: LocalePayload) -> Result<Locale> {
        let current = self.locales.fetch(id).await?;
        Self::check(&payload, Mode::Partial)?;
        if let Some(code) = payload.code.as_deref() {
            self.ensure_code_free(code, Some(id)).await?;
        }

        let updated = self
            .locales
            .update(
                id,
                UpdateLocaleRequest {
                    code: payload.code,
                    name: payload.name,
                },
            )
            .await?;

        if updated.code != current.code {
            self.cache.invalidate(&current.code).await;
            self.cache.invalidate(&updated.code).await;
        }
        Ok(updated)
    }

    /// Delete a locale; its translations go with it.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let locale = self.locales.fetch(id).await?;
        self.locales.delete(id).await?;
        self.cache.invalidate(&locale.code).await;
        info!(subsystem = "api", component = "locales", locale_code = %locale.code, "Locale deleted");
        Ok(())
    }
}

/// Tags carry no export state, so no cache is involved.
#[derive(Clone)]
pub struct TagService {
    tags: Arc<dyn TagRepository>,
}

impl TagService {
    pub fn new(tags: Arc<dyn TagRepository>) -> Self {
        Self { tags }
    }

    fn check(payload: &TagPayload, mode: Mode) -> Result<()> {
        validate(
            TAG_RULES,
            mode,
            &[("name", FieldValue::text(payload.name.as_deref()))],
        )
        .into_result()
    }

    async fn ensure_name_free(&self, name: &str, excluding: Option<i64>) -> Result<()> {
        if self.tags.name_taken(name, excluding).await? {
            return Err(Error::invalid_field("name", already_taken("name")));
        }
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<Tag>> {
        self.tags.list().await
    }

    pub async fn get(&self, id: i64) -> Result<Tag> {
        self.tags.fetch(id).await
    }

    pub async fn create(&self, payload: TagPayload) -> Result<Tag> {
        Self::check(&payload, Mode::Full)?;
        let Some(name) = payload.name else {
            return Err(Error::Internal("validated payload missing fields".to_string()));
        };
        self.ensure_name_free(&name, None).await?;
        self.tags.create(&name).await
    }

    pub async fn update(&self, id: i64, payload: TagPayload) -> Result<Tag> {
        let current = self.tags.fetch(id).await?;
        Self::check(&payload, Mode::Partial)?;
        match payload.name {
            Some(name) => {
                self.ensure_name_free(&name, Some(id)).await?;
                self.tags.update(id, &name).await
            }
            None => Ok(current),
        }
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        self.tags.delete(id).await
    }
}
