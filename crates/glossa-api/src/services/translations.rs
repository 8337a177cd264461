//! Translation write path, search and cache-aside export.

use std::sync::Arc;

use serde::{Deserialize, Deserializer};
use tracing::{debug, info, instrument, Span};

use glossa_core::logging;
use glossa_core::validation::{
    invalid_selection, TRANSLATION_RULES, TRANSLATION_RULES_EMPTY_VALUES,
};
use glossa_core::{
    validate, Error, ExportPayload, FieldValue, LocaleRepository, Mode, NewTranslation, Page,
    PageRequest, Result, TagRepository, TranslationChanges, TranslationFilter, TranslationFull,
    TranslationRepository, ValidationErrors,
};

use super::export_cache::ExportCacheHandle;

/// Request body for creating or updating a translation.
///
/// Every field is optional at the type level so that one body type serves
/// both full (create) and partial (update) validation. For the scalar
/// fields `Some(None)` records an explicit `null`, which fails validation
/// even on update. `tags: null` is the same as omitting `tags`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TranslationPayload {
    #[serde(default, deserialize_with = "explicit_null")]
    pub locale_id: Option<Option<i64>>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub key: Option<Option<String>>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub value: Option<Option<String>>,
    pub tags: Option<Vec<i64>>,
}

/// Present fields deserialize to `Some`, so a `null` becomes `Some(None)`.
fn explicit_null<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl TranslationPayload {
    fn field_values(&self) -> [(&'static str, FieldValue<'_>); 3] {
        [
            ("locale_id", FieldValue::nullable_id(self.locale_id)),
            (
                "key",
                FieldValue::nullable_text(self.key.as_ref().map(Option::as_deref)),
            ),
            (
                "value",
                FieldValue::nullable_text(self.value.as_ref().map(Option::as_deref)),
            ),
        ]
    }
}

/// Owns translation writes and reads.
///
/// Every write that changes a locale's translation set deletes that locale's
/// export entry after the repository call returns.
#[derive(Clone)]
pub struct TranslationService {
    translations: Arc<dyn TranslationRepository>,
    locales: Arc<dyn LocaleRepository>,
    tags: Arc<dyn TagRepository>,
    cache: ExportCacheHandle,
    allow_empty_values: bool,
}

impl TranslationService {
    pub fn new(
        translations: Arc<dyn TranslationRepository>,
        locales: Arc<dyn LocaleRepository>,
        tags: Arc<dyn TagRepository>,
        cache: ExportCacheHandle,
        allow_empty_values: bool,
    ) -> Self {
        Self {
            translations,
            locales,
            tags,
            cache,
            allow_empty_values,
        }
    }

    fn rules(&self) -> glossa_core::validation::RuleTable {
        if self.allow_empty_values {
            TRANSLATION_RULES_EMPTY_VALUES
        } else {
            TRANSLATION_RULES
        }
    }

    /// Verify that the referenced locale and tags exist.
    async fn check_references(&self, locale_id: Option<i64>, tag_ids: &[i64]) -> Result<()> {
        let locale_check = async {
            match locale_id {
                Some(id) => self.locales.exists(id).await,
                None => Ok(true),
            }
        };
        let tag_check = async {
            if tag_ids.is_empty() {
                Ok(Vec::new())
            } else {
                self.tags.missing_ids(tag_ids).await
            }
        };
        let (locale_exists, missing_tags) = futures::try_join!(locale_check, tag_check)?;

        let mut errors = ValidationErrors::default();
        if !locale_exists {
            errors.add("locale_id", invalid_selection("locale_id"));
        }
        for (index, id) in tag_ids.iter().enumerate() {
            if missing_tags.contains(id) {
                let field = format!("tags.{}", index);
                let message = invalid_selection(&field);
                errors.add(field, message);
            }
        }
        errors.into_result()
    }

    async fn locale_code(&self, locale_id: i64) -> Result<Option<String>> {
        Ok(self.locales.find(locale_id).await?.map(|l| l.code))
    }

    #[instrument(skip(self, payload), fields(subsystem = "api", component = "translations", op = "create"))]
    pub async fn create(&self, payload: TranslationPayload) -> Result<TranslationFull> {
        validate(self.rules(), Mode::Full, &payload.field_values()).into_result()?;

        let (Some(Some(locale_id)), Some(Some(key)), Some(Some(value))) =
            (payload.locale_id, payload.key, payload.value)
        else {
            return Err(Error::Internal("validated payload missing fields".to_string()));
        };
        let tag_ids = payload.tags.unwrap_or_default();

        self.check_references(Some(locale_id), &tag_ids).await?;
        if self.translations.key_exists(locale_id, &key, None).await? {
            return Err(Error::duplicate_key());
        }

        let created = self
            .translations
            .insert(NewTranslation {
                locale_id,
                key,
                value,
                tag_ids,
            })
            .await?;

        self.cache.invalidate(&created.locale.code).await;
        info!(
            translation_id = created.translation.id,
            locale_code = %created.locale.code,
            "Translation created"
        );
        Ok(created)
    }

    #[instrument(skip(self, payload), fields(subsystem = "api", component = "translations", op = "update", translation_id = id))]
    pub async fn update(&self, id: i64, payload: TranslationPayload) -> Result<TranslationFull> {
        let current = self.translations.fetch(id).await?;

        validate(self.rules(), Mode::Partial, &payload.field_values()).into_result()?;
        // Explicit nulls were rejected above.
        let locale_id = payload.locale_id.flatten();
        let key = payload.key.flatten();
        let value = payload.value.flatten();

        self.check_references(locale_id, payload.tags.as_deref().unwrap_or(&[]))
            .await?;

        if key.is_some() || locale_id.is_some() {
            let target_locale = locale_id.unwrap_or(current.translation.locale_id);
            let target_key = key.as_deref().unwrap_or(&current.translation.key);
            if self
                .translations
                .key_exists(target_locale, target_key, Some(id))
                .await?
            {
                return Err(Error::duplicate_key());
            }
        }

        let changes = TranslationChanges {
            locale_id,
            key,
            value,
            tag_ids: payload.tags,
        };
        if changes.is_empty() {
            return Ok(current);
        }

        let updated = self.translations.update(id, changes).await?;

        self.cache.invalidate(&current.locale.code).await;
        if updated.locale.id != current.locale.id {
            self.cache.invalidate(&updated.locale.code).await;
        }
        info!(locale_code = %updated.locale.code, "Translation updated");
        Ok(updated)
    }

    #[instrument(skip(self), fields(subsystem = "api", component = "translations", op = "delete", translation_id = id))]
    pub async fn delete(&self, id: i64) -> Result<()> {
        let deleted = self.translations.delete(id).await?;
        if let Some(code) = self.locale_code(deleted.locale_id).await? {
            self.cache.invalidate(&code).await;
        }
        info!(locale_id = deleted.locale_id, "Translation deleted");
        Ok(())
    }

    pub async fn get(&self, id: i64) -> Result<TranslationFull> {
        self.translations.fetch(id).await
    }

    pub async fn list(&self, page: PageRequest) -> Result<Page<TranslationFull>> {
        self.translations
            .search(&TranslationFilter::default(), page)
            .await
    }

    pub async fn search(
        &self,
        filter: &TranslationFilter,
        page: PageRequest,
    ) -> Result<Page<TranslationFull>> {
        let result = self.translations.search(filter, page).await?;
        debug!(
            subsystem = "api",
            component = "translations",
            op = "search",
            total = result.pagination.total,
            result_count = result.data.len(),
            "Search complete"
        );
        Ok(result)
    }

    /// Key-value map for a locale, served from the export cache when possible.
    ///
    /// An unknown locale is `NotFound` and leaves the cache untouched.
    #[instrument(
        skip(self),
        fields(
            subsystem = "api",
            component = "translations",
            op = "export",
            locale_code = %code,
            cache_hit = tracing::field::Empty,
            result_count = tracing::field::Empty,
        )
    )]
    pub async fn export(&self, code: &str) -> Result<ExportPayload> {
        let span = Span::current();

        if let Some(payload) = self.cache.lookup(code).await {
            span.record(logging::CACHE_HIT, true);
            span.record(logging::RESULT_COUNT, payload.len());
            return Ok(payload);
        }
        span.record(logging::CACHE_HIT, false);

        let locale = self
            .locales
            .find_by_code(code)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Locale {}", code)))?;
        let payload = self.translations.export_locale(locale.id).await?;
        span.record(logging::RESULT_COUNT, payload.len());

        self.cache.store(code, &payload).await;
        Ok(payload)
    }
}
