//! Translation service behavior over the in-memory store.
//!
//! Covers the write-path invariants (uniqueness, reference checks, tag sync)
//! and the cache-aside export with invalidation on every write.

use std::sync::Arc;

use glossa_api::services::{
    ExportCacheHandle, LocalePayload, LocaleService, TranslationPayload, TranslationService,
};
use glossa_core::mock::MockStore;
use glossa_core::{
    export_cache_key, CreateLocaleRequest, Error, LocaleRepository, Locale, MemoryExportCache,
    PageRequest, Tag, TagRepository, TranslationFilter, EXPORT_TTL_SECS,
};

struct Harness {
    store: MockStore,
    cache: Arc<MemoryExportCache>,
    service: TranslationService,
    locales: LocaleService,
}

fn harness_with(allow_empty_values: bool) -> Harness {
    let store = MockStore::new();
    let cache = Arc::new(MemoryExportCache::new());
    let handle = ExportCacheHandle::new(cache.clone(), EXPORT_TTL_SECS);
    let service = TranslationService::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        handle.clone(),
        allow_empty_values,
    );
    let locales = LocaleService::new(Arc::new(store.clone()), handle);
    Harness {
        store,
        cache,
        service,
        locales,
    }
}

fn harness() -> Harness {
    harness_with(false)
}

async fn locale(store: &MockStore, code: &str) -> Locale {
    LocaleRepository::create(
        store,
        CreateLocaleRequest {
            code: code.to_string(),
            name: code.to_uppercase(),
        },
    )
    .await
    .expect("create locale")
}

async fn tag(store: &MockStore, name: &str) -> Tag {
    TagRepository::create(store, name).await.expect("create tag")
}

fn payload(locale_id: i64, key: &str, value: &str, tags: Option<Vec<i64>>) -> TranslationPayload {
    TranslationPayload {
        locale_id: Some(Some(locale_id)),
        key: Some(Some(key.to_string())),
        value: Some(Some(value.to_string())),
        tags,
    }
}

fn validation_fields(err: Error) -> Vec<String> {
    match err {
        Error::Validation(errors) => errors.fields().map(str::to_string).collect(),
        other => panic!("Expected Validation error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_create_then_get_round_trips() {
    let h = harness();
    let en = locale(&h.store, "en").await;
    let mobile = tag(&h.store, "mobile").await;

    let created = h
        .service
        .create(payload(en.id, "home.title", "Welcome", Some(vec![mobile.id])))
        .await
        .unwrap();
    let fetched = h.service.get(created.translation.id).await.unwrap();

    assert_eq!(fetched.translation.locale_id, en.id);
    assert_eq!(fetched.translation.key, "home.title");
    assert_eq!(fetched.translation.value, "Welcome");
    assert_eq!(fetched.locale.code, "en");
    assert_eq!(fetched.tag_ids(), vec![mobile.id]);
}

#[tokio::test]
async fn test_duplicate_create_is_conflict_and_keeps_original() {
    let h = harness();
    let en = locale(&h.store, "en").await;

    h.service.create(payload(en.id, "a", "1", None)).await.unwrap();
    let err = h
        .service
        .create(payload(en.id, "a", "2", None))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(ref msg) if msg == "Translation key already exists for this locale."));

    let export = h.service.export("en").await.unwrap();
    assert_eq!(export.get("a").map(String::as_str), Some("1"));
}

#[tokio::test]
async fn test_concurrent_duplicate_creates_leave_one_row() {
    let h = harness();
    let en = locale(&h.store, "en").await;

    let (a, b) = tokio::join!(
        h.service.create(payload(en.id, "race", "a", None)),
        h.service.create(payload(en.id, "race", "b", None)),
    );
    assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
    assert!(matches!(a.err().or(b.err()), Some(Error::Conflict(_))));
    assert_eq!(h.store.translation_count().await, 1);
}

#[tokio::test]
async fn test_same_key_coexists_across_locales() {
    let h = harness();
    let en = locale(&h.store, "en").await;
    let fr = locale(&h.store, "fr").await;

    h.service.create(payload(en.id, "greeting", "Hello", None)).await.unwrap();
    h.service.create(payload(fr.id, "greeting", "Bonjour", None)).await.unwrap();

    assert_eq!(h.store.translation_count().await, 2);
}

#[tokio::test]
async fn test_create_validates_fields_and_references() {
    let h = harness();
    let en = locale(&h.store, "en").await;
    let web = tag(&h.store, "web").await;

    let err = h
        .service
        .create(TranslationPayload {
            locale_id: Some(Some(en.id)),
            key: Some(Some("   ".to_string())),
            value: None,
            tags: None,
        })
        .await
        .unwrap_err();
    assert_eq!(validation_fields(err), vec!["key", "value"]);

    let err = h
        .service
        .create(payload(9_999, "k", "v", Some(vec![web.id, 8_888])))
        .await
        .unwrap_err();
    assert_eq!(validation_fields(err), vec!["locale_id", "tags.1"]);
    assert_eq!(h.store.translation_count().await, 0);
}

#[tokio::test]
async fn test_key_longer_than_255_characters_is_rejected() {
    let h = harness();
    let en = locale(&h.store, "en").await;

    let err = h
        .service
        .create(payload(en.id, &"k".repeat(256), "v", None))
        .await
        .unwrap_err();
    assert_eq!(validation_fields(err), vec!["key"]);
}

#[tokio::test]
async fn test_empty_value_needs_opt_in() {
    let strict = harness();
    let en = locale(&strict.store, "en").await;
    let err = strict
        .service
        .create(payload(en.id, "blank", "", None))
        .await
        .unwrap_err();
    assert_eq!(validation_fields(err), vec!["value"]);

    let lenient = harness_with(true);
    let en = locale(&lenient.store, "en").await;
    let created = lenient
        .service
        .create(payload(en.id, "blank", "", None))
        .await
        .unwrap();
    assert_eq!(created.translation.value, "");

    // Present is still required.
    let err = lenient
        .service
        .create(TranslationPayload {
            locale_id: Some(Some(en.id)),
            key: Some(Some("absent".to_string())),
            value: None,
            tags: None,
        })
        .await
        .unwrap_err();
    assert_eq!(validation_fields(err), vec!["value"]);
}

#[tokio::test]
async fn test_update_tags_three_ways() {
    let h = harness();
    let en = locale(&h.store, "en").await;
    let a = tag(&h.store, "a").await;
    let b = tag(&h.store, "b").await;
    let created = h
        .service
        .create(payload(en.id, "k", "v", Some(vec![a.id])))
        .await
        .unwrap();
    let id = created.translation.id;

    // Absent: untouched.
    let updated = h
        .service
        .update(
            id,
            TranslationPayload {
                value: Some(Some("v2".to_string())),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.tag_ids(), vec![a.id]);

    // Replace: tag-only update leaves key and value alone.
    let updated = h
        .service
        .update(
            id,
            TranslationPayload {
                tags: Some(vec![a.id, b.id]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.tag_ids(), vec![a.id, b.id]);
    assert_eq!(updated.translation.key, "k");
    assert_eq!(updated.translation.value, "v2");

    // Empty: all detached.
    let updated = h
        .service
        .update(
            id,
            TranslationPayload {
                tags: Some(vec![]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(updated.tags.is_empty());
    assert_eq!(h.store.link_count().await, 0);
}

#[tokio::test]
async fn test_null_tags_in_json_are_treated_as_absent() {
    let body: TranslationPayload =
        serde_json::from_str(r#"{"value": "x", "tags": null}"#).unwrap();
    assert!(body.tags.is_none());
}

#[tokio::test]
async fn test_explicit_null_scalars_are_rejected_on_update() {
    let h = harness();
    let en = locale(&h.store, "en").await;
    let created = h.service.create(payload(en.id, "k", "v", None)).await.unwrap();
    let id = created.translation.id;

    for body in [
        r#"{"key": null}"#,
        r#"{"value": null}"#,
        r#"{"locale_id": null, "value": "x"}"#,
    ] {
        let body: TranslationPayload = serde_json::from_str(body).unwrap();
        let err = h.service.update(id, body).await.unwrap_err();
        assert_eq!(validation_fields(err).len(), 1);
    }

    let body: TranslationPayload = serde_json::from_str(r#"{"key": null}"#).unwrap();
    let err = h.service.update(id, body).await.unwrap_err();
    assert_eq!(validation_fields(err), vec!["key"]);

    let unchanged = h.service.get(id).await.unwrap();
    assert_eq!(unchanged.translation.key, "k");
    assert_eq!(unchanged.translation.value, "v");
}

#[tokio::test]
async fn test_update_rechecks_uniqueness_excluding_self() {
    let h = harness();
    let en = locale(&h.store, "en").await;
    h.service.create(payload(en.id, "taken", "1", None)).await.unwrap();
    let other = h.service.create(payload(en.id, "free", "2", None)).await.unwrap();
    let id = other.translation.id;

    // Re-submitting its own key is not a conflict.
    let same = h
        .service
        .update(
            id,
            TranslationPayload {
                key: Some(Some("free".to_string())),
                ..Default::default()
            },
        )
        .await;
    assert!(same.is_ok());

    let err = h
        .service
        .update(
            id,
            TranslationPayload {
                key: Some(Some("taken".to_string())),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));
}

#[tokio::test]
async fn test_update_and_delete_missing_translation_are_not_found() {
    let h = harness();
    let err = h
        .service
        .update(42, TranslationPayload::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    let err = h.service.delete(42).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_delete_removes_tag_links() {
    let h = harness();
    let en = locale(&h.store, "en").await;
    let a = tag(&h.store, "a").await;
    let created = h
        .service
        .create(payload(en.id, "k", "v", Some(vec![a.id])))
        .await
        .unwrap();
    assert_eq!(h.store.link_count().await, 1);

    h.service.delete(created.translation.id).await.unwrap();
    assert_eq!(h.store.link_count().await, 0);
    assert!(matches!(
        h.service.get(created.translation.id).await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn test_export_hit_skips_the_store() {
    let h = harness();
    let en = locale(&h.store, "en").await;
    h.service.create(payload(en.id, "a", "1", None)).await.unwrap();

    let first = h.service.export("en").await.unwrap();
    assert!(h.cache.contains(&export_cache_key("en")).await);

    h.store.clear_calls();
    let second = h.service.export("en").await.unwrap();
    assert_eq!(first, second);
    assert!(h.store.calls().is_empty(), "calls: {:?}", h.store.calls());
}

#[tokio::test]
async fn test_export_reflects_each_write() {
    let h = harness();
    let en = locale(&h.store, "en").await;
    let created = h.service.create(payload(en.id, "a", "1", None)).await.unwrap();

    let export = h.service.export("en").await.unwrap();
    assert_eq!(serde_json::to_value(&export).unwrap(), serde_json::json!({"a": "1"}));

    h.service
        .update(
            created.translation.id,
            TranslationPayload {
                value: Some(Some("2".to_string())),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let export = h.service.export("en").await.unwrap();
    assert_eq!(serde_json::to_value(&export).unwrap(), serde_json::json!({"a": "2"}));

    h.service.delete(created.translation.id).await.unwrap();
    assert!(h.service.export("en").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_moving_translation_invalidates_both_locales() {
    let h = harness();
    let en = locale(&h.store, "en").await;
    let fr = locale(&h.store, "fr").await;
    let created = h.service.create(payload(en.id, "a", "1", None)).await.unwrap();

    h.service.export("en").await.unwrap();
    h.service.export("fr").await.unwrap();
    assert_eq!(h.cache.len().await, 2);

    h.service
        .update(
            created.translation.id,
            TranslationPayload {
                locale_id: Some(Some(fr.id)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(h.cache.is_empty().await);

    assert!(h.service.export("en").await.unwrap().is_empty());
    assert_eq!(h.service.export("fr").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_export_unknown_locale_writes_no_cache_entry() {
    let h = harness();
    let err = h.service.export("xx").await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert!(!h.cache.contains(&export_cache_key("xx")).await);
}

#[tokio::test]
async fn test_locale_rename_and_delete_invalidate_exports() {
    let h = harness();
    let en = locale(&h.store, "en").await;
    h.service.create(payload(en.id, "a", "1", None)).await.unwrap();
    h.service.export("en").await.unwrap();

    h.locales
        .update(
            en.id,
            LocalePayload {
                code: Some("en-GB".to_string()),
                name: None,
            },
        )
        .await
        .unwrap();
    assert!(!h.cache.contains(&export_cache_key("en")).await);
    assert!(matches!(h.service.export("en").await, Err(Error::NotFound(_))));

    h.service.export("en-GB").await.unwrap();
    h.locales.delete(en.id).await.unwrap();
    assert!(h.cache.is_empty().await);
    assert_eq!(h.store.translation_count().await, 0);
}

#[tokio::test]
async fn test_search_predicates() {
    let h = harness();
    let en = locale(&h.store, "en").await;
    let fr = locale(&h.store, "fr").await;
    let mobile = tag(&h.store, "mobile").await;

    h.service
        .create(payload(en.id, "nav.home", "Home", Some(vec![mobile.id])))
        .await
        .unwrap();
    h.service.create(payload(en.id, "nav.about", "About us", None)).await.unwrap();
    h.service
        .create(payload(fr.id, "nav.home", "Accueil", Some(vec![mobile.id])))
        .await
        .unwrap();

    let all = h
        .service
        .search(&TranslationFilter::default(), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(all.pagination.total, 3);

    let tagged = h
        .service
        .search(
            &TranslationFilter {
                tag_id: Some(mobile.id),
                ..Default::default()
            },
            PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(tagged.pagination.total, 2);
    assert!(tagged.data.iter().all(|t| t.tag_ids() == vec![mobile.id]));

    let combined = h
        .service
        .search(
            &TranslationFilter {
                key: Some("home".to_string()),
                locale_id: Some(en.id),
                ..Default::default()
            },
            PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(combined.pagination.total, 1);
    assert_eq!(combined.data[0].translation.value, "Home");

    let case_sensitive = h
        .service
        .search(
            &TranslationFilter {
                content: Some("about".to_string()),
                ..Default::default()
            },
            PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(case_sensitive.pagination.total, 0);
}

#[tokio::test]
async fn test_list_paginates_by_twenty() {
    let h = harness();
    let en = locale(&h.store, "en").await;
    for i in 0..25 {
        h.service
            .create(payload(en.id, &format!("k{:02}", i), "v", None))
            .await
            .unwrap();
    }

    let first = h.service.list(PageRequest::new(Some(1))).await.unwrap();
    assert_eq!(first.data.len(), 20);
    assert_eq!(first.pagination.last_page, 2);
    assert!(first.pagination.has_more);

    let second = h.service.list(PageRequest::new(Some(2))).await.unwrap();
    assert_eq!(second.data.len(), 5);
    assert!(!second.pagination.has_more);
    assert!(first.data[19].translation.id < second.data[0].translation.id);
}
