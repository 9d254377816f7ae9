//! Reconciler behavior against in-memory and scripted store gateways.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use marksync::application::services::reconciler::BookmarkReconciler;
use marksync::domain::bookmark::{Bookmark, BookmarkPatch, NewBookmark};
use marksync::domain::category::{Category, SortOrder};
use marksync::domain::error::DomainError;
use marksync::domain::gateways::change_feed::ChangeEvent;
use marksync::domain::gateways::store::{BookmarkStore, StoreError, StoreResult};
use marksync::infrastructure::gateways::memory::MemoryBookmarkStore;
use marksync::util::testing::{init_test_env, sample_bookmark, tags};

/// Memory-backed store whose failure modes can be switched on per operation.
#[derive(Debug, Default)]
struct ScriptedStore {
    inner: MemoryBookmarkStore,
    fail_insert: AtomicBool,
    fail_update: AtomicBool,
    fail_delete: AtomicBool,
}

#[async_trait]
impl BookmarkStore for ScriptedStore {
    async fn fetch_all(&self, owner: Uuid, order: SortOrder) -> StoreResult<Vec<Bookmark>> {
        self.inner.fetch_all(owner, order).await
    }

    async fn insert(&self, draft: &NewBookmark) -> StoreResult<Bookmark> {
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(StoreError::new("backend unavailable"));
        }
        self.inner.insert(draft).await
    }

    async fn update(&self, id: Uuid, patch: &BookmarkPatch) -> StoreResult<()> {
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(StoreError::new("backend unavailable"));
        }
        self.inner.update(id, patch).await
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(StoreError::new("backend unavailable"));
        }
        self.inner.delete(id).await
    }
}

fn ids(reconciler: &BookmarkReconciler) -> Vec<Uuid> {
    reconciler.snapshot().iter().map(|b| b.id).collect()
}

#[tokio::test]
async fn given_existing_url_when_inserting_then_duplicate_conflict_without_store_call() {
    init_test_env();
    let store = Arc::new(MemoryBookmarkStore::new());
    let reconciler = BookmarkReconciler::new(Uuid::new_v4(), store.clone());

    reconciler
        .insert("Docs", "https://x.com", Category::Work, vec![])
        .await
        .unwrap();

    // same url modulo trim and case
    let error = reconciler
        .insert("Docs again", " HTTPS://X.COM ", Category::All, vec![])
        .await
        .unwrap_err();
    assert!(matches!(error, DomainError::DuplicateConflict));

    assert_eq!(reconciler.snapshot().len(), 1);
    assert_eq!(store.row_count(), 1);
}

#[tokio::test]
async fn given_failing_store_when_inserting_then_collection_rolls_back() {
    init_test_env();
    let store = Arc::new(ScriptedStore::default());
    let reconciler = BookmarkReconciler::new(Uuid::new_v4(), store.clone());

    reconciler
        .insert("Kept", "https://kept.com", Category::All, vec![])
        .await
        .unwrap();
    let before = ids(&reconciler);

    store.fail_insert.store(true, Ordering::SeqCst);
    let error = reconciler
        .insert("Doomed", "https://doomed.com", Category::All, vec![])
        .await
        .unwrap_err();

    assert!(matches!(error, DomainError::Store(_)));
    assert_eq!(ids(&reconciler), before);
}

#[tokio::test]
async fn given_successful_insert_then_only_canonical_row_remains() {
    init_test_env();
    let store = Arc::new(MemoryBookmarkStore::new());
    let reconciler = BookmarkReconciler::new(Uuid::new_v4(), store.clone());

    let canonical = reconciler
        .insert("Docs", "https://x.com", Category::Work, tags(&["news"]))
        .await
        .unwrap();

    let snapshot = reconciler.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].id, canonical.id);
    assert_eq!(snapshot[0].title, "Docs");
    assert!(snapshot[0].has_tag("News"));

    // the store knows the same single row under the same id
    let stored = store
        .fetch_all(reconciler.owner(), SortOrder::NewestFirst)
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, canonical.id);
}

#[tokio::test]
async fn given_failing_store_when_deleting_then_record_restored_in_place() {
    init_test_env();
    let store = Arc::new(ScriptedStore::default());
    let reconciler = BookmarkReconciler::new(Uuid::new_v4(), store.clone());

    reconciler.insert("a", "https://a.com", Category::All, vec![]).await.unwrap();
    let middle = reconciler.insert("b", "https://b.com", Category::All, vec![]).await.unwrap();
    reconciler.insert("c", "https://c.com", Category::All, vec![]).await.unwrap();
    let before = ids(&reconciler);

    store.fail_delete.store(true, Ordering::SeqCst);
    let error = reconciler.delete(middle.id).await.unwrap_err();
    assert!(matches!(error, DomainError::Store(_)));

    // same records, same relative position
    assert_eq!(ids(&reconciler), before);
}

#[tokio::test]
async fn given_absent_id_when_deleting_then_noop_success() {
    init_test_env();
    let reconciler = BookmarkReconciler::new(Uuid::new_v4(), Arc::new(MemoryBookmarkStore::new()));
    assert!(reconciler.delete(Uuid::new_v4()).await.is_ok());
}

#[tokio::test]
async fn given_remote_delete_delivered_twice_then_idempotent() {
    init_test_env();
    let reconciler = BookmarkReconciler::new(Uuid::new_v4(), Arc::new(MemoryBookmarkStore::new()));
    let row = sample_bookmark(reconciler.owner(), "Docs", "https://x.com", chrono::Duration::zero());
    let id = row.id;

    reconciler.apply_remote(ChangeEvent::Inserted(row));
    assert_eq!(reconciler.snapshot().len(), 1);

    reconciler.apply_remote(ChangeEvent::Deleted(id));
    reconciler.apply_remote(ChangeEvent::Deleted(id));
    assert!(reconciler.snapshot().is_empty());
}

#[tokio::test]
async fn given_remote_upsert_then_replace_or_insert() {
    init_test_env();
    let reconciler = BookmarkReconciler::new(Uuid::new_v4(), Arc::new(MemoryBookmarkStore::new()));
    let row = sample_bookmark(reconciler.owner(), "Docs", "https://x.com", chrono::Duration::zero());

    // absent id: size grows by one
    reconciler.apply_remote(ChangeEvent::Updated(row.clone()));
    assert_eq!(reconciler.snapshot().len(), 1);

    // present id: fields replaced wholesale, size unchanged
    let mut renamed = row.clone();
    renamed.title = "Docs v2".to_string();
    renamed.is_favorite = true;
    reconciler.apply_remote(ChangeEvent::Updated(renamed));

    let snapshot = reconciler.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].title, "Docs v2");
    assert!(snapshot[0].is_favorite);
}

#[tokio::test]
async fn given_foreign_owner_row_when_applying_remote_then_dropped() {
    init_test_env();
    let reconciler = BookmarkReconciler::new(Uuid::new_v4(), Arc::new(MemoryBookmarkStore::new()));
    let foreign = sample_bookmark(Uuid::new_v4(), "Not mine", "https://else.com", chrono::Duration::zero());

    reconciler.apply_remote(ChangeEvent::Inserted(foreign));
    assert!(reconciler.snapshot().is_empty());
}

#[tokio::test]
async fn given_malformed_payload_when_applying_remote_then_dropped_silently() {
    init_test_env();
    let reconciler = BookmarkReconciler::new(Uuid::new_v4(), Arc::new(MemoryBookmarkStore::new()));

    reconciler.apply_remote_payload(&serde_json::json!({"type": "update"}));
    reconciler.apply_remote_payload(&serde_json::json!({"nonsense": true}));
    assert!(reconciler.snapshot().is_empty());
}

#[tokio::test]
async fn given_store_first_update_then_local_state_untouched_on_failure() {
    init_test_env();
    let store = Arc::new(ScriptedStore::default());
    let reconciler = BookmarkReconciler::new(Uuid::new_v4(), store.clone());
    let row = reconciler
        .insert("Docs", "https://x.com", Category::All, vec![])
        .await
        .unwrap();

    store.fail_update.store(true, Ordering::SeqCst);
    let error = reconciler
        .update(row.id, &BookmarkPatch::default().with_title("Docs v2"))
        .await
        .unwrap_err();
    assert!(matches!(error, DomainError::Store(_)));
    assert_eq!(reconciler.snapshot()[0].title, "Docs");

    store.fail_update.store(false, Ordering::SeqCst);
    reconciler
        .update(row.id, &BookmarkPatch::default().with_title("Docs v2"))
        .await
        .unwrap();
    assert_eq!(reconciler.snapshot()[0].title, "Docs v2");
}

#[tokio::test]
async fn given_unknown_id_when_updating_or_toggling_then_not_found() {
    init_test_env();
    let reconciler = BookmarkReconciler::new(Uuid::new_v4(), Arc::new(MemoryBookmarkStore::new()));
    let id = Uuid::new_v4();

    assert!(matches!(
        reconciler.update(id, &BookmarkPatch::default().with_title("x")).await,
        Err(DomainError::NotFound(_))
    ));
    assert!(matches!(
        reconciler.toggle_favorite(id).await,
        Err(DomainError::NotFound(_))
    ));
}

#[tokio::test]
async fn given_blank_fields_when_mutating_then_validation_error() {
    init_test_env();
    let reconciler = BookmarkReconciler::new(Uuid::new_v4(), Arc::new(MemoryBookmarkStore::new()));

    assert!(matches!(
        reconciler.insert("  ", "https://x.com", Category::All, vec![]).await,
        Err(DomainError::Validation(_))
    ));
    assert!(matches!(
        reconciler.insert("Docs", "", Category::All, vec![]).await,
        Err(DomainError::Validation(_))
    ));

    let row = reconciler
        .insert("Docs", "https://x.com", Category::All, vec![])
        .await
        .unwrap();
    assert!(matches!(
        reconciler.update(row.id, &BookmarkPatch::default().with_title("  ")).await,
        Err(DomainError::Validation(_))
    ));
}

#[tokio::test]
async fn given_toggle_failure_then_reload_resynchronizes() {
    init_test_env();
    let store = Arc::new(ScriptedStore::default());
    let reconciler = BookmarkReconciler::new(Uuid::new_v4(), store.clone());
    let row = reconciler
        .insert("Docs", "https://x.com", Category::All, vec![])
        .await
        .unwrap();

    store.fail_update.store(true, Ordering::SeqCst);
    let error = reconciler.toggle_favorite(row.id).await.unwrap_err();
    assert!(matches!(error, DomainError::Store(_)));

    // the optimistic flip was rolled back by reloading canonical state
    let snapshot = reconciler.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert!(!snapshot[0].is_favorite);
    assert!(!reconciler.is_loading());
}

#[tokio::test]
async fn given_full_lifecycle_then_collection_ends_empty() {
    init_test_env();
    let store = Arc::new(MemoryBookmarkStore::new());
    let reconciler = BookmarkReconciler::new(Uuid::new_v4(), store.clone());

    let row = reconciler
        .insert("Docs", "https://x.com", Category::Work, vec![])
        .await
        .unwrap();
    assert_eq!(reconciler.snapshot().len(), 1);

    let favorite = reconciler.toggle_favorite(row.id).await.unwrap();
    assert!(favorite);
    assert!(reconciler.snapshot()[0].is_favorite);

    reconciler
        .update(row.id, &BookmarkPatch::default().with_title("Docs2"))
        .await
        .unwrap();
    assert_eq!(reconciler.snapshot()[0].title, "Docs2");
    assert_eq!(reconciler.snapshot()[0].id, row.id);

    reconciler.delete(row.id).await.unwrap();
    assert!(reconciler.snapshot().is_empty());
    assert_eq!(store.row_count(), 0);
}

#[tokio::test]
async fn given_concurrent_same_url_inserts_then_exactly_one_succeeds() {
    init_test_env();
    let reconciler = Arc::new(BookmarkReconciler::new(
        Uuid::new_v4(),
        Arc::new(MemoryBookmarkStore::new()),
    ));

    let (first, second) = tokio::join!(
        reconciler.insert("First", "https://x.com", Category::All, vec![]),
        reconciler.insert("Second", "https://X.com", Category::All, vec![]),
    );

    let successes = [&first, &second].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    let conflict = [first, second]
        .into_iter()
        .find(Result::is_err)
        .unwrap()
        .unwrap_err();
    assert!(matches!(conflict, DomainError::DuplicateConflict));
    assert_eq!(reconciler.snapshot().len(), 1);
}

/// Store whose first fetch is slow and answers with stale (empty) state.
#[derive(Debug)]
struct SlowFirstFetch {
    inner: MemoryBookmarkStore,
    delay_next: AtomicBool,
}

#[async_trait]
impl BookmarkStore for SlowFirstFetch {
    async fn fetch_all(&self, owner: Uuid, order: SortOrder) -> StoreResult<Vec<Bookmark>> {
        if self.delay_next.swap(false, Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(80)).await;
            return Ok(Vec::new());
        }
        self.inner.fetch_all(owner, order).await
    }

    async fn insert(&self, draft: &NewBookmark) -> StoreResult<Bookmark> {
        self.inner.insert(draft).await
    }

    async fn update(&self, id: Uuid, patch: &BookmarkPatch) -> StoreResult<()> {
        self.inner.update(id, patch).await
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        self.inner.delete(id).await
    }
}

#[tokio::test]
async fn given_superseded_reload_then_stale_result_discarded() {
    init_test_env();
    let owner = Uuid::new_v4();
    let store = Arc::new(SlowFirstFetch {
        inner: MemoryBookmarkStore::new(),
        delay_next: AtomicBool::new(true),
    });
    store
        .inner
        .seed(vec![sample_bookmark(owner, "Docs", "https://x.com", chrono::Duration::zero())]);

    let reconciler = Arc::new(BookmarkReconciler::new(owner, store));

    let slow = {
        let reconciler = reconciler.clone();
        tokio::spawn(async move { reconciler.reload(SortOrder::NewestFirst).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    // newer reload finishes first and wins
    reconciler.reload(SortOrder::NewestFirst).await.unwrap();
    assert_eq!(reconciler.snapshot().len(), 1);

    slow.await.unwrap().unwrap();
    assert_eq!(reconciler.snapshot().len(), 1);
    assert!(!reconciler.is_loading());
}

#[tokio::test]
async fn given_failing_store_when_reloading_then_collection_unchanged() {
    init_test_env();

    #[derive(Debug)]
    struct FailingFetch;

    #[async_trait]
    impl BookmarkStore for FailingFetch {
        async fn fetch_all(&self, _: Uuid, _: SortOrder) -> StoreResult<Vec<Bookmark>> {
            Err(StoreError::new("backend unavailable"))
        }
        async fn insert(&self, _: &NewBookmark) -> StoreResult<Bookmark> {
            Err(StoreError::new("backend unavailable"))
        }
        async fn update(&self, _: Uuid, _: &BookmarkPatch) -> StoreResult<()> {
            Err(StoreError::new("backend unavailable"))
        }
        async fn delete(&self, _: Uuid) -> StoreResult<()> {
            Err(StoreError::new("backend unavailable"))
        }
    }

    let broken = BookmarkReconciler::new(Uuid::new_v4(), Arc::new(FailingFetch));
    let row = sample_bookmark(broken.owner(), "Kept", "https://kept.com", chrono::Duration::zero());
    broken.apply_remote(ChangeEvent::Inserted(row));

    let error = broken.reload(SortOrder::NewestFirst).await.unwrap_err();
    assert!(matches!(error, DomainError::Store(_)));
    assert_eq!(broken.snapshot().len(), 1);
    assert!(!broken.is_loading());
}
