use super::*;
use crate::storage::MemoryStorage;
use std::time::Duration;

fn store_with_backend() -> (Arc<MemoryStorage>, KvStore, FavoritesStore) {
    let backend = Arc::new(MemoryStorage::new());
    let kv = KvStore::new(backend.clone());
    let store = FavoritesStore::load(kv.clone());
    (backend, kv, store)
}

fn persisted(kv: &KvStore) -> Option<serde_json::Value> {
    kv.read::<serde_json::Value>(FAVORITES_KEY)
}

// =============================================================================
// toggle / query
// =============================================================================

#[test]
fn toggle_adds_then_removes() {
    let (_, _, store) = store_with_backend();
    assert!(!store.is_favorite(5));
    assert!(store.toggle_favorite(5).unwrap());
    assert!(store.is_favorite(5));
    assert!(!store.toggle_favorite(5).unwrap());
    assert!(!store.is_favorite(5));
}

#[test]
fn toggle_parity_over_sequences() {
    for toggles in 0..7 {
        let (_, _, store) = store_with_backend();
        store.toggle_favorite(2).unwrap();
        let before = store.is_favorite(9);
        for _ in 0..toggles {
            store.toggle_favorite(9).unwrap();
        }
        let expected = if toggles % 2 == 0 { before } else { !before };
        assert_eq!(store.is_favorite(9), expected, "after {toggles} toggles");
        assert!(store.is_favorite(2));
    }
}

#[test]
fn persisted_mapping_never_holds_false() {
    let (_, kv, store) = store_with_backend();
    store.toggle_favorite(1).unwrap();
    store.toggle_favorite(2).unwrap();
    store.toggle_favorite(1).unwrap();

    assert_eq!(persisted(&kv), Some(serde_json::json!({ "2": true })));
}

#[test]
fn favorite_ids_are_sorted() {
    let (_, _, store) = store_with_backend();
    for id in [42, 7, 19] {
        store.toggle_favorite(id).unwrap();
    }
    assert_eq!(store.favorite_ids(), vec![7, 19, 42]);
    assert_eq!(store.favorite_count(), 3);
}

#[test]
fn clear_empties_and_persists() {
    let (_, kv, store) = store_with_backend();
    store.toggle_favorite(1).unwrap();
    store.clear_favorites().unwrap();

    assert!(store.favorite_ids().is_empty());
    assert_eq!(persisted(&kv), Some(serde_json::json!({})));
}

// =============================================================================
// hydration
// =============================================================================

#[test]
fn hydrate_reads_saved_favorites_and_drops_false_entries() {
    let backend = Arc::new(MemoryStorage::new());
    backend.insert_raw(FAVORITES_KEY, r#"{"1":true,"2":false,"3":true}"#);
    let store = FavoritesStore::load(KvStore::new(backend));

    assert_eq!(store.favorite_ids(), vec![1, 3]);
    assert!(!store.is_favorite(2));
}

#[test]
fn corrupt_saved_favorites_hydrate_as_empty() {
    let backend = Arc::new(MemoryStorage::new());
    backend.insert_raw(FAVORITES_KEY, "not json");
    let store = FavoritesStore::load(KvStore::new(backend));

    assert!(store.is_loaded());
    assert!(store.favorite_ids().is_empty());
}

#[test]
fn toggles_before_hydration_are_not_persisted() {
    let backend = Arc::new(MemoryStorage::new());
    backend.insert_raw(FAVORITES_KEY, r#"{"8":true}"#);
    let kv = KvStore::new(backend);
    let store = FavoritesStore::new(kv.clone());

    assert!(!store.is_loaded());
    store.toggle_favorite(3).unwrap();
    assert_eq!(persisted(&kv), Some(serde_json::json!({ "8": true })));

    store.hydrate();
    assert_eq!(store.favorite_ids(), vec![8]);
}

// =============================================================================
// write failure
// =============================================================================

#[test]
fn failed_write_restores_cache_and_reports_error() {
    let kv = KvStore::new(Arc::new(MemoryStorage::with_quota(2)));
    let store = FavoritesStore::load(kv.clone());

    let err = store.toggle_favorite(5).unwrap_err();
    assert!(matches!(err, StorageError::QuotaExceeded { .. }));
    assert!(!store.is_favorite(5));
    assert_eq!(persisted(&kv), None);
}

#[tokio::test]
async fn failed_write_sends_no_notification() {
    let kv = KvStore::new(Arc::new(MemoryStorage::with_quota(2)));
    let store = FavoritesStore::load(kv.clone());
    let mut rx = kv.subscribe();

    assert!(store.toggle_favorite(5).is_err());
    assert!(rx.try_recv().is_err());
}

// =============================================================================
// notifications
// =============================================================================

#[tokio::test]
async fn subscribers_see_local_toggles() {
    let (_, _, store) = store_with_backend();
    let mut sub = store.subscribe();

    store.toggle_favorite(11).unwrap();

    let snapshot = sub.recv().await.unwrap();
    assert_eq!(snapshot.keys().copied().collect::<Vec<_>>(), vec![11]);
}

#[tokio::test]
async fn subscribers_ignore_other_keys() {
    let (_, kv, store) = store_with_backend();
    let mut sub = store.subscribe();

    kv.write("rick-morty-theme", &"dark").unwrap();
    store.toggle_favorite(4).unwrap();

    let snapshot = sub.recv().await.unwrap();
    assert!(snapshot.contains_key(&4));
}

#[test]
fn apply_change_replaces_cache_for_favorites_key_only() {
    let (_, _, store) = store_with_backend();
    store.toggle_favorite(1).unwrap();

    let other = StorageChange { key: "other".into(), value: None, origin: ChangeOrigin::External };
    assert!(!store.apply_change(&other));
    assert!(store.is_favorite(1));

    let change = StorageChange {
        key: FAVORITES_KEY.into(),
        value: Some(serde_json::json!({ "2": true, "3": false })),
        origin: ChangeOrigin::External,
    };
    assert!(store.apply_change(&change));
    assert_eq!(store.favorite_ids(), vec![2]);
}

#[tokio::test]
async fn sync_task_applies_external_changes() {
    let (_, kv, store) = store_with_backend();
    let handle = store.spawn_sync();
    tokio::task::yield_now().await;

    kv.notify_external(FAVORITES_KEY, Some(r#"{"77":true}"#));

    for _ in 0..50 {
        if store.is_favorite(77) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(store.is_favorite(77));
    handle.abort();
}

#[tokio::test]
async fn sync_task_does_not_replay_local_writes() {
    let (_, kv, store) = store_with_backend();
    let handle = store.spawn_sync();
    tokio::task::yield_now().await;

    store.toggle_favorite(1).unwrap();
    store.toggle_favorite(2).unwrap();
    kv.notify_external("unrelated", Some("1"));
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(store.favorite_ids(), vec![1, 2]);
    handle.abort();
}

#[test]
fn clones_share_one_cache() {
    let (_, _, store) = store_with_backend();
    let other = store.clone();
    store.toggle_favorite(3).unwrap();
    assert!(other.is_favorite(3));
}
