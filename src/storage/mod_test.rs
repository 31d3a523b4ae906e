use super::*;
use serde::Deserialize;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Sample {
    count: u32,
}

fn memory_store() -> (Arc<MemoryStorage>, KvStore) {
    let backend = Arc::new(MemoryStorage::new());
    let kv = KvStore::new(backend.clone());
    (backend, kv)
}

// =============================================================================
// read / write
// =============================================================================

#[test]
fn read_missing_key_is_none() {
    let kv = KvStore::in_memory();
    assert_eq!(kv.read::<Sample>("missing"), None);
}

#[test]
fn write_then_read_round_trips() {
    let kv = KvStore::in_memory();
    kv.write("sample", &Sample { count: 3 }).unwrap();
    assert_eq!(kv.read::<Sample>("sample"), Some(Sample { count: 3 }));
}

#[test]
fn read_invalid_json_is_treated_as_absent() {
    let (backend, kv) = memory_store();
    backend.insert_raw("sample", "{not json");
    assert_eq!(kv.read::<Sample>("sample"), None);
}

#[test]
fn read_wrong_shape_is_treated_as_absent() {
    let (backend, kv) = memory_store();
    backend.insert_raw("sample", "[1,2,3]");
    assert_eq!(kv.read::<Sample>("sample"), None);
}

#[test]
fn failed_write_keeps_prior_value_and_sends_nothing() {
    let kv = KvStore::new(Arc::new(MemoryStorage::with_quota(12)));
    kv.write("sample", &Sample { count: 1 }).unwrap();
    let mut rx = kv.subscribe();

    let err = kv.write("sample", &Sample { count: 1_000_000 }).unwrap_err();
    assert!(matches!(err, StorageError::QuotaExceeded { .. }));
    assert_eq!(kv.read::<Sample>("sample"), Some(Sample { count: 1 }));
    assert!(rx.try_recv().is_err());
}

#[test]
fn remove_deletes_and_notifies() {
    let kv = KvStore::in_memory();
    kv.write("sample", &Sample { count: 1 }).unwrap();
    let mut rx = kv.subscribe();

    kv.remove("sample").unwrap();

    assert_eq!(kv.read::<Sample>("sample"), None);
    let change = rx.try_recv().unwrap();
    assert_eq!(change.key, "sample");
    assert_eq!(change.value, None);
}

// =============================================================================
// notifications
// =============================================================================

#[test]
fn local_write_is_broadcast_to_every_subscriber() {
    let kv = KvStore::in_memory();
    let mut a = kv.subscribe();
    let mut b = kv.clone().subscribe();

    kv.write("sample", &Sample { count: 7 }).unwrap();

    for rx in [&mut a, &mut b] {
        let change = rx.try_recv().unwrap();
        assert_eq!(change.origin, ChangeOrigin::Local);
        assert_eq!(change.decode::<Sample>(), Some(Sample { count: 7 }));
    }
}

#[test]
fn write_without_subscribers_succeeds() {
    let kv = KvStore::in_memory();
    assert!(kv.write("sample", &Sample { count: 1 }).is_ok());
}

#[test]
fn external_change_is_tagged_external() {
    let kv = KvStore::in_memory();
    let mut rx = kv.subscribe();

    kv.notify_external("sample", Some(r#"{"count":9}"#));

    let change = rx.try_recv().unwrap();
    assert_eq!(change.origin, ChangeOrigin::External);
    assert_eq!(change.decode::<Sample>(), Some(Sample { count: 9 }));
}

#[test]
fn external_change_with_invalid_json_is_dropped() {
    let kv = KvStore::in_memory();
    let mut rx = kv.subscribe();

    kv.notify_external("sample", Some("{oops"));

    assert!(rx.try_recv().is_err());
}

#[test]
fn decode_wrong_shape_is_none() {
    let change = StorageChange {
        key: "sample".into(),
        value: Some(serde_json::json!("text")),
        origin: ChangeOrigin::External,
    };
    assert_eq!(change.decode::<Sample>(), None);
}

#[test]
fn storage_error_codes() {
    let err = StorageError::QuotaExceeded { key: "k".into(), bytes: 1, quota: 1 };
    assert_eq!(err.error_code(), "E_STORAGE_QUOTA");
    assert_eq!(err.kind(), ErrorKind::Storage);
    assert!(!err.retryable());
}
