use std::sync::Arc;

use diag_store::{DiagCfg, DiagStore, MarkerKind};
use page_host::memory::MemoryStorage;
use page_host::KvStorage;
use playguard_core_types::ManualClock;
use serde_json::json;

#[test]
fn failing_writes_do_not_stop_capture() {
    let storage = MemoryStorage::new();
    storage.set_fail_writes(true);
    let store = DiagStore::open(
        DiagCfg::default(),
        Ok(storage.clone() as Arc<dyn KvStorage>),
        Arc::new(ManualClock::default()),
    );

    for n in 0..10 {
        store.record("fetch_error", json!({ "n": n }));
    }
    assert_eq!(store.len(), 10);
    assert!(store.persist().is_err());
    assert!(store.write_marker(MarkerKind::Init, "https://www.youtube.com/watch").is_err());
    assert!(storage.keys().is_empty());
}

#[test]
fn ring_capacity_bounds_persisted_log() {
    let storage = MemoryStorage::new();
    let cfg = DiagCfg {
        capacity: 4,
        ..DiagCfg::default()
    };
    let store = DiagStore::open(
        cfg,
        Ok(storage as Arc<dyn KvStorage>),
        Arc::new(ManualClock::default()),
    );
    for n in 0..9 {
        store.record("video_waiting", json!({ "n": n }));
    }
    let persisted = store.read_persisted().expect("persisted");
    assert_eq!(persisted.len(), 4);
    assert_eq!(persisted[0].payload["n"], 5);
}
