use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;

use page_host::{DebugSurface, HostError, KvStorage};
use playguard_core_types::SharedClock;

use crate::config::DiagCfg;
use crate::errors::DiagError;
use crate::model::{DiagEntry, Marker, MarkerKind};
use crate::ring::DiagRing;

pub const LOG_PREFIX: &str = "[YT Interrupt Debug]";

pub struct DiagStore {
    cfg: DiagCfg,
    ring: DiagRing,
    enabled: bool,
    storage: Option<Arc<dyn KvStorage>>,
    clock: SharedClock,
    writes: AtomicU64,
}

impl DiagStore {
    /// Opens the store over the page's storage. An unreachable storage keeps diagnostics on
    /// but disables persistence and markers.
    pub fn open(
        cfg: DiagCfg,
        storage: Result<Arc<dyn KvStorage>, HostError>,
        clock: SharedClock,
    ) -> Self {
        let storage = match storage {
            Ok(storage) => Some(storage),
            Err(err) => {
                tracing::debug!(target: "playguard::diag", error = %err, "diagnostic storage unavailable");
                None
            }
        };
        let enabled = cfg
            .force_enabled
            .unwrap_or_else(|| toggle_allows(&cfg, storage.as_deref()));
        Self {
            ring: DiagRing::new(cfg.capacity),
            cfg,
            enabled,
            storage,
            clock,
            writes: AtomicU64::new(0),
        }
    }

    pub fn cfg(&self) -> &DiagCfg {
        &self.cfg
    }

    pub fn version(&self) -> &str {
        &self.cfg.version
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn record(&self, kind: &str, payload: Value) {
        if !self.enabled {
            return;
        }
        let entry = DiagEntry {
            at: self.clock.now_utc(),
            kind: kind.to_string(),
            payload,
        };
        tracing::debug!(
            target: "playguard::diag",
            kind = %entry.kind,
            payload = %entry.payload,
            "{LOG_PREFIX}"
        );
        self.ring.push(entry);

        let count = self.writes.fetch_add(1, Ordering::SeqCst) + 1;
        if self.should_persist(kind, count) {
            if let Err(err) = self.persist() {
                tracing::trace!(target: "playguard::diag", error = %err, "persist skipped");
            }
        }
    }

    /// The ring is written on `init`, on every N-th entry and on urgent entry types.
    pub fn should_persist(&self, kind: &str, count: u64) -> bool {
        kind == "init"
            || (self.cfg.persist_every > 0 && count % self.cfg.persist_every == 0)
            || self
                .cfg
                .urgent_fragments
                .iter()
                .any(|fragment| kind.contains(fragment.as_str()))
    }

    pub fn persist(&self) -> Result<(), DiagError> {
        let storage = self.storage.as_ref().ok_or(DiagError::NoStorage)?;
        let body = serde_json::to_string(&self.ring.snapshot())?;
        storage.set_item(&self.cfg.log_key, &body)?;
        Ok(())
    }

    pub fn read_persisted(&self) -> Result<Vec<DiagEntry>, DiagError> {
        let storage = self.storage.as_ref().ok_or(DiagError::NoStorage)?;
        match storage.get_item(&self.cfg.log_key)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    fn marker_key(&self, kind: MarkerKind) -> &str {
        match kind {
            MarkerKind::Init => &self.cfg.init_key,
            MarkerKind::Heartbeat => &self.cfg.heartbeat_key,
        }
    }

    /// Markers are written whether or not diagnostics are enabled.
    pub fn write_marker(&self, kind: MarkerKind, href: &str) -> Result<Marker, DiagError> {
        let storage = self.storage.as_ref().ok_or(DiagError::NoStorage)?;
        let marker = Marker {
            at: self.clock.now_utc(),
            href: href.to_string(),
            version: self.cfg.version.clone(),
        };
        storage.set_item(self.marker_key(kind), &serde_json::to_string(&marker)?)?;
        Ok(marker)
    }

    pub fn read_marker(&self, kind: MarkerKind) -> Result<Option<Marker>, DiagError> {
        let storage = self.storage.as_ref().ok_or(DiagError::NoStorage)?;
        match storage.get_item(self.marker_key(kind))? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn entries(&self) -> Vec<DiagEntry> {
        self.ring.snapshot()
    }

    pub fn entries_of_kind(&self, kind: &str) -> Vec<DiagEntry> {
        self.ring.tail_of_kind(kind, self.ring.capacity().max(1))
    }

    pub fn count_of_kind(&self, kind: &str) -> usize {
        self.entries_of_kind(kind).len()
    }
}

fn toggle_allows(cfg: &DiagCfg, storage: Option<&dyn KvStorage>) -> bool {
    let Some(storage) = storage else {
        return true;
    };
    match storage.get_item(&cfg.toggle_key) {
        Ok(Some(value)) => value != "0",
        Ok(None) | Err(_) => true,
    }
}

impl DebugSurface for DiagStore {
    fn snapshot(&self) -> Vec<Value> {
        self.ring.snapshot().iter().map(DiagEntry::to_value).collect()
    }

    fn dump(&self) -> Vec<Value> {
        DebugSurface::snapshot(self)
    }

    fn enabled(&self) -> bool {
        self.enabled
    }
}

impl std::fmt::Debug for DiagStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagStore")
            .field("enabled", &self.enabled)
            .field("entries", &self.ring.len())
            .field("storage", &self.storage.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use page_host::memory::MemoryStorage;
    use playguard_core_types::ManualClock;
    use serde_json::json;

    fn open_with(storage: Arc<MemoryStorage>, cfg: DiagCfg) -> DiagStore {
        DiagStore::open(
            cfg,
            Ok(storage as Arc<dyn KvStorage>),
            Arc::new(ManualClock::default()),
        )
    }

    #[test]
    fn persists_on_init_fifth_and_urgent_entries() {
        let storage = MemoryStorage::new();
        let store = open_with(storage.clone(), DiagCfg::default());

        store.record("init", json!({}));
        assert_eq!(store.read_persisted().unwrap().len(), 1);

        store.record("fetch_request", json!({}));
        store.record("fetch_response", json!({}));
        assert_eq!(store.read_persisted().unwrap().len(), 1);

        store.record("player_event_blocked", json!({}));
        assert_eq!(store.read_persisted().unwrap().len(), 4);

        store.record("tick", json!({}));
        assert_eq!(store.read_persisted().unwrap().len(), 5);
    }

    #[test]
    fn stored_toggle_disables_entries_but_not_markers() {
        let storage = MemoryStorage::new();
        storage.set_item("yt_interrupt_debug", "0").unwrap();
        let store = open_with(storage.clone(), DiagCfg::default());
        assert!(!store.enabled());
        store.record("init", json!({}));
        assert!(store.is_empty());

        store
            .write_marker(MarkerKind::Heartbeat, "https://www.youtube.com/watch?v=a")
            .unwrap();
        let marker = store.read_marker(MarkerKind::Heartbeat).unwrap().unwrap();
        assert_eq!(marker.version, "1.3.4");
    }

    #[test]
    fn force_flag_overrides_toggle() {
        let storage = MemoryStorage::new();
        storage.set_item("yt_interrupt_debug", "0").unwrap();
        let cfg = DiagCfg {
            force_enabled: Some(true),
            ..DiagCfg::default()
        };
        assert!(open_with(storage, cfg).enabled());
    }

    #[test]
    fn missing_storage_keeps_capture_in_memory() {
        let store = DiagStore::open(
            DiagCfg::default(),
            Err(HostError::StorageUnavailable("blocked".into())),
            Arc::new(ManualClock::default()),
        );
        assert!(store.enabled());
        store.record("init", json!({ "href": "x" }));
        assert_eq!(store.len(), 1);
        assert!(matches!(store.persist(), Err(DiagError::NoStorage)));
        assert!(store
            .write_marker(MarkerKind::Init, "x")
            .is_err());
    }

    #[test]
    fn debug_surface_exposes_type_field() {
        let store = open_with(MemoryStorage::new(), DiagCfg::default());
        store.record("recovery_attempt", json!({ "currentTime": "12.000" }));
        let values = DebugSurface::dump(&store);
        assert_eq!(values[0]["type"], "recovery_attempt");
        assert_eq!(values[0]["payload"]["currentTime"], "12.000");
    }
}
