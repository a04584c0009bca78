use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::config_object::HostConfig;
use crate::dom::{Document, MutationCallback, NodeRef};
use crate::error::HostError;
use crate::network::{NetworkSurface, ResourceCallback, ResourceEntry};
use crate::page::{ActivityCallback, ActivityProvider, DebugSurface, PageHost, PageLocation};
use crate::storage::KvStorage;

use super::node::MemoryNode;

/// Local-storage stand-in. Writes can be made to fail to model quota or privacy errors.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.items.lock().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl KvStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, HostError> {
        Ok(self.items.lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), HostError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(HostError::StorageUnavailable("QuotaExceededError".into()));
        }
        self.items.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// `<html><body/></html>` document with pointer and attribute recording.
pub struct MemoryDocument {
    root: Arc<MemoryNode>,
    body: Arc<MemoryNode>,
    pointer_moves: Mutex<Vec<(f64, f64)>>,
}

impl MemoryDocument {
    pub fn new() -> Arc<Self> {
        let body = MemoryNode::element("body").build();
        let root = MemoryNode::element("html")
            .child_node(body.clone())
            .document_root()
            .build();
        Arc::new(Self {
            root,
            body,
            pointer_moves: Mutex::new(Vec::new()),
        })
    }

    pub fn root_node(&self) -> Arc<MemoryNode> {
        self.root.clone()
    }

    pub fn body(&self) -> Arc<MemoryNode> {
        self.body.clone()
    }

    pub fn append_to_body(&self, node: Arc<MemoryNode>) {
        self.body.append_child(node);
    }

    pub fn pointer_moves(&self) -> Vec<(f64, f64)> {
        self.pointer_moves.lock().clone()
    }
}

impl Document for MemoryDocument {
    fn root(&self) -> Option<NodeRef> {
        Some(self.root.clone() as NodeRef)
    }

    fn dispatch_pointer_move(&self, x: f64, y: f64) -> Result<(), HostError> {
        self.pointer_moves.lock().push((x, y));
        Ok(())
    }

    fn set_root_attribute(&self, name: &str, value: &str) -> Result<(), HostError> {
        self.root.set_attribute(name, value);
        Ok(())
    }

    fn observe_mutations(&self, callback: MutationCallback) -> Result<(), HostError> {
        self.root.add_observer(callback);
        Ok(())
    }
}

/// How the page is embedded.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FrameContext {
    TopLevel,
    Embedded,
    /// The parent cannot be inspected at all.
    CrossOrigin,
}

pub struct MemoryPageBuilder {
    href: String,
    frame: FrameContext,
    network: Option<NetworkSurface>,
    config: Option<HostConfig>,
    storage: Option<Arc<MemoryStorage>>,
    user_agent: String,
    activity_callback: bool,
    resource_timing: bool,
    lock_activity: bool,
}

impl MemoryPageBuilder {
    pub fn frame(mut self, frame: FrameContext) -> Self {
        self.frame = frame;
        self
    }

    pub fn network(mut self, network: NetworkSurface) -> Self {
        self.network = Some(network);
        self
    }

    pub fn config(mut self, config: HostConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn storage(mut self, storage: Arc<MemoryStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn without_storage(mut self) -> Self {
        self.storage = None;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn activity_callback(mut self, enabled: bool) -> Self {
        self.activity_callback = enabled;
        self
    }

    pub fn resource_timing(mut self, supported: bool) -> Self {
        self.resource_timing = supported;
        self
    }

    /// Makes the last-activity property non-configurable.
    pub fn lock_activity(mut self, locked: bool) -> Self {
        self.lock_activity = locked;
        self
    }

    pub fn build(self) -> Arc<MemoryPage> {
        let activity_calls = Arc::new(AtomicUsize::new(0));
        let activity_callback = self.activity_callback.then(|| {
            let counter = Arc::clone(&activity_calls);
            Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }) as ActivityCallback
        });
        Arc::new(MemoryPage {
            location: RwLock::new(PageLocation::parse(&self.href)),
            frame: self.frame,
            document: MemoryDocument::new(),
            network: self.network.map(Arc::new),
            config: self.config.map(Arc::new),
            storage: self.storage,
            user_agent: self.user_agent,
            activity_provider: RwLock::new(None),
            activity_locked: self.lock_activity,
            activity_callback,
            activity_calls,
            resource_timing: self.resource_timing,
            resource_observers: RwLock::new(Vec::new()),
            debug_surface: RwLock::new(None),
        })
    }
}

/// Whole-page stand-in wiring the memory document, storage and surfaces together.
pub struct MemoryPage {
    location: RwLock<PageLocation>,
    frame: FrameContext,
    document: Arc<MemoryDocument>,
    network: Option<Arc<NetworkSurface>>,
    config: Option<Arc<HostConfig>>,
    storage: Option<Arc<MemoryStorage>>,
    user_agent: String,
    activity_provider: RwLock<Option<ActivityProvider>>,
    activity_locked: bool,
    activity_callback: Option<ActivityCallback>,
    activity_calls: Arc<AtomicUsize>,
    resource_timing: bool,
    resource_observers: RwLock<Vec<ResourceCallback>>,
    debug_surface: RwLock<Option<Arc<dyn DebugSurface>>>,
}

impl MemoryPage {
    pub fn builder(href: impl Into<String>) -> MemoryPageBuilder {
        MemoryPageBuilder {
            href: href.into(),
            frame: FrameContext::TopLevel,
            network: None,
            config: None,
            storage: Some(MemoryStorage::new()),
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) playguard-memory-host".to_string(),
            activity_callback: true,
            resource_timing: true,
            lock_activity: false,
        }
    }

    pub fn memory_document(&self) -> Arc<MemoryDocument> {
        self.document.clone()
    }

    pub fn memory_storage(&self) -> Option<Arc<MemoryStorage>> {
        self.storage.clone()
    }

    /// In-page navigation; the document is kept, only the location changes.
    pub fn navigate(&self, href: &str) {
        *self.location.write() = PageLocation::parse(href);
    }

    /// What the page reads as its last-activity timestamp, if pinned.
    pub fn last_activity(&self) -> Option<i64> {
        let provider = self.activity_provider.read().clone();
        provider.map(|provider| provider())
    }

    pub fn activity_calls(&self) -> usize {
        self.activity_calls.load(Ordering::SeqCst)
    }

    /// Deliver a batch of resource-timing entries to every observer.
    pub fn emit_resources(&self, entries: &[ResourceEntry]) {
        let observers = self.resource_observers.read().clone();
        for observer in observers {
            observer(entries);
        }
    }

    pub fn debug_surface(&self) -> Option<Arc<dyn DebugSurface>> {
        self.debug_surface.read().clone()
    }
}

impl PageHost for MemoryPage {
    fn location(&self) -> PageLocation {
        self.location.read().clone()
    }

    fn is_top_level(&self) -> Result<bool, HostError> {
        match self.frame {
            FrameContext::TopLevel => Ok(true),
            FrameContext::Embedded => Ok(false),
            FrameContext::CrossOrigin => Err(HostError::CrossOrigin),
        }
    }

    fn document(&self) -> Arc<dyn Document> {
        self.document.clone()
    }

    fn network(&self) -> Option<Arc<NetworkSurface>> {
        self.network.clone()
    }

    fn config_object(&self) -> Option<Arc<HostConfig>> {
        self.config.clone()
    }

    fn storage(&self) -> Result<Arc<dyn KvStorage>, HostError> {
        self.storage
            .clone()
            .map(|storage| storage as Arc<dyn KvStorage>)
            .ok_or_else(|| HostError::StorageUnavailable("SecurityError: storage blocked".into()))
    }

    fn user_agent(&self) -> String {
        self.user_agent.clone()
    }

    fn pin_last_activity(&self, provider: ActivityProvider) -> Result<(), HostError> {
        if self.activity_locked {
            tracing::trace!("last-activity property is locked");
            return Err(HostError::rejected("property is not configurable"));
        }
        *self.activity_provider.write() = Some(provider);
        Ok(())
    }

    fn activity_callback(&self) -> Option<ActivityCallback> {
        self.activity_callback.clone()
    }

    fn observe_resources(&self, callback: ResourceCallback) -> Result<(), HostError> {
        if !self.resource_timing {
            return Err(HostError::Unsupported("PerformanceObserver"));
        }
        self.resource_observers.write().push(callback);
        Ok(())
    }

    fn expose_debug_surface(&self, surface: Arc<dyn DebugSurface>) -> Result<(), HostError> {
        *self.debug_surface.write() = Some(surface);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::DomNode;
    use crate::selector::Selector;

    #[test]
    fn document_queries_include_appended_nodes() {
        let page = MemoryPage::builder("https://www.youtube.com/watch?v=abc").build();
        let doc = page.memory_document();
        doc.append_to_body(MemoryNode::element("tp-yt-paper-toast").build());
        let sel = Selector::parse("tp-yt-paper-toast").unwrap();
        let found = page.document().query_selector(&sel).expect("toast");
        assert!(found.is_connected());
    }

    #[test]
    fn frame_context_drives_top_level_check() {
        let embedded = MemoryPage::builder("https://www.youtube.com/embed/x")
            .frame(FrameContext::Embedded)
            .build();
        assert_eq!(embedded.is_top_level(), Ok(false));
        let blocked = MemoryPage::builder("https://www.youtube.com/embed/x")
            .frame(FrameContext::CrossOrigin)
            .build();
        assert_eq!(blocked.is_top_level(), Err(HostError::CrossOrigin));
    }

    #[test]
    fn storage_failures_surface_as_errors() {
        let page = MemoryPage::builder("https://www.youtube.com/watch?v=abc")
            .without_storage()
            .build();
        assert!(page.storage().is_err());

        let storage = MemoryStorage::new();
        storage.set_fail_writes(true);
        assert!(storage.set_item("k", "v").is_err());
    }

    #[test]
    fn pinned_activity_reads_through_provider() {
        let page = MemoryPage::builder("https://www.youtube.com/watch?v=abc").build();
        assert_eq!(page.last_activity(), None);
        page.pin_last_activity(Arc::new(|| 42)).unwrap();
        assert_eq!(page.last_activity(), Some(42));

        let locked = MemoryPage::builder("https://www.youtube.com/watch?v=abc")
            .lock_activity(true)
            .build();
        assert!(locked.pin_last_activity(Arc::new(|| 1)).is_err());
    }
}
