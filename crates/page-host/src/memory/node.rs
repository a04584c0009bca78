use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use playguard_core_types::NodeId;

use crate::dom::{DomNode, MutationCallback, MutationRecord, NodeRef};
use crate::error::HostError;
use crate::media::MediaElement;
use crate::player::Player;

use super::media::MemoryMedia;
use super::player::MemoryPlayer;

pub type ClickHandler = Arc<dyn Fn(&MemoryNode) + Send + Sync>;

pub struct MemoryNode {
    id: NodeId,
    tag: String,
    attrs: RwLock<Vec<(String, String)>>,
    text: RwLock<String>,
    parent: RwLock<Weak<MemoryNode>>,
    children: RwLock<Vec<Arc<MemoryNode>>>,
    me: Weak<MemoryNode>,
    document_root: bool,
    observers: RwLock<Vec<MutationCallback>>,
    clicks: AtomicUsize,
    on_click: Option<ClickHandler>,
    media: Option<Arc<MemoryMedia>>,
    player: Option<Arc<MemoryPlayer>>,
}

pub struct NodeBuilder {
    tag: String,
    attrs: Vec<(String, String)>,
    text: String,
    children: Vec<Arc<MemoryNode>>,
    document_root: bool,
    on_click: Option<ClickHandler>,
    media: Option<Arc<MemoryMedia>>,
    player: Option<Arc<MemoryPlayer>>,
}

impl NodeBuilder {
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs
            .push((name.into().to_ascii_lowercase(), value.into()));
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn child(mut self, child: NodeBuilder) -> Self {
        self.children.push(child.build());
        self
    }

    pub fn child_node(mut self, child: Arc<MemoryNode>) -> Self {
        self.children.push(child);
        self
    }

    pub fn on_click(mut self, handler: impl Fn(&MemoryNode) + Send + Sync + 'static) -> Self {
        self.on_click = Some(Arc::new(handler));
        self
    }

    pub fn media(mut self, media: Arc<MemoryMedia>) -> Self {
        self.media = Some(media);
        self
    }

    pub fn player(mut self, player: Arc<MemoryPlayer>) -> Self {
        self.player = Some(player);
        self
    }

    pub(crate) fn document_root(mut self) -> Self {
        self.document_root = true;
        self
    }

    pub fn build(self) -> Arc<MemoryNode> {
        let node = Arc::new_cyclic(|me| MemoryNode {
            id: NodeId::new(),
            tag: self.tag.to_ascii_lowercase(),
            attrs: RwLock::new(self.attrs),
            text: RwLock::new(self.text),
            parent: RwLock::new(Weak::new()),
            children: RwLock::new(Vec::new()),
            me: me.clone(),
            document_root: self.document_root,
            observers: RwLock::new(Vec::new()),
            clicks: AtomicUsize::new(0),
            on_click: self.on_click,
            media: self.media,
            player: self.player,
        });
        for child in self.children {
            *child.parent.write() = Arc::downgrade(&node);
            node.children.write().push(child);
        }
        node
    }
}

impl MemoryNode {
    pub fn element(tag: impl Into<String>) -> NodeBuilder {
        NodeBuilder {
            tag: tag.into(),
            attrs: Vec::new(),
            text: String::new(),
            children: Vec::new(),
            document_root: false,
            on_click: None,
            media: None,
            player: None,
        }
    }

    pub fn arc(&self) -> Option<Arc<MemoryNode>> {
        self.me.upgrade()
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn set_attribute(&self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        let mut attrs = self.attrs.write();
        match attrs.iter_mut().find(|(k, _)| *k == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => attrs.push((name, value.to_string())),
        }
    }

    pub fn set_text(&self, text: impl Into<String>) {
        *self.text.write() = text.into();
    }

    pub fn click_count(&self) -> usize {
        self.clicks.load(Ordering::SeqCst)
    }

    pub fn child_count(&self) -> usize {
        self.children.read().len()
    }

    pub fn append_child(&self, child: Arc<MemoryNode>) {
        if child.parent.read().upgrade().is_some() {
            let _ = child.detach();
        }
        *child.parent.write() = self.me.clone();
        self.children.write().push(child);
        self.notify(MutationRecord {
            target: self.id,
            added: 1,
            removed: 0,
        });
    }

    pub(crate) fn add_observer(&self, callback: MutationCallback) {
        self.observers.write().push(callback);
    }

    fn root_node(&self) -> Option<Arc<MemoryNode>> {
        let mut cursor = self.arc()?;
        loop {
            let parent = cursor.parent.read().upgrade();
            match parent {
                Some(parent) => cursor = parent,
                None => return Some(cursor),
            }
        }
    }

    fn notify(&self, record: MutationRecord) {
        let Some(root) = self.root_node() else {
            return;
        };
        let observers = root.observers.read().clone();
        for observer in observers {
            observer(&record);
        }
    }

    fn detach(&self) -> Result<(), HostError> {
        let parent = self.parent.read().upgrade().ok_or(HostError::Detached)?;
        parent.children.write().retain(|c| c.id != self.id);
        *self.parent.write() = Weak::new();
        parent.notify(MutationRecord {
            target: parent.id,
            added: 0,
            removed: 1,
        });
        Ok(())
    }
}

impl DomNode for MemoryNode {
    fn node_id(&self) -> NodeId {
        self.id
    }

    fn tag_name(&self) -> String {
        self.tag.clone()
    }

    fn text_content(&self) -> String {
        let mut out = self.text.read().clone();
        for child in self.children.read().iter() {
            out.push_str(&child.text_content());
        }
        out
    }

    fn attribute(&self, name: &str) -> Option<String> {
        let name = name.to_ascii_lowercase();
        self.attrs
            .read()
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.clone())
    }

    fn parent(&self) -> Option<NodeRef> {
        self.parent
            .read()
            .upgrade()
            .map(|parent| parent as NodeRef)
    }

    fn children(&self) -> Vec<NodeRef> {
        self.children
            .read()
            .iter()
            .map(|child| child.clone() as NodeRef)
            .collect()
    }

    fn is_connected(&self) -> bool {
        self.root_node()
            .map(|root| root.document_root)
            .unwrap_or(false)
    }

    fn click(&self) -> Result<(), HostError> {
        self.clicks.fetch_add(1, Ordering::SeqCst);
        if let Some(handler) = &self.on_click {
            handler(self);
        }
        Ok(())
    }

    fn remove(&self) -> Result<(), HostError> {
        self.detach()
    }

    fn as_media(&self) -> Option<Arc<dyn MediaElement>> {
        self.media
            .clone()
            .map(|media| media as Arc<dyn MediaElement>)
    }

    fn as_player(&self) -> Option<Arc<dyn Player>> {
        self.player
            .clone()
            .map(|player| player as Arc<dyn Player>)
    }
}

impl std::fmt::Debug for MemoryNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryNode")
            .field("id", &self.id)
            .field("tag", &self.tag)
            .field("children", &self.child_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn text_content_concatenates_descendants() {
        let dialog = MemoryNode::element("tp-yt-paper-dialog")
            .text("Playback interrupted")
            .child(MemoryNode::element("button").text("Continue"))
            .build();
        assert_eq!(dialog.text_content(), "Playback interruptedContinue");
        assert_eq!(dialog.children().len(), 1);
    }

    #[test]
    fn remove_detaches_and_notifies_root() {
        let root = MemoryNode::element("html").document_root().build();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        root.add_observer(Arc::new(move |record: &MutationRecord| {
            sink.lock().unwrap().push(record.clone());
        }));

        let toast = MemoryNode::element("tp-yt-paper-toast").build();
        root.append_child(toast.clone());
        assert!(toast.is_connected());

        toast.remove().expect("remove");
        assert!(!toast.is_connected());
        assert_eq!(toast.remove(), Err(HostError::Detached));

        let records = seen.lock().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].added, 1);
        assert_eq!(records[1].removed, 1);
    }

    #[test]
    fn click_runs_handler() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let button = MemoryNode::element("button")
            .on_click(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .build();
        button.click().unwrap();
        assert_eq!(button.click_count(), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
