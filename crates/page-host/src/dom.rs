//! Document tree traits.

use std::sync::Arc;

use playguard_core_types::NodeId;

use crate::error::HostError;
use crate::media::MediaElement;
use crate::player::Player;
use crate::selector::Selector;

pub type NodeRef = Arc<dyn DomNode>;

/// Summary of one batch of subtree changes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutationRecord {
    pub target: NodeId,
    pub added: usize,
    pub removed: usize,
}

pub type MutationCallback = Arc<dyn Fn(&MutationRecord) + Send + Sync>;

pub trait DomNode: Send + Sync {
    fn node_id(&self) -> NodeId;
    /// Lower-cased tag name.
    fn tag_name(&self) -> String;
    /// Concatenated text of the node and its descendants.
    fn text_content(&self) -> String;
    fn attribute(&self, name: &str) -> Option<String>;
    fn parent(&self) -> Option<NodeRef>;
    fn children(&self) -> Vec<NodeRef>;
    fn is_connected(&self) -> bool;
    fn click(&self) -> Result<(), HostError>;
    /// Detach the node from its parent.
    fn remove(&self) -> Result<(), HostError>;

    fn as_media(&self) -> Option<Arc<dyn MediaElement>> {
        None
    }

    fn as_player(&self) -> Option<Arc<dyn Player>> {
        None
    }

    /// Descendants matching `selector`, in document order.
    fn query_selector_all(&self, selector: &Selector) -> Vec<NodeRef> {
        let mut out = Vec::new();
        for child in self.children() {
            collect_matches(&child, selector, &mut out);
        }
        out
    }

    fn query_selector(&self, selector: &Selector) -> Option<NodeRef> {
        self.children()
            .iter()
            .find_map(|child| first_match(child, selector))
    }
}

/// Self-or-ancestor lookup, mirroring `Element.closest`.
pub fn closest(node: &NodeRef, selector: &Selector) -> Option<NodeRef> {
    let mut cursor = Some(node.clone());
    while let Some(current) = cursor {
        if selector.matches(current.as_ref()) {
            return Some(current);
        }
        cursor = current.parent();
    }
    None
}

fn collect_matches(node: &NodeRef, selector: &Selector, out: &mut Vec<NodeRef>) {
    if selector.matches(node.as_ref()) {
        out.push(node.clone());
    }
    for child in node.children() {
        collect_matches(&child, selector, out);
    }
}

fn first_match(node: &NodeRef, selector: &Selector) -> Option<NodeRef> {
    if selector.matches(node.as_ref()) {
        return Some(node.clone());
    }
    node.children()
        .iter()
        .find_map(|child| first_match(child, selector))
}

pub trait Document: Send + Sync {
    /// The document element; `None` before the page has one.
    fn root(&self) -> Option<NodeRef>;
    fn dispatch_pointer_move(&self, x: f64, y: f64) -> Result<(), HostError>;
    fn set_root_attribute(&self, name: &str, value: &str) -> Result<(), HostError>;
    fn observe_mutations(&self, callback: MutationCallback) -> Result<(), HostError>;

    fn query_selector_all(&self, selector: &Selector) -> Vec<NodeRef> {
        let mut out = Vec::new();
        if let Some(root) = self.root() {
            collect_matches(&root, selector, &mut out);
        }
        out
    }

    fn query_selector(&self, selector: &Selector) -> Option<NodeRef> {
        self.root().and_then(|root| first_match(&root, selector))
    }
}
