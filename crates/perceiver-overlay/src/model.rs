use serde::Serialize;

use page_host::{DomNode, NodeRef};
use playguard_core_types::{short_text, NodeId};

/// One overlay found by a scan. Lives for the duration of the scan's caller.
#[derive(Clone)]
pub struct CandidateOverlay {
    pub node: NodeRef,
    /// Text content plus `aria-label`.
    pub text: String,
    pub has_support_link: bool,
    pub interruption_text: bool,
}

impl CandidateOverlay {
    pub fn new(node: NodeRef) -> Self {
        let text = [
            node.text_content(),
            node.attribute("aria-label").unwrap_or_default(),
        ]
        .join(" ");
        Self {
            node,
            text,
            has_support_link: false,
            interruption_text: false,
        }
    }

    pub fn is_interruption(&self) -> bool {
        self.has_support_link || self.interruption_text
    }

    pub fn report(&self) -> OverlayReport {
        OverlayReport {
            node: self.node.node_id(),
            tag: self.node.tag_name(),
            text: short_text(&self.text, 200),
            has_support_link: self.has_support_link,
            interruption_text: self.interruption_text,
        }
    }
}

impl std::fmt::Debug for CandidateOverlay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandidateOverlay")
            .field("node", &self.node.node_id())
            .field("tag", &self.node.tag_name())
            .field("interruption", &self.is_interruption())
            .finish()
    }
}

/// Serializable summary used by the CLI.
#[derive(Clone, Debug, Serialize)]
pub struct OverlayReport {
    #[serde(serialize_with = "serialize_node_id")]
    pub node: NodeId,
    pub tag: String,
    pub text: String,
    pub has_support_link: bool,
    pub interruption_text: bool,
}

fn serialize_node_id<S: serde::Serializer>(id: &NodeId, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(id.0)
}
