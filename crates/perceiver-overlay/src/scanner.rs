use std::collections::HashSet;
use std::sync::Arc;

use interrupt_signatures::PatternMatcher;
use page_host::{closest, Document, DomNode, MediaElement, NodeRef, Player};

use crate::model::CandidateOverlay;

#[derive(Clone, Debug)]
pub struct OverlayScanner {
    matcher: Arc<PatternMatcher>,
}

impl OverlayScanner {
    pub fn new(matcher: Arc<PatternMatcher>) -> Self {
        Self { matcher }
    }

    pub fn matcher(&self) -> &Arc<PatternMatcher> {
        &self.matcher
    }

    /// Every node matching the dialog selector list, in document order, classified.
    pub fn find_candidate_overlays(&self, document: &dyn Document) -> Vec<CandidateOverlay> {
        document
            .query_selector_all(self.matcher.dialog_selector())
            .into_iter()
            .map(|node| {
                let mut overlay = CandidateOverlay::new(node);
                overlay.interruption_text = self.matcher.is_interruption_text(&overlay.text);
                overlay.has_support_link = self.matcher.has_support_link(overlay.node.as_ref());
                overlay
            })
            .collect()
    }

    pub fn find_interruption_overlays(&self, document: &dyn Document) -> Vec<CandidateOverlay> {
        self.find_candidate_overlays(document)
            .into_iter()
            .filter(CandidateOverlay::is_interruption)
            .collect()
    }

    pub fn has_interruption_ui(&self, document: &dyn Document) -> bool {
        document
            .query_selector_all(self.matcher.dialog_selector())
            .iter()
            .any(|node| {
                let overlay = CandidateOverlay::new(node.clone());
                self.matcher.is_interruption_text(&overlay.text)
                    || self.matcher.has_support_link(node.as_ref())
            })
    }

    /// First clickable descendant whose label reads as an affirmative action.
    pub fn find_action_element(&self, overlay: &dyn DomNode) -> Option<NodeRef> {
        overlay
            .query_selector_all(self.matcher.action_selector())
            .into_iter()
            .find(|candidate| self.matcher.is_action_element(candidate.as_ref()))
    }

    /// Support-link anchors paired with their closest overlay host, hosts deduplicated.
    pub fn find_support_link_hosts(&self, document: &dyn Document) -> Vec<(NodeRef, NodeRef)> {
        let mut seen = HashSet::new();
        document
            .query_selector_all(self.matcher.support_link_selector())
            .into_iter()
            .filter_map(|link| {
                let host = closest(&link, self.matcher.link_host_selector())?;
                seen.insert(host.node_id()).then_some((link, host))
            })
            .collect()
    }

    pub fn find_media_element(&self, document: &dyn Document) -> Option<Arc<dyn MediaElement>> {
        let media = document
            .query_selector_all(self.matcher.media_selector())
            .into_iter()
            .find_map(|node| node.as_media());
        if media.is_none() {
            tracing::trace!("no media element in document");
        }
        media
    }

    pub fn find_player_handle(&self, document: &dyn Document) -> Option<Arc<dyn Player>> {
        document
            .query_selector(self.matcher.player_selector())
            .and_then(|node| node.as_player())
    }

    pub fn spinner_present(&self, document: &dyn Document) -> bool {
        document
            .query_selector(self.matcher.spinner_selector())
            .is_some()
    }
}
