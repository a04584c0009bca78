//! Case-insensitive substring classification of text, elements and payloads.

use serde::Serialize;
use serde_json::Value;

use page_host::{DomNode, Selector};

use crate::signature::{InterruptionSignature, SignatureError};

/// Result of classifying one piece of free text.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub interruption: bool,
    pub action: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_phrase: Option<String>,
}

/// Compiled form of an [`InterruptionSignature`].
#[derive(Clone, Debug)]
pub struct PatternMatcher {
    signature: InterruptionSignature,
    support_code: String,
    dialog_texts: Vec<String>,
    action_texts: Vec<String>,
    dialog_selector: Selector,
    action_selector: Selector,
    support_link_selector: Selector,
    link_host_selector: Selector,
    player_selector: Selector,
    spinner_selector: Selector,
    media_selector: Selector,
}

fn compile(field: &'static str, list: &[String]) -> Result<Selector, SignatureError> {
    if list.iter().all(|s| s.trim().is_empty()) {
        return Err(SignatureError::Empty(field));
    }
    Selector::any_of(list).map_err(|source| SignatureError::Selector { field, source })
}

fn compile_one(field: &'static str, raw: &str) -> Result<Selector, SignatureError> {
    compile(field, &[raw.to_string()])
}

fn lowered(list: &[String]) -> Vec<String> {
    list.iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

impl PatternMatcher {
    pub fn new(signature: InterruptionSignature) -> Result<Self, SignatureError> {
        if signature.support_code.trim().is_empty() {
            return Err(SignatureError::Empty("support_code"));
        }
        let dialog_texts = lowered(&signature.dialog_texts);
        if dialog_texts.is_empty() {
            return Err(SignatureError::Empty("dialog_texts"));
        }
        let action_texts = lowered(&signature.action_texts);
        if action_texts.is_empty() {
            return Err(SignatureError::Empty("action_texts"));
        }
        Ok(Self {
            support_code: signature.support_code.trim().to_lowercase(),
            dialog_texts,
            action_texts,
            dialog_selector: compile("dialog_selectors", &signature.dialog_selectors)?,
            action_selector: compile("action_selectors", &signature.action_selectors)?,
            support_link_selector: compile_one(
                "support_code",
                &signature.support_link_selector(),
            )?,
            link_host_selector: compile("link_hosts", &signature.link_hosts)?,
            player_selector: compile_one("player_selector", &signature.player_selector)?,
            spinner_selector: compile_one("spinner_selector", &signature.spinner_selector)?,
            media_selector: compile_one("media_selector", &signature.media_selector)?,
            signature,
        })
    }

    pub fn signature(&self) -> &InterruptionSignature {
        &self.signature
    }

    /// First signature phrase (or the support code) contained in `text`.
    pub fn interruption_phrase(&self, text: &str) -> Option<&str> {
        if text.is_empty() {
            return None;
        }
        let lower = text.to_lowercase();
        if lower.contains(&self.support_code) {
            return Some(&self.support_code);
        }
        self.dialog_texts
            .iter()
            .find(|phrase| lower.contains(phrase.as_str()))
            .map(String::as_str)
    }

    pub fn is_interruption_text(&self, text: &str) -> bool {
        self.interruption_phrase(text).is_some()
    }

    pub fn is_action_label(&self, label: &str) -> bool {
        let lower = label.trim().to_lowercase();
        !lower.is_empty()
            && self
                .action_texts
                .iter()
                .any(|phrase| lower.contains(phrase.as_str()))
    }

    /// Visible text, `aria-label` and `title` together.
    pub fn action_label(node: &dyn DomNode) -> String {
        [
            node.text_content(),
            node.attribute("aria-label").unwrap_or_default(),
            node.attribute("title").unwrap_or_default(),
        ]
        .join(" ")
    }

    pub fn is_action_element(&self, node: &dyn DomNode) -> bool {
        self.is_action_label(&Self::action_label(node))
    }

    /// True when the node is, or contains, an anchor pointing at the support page.
    pub fn has_support_link(&self, node: &dyn DomNode) -> bool {
        self.support_link_selector.matches(node)
            || node.query_selector(&self.support_link_selector).is_some()
    }

    /// Serialized command payloads are matched as text; strings are used verbatim.
    pub fn is_interruption_payload(&self, payload: &Value) -> bool {
        self.is_interruption_text(&payload_text(payload))
    }

    pub fn classify(&self, text: &str) -> Classification {
        let phrase = self.interruption_phrase(text).map(str::to_string);
        Classification {
            interruption: phrase.is_some(),
            action: self.is_action_label(text),
            matched_phrase: phrase,
        }
    }

    pub fn dialog_selector(&self) -> &Selector {
        &self.dialog_selector
    }

    pub fn action_selector(&self) -> &Selector {
        &self.action_selector
    }

    pub fn support_link_selector(&self) -> &Selector {
        &self.support_link_selector
    }

    pub fn link_host_selector(&self) -> &Selector {
        &self.link_host_selector
    }

    pub fn player_selector(&self) -> &Selector {
        &self.player_selector
    }

    pub fn spinner_selector(&self) -> &Selector {
        &self.spinner_selector
    }

    pub fn media_selector(&self) -> &Selector {
        &self.media_selector
    }
}

impl Default for PatternMatcher {
    fn default() -> Self {
        match Self::new(InterruptionSignature::default()) {
            Ok(matcher) => matcher,
            Err(err) => unreachable!("built-in signature must compile: {err}"),
        }
    }
}

/// Text form of a dispatcher payload. Falsy payloads read as empty.
pub fn payload_text(payload: &Value) -> String {
    match payload {
        Value::Null | Value::Bool(false) => String::new(),
        Value::Number(n) if n.as_f64() == Some(0.0) => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use page_host::memory::MemoryNode;
    use serde_json::json;

    #[test]
    fn interruption_text_is_case_insensitive_substring() {
        let m = PatternMatcher::default();
        assert!(m.is_interruption_text("Playback Interrupted"));
        assert!(m.is_interruption_text("Are you EXPERIENCING INTERRUPTIONS?"));
        assert!(m.is_interruption_text("動画の再生が中断されました"));
        assert!(m.is_interruption_text("see support.google.com/answer/3037019"));
        assert!(!m.is_interruption_text("Up next: cooking videos"));
        assert!(!m.is_interruption_text(""));
    }

    #[test]
    fn action_elements_use_text_aria_label_and_title() {
        let m = PatternMatcher::default();
        let by_text = MemoryNode::element("button").text("Continue").build();
        let by_aria = MemoryNode::element("div")
            .attr("role", "button")
            .attr("aria-label", "Resume playback")
            .build();
        let by_title = MemoryNode::element("tp-yt-paper-button")
            .attr("title", "继续观看")
            .build();
        let other = MemoryNode::element("button").text("Dismiss").build();
        assert!(m.is_action_element(by_text.as_ref()));
        assert!(m.is_action_element(by_aria.as_ref()));
        assert!(m.is_action_element(by_title.as_ref()));
        assert!(!m.is_action_element(other.as_ref()));
    }

    #[test]
    fn support_links_are_found_in_subtrees() {
        let m = PatternMatcher::default();
        let toast = MemoryNode::element("tp-yt-paper-toast")
            .child(
                MemoryNode::element("a")
                    .attr("href", "https://support.google.com/youtube/answer/3037019"),
            )
            .build();
        let check = MemoryNode::element("a")
            .attr("href", "https://www.youtube.com/check_ad_blockers")
            .build();
        let plain = MemoryNode::element("tp-yt-paper-toast").text("Saved").build();
        assert!(m.has_support_link(toast.as_ref()));
        assert!(m.has_support_link(check.as_ref()));
        assert!(!m.has_support_link(plain.as_ref()));
    }

    #[test]
    fn payloads_are_matched_after_serialization() {
        let m = PatternMatcher::default();
        assert!(m.is_interruption_payload(&json!({
            "openPopupAction": { "text": "Playback interrupted" }
        })));
        assert!(m.is_interruption_payload(&json!("answer/3037019")));
        assert!(!m.is_interruption_payload(&json!({ "signal": "HIDE" })));
    }

    #[test]
    fn classify_reports_phrase_and_action() {
        let m = PatternMatcher::default();
        let c = m.classify("Was playback interrupted? Continue");
        assert!(c.interruption);
        assert!(c.action);
        assert_eq!(c.matched_phrase.as_deref(), Some("playback interrupted"));
    }

    #[test]
    fn invalid_tables_are_rejected() {
        let mut sig = InterruptionSignature::default();
        sig.dialog_selectors = vec!["div > p".into()];
        assert!(matches!(
            PatternMatcher::new(sig),
            Err(SignatureError::Selector { field: "dialog_selectors", .. })
        ));

        let mut sig = InterruptionSignature::default();
        sig.action_texts.clear();
        assert!(matches!(
            PatternMatcher::new(sig),
            Err(SignatureError::Empty("action_texts"))
        ));
    }
}
