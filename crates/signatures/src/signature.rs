use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use page_host::SelectorError;

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to deserialize signature bundle: {0}")]
    Deserialize(String),
    #[error("invalid selector in `{field}`: {source}")]
    Selector {
        field: &'static str,
        #[source]
        source: SelectorError,
    },
    #[error("`{0}` must not be empty")]
    Empty(&'static str),
}

/// Static description of the interruption UI. Loaded once at startup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InterruptionSignature {
    /// Support article code embedded in the overlay's help link.
    #[serde(default = "InterruptionSignature::default_support_code")]
    pub support_code: String,
    /// Other href fragments identifying the diagnostic help page.
    #[serde(default = "InterruptionSignature::default_diagnostic_paths")]
    pub diagnostic_paths: Vec<String>,
    #[serde(default = "InterruptionSignature::default_dialog_texts")]
    pub dialog_texts: Vec<String>,
    #[serde(default = "InterruptionSignature::default_action_texts")]
    pub action_texts: Vec<String>,
    #[serde(default = "InterruptionSignature::default_dialog_selectors")]
    pub dialog_selectors: Vec<String>,
    #[serde(default = "InterruptionSignature::default_action_selectors")]
    pub action_selectors: Vec<String>,
    /// Containers a support link is resolved to before removal.
    #[serde(default = "InterruptionSignature::default_link_hosts")]
    pub link_hosts: Vec<String>,
    #[serde(default = "InterruptionSignature::default_player_selector")]
    pub player_selector: String,
    #[serde(default = "InterruptionSignature::default_spinner_selector")]
    pub spinner_selector: String,
    #[serde(default = "InterruptionSignature::default_media_selector")]
    pub media_selector: String,
}

impl InterruptionSignature {
    fn default_support_code() -> String {
        "3037019".into()
    }

    fn default_diagnostic_paths() -> Vec<String> {
        vec!["check_ad_blockers".into()]
    }

    fn default_dialog_texts() -> Vec<String> {
        [
            "experiencing interruptions",
            "playback interrupted",
            "was playback interrupted",
            "再生が中断",
            "播放中断",
            "播放已中断",
            "재생이 중단",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }

    fn default_action_texts() -> Vec<String> {
        [
            "continue", "resume", "yes", "ok", "watch", "続行", "再生", "はい", "继续", "繼續",
            "계속",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }

    fn default_dialog_selectors() -> Vec<String> {
        [
            "tp-yt-paper-toast",
            "yt-confirm-dialog-renderer",
            "ytd-enforcement-message-view-model",
            "tp-yt-paper-dialog[aria-modal=\"true\"]",
            "tp-yt-paper-dialog[role=\"dialog\"]",
            "ytd-popup-container tp-yt-paper-dialog",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }

    fn default_action_selectors() -> Vec<String> {
        [
            "button",
            "[role=\"button\"]",
            "yt-button-renderer",
            "tp-yt-paper-button",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }

    fn default_link_hosts() -> Vec<String> {
        [
            "tp-yt-paper-toast",
            "yt-confirm-dialog-renderer",
            "tp-yt-paper-dialog",
            "ytd-popup-container",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }

    fn default_player_selector() -> String {
        "#movie_player".into()
    }

    fn default_spinner_selector() -> String {
        ".ytp-spinner".into()
    }

    fn default_media_selector() -> String {
        "video".into()
    }

    /// Anchor selector matching the support code or any diagnostic path.
    pub fn support_link_selector(&self) -> String {
        std::iter::once(&self.support_code)
            .chain(self.diagnostic_paths.iter())
            .filter(|fragment| !fragment.is_empty())
            .map(|fragment| format!("a[href*=\"{fragment}\"]"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for InterruptionSignature {
    fn default() -> Self {
        Self {
            support_code: Self::default_support_code(),
            diagnostic_paths: Self::default_diagnostic_paths(),
            dialog_texts: Self::default_dialog_texts(),
            action_texts: Self::default_action_texts(),
            dialog_selectors: Self::default_dialog_selectors(),
            action_selectors: Self::default_action_selectors(),
            link_hosts: Self::default_link_hosts(),
            player_selector: Self::default_player_selector(),
            spinner_selector: Self::default_spinner_selector(),
            media_selector: Self::default_media_selector(),
        }
    }
}

pub fn load_signature_from_reader<R: Read>(
    mut reader: R,
) -> Result<InterruptionSignature, SignatureError> {
    let mut buf = String::new();
    reader.read_to_string(&mut buf)?;
    parse_signature_str(&buf)
}

pub fn load_signature_from_path(
    path: impl AsRef<Path>,
) -> Result<InterruptionSignature, SignatureError> {
    let path = path.as_ref();
    tracing::debug!(path = %path.display(), "loading signature bundle");
    let file = File::open(path)?;
    load_signature_from_reader(file)
}

/// Parses JSON first and falls back to YAML.
pub fn parse_signature_str(raw: &str) -> Result<InterruptionSignature, SignatureError> {
    match serde_json::from_str(raw) {
        Ok(signature) => Ok(signature),
        Err(json_err) => serde_yaml::from_str(raw).map_err(|yaml_err| {
            SignatureError::Deserialize(format!(
                "json error: {}; yaml error: {}",
                json_err, yaml_err
            ))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn support_link_selector_covers_code_and_paths() {
        let sig = InterruptionSignature::default();
        assert_eq!(
            sig.support_link_selector(),
            "a[href*=\"3037019\"], a[href*=\"check_ad_blockers\"]"
        );
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let sig = parse_signature_str(r#"{ "support_code": "9999" }"#).expect("json");
        assert_eq!(sig.support_code, "9999");
        assert_eq!(sig.player_selector, "#movie_player");
        assert_eq!(sig.dialog_texts.len(), 7);
    }

    #[test]
    fn yaml_fallback_reports_both_errors() {
        let sig = parse_signature_str("dialog_texts:\n  - paused for you\n").expect("yaml");
        assert_eq!(sig.dialog_texts, vec!["paused for you".to_string()]);

        let err = parse_signature_str("dialog_texts: [unterminated").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("json error"));
        assert!(message.contains("yaml error"));
    }
}
