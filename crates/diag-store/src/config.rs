use serde::{Deserialize, Serialize};

use crate::errors::DiagError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiagCfg {
    #[serde(default = "DiagCfg::default_capacity")]
    pub capacity: usize,
    /// Persist the ring every N-th entry.
    #[serde(default = "DiagCfg::default_persist_every")]
    pub persist_every: u64,
    /// Entry types containing any of these fragments are persisted immediately.
    #[serde(default = "DiagCfg::default_urgent_fragments")]
    pub urgent_fragments: Vec<String>,
    #[serde(default = "DiagCfg::default_log_key")]
    pub log_key: String,
    #[serde(default = "DiagCfg::default_init_key")]
    pub init_key: String,
    #[serde(default = "DiagCfg::default_heartbeat_key")]
    pub heartbeat_key: String,
    /// Storage key whose value `"0"` turns diagnostics off.
    #[serde(default = "DiagCfg::default_toggle_key")]
    pub toggle_key: String,
    /// Overrides the stored toggle when set.
    #[serde(default)]
    pub force_enabled: Option<bool>,
    #[serde(default = "DiagCfg::default_version")]
    pub version: String,
}

impl DiagCfg {
    pub fn validate(&self) -> Result<(), DiagError> {
        if self.capacity == 0 {
            return Err(DiagError::InvalidConfig("capacity must be positive".into()));
        }
        if self.persist_every == 0 {
            return Err(DiagError::InvalidConfig(
                "persist_every must be positive".into(),
            ));
        }
        Ok(())
    }

    fn default_capacity() -> usize {
        400
    }

    fn default_persist_every() -> u64 {
        5
    }

    fn default_urgent_fragments() -> Vec<String> {
        ["error", "blocked", "recovery", "stalled", "waiting"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    fn default_log_key() -> String {
        "yt_interrupt_debug_logs".into()
    }

    fn default_init_key() -> String {
        "yt_interrupt_last_init".into()
    }

    fn default_heartbeat_key() -> String {
        "yt_interrupt_last_heartbeat".into()
    }

    fn default_toggle_key() -> String {
        "yt_interrupt_debug".into()
    }

    fn default_version() -> String {
        "1.3.4".into()
    }
}

impl Default for DiagCfg {
    fn default() -> Self {
        Self {
            capacity: Self::default_capacity(),
            persist_every: Self::default_persist_every(),
            urgent_fragments: Self::default_urgent_fragments(),
            log_key: Self::default_log_key(),
            init_key: Self::default_init_key(),
            heartbeat_key: Self::default_heartbeat_key(),
            toggle_key: Self::default_toggle_key(),
            force_enabled: None,
            version: Self::default_version(),
        }
    }
}
