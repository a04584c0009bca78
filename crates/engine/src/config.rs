//! Engine configuration and the settings bundle the guard is built from.

use serde::{Deserialize, Serialize};

use diag_store::DiagCfg;
use interrupt_signatures::InterruptionSignature;
use network_tap::config::TapConfig;
use page_interceptors::FlagPolicy;

use crate::errors::EngineError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "EngineConfig::default_site_host")]
    pub site_host: String,
    #[serde(default = "EngineConfig::default_watch_path_prefix")]
    pub watch_path_prefix: String,
    #[serde(default = "EngineConfig::default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// How long the position must stay put before a stall counts.
    #[serde(default = "EngineConfig::default_stuck_threshold_ms")]
    pub stuck_threshold_ms: i64,
    /// Minimum spacing between two recovery attempts.
    #[serde(default = "EngineConfig::default_recovery_cooldown_ms")]
    pub recovery_cooldown_ms: i64,
    /// Position changes at or below this many seconds are not progress.
    #[serde(default = "EngineConfig::default_progress_epsilon")]
    pub progress_epsilon: f64,
    #[serde(default = "EngineConfig::default_nudge_target")]
    pub nudge_target: f64,
    #[serde(default = "EngineConfig::default_direct_nudge_below")]
    pub direct_nudge_below: f64,
    #[serde(default = "EngineConfig::default_seek_nudge_below")]
    pub seek_nudge_below: f64,
    #[serde(default = "EngineConfig::default_pointer")]
    pub activity_pointer: (f64, f64),
    #[serde(default = "EngineConfig::default_user_agent_max")]
    pub user_agent_max: usize,
}

impl EngineConfig {
    fn default_site_host() -> String {
        "www.youtube.com".into()
    }

    fn default_watch_path_prefix() -> String {
        "/watch".into()
    }

    fn default_tick_interval_ms() -> u64 {
        1000
    }

    fn default_stuck_threshold_ms() -> i64 {
        8000
    }

    fn default_recovery_cooldown_ms() -> i64 {
        8000
    }

    fn default_progress_epsilon() -> f64 {
        0.02
    }

    fn default_nudge_target() -> f64 {
        0.05
    }

    fn default_direct_nudge_below() -> f64 {
        0.05
    }

    fn default_seek_nudge_below() -> f64 {
        0.1
    }

    fn default_pointer() -> (f64, f64) {
        (2.0, 2.0)
    }

    fn default_user_agent_max() -> usize {
        140
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.tick_interval_ms == 0 {
            return Err(EngineError::InvalidConfig(
                "tick_interval_ms must be positive".into(),
            ));
        }
        if self.stuck_threshold_ms < 0 || self.recovery_cooldown_ms < 0 {
            return Err(EngineError::InvalidConfig(
                "stall and cooldown windows cannot be negative".into(),
            ));
        }
        if !(self.progress_epsilon >= 0.0) {
            return Err(EngineError::InvalidConfig(
                "progress_epsilon must be a non-negative number".into(),
            ));
        }
        if self.site_host.trim().is_empty() {
            return Err(EngineError::InvalidConfig("site_host is empty".into()));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            site_host: Self::default_site_host(),
            watch_path_prefix: Self::default_watch_path_prefix(),
            tick_interval_ms: Self::default_tick_interval_ms(),
            stuck_threshold_ms: Self::default_stuck_threshold_ms(),
            recovery_cooldown_ms: Self::default_recovery_cooldown_ms(),
            progress_epsilon: Self::default_progress_epsilon(),
            nudge_target: Self::default_nudge_target(),
            direct_nudge_below: Self::default_direct_nudge_below(),
            seek_nudge_below: Self::default_seek_nudge_below(),
            activity_pointer: Self::default_pointer(),
            user_agent_max: Self::default_user_agent_max(),
        }
    }
}

/// Everything a guard needs, grouped by the component that consumes it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GuardSettings {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub signature: InterruptionSignature,
    #[serde(default)]
    pub diagnostics: DiagCfg,
    #[serde(default)]
    pub network: TapConfig,
    #[serde(default)]
    pub flags: FlagPolicy,
}

impl GuardSettings {
    pub fn validate(&self) -> Result<(), EngineError> {
        self.engine.validate()?;
        self.diagnostics.validate()?;
        Ok(())
    }
}
