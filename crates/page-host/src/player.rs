//! Player container contract.
//!
//! The player exposes a handful of optional entry points. Missing ones return
//! [`HostError::EntryPointMissing`], and callers skip the corresponding step.

use std::sync::Arc;

use playguard_core_types::{CapabilitySlot, NodeId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::HostError;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerState {
    Unstarted,
    Ended,
    Playing,
    Paused,
    Buffering,
    Cued,
    Other(i32),
}

impl PlayerState {
    pub fn from_code(code: i32) -> Self {
        match code {
            -1 => Self::Unstarted,
            0 => Self::Ended,
            1 => Self::Playing,
            2 => Self::Paused,
            3 => Self::Buffering,
            5 => Self::Cued,
            other => Self::Other(other),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Unstarted => -1,
            Self::Ended => 0,
            Self::Playing => 1,
            Self::Paused => 2,
            Self::Buffering => 3,
            Self::Cued => 5,
            Self::Other(code) => code,
        }
    }
}

/// Internal event dispatcher: event name plus structured or string payload.
pub type DispatchFn = Arc<dyn Fn(&str, &Value) -> Value + Send + Sync>;
pub type PauseFn = Arc<dyn Fn() -> Result<(), HostError> + Send + Sync>;

pub trait Player: Send + Sync {
    fn player_id(&self) -> NodeId;
    fn get_player_state(&self) -> Result<PlayerState, HostError>;
    fn play_video(&self) -> Result<(), HostError>;
    fn seek_to(&self, seconds: f64, allow_seek_ahead: bool) -> Result<(), HostError>;
    fn event_dispatcher(&self) -> &CapabilitySlot<DispatchFn>;
    fn pause_entry(&self) -> &CapabilitySlot<PauseFn>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_state_codes_round_trip() {
        for code in [-1, 0, 1, 2, 3, 5, 42] {
            assert_eq!(PlayerState::from_code(code).code(), code);
        }
        assert_eq!(PlayerState::from_code(3), PlayerState::Buffering);
    }
}
