//! Media element contract.

use std::sync::Arc;

use playguard_core_types::NodeId;
use serde::{Deserialize, Serialize};

use crate::error::HostError;

#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadyState {
    HaveNothing = 0,
    HaveMetadata = 1,
    HaveCurrentData = 2,
    HaveFutureData = 3,
    HaveEnoughData = 4,
}

impl ReadyState {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::HaveNothing),
            1 => Some(Self::HaveMetadata),
            2 => Some(Self::HaveCurrentData),
            3 => Some(Self::HaveFutureData),
            4 => Some(Self::HaveEnoughData),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::HaveNothing => "HAVE_NOTHING",
            Self::HaveMetadata => "HAVE_METADATA",
            Self::HaveCurrentData => "HAVE_CURRENT_DATA",
            Self::HaveFutureData => "HAVE_FUTURE_DATA",
            Self::HaveEnoughData => "HAVE_ENOUGH_DATA",
        }
    }

    pub fn has_current_data(self) -> bool {
        self >= Self::HaveCurrentData
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkState {
    Empty = 0,
    Idle = 1,
    Loading = 2,
    NoSource = 3,
}

impl NetworkState {
    pub fn label(self) -> &'static str {
        match self {
            Self::Empty => "NETWORK_EMPTY",
            Self::Idle => "NETWORK_IDLE",
            Self::Loading => "NETWORK_LOADING",
            Self::NoSource => "NETWORK_NO_SOURCE",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaErrorCode {
    Aborted = 1,
    Network = 2,
    Decode = 3,
    SrcNotSupported = 4,
}

impl MediaErrorCode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Aborted => "MEDIA_ERR_ABORTED",
            Self::Network => "MEDIA_ERR_NETWORK",
            Self::Decode => "MEDIA_ERR_DECODE",
            Self::SrcNotSupported => "MEDIA_ERR_SRC_NOT_SUPPORTED",
        }
    }
}

/// Lifecycle events the guard listens to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaEvent {
    LoadStart,
    LoadedMetadata,
    CanPlay,
    Playing,
    Pause,
    Waiting,
    Stalled,
    Suspend,
    Seeking,
    Seeked,
    Progress,
    Error,
    Abort,
    Emptied,
    Ended,
}

impl MediaEvent {
    pub const ALL: [MediaEvent; 15] = [
        MediaEvent::LoadStart,
        MediaEvent::LoadedMetadata,
        MediaEvent::CanPlay,
        MediaEvent::Playing,
        MediaEvent::Pause,
        MediaEvent::Waiting,
        MediaEvent::Stalled,
        MediaEvent::Suspend,
        MediaEvent::Seeking,
        MediaEvent::Seeked,
        MediaEvent::Progress,
        MediaEvent::Error,
        MediaEvent::Abort,
        MediaEvent::Emptied,
        MediaEvent::Ended,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::LoadStart => "loadstart",
            Self::LoadedMetadata => "loadedmetadata",
            Self::CanPlay => "canplay",
            Self::Playing => "playing",
            Self::Pause => "pause",
            Self::Waiting => "waiting",
            Self::Stalled => "stalled",
            Self::Suspend => "suspend",
            Self::Seeking => "seeking",
            Self::Seeked => "seeked",
            Self::Progress => "progress",
            Self::Error => "error",
            Self::Abort => "abort",
            Self::Emptied => "emptied",
            Self::Ended => "ended",
        }
    }
}

pub type MediaListener = Arc<dyn Fn(MediaEvent) + Send + Sync>;

pub trait MediaElement: Send + Sync {
    fn media_id(&self) -> NodeId;
    /// Playback position in seconds.
    fn current_time(&self) -> f64;
    fn set_current_time(&self, seconds: f64) -> Result<(), HostError>;
    fn paused(&self) -> bool;
    fn ended(&self) -> bool;
    fn ready_state(&self) -> ReadyState;
    fn network_state(&self) -> NetworkState;
    fn current_src(&self) -> String;
    fn error(&self) -> Option<MediaErrorCode>;
    /// Request playback. Rejections surface as `Err` and are the caller's to ignore.
    fn play(&self) -> Result<(), HostError>;
    fn add_listener(&self, event: MediaEvent, listener: MediaListener) -> Result<(), HostError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_state_ordering_tracks_codes() {
        assert!(ReadyState::HaveCurrentData.has_current_data());
        assert!(!ReadyState::HaveMetadata.has_current_data());
        assert_eq!(ReadyState::from_code(4), Some(ReadyState::HaveEnoughData));
        assert_eq!(ReadyState::from_code(9), None);
        assert_eq!(ReadyState::HaveFutureData.label(), "HAVE_FUTURE_DATA");
    }

    #[test]
    fn media_event_names_follow_dom_spelling() {
        let names: Vec<_> = MediaEvent::ALL.iter().map(|e| e.name()).collect();
        assert_eq!(names.len(), 15);
        assert!(names.contains(&"loadedmetadata"));
        assert!(names.contains(&"progress"));
    }
}
