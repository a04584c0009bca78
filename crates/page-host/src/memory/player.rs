use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use playguard_core_types::{CapabilitySlot, NodeId};
use serde_json::Value;

use crate::error::HostError;
use crate::media::MediaElement;
use crate::player::{DispatchFn, PauseFn, Player, PlayerState};

use super::media::MemoryMedia;

/// Player container with the site's entry points. The page side calls
/// [`MemoryPlayer::dispatch`] and [`MemoryPlayer::request_pause`], which go through
/// whatever the slots currently hold.
pub struct MemoryPlayer {
    id: NodeId,
    state: Mutex<PlayerState>,
    media: Option<Arc<MemoryMedia>>,
    has_state_entry: bool,
    has_play_entry: bool,
    has_seek_entry: bool,
    play_calls: AtomicUsize,
    seeks: Mutex<Vec<(f64, bool)>>,
    delivered: Arc<Mutex<Vec<(String, Value)>>>,
    pauses: Arc<AtomicUsize>,
    dispatcher: CapabilitySlot<DispatchFn>,
    pause: CapabilitySlot<PauseFn>,
}

impl MemoryPlayer {
    /// Player exposing every entry point, bound to `media` when given.
    pub fn new(media: Option<Arc<MemoryMedia>>) -> Arc<Self> {
        Arc::new(Self::assemble(media, true))
    }

    /// Player without any entry points.
    pub fn bare(media: Option<Arc<MemoryMedia>>) -> Arc<Self> {
        Arc::new(Self::assemble(media, false))
    }

    fn assemble(media: Option<Arc<MemoryMedia>>, full: bool) -> Self {
        let delivered: Arc<Mutex<Vec<(String, Value)>>> = Arc::new(Mutex::new(Vec::new()));
        let pauses = Arc::new(AtomicUsize::new(0));

        let (dispatcher, pause) = if full {
            let sink = Arc::clone(&delivered);
            let dispatch: DispatchFn = Arc::new(move |event: &str, payload: &Value| {
                sink.lock().push((event.to_string(), payload.clone()));
                Value::Bool(true)
            });
            let counter = Arc::clone(&pauses);
            let paused_media = media.clone();
            let pause: PauseFn = Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                if let Some(media) = &paused_media {
                    media.set_paused(true);
                }
                Ok(())
            });
            (CapabilitySlot::new(dispatch), CapabilitySlot::new(pause))
        } else {
            (CapabilitySlot::empty(), CapabilitySlot::empty())
        };

        Self {
            id: NodeId::new(),
            state: Mutex::new(PlayerState::Playing),
            media,
            has_state_entry: full,
            has_play_entry: full,
            has_seek_entry: full,
            play_calls: AtomicUsize::new(0),
            seeks: Mutex::new(Vec::new()),
            delivered,
            pauses,
            dispatcher,
            pause,
        }
    }

    pub fn set_state(&self, state: PlayerState) {
        *self.state.lock() = state;
    }

    /// Page-side event delivery through the current dispatcher.
    pub fn dispatch(&self, event: &str, payload: Value) -> Value {
        match self.dispatcher.get() {
            Some(dispatch) => dispatch(event, &payload),
            None => Value::Null,
        }
    }

    /// Page-side pause request through the current pause entry.
    pub fn request_pause(&self) -> Result<(), HostError> {
        let pause = self.pause.get().ok_or(HostError::EntryPointMissing("pauseVideo"))?;
        pause()
    }

    /// Events that reached the site's own dispatcher.
    pub fn delivered_events(&self) -> Vec<(String, Value)> {
        self.delivered.lock().clone()
    }

    /// Pause requests that reached the site's own pause entry.
    pub fn pause_calls(&self) -> usize {
        self.pauses.load(Ordering::SeqCst)
    }

    pub fn play_calls(&self) -> usize {
        self.play_calls.load(Ordering::SeqCst)
    }

    pub fn seek_calls(&self) -> Vec<(f64, bool)> {
        self.seeks.lock().clone()
    }
}

impl Player for MemoryPlayer {
    fn player_id(&self) -> NodeId {
        self.id
    }

    fn get_player_state(&self) -> Result<PlayerState, HostError> {
        if !self.has_state_entry {
            return Err(HostError::EntryPointMissing("getPlayerState"));
        }
        Ok(*self.state.lock())
    }

    fn play_video(&self) -> Result<(), HostError> {
        if !self.has_play_entry {
            return Err(HostError::EntryPointMissing("playVideo"));
        }
        self.play_calls.fetch_add(1, Ordering::SeqCst);
        *self.state.lock() = PlayerState::Playing;
        match &self.media {
            Some(media) => media.play(),
            None => Ok(()),
        }
    }

    fn seek_to(&self, seconds: f64, allow_seek_ahead: bool) -> Result<(), HostError> {
        if !self.has_seek_entry {
            return Err(HostError::EntryPointMissing("seekTo"));
        }
        self.seeks.lock().push((seconds, allow_seek_ahead));
        if let Some(media) = &self.media {
            media.set_position(seconds);
        }
        Ok(())
    }

    fn event_dispatcher(&self) -> &CapabilitySlot<DispatchFn> {
        &self.dispatcher
    }

    fn pause_entry(&self) -> &CapabilitySlot<PauseFn> {
        &self.pause
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dispatch_reaches_original_handler() {
        let player = MemoryPlayer::new(None);
        assert_eq!(player.dispatch("onStateChange", json!(1)), json!(true));
        assert_eq!(player.delivered_events().len(), 1);
    }

    #[test]
    fn pause_marks_media_paused() {
        let media = MemoryMedia::playing(3.0);
        let player = MemoryPlayer::new(Some(media.clone()));
        player.request_pause().unwrap();
        assert_eq!(player.pause_calls(), 1);
        assert!(media.paused());
    }

    #[test]
    fn bare_player_reports_missing_entry_points() {
        let player = MemoryPlayer::bare(None);
        assert!(player.get_player_state().unwrap_err().is_missing());
        assert!(player.play_video().unwrap_err().is_missing());
        assert_eq!(player.dispatch("x", Value::Null), Value::Null);
        assert!(player.request_pause().is_err());
    }
}
