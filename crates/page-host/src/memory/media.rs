use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use playguard_core_types::NodeId;

use crate::error::HostError;
use crate::media::{MediaElement, MediaErrorCode, MediaEvent, MediaListener, NetworkState, ReadyState};

#[derive(Clone, Debug, PartialEq)]
pub struct MediaState {
    pub current_time: f64,
    pub paused: bool,
    pub ended: bool,
    pub ready_state: ReadyState,
    pub network_state: NetworkState,
    pub src: String,
    pub error: Option<MediaErrorCode>,
}

impl Default for MediaState {
    fn default() -> Self {
        Self {
            current_time: 0.0,
            paused: true,
            ended: false,
            ready_state: ReadyState::HaveEnoughData,
            network_state: NetworkState::Idle,
            src: "blob:https://www.youtube.com/5f1c2a".to_string(),
            error: None,
        }
    }
}

/// Scriptable media element. Listeners fire outside the state lock so they may
/// read the element back.
pub struct MemoryMedia {
    id: NodeId,
    state: Mutex<MediaState>,
    listeners: Mutex<Vec<(MediaEvent, MediaListener)>>,
    play_calls: AtomicUsize,
    time_writes: Mutex<Vec<f64>>,
    reject_play: AtomicBool,
}

impl MemoryMedia {
    pub fn new(state: MediaState) -> Arc<Self> {
        Arc::new(Self {
            id: NodeId::new(),
            state: Mutex::new(state),
            listeners: Mutex::new(Vec::new()),
            play_calls: AtomicUsize::new(0),
            time_writes: Mutex::new(Vec::new()),
            reject_play: AtomicBool::new(false),
        })
    }

    pub fn playing(position: f64) -> Arc<Self> {
        Self::new(MediaState {
            current_time: position,
            paused: false,
            ..MediaState::default()
        })
    }

    pub fn state(&self) -> MediaState {
        self.state.lock().clone()
    }

    pub fn update(&self, f: impl FnOnce(&mut MediaState)) {
        f(&mut self.state.lock());
    }

    pub fn set_position(&self, seconds: f64) {
        self.state.lock().current_time = seconds;
    }

    pub fn advance(&self, delta_seconds: f64) -> f64 {
        let mut state = self.state.lock();
        state.current_time += delta_seconds;
        state.current_time
    }

    pub fn set_paused(&self, paused: bool) {
        self.state.lock().paused = paused;
        self.emit(if paused {
            MediaEvent::Pause
        } else {
            MediaEvent::Playing
        });
    }

    pub fn set_ready_state(&self, ready_state: ReadyState) {
        self.state.lock().ready_state = ready_state;
    }

    pub fn set_reject_play(&self, reject: bool) {
        self.reject_play.store(reject, Ordering::SeqCst);
    }

    pub fn play_calls(&self) -> usize {
        self.play_calls.load(Ordering::SeqCst)
    }

    /// Every value assigned through `set_current_time`, in order.
    pub fn time_writes(&self) -> Vec<f64> {
        self.time_writes.lock().clone()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    pub fn emit(&self, event: MediaEvent) {
        let targets: Vec<MediaListener> = self
            .listeners
            .lock()
            .iter()
            .filter(|(kind, _)| *kind == event)
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in targets {
            listener(event);
        }
    }
}

impl MediaElement for MemoryMedia {
    fn media_id(&self) -> NodeId {
        self.id
    }

    fn current_time(&self) -> f64 {
        self.state.lock().current_time
    }

    fn set_current_time(&self, seconds: f64) -> Result<(), HostError> {
        self.time_writes.lock().push(seconds);
        self.state.lock().current_time = seconds;
        self.emit(MediaEvent::Seeking);
        self.emit(MediaEvent::Seeked);
        Ok(())
    }

    fn paused(&self) -> bool {
        self.state.lock().paused
    }

    fn ended(&self) -> bool {
        self.state.lock().ended
    }

    fn ready_state(&self) -> ReadyState {
        self.state.lock().ready_state
    }

    fn network_state(&self) -> NetworkState {
        self.state.lock().network_state
    }

    fn current_src(&self) -> String {
        self.state.lock().src.clone()
    }

    fn error(&self) -> Option<MediaErrorCode> {
        self.state.lock().error
    }

    fn play(&self) -> Result<(), HostError> {
        self.play_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_play.load(Ordering::SeqCst) {
            return Err(HostError::rejected("NotAllowedError: play() was blocked"));
        }
        self.state.lock().paused = false;
        self.emit(MediaEvent::Playing);
        Ok(())
    }

    fn add_listener(&self, event: MediaEvent, listener: MediaListener) -> Result<(), HostError> {
        self.listeners.lock().push((event, listener));
        Ok(())
    }
}

impl std::fmt::Debug for MemoryMedia {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryMedia")
            .field("id", &self.id)
            .field("state", &*self.state.lock())
            .finish()
    }
}
