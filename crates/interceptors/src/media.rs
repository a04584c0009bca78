//! Lifecycle logging on the media element.

use std::sync::Arc;

use serde_json::{json, Value};

use diag_store::DiagStore;
use page_host::{MediaElement, MediaEvent, MediaListener};
use playguard_core_types::short_text;

use crate::decorator::InstallOutcome;
use crate::errors::InterceptError;
use crate::marks::{PatchKey, PatchMarks, PatchSurface};

const SRC_MAX: usize = 180;

/// State captured with every media diagnostic.
pub fn media_snapshot(media: &dyn MediaElement) -> Value {
    json!({
        "currentTime": format!("{:.3}", media.current_time()),
        "paused": media.paused(),
        "readyState": media.ready_state().label(),
        "networkState": media.network_state().label(),
        "src": short_text(&media.current_src(), SRC_MAX),
        "error": media.error().map(|code| code.label()),
    })
}

/// Bind one listener per lifecycle event, once per element.
///
/// Each event is marked as soon as its listener is attached, so a bind that fails partway
/// resumes on the next call without doubling earlier listeners. `progress` is bound for
/// completeness but never logged; it fires too often to be useful.
pub fn bind_media_listeners(
    marks: &PatchMarks,
    diag: &Arc<DiagStore>,
    media: &Arc<dyn MediaElement>,
) -> Result<InstallOutcome, InterceptError> {
    let media_id = media.media_id();
    let key = PatchKey::Node(media_id);
    if marks.is_marked(PatchSurface::MediaListeners, key) {
        return Ok(InstallOutcome::AlreadyInstalled);
    }

    for event in MediaEvent::ALL {
        let event_key = PatchKey::MediaEvent(media_id, event);
        if marks.is_marked(PatchSurface::MediaListeners, event_key) {
            continue;
        }
        let element = Arc::downgrade(media);
        let diag = Arc::clone(diag);
        let listener: MediaListener = Arc::new(move |fired: MediaEvent| {
            if fired == MediaEvent::Progress {
                return;
            }
            if let Some(element) = element.upgrade() {
                diag.record(
                    &format!("video_{}", fired.name()),
                    media_snapshot(element.as_ref()),
                );
            }
        });
        media
            .add_listener(event, listener)
            .map_err(|err| InterceptError::host(PatchSurface::MediaListeners, err))?;
        marks.mark(PatchSurface::MediaListeners, event_key);
    }

    marks.mark(PatchSurface::MediaListeners, key);
    Ok(InstallOutcome::Installed)
}
