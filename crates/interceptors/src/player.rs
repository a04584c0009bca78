//! Player dispatcher and pause decorators.

use std::sync::Arc;

use serde_json::{json, Value};

use diag_store::DiagStore;
use interrupt_signatures::{payload_text, PatternMatcher};
use page_host::{DispatchFn, Document, PauseFn, Player};
use perceiver_overlay::OverlayScanner;
use playguard_core_types::short_text;

use crate::decorator::{install_once, InstallOutcome};
use crate::errors::InterceptError;
use crate::marks::{PatchMarks, PatchSurface};

pub const SNACKBAR_EVENT: &str = "onSnackbarMessage";
pub const COMMAND_EVENT: &str = "innertubeCommand";
const PAYLOAD_MAX: usize = 280;

/// Whether a dispatcher call must be dropped instead of forwarded.
pub fn should_swallow(matcher: &PatternMatcher, event: &str, payload: &Value) -> bool {
    match event {
        SNACKBAR_EVENT => match payload {
            Value::Number(n) => n.as_f64() == Some(1.0),
            Value::String(s) => s == "1",
            _ => false,
        },
        COMMAND_EVENT => matcher.is_interruption_payload(payload),
        _ => false,
    }
}

pub fn install_dispatcher_patch(
    marks: &PatchMarks,
    matcher: &Arc<PatternMatcher>,
    diag: &Arc<DiagStore>,
    player: &dyn Player,
) -> Result<InstallOutcome, InterceptError> {
    install_once(
        marks,
        PatchSurface::PlayerDispatcher,
        player.event_dispatcher(),
        |original| {
            let matcher = Arc::clone(matcher);
            let diag = Arc::clone(diag);
            Arc::new(move |event: &str, payload: &Value| {
                if should_swallow(&matcher, event, payload) {
                    diag.record(
                        "player_event_blocked",
                        json!({
                            "eventName": event,
                            "payload": short_text(&payload_text(payload), PAYLOAD_MAX),
                        }),
                    );
                    return Value::Null;
                }
                original(event, payload)
            }) as DispatchFn
        },
    )
}

/// Pause requests are dropped while interruption UI is on screen.
pub fn install_pause_patch(
    marks: &PatchMarks,
    scanner: &OverlayScanner,
    diag: &Arc<DiagStore>,
    document: &Arc<dyn Document>,
    player: &dyn Player,
) -> Result<InstallOutcome, InterceptError> {
    install_once(marks, PatchSurface::PlayerPause, player.pause_entry(), |original| {
        let scanner = scanner.clone();
        let diag = Arc::clone(diag);
        let document = Arc::clone(document);
        Arc::new(move || {
            if scanner.has_interruption_ui(document.as_ref()) {
                diag.record(
                    "pause_blocked",
                    json!({ "reason": "interruption_ui_detected" }),
                );
                return Ok(());
            }
            original()
        }) as PauseFn
    })
}
