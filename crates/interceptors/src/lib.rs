//! API interception for the interruption guard.
//!
//! Every patch is a decorator over a [`CapabilitySlot`](playguard_core_types::CapabilitySlot):
//! it takes the original capability and returns a wrapped one that still delegates to it.
//! [`PatchMarks`] guarantees each capability is decorated at most once per page load, so the
//! install routines can be re-run on every tick.

pub mod decorator;
pub mod errors;
pub mod flags;
pub mod marks;
pub mod media;
pub mod network;
pub mod player;

use std::sync::Arc;

use serde_json::json;

use diag_store::DiagStore;
use interrupt_signatures::PatternMatcher;
use network_tap::NetworkTap;
use page_host::{Document, MediaElement, PageHost};
use perceiver_overlay::OverlayScanner;

pub use decorator::{install_once, InstallOutcome};
pub use errors::InterceptError;
pub use flags::{install_config_patch, FlagPolicy};
pub use marks::{PatchKey, PatchMarks, PatchSurface};
pub use media::{bind_media_listeners, media_snapshot};
pub use network::{install_network_patch, install_resource_observer};
pub use player::{install_dispatcher_patch, install_pause_patch, should_swallow};

/// Best-effort installer over all intercepted surfaces.
///
/// Failures are logged and never stop the remaining surfaces from being patched.
pub struct Interceptors {
    marks: Arc<PatchMarks>,
    diag: Arc<DiagStore>,
    scanner: OverlayScanner,
    tap: Arc<NetworkTap>,
    flags: Arc<FlagPolicy>,
}

impl Interceptors {
    pub fn new(
        marks: Arc<PatchMarks>,
        diag: Arc<DiagStore>,
        scanner: OverlayScanner,
        tap: Arc<NetworkTap>,
        flags: FlagPolicy,
    ) -> Self {
        Self {
            marks,
            diag,
            scanner,
            tap,
            flags: Arc::new(flags),
        }
    }

    pub fn marks(&self) -> &Arc<PatchMarks> {
        &self.marks
    }

    pub fn tap(&self) -> &Arc<NetworkTap> {
        &self.tap
    }

    fn matcher(&self) -> &Arc<PatternMatcher> {
        self.scanner.matcher()
    }

    fn settle(&self, surface: PatchSurface, result: Result<InstallOutcome, InterceptError>) {
        match result {
            Ok(InstallOutcome::Installed) => {
                tracing::debug!(surface = %surface, "patch installed");
            }
            Ok(_) => {}
            Err(err) if err.is_missing() => {
                tracing::trace!(surface = %surface, "patch skipped: surface missing");
            }
            Err(err) => {
                tracing::warn!(surface = %surface, error = %err, "patch install failed");
                self.diag.record(
                    "patch_error",
                    json!({ "surface": surface.as_str(), "error": err.to_string() }),
                );
            }
        }
    }

    pub fn patch_network(&self, page: &dyn PageHost) {
        let Some(surface) = page.network() else {
            return;
        };
        for (kind, result) in install_network_patch(&self.marks, &self.tap, &surface) {
            self.settle(kind, result);
        }
    }

    pub fn install_resource_observer(&self, page: &dyn PageHost) {
        let result = install_resource_observer(&self.marks, &self.tap, &self.diag, page);
        self.settle(PatchSurface::ResourceObserver, result);
    }

    pub fn patch_config(&self, page: &dyn PageHost) {
        let Some(config) = page.config_object() else {
            return;
        };
        let result = install_config_patch(&self.marks, &self.flags, &self.diag, &config);
        self.settle(PatchSurface::ConfigSet, result);
    }

    /// Patch whichever player container is currently in the document.
    pub fn patch_player(&self, document: &Arc<dyn Document>) {
        let Some(player) = self.scanner.find_player_handle(document.as_ref()) else {
            return;
        };
        let dispatcher =
            install_dispatcher_patch(&self.marks, self.matcher(), &self.diag, player.as_ref());
        self.settle(PatchSurface::PlayerDispatcher, dispatcher);
        let pause = install_pause_patch(
            &self.marks,
            &self.scanner,
            &self.diag,
            document,
            player.as_ref(),
        );
        self.settle(PatchSurface::PlayerPause, pause);
    }

    pub fn bind_media(&self, media: &Arc<dyn MediaElement>) {
        let result = bind_media_listeners(&self.marks, &self.diag, media);
        self.settle(PatchSurface::MediaListeners, result);
    }
}
