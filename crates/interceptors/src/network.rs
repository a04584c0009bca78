//! Network surface decoration and the resource-timing observer.

use std::sync::Arc;

use serde_json::json;

use diag_store::DiagStore;
use network_tap::NetworkTap;
use page_host::{NetworkSurface, PageHost};
use playguard_core_types::short_text;

use crate::decorator::{install_once, InstallOutcome};
use crate::errors::InterceptError;
use crate::marks::{PatchKey, PatchMarks, PatchSurface};

/// Decorate fetch and request-object send. Each surface is attempted independently.
pub fn install_network_patch(
    marks: &PatchMarks,
    tap: &Arc<NetworkTap>,
    surface: &NetworkSurface,
) -> [(PatchSurface, Result<InstallOutcome, InterceptError>); 2] {
    let fetch = install_once(marks, PatchSurface::Fetch, &surface.fetch, |original| {
        tap.wrap_fetch(original)
    });
    let xhr = install_once(marks, PatchSurface::XhrSend, &surface.xhr_send, |original| {
        tap.wrap_xhr(original)
    });
    [(PatchSurface::Fetch, fetch), (PatchSurface::XhrSend, xhr)]
}

/// Observe resource timing for interesting URLs. Only installed while diagnostics are on.
pub fn install_resource_observer(
    marks: &PatchMarks,
    tap: &Arc<NetworkTap>,
    diag: &DiagStore,
    page: &dyn PageHost,
) -> Result<InstallOutcome, InterceptError> {
    if !diag.enabled() {
        return Ok(InstallOutcome::Skipped);
    }
    let installed = marks.once(PatchSurface::ResourceObserver, PatchKey::Page, || {
        page.observe_resources(tap.resource_callback())
    });
    match installed {
        Ok(true) => Ok(InstallOutcome::Installed),
        Ok(false) => Ok(InstallOutcome::AlreadyInstalled),
        Err(err) if err.is_missing() => {
            Err(InterceptError::SurfaceMissing(PatchSurface::ResourceObserver))
        }
        Err(err) => {
            diag.record(
                "resource_observer_error",
                json!({ "error": short_text(&err.to_string(), tap.config().error_max) }),
            );
            Err(InterceptError::host(PatchSurface::ResourceObserver, err))
        }
    }
}
