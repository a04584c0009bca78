//! Install-once decoration of a [`CapabilitySlot`].

use playguard_core_types::CapabilitySlot;

use crate::errors::InterceptError;
use crate::marks::{PatchKey, PatchMarks, PatchSurface};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InstallOutcome {
    Installed,
    AlreadyInstalled,
    /// Preconditions for the patch are not met (e.g. diagnostics disabled).
    Skipped,
}

/// Replace the slot's value with `wrap(original)` unless this slot was already decorated.
///
/// The slot id is the idempotency key, so repeated calls never stack a second layer.
pub fn install_once<T: Clone>(
    marks: &PatchMarks,
    surface: PatchSurface,
    slot: &CapabilitySlot<T>,
    wrap: impl FnOnce(T) -> T,
) -> Result<InstallOutcome, InterceptError> {
    let key = PatchKey::Slot(slot.id());
    if marks.is_marked(surface, key) {
        return Ok(InstallOutcome::AlreadyInstalled);
    }
    let original = slot.get().ok_or(InterceptError::SurfaceMissing(surface))?;
    slot.replace(wrap(original));
    marks.mark(surface, key);
    Ok(InstallOutcome::Installed)
}
