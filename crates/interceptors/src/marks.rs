//! Process-wide record of which surfaces have been patched.

use std::fmt;

use dashmap::DashSet;
use serde::Serialize;

use page_host::{HostError, MediaEvent};
use playguard_core_types::{NodeId, SlotId};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchSurface {
    Fetch,
    XhrSend,
    ResourceObserver,
    ConfigSet,
    PlayerDispatcher,
    PlayerPause,
    MediaListeners,
    DebugSurface,
}

impl PatchSurface {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::XhrSend => "xhr_send",
            Self::ResourceObserver => "resource_observer",
            Self::ConfigSet => "config_set",
            Self::PlayerDispatcher => "player_dispatcher",
            Self::PlayerPause => "player_pause",
            Self::MediaListeners => "media_listeners",
            Self::DebugSurface => "debug_surface",
        }
    }
}

impl fmt::Display for PatchSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of the patched capability.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum PatchKey {
    Slot(SlotId),
    Node(NodeId),
    /// One listener on one media element; lets a partial bind resume where it stopped.
    MediaEvent(NodeId, MediaEvent),
    /// Page-wide surfaces without an object identity.
    Page,
}

/// Marks are only ever added. A full page load starts from a fresh set.
#[derive(Debug, Default)]
pub struct PatchMarks {
    marks: DashSet<(PatchSurface, PatchKey)>,
}

impl PatchMarks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_marked(&self, surface: PatchSurface, key: PatchKey) -> bool {
        self.marks.contains(&(surface, key))
    }

    /// Returns `false` when the mark was already present.
    pub fn mark(&self, surface: PatchSurface, key: PatchKey) -> bool {
        self.marks.insert((surface, key))
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    pub fn count(&self, surface: PatchSurface) -> usize {
        self.marks.iter().filter(|entry| entry.0 == surface).count()
    }

    /// Runs `install` once per key; later calls are no-ops.
    pub fn once(
        &self,
        surface: PatchSurface,
        key: PatchKey,
        install: impl FnOnce() -> Result<(), HostError>,
    ) -> Result<bool, HostError> {
        if self.is_marked(surface, key) {
            return Ok(false);
        }
        install()?;
        Ok(self.mark(surface, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn once_runs_install_a_single_time() {
        let marks = PatchMarks::new();
        let mut runs = 0;
        for _ in 0..3 {
            marks
                .once(PatchSurface::DebugSurface, PatchKey::Page, || {
                    runs += 1;
                    Ok(())
                })
                .unwrap();
        }
        assert_eq!(runs, 1);
        assert_eq!(marks.count(PatchSurface::DebugSurface), 1);
    }

    #[test]
    fn failed_install_is_not_marked() {
        let marks = PatchMarks::new();
        let err = marks
            .once(PatchSurface::ResourceObserver, PatchKey::Page, || {
                Err(HostError::rejected("observer threw"))
            })
            .unwrap_err();
        assert_eq!(err, HostError::rejected("observer threw"));
        assert!(!marks.is_marked(PatchSurface::ResourceObserver, PatchKey::Page));
    }
}
