//! Shared engine context: the page plus every component wired over it.

use std::sync::Arc;

use diag_store::DiagStore;
use interrupt_signatures::PatternMatcher;
use network_tap::NetworkTap;
use page_host::{Document, MediaElement, PageHost, Player};
use page_interceptors::{Interceptors, PatchMarks};
use perceiver_overlay::OverlayScanner;
use playguard_core_types::SharedClock;

use crate::config::{EngineConfig, GuardSettings};
use crate::errors::EngineError;

/// One per page load. Owns the patch marks, so a fresh context means fresh patches.
pub struct GuardContext {
    pub page: Arc<dyn PageHost>,
    pub config: EngineConfig,
    pub clock: SharedClock,
    pub diag: Arc<DiagStore>,
    pub scanner: OverlayScanner,
    pub interceptors: Interceptors,
}

impl GuardContext {
    pub fn new(
        page: Arc<dyn PageHost>,
        settings: GuardSettings,
        clock: SharedClock,
    ) -> Result<Arc<Self>, EngineError> {
        settings.validate()?;
        let matcher = Arc::new(PatternMatcher::new(settings.signature)?);
        let diag = Arc::new(DiagStore::open(
            settings.diagnostics,
            page.storage(),
            clock.clone(),
        ));
        let scanner = OverlayScanner::new(matcher);
        let tap = NetworkTap::new(settings.network, diag.clone(), clock.clone());
        let interceptors = Interceptors::new(
            Arc::new(PatchMarks::new()),
            diag.clone(),
            scanner.clone(),
            tap,
            settings.flags,
        );
        Ok(Arc::new(Self {
            page,
            config: settings.engine,
            clock,
            diag,
            scanner,
            interceptors,
        }))
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    pub fn document(&self) -> Arc<dyn Document> {
        self.page.document()
    }

    pub fn marks(&self) -> &Arc<PatchMarks> {
        self.interceptors.marks()
    }

    pub fn tap(&self) -> &Arc<NetworkTap> {
        self.interceptors.tap()
    }

    pub fn media(&self) -> Option<Arc<dyn MediaElement>> {
        self.scanner.find_media_element(self.document().as_ref())
    }

    pub fn player(&self) -> Option<Arc<dyn Player>> {
        self.scanner.find_player_handle(self.document().as_ref())
    }
}

impl std::fmt::Debug for GuardContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardContext")
            .field("href", &self.page.location().href)
            .field("config", &self.config)
            .field("diag", &self.diag)
            .field("marks", &self.marks().len())
            .finish()
    }
}
