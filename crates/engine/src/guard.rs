//! Tick handlers: what each trigger does to the page.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::json;

use diag_store::{DiagStore, MarkerKind};
use page_host::{DebugSurface, HostError, MutationRecord, PlayerState};
use page_interceptors::{PatchKey, PatchSurface};
use playguard_core_types::{short_text, SharedClock};
use playguard_observe::labels::labels;
use playguard_observe::metrics;
use playguard_observe::tracing::{observe_latency, tick_span};

use crate::activation::{check_activation, on_watch_page, Activation};
use crate::config::GuardSettings;
use crate::context::GuardContext;
use crate::errors::EngineError;
use crate::health::{BlockSignals, HealthCheck, HealthMonitor, PlaybackHealthState};
use crate::recovery::{DialogSweep, RecoveryOrchestrator, RecoveryReport};
use crate::trigger::{NavigationEvent, Trigger, TriggerSender};

pub const VERSION_ATTRIBUTE: &str = "data-yt-interrupt-version";

/// Result of handling one trigger.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TickReport {
    pub trigger: Option<Trigger>,
    pub at_ms: i64,
    /// `false` when the page is not a playback page (or the guard is inactive).
    pub ran: bool,
    pub dialogs: DialogSweep,
    pub ensured_playback: bool,
    pub health: Option<HealthCheck>,
    pub recovery: Option<RecoveryReport>,
}

impl TickReport {
    fn idle(trigger: Trigger, at_ms: i64) -> Self {
        Self {
            trigger: Some(trigger),
            at_ms,
            ..Self::default()
        }
    }
}

/// The interruption guard for one page load.
pub struct Guard {
    ctx: Arc<GuardContext>,
    activation: Activation,
    monitor: HealthMonitor,
    recovery: RecoveryOrchestrator,
    last_href: Mutex<Option<String>>,
}

impl Guard {
    pub fn new(
        page: Arc<dyn page_host::PageHost>,
        settings: GuardSettings,
        clock: SharedClock,
    ) -> Result<Arc<Self>, EngineError> {
        Ok(Self::from_context(GuardContext::new(page, settings, clock)?))
    }

    pub fn from_context(ctx: Arc<GuardContext>) -> Arc<Self> {
        let activation = check_activation(ctx.page.as_ref(), &ctx.config);
        let monitor = HealthMonitor::new(&ctx.config, ctx.now_ms());
        Arc::new(Self {
            recovery: RecoveryOrchestrator::new(ctx.clone()),
            activation,
            monitor,
            ctx,
            last_href: Mutex::new(None),
        })
    }

    pub fn context(&self) -> &Arc<GuardContext> {
        &self.ctx
    }

    pub fn activation(&self) -> &Activation {
        &self.activation
    }

    pub fn diag(&self) -> &Arc<DiagStore> {
        &self.ctx.diag
    }

    pub fn recovery(&self) -> &RecoveryOrchestrator {
        &self.recovery
    }

    pub fn health(&self) -> PlaybackHealthState {
        self.monitor.snapshot()
    }

    /// Start-up work that does not wait for a playback page: the debug surface and the
    /// navigation baseline.
    pub fn start(&self) -> Result<(), EngineError> {
        if !self.activation.is_active() {
            return Err(EngineError::Inactive(self.activation.clone()));
        }
        *self.last_href.lock() = Some(self.ctx.page.location().href);
        self.install_debug_surface();
        Ok(())
    }

    /// Route document mutations into `sink`.
    pub fn attach_mutation_observer(&self, sink: TriggerSender) -> Result<(), HostError> {
        self.ctx
            .document()
            .observe_mutations(Arc::new(move |_record: &MutationRecord| {
                sink.notify(Trigger::Mutation);
            }))
    }

    /// Exposes the debug surface and writes the init markers, once per page load.
    pub fn install_debug_surface(&self) -> bool {
        if !self.ctx.marks().mark(PatchSurface::DebugSurface, PatchKey::Page) {
            return false;
        }
        let diag = &self.ctx.diag;
        let href = self.ctx.page.location().href;
        if let Err(err) = self
            .ctx
            .page
            .expose_debug_surface(diag.clone() as Arc<dyn DebugSurface>)
        {
            tracing::debug!(error = %err, "debug surface not exposed");
        }
        if let Err(err) = diag.write_marker(MarkerKind::Init, &href) {
            tracing::debug!(error = %err, "init marker not written");
        }
        if let Err(err) = self
            .ctx
            .document()
            .set_root_attribute(VERSION_ATTRIBUTE, diag.version())
        {
            tracing::debug!(error = %err, "version attribute not set");
        }
        diag.record(
            "init",
            json!({
                "href": href,
                "userAgent": short_text(&self.ctx.page.user_agent(), self.ctx.config.user_agent_max),
                "debugEnabled": diag.enabled(),
                "version": diag.version(),
            }),
        );
        true
    }

    pub fn handle(&self, trigger: Trigger) -> TickReport {
        let span = tick_span(trigger.label());
        let _entered = span.enter();
        let started = Instant::now();

        let report = if !self.activation.is_active() {
            TickReport::idle(trigger, self.ctx.now_ms())
        } else {
            match trigger {
                Trigger::Timer => self.full_tick(trigger),
                Trigger::Mutation => self.mutation_tick(),
                Trigger::Navigation(event) => self.navigation_tick(event),
            }
        };

        let latency_us = started.elapsed().as_micros() as u64;
        observe_latency(&span, latency_us);
        metrics::inc(metrics::TICKS_TOTAL, labels([("trigger", trigger.label())]));
        metrics::observe(
            metrics::TICK_LATENCY_US,
            latency_us,
            labels([("trigger", trigger.label())]),
        );
        report
    }

    fn on_watch_page(&self) -> bool {
        on_watch_page(&self.ctx.page.location(), &self.ctx.config)
    }

    fn full_tick(&self, trigger: Trigger) -> TickReport {
        let mut report = TickReport::idle(trigger, self.ctx.now_ms());
        if !self.on_watch_page() {
            return report;
        }
        report.ran = true;

        let page = self.ctx.page.as_ref();
        let interceptors = &self.ctx.interceptors;
        self.install_debug_surface();
        interceptors.patch_network(page);
        interceptors.install_resource_observer(page);
        if let Err(err) = self
            .ctx
            .diag
            .write_marker(MarkerKind::Heartbeat, &page.location().href)
        {
            tracing::trace!(error = %err, "heartbeat marker not written");
        }

        self.recovery.keep_activity_fresh();
        self.recovery.signal_activity();
        interceptors.patch_config(page);
        interceptors.patch_player(&self.ctx.document());

        self.sweep_dialogs(&mut report);
        self.check_health(&mut report);
        report
    }

    fn mutation_tick(&self) -> TickReport {
        let mut report = TickReport::idle(Trigger::Mutation, self.ctx.now_ms());
        if !self.on_watch_page() {
            return report;
        }
        report.ran = true;
        self.ctx.interceptors.patch_player(&self.ctx.document());
        self.sweep_dialogs(&mut report);
        report
    }

    fn navigation_tick(&self, event: NavigationEvent) -> TickReport {
        let href = self.ctx.page.location().href;
        let changed = {
            let mut last = self.last_href.lock();
            let changed = last.as_deref() != Some(href.as_str());
            *last = Some(href.clone());
            changed
        };
        if changed {
            tracing::debug!(event = event.as_str(), href = %href, "new playback context");
            self.monitor.reset_for_navigation(self.ctx.now_ms());
        }
        self.full_tick(Trigger::Navigation(event))
    }

    fn sweep_dialogs(&self, report: &mut TickReport) {
        report.dialogs = self.recovery.clear_interrupt_dialogs();
        if !report.dialogs.handled {
            return;
        }
        if let Some(media) = self.ctx.media() {
            report.ensured_playback = self.recovery.ensure_playback(&media);
        }
    }

    fn check_health(&self, report: &mut TickReport) {
        let Some(media) = self.ctx.media() else {
            return;
        };
        if media.ended() {
            return;
        }
        self.ctx.interceptors.bind_media(&media);

        let now = self.ctx.now_ms();
        let position = media.current_time();
        let player = self.ctx.player();
        let document = self.ctx.document();
        let scanner = &self.ctx.scanner;

        let check = self.monitor.assess(position, now, || {
            let player_state = player
                .as_ref()
                .and_then(|player| player.get_player_state().ok());
            BlockSignals {
                interruption_ui: scanner.has_interruption_ui(document.as_ref()),
                buffering: player_state == Some(PlayerState::Buffering)
                    || scanner.spinner_present(document.as_ref()),
                ready_state: media.ready_state(),
                player_state,
            }
        });
        metrics::set(
            metrics::STALLED_FOR_MS,
            self.monitor.snapshot().stalled_for(now) as f64,
            labels([]),
        );

        if check.verdict.should_recover() {
            if let Some(signals) = &check.signals {
                tracing::info!(position = check.position, "stall detected, recovering");
                report.recovery =
                    Some(self.recovery.attempt(&media, player, check.position, signals));
            }
        }
        report.health = Some(check);
    }
}

impl std::fmt::Debug for Guard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Guard")
            .field("activation", &self.activation)
            .field("health", &self.monitor.snapshot())
            .field("ctx", &self.ctx)
            .finish()
    }
}
