//! Recovery orchestrator.
//!
//! Every step is isolated: a failing step is logged and the next one still runs. Nothing here
//! returns an error to the caller.

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;

use page_host::{ActivityProvider, HostError, MediaElement, Player};
use playguard_core_types::short_text;
use playguard_observe::labels::labels;
use playguard_observe::metrics;

use crate::context::GuardContext;
use crate::health::BlockSignals;

const DIALOG_TEXT_MAX: usize = 200;
const LINK_TEXT_MAX: usize = 220;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStep {
    RefreshActivity,
    SignalActivity,
    ClearDialogs,
    EnsurePlayback,
    PlayerPlay,
    MediaPlay,
    DirectNudge,
    PlayerSeek,
}

impl RecoveryStep {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RefreshActivity => "refresh_activity",
            Self::SignalActivity => "signal_activity",
            Self::ClearDialogs => "clear_dialogs",
            Self::EnsurePlayback => "ensure_playback",
            Self::PlayerPlay => "player_play",
            Self::MediaPlay => "media_play",
            Self::DirectNudge => "direct_nudge",
            Self::PlayerSeek => "player_seek",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "detail")]
pub enum StepOutcome {
    Done,
    Skipped,
    Failed(String),
}

impl StepOutcome {
    fn from_result(result: Result<(), HostError>) -> Self {
        match result {
            Ok(()) => Self::Done,
            Err(err) if err.is_missing() => Self::Skipped,
            Err(err) => Self::Failed(err.to_string()),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DialogSweep {
    pub clicked: usize,
    pub removed: usize,
    pub removed_by_link: usize,
    /// At least one interruption overlay was acted on. Link-based removals do not count.
    pub handled: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RecoveryReport {
    pub at_ms: i64,
    pub position: f64,
    pub steps: Vec<(RecoveryStep, StepOutcome)>,
    pub dialogs: DialogSweep,
}

impl RecoveryReport {
    pub fn outcome(&self, step: RecoveryStep) -> Option<&StepOutcome> {
        self.steps
            .iter()
            .find(|(candidate, _)| *candidate == step)
            .map(|(_, outcome)| outcome)
    }

    fn push(&mut self, step: RecoveryStep, outcome: StepOutcome) {
        if let StepOutcome::Failed(reason) = &outcome {
            tracing::warn!(step = ?step, %reason, "recovery step failed");
        }
        self.steps.push((step, outcome));
    }
}

#[derive(Clone, Debug)]
pub struct RecoveryOrchestrator {
    ctx: Arc<GuardContext>,
}

impl RecoveryOrchestrator {
    pub fn new(ctx: Arc<GuardContext>) -> Self {
        Self { ctx }
    }

    /// Pin the page's last-activity reading to "now", permanently.
    pub fn keep_activity_fresh(&self) -> StepOutcome {
        let clock = self.ctx.clock.clone();
        let provider: ActivityProvider = Arc::new(move || clock.now_ms());
        match self.ctx.page.pin_last_activity(provider) {
            Ok(()) => StepOutcome::Done,
            Err(err) => {
                // Another script may own the property; nothing else to do.
                tracing::debug!(error = %err, "last-activity pin refused");
                StepOutcome::Failed(err.to_string())
            }
        }
    }

    pub fn signal_activity(&self) -> StepOutcome {
        let callback = self.ctx.page.activity_callback();
        if let Some(callback) = &callback {
            callback();
        }
        let (x, y) = self.ctx.config.activity_pointer;
        match self.ctx.document().dispatch_pointer_move(x, y) {
            Ok(()) => StepOutcome::Done,
            Err(err) if callback.is_some() => {
                tracing::debug!(error = %err, "pointer move rejected");
                StepOutcome::Done
            }
            Err(err) => StepOutcome::Failed(err.to_string()),
        }
    }

    /// Click the affirmative action of every interruption overlay, or detach the overlay when
    /// it has none. Hosts of stray support links are removed as well.
    pub fn clear_interrupt_dialogs(&self) -> DialogSweep {
        let document = self.ctx.document();
        let mut sweep = DialogSweep::default();

        for overlay in self.ctx.scanner.find_candidate_overlays(document.as_ref()) {
            if !overlay.is_interruption() {
                continue;
            }
            let text = short_text(&overlay.text, DIALOG_TEXT_MAX);
            if let Some(action) = self.ctx.scanner.find_action_element(overlay.node.as_ref()) {
                match action.click() {
                    Ok(()) => {
                        sweep.clicked += 1;
                        self.ctx
                            .diag
                            .record("dialog_action_clicked", json!({ "text": text }));
                        metrics::inc(
                            metrics::OVERLAYS_HANDLED_TOTAL,
                            labels([("action", "clicked")]),
                        );
                    }
                    Err(err) => {
                        tracing::warn!(node = %overlay.node.node_id(), error = %err, "action click failed");
                    }
                }
                sweep.handled = true;
                continue;
            }

            if overlay.node.is_connected() {
                match overlay.node.remove() {
                    Ok(()) => {
                        sweep.removed += 1;
                        self.ctx.diag.record("dialog_removed", json!({ "text": text }));
                        metrics::inc(
                            metrics::OVERLAYS_HANDLED_TOTAL,
                            labels([("action", "removed")]),
                        );
                    }
                    Err(err) => {
                        tracing::warn!(node = %overlay.node.node_id(), error = %err, "overlay removal failed");
                    }
                }
            }
            sweep.handled = true;
        }

        for (link, host) in self.ctx.scanner.find_support_link_hosts(document.as_ref()) {
            if !host.is_connected() {
                continue;
            }
            let href = link.attribute("href").unwrap_or_default();
            self.ctx.diag.record(
                "dialog_removed_by_link",
                json!({ "href": short_text(&href, LINK_TEXT_MAX) }),
            );
            match host.remove() {
                Ok(()) => {
                    sweep.removed_by_link += 1;
                    metrics::inc(
                        metrics::OVERLAYS_HANDLED_TOTAL,
                        labels([("action", "removed_by_link")]),
                    );
                }
                Err(err) => {
                    tracing::warn!(node = %host.node_id(), error = %err, "support-link host removal failed");
                }
            }
        }

        sweep
    }

    /// Resume a paused element that already has data. Returns whether play was requested.
    pub fn ensure_playback(&self, media: &Arc<dyn MediaElement>) -> bool {
        self.ctx.interceptors.bind_media(media);
        let ready_state = media.ready_state();
        if !(media.paused() && ready_state.has_current_data()) {
            return false;
        }
        self.ctx.diag.record(
            "ensure_playback",
            json!({
                "currentTime": format!("{:.3}", media.current_time()),
                "readyState": ready_state.label(),
            }),
        );
        if let Err(err) = media.play() {
            tracing::debug!(error = %err, "play request rejected");
        }
        true
    }

    /// The bounded recovery sequence for a stall flagged by the health monitor.
    pub fn attempt(
        &self,
        media: &Arc<dyn MediaElement>,
        player: Option<Arc<dyn Player>>,
        position: f64,
        signals: &BlockSignals,
    ) -> RecoveryReport {
        let ready_state = media.ready_state();
        self.ctx.diag.record(
            "recovery_attempt",
            json!({
                "currentTime": format!("{:.3}", position),
                "readyState": ready_state.label(),
                "networkState": media.network_state().label(),
                "playerState": signals.player_state_code(),
                "hasInterruptionUi": signals.interruption_ui,
            }),
        );
        metrics::inc(metrics::RECOVERIES_TOTAL, labels([]));

        let mut report = RecoveryReport {
            at_ms: self.ctx.now_ms(),
            position,
            ..RecoveryReport::default()
        };

        report.push(RecoveryStep::RefreshActivity, self.keep_activity_fresh());
        report.push(RecoveryStep::SignalActivity, self.signal_activity());

        report.dialogs = self.clear_interrupt_dialogs();
        let cleared = if report.dialogs == DialogSweep::default() {
            StepOutcome::Skipped
        } else {
            StepOutcome::Done
        };
        report.push(RecoveryStep::ClearDialogs, cleared);
        let ensured = report.dialogs.handled && self.ensure_playback(media);
        report.push(
            RecoveryStep::EnsurePlayback,
            if ensured {
                StepOutcome::Done
            } else {
                StepOutcome::Skipped
            },
        );

        let player_play = match &player {
            Some(player) => StepOutcome::from_result(player.play_video()),
            None => StepOutcome::Skipped,
        };
        report.push(RecoveryStep::PlayerPlay, player_play);

        let media_play = if media.paused() {
            match media.play() {
                Ok(()) => StepOutcome::Done,
                // Rejected play promises are expected while the page holds playback.
                Err(err) => {
                    tracing::debug!(error = %err, "direct play rejected");
                    StepOutcome::Failed(err.to_string())
                }
            }
        } else {
            StepOutcome::Skipped
        };
        report.push(RecoveryStep::MediaPlay, media_play);

        let config = &self.ctx.config;
        let has_data = media.ready_state().has_current_data();
        let direct = if has_data && position < config.direct_nudge_below {
            StepOutcome::from_result(media.set_current_time(config.nudge_target))
        } else {
            StepOutcome::Skipped
        };
        report.push(RecoveryStep::DirectNudge, direct);

        let seek = match &player {
            Some(player) if has_data && position < config.seek_nudge_below => {
                StepOutcome::from_result(player.seek_to(config.nudge_target, true))
            }
            _ => StepOutcome::Skipped,
        };
        report.push(RecoveryStep::PlayerSeek, seek);

        self.ctx.diag.record(
            "recovery_result",
            json!({
                "steps": report
                    .steps
                    .iter()
                    .map(|(step, outcome)| json!({ "step": step, "outcome": outcome }))
                    .collect::<Vec<_>>(),
                "dialogs": report.dialogs,
            }),
        );
        report
    }
}
