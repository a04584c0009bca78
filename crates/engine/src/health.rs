//! Playback health monitor.
//!
//! A stall is declared only when the position has not moved for the stuck threshold *and*
//! something points at the interruption mechanism: its UI is on the page, or the player reports
//! buffering while the element has no current data. Plain slow networks with data in hand never
//! qualify. Recovery attempts are spaced by an independent cooldown.

use parking_lot::Mutex;
use serde::Serialize;

use page_host::{PlayerState, ReadyState};

use crate::config::EngineConfig;

/// Process-wide health bookkeeping. Timestamps are epoch milliseconds.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlaybackHealthState {
    /// `None` until the first observation, so the first reading always counts as progress.
    pub last_position: Option<f64>,
    pub last_progress_at: i64,
    pub last_recovery_at: Option<i64>,
}

impl PlaybackHealthState {
    pub fn new(now_ms: i64) -> Self {
        Self {
            last_position: None,
            last_progress_at: now_ms,
            last_recovery_at: None,
        }
    }

    /// Records `position` when it moved by more than `epsilon`; returns whether it did.
    /// Non-finite readings count as position zero.
    pub fn observe(&mut self, position: f64, now_ms: i64, epsilon: f64) -> bool {
        let position = finite_position(position);
        let progressed = match self.last_position {
            None => true,
            Some(last) => (position - last).abs() > epsilon,
        };
        if progressed {
            self.last_position = Some(position);
            self.last_progress_at = self.last_progress_at.max(now_ms);
        }
        progressed
    }

    pub fn stalled_for(&self, now_ms: i64) -> i64 {
        now_ms.saturating_sub(self.last_progress_at).max(0)
    }

    /// Time left before another recovery may run; zero when none is pending.
    pub fn cooldown_remaining(&self, now_ms: i64, cooldown_ms: i64) -> i64 {
        match self.last_recovery_at {
            Some(at) => (cooldown_ms - now_ms.saturating_sub(at)).max(0),
            None => 0,
        }
    }

    /// New playback context: forget the position, restart the stall clock, keep the cooldown.
    pub fn reset_progress(&mut self, now_ms: i64) {
        self.last_position = None;
        self.last_progress_at = self.last_progress_at.max(now_ms);
    }
}

pub fn finite_position(position: f64) -> f64 {
    if position.is_finite() {
        position
    } else {
        0.0
    }
}

/// What the page looks like while the position is not moving.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BlockSignals {
    pub interruption_ui: bool,
    pub buffering: bool,
    pub ready_state: ReadyState,
    /// `None` when the player exposes no state entry point.
    pub player_state: Option<PlayerState>,
}

impl BlockSignals {
    pub fn likely_blocked(&self) -> bool {
        self.interruption_ui || (self.buffering && !self.ready_state.has_current_data())
    }

    /// Player state code as the page reports it, `-1` when unavailable.
    pub fn player_state_code(&self) -> i32 {
        self.player_state.map(PlayerState::code).unwrap_or(-1)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "verdict")]
pub enum HealthVerdict {
    Progressing,
    NotBlocked { stalled_for_ms: i64 },
    Stalling { stalled_for_ms: i64 },
    CoolingDown { stalled_for_ms: i64, remaining_ms: i64 },
    /// The caller must run recovery exactly once; the cooldown already started.
    Recover { stalled_for_ms: i64 },
}

impl HealthVerdict {
    pub fn should_recover(&self) -> bool {
        matches!(self, Self::Recover { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HealthCheck {
    pub position: f64,
    pub verdict: HealthVerdict,
    /// Gathered only when the position did not move.
    pub signals: Option<BlockSignals>,
}

#[derive(Debug)]
pub struct HealthMonitor {
    epsilon: f64,
    stuck_threshold_ms: i64,
    recovery_cooldown_ms: i64,
    state: Mutex<PlaybackHealthState>,
}

impl HealthMonitor {
    pub fn new(config: &EngineConfig, now_ms: i64) -> Self {
        Self {
            epsilon: config.progress_epsilon,
            stuck_threshold_ms: config.stuck_threshold_ms,
            recovery_cooldown_ms: config.recovery_cooldown_ms,
            state: Mutex::new(PlaybackHealthState::new(now_ms)),
        }
    }

    pub fn snapshot(&self) -> PlaybackHealthState {
        self.state.lock().clone()
    }

    pub fn reset_for_navigation(&self, now_ms: i64) {
        self.state.lock().reset_progress(now_ms);
    }

    /// Progress is settled before any stall signal is read, within the same check.
    pub fn assess(
        &self,
        position: f64,
        now_ms: i64,
        signals: impl FnOnce() -> BlockSignals,
    ) -> HealthCheck {
        let position = finite_position(position);
        let stalled_for_ms = {
            let mut state = self.state.lock();
            if state.observe(position, now_ms, self.epsilon) {
                return HealthCheck {
                    position,
                    verdict: HealthVerdict::Progressing,
                    signals: None,
                };
            }
            state.stalled_for(now_ms)
        };

        let signals = signals();
        let verdict = if !signals.likely_blocked() {
            HealthVerdict::NotBlocked { stalled_for_ms }
        } else if stalled_for_ms < self.stuck_threshold_ms {
            HealthVerdict::Stalling { stalled_for_ms }
        } else {
            let mut state = self.state.lock();
            let remaining_ms = state.cooldown_remaining(now_ms, self.recovery_cooldown_ms);
            if remaining_ms > 0 {
                HealthVerdict::CoolingDown {
                    stalled_for_ms,
                    remaining_ms,
                }
            } else {
                state.last_recovery_at = Some(now_ms);
                HealthVerdict::Recover { stalled_for_ms }
            }
        };

        HealthCheck {
            position,
            verdict,
            signals: Some(signals),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const START: i64 = 1_000_000;

    fn blocked() -> BlockSignals {
        BlockSignals {
            interruption_ui: true,
            buffering: false,
            ready_state: ReadyState::HaveEnoughData,
            player_state: Some(PlayerState::Playing),
        }
    }

    fn monitor() -> HealthMonitor {
        HealthMonitor::new(&EngineConfig::default(), START)
    }

    #[test]
    fn moving_position_never_recovers() {
        let monitor = monitor();
        for step in 0..30 {
            let check = monitor.assess(10.0 + step as f64 * 0.5, START + step * 1000, blocked);
            assert_eq!(check.verdict, HealthVerdict::Progressing);
            assert!(check.signals.is_none());
        }
        assert_eq!(monitor.snapshot().last_recovery_at, None);
    }

    #[test]
    fn nan_reading_does_not_freeze_progress() {
        let mut state = PlaybackHealthState::new(0);
        assert!(state.observe(f64::NAN, START, 0.02));
        assert_eq!(state.last_position, Some(0.0));
        assert!(state.observe(12.0, START + 1000, 0.02));
        assert!(state.observe(30.0, START + 2000, 0.02));
        assert_eq!(state.last_progress_at, START + 2000);
    }

    #[test]
    fn infinite_position_is_reported_as_zero() {
        let monitor = monitor();
        let check = monitor.assess(f64::INFINITY, START, blocked);
        assert_eq!(check.position, 0.0);
        assert_eq!(check.verdict, HealthVerdict::Progressing);
    }

    #[test]
    fn jitter_within_epsilon_is_not_progress() {
        let mut state = PlaybackHealthState::new(START);
        assert!(state.observe(5.0, START, 0.02));
        assert!(!state.observe(5.015, START + 1000, 0.02));
        assert_eq!(state.last_progress_at, START);
        assert!(state.observe(5.05, START + 2000, 0.02));
        assert_eq!(state.last_progress_at, START + 2000);
    }

    #[test]
    fn cooldown_spaces_recoveries() {
        let monitor = monitor();
        monitor.assess(12.0, START, blocked);

        let mut fired = Vec::new();
        for second in 1..=40 {
            let now = START + second * 1000;
            if monitor.assess(12.0, now, blocked).verdict.should_recover() {
                fired.push(now);
            }
        }
        assert_eq!(fired.first().copied(), Some(START + 8000));
        for pair in fired.windows(2) {
            assert!(pair[1] - pair[0] >= 8000);
        }
        assert_eq!(fired.len(), 5);
    }

    #[test]
    fn buffering_with_data_is_a_slow_network_not_a_block() {
        let monitor = monitor();
        monitor.assess(3.0, START, blocked);
        let check = monitor.assess(3.0, START + 9000, || BlockSignals {
            interruption_ui: false,
            buffering: true,
            ready_state: ReadyState::HaveCurrentData,
            player_state: Some(PlayerState::Buffering),
        });
        assert_eq!(
            check.verdict,
            HealthVerdict::NotBlocked {
                stalled_for_ms: 9000
            }
        );

        let check = monitor.assess(3.0, START + 9500, || BlockSignals {
            interruption_ui: false,
            buffering: true,
            ready_state: ReadyState::HaveMetadata,
            player_state: None,
        });
        assert!(check.verdict.should_recover());
        assert_eq!(check.signals.map(|s| s.player_state_code()), Some(-1));
    }

    #[test]
    fn navigation_reset_keeps_the_cooldown() {
        let monitor = monitor();
        monitor.assess(12.0, START, blocked);
        assert!(monitor.assess(12.0, START + 8000, blocked).verdict.should_recover());

        monitor.reset_for_navigation(START + 9000);
        let state = monitor.snapshot();
        assert_eq!(state.last_position, None);
        assert_eq!(state.last_progress_at, START + 9000);
        assert_eq!(state.last_recovery_at, Some(START + 8000));
    }
}
