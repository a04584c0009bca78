use page_host::FetchResponse;
use playguard_cli::scenario::{run_scenario, Scenario, SimulateOptions, SimulationReport};
use playguard_engine::{Activation, GuardSettings, RecoveryStep, StepOutcome};

async fn simulate(raw: &str, options: SimulateOptions) -> SimulationReport {
    let scenario = Scenario::from_yaml_str(raw).expect("scenario parses");
    run_scenario(&scenario, GuardSettings::default(), options)
        .await
        .expect("scenario runs")
}

fn since_start(report: &SimulationReport, at_ms: i64) -> i64 {
    at_ms - report.started_at_ms
}

#[tokio::test]
async fn frozen_position_behind_overlay_recovers_once() {
    let report = simulate(
        include_str!("../demos/stalled_behind_toast.yaml"),
        SimulateOptions::default(),
    )
    .await;

    assert_eq!(report.activation, Activation::Active);
    assert_eq!(report.triggers.get("timer"), Some(&9));
    assert_eq!(report.recoveries.len(), 1);

    let recovery = &report.recoveries[0];
    assert_eq!(since_start(&report, recovery.at_ms), 9_000);
    assert_eq!(recovery.position, 12.0);
    assert!(report.reports[8].recovery.is_some());
    assert!(report.reports[..8].iter().all(|tick| tick.recovery.is_none()));

    assert_eq!(recovery.outcome(RecoveryStep::ClearDialogs), Some(&StepOutcome::Done));
    assert!(recovery.dialogs.handled);
    assert_eq!(recovery.outcome(RecoveryStep::PlayerPlay), Some(&StepOutcome::Done));
    assert_eq!(recovery.outcome(RecoveryStep::DirectNudge), Some(&StepOutcome::Skipped));
    assert_eq!(recovery.outcome(RecoveryStep::PlayerSeek), Some(&StepOutcome::Skipped));

    let toast = report.overlay("toast").expect("toast tracked");
    assert!(toast.connected);
    assert!(toast.clicks >= 9);

    let media = report.media.as_ref().expect("media");
    assert!(media.time_writes.is_empty());
    assert_eq!(media.position, 12.0);
    let player = report.player.as_ref().expect("player");
    assert!(player.seek_calls.is_empty());
    assert_eq!(player.play_calls, 1);
}

#[tokio::test]
async fn advancing_position_never_recovers() {
    let report = simulate(
        include_str!("../demos/steady_progress.yaml"),
        SimulateOptions::default(),
    )
    .await;

    assert_eq!(report.triggers.get("timer"), Some(&20));
    assert!(report.recoveries.is_empty());
    assert_eq!(report.media.as_ref().map(|m| m.position), Some(40.0));
    assert!(report.dialogs.handled);
}

#[tokio::test]
async fn continue_button_is_clicked_not_removed() {
    let report = simulate(
        include_str!("../demos/continue_button.yaml"),
        SimulateOptions::default(),
    )
    .await;

    let prompt = report.overlay("prompt").expect("prompt tracked");
    assert_eq!(prompt.clicks, 1);
    assert!(prompt.connected);
    assert_eq!(report.dialogs.clicked, 1);
    assert_eq!(report.dialogs.removed, 0);
    assert_eq!(report.dialogs.removed_by_link, 0);

    let media = report.media.as_ref().expect("media");
    assert!(!media.paused);
    assert_eq!(media.play_calls, 1);
}

#[tokio::test]
async fn support_link_dialog_without_button_is_detached() {
    let report = simulate(
        include_str!("../demos/support_link_dialog.yaml"),
        SimulateOptions { dump: true, metrics: false },
    )
    .await;

    let notice = report.overlay("notice").expect("notice tracked");
    assert!(!notice.connected);
    assert_eq!(notice.clicks, 0);
    assert_eq!(report.dialogs.removed + report.dialogs.removed_by_link, 1);
    assert!(report.triggers.get("timer").is_none());
    assert!(report.triggers.get("mutation").copied().unwrap_or_default() >= 1);

    let entries = report.diagnostics.expect("dump requested");
    assert!(entries
        .iter()
        .any(|entry| entry.kind == "dialog_removed" || entry.kind == "dialog_removed_by_link"));
}

#[tokio::test]
async fn media_fetch_is_logged_and_returned_unchanged() {
    let report = simulate(
        include_str!("../demos/media_fetch.yaml"),
        SimulateOptions { dump: true, metrics: false },
    )
    .await;

    assert_eq!(report.fetches.len(), 2);
    for fetch in &report.fetches {
        let mut expected = FetchResponse::new(fetch.url.clone(), 200);
        expected.body = b"segment-bytes".to_vec();
        assert_eq!(fetch.response.as_ref(), Some(&expected));
        assert!(fetch.error.is_none());
    }

    let entries = report.diagnostics.expect("dump requested");
    let request = entries
        .iter()
        .position(|entry| entry.kind == "fetch_request")
        .expect("request logged");
    let response = entries
        .iter()
        .position(|entry| entry.kind == "fetch_response")
        .expect("response logged");
    assert!(request < response);
    assert_eq!(entries[response].payload["status"], 200);
    assert_eq!(entries[request].payload["method"], "GET");
    assert_eq!(
        entries.iter().filter(|entry| entry.kind == "fetch_request").count(),
        1,
        "uninteresting urls stay out of the log"
    );

    assert_eq!(report.network.req, 1);
    assert_eq!(report.network.res2xx, 1);
    assert_eq!(report.network.inflight, 0);
}

#[tokio::test]
async fn failing_fetch_is_logged_and_rejected() {
    let report = simulate(
        r#"
page:
  network:
    fail_with: net::ERR_BLOCKED_BY_CLIENT
steps:
  - step: tick
  - step: fetch
    url: https://www.youtube.com/youtubei/v1/player?key=x
    method: POST
"#,
        SimulateOptions { dump: true, metrics: false },
    )
    .await;

    let fetch = &report.fetches[0];
    assert_eq!(fetch.method, "POST");
    assert!(fetch.response.is_none());
    assert_eq!(fetch.error.as_deref(), Some("net::ERR_BLOCKED_BY_CLIENT"));
    let entries = report.diagnostics.expect("dump requested");
    assert!(entries.iter().any(|entry| entry.kind == "fetch_error"));
    assert_eq!(report.network.failed, 1);
}

#[tokio::test]
async fn navigation_restarts_the_stall_clock() {
    let report = simulate(
        include_str!("../demos/navigation_reset.yaml"),
        SimulateOptions::default(),
    )
    .await;

    assert_eq!(report.triggers.get("navigation"), Some(&1));
    assert_eq!(report.recoveries.len(), 1);
    assert_eq!(since_start(&report, report.recoveries[0].at_ms), 14_000);
}

#[tokio::test]
async fn stall_at_zero_is_nudged_forward() {
    let report = simulate(
        include_str!("../demos/zero_position_nudge.yaml"),
        SimulateOptions::default(),
    )
    .await;

    assert_eq!(report.recoveries.len(), 1);
    let recovery = &report.recoveries[0];
    assert_eq!(recovery.outcome(RecoveryStep::DirectNudge), Some(&StepOutcome::Done));
    assert_eq!(recovery.outcome(RecoveryStep::PlayerSeek), Some(&StepOutcome::Done));
    assert_eq!(report.media.as_ref().map(|m| m.time_writes.clone()), Some(vec![0.05]));
    assert_eq!(
        report.player.as_ref().map(|p| p.seek_calls.clone()),
        Some(vec![(0.05, true)])
    );
}

#[tokio::test]
async fn embedded_frames_are_left_alone() {
    let report = simulate(
        include_str!("../demos/embedded_frame.yaml"),
        SimulateOptions { dump: true, metrics: false },
    )
    .await;

    assert_eq!(report.activation, Activation::Embedded);
    assert!(report.reports.iter().all(|tick| !tick.ran));
    assert!(report.recoveries.is_empty());
    assert_eq!(report.overlay("toast").map(|t| t.clicks), Some(0));
    assert_eq!(report.activity_signals, 0);
    assert_eq!(report.diagnostics.map(|d| d.len()), Some(0));
}

#[tokio::test]
async fn bare_player_skips_player_steps() {
    let report = simulate(
        r#"
page:
  player: bare
  media:
    position: 0.0
  overlays:
    - id: toast
      text: Playback interrupted
      buttons:
        - label: Continue
steps:
  - step: tick
    repeat: 9
"#,
        SimulateOptions::default(),
    )
    .await;

    let recovery = &report.recoveries[0];
    assert_eq!(recovery.outcome(RecoveryStep::PlayerPlay), Some(&StepOutcome::Skipped));
    assert_eq!(recovery.outcome(RecoveryStep::PlayerSeek), Some(&StepOutcome::Skipped));
    assert_eq!(recovery.outcome(RecoveryStep::DirectNudge), Some(&StepOutcome::Done));
    assert_eq!(recovery.steps.len(), 8);
}

#[tokio::test]
async fn metrics_report_carries_tick_series() {
    let report = simulate(
        "steps:\n  - step: tick\n    repeat: 2\n",
        SimulateOptions { dump: false, metrics: true },
    )
    .await;
    let rendered = report.metrics.expect("metrics requested");
    assert!(rendered.contains("playguard_ticks_total"));
    assert!(rendered.contains("playguard_tick_latency_us"));
}
