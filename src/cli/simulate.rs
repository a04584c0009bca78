use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use humantime::format_duration;
use tokio::fs;

use playguard_engine::StepOutcome;

use super::context::CliContext;
use super::output::{emit, OutputFormat};
use crate::scenario::{run_scenario, Scenario, SimulateOptions, SimulationReport};

#[derive(Args, Clone, Debug)]
pub struct SimulateArgs {
    /// Scenario file (YAML)
    #[arg(value_name = "SCENARIO")]
    pub scenario: PathBuf,

    /// Append the diagnostic log
    #[arg(long)]
    pub dump: bool,

    /// Append the metrics registry in Prometheus text format
    #[arg(long)]
    pub metrics: bool,
}

pub async fn cmd_simulate(args: SimulateArgs, ctx: &CliContext, format: OutputFormat) -> Result<()> {
    let raw = fs::read_to_string(&args.scenario)
        .await
        .with_context(|| format!("Failed to read scenario {}", args.scenario.display()))?;
    let mut scenario = Scenario::from_yaml_str(&raw)
        .with_context(|| format!("Invalid scenario {}", args.scenario.display()))?;
    if scenario.name.is_none() {
        scenario.name = args
            .scenario
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned());
    }

    let options = SimulateOptions {
        dump: args.dump,
        metrics: args.metrics,
    };
    let report = run_scenario(&scenario, ctx.config().guard.clone(), options).await?;
    emit(&report, format, render_human)
}

fn outcome_label(outcome: &StepOutcome) -> String {
    match outcome {
        StepOutcome::Done => "done".to_string(),
        StepOutcome::Skipped => "skipped".to_string(),
        StepOutcome::Failed(reason) => format!("failed ({reason})"),
    }
}

pub fn render_human(report: &SimulationReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Scenario: {}\n",
        report.name.as_deref().unwrap_or("(unnamed)")
    ));
    out.push_str(&format!("Activation: {}\n", report.activation));
    out.push_str(&format!(
        "Simulated time: {}\n",
        format_duration(Duration::from_millis(report.elapsed_ms.max(0) as u64))
    ));
    let triggers = report
        .triggers
        .iter()
        .map(|(kind, count)| format!("{kind}={count}"))
        .collect::<Vec<_>>()
        .join(" ");
    out.push_str(&format!("Steps: {} (triggers: {})\n", report.steps, triggers));
    out.push_str(&format!(
        "Dialogs: clicked {}, removed {}, removed by link {}\n",
        report.dialogs.clicked, report.dialogs.removed, report.dialogs.removed_by_link
    ));
    out.push_str(&format!("Activity signals: {}\n", report.activity_signals));

    out.push_str(&format!("Recoveries: {}\n", report.recoveries.len()));
    for recovery in &report.recoveries {
        let steps = recovery
            .steps
            .iter()
            .map(|(step, outcome)| format!("{}={}", step.as_str(), outcome_label(outcome)))
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(&format!(
            "  - at {} ms, position {:.3}s: {}\n",
            recovery.at_ms, recovery.position, steps
        ));
    }

    if !report.overlays.is_empty() {
        out.push_str("Overlays:\n");
        for overlay in &report.overlays {
            out.push_str(&format!(
                "  - {}: {} click(s), {}\n",
                overlay.id,
                overlay.clicks,
                if overlay.connected { "still attached" } else { "removed" }
            ));
        }
    }
    if let Some(media) = &report.media {
        out.push_str(&format!(
            "Media: position {:.3}s, {}, play() x{}, position writes {:?}\n",
            media.position,
            if media.paused { "paused" } else { "playing" },
            media.play_calls,
            media.time_writes
        ));
    }
    if let Some(player) = &report.player {
        out.push_str(&format!(
            "Player: playVideo x{}, seekTo {:?}\n",
            player.play_calls, player.seek_calls
        ));
    }
    if !report.fetches.is_empty() {
        out.push_str("Fetches:\n");
        for fetch in &report.fetches {
            let result = match (&fetch.response, &fetch.error) {
                (Some(response), _) => format!("{}", response.status),
                (None, Some(error)) => format!("error: {error}"),
                (None, None) => "no answer".to_string(),
            };
            out.push_str(&format!("  - {} {} -> {}\n", fetch.method, fetch.url, result));
        }
    }
    let net = &report.network;
    out.push_str(&format!(
        "Network: requests {}, 2xx {}, 4xx {}, 5xx {}, failed {}, in flight {}\n",
        net.req, net.res2xx, net.res4xx, net.res5xx, net.failed, net.inflight
    ));

    if let Some(entries) = &report.diagnostics {
        out.push_str(&format!("\nDiagnostics ({} entries):\n", entries.len()));
        for entry in entries {
            out.push_str(&format!(
                "  {} {} {}\n",
                entry.at.format("%H:%M:%S%.3f"),
                entry.kind,
                entry.payload
            ));
        }
    }
    if let Some(metrics) = &report.metrics {
        out.push_str("\nMetrics:\n");
        out.push_str(metrics);
        if !metrics.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}
