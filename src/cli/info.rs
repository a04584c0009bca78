use std::time::Duration;

use anyhow::Result;
use humantime::format_duration;
use serde::Serialize;

use playguard_engine::EngineConfig;

use super::context::CliContext;
use super::output::{emit, OutputFormat};

#[derive(Debug, Serialize)]
pub struct InfoReport {
    pub version: &'static str,
    pub build_date: &'static str,
    pub git_hash: &'static str,
    pub git_branch: &'static str,
    pub config_path: Option<String>,
    pub engine: EngineConfig,
    pub diagnostics_version: String,
    pub diagnostics_forced: Option<bool>,
}

pub fn cmd_info(ctx: &CliContext, format: OutputFormat) -> Result<()> {
    let config = ctx.config();
    let report = InfoReport {
        version: env!("CARGO_PKG_VERSION"),
        build_date: env!("BUILD_DATE"),
        git_hash: env!("GIT_HASH"),
        git_branch: env!("GIT_BRANCH"),
        config_path: ctx.config_path().map(|path| path.display().to_string()),
        engine: config.guard.engine.clone(),
        diagnostics_version: config.guard.diagnostics.version.clone(),
        diagnostics_forced: config.guard.diagnostics.force_enabled,
    };
    emit(&report, format, render_human)
}

fn millis(ms: i64) -> String {
    format_duration(Duration::from_millis(ms.max(0) as u64)).to_string()
}

fn render_human(report: &InfoReport) -> String {
    let engine = &report.engine;
    let mut out = String::from("Playguard System Information\n============================\n");
    out.push_str(&format!("Version: {}\n", report.version));
    out.push_str(&format!("Build Date: {}\n", report.build_date));
    out.push_str(&format!(
        "Git Commit: {} ({})\n\n",
        report.git_hash, report.git_branch
    ));

    out.push_str("Configuration:\n");
    out.push_str(&format!(
        "- Config File: {}\n",
        report.config_path.as_deref().unwrap_or("(defaults)")
    ));
    out.push_str(&format!(
        "- Site: {}{}*\n",
        engine.site_host, engine.watch_path_prefix
    ));
    out.push_str(&format!(
        "- Health Check Interval: {}\n",
        millis(engine.tick_interval_ms as i64)
    ));
    out.push_str(&format!(
        "- Stuck Threshold: {}\n",
        millis(engine.stuck_threshold_ms)
    ));
    out.push_str(&format!(
        "- Recovery Cooldown: {}\n",
        millis(engine.recovery_cooldown_ms)
    ));
    out.push_str(&format!(
        "- Progress Epsilon: {:.3}s\n",
        engine.progress_epsilon
    ));
    out.push_str(&format!(
        "- Diagnostics: {} (version {})\n",
        match report.diagnostics_forced {
            Some(true) => "forced on",
            Some(false) => "forced off",
            None => "storage toggle",
        },
        report.diagnostics_version
    ));
    out
}
