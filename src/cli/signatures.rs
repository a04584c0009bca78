use anyhow::Result;

use interrupt_signatures::{InterruptionSignature, PatternMatcher};

use super::context::CliContext;
use super::output::{emit, OutputFormat};

/// Prints the tables the guard would run with, after checking they compile.
pub fn cmd_signatures(ctx: &CliContext, format: OutputFormat) -> Result<()> {
    let signature = &ctx.config().guard.signature;
    let matcher = PatternMatcher::new(signature.clone())?;
    emit(signature, format, |signature| render_human(signature, &matcher))
}

fn render_human(signature: &InterruptionSignature, matcher: &PatternMatcher) -> String {
    let mut out = String::from("Interruption Signature\n======================\n");
    out.push_str(&format!("Support code: {}\n", signature.support_code));
    out.push_str(&format!(
        "Support link selector: {}\n",
        signature.support_link_selector()
    ));
    list(&mut out, "Dialog texts", &signature.dialog_texts);
    list(&mut out, "Action texts", &signature.action_texts);
    list(&mut out, "Dialog selectors", &signature.dialog_selectors);
    list(&mut out, "Action selectors", &signature.action_selectors);
    list(&mut out, "Link hosts", &signature.link_hosts);
    out.push_str(&format!("Player: {}\n", signature.player_selector));
    out.push_str(&format!("Spinner: {}\n", signature.spinner_selector));
    out.push_str(&format!("Media: {}\n", signature.media_selector));
    out.push_str(&format!(
        "Compiled dialog selector: {}\n",
        matcher.dialog_selector().as_str()
    ));
    out
}

fn list(out: &mut String, title: &str, values: &[String]) {
    out.push_str(&format!("{title}:\n"));
    for value in values {
        out.push_str(&format!("  - {value}\n"));
    }
}
