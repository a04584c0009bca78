use anyhow::Result;
use clap::Args;
use serde::Serialize;

use interrupt_signatures::{Classification, PatternMatcher};

use super::context::CliContext;
use super::output::{emit, OutputFormat};

#[derive(Args, Clone, Debug)]
pub struct ClassifyArgs {
    /// Text to classify; multiple words are joined with spaces
    #[arg(required = true, value_name = "TEXT")]
    pub text: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ClassifyReport {
    pub text: String,
    #[serde(flatten)]
    pub classification: Classification,
}

pub fn classify_text(matcher: &PatternMatcher, text: &str) -> ClassifyReport {
    ClassifyReport {
        text: text.to_string(),
        classification: matcher.classify(text),
    }
}

pub fn cmd_classify(args: ClassifyArgs, ctx: &CliContext, format: OutputFormat) -> Result<()> {
    let matcher = PatternMatcher::new(ctx.config().guard.signature.clone())?;
    let report = classify_text(&matcher, &args.text.join(" "));
    emit(&report, format, render_human)
}

fn render_human(report: &ClassifyReport) -> String {
    let c = &report.classification;
    let mut out = format!("Text: {}\n", report.text);
    match &c.matched_phrase {
        Some(phrase) => out.push_str(&format!("Interruption: yes (matched \"{phrase}\")\n")),
        None => out.push_str("Interruption: no\n"),
    }
    out.push_str(&format!(
        "Action label: {}\n",
        if c.action { "yes" } else { "no" }
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_output_names_the_matched_phrase() {
        let report = classify_text(&PatternMatcher::default(), "Playback interrupted. Continue?");
        let text = render_human(&report);
        assert!(text.contains("Interruption: yes (matched \"playback interrupted\")"));
        assert!(text.contains("Action label: yes"));
    }

    #[test]
    fn plain_text_is_neither() {
        let report = classify_text(&PatternMatcher::default(), "Subscribe for more");
        assert!(!report.classification.interruption);
        assert!(render_human(&report).contains("Action label: no"));
    }
}
