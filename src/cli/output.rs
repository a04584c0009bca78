use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
    Yaml,
}

/// Structured rendering for `Json`/`Yaml`; `None` means the caller prints its human form.
pub fn render_structured<T: Serialize>(value: &T, format: OutputFormat) -> Result<Option<String>> {
    match format {
        OutputFormat::Human => Ok(None),
        OutputFormat::Json => Ok(Some(serde_json::to_string_pretty(value)?)),
        OutputFormat::Yaml => Ok(Some(serde_yaml::to_string(value)?)),
    }
}

pub fn emit<T: Serialize>(value: &T, format: OutputFormat, human: impl FnOnce(&T) -> String) -> Result<()> {
    match render_structured(value, format)? {
        Some(text) => println!("{}", text.trim_end()),
        None => print!("{}", human(value)),
    }
    Ok(())
}
