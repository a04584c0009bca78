//! Error types for configuration loading and scenario replay.

use std::path::PathBuf;

use thiserror::Error;

use interrupt_signatures::SignatureError;
use playguard_engine::EngineError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: json error: {json}; yaml error: {yaml}")]
    Parse {
        path: PathBuf,
        json: String,
        yaml: String,
    },
    #[error("invalid value `{value}` for {key}")]
    InvalidOverride { key: &'static str, value: String },
    #[error("signature bundle: {0}")]
    Signature(#[from] SignatureError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to parse scenario: {0}")]
    Parse(String),
    #[error("invalid page href `{href}`: {source}")]
    InvalidHref {
        href: String,
        #[source]
        source: url::ParseError,
    },
    #[error("overlay `{0}` is not part of the scenario")]
    UnknownOverlay(String),
    #[error("duplicate overlay id `{0}`")]
    DuplicateOverlay(String),
    #[error("step {index} requires a media element")]
    NoMedia { index: usize },
    #[error("step {index} requires a player with entry points")]
    NoPlayer { index: usize },
    #[error(transparent)]
    Engine(#[from] EngineError),
}
