use thiserror::Error;

use page_host::HostError;

#[derive(Clone, Debug, Error)]
pub enum DiagError {
    #[error("storage unavailable")]
    NoStorage,
    #[error("storage write failed: {0}")]
    Storage(#[from] HostError),
    #[error("invalid diagnostics config: {0}")]
    InvalidConfig(String),
    #[error("serialization failed: {0}")]
    Serialize(String),
}

impl From<serde_json::Error> for DiagError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialize(err.to_string())
    }
}
