use thiserror::Error;

/// Failures raised by host objects.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum HostError {
    #[error("entry point missing: {0}")]
    EntryPointMissing(&'static str),
    #[error("node detached")]
    Detached,
    #[error("cross-origin access denied")]
    CrossOrigin,
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("operation rejected: {0}")]
    Rejected(String),
    #[error("unsupported: {0}")]
    Unsupported(&'static str),
    #[error("internal error: {0}")]
    Internal(String),
}

impl HostError {
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::EntryPointMissing(_) | Self::Unsupported(_))
    }
}
