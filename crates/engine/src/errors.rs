use thiserror::Error;

use diag_store::DiagError;
use interrupt_signatures::SignatureError;

use crate::activation::Activation;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid engine config: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Diagnostics(#[from] DiagError),
    #[error("signature tables rejected: {0}")]
    Signature(#[from] SignatureError),
    #[error("guard inactive in this context: {0}")]
    Inactive(Activation),
    #[error("scheduler task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
