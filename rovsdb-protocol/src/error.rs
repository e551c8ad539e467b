//! Protocol error types.

use thiserror::Error;

/// Errors raised while encoding or decoding wire data.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid atom: {0}")]
    InvalidAtom(String),

    #[error("invalid UUID: {0:?}")]
    InvalidUuid(String),

    #[error("invalid set: {0}")]
    InvalidSet(String),

    #[error("invalid map: {0}")]
    InvalidMap(String),

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("invalid operation result: {0}")]
    InvalidResult(String),

    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error("message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },
}
