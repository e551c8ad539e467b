//! Client error types.

use rovsdb_protocol::ProtocolError;
use thiserror::Error;

/// Errors surfaced by the session layer.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("session is shut down")]
    NotActive,

    #[error("connection closed")]
    ConnectionClosed,

    #[error("request timed out")]
    Timeout,

    #[error("duplicate request id: {0:?}")]
    DuplicateId(String),

    #[error("handler already registered for method {0:?}")]
    HandlerExists(String),

    #[error("server error: {0}")]
    Remote(String),

    #[error("unexpected result shape: {0}")]
    ResultMismatch(String),

    #[error("TLS configuration error: {0}")]
    TlsConfig(String),

    #[error("TLS handshake failed: {0}")]
    TlsHandshake(String),
}

impl ClientError {
    /// Whether the error means the session itself is gone, as opposed to
    /// one call failing.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ClientError::Io(_) | ClientError::ConnectionClosed | ClientError::NotActive
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(ClientError::ConnectionClosed.is_fatal());
        assert!(ClientError::NotActive.is_fatal());
        assert!(
            ClientError::Io(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "x"))
                .is_fatal()
        );

        assert!(!ClientError::Timeout.is_fatal());
        assert!(!ClientError::Remote("busy".to_string()).is_fatal());
        assert!(!ClientError::ResultMismatch("not an array".to_string()).is_fatal());
        assert!(!ClientError::DuplicateId("7".to_string()).is_fatal());
    }

    #[test]
    fn test_error_display() {
        let err = ClientError::Remote("unknown database".to_string());
        assert!(err.to_string().contains("unknown database"));

        let err = ClientError::HandlerExists("echo".to_string());
        assert!(err.to_string().contains("echo"));
    }
}
