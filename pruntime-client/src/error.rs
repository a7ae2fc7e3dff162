//! Client error types.

use pruntime_wire::{CodecError, SchemaViolation, WireError};
use std::time::Duration;
use thiserror::Error;

/// Failure reported by a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connect timeout after {0:?}")]
    ConnectTimeout(Duration),

    #[error("request timeout after {0:?}")]
    Timeout(Duration),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("remote error {code}: {message}")]
    Status { code: u16, message: String },

    #[error("framing error: {0}")]
    Frame(#[from] WireError),
}

impl TransportError {
    /// Returns whether a fresh attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransportError::Io(_)
                | TransportError::ConnectTimeout(_)
                | TransportError::Timeout(_)
                | TransportError::ConnectionClosed
        )
    }
}

/// RPC call errors.
///
/// Each category reaches the caller unchanged; the dispatcher never retries
/// or substitutes defaults.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("malformed wire data: {0}")]
    MalformedWire(#[from] WireError),

    #[error(transparent)]
    SchemaViolation(#[from] SchemaViolation),

    #[error("unknown method: {0}")]
    UnknownMethod(String),
}

impl RpcError {
    /// Returns whether this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            RpcError::Transport(e) => e.is_retryable(),
            _ => false,
        }
    }
}

impl From<CodecError> for RpcError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Malformed(e) => RpcError::MalformedWire(e),
            CodecError::Schema(v) => RpcError::SchemaViolation(v),
        }
    }
}
