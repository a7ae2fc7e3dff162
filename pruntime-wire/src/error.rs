//! Codec error types.
//!
//! Two categories are kept apart so callers can react differently:
//! [`WireError`] means the bytes themselves are broken, [`SchemaViolation`]
//! means the bytes parsed but the record does not fit its schema.

use crate::wire::WireType;
use thiserror::Error;

/// Malformed input detected while reading the wire format.
///
/// Every variant except [`WireError::MessageTooLarge`] carries the byte
/// offset (from the start of the outermost buffer) where the problem begins.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    #[error("truncated buffer at offset {offset}: need {needed} more bytes")]
    Truncated { offset: usize, needed: usize },

    #[error("malformed varint at offset {offset}")]
    MalformedVarint { offset: usize },

    #[error("invalid length prefix {length} at offset {offset}: only {remaining} bytes remain")]
    InvalidLength {
        offset: usize,
        length: u64,
        remaining: usize,
    },

    #[error("invalid wire type {wire_type} at offset {offset}")]
    InvalidWireType { offset: usize, wire_type: u8 },

    #[error("invalid field number {number} at offset {offset}")]
    InvalidFieldNumber { offset: usize, number: u64 },

    #[error("field '{field}' expects wire type {expected:?}, got {actual:?} at offset {offset}")]
    WireTypeMismatch {
        offset: usize,
        field: &'static str,
        expected: WireType,
        actual: WireType,
    },

    #[error("invalid UTF-8 in field '{field}' at offset {offset}")]
    InvalidUtf8 { offset: usize, field: &'static str },

    #[error("records nested deeper than {limit} at offset {offset}")]
    RecursionLimit { offset: usize, limit: usize },

    #[error("{count} trailing bytes after delimited message at offset {offset}")]
    TrailingBytes { offset: usize, count: usize },

    #[error("message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: u64, max: usize },
}

impl WireError {
    /// Returns the byte offset of the failure, if the error has one.
    pub fn offset(&self) -> Option<usize> {
        match self {
            WireError::Truncated { offset, .. }
            | WireError::MalformedVarint { offset }
            | WireError::InvalidLength { offset, .. }
            | WireError::InvalidWireType { offset, .. }
            | WireError::InvalidFieldNumber { offset, .. }
            | WireError::WireTypeMismatch { offset, .. }
            | WireError::InvalidUtf8 { offset, .. }
            | WireError::RecursionLimit { offset, .. }
            | WireError::TrailingBytes { offset, .. } => Some(*offset),
            WireError::MessageTooLarge { .. } => None,
        }
    }
}

/// Why a record failed verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViolationReason {
    #[error("required field is missing")]
    MissingRequired,

    #[error("no such field in schema")]
    UnknownField,

    #[error("expected {expected}, found {found}")]
    KindMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("expected record {expected}, found record {found}")]
    SchemaMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("enum value {0} does not fit in a 32-bit integer")]
    EnumOutOfRange(i64),

    #[error("records nested deeper than {0}")]
    TooDeep(usize),

    #[error("invalid value: {0}")]
    InvalidValue(String),
}

/// A structural violation of a record against its schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("schema violation at '{path}': {reason}")]
pub struct SchemaViolation {
    /// Dotted field path, rooted at the record name (e.g. `WorkerState.bench_state.start_time`).
    pub path: String,
    /// What went wrong.
    pub reason: ViolationReason,
}

impl SchemaViolation {
    pub fn new(path: impl Into<String>, reason: ViolationReason) -> Self {
        Self {
            path: path.into(),
            reason,
        }
    }

    /// Prepends a parent segment to the path.
    pub fn within(mut self, parent: &str) -> Self {
        self.path = if self.path.is_empty() {
            parent.to_string()
        } else if self.path.starts_with('[') {
            format!("{}{}", parent, self.path)
        } else {
            format!("{}.{}", parent, self.path)
        };
        self
    }
}

/// Any failure of the record codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("malformed wire data: {0}")]
    Malformed(#[from] WireError),

    #[error(transparent)]
    Schema(#[from] SchemaViolation),
}

impl CodecError {
    /// Prepends a parent segment to the path of a schema violation.
    pub fn within(self, parent: &str) -> Self {
        match self {
            CodecError::Schema(violation) => CodecError::Schema(violation.within(parent)),
            other => other,
        }
    }
}
