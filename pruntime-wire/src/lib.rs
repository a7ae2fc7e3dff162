//! # pruntime-wire
//!
//! Wire codec for pRuntime RPC records.
//!
//! This crate provides:
//! - Wire primitives: base-128 varints, fixed-width integers, length-delimited payloads
//! - Static field/record/enum descriptors that drive encoding and decoding
//! - A generic record codec with presence tracking, oneof groups and packed repeats
//! - Post-decode / pre-encode structural verification
//! - Length-delimited framing for continuous byte streams
//! - Plain-object (JSON) mapping of records

pub mod codec;
pub mod descriptor;
pub mod error;
pub mod frame;
pub mod json;
pub mod value;
pub mod verify;
pub mod wire;

#[cfg(test)]
pub(crate) mod fixtures;

pub use codec::{decode, encode, encode_to, encoded_len};
pub use descriptor::{
    Cardinality, EnumSchema, EnumValue, FieldDescriptor, FieldKind, MessageSchema,
};
pub use error::{CodecError, SchemaViolation, ViolationReason, WireError};
pub use frame::{decode_delimited, encode_delimited, unframe, DelimitedDecoder, DelimitedFrame};
pub use value::{Record, Value};
pub use verify::verify;
pub use wire::{WireReader, WireType};

/// Maximum size of a single message, delimited or not (16 MiB).
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Maximum nesting depth of records before decoding or verification fails.
pub const MAX_RECURSION_DEPTH: usize = 64;
