//! Wire primitives.
//!
//! Field layout on the wire:
//!
//! ```text
//! +--------------------------------+---------------------------------+
//! | key (varint)                   | payload                         |
//! | (field_number << 3) | wire_type| varint | 8 bytes | len + bytes | 4 bytes
//! +--------------------------------+---------------------------------+
//! ```
//!
//! Varints are little-endian base-128: seven data bits per byte, the high
//! bit set on every byte except the last. Fixed-width values are
//! little-endian.

use crate::error::WireError;
use bytes::BufMut;

/// Longest valid varint encoding (a full 64-bit value).
pub const MAX_VARINT_LEN: usize = 10;

/// Largest field number representable in a key.
pub const MAX_FIELD_NUMBER: u32 = (1 << 29) - 1;

/// Payload framing of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WireType {
    Varint = 0,
    Fixed64 = 1,
    LengthDelimited = 2,
    Fixed32 = 5,
}

impl WireType {
    /// Parses the low three bits of a key. Group wire types (3, 4) are not supported.
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(WireType::Varint),
            1 => Some(WireType::Fixed64),
            2 => Some(WireType::LengthDelimited),
            5 => Some(WireType::Fixed32),
            _ => None,
        }
    }

    pub fn bits(self) -> u8 {
        self as u8
    }
}

/// Appends `value` as a varint.
pub fn put_varint<B: BufMut>(buf: &mut B, mut value: u64) {
    while value >= 0x80 {
        buf.put_u8((value as u8) | 0x80);
        value >>= 7;
    }
    buf.put_u8(value as u8);
}

/// Number of bytes `put_varint` writes for `value`.
pub fn varint_len(value: u64) -> usize {
    let bits = 64 - (value | 1).leading_zeros() as usize;
    (bits + 6) / 7
}

/// Appends a field key.
pub fn put_key<B: BufMut>(buf: &mut B, number: u32, wire_type: WireType) {
    put_varint(buf, key_value(number, wire_type));
}

/// Number of bytes `put_key` writes.
pub fn key_len(number: u32) -> usize {
    varint_len(u64::from(number) << 3)
}

fn key_value(number: u32, wire_type: WireType) -> u64 {
    (u64::from(number) << 3) | u64::from(wire_type.bits())
}

pub fn put_fixed32<B: BufMut>(buf: &mut B, value: u32) {
    buf.put_u32_le(value);
}

pub fn put_fixed64<B: BufMut>(buf: &mut B, value: u64) {
    buf.put_u64_le(value);
}

/// Appends a varint length followed by `data`.
pub fn put_length_delimited<B: BufMut>(buf: &mut B, data: &[u8]) {
    put_varint(buf, data.len() as u64);
    buf.put_slice(data);
}

/// Bytes taken by a length-delimited payload of `len` bytes, prefix included.
pub fn length_delimited_len(len: usize) -> usize {
    varint_len(len as u64) + len
}

/// Cursor over an encoded buffer.
///
/// Offsets reported in errors are absolute: a reader created for a nested
/// payload keeps the position of that payload inside the outer buffer.
#[derive(Debug, Clone)]
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self::with_base(buf, 0)
    }

    /// Creates a reader whose first byte sits at `base` in the outer buffer.
    pub fn with_base(buf: &'a [u8], base: usize) -> Self {
        Self { buf, pos: 0, base }
    }

    /// Absolute offset of the next unread byte.
    pub fn offset(&self) -> usize {
        self.base + self.pos
    }

    /// Number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Reads a varint, consuming exactly its encoded bytes.
    pub fn read_varint(&mut self) -> Result<u64, WireError> {
        let start = self.offset();
        let mut value: u64 = 0;

        for i in 0..MAX_VARINT_LEN {
            let Some(&byte) = self.buf.get(self.pos + i) else {
                return Err(WireError::Truncated {
                    offset: start,
                    needed: 1,
                });
            };

            // The tenth byte may only carry the top bit of a u64.
            if i == MAX_VARINT_LEN - 1 && byte > 0x01 {
                return Err(WireError::MalformedVarint { offset: start });
            }

            value |= u64::from(byte & 0x7f) << (7 * i);
            if byte & 0x80 == 0 {
                self.pos += i + 1;
                return Ok(value);
            }
        }

        Err(WireError::MalformedVarint { offset: start })
    }

    pub fn read_fixed32(&mut self) -> Result<u32, WireError> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(raw))
    }

    pub fn read_fixed64(&mut self) -> Result<u64, WireError> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(raw))
    }

    /// Reads a length prefix and returns exactly that many bytes.
    pub fn read_length_delimited(&mut self) -> Result<&'a [u8], WireError> {
        self.read_nested().map(|nested| nested.buf)
    }

    /// Reads a length-delimited payload as a reader positioned inside this buffer.
    pub fn read_nested(&mut self) -> Result<WireReader<'a>, WireError> {
        let offset = self.offset();
        let length = self.read_varint()?;
        let remaining = self.remaining();
        if length > remaining as u64 {
            return Err(WireError::InvalidLength {
                offset,
                length,
                remaining,
            });
        }
        let base = self.offset();
        let payload = self.take(length as usize)?;
        Ok(WireReader::with_base(payload, base))
    }

    /// Reads a field key, returning the field number and wire type.
    pub fn read_key(&mut self) -> Result<(u32, WireType), WireError> {
        let offset = self.offset();
        let key = self.read_varint()?;

        let bits = (key & 0x7) as u8;
        let wire_type =
            WireType::from_bits(bits).ok_or(WireError::InvalidWireType {
                offset,
                wire_type: bits,
            })?;

        let number = key >> 3;
        if number == 0 || number > u64::from(MAX_FIELD_NUMBER) {
            return Err(WireError::InvalidFieldNumber { offset, number });
        }

        Ok((number as u32, wire_type))
    }

    /// Skips one payload of the given wire type.
    pub fn skip(&mut self, wire_type: WireType) -> Result<(), WireError> {
        match wire_type {
            WireType::Varint => self.read_varint().map(drop),
            WireType::Fixed64 => self.take(8).map(drop),
            WireType::LengthDelimited => self.read_nested().map(drop),
            WireType::Fixed32 => self.take(4).map(drop),
        }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], WireError> {
        let remaining = self.remaining();
        if remaining < len {
            return Err(WireError::Truncated {
                offset: self.offset(),
                needed: len - remaining,
            });
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }
}
