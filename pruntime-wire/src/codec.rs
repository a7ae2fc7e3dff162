//! Record encoder and decoder.
//!
//! Encoding walks the present fields of a record in field-number order.
//! Repeated scalar fields are written packed; repeated bytes, string and
//! message fields are written as one entry per element. Decoding accepts
//! both packed and unpacked scalars, skips unknown fields, lets the last
//! occurrence of a singular field win and appends repeated values.

use crate::descriptor::{FieldDescriptor, FieldKind, MessageSchema};
use crate::error::{CodecError, SchemaViolation, ViolationReason, WireError};
use crate::value::{Record, Value};
use crate::verify::verify;
use crate::wire::{
    key_len, length_delimited_len, put_fixed32, put_fixed64, put_key, put_length_delimited,
    put_varint, varint_len, WireReader, WireType,
};
use crate::MAX_RECURSION_DEPTH;
use bytes::{BufMut, Bytes, BytesMut};

/// Verifies and encodes a record.
///
/// An empty record encodes to zero bytes.
pub fn encode(record: &Record) -> Result<BytesMut, CodecError> {
    verify(record)?;
    let mut buf = BytesMut::with_capacity(encoded_len(record));
    write_record(&mut buf, record);
    Ok(buf)
}

/// Verifies a record and appends its encoding to `buf`.
pub fn encode_to<B: BufMut>(record: &Record, buf: &mut B) -> Result<(), CodecError> {
    verify(record)?;
    write_record(buf, record);
    Ok(())
}

/// Decodes a record of the given schema.
///
/// Decoding is structural: it fails on malformed bytes and on enum values
/// that do not fit in 32 bits. Required-field and kind checks are left to
/// [`crate::verify`].
pub fn decode(schema: &'static MessageSchema, buf: &[u8]) -> Result<Record, CodecError> {
    decode_from(schema, WireReader::new(buf))
}

/// Decodes the whole of `reader`, keeping its absolute offsets in errors.
pub(crate) fn decode_from(
    schema: &'static MessageSchema,
    mut reader: WireReader<'_>,
) -> Result<Record, CodecError> {
    decode_record(schema, &mut reader, 0).map_err(|e| e.within(schema.name))
}

/// Number of bytes `encode` produces for a verified record.
pub fn encoded_len(record: &Record) -> usize {
    record
        .iter()
        .map(|(field, value)| field_len(field, value))
        .sum()
}

fn field_len(field: &FieldDescriptor, value: &Value) -> usize {
    match value {
        Value::List(items) if field.kind.is_packable() => {
            if items.is_empty() {
                return 0;
            }
            let body: usize = items.iter().map(payload_len).sum();
            key_len(field.number) + length_delimited_len(body)
        }
        Value::List(items) => items
            .iter()
            .map(|item| key_len(field.number) + payload_len(item))
            .sum(),
        single => key_len(field.number) + payload_len(single),
    }
}

fn payload_len(value: &Value) -> usize {
    match value {
        Value::Int32(v) => varint_len(*v as i64 as u64),
        Value::Enum(v) => varint_len(*v as i64 as u64),
        Value::Uint32(v) => varint_len(u64::from(*v)),
        Value::Int64(v) => varint_len(*v as u64),
        Value::Uint64(v) => varint_len(*v),
        Value::Bool(_) => 1,
        Value::Fixed32(_) => 4,
        Value::Fixed64(_) => 8,
        Value::String(v) => length_delimited_len(v.len()),
        Value::Bytes(v) => length_delimited_len(v.len()),
        Value::Message(record) => length_delimited_len(encoded_len(record)),
        // Nested lists never pass verification.
        Value::List(_) => 0,
    }
}

fn value_wire_type(value: &Value) -> WireType {
    match value {
        Value::Fixed32(_) => WireType::Fixed32,
        Value::Fixed64(_) => WireType::Fixed64,
        Value::String(_) | Value::Bytes(_) | Value::Message(_) | Value::List(_) => {
            WireType::LengthDelimited
        }
        _ => WireType::Varint,
    }
}

fn write_record<B: BufMut>(buf: &mut B, record: &Record) {
    for (field, value) in record.iter() {
        write_field(buf, field, value);
    }
}

fn write_field<B: BufMut>(buf: &mut B, field: &FieldDescriptor, value: &Value) {
    match value {
        Value::List(items) if field.kind.is_packable() => {
            if items.is_empty() {
                return;
            }
            let body: usize = items.iter().map(payload_len).sum();
            put_key(buf, field.number, WireType::LengthDelimited);
            put_varint(buf, body as u64);
            for item in items {
                write_payload(buf, item);
            }
        }
        Value::List(items) => {
            for item in items {
                put_key(buf, field.number, value_wire_type(item));
                write_payload(buf, item);
            }
        }
        single => {
            put_key(buf, field.number, value_wire_type(single));
            write_payload(buf, single);
        }
    }
}

fn write_payload<B: BufMut>(buf: &mut B, value: &Value) {
    match value {
        // Negative 32-bit values are sign-extended to ten bytes.
        Value::Int32(v) | Value::Enum(v) => put_varint(buf, *v as i64 as u64),
        Value::Uint32(v) => put_varint(buf, u64::from(*v)),
        Value::Int64(v) => put_varint(buf, *v as u64),
        Value::Uint64(v) => put_varint(buf, *v),
        Value::Bool(v) => put_varint(buf, u64::from(*v)),
        Value::Fixed32(v) => put_fixed32(buf, *v),
        Value::Fixed64(v) => put_fixed64(buf, *v),
        Value::String(v) => put_length_delimited(buf, v.as_bytes()),
        Value::Bytes(v) => put_length_delimited(buf, v),
        Value::Message(record) => {
            put_varint(buf, encoded_len(record) as u64);
            write_record(buf, record);
        }
        Value::List(_) => {}
    }
}

fn decode_record(
    schema: &'static MessageSchema,
    reader: &mut WireReader<'_>,
    depth: usize,
) -> Result<Record, CodecError> {
    if depth > MAX_RECURSION_DEPTH {
        return Err(WireError::RecursionLimit {
            offset: reader.offset(),
            limit: MAX_RECURSION_DEPTH,
        }
        .into());
    }

    let mut record = Record::new(schema);
    while !reader.is_empty() {
        let key_offset = reader.offset();
        let (number, wire_type) = reader.read_key()?;

        let Some(field) = schema.field_by_number(number) else {
            // Unknown to this schema: skip for forward compatibility.
            reader.skip(wire_type)?;
            continue;
        };

        decode_field(&mut record, field, wire_type, key_offset, reader, depth)
            .map_err(|e| e.within(field.name))?;
    }
    Ok(record)
}

fn decode_field(
    record: &mut Record,
    field: &'static FieldDescriptor,
    wire_type: WireType,
    key_offset: usize,
    reader: &mut WireReader<'_>,
    depth: usize,
) -> Result<(), CodecError> {
    let expected = field.kind.wire_type();

    if field.is_repeated() && field.kind.is_packable() && wire_type == WireType::LengthDelimited {
        let mut packed = reader.read_nested()?;
        while !packed.is_empty() {
            let value = read_value(field, &mut packed, depth)?;
            record.push_field(field, value);
        }
        return Ok(());
    }

    if wire_type != expected {
        return Err(WireError::WireTypeMismatch {
            offset: key_offset,
            field: field.name,
            expected,
            actual: wire_type,
        }
        .into());
    }

    let value = read_value(field, reader, depth)?;
    if field.is_repeated() {
        record.push_field(field, value);
    } else {
        record.set_field(field, value);
    }
    Ok(())
}

fn read_value(
    field: &FieldDescriptor,
    reader: &mut WireReader<'_>,
    depth: usize,
) -> Result<Value, CodecError> {
    let value = match field.kind {
        // 32-bit kinds keep the low 32 bits of the varint.
        FieldKind::Int32 => Value::Int32(reader.read_varint()? as i32),
        FieldKind::Uint32 => Value::Uint32(reader.read_varint()? as u32),
        FieldKind::Int64 => Value::Int64(reader.read_varint()? as i64),
        FieldKind::Uint64 => Value::Uint64(reader.read_varint()?),
        FieldKind::Bool => Value::Bool(reader.read_varint()? != 0),
        FieldKind::Fixed32 => Value::Fixed32(reader.read_fixed32()?),
        FieldKind::Fixed64 => Value::Fixed64(reader.read_fixed64()?),
        FieldKind::Enum(_) => {
            let raw = reader.read_varint()? as i64;
            let number = i32::try_from(raw).map_err(|_| {
                SchemaViolation::new(String::new(), ViolationReason::EnumOutOfRange(raw))
            })?;
            Value::Enum(number)
        }
        FieldKind::String => {
            let offset = reader.offset();
            let raw = reader.read_length_delimited()?;
            let text = std::str::from_utf8(raw).map_err(|_| WireError::InvalidUtf8 {
                offset,
                field: field.name,
            })?;
            Value::String(text.to_string())
        }
        FieldKind::Bytes => Value::Bytes(Bytes::copy_from_slice(reader.read_length_delimited()?)),
        FieldKind::Message(schema) => {
            let mut nested = reader.read_nested()?;
            Value::Message(decode_record(schema, &mut nested, depth + 1)?)
        }
    };
    Ok(value)
}
