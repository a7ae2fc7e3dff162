//! Plain-object (JSON) form of records.
//!
//! Mapping rules:
//! - keys are lowerCamelCase field names; snake_case is accepted on input
//! - only present fields are emitted
//! - 64-bit integers are emitted as decimal strings so no precision is lost;
//!   strings and numbers are both accepted on input
//! - bytes are emitted as lowercase hex; input may carry a `0x` prefix or be
//!   an array of byte values
//! - enums are emitted by name, or by number when the number is undeclared
//! - `null` input leaves a field unset

use crate::descriptor::{FieldDescriptor, FieldKind, MessageSchema};
use crate::error::{SchemaViolation, ViolationReason};
use crate::value::{Record, Value};
use crate::MAX_RECURSION_DEPTH;
use bytes::Bytes;
use serde_json::{Map, Value as JsonValue};

/// Converts a record into its plain-object form.
pub fn to_json(record: &Record) -> JsonValue {
    let mut object = Map::new();
    for (field, value) in record.iter() {
        object.insert(field.json_name(), value_to_json(&field.kind, value));
    }
    JsonValue::Object(object)
}

fn value_to_json(kind: &FieldKind, value: &Value) -> JsonValue {
    match value {
        Value::Int32(v) => JsonValue::from(*v),
        Value::Uint32(v) | Value::Fixed32(v) => JsonValue::from(*v),
        Value::Int64(v) => JsonValue::String(v.to_string()),
        Value::Uint64(v) | Value::Fixed64(v) => JsonValue::String(v.to_string()),
        Value::Bool(v) => JsonValue::Bool(*v),
        Value::String(v) => JsonValue::String(v.clone()),
        Value::Bytes(v) => JsonValue::String(hex::encode(v)),
        Value::Enum(number) => match kind {
            FieldKind::Enum(schema) => match schema.name_of(*number) {
                Some(name) => JsonValue::String(name.to_string()),
                None => JsonValue::from(*number),
            },
            _ => JsonValue::from(*number),
        },
        Value::Message(record) => to_json(record),
        Value::List(items) => {
            JsonValue::Array(items.iter().map(|item| value_to_json(kind, item)).collect())
        }
    }
}

/// Builds a record of `schema` from its plain-object form.
///
/// Unknown keys and values that do not fit the field kind are rejected.
pub fn from_json(
    schema: &'static MessageSchema,
    json: &JsonValue,
) -> Result<Record, SchemaViolation> {
    record_from_json(schema, json, 0).map_err(|e| e.within(schema.name))
}

fn record_from_json(
    schema: &'static MessageSchema,
    json: &JsonValue,
    depth: usize,
) -> Result<Record, SchemaViolation> {
    if depth > MAX_RECURSION_DEPTH {
        return Err(SchemaViolation::new(
            String::new(),
            ViolationReason::TooDeep(MAX_RECURSION_DEPTH),
        ));
    }
    let JsonValue::Object(object) = json else {
        return Err(mismatch("object", json));
    };

    let mut record = Record::new(schema);
    for (key, value) in object {
        let field = schema
            .field(key)
            .ok_or_else(|| SchemaViolation::new(key.clone(), ViolationReason::UnknownField))?;
        if value.is_null() {
            continue;
        }
        let parsed = field_from_json(field, value, depth).map_err(|e| e.within(field.name))?;
        record.set_field(field, parsed);
    }
    Ok(record)
}

fn field_from_json(
    field: &FieldDescriptor,
    json: &JsonValue,
    depth: usize,
) -> Result<Value, SchemaViolation> {
    if !field.is_repeated() {
        return value_from_json(&field.kind, json, depth);
    }
    let JsonValue::Array(items) = json else {
        return Err(mismatch("array", json));
    };
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            value_from_json(&field.kind, item, depth).map_err(|e| e.within(&format!("[{i}]")))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Value::List)
}

fn value_from_json(
    kind: &FieldKind,
    json: &JsonValue,
    depth: usize,
) -> Result<Value, SchemaViolation> {
    let value = match kind {
        FieldKind::Int32 => Value::Int32(integer(kind, json)?),
        FieldKind::Uint32 => Value::Uint32(integer(kind, json)?),
        FieldKind::Int64 => Value::Int64(integer(kind, json)?),
        FieldKind::Uint64 => Value::Uint64(integer(kind, json)?),
        FieldKind::Fixed32 => Value::Fixed32(integer(kind, json)?),
        FieldKind::Fixed64 => Value::Fixed64(integer(kind, json)?),
        FieldKind::Bool => match json {
            JsonValue::Bool(v) => Value::Bool(*v),
            other => return Err(mismatch("bool", other)),
        },
        FieldKind::String => match json {
            JsonValue::String(v) => Value::String(v.clone()),
            other => return Err(mismatch("string", other)),
        },
        FieldKind::Bytes => Value::Bytes(bytes_from_json(json)?),
        FieldKind::Enum(schema) => match json {
            JsonValue::String(name) => match schema.number_of(name) {
                Some(number) => Value::Enum(number),
                None => {
                    return Err(invalid(format!(
                        "'{}' is not a value of {}",
                        name, schema.name
                    )))
                }
            },
            other => Value::Enum(integer(kind, other)?),
        },
        FieldKind::Message(schema) => Value::Message(record_from_json(schema, json, depth + 1)?),
    };
    Ok(value)
}

/// Reads an integer from a JSON number or decimal string and narrows it.
fn integer<T: TryFrom<i128>>(kind: &FieldKind, json: &JsonValue) -> Result<T, SchemaViolation> {
    let wide: i128 = match json {
        JsonValue::Number(n) => {
            if let Some(v) = n.as_i64() {
                i128::from(v)
            } else if let Some(v) = n.as_u64() {
                i128::from(v)
            } else {
                return Err(invalid(format!("{} is not an integer", n)));
            }
        }
        JsonValue::String(s) => s
            .trim()
            .parse::<i128>()
            .map_err(|_| invalid(format!("'{}' is not an integer", s)))?,
        other => return Err(mismatch(kind.name(), other)),
    };
    T::try_from(wide).map_err(|_| invalid(format!("{} out of range for {}", wide, kind.name())))
}

fn bytes_from_json(json: &JsonValue) -> Result<Bytes, SchemaViolation> {
    match json {
        JsonValue::String(s) => {
            let digits = s
                .strip_prefix("0x")
                .or_else(|| s.strip_prefix("0X"))
                .unwrap_or(s);
            hex::decode(digits)
                .map(Bytes::from)
                .map_err(|e| invalid(format!("bad hex: {}", e)))
        }
        JsonValue::Array(items) => items
            .iter()
            .map(|item| {
                item.as_u64()
                    .and_then(|b| u8::try_from(b).ok())
                    .ok_or_else(|| invalid(format!("{} is not a byte", item)))
            })
            .collect::<Result<Vec<u8>, _>>()
            .map(Bytes::from),
        other => Err(mismatch("bytes", other)),
    }
}

fn json_kind(json: &JsonValue) -> &'static str {
    match json {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

fn mismatch(expected: &'static str, found: &JsonValue) -> SchemaViolation {
    SchemaViolation::new(
        String::new(),
        ViolationReason::KindMismatch {
            expected,
            found: json_kind(found),
        },
    )
}

fn invalid(message: String) -> SchemaViolation {
    SchemaViolation::new(String::new(), ViolationReason::InvalidValue(message))
}
