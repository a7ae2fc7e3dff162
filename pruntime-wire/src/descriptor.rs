//! Static schema descriptors.
//!
//! Schemas are plain `static` items that reference each other by
//! `&'static` pointers, so a whole service's tables are built at compile
//! time and shared read-only by every call. Mutually recursive records
//! (a record that contains itself through another) are allowed.

use crate::value::Value;
use crate::wire::{WireType, MAX_FIELD_NUMBER};
use std::collections::HashSet;
use std::fmt;

/// How many times a field may occur and whether absence is observable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// Implicit presence: a zero/default value is indistinguishable from unset.
    Singular,
    /// Explicit presence: set-to-default and unset are different states.
    Optional,
    /// Must be present for the record to verify.
    Required,
    /// Zero or more values, kept in wire order.
    Repeated,
}

/// Value type of a field.
#[derive(Clone, Copy)]
pub enum FieldKind {
    Int32,
    Uint32,
    Int64,
    Uint64,
    Fixed32,
    Fixed64,
    Bool,
    String,
    Bytes,
    Enum(&'static EnumSchema),
    Message(&'static MessageSchema),
}

impl FieldKind {
    /// Wire type of a single (unpacked) value of this kind.
    pub fn wire_type(&self) -> WireType {
        match self {
            FieldKind::Int32
            | FieldKind::Uint32
            | FieldKind::Int64
            | FieldKind::Uint64
            | FieldKind::Bool
            | FieldKind::Enum(_) => WireType::Varint,
            FieldKind::Fixed64 => WireType::Fixed64,
            FieldKind::Fixed32 => WireType::Fixed32,
            FieldKind::String | FieldKind::Bytes | FieldKind::Message(_) => {
                WireType::LengthDelimited
            }
        }
    }

    /// Whether repeated values of this kind are written as one packed block.
    pub fn is_packable(&self) -> bool {
        self.wire_type() != WireType::LengthDelimited
    }

    /// Short type name used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Int32 => "int32",
            FieldKind::Uint32 => "uint32",
            FieldKind::Int64 => "int64",
            FieldKind::Uint64 => "uint64",
            FieldKind::Fixed32 => "fixed32",
            FieldKind::Fixed64 => "fixed64",
            FieldKind::Bool => "bool",
            FieldKind::String => "string",
            FieldKind::Bytes => "bytes",
            FieldKind::Enum(_) => "enum",
            FieldKind::Message(_) => "message",
        }
    }

    /// Whether `value` has the variant this kind stores.
    ///
    /// Nested record schemas are not compared here; see [`crate::verify`].
    pub fn accepts(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (FieldKind::Int32, Value::Int32(_))
                | (FieldKind::Uint32, Value::Uint32(_))
                | (FieldKind::Int64, Value::Int64(_))
                | (FieldKind::Uint64, Value::Uint64(_))
                | (FieldKind::Fixed32, Value::Fixed32(_))
                | (FieldKind::Fixed64, Value::Fixed64(_))
                | (FieldKind::Bool, Value::Bool(_))
                | (FieldKind::String, Value::String(_))
                | (FieldKind::Bytes, Value::Bytes(_))
                | (FieldKind::Enum(_), Value::Enum(_))
                | (FieldKind::Message(_), Value::Message(_))
        )
    }

    /// Default value of a scalar kind. Message kinds have no default.
    pub fn default_value(&self) -> Option<Value> {
        Some(match self {
            FieldKind::Int32 => Value::Int32(0),
            FieldKind::Uint32 => Value::Uint32(0),
            FieldKind::Int64 => Value::Int64(0),
            FieldKind::Uint64 => Value::Uint64(0),
            FieldKind::Fixed32 => Value::Fixed32(0),
            FieldKind::Fixed64 => Value::Fixed64(0),
            FieldKind::Bool => Value::Bool(false),
            FieldKind::String => Value::String(String::new()),
            FieldKind::Bytes => Value::Bytes(bytes::Bytes::new()),
            FieldKind::Enum(_) => Value::Enum(0),
            FieldKind::Message(_) => return None,
        })
    }
}

// Referenced schemas are printed by name: recursive records would never terminate.
impl fmt::Debug for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Enum(schema) => write!(f, "Enum({})", schema.name),
            FieldKind::Message(schema) => write!(f, "Message({})", schema.name),
            other => f.write_str(other.name()),
        }
    }
}

impl PartialEq for FieldKind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FieldKind::Enum(a), FieldKind::Enum(b)) => std::ptr::eq(*a, *b),
            (FieldKind::Message(a), FieldKind::Message(b)) => a.is(b),
            (a, b) => std::mem::discriminant(a) == std::mem::discriminant(b),
        }
    }
}

impl Eq for FieldKind {}

/// One field of a record schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Field number written into the key; unique within the schema.
    pub number: u32,
    /// Field name in snake_case.
    pub name: &'static str,
    pub kind: FieldKind,
    pub cardinality: Cardinality,
    /// Oneof group this field belongs to, if any.
    pub oneof: Option<&'static str>,
}

impl FieldDescriptor {
    /// A singular field with implicit presence.
    pub const fn new(number: u32, name: &'static str, kind: FieldKind) -> Self {
        Self {
            number,
            name,
            kind,
            cardinality: Cardinality::Singular,
            oneof: None,
        }
    }

    pub const fn optional(self) -> Self {
        Self {
            cardinality: Cardinality::Optional,
            ..self
        }
    }

    pub const fn required(self) -> Self {
        Self {
            cardinality: Cardinality::Required,
            ..self
        }
    }

    pub const fn repeated(self) -> Self {
        Self {
            cardinality: Cardinality::Repeated,
            ..self
        }
    }

    /// Places the field in a oneof group. Oneof members always track presence.
    pub const fn in_oneof(self, group: &'static str) -> Self {
        Self {
            oneof: Some(group),
            ..self
        }
    }

    pub fn is_repeated(&self) -> bool {
        self.cardinality == Cardinality::Repeated
    }

    /// Whether an explicitly set default value survives encoding.
    pub fn tracks_presence(&self) -> bool {
        match self.cardinality {
            Cardinality::Optional | Cardinality::Required => true,
            Cardinality::Repeated => false,
            Cardinality::Singular => {
                self.oneof.is_some() || matches!(self.kind, FieldKind::Message(_))
            }
        }
    }

    /// lowerCamelCase name used in plain-object (JSON) form.
    pub fn json_name(&self) -> String {
        json_name(self.name)
    }
}

/// Converts a snake_case field name into lowerCamelCase.
pub fn json_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Schema of a record type.
pub struct MessageSchema {
    pub name: &'static str,
    /// Fields in declaration order.
    pub fields: &'static [FieldDescriptor],
}

impl MessageSchema {
    /// Looks a field up by snake_case or lowerCamelCase name.
    pub fn field(&self, name: &str) -> Option<&'static FieldDescriptor> {
        let fields: &'static [FieldDescriptor] = self.fields;
        fields
            .iter()
            .find(|f| f.name == name)
            .or_else(|| fields.iter().find(|f| f.json_name() == name))
    }

    pub fn field_by_number(&self, number: u32) -> Option<&'static FieldDescriptor> {
        let fields: &'static [FieldDescriptor] = self.fields;
        fields.iter().find(|f| f.number == number)
    }

    /// Fields belonging to a oneof group.
    pub fn oneof_members<'a>(
        &'a self,
        group: &'a str,
    ) -> impl Iterator<Item = &'static FieldDescriptor> + 'a {
        let fields: &'static [FieldDescriptor] = self.fields;
        fields.iter().filter(move |f| f.oneof == Some(group))
    }

    /// Identity comparison. Schemas are statics, so the address identifies them.
    pub fn is(&self, other: &MessageSchema) -> bool {
        std::ptr::eq(self, other)
    }

    /// Checks the table itself: field numbers in range and unique, names
    /// unique, oneof members singular.
    pub fn validate(&self) -> Result<(), String> {
        let mut numbers = HashSet::new();
        let mut names = HashSet::new();
        for field in self.fields {
            if field.number == 0 || field.number > MAX_FIELD_NUMBER {
                return Err(format!(
                    "{}.{}: field number {} out of range",
                    self.name, field.name, field.number
                ));
            }
            if !numbers.insert(field.number) {
                return Err(format!(
                    "{}.{}: duplicate field number {}",
                    self.name, field.name, field.number
                ));
            }
            if !names.insert(field.name) {
                return Err(format!("{}: duplicate field name {}", self.name, field.name));
            }
            if field.oneof.is_some() && field.is_repeated() {
                return Err(format!(
                    "{}.{}: repeated field in oneof group",
                    self.name, field.name
                ));
            }
        }
        Ok(())
    }
}

impl PartialEq for MessageSchema {
    fn eq(&self, other: &Self) -> bool {
        self.is(other)
    }
}

impl Eq for MessageSchema {}

impl fmt::Debug for MessageSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageSchema")
            .field("name", &self.name)
            .field("fields", &self.fields.len())
            .finish()
    }
}

/// A named enum constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumValue {
    pub name: &'static str,
    pub number: i32,
}

impl EnumValue {
    pub const fn new(name: &'static str, number: i32) -> Self {
        Self { name, number }
    }
}

/// Schema of an enumeration. Number 0 is the default when the field is absent.
#[derive(Debug)]
pub struct EnumSchema {
    pub name: &'static str,
    pub values: &'static [EnumValue],
}

impl EnumSchema {
    pub fn name_of(&self, number: i32) -> Option<&'static str> {
        let values: &'static [EnumValue] = self.values;
        values.iter().find(|v| v.number == number).map(|v| v.name)
    }

    pub fn number_of(&self, name: &str) -> Option<i32> {
        self.values.iter().find(|v| v.name == name).map(|v| v.number)
    }

    /// Whether `number` is one of the declared constants.
    pub fn is_declared(&self, number: i32) -> bool {
        self.name_of(number).is_some()
    }
}
