//! Dynamic record values.

use crate::descriptor::{FieldDescriptor, MessageSchema};
use crate::error::{SchemaViolation, ViolationReason};
use bytes::Bytes;
use std::collections::BTreeMap;
use std::fmt;

/// A single field value.
///
/// 64-bit kinds are carried as native `i64`/`u64`, so boundary values such
/// as `2^63 - 1` round-trip exactly.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int32(i32),
    Uint32(u32),
    Int64(i64),
    Uint64(u64),
    Fixed32(u32),
    Fixed64(u64),
    Bool(bool),
    String(String),
    Bytes(Bytes),
    /// Enum number; numbers outside the declared set are kept as-is.
    Enum(i32),
    Message(Record),
    /// Values of a repeated field.
    List(Vec<Value>),
}

impl Value {
    /// Short type name used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Int32(_) => "int32",
            Value::Uint32(_) => "uint32",
            Value::Int64(_) => "int64",
            Value::Uint64(_) => "uint64",
            Value::Fixed32(_) => "fixed32",
            Value::Fixed64(_) => "fixed64",
            Value::Bool(_) => "bool",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Enum(_) => "enum",
            Value::Message(_) => "message",
            Value::List(_) => "list",
        }
    }

    /// Builds a repeated-field value from anything convertible.
    pub fn list<T: Into<Value>>(items: impl IntoIterator<Item = T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }

    /// Whether this is the zero value of its kind. Records are never default.
    pub fn is_default(&self) -> bool {
        match self {
            Value::Int32(v) => *v == 0,
            Value::Uint32(v) | Value::Fixed32(v) => *v == 0,
            Value::Int64(v) => *v == 0,
            Value::Uint64(v) | Value::Fixed64(v) => *v == 0,
            Value::Bool(v) => !*v,
            Value::String(v) => v.is_empty(),
            Value::Bytes(v) => v.is_empty(),
            Value::Enum(v) => *v == 0,
            Value::Message(_) => false,
            Value::List(items) => items.is_empty(),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Uint32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Uint64(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Bytes> for Value {
    fn from(v: Bytes) -> Self {
        Value::Bytes(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(Bytes::from(v))
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(Bytes::copy_from_slice(v))
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Value::Message(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

/// A record conforming to one [`MessageSchema`].
///
/// Only present fields are stored. Setting a field of a oneof group clears
/// the other members of that group; setting an implicit-presence field to
/// its default value clears it.
#[derive(Clone)]
pub struct Record {
    schema: &'static MessageSchema,
    fields: BTreeMap<u32, Value>,
}

impl Record {
    /// Creates an empty record.
    pub fn new(schema: &'static MessageSchema) -> Self {
        Self {
            schema,
            fields: BTreeMap::new(),
        }
    }

    pub fn schema(&self) -> &'static MessageSchema {
        self.schema
    }

    /// Sets a field by snake_case or lowerCamelCase name.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), SchemaViolation> {
        let field = self.lookup(name)?;
        self.set_field(field, value.into());
        Ok(())
    }

    /// Builder form of [`Record::set`].
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Result<Self, SchemaViolation> {
        self.set(name, value)?;
        Ok(self)
    }

    /// Sets a field through its descriptor.
    ///
    /// `field` must belong to this record's schema.
    pub fn set_field(&mut self, field: &'static FieldDescriptor, value: Value) {
        if let Some(group) = field.oneof {
            let siblings: Vec<u32> = self
                .schema
                .oneof_members(group)
                .filter(|f| f.number != field.number)
                .map(|f| f.number)
                .collect();
            for number in siblings {
                self.fields.remove(&number);
            }
        }

        let normalised_away = if field.is_repeated() {
            matches!(&value, Value::List(items) if items.is_empty())
        } else {
            !field.tracks_presence() && field.kind.accepts(&value) && value.is_default()
        };

        if normalised_away {
            self.fields.remove(&field.number);
        } else {
            self.fields.insert(field.number, value);
        }
    }

    /// Appends one value to a repeated field.
    pub fn push(&mut self, name: &str, value: impl Into<Value>) -> Result<(), SchemaViolation> {
        let field = self.lookup(name)?;
        if !field.is_repeated() {
            return Err(SchemaViolation::new(
                format!("{}.{}", self.schema.name, field.name),
                ViolationReason::KindMismatch {
                    expected: field.kind.name(),
                    found: "list",
                },
            ));
        }
        self.push_field(field, value.into());
        Ok(())
    }

    pub(crate) fn push_field(&mut self, field: &'static FieldDescriptor, value: Value) {
        match self
            .fields
            .entry(field.number)
            .or_insert_with(|| Value::List(Vec::new()))
        {
            Value::List(items) => items.push(value),
            other => *other = Value::List(vec![value]),
        }
    }

    pub(crate) fn get_field(&self, field: &FieldDescriptor) -> Option<&Value> {
        self.fields.get(&field.number)
    }

    /// Checks this record against its schema. See [`crate::verify`].
    pub fn verify(&self) -> Result<(), SchemaViolation> {
        crate::verify::verify(self)
    }

    /// Returns a present field, or `None` if it is unset or unknown.
    pub fn get(&self, name: &str) -> Option<&Value> {
        let field = self.schema.field(name)?;
        self.fields.get(&field.number)
    }

    /// Returns the field value, falling back to the kind's default when unset.
    ///
    /// Unset message fields and unknown names yield `None`; unset repeated
    /// fields yield an empty list.
    pub fn get_or_default(&self, name: &str) -> Option<Value> {
        let field = self.schema.field(name)?;
        if let Some(value) = self.fields.get(&field.number) {
            return Some(value.clone());
        }
        if field.is_repeated() {
            return Some(Value::List(Vec::new()));
        }
        field.kind.default_value()
    }

    /// Whether a field is present.
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Removes a field, returning its previous value.
    pub fn clear(&mut self, name: &str) -> Result<Option<Value>, SchemaViolation> {
        let field = self.lookup(name)?;
        Ok(self.fields.remove(&field.number))
    }

    /// Name of the populated member of a oneof group.
    pub fn which_oneof(&self, group: &str) -> Option<&'static str> {
        self.schema
            .oneof_members(group)
            .find(|f| self.fields.contains_key(&f.number))
            .map(|f| f.name)
    }

    /// Number of present fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Present fields in field-number order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static FieldDescriptor, &Value)> + '_ {
        let schema = self.schema;
        self.fields
            .iter()
            .filter_map(move |(number, value)| schema.field_by_number(*number).map(|f| (f, value)))
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_i32(&self, name: &str) -> Option<i32> {
        match self.get(name)? {
            Value::Int32(v) | Value::Enum(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_u32(&self, name: &str) -> Option<u32> {
        match self.get(name)? {
            Value::Uint32(v) | Value::Fixed32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_u64(&self, name: &str) -> Option<u64> {
        match self.get(name)? {
            Value::Uint64(v) | Value::Fixed64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_bytes(&self, name: &str) -> Option<&Bytes> {
        match self.get(name)? {
            Value::Bytes(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_message(&self, name: &str) -> Option<&Record> {
        match self.get(name)? {
            Value::Message(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_list(&self, name: &str) -> Option<&[Value]> {
        match self.get(name)? {
            Value::List(v) => Some(v),
            _ => None,
        }
    }

    fn lookup(&self, name: &str) -> Result<&'static FieldDescriptor, SchemaViolation> {
        self.schema.field(name).ok_or_else(|| {
            SchemaViolation::new(
                format!("{}.{}", self.schema.name, name),
                ViolationReason::UnknownField,
            )
        })
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.schema.is(other.schema) && self.fields == other.fields
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct(self.schema.name);
        for (field, value) in self.iter() {
            out.field(field.name, value);
        }
        out.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{SAMPLE, STRICT};

    #[test]
    fn test_set_and_get() {
        let mut record = Record::new(&SAMPLE);
        record.set("id", 7u64).unwrap();
        record.set("nickName", "bob").unwrap();

        assert_eq!(record.get_u64("id"), Some(7));
        assert_eq!(record.get_str("nick_name"), Some("bob"));
        assert_eq!(record.len(), 2);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let mut record = Record::new(&SAMPLE);
        let err = record.set("nope", 1u32).unwrap_err();
        assert_eq!(err.path, "Sample.nope");
        assert_eq!(err.reason, ViolationReason::UnknownField);
    }

    #[test]
    fn test_optional_keeps_empty_value() {
        let mut record = Record::new(&SAMPLE);
        record.set("nick_name", "").unwrap();
        assert!(record.has("nick_name"));
        assert_eq!(record.get_str("nick_name"), Some(""));
    }

    #[test]
    fn test_implicit_default_normalised_away() {
        let mut record = Record::new(&SAMPLE);
        record.set("id", 5u64).unwrap();
        record.set("id", 0u64).unwrap();
        assert!(!record.has("id"));
        assert_eq!(record.get_or_default("id"), Some(Value::Uint64(0)));

        record.set("flag", false).unwrap();
        assert!(record.is_empty());
    }

    #[test]
    fn test_mismatched_default_is_kept_for_verification() {
        let mut record = Record::new(&SAMPLE);
        record.set("id", 0u32).unwrap();
        assert_eq!(record.get("id"), Some(&Value::Uint32(0)));
    }

    #[test]
    fn test_oneof_setting_clears_siblings() {
        let mut record = Record::new(&SAMPLE);
        record.set("text", "hello").unwrap();
        assert_eq!(record.which_oneof("choice"), Some("text"));

        record.set("number", 0i32).unwrap();
        assert!(!record.has("text"));
        assert!(record.has("number"));
        assert_eq!(record.which_oneof("choice"), Some("number"));
    }

    #[test]
    fn test_push_repeated() {
        let mut record = Record::new(&SAMPLE);
        record.push("tags", 1u32).unwrap();
        record.push("tags", 2u32).unwrap();
        assert_eq!(
            record.get_list("tags").unwrap(),
            &[Value::Uint32(1), Value::Uint32(2)]
        );

        let err = record.push("id", 1u64).unwrap_err();
        assert!(matches!(err.reason, ViolationReason::KindMismatch { .. }));
    }

    #[test]
    fn test_empty_list_clears_repeated() {
        let mut record = Record::new(&SAMPLE);
        record.set("tags", Value::list([1u32, 2])).unwrap();
        assert!(record.has("tags"));
        record.set("tags", Value::List(vec![])).unwrap();
        assert!(!record.has("tags"));
        assert_eq!(record.get_or_default("tags"), Some(Value::List(vec![])));
    }

    #[test]
    fn test_list_of_bytes() {
        let mut record = Record::new(&SAMPLE);
        record.set("blobs", Value::list([Bytes::from_static(b"ab")])).unwrap();
        assert_eq!(
            record.get_list("blobs").unwrap(),
            &[Value::Bytes(Bytes::from_static(b"ab"))]
        );
        assert_eq!(Value::from(vec![1u8, 2]), Value::Bytes(Bytes::from(vec![1u8, 2])));
    }

    #[test]
    fn test_clear() {
        let mut record = Record::new(&SAMPLE);
        record.set("score", -3i64).unwrap();
        assert_eq!(record.clear("score").unwrap(), Some(Value::Int64(-3)));
        assert_eq!(record.clear("score").unwrap(), None);
        assert!(record.clear("missing").is_err());
    }

    #[test]
    fn test_nested_record() {
        let child = Record::new(&SAMPLE).with("id", 2u64).unwrap();
        let record = Record::new(&SAMPLE).with("child", child.clone()).unwrap();
        assert_eq!(record.get_message("child"), Some(&child));
        // An empty nested record is still present.
        let record = Record::new(&SAMPLE)
            .with("child", Record::new(&SAMPLE))
            .unwrap();
        assert!(record.has("child"));
        assert_eq!(record.get_or_default("child"), Some(Value::Message(Record::new(&SAMPLE))));
        assert_eq!(Record::new(&SAMPLE).get_or_default("child"), None);
    }

    #[test]
    fn test_equality_includes_schema() {
        assert_ne!(Record::new(&SAMPLE), Record::new(&STRICT));
        assert_eq!(Record::new(&SAMPLE), Record::new(&SAMPLE));
    }

    #[test]
    fn test_debug_uses_field_names() {
        let record = Record::new(&SAMPLE).with("id", 9u64).unwrap();
        let debug = format!("{:?}", record);
        assert!(debug.starts_with("Sample"));
        assert!(debug.contains("id"));
    }
}
