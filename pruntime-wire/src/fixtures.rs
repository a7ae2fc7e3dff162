//! Schemas shared by the unit tests of this crate.

use crate::descriptor::{EnumSchema, EnumValue, FieldDescriptor, FieldKind, MessageSchema};

pub static COLOR: EnumSchema = EnumSchema {
    name: "Color",
    values: &[
        EnumValue::new("Red", 0),
        EnumValue::new("Green", 1),
        EnumValue::new("Blue", 2),
    ],
};

static SAMPLE_FIELDS: [FieldDescriptor; 14] = [
    FieldDescriptor::new(1, "id", FieldKind::Uint64),
    FieldDescriptor::new(2, "nick_name", FieldKind::String).optional(),
    FieldDescriptor::new(3, "tags", FieldKind::Uint32).repeated(),
    FieldDescriptor::new(4, "blobs", FieldKind::Bytes).repeated(),
    FieldDescriptor::new(5, "child", FieldKind::Message(&SAMPLE)),
    FieldDescriptor::new(6, "color", FieldKind::Enum(&COLOR)),
    FieldDescriptor::new(7, "text", FieldKind::String).in_oneof("choice"),
    FieldDescriptor::new(8, "number", FieldKind::Int32).in_oneof("choice"),
    FieldDescriptor::new(9, "score", FieldKind::Int64),
    FieldDescriptor::new(10, "flag", FieldKind::Bool),
    FieldDescriptor::new(11, "checksum", FieldKind::Fixed32),
    FieldDescriptor::new(12, "stamp", FieldKind::Fixed64),
    FieldDescriptor::new(13, "children", FieldKind::Message(&SAMPLE)).repeated(),
    FieldDescriptor::new(14, "colors", FieldKind::Enum(&COLOR)).repeated(),
];

/// Covers every kind and cardinality; recursive through `child`.
pub static SAMPLE: MessageSchema = MessageSchema {
    name: "Sample",
    fields: &SAMPLE_FIELDS,
};

static STRICT_FIELDS: [FieldDescriptor; 2] = [
    FieldDescriptor::new(1, "key", FieldKind::String).required(),
    FieldDescriptor::new(2, "sample", FieldKind::Message(&SAMPLE)),
];

/// Has a required field.
pub static STRICT: MessageSchema = MessageSchema {
    name: "Strict",
    fields: &STRICT_FIELDS,
};

/// No fields at all.
pub static EMPTY: MessageSchema = MessageSchema {
    name: "Empty",
    fields: &[],
};
