//! Structural verification of records against their schemas.

use crate::descriptor::{Cardinality, FieldKind};
use crate::error::{SchemaViolation, ViolationReason};
use crate::value::{Record, Value};
use crate::MAX_RECURSION_DEPTH;

/// Checks that a record is structurally valid for its schema.
///
/// Required fields must be present, every value must match its field's
/// kind, repeated fields must hold a flat list and nested records must use
/// the declared schema. Enum numbers outside the declared set are accepted.
///
/// The violation path is rooted at the record name, e.g.
/// `WorkerState.bench_state.start_time` or `ParaHeadersToSync.proof[2]`.
pub fn verify(record: &Record) -> Result<(), SchemaViolation> {
    verify_record(record, 0).map_err(|e| e.within(record.schema().name))
}

fn verify_record(record: &Record, depth: usize) -> Result<(), SchemaViolation> {
    if depth > MAX_RECURSION_DEPTH {
        return Err(SchemaViolation::new(
            String::new(),
            ViolationReason::TooDeep(MAX_RECURSION_DEPTH),
        ));
    }

    for field in record.schema().fields {
        let Some(value) = record.get_field(field) else {
            if field.cardinality == Cardinality::Required {
                return Err(SchemaViolation::new(
                    field.name,
                    ViolationReason::MissingRequired,
                ));
            }
            continue;
        };

        let result = match (field.is_repeated(), value) {
            (true, Value::List(items)) => items.iter().enumerate().try_for_each(|(i, item)| {
                verify_value(&field.kind, item, depth).map_err(|e| e.within(&format!("[{i}]")))
            }),
            (true, other) => Err(mismatch("list", other)),
            (false, Value::List(_)) => Err(mismatch(field.kind.name(), value)),
            (false, single) => verify_value(&field.kind, single, depth),
        };
        result.map_err(|e| e.within(field.name))?;
    }
    Ok(())
}

fn verify_value(kind: &FieldKind, value: &Value, depth: usize) -> Result<(), SchemaViolation> {
    if !kind.accepts(value) {
        return Err(mismatch(kind.name(), value));
    }
    if let (FieldKind::Message(expected), Value::Message(nested)) = (kind, value) {
        if !nested.schema().is(expected) {
            return Err(SchemaViolation::new(
                String::new(),
                ViolationReason::SchemaMismatch {
                    expected: expected.name,
                    found: nested.schema().name,
                },
            ));
        }
        verify_record(nested, depth + 1)?;
    }
    Ok(())
}

fn mismatch(expected: &'static str, found: &Value) -> SchemaViolation {
    SchemaViolation::new(
        String::new(),
        ViolationReason::KindMismatch {
            expected,
            found: found.kind_name(),
        },
    )
}
