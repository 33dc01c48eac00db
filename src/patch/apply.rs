//! Server-side application of a patch to one stored entity.

use super::operation::{FieldPath, PatchOp, PatchOperation};
use crate::core::{DeskError, Entity, EntitySchema, Result, Value};

/// Applies `ops` in order to a copy of `entity`.
///
/// Either every operation succeeds and the patched copy is returned, or
/// the first failure is returned and `entity` is left as it was.
pub fn apply_patch(schema: &EntitySchema, entity: &Entity, ops: &[PatchOperation]) -> Result<Entity> {
    let mut working = entity.clone();
    for (index, op) in ops.iter().enumerate() {
        apply_operation(schema, &mut working, op).map_err(|err| match err {
            DeskError::Validation(message) => {
                DeskError::Validation(format!("Operation {} ({} {}): {}", index, op.op, op.path, message))
            }
            other => other,
        })?;
    }
    Ok(working)
}

fn apply_operation(schema: &EntitySchema, entity: &mut Entity, op: &PatchOperation) -> Result<()> {
    let path = FieldPath::parse(&op.path)?;
    let field = schema.require_field(path.field())?;

    let next = match op.op {
        PatchOp::Replace | PatchOp::Add => field.coerce(&op.value)?,
        PatchOp::Remove => {
            if !field.nullable {
                return Err(DeskError::validation(format!(
                    "Field '{}' is required and cannot be removed",
                    field.name
                )));
            }
            Value::Null
        }
        PatchOp::Copy => {
            let from = op
                .from
                .as_deref()
                .ok_or_else(|| DeskError::validation("copy requires a 'from' path"))?;
            let source = FieldPath::parse(from)?;
            schema.require_field(source.field())?;
            let value = entity.get(source.field()).cloned().unwrap_or_default();
            field.coerce(&value)?
        }
    };

    entity.fields.insert(field.name.clone(), next);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DataType, Field, Fields};
    use chrono::NaiveDate;

    fn schema() -> EntitySchema {
        EntitySchema::new(
            "course_phase",
            vec![
                Field::new("name", DataType::Text).not_null(),
                Field::new("position", DataType::Integer),
                Field::new("start", DataType::Date),
                Field::new("end", DataType::Date),
            ],
        )
    }

    fn entity() -> Entity {
        Entity::new("p1", Fields::new())
            .with("name", "Intro")
            .with("position", 1i64)
            .with("start", Value::Null)
            .with("end", Value::Null)
    }

    #[test]
    fn replace_coerces_to_field_type() {
        let ops = vec![
            PatchOperation::replace("position", "3"),
            PatchOperation::replace("start", "2025-04-01"),
        ];
        let patched = apply_patch(&schema(), &entity(), &ops).unwrap();
        assert_eq!(patched.get("position"), Some(&Value::Integer(3)));
        assert_eq!(
            patched.get("start"),
            Some(&Value::Date(NaiveDate::from_ymd_opt(2025, 4, 1).unwrap()))
        );
    }

    #[test]
    fn later_operation_on_same_path_wins() {
        let ops = vec![
            PatchOperation::replace("name", "First"),
            PatchOperation::replace("name", "Second"),
        ];
        let patched = apply_patch(&schema(), &entity(), &ops).unwrap();
        assert_eq!(patched.get("name"), Some(&Value::from("Second")));
    }

    #[test]
    fn failure_leaves_input_untouched() {
        let original = entity();
        let ops = vec![
            PatchOperation::replace("name", "Changed"),
            PatchOperation::replace("unknown", "x"),
        ];
        let err = apply_patch(&schema(), &original, &ops).unwrap_err();
        assert!(matches!(err, DeskError::Validation(ref m) if m.contains("Unknown field 'unknown'")));
        assert_eq!(original.get("name"), Some(&Value::from("Intro")));
    }

    #[test]
    fn incompatible_value_is_a_validation_error() {
        let ops = vec![PatchOperation::replace("position", "first")];
        let err = apply_patch(&schema(), &entity(), &ops).unwrap_err();
        assert!(matches!(err, DeskError::Validation(_)));
    }

    #[test]
    fn remove_and_copy() {
        let ops = vec![
            PatchOperation::replace("start", "2025-04-01"),
            PatchOperation::copy("start", "end"),
            PatchOperation::remove("position"),
        ];
        let patched = apply_patch(&schema(), &entity(), &ops).unwrap();
        assert_eq!(patched.get("end"), patched.get("start"));
        assert_eq!(patched.get("position"), Some(&Value::Null));

        let err = apply_patch(&schema(), &entity(), &[PatchOperation::remove("name")]).unwrap_err();
        assert!(matches!(err, DeskError::Validation(_)));
    }

    #[test]
    fn applying_twice_is_idempotent() {
        let ops = vec![PatchOperation::replace("name", "Kickoff")];
        let once = apply_patch(&schema(), &entity(), &ops).unwrap();
        let twice = apply_patch(&schema(), &once, &ops).unwrap();
        assert_eq!(once, twice);
    }
}
