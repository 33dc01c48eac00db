use crate::core::{DataType, DeskError, EntitySchema, Field, Result};
use std::collections::HashMap;
use std::sync::Arc;

pub const APPLICATION_SEMESTER: &str = "application_semester";
pub const COURSE_ITERATION: &str = "course_iteration";
pub const COURSE_PHASE: &str = "course_phase";
pub const INTRO_COURSE_PARTICIPATION: &str = "intro_course_participation";
pub const SEAT: &str = "seat";

/// Registry of entity schemas.
///
/// Immutable once built; adding a schema returns a new catalog and leaves
/// clones of the old one untouched.
#[derive(Clone, Debug)]
pub struct Catalog {
    schemas: Arc<HashMap<String, EntitySchema>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            schemas: Arc::new(HashMap::new()),
        }
    }

    /// Schemas of the entities the course console edits.
    pub fn builtin() -> Self {
        let schemas = [
            EntitySchema::new(
                APPLICATION_SEMESTER,
                vec![
                    Field::new("semester_name", DataType::Text).not_null(),
                    Field::new("semester_start", DataType::Date),
                    Field::new("semester_end", DataType::Date),
                    Field::new("application_start", DataType::DateTime),
                    Field::new("application_end", DataType::DateTime),
                    Field::new("is_application_open", DataType::Boolean),
                ],
            ),
            EntitySchema::new(
                COURSE_ITERATION,
                vec![
                    Field::new("semester_name", DataType::Text).not_null(),
                    Field::new("iteration_name", DataType::Text),
                    Field::new("kickoff_submission_start", DataType::Date),
                    Field::new("kickoff_submission_end", DataType::Date),
                    Field::new("intro_course_start", DataType::Date),
                    Field::new("intro_course_end", DataType::Date),
                    Field::new("developer_application_period_start", DataType::DateTime),
                    Field::new("developer_application_period_end", DataType::DateTime),
                    Field::new("max_team_size", DataType::Integer),
                ],
            ),
            EntitySchema::new(
                COURSE_PHASE,
                vec![
                    Field::new("name", DataType::Text).not_null(),
                    Field::new("course_iteration_id", DataType::Text),
                    Field::new("sequence_order", DataType::Integer),
                    Field::new("start", DataType::Date),
                    Field::new("end", DataType::Date),
                    Field::new("is_initial_phase", DataType::Boolean),
                ],
            ),
            EntitySchema::new(
                INTRO_COURSE_PARTICIPATION,
                vec![
                    Field::new("student_name", DataType::Text).not_null(),
                    Field::new("tum_id", DataType::Text),
                    Field::new("matriculation_number", DataType::Text),
                    Field::new("seat", DataType::Text),
                    Field::new("tutor_id", DataType::Text),
                    Field::new("passed", DataType::Boolean),
                    Field::new("tutor_comments", DataType::Text),
                ],
            ),
            EntitySchema::new(
                SEAT,
                vec![
                    Field::new("seat", DataType::Text).not_null(),
                    Field::new("chair_device", DataType::Text),
                    Field::new("tutor_id", DataType::Text),
                ],
            ),
        ];

        let mut map = HashMap::new();
        for schema in schemas {
            map.insert(schema.kind().to_string(), schema);
        }
        Self {
            schemas: Arc::new(map),
        }
    }

    pub fn with_schema(self, schema: EntitySchema) -> Result<Self> {
        let kind = schema.kind().to_string();

        if self.schemas.contains_key(&kind) {
            return Err(DeskError::CollectionExists(kind));
        }

        let mut schemas = (*self.schemas).clone();
        schemas.insert(kind, schema);

        Ok(Self {
            schemas: Arc::new(schemas),
        })
    }

    pub fn get_schema(&self, kind: &str) -> Result<&EntitySchema> {
        self.schemas
            .get(kind)
            .ok_or_else(|| DeskError::NotFound(format!("Unknown entity kind '{}'", kind)))
    }

    pub fn schemas(&self) -> impl Iterator<Item = &EntitySchema> {
        self.schemas.values()
    }

    pub fn list_kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.schemas.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}
