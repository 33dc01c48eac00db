use super::{DataType, DeskError, Result, Value};
use indexmap::IndexMap;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

pub type Fields = IndexMap<String, Value>;

/// Opaque entity identifier.
///
/// The backend hands out both numeric and string ids; both are kept as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl From<String> for EntityId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<u64> for EntityId {
    fn from(raw: u64) -> Self {
        Self(raw.to_string())
    }
}

impl From<Uuid> for EntityId {
    fn from(raw: Uuid) -> Self {
        Self(raw.to_string())
    }
}

struct EntityIdVisitor;

impl Visitor<'_> for EntityIdVisitor {
    type Value = EntityId;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string or integer id")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<EntityId, E> {
        if v.trim().is_empty() {
            return Err(E::custom("id must not be blank"));
        }
        Ok(EntityId::from(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<EntityId, E> {
        Ok(EntityId(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<EntityId, E> {
        Ok(EntityId::from(v))
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(EntityIdVisitor)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn validate(&self, value: &Value) -> Result<()> {
        if value.is_null() && !self.nullable {
            return Err(DeskError::validation(format!(
                "Field '{}' cannot be null",
                self.name
            )));
        }
        Ok(())
    }

    /// Coerces `value` to the declared type and checks nullability.
    pub fn coerce(&self, value: &Value) -> Result<Value> {
        let coerced = self.data_type.coerce(value).map_err(|err| {
            DeskError::validation(format!("Field '{}': {}", self.name, err))
        })?;
        self.validate(&coerced)?;
        Ok(coerced)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySchema {
    kind: String,
    fields: Vec<Field>,
}

impl EntitySchema {
    pub fn new(kind: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            kind: kind.into(),
            fields,
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn get_field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Looks up a field, failing with a validation error naming the kind.
    pub fn require_field(&self, name: &str) -> Result<&Field> {
        self.get_field(name).ok_or_else(|| {
            DeskError::validation(format!(
                "Unknown field '{}' for {}",
                name, self.kind
            ))
        })
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    #[serde(flatten)]
    pub fields: Fields,
}

impl Entity {
    pub fn new(id: impl Into<EntityId>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_accepts_numbers_and_strings() {
        let ids: Vec<EntityId> = serde_json::from_str(r#"[7, "abc"]"#).unwrap();
        assert_eq!(ids, vec![EntityId::from(7u64), EntityId::from("abc")]);
        assert!(serde_json::from_str::<EntityId>("\"  \"").is_err());
    }

    #[test]
    fn entity_serializes_flat_with_id_first() {
        let entity = Entity::new("s1", Fields::new())
            .with("name", "WS24")
            .with("open", true);
        let json = serde_json::to_string(&entity).unwrap();
        assert_eq!(json, r#"{"id":"s1","name":"WS24","open":true}"#);

        let back: Entity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entity);
    }

    #[test]
    fn field_coerce_rejects_null_for_required() {
        let field = Field::new("name", DataType::Text).not_null();
        let err = field.coerce(&Value::Null).unwrap_err();
        assert!(matches!(err, DeskError::Validation(_)));
    }
}
