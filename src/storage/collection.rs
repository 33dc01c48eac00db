use crate::core::{DeskError, Entity, EntityId, EntitySchema, Fields, Result, Value};
use crate::patch::{PatchOperation, apply_patch};
use indexmap::IndexMap;

/// All entities of one kind, in insertion order.
#[derive(Debug, Clone)]
pub struct Collection {
    schema: EntitySchema,
    entities: IndexMap<EntityId, Entity>,
}

impl Collection {
    pub fn new(schema: EntitySchema) -> Self {
        Self {
            schema,
            entities: IndexMap::new(),
        }
    }

    pub fn schema(&self) -> &EntitySchema {
        &self.schema
    }

    pub fn kind(&self) -> &str {
        self.schema.kind()
    }

    /// Validates `fields` against the schema and stores a new entity.
    ///
    /// Every schema field ends up present; missing nullable fields are null.
    pub fn insert(&mut self, id: Option<EntityId>, fields: Fields) -> Result<Entity> {
        let id = id.unwrap_or_else(EntityId::generate);
        if self.entities.contains_key(&id) {
            return Err(DeskError::validation(format!(
                "{} '{}' already exists",
                self.kind(),
                id
            )));
        }

        let entity = Entity::new(id.clone(), self.normalize(fields)?);
        self.entities.insert(id, entity.clone());
        Ok(entity)
    }

    pub fn get(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn list(&self) -> Vec<Entity> {
        self.entities.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn find_by_field(&self, field: &str, value: &Value) -> Option<&Entity> {
        self.entities
            .values()
            .find(|entity| entity.get(field) == Some(value))
    }

    pub fn apply_patch(&mut self, id: &EntityId, ops: &[PatchOperation]) -> Result<Entity> {
        let current = self
            .entities
            .get(id)
            .ok_or_else(|| DeskError::not_found(self.schema.kind(), id))?;
        let patched = apply_patch(&self.schema, current, ops)?;
        self.entities.insert(id.clone(), patched.clone());
        Ok(patched)
    }

    /// Patches several entities as one unit.
    ///
    /// Patches for the same id are applied in order on top of each other.
    /// Nothing is stored unless every patch succeeds.
    pub fn apply_batch(&mut self, batch: &[(EntityId, Vec<PatchOperation>)]) -> Result<Vec<Entity>> {
        let mut staged: IndexMap<EntityId, Entity> = IndexMap::new();
        for (id, ops) in batch {
            let current = match staged.get(id) {
                Some(entity) => entity,
                None => self
                    .entities
                    .get(id)
                    .ok_or_else(|| DeskError::not_found(self.schema.kind(), id))?,
            };
            let patched = apply_patch(&self.schema, current, ops)?;
            staged.insert(id.clone(), patched);
        }

        let updated: Vec<Entity> = staged.values().cloned().collect();
        self.entities.extend(staged);
        Ok(updated)
    }

    fn normalize(&self, mut fields: Fields) -> Result<Fields> {
        let mut normalized = Fields::with_capacity(self.schema.field_count());
        for field in self.schema.fields() {
            let raw = fields.shift_remove(&field.name).unwrap_or_default();
            normalized.insert(field.name.clone(), field.coerce(&raw)?);
        }

        if let Some(unknown) = fields.keys().next() {
            return Err(DeskError::validation(format!(
                "Unknown field '{}' for {}",
                unknown,
                self.kind()
            )));
        }
        Ok(normalized)
    }
}
