//! Editor-side form state with dirty tracking.

use crate::core::{DeskError, Entity, Result, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Value held by a form field.
///
/// A group is a composite field (for example a sub-object holding the
/// start and end dates of a phase) whose entries map to entity fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FormValue {
    Scalar(Value),
    Group(IndexMap<String, Value>),
}

impl FormValue {
    pub fn group<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Self::Group(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }

    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            Self::Scalar(value) => Some(value),
            Self::Group(_) => None,
        }
    }
}

macro_rules! scalar_form_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for FormValue {
                fn from(value: $ty) -> Self {
                    Self::Scalar(value.into())
                }
            }
        )*
    };
}

scalar_form_value!(Value, &str, String, i64, f64, bool, chrono::NaiveDate);

#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    initial: FormValue,
    current: FormValue,
}

impl FormField {
    fn new(initial: FormValue) -> Self {
        Self {
            current: initial.clone(),
            initial,
        }
    }

    pub fn initial(&self) -> &FormValue {
        &self.initial
    }

    pub fn current(&self) -> &FormValue {
        &self.current
    }

    pub fn is_dirty(&self) -> bool {
        self.initial != self.current
    }
}

/// Field states of one open editor, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormState {
    fields: IndexMap<String, FormField>,
}

impl FormState {
    pub fn new<K, V>(initial: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<FormValue>,
    {
        Self {
            fields: initial
                .into_iter()
                .map(|(key, value)| (key.into(), FormField::new(value.into())))
                .collect(),
        }
    }

    /// Snapshot of a fetched entity, one scalar field per entity field.
    pub fn from_entity(entity: &Entity) -> Self {
        Self::new(
            entity
                .fields
                .iter()
                .map(|(key, value)| (key.clone(), FormValue::Scalar(value.clone()))),
        )
    }

    pub fn set(&mut self, key: &str, value: impl Into<FormValue>) -> Result<()> {
        let field = self.field_mut(key)?;
        field.current = value.into();
        Ok(())
    }

    /// Updates one entry of a group field.
    pub fn set_group_entry(&mut self, key: &str, entry: &str, value: impl Into<Value>) -> Result<()> {
        let field = self.field_mut(key)?;
        match &mut field.current {
            FormValue::Group(entries) if entries.contains_key(entry) => {
                entries.insert(entry.to_string(), value.into());
                Ok(())
            }
            FormValue::Group(_) => Err(DeskError::validation(format!(
                "Unknown entry '{}' in form group '{}'",
                entry, key
            ))),
            FormValue::Scalar(_) => Err(DeskError::validation(format!(
                "Form field '{}' is not a group",
                key
            ))),
        }
    }

    pub fn field(&self, key: &str) -> Option<&FormField> {
        self.fields.get(key)
    }

    pub fn value(&self, key: &str) -> Option<&FormValue> {
        self.fields.get(key).map(FormField::current)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FormField)> {
        self.fields.iter().map(|(key, field)| (key.as_str(), field))
    }

    /// Current values in declaration order.
    pub fn values(&self) -> IndexMap<String, FormValue> {
        self.fields
            .iter()
            .map(|(key, field)| (key.clone(), field.current.clone()))
            .collect()
    }

    pub fn is_dirty(&self, key: &str) -> bool {
        self.fields.get(key).is_some_and(FormField::is_dirty)
    }

    pub fn dirty_keys(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(_, field)| field.is_dirty())
            .map(|(key, _)| key.as_str())
            .collect()
    }

    /// Per-key dirty flags, the shape most form libraries hand out.
    pub fn dirty_flags(&self) -> IndexMap<String, bool> {
        self.fields
            .iter()
            .map(|(key, field)| (key.clone(), field.is_dirty()))
            .collect()
    }

    pub fn is_pristine(&self) -> bool {
        self.fields.values().all(|field| !field.is_dirty())
    }

    /// Discards every edit.
    pub fn reset(&mut self) {
        for field in self.fields.values_mut() {
            field.current = field.initial.clone();
        }
    }

    /// Takes a fresh snapshot from the entity returned by a successful save.
    ///
    /// Scalars adopt the entity's value; group entries adopt the values of
    /// the entity fields they name. Keys the entity lacks keep their value.
    pub fn rebase(&mut self, entity: &Entity) {
        for (key, field) in self.fields.iter_mut() {
            let mut next = field.current.clone();
            match &mut next {
                FormValue::Scalar(value) => {
                    if let Some(saved) = entity.get(key) {
                        *value = saved.clone();
                    }
                }
                FormValue::Group(entries) => {
                    for (entry, value) in entries.iter_mut() {
                        if let Some(saved) = entity.get(entry) {
                            *value = saved.clone();
                        }
                    }
                }
            }
            field.initial = next.clone();
            field.current = next;
        }
    }

    fn field_mut(&mut self, key: &str) -> Result<&mut FormField> {
        self.fields
            .get_mut(key)
            .ok_or_else(|| DeskError::validation(format!("Unknown form field '{}'", key)))
    }
}
