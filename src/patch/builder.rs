//! Turns editor form state into a minimal patch.

use super::form::{FormState, FormValue};
use super::operation::PatchOperation;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which form fields a patch carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirtyGating {
    /// Only fields that differ from the loaded snapshot.
    #[default]
    DirtyOnly,
    /// Every declared field, dirty or not.
    AllFields,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PatchBuilder {
    gating: DirtyGating,
}

impl PatchBuilder {
    pub fn new(gating: DirtyGating) -> Self {
        Self { gating }
    }

    pub fn gating(&self) -> DirtyGating {
        self.gating
    }

    /// Builds the patch for an editor form.
    ///
    /// Group fields are flattened one level; only the entries that changed
    /// are emitted unless every field is requested.
    pub fn build(&self, form: &FormState) -> Vec<PatchOperation> {
        let mut ops = Vec::new();
        for (key, field) in form.fields() {
            let emit_all = self.gating == DirtyGating::AllFields;
            if !emit_all && !field.is_dirty() {
                continue;
            }

            match (field.initial(), field.current()) {
                (FormValue::Group(initial), FormValue::Group(current)) => {
                    for (entry, value) in current {
                        if emit_all || initial.get(entry) != Some(value) {
                            ops.push(PatchOperation::replace(entry, value.clone()));
                        }
                    }
                }
                (_, current) => push_field(&mut ops, key, current),
            }
        }
        ops
    }

    /// Builds a patch from raw form values and per-key dirty flags.
    ///
    /// Keys missing from `dirty` count as clean. A dirty group emits all
    /// of its entries since the flag only covers the top-level key.
    pub fn build_from_flags(
        &self,
        values: &IndexMap<String, FormValue>,
        dirty: &HashMap<String, bool>,
    ) -> Vec<PatchOperation> {
        let mut ops = Vec::new();
        for (key, value) in values {
            let is_dirty = dirty.get(key).copied().unwrap_or(false);
            if self.gating == DirtyGating::DirtyOnly && !is_dirty {
                continue;
            }
            push_field(&mut ops, key, value);
        }
        ops
    }
}

fn push_field(ops: &mut Vec<PatchOperation>, key: &str, value: &FormValue) {
    match value {
        FormValue::Scalar(value) => ops.push(PatchOperation::replace(key, value.clone())),
        FormValue::Group(entries) => ops.extend(
            entries
                .iter()
                .map(|(entry, value)| PatchOperation::replace(entry, value.clone())),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::PatchOp;

    #[test]
    fn emits_only_changed_field() {
        let mut form = FormState::new([("name", "A"), ("tag", "x")]);
        form.set("tag", "y").unwrap();

        let ops = PatchBuilder::default().build(&form);
        assert_eq!(ops, vec![PatchOperation::replace("tag", "y")]);
    }

    #[test]
    fn pristine_form_builds_empty_patch() {
        let form = FormState::new([("name", "A")]);
        assert!(PatchBuilder::default().build(&form).is_empty());
    }

    #[test]
    fn all_fields_gating_resyncs_everything() {
        let mut form = FormState::new([("name", "A"), ("tag", "x")]);
        form.set("tag", "y").unwrap();

        let ops = PatchBuilder::new(DirtyGating::AllFields).build(&form);
        let paths: Vec<_> = ops.iter().map(|op| op.path.as_str()).collect();
        assert_eq!(paths, vec!["/name", "/tag"]);
        assert!(ops.iter().all(|op| op.op == PatchOp::Replace));
    }

    #[test]
    fn flags_input_honours_declaration_order() {
        let values: IndexMap<String, FormValue> = [
            ("b".to_string(), FormValue::from(2i64)),
            ("a".to_string(), FormValue::from(1i64)),
        ]
        .into_iter()
        .collect();
        let dirty = HashMap::from([("a".to_string(), true), ("b".to_string(), true)]);

        let ops = PatchBuilder::default().build_from_flags(&values, &dirty);
        let paths: Vec<_> = ops.iter().map(|op| op.path.as_str()).collect();
        assert_eq!(paths, vec!["/b", "/a"]);
    }
}
