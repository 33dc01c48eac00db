use crate::core::{DeskError, Entity, EntityId, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{Level, event};

/// One parsed upload row, column name to cell text.
pub type UploadRow = IndexMap<String, String>;

/// Columns used to match uploaded rows against the in-memory list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinSpec {
    /// Column of the upload holding the join value.
    pub upload_column: String,
    /// Field of the authoritative entities compared against it.
    pub target_column: String,
}

impl JoinSpec {
    pub fn new(upload_column: impl Into<String>, target_column: impl Into<String>) -> Self {
        Self {
            upload_column: upload_column.into(),
            target_column: target_column.into(),
        }
    }
}

/// What happens to upload rows that match no entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedPolicy {
    /// Skip them without surfacing an error.
    #[default]
    Drop,
    /// Fail the whole join, naming the offending rows.
    Reject,
}

/// Rows matched to entities, at most one row per entity.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinOutcome<'a> {
    matches: IndexMap<EntityId, JoinMatch<'a>>,
    unmatched: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinMatch<'a> {
    pub row_index: usize,
    pub row: &'a UploadRow,
    pub entity: &'a Entity,
}

impl<'a> JoinOutcome<'a> {
    pub fn matches(&self) -> impl Iterator<Item = &JoinMatch<'a>> {
        self.matches.values()
    }

    pub fn get(&self, id: &EntityId) -> Option<&JoinMatch<'a>> {
        self.matches.get(id)
    }

    pub fn matched_count(&self) -> usize {
        self.matches.len()
    }

    /// Zero-based indexes of the rows that matched nothing.
    pub fn unmatched_rows(&self) -> &[usize] {
        &self.unmatched
    }
}

/// Matches upload rows to entities by equality of trimmed join values.
///
/// Rows with a blank join value count as unmatched. When several rows hit
/// the same entity the last one wins. If two entities share a join value
/// the first one in `targets` is used.
pub fn join_rows<'a>(
    rows: &'a [UploadRow],
    targets: &'a [Entity],
    spec: &JoinSpec,
    policy: UnmatchedPolicy,
) -> Result<JoinOutcome<'a>> {
    let mut index: HashMap<String, &'a Entity> = HashMap::with_capacity(targets.len());
    for entity in targets {
        let key = entity
            .get(&spec.target_column)
            .and_then(|value| value.join_text())
            .map(|text| text.trim().to_string());
        if let Some(key) = key
            && !key.is_empty()
        {
            index.entry(key).or_insert(entity);
        }
    }

    let mut matches = IndexMap::new();
    let mut unmatched = Vec::new();
    for (row_index, row) in rows.iter().enumerate() {
        let target = row
            .get(&spec.upload_column)
            .map(|cell| cell.trim())
            .filter(|cell| !cell.is_empty())
            .and_then(|cell| index.get(cell).copied());

        match target {
            Some(entity) => {
                matches.insert(
                    entity.id.clone(),
                    JoinMatch {
                        row_index,
                        row,
                        entity,
                    },
                );
            }
            None => unmatched.push(row_index),
        }
    }

    if !unmatched.is_empty() {
        match policy {
            UnmatchedPolicy::Drop => event!(
                Level::DEBUG,
                dropped = unmatched.len(),
                column = %spec.upload_column,
                "upload rows without a matching entity dropped"
            ),
            UnmatchedPolicy::Reject => {
                let rows: Vec<String> = unmatched.iter().map(|i| (i + 1).to_string()).collect();
                return Err(DeskError::validation(format!(
                    "No match for '{}' in rows {}",
                    spec.upload_column,
                    rows.join(", ")
                )));
            }
        }
    }

    Ok(JoinOutcome { matches, unmatched })
}
