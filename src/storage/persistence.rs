//! JSON snapshot persistence for the entity store.

use super::collection::Collection;
use crate::core::{DeskError, Entity, EntitySchema, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use uuid::Uuid;

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub collections: Vec<CollectionSnapshot>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CollectionSnapshot {
    pub schema: EntitySchema,
    pub entities: Vec<Entity>,
}

impl StoreSnapshot {
    pub fn new(collections: Vec<CollectionSnapshot>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            created_at: Utc::now(),
            collections,
        }
    }

    pub fn entity_count(&self) -> usize {
        self.collections.iter().map(|c| c.entities.len()).sum()
    }
}

impl CollectionSnapshot {
    pub fn capture(collection: &Collection) -> Self {
        Self {
            schema: collection.schema().clone(),
            entities: collection.list(),
        }
    }

    /// Rebuilds the collection, re-coercing every stored value.
    pub fn restore(self) -> Result<Collection> {
        let mut collection = Collection::new(self.schema);
        for entity in self.entities {
            collection.insert(Some(entity.id), entity.fields)?;
        }
        Ok(collection)
    }
}

pub async fn save_snapshot(path: &Path, snapshot: &StoreSnapshot) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(snapshot)?;
    atomic_write(path, &bytes).await
}

/// Reads a snapshot, `None` when the file does not exist yet.
pub async fn load_snapshot(path: &Path) -> Result<Option<StoreSnapshot>> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(DeskError::IoError(format!(
                "Failed to read snapshot '{}': {}",
                path.display(),
                err
            )));
        }
    };

    let snapshot: StoreSnapshot = serde_json::from_slice(&bytes)?;
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(DeskError::Serialization(format!(
            "Unsupported snapshot version {} in '{}'",
            snapshot.version,
            path.display()
        )));
    }
    Ok(Some(snapshot))
}

async fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.map_err(|err| {
            DeskError::IoError(format!(
                "Failed to create parent directory '{}': {}",
                parent.display(),
                err
            ))
        })?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(format!(".{}.tmp", Uuid::new_v4().simple()));
    let tmp = path.with_file_name(tmp_name);
    fs::write(&tmp, bytes).await.map_err(|err| {
        DeskError::IoError(format!(
            "Failed to write temp file '{}': {}",
            tmp.display(),
            err
        ))
    })?;

    fs::rename(&tmp, path).await.map_err(|err| {
        DeskError::IoError(format!(
            "Failed to rename temp file '{}' -> '{}': {}",
            tmp.display(),
            path.display(),
            err
        ))
    })?;
    Ok(())
}
