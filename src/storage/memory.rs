use super::catalog::{Catalog, INTRO_COURSE_PARTICIPATION, SEAT};
use super::collection::Collection;
use super::persistence::{CollectionSnapshot, StoreSnapshot, load_snapshot, save_snapshot};
use crate::assign::{ChairDeviceAssignment, SeatAssignment};
use crate::core::{DeskError, Entity, EntityId, EntitySchema, Fields, Result, Value};
use crate::patch::PatchOperation;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{Level, event, warn};

/// Authoritative in-memory store of every entity collection.
///
/// Each collection has its own lock; a mutation holds the write lock of
/// its collection for the whole request, so a patch is applied entirely
/// or not at all.
pub struct EntityStore {
    collections: RwLock<HashMap<String, Arc<RwLock<Collection>>>>,
    snapshot_path: Option<PathBuf>,
    /// Held from snapshot capture to rename; the file only moves forward.
    persist_lock: Mutex<()>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            snapshot_path: None,
            persist_lock: Mutex::new(()),
        }
    }

    /// Empty collections for every schema in `catalog`.
    pub fn with_catalog(catalog: &Catalog) -> Self {
        let collections = catalog
            .schemas()
            .map(|schema| {
                (
                    schema.kind().to_string(),
                    Arc::new(RwLock::new(Collection::new(schema.clone()))),
                )
            })
            .collect();
        Self {
            collections: RwLock::new(collections),
            snapshot_path: None,
            persist_lock: Mutex::new(()),
        }
    }

    /// Opens a store persisted at `path`, restoring its last snapshot.
    ///
    /// Kinds in `catalog` missing from the snapshot start out empty.
    pub async fn open(path: impl AsRef<Path>, catalog: &Catalog) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut store = Self::with_catalog(catalog);

        if let Some(snapshot) = load_snapshot(&path).await? {
            event!(
                Level::INFO,
                path = %path.display(),
                entities = snapshot.entity_count(),
                "restoring entity store snapshot"
            );
            let collections = store.collections.get_mut();
            for saved in snapshot.collections {
                let collection = saved.restore()?;
                collections.insert(
                    collection.kind().to_string(),
                    Arc::new(RwLock::new(collection)),
                );
            }
        }

        store.snapshot_path = Some(path);
        Ok(store)
    }

    pub async fn create_collection(&self, schema: EntitySchema) -> Result<()> {
        let mut collections = self.collections.write().await;
        let kind = schema.kind().to_string();

        if collections.contains_key(&kind) {
            return Err(DeskError::CollectionExists(kind));
        }

        collections.insert(kind, Arc::new(RwLock::new(Collection::new(schema))));
        Ok(())
    }

    pub async fn get_collection(&self, kind: &str) -> Result<Arc<RwLock<Collection>>> {
        self.collections
            .read()
            .await
            .get(kind)
            .cloned()
            .ok_or_else(|| DeskError::NotFound(format!("Unknown entity kind '{}'", kind)))
    }

    pub async fn schema(&self, kind: &str) -> Result<EntitySchema> {
        let handle = self.get_collection(kind).await?;
        let collection = handle.read().await;
        Ok(collection.schema().clone())
    }

    pub async fn list_kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.collections.read().await.keys().cloned().collect();
        kinds.sort_unstable();
        kinds
    }

    pub async fn insert(&self, kind: &str, id: Option<EntityId>, fields: Fields) -> Result<Entity> {
        let handle = self.get_collection(kind).await?;
        let entity = handle.write().await.insert(id, fields)?;
        event!(Level::DEBUG, kind, id = %entity.id, "entity created");
        self.persist().await;
        Ok(entity)
    }

    pub async fn get(&self, kind: &str, id: &EntityId) -> Result<Entity> {
        let handle = self.get_collection(kind).await?;
        let collection = handle.read().await;
        collection
            .get(id)
            .cloned()
            .ok_or_else(|| DeskError::not_found(kind, id))
    }

    pub async fn list(&self, kind: &str) -> Result<Vec<Entity>> {
        let handle = self.get_collection(kind).await?;
        let collection = handle.read().await;
        Ok(collection.list())
    }

    /// Applies a patch to one entity and returns the full updated entity.
    pub async fn apply_patch(&self, kind: &str, id: &EntityId, ops: &[PatchOperation]) -> Result<Entity> {
        let handle = self.get_collection(kind).await?;
        let entity = handle.write().await.apply_patch(id, ops)?;
        event!(Level::DEBUG, kind, id = %id, operations = ops.len(), "patch applied");
        self.persist().await;
        Ok(entity)
    }

    /// Stores the seat (and tutor) of each participant; all or nothing.
    pub async fn assign_seats(&self, records: &[SeatAssignment]) -> Result<Vec<Entity>> {
        let batch: Vec<(EntityId, Vec<PatchOperation>)> = records
            .iter()
            .map(|record| (record.intro_course_participation_id.clone(), record.to_patch()))
            .collect();

        let handle = self.get_collection(INTRO_COURSE_PARTICIPATION).await?;
        let updated = handle.write().await.apply_batch(&batch)?;
        event!(Level::INFO, assigned = updated.len(), "seat assignments stored");
        self.persist().await;
        Ok(updated)
    }

    /// Stores the device of each seat, creating seats not seen before;
    /// all or nothing.
    pub async fn assign_chair_devices(&self, records: &[ChairDeviceAssignment]) -> Result<Vec<Entity>> {
        let handle = self.get_collection(SEAT).await?;
        let mut guard = handle.write().await;

        let mut working = guard.clone();
        let mut updated = Vec::with_capacity(records.len());
        for record in records {
            let seat = Value::from(record.seat.as_str());
            let existing = working.find_by_field("seat", &seat).map(|entity| entity.id.clone());
            let entity = match existing {
                Some(id) => working.apply_patch(&id, &record.to_patch())?,
                None => {
                    let mut fields = Fields::new();
                    fields.insert("seat".to_string(), seat);
                    fields.insert("chair_device".to_string(), Value::from(record.chair_device.as_str()));
                    if let Some(tutor) = &record.tutor_id {
                        fields.insert("tutor_id".to_string(), Value::from(tutor.as_str()));
                    }
                    working.insert(None, fields)?
                }
            };
            updated.push(entity);
        }

        *guard = working;
        drop(guard);

        event!(Level::INFO, seats = updated.len(), "seat plan stored");
        self.persist().await;
        Ok(updated)
    }

    pub async fn snapshot(&self) -> StoreSnapshot {
        let handles: Vec<Arc<RwLock<Collection>>> =
            self.collections.read().await.values().cloned().collect();

        let mut collections = Vec::with_capacity(handles.len());
        for handle in handles {
            collections.push(CollectionSnapshot::capture(&*handle.read().await));
        }
        collections.sort_by(|a, b| a.schema.kind().cmp(b.schema.kind()));
        StoreSnapshot::new(collections)
    }

    /// Writes the snapshot file after a committed mutation.
    ///
    /// The mutation stays committed in memory if the write fails.
    async fn persist(&self) {
        let Some(path) = &self.snapshot_path else {
            return;
        };
        let _guard = self.persist_lock.lock().await;
        let snapshot = self.snapshot().await;
        if let Err(err) = save_snapshot(path, &snapshot).await {
            warn!(path = %path.display(), error = %err, "entity snapshot write failed");
        }
    }
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}
