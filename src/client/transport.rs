use crate::assign::{ChairDeviceAssignment, SeatAssignment};
use crate::core::{Entity, EntityId, Result};
use crate::patch::PatchOperation;
use crate::storage::EntityStore;
use async_trait::async_trait;
use std::sync::Arc;

/// Requests the console issues against the entity backend.
///
/// No call is retried; a failure is returned to the caller as is.
#[async_trait]
pub trait EntityTransport: Send + Sync {
    async fn fetch(&self, kind: &str, id: &EntityId) -> Result<Entity>;

    async fn list(&self, kind: &str) -> Result<Vec<Entity>>;

    /// Sends one patch and returns the full updated entity.
    async fn patch(&self, kind: &str, id: &EntityId, ops: &[PatchOperation]) -> Result<Entity>;

    async fn assign_seats(&self, records: &[SeatAssignment]) -> Result<Vec<Entity>>;

    async fn assign_chair_devices(&self, records: &[ChairDeviceAssignment]) -> Result<Vec<Entity>>;
}

/// Transport talking to an in-process store.
#[derive(Clone)]
pub struct LocalTransport {
    store: Arc<EntityStore>,
}

impl LocalTransport {
    pub fn new(store: Arc<EntityStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<EntityStore> {
        &self.store
    }
}

#[async_trait]
impl EntityTransport for LocalTransport {
    async fn fetch(&self, kind: &str, id: &EntityId) -> Result<Entity> {
        self.store.get(kind, id).await
    }

    async fn list(&self, kind: &str) -> Result<Vec<Entity>> {
        self.store.list(kind).await
    }

    async fn patch(&self, kind: &str, id: &EntityId, ops: &[PatchOperation]) -> Result<Entity> {
        self.store.apply_patch(kind, id, ops).await
    }

    async fn assign_seats(&self, records: &[SeatAssignment]) -> Result<Vec<Entity>> {
        self.store.assign_seats(records).await
    }

    async fn assign_chair_devices(&self, records: &[ChairDeviceAssignment]) -> Result<Vec<Entity>> {
        self.store.assign_chair_devices(records).await
    }
}
