// ============================================================================
// coursedesk Library
// ============================================================================

pub mod assign;
pub mod cache;
pub mod client;
pub mod config;
pub mod core;
pub mod patch;
pub mod storage;
pub mod web;

// Re-export main types for convenience
pub use cache::{CacheKey, EntityCache};
pub use client::{EntityEditor, EntityTransport, HttpTransport, LocalTransport, Notification};
pub use config::DeskConfig;
pub use crate::core::{DataType, DeskError, Entity, EntityId, EntitySchema, Field, Fields, Result, Value};
pub use patch::{
    DirtyGating, FormState, FormValue, PATCH_CONTENT_TYPE, PatchBuilder, PatchOp, PatchOperation,
    apply_patch,
};
pub use storage::{Catalog, EntityStore};

// ============================================================================
// High-level Console API
// ============================================================================

use std::sync::Arc;

/// Console session: one transport, one shared cache, one patch policy.
///
/// Every editor opened through the same console shares its cache, so a
/// save in one editor is visible to lists and editors opened afterwards.
///
/// # Examples
///
/// ```
/// use coursedesk::{Catalog, Console, EntityStore, Fields, LocalTransport, Value};
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() -> coursedesk::Result<()> {
/// let store = Arc::new(EntityStore::with_catalog(&Catalog::builtin()));
/// store
///     .insert(
///         "course_phase",
///         Some("p1".into()),
///         Fields::from([("name".to_string(), Value::from("Intro Course"))]),
///     )
///     .await?;
///
/// let console = Console::new(LocalTransport::new(store), Default::default());
/// let mut editor = console.open_editor("course_phase", "p1".into()).await?;
/// editor.form_mut().set("sequence_order", 2i64)?;
/// editor.save().await?;
/// # Ok(())
/// # }
/// ```
pub struct Console<T: EntityTransport> {
    transport: Arc<T>,
    cache: EntityCache,
    builder: PatchBuilder,
    config: DeskConfig,
}

impl<T: EntityTransport> Console<T> {
    pub fn new(transport: T, config: DeskConfig) -> Self {
        Self {
            transport: Arc::new(transport),
            cache: EntityCache::new(config.cache_capacity),
            builder: PatchBuilder::new(config.patch_gating),
            config,
        }
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    pub fn cache(&self) -> &EntityCache {
        &self.cache
    }

    pub fn config(&self) -> &DeskConfig {
        &self.config
    }

    pub async fn open_editor(&self, kind: &str, id: EntityId) -> Result<EntityEditor<T>> {
        EntityEditor::open(
            kind,
            id,
            Arc::clone(&self.transport),
            self.cache.clone(),
            self.builder,
        )
        .await
    }

    /// Lists a kind through the cache.
    pub async fn list(&self, kind: &str) -> Result<Vec<Entity>> {
        let key = CacheKey::new(kind);
        self.cache
            .get_or_fetch_list(&key, || self.transport.list(kind))
            .await
    }

    /// Joins uploaded rows against the cached participant list and sends
    /// the resulting seat assignments in one request.
    pub async fn upload_seat_assignments(
        &self,
        rows: &[assign::UploadRow],
        spec: &assign::JoinSpec,
        columns: &assign::AssignmentColumns,
    ) -> Result<Vec<Entity>> {
        let kind = storage::catalog::INTRO_COURSE_PARTICIPATION;
        let participants = self.list(kind).await?;
        let outcome = assign::join_rows(rows, &participants, spec, self.config.unmatched_rows)?;
        let records = assign::seat_assignments(&outcome, columns);
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let updated = self.transport.assign_seats(&records).await?;
        for entity in &updated {
            self.cache.apply_mutation(kind, entity.clone())?;
        }
        Ok(updated)
    }

    /// Sends a seat plan (seat, chair device, tutor) built from uploaded rows.
    pub async fn upload_seat_plan(
        &self,
        rows: &[assign::UploadRow],
        columns: &assign::AssignmentColumns,
    ) -> Result<Vec<Entity>> {
        let records = assign::chair_device_assignments(rows, columns)?;
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let updated = self.transport.assign_chair_devices(&records).await?;
        self.cache.invalidate_kind(storage::catalog::SEAT)?;
        Ok(updated)
    }
}
