use super::notification::Notification;
use super::transport::EntityTransport;
use crate::cache::EntityCache;
use crate::core::{Entity, EntityId, Result};
use crate::patch::{FormState, PatchBuilder};
use std::sync::Arc;
use tracing::{Level, event};

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// Nothing to send; no request was issued.
    Unchanged,
    Saved(Entity),
}

/// One open entity editor: form state bound to a stored entity.
pub struct EntityEditor<T: EntityTransport> {
    kind: String,
    id: EntityId,
    transport: Arc<T>,
    cache: EntityCache,
    builder: PatchBuilder,
    form: FormState,
}

impl<T: EntityTransport> EntityEditor<T> {
    /// Loads the entity through the cache and snapshots it into a form.
    pub async fn open(
        kind: &str,
        id: EntityId,
        transport: Arc<T>,
        cache: EntityCache,
        builder: PatchBuilder,
    ) -> Result<Self> {
        let entity = cache
            .get_or_fetch_entity(kind, &id, || transport.fetch(kind, &id))
            .await?;

        Ok(Self {
            kind: kind.to_string(),
            id,
            form: FormState::from_entity(&entity),
            transport,
            cache,
            builder,
        })
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn id(&self) -> &EntityId {
        &self.id
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut FormState {
        &mut self.form
    }

    /// Sends the changed fields as one patch.
    ///
    /// On success the cache takes the returned entity and the form is
    /// rebased on it. On failure the form keeps its edits for a manual retry.
    pub async fn save(&mut self) -> Result<SaveOutcome> {
        let ops = self.builder.build(&self.form);
        if ops.is_empty() {
            return Ok(SaveOutcome::Unchanged);
        }

        let entity = self.transport.patch(&self.kind, &self.id, &ops).await?;
        self.cache.apply_mutation(&self.kind, entity.clone())?;
        self.form.rebase(&entity);
        event!(Level::DEBUG, kind = %self.kind, id = %self.id, "editor saved");
        Ok(SaveOutcome::Saved(entity))
    }

    /// Saves and converts the result into a notification.
    pub async fn save_and_notify(&mut self) -> Notification {
        match self.save().await {
            Ok(SaveOutcome::Saved(_)) => Notification::success("Saved", "Your changes were saved."),
            Ok(SaveOutcome::Unchanged) => Notification::info("Nothing to save", "No fields were changed."),
            Err(err) => Notification::from_error(&err),
        }
    }

    /// Drops every unsaved edit.
    pub fn cancel(&mut self) {
        self.form.reset();
    }
}
