//! Client-side entity cache.
//!
//! Cached entities and lists are keyed by entity kind plus scope
//! parameters. Reads go through the cache; every mutation response is
//! pushed in with [`EntityCache::apply_mutation`], which replaces the
//! entity wholesale and drops every cached list of its kind.

use crate::core::{Entity, EntityId, Result};
use lru::LruCache;
use std::collections::BTreeMap;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use tracing::{Level, event};

pub const DEFAULT_CACHE_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    kind: String,
    scope: BTreeMap<String, String>,
}

impl CacheKey {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            scope: BTreeMap::new(),
        }
    }

    pub fn scoped(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.scope.insert(name.into(), value.into());
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EntityKey {
    kind: String,
    id: EntityId,
}

struct CacheState {
    entities: LruCache<EntityKey, Entity>,
    lists: LruCache<CacheKey, Vec<Entity>>,
}

#[derive(Clone)]
pub struct EntityCache {
    state: Arc<Mutex<CacheState>>,
}

impl EntityCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            state: Arc::new(Mutex::new(CacheState {
                entities: LruCache::new(capacity),
                lists: LruCache::new(capacity),
            })),
        }
    }

    pub fn get_entity(&self, kind: &str, id: &EntityId) -> Result<Option<Entity>> {
        let mut state = self.state.lock()?;
        Ok(state.entities.get(&entity_key(kind, id)).cloned())
    }

    pub fn get_list(&self, key: &CacheKey) -> Result<Option<Vec<Entity>>> {
        let mut state = self.state.lock()?;
        Ok(state.lists.get(key).cloned())
    }

    /// Returns the cached entity or fetches and caches it.
    ///
    /// The lock is not held while `fetch` runs.
    pub async fn get_or_fetch_entity<F, Fut>(&self, kind: &str, id: &EntityId, fetch: F) -> Result<Entity>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Entity>>,
    {
        if let Some(entity) = self.get_entity(kind, id)? {
            return Ok(entity);
        }

        event!(Level::TRACE, kind, id = %id, "entity cache miss");
        let entity = fetch().await?;
        self.store_entity(kind, entity.clone())?;
        Ok(entity)
    }

    pub async fn get_or_fetch_list<F, Fut>(&self, key: &CacheKey, fetch: F) -> Result<Vec<Entity>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Entity>>>,
    {
        if let Some(list) = self.get_list(key)? {
            return Ok(list);
        }

        event!(Level::TRACE, kind = key.kind(), "list cache miss");
        let list = fetch().await?;
        let mut state = self.state.lock()?;
        for entity in &list {
            state.entities.put(entity_key(key.kind(), &entity.id), entity.clone());
        }
        state.lists.put(key.clone(), list.clone());
        Ok(list)
    }

    pub fn store_entity(&self, kind: &str, entity: Entity) -> Result<()> {
        let mut state = self.state.lock()?;
        state.entities.put(entity_key(kind, &entity.id), entity);
        Ok(())
    }

    /// Pushes the authoritative entity returned by a mutation.
    pub fn apply_mutation(&self, kind: &str, entity: Entity) -> Result<()> {
        let mut state = self.state.lock()?;
        state.entities.put(entity_key(kind, &entity.id), entity);
        drop_lists_of_kind(&mut state.lists, kind);
        Ok(())
    }

    pub fn invalidate(&self, key: &CacheKey) -> Result<()> {
        let mut state = self.state.lock()?;
        state.lists.pop(key);
        Ok(())
    }

    pub fn invalidate_entity(&self, kind: &str, id: &EntityId) -> Result<()> {
        let mut state = self.state.lock()?;
        state.entities.pop(&entity_key(kind, id));
        drop_lists_of_kind(&mut state.lists, kind);
        Ok(())
    }

    /// Drops every entity and list of `kind`.
    pub fn invalidate_kind(&self, kind: &str) -> Result<()> {
        let mut state = self.state.lock()?;
        let stale: Vec<EntityKey> = state
            .entities
            .iter()
            .filter(|(key, _)| key.kind == kind)
            .map(|(key, _)| key.clone())
            .collect();
        for key in stale {
            state.entities.pop(&key);
        }
        drop_lists_of_kind(&mut state.lists, kind);
        Ok(())
    }
}

impl Default for EntityCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

fn entity_key(kind: &str, id: &EntityId) -> EntityKey {
    EntityKey {
        kind: kind.to_string(),
        id: id.clone(),
    }
}

fn drop_lists_of_kind(lists: &mut LruCache<CacheKey, Vec<Entity>>, kind: &str) {
    let stale: Vec<CacheKey> = lists
        .iter()
        .filter(|(key, _)| key.kind == kind)
        .map(|(key, _)| key.clone())
        .collect();
    for key in stale {
        lists.pop(&key);
    }
}
