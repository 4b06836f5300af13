//! Transaction-scoped cache of assembled composite entities
//!
//! Keyed by (composite name, id). Entries are `Arc`s so repeated loads hand back the
//! very same aggregate; the cache lives and dies with one transaction context.

use crate::types::Entity;
use ahash::AHashMap;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Aggregate of a primary entity plus named collections of embedded entities
///
/// `embedded` maps relation name -> embedded id -> entity. The primary entity may also
/// be a member of one of the collections; it is then the same `Arc`.
#[derive(Debug, Clone)]
pub struct LoadedCompositeEntity {
    primary: Arc<Entity>,
    embedded: BTreeMap<String, BTreeMap<String, Arc<Entity>>>,
}

impl LoadedCompositeEntity {
    pub fn new(primary: Arc<Entity>) -> Self {
        Self {
            primary,
            embedded: BTreeMap::new(),
        }
    }

    pub fn primary(&self) -> &Arc<Entity> {
        &self.primary
    }

    /// Add an embedded entity to `relation`
    pub fn embed(&mut self, relation: &str, entity: Arc<Entity>) {
        self.embedded
            .entry(relation.to_string())
            .or_default()
            .insert(entity.id().to_string(), entity);
    }

    pub fn embedded(&self, relation: &str) -> Option<&BTreeMap<String, Arc<Entity>>> {
        self.embedded.get(relation)
    }

    pub fn relations(&self) -> impl Iterator<Item = (&String, &BTreeMap<String, Arc<Entity>>)> {
        self.embedded.iter()
    }

    /// Every embedded entity, relation by relation
    pub fn embedded_entities(&self) -> impl Iterator<Item = &Arc<Entity>> {
        self.embedded.values().flat_map(|m| m.values())
    }
}

/// Cache statistics
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
pub struct LoadedEntityCache {
    /// composite name -> id -> aggregate
    entries: AHashMap<String, AHashMap<String, Arc<LoadedCompositeEntity>>>,
    hits: u64,
    misses: u64,
}

impl LoadedEntityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, composite: &str, id: &str) -> Option<Arc<LoadedCompositeEntity>> {
        let found = self
            .entries
            .get(composite)
            .and_then(|by_id| by_id.get(id))
            .cloned();
        if found.is_some() {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        found
    }

    pub fn put(&mut self, composite: &str, id: &str, entity: Arc<LoadedCompositeEntity>) {
        self.entries
            .entry(composite.to_string())
            .or_default()
            .insert(id.to_string(), entity);
    }

    /// Cached aggregate whose primary entity has `id`, in any composite
    pub fn find_by_primary_id(&self, id: &str) -> Option<Arc<LoadedCompositeEntity>> {
        self.entries
            .values()
            .find_map(|by_id| by_id.get(id))
            .cloned()
    }

    pub fn composites(&self) -> impl Iterator<Item = &Arc<LoadedCompositeEntity>> {
        self.entries.values().flat_map(|by_id| by_id.values())
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(|by_id| by_id.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            size: self.len(),
        }
    }
}
