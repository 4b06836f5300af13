//! Transaction-scoped state: locked batches, the unlocked batch, composite cache
//! and the set of entities already reported as loaded.

use super::locked_batch::LockedBatch;
use crate::cache::LoadedEntityCache;
use crate::storage::{Batch, Statement};
use crate::types::EntityKind;
use ahash::{AHashMap, AHashSet};

#[derive(Debug, Default)]
pub struct TransactionContext {
    /// Locked batches in first-touch order
    locked: Vec<LockedBatch>,
    positions: AHashMap<String, usize>,
    /// Statements without an optimistic lock (bulk operations, shared index rows)
    variety: Batch,
    cache: LoadedEntityCache,
    notified: AHashSet<(EntityKind, String)>,
}

impl TransactionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn locked_batch(&self, id: &str) -> Option<&LockedBatch> {
        self.positions.get(id).map(|&pos| &self.locked[pos])
    }

    pub fn locked_batch_mut(&mut self, id: &str) -> Option<&mut LockedBatch> {
        match self.positions.get(id) {
            Some(&pos) => self.locked.get_mut(pos),
            None => None,
        }
    }

    /// Register `batch` unless one already exists for its id; returns the registered one
    pub fn add_locked_batch(&mut self, batch: LockedBatch) -> &mut LockedBatch {
        let pos = match self.positions.get(batch.id()) {
            Some(&pos) => pos,
            None => {
                self.positions.insert(batch.id().to_string(), self.locked.len());
                self.locked.push(batch);
                self.locked.len() - 1
            }
        };
        &mut self.locked[pos]
    }

    pub fn locked_batches(&self) -> &[LockedBatch] {
        &self.locked
    }

    pub fn add_unlocked_statement(&mut self, statement: impl Into<Statement>) {
        self.variety.add(statement);
    }

    pub fn unlocked_batch(&self) -> &Batch {
        &self.variety
    }

    pub fn cache(&self) -> &LoadedEntityCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut LoadedEntityCache {
        &mut self.cache
    }

    /// Record that (kind, id) was reported; false if it already was
    pub fn mark_notified(&mut self, kind: EntityKind, id: &str) -> bool {
        self.notified.insert((kind, id.to_string()))
    }

    /// Nothing to write
    pub fn is_empty(&self) -> bool {
        self.variety.is_empty()
            && self.locked.iter().all(|b| {
                b.statements().is_empty()
                    && b.index_statements().is_empty()
                    && !b.has_lock_statement()
            })
    }

    pub fn into_batches(self) -> (Vec<LockedBatch>, Batch) {
        (self.locked, self.variety)
    }
}
