//! Persistence session
//!
//! The facade the workflow engine talks to. One session serves one transaction at a
//! time: reads go to the store immediately, writes are routed through the operation
//! registry into locked and unlocked batches, and [`PersistenceSession::commit`]
//! flushes every batch under a single store timestamp.
//!
//! ```ignore
//! let store = Arc::new(MemoryStore::new());
//! let registry = Arc::new(OperationRegistry::standard());
//! let mut session = PersistenceSession::new(store, registry, PersistenceConfig::default())?;
//! session.create_schema()?;
//! session.insert(&Entity::Deployment(deployment))?;
//! session.commit()?;
//! ```

use crate::cache::LoadedCompositeEntity;
use crate::catalog::tables::PROC_DEF_TABLE;
use crate::catalog::SchemaComponent;
use crate::config::{PersistenceConfig, UnhandledPolicy};
use crate::error::{PersistenceError, Result};
use crate::index::SecondaryIndex;
use crate::operation::{DbOperation, OperationOutcome, OperationRegistry, QueryParams};
use crate::serializer::SerializerRegistry;
use crate::storage::{Batch, ColumnStore, Select, Statement};
use crate::txn::{LockedBatch, TransactionContext};
use crate::types::{Entity, EntityKind, Row};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[cfg(test)]
mod tests;

/// Callback for every entity materialized from storage
pub trait EntityLoadListener: Send + Sync {
    fn entity_loaded(&self, entity: &Arc<Entity>);
}

pub struct PersistenceSession {
    store: Arc<dyn ColumnStore>,
    registry: Arc<OperationRegistry>,
    config: PersistenceConfig,
    context: TransactionContext,
    listener: Option<Arc<dyn EntityLoadListener>>,
}

impl PersistenceSession {
    pub fn new(
        store: Arc<dyn ColumnStore>,
        registry: Arc<OperationRegistry>,
        config: PersistenceConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            registry,
            config,
            context: TransactionContext::new(),
            listener: None,
        })
    }

    pub fn with_listener(mut self, listener: Arc<dyn EntityLoadListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn set_listener(&mut self, listener: Option<Arc<dyn EntityLoadListener>>) {
        self.listener = listener;
    }

    pub fn config(&self) -> &PersistenceConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn ColumnStore {
        self.store.as_ref()
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    pub fn serializers(&self) -> &SerializerRegistry {
        self.registry.serializers()
    }

    pub fn context(&self) -> &TransactionContext {
        &self.context
    }

    // ---- reads ----

    /// Entity by id; reported to the listener once per transaction
    pub fn select_by_id(&mut self, kind: EntityKind, id: &str) -> Result<Option<Arc<Entity>>> {
        let entity = self.fetch_by_id(kind, id)?;
        if let Some(entity) = &entity {
            self.fire_entity_loaded(entity);
        }
        Ok(entity)
    }

    /// Entity by id without a loaded notification, for handlers that filter before reporting
    pub fn fetch_by_id(&mut self, kind: EntityKind, id: &str) -> Result<Option<Arc<Entity>>> {
        let registry = Arc::clone(&self.registry);
        match registry.entity_handler(kind) {
            Some(handler) => handler.get_by_id(self, id),
            None => {
                self.unhandled(&format!("select by id {} '{}'", kind, id))?;
                Ok(None)
            }
        }
    }

    /// Resolve the ids an index holds for `value`; ids whose entity is gone are skipped
    pub fn fetch_by_index(
        &mut self,
        kind: EntityKind,
        index: SecondaryIndex,
        value: &str,
    ) -> Result<Vec<Arc<Entity>>> {
        let ids = self.lookup_index(index, value)?;
        let mut entities = Vec::with_capacity(ids.len());
        for id in ids {
            match self.fetch_by_id(kind, &id)? {
                Some(entity) => entities.push(entity),
                None => debug!(index = %index, value, id = %id, "stale index entry skipped"),
            }
        }
        Ok(entities)
    }

    pub fn select_one(
        &mut self,
        statement: &str,
        params: &QueryParams,
    ) -> Result<Option<Arc<Entity>>> {
        let registry = Arc::clone(&self.registry);
        match registry.single_query(statement) {
            Some(handler) => {
                let result = handler.execute(self, params)?;
                if let Some(entity) = &result {
                    self.fire_entity_loaded(entity);
                }
                Ok(result)
            }
            None => {
                self.unhandled(&format!("select one '{}'", statement))?;
                Ok(None)
            }
        }
    }

    pub fn select_list(
        &mut self,
        statement: &str,
        params: &QueryParams,
    ) -> Result<Vec<Arc<Entity>>> {
        let registry = Arc::clone(&self.registry);
        match registry.list_query(statement) {
            Some(handler) => {
                let result = handler.execute(self, params)?;
                for entity in &result {
                    self.fire_entity_loaded(entity);
                }
                Ok(result)
            }
            None => {
                self.unhandled(&format!("select list '{}'", statement))?;
                Ok(Vec::new())
            }
        }
    }

    /// Aggregate by composite name and primary id, cached for the rest of the transaction
    pub fn select_composite_by_id(
        &mut self,
        name: &str,
        id: &str,
    ) -> Result<Option<Arc<LoadedCompositeEntity>>> {
        let registry = Arc::clone(&self.registry);
        let loader = registry.composite_loader(name).ok_or_else(|| {
            PersistenceError::Configuration(format!("no composite loader named '{}'", name))
        })?;

        if self.config.cache_composites {
            if let Some(cached) = self.context.cache_mut().get(name, id) {
                debug!(composite = name, id, "composite cache hit");
                return Ok(Some(cached));
            }
        }

        let composite = match loader.load(self, id)? {
            Some(composite) => Arc::new(composite),
            None => return Ok(None),
        };
        if self.config.cache_composites {
            self.context
                .cache_mut()
                .put(name, id, Arc::clone(&composite));
        }
        self.process_loaded_composite(&composite);
        Ok(Some(composite))
    }

    /// Report embedded entities, then the primary unless it was one of them
    fn process_loaded_composite(&mut self, composite: &LoadedCompositeEntity) {
        let primary = composite.primary();
        let mut primary_fired = false;
        for entity in composite.embedded_entities() {
            self.fire_entity_loaded(entity);
            if Arc::ptr_eq(entity, primary) {
                primary_fired = true;
            }
        }
        if !primary_fired {
            self.fire_entity_loaded(primary);
        }
    }

    pub fn fire_entity_loaded(&mut self, entity: &Arc<Entity>) {
        if !self.context.mark_notified(entity.kind(), entity.id()) {
            return;
        }
        if let Some(listener) = &self.listener {
            listener.entity_loaded(entity);
        }
    }

    pub fn lookup_index(&self, index: SecondaryIndex, value: &str) -> Result<Vec<String>> {
        index.lookup(self.store.as_ref(), value)
    }

    pub fn select_rows(&self, select: &Select) -> Result<Vec<Row>> {
        self.store.select(select)
    }

    pub fn select_row(&self, select: &Select) -> Result<Option<Row>> {
        self.store.select_one(select)
    }

    /// Live row count of `table`
    pub fn table_count(&self, table: &str) -> Result<u64> {
        self.store.count(table)
    }

    // ---- writes ----

    pub fn insert(&mut self, entity: &Entity) -> Result<OperationOutcome> {
        self.execute(DbOperation::Insert(entity.clone()))
    }

    pub fn update(&mut self, entity: &Entity) -> Result<OperationOutcome> {
        self.execute(DbOperation::Update(entity.clone()))
    }

    pub fn delete(&mut self, entity: &Entity) -> Result<OperationOutcome> {
        self.execute(DbOperation::Delete(entity.clone()))
    }

    pub fn bulk_delete(
        &mut self,
        statement: &str,
        params: QueryParams,
    ) -> Result<OperationOutcome> {
        self.execute(DbOperation::BulkDelete {
            statement: statement.to_string(),
            params,
        })
    }

    pub fn bulk_update(
        &mut self,
        statement: &str,
        params: QueryParams,
    ) -> Result<OperationOutcome> {
        self.execute(DbOperation::BulkUpdate {
            statement: statement.to_string(),
            params,
        })
    }

    /// Route one write operation to its handler
    pub fn execute(&mut self, operation: DbOperation) -> Result<OperationOutcome> {
        let registry = Arc::clone(&self.registry);
        match &operation {
            DbOperation::Insert(entity)
            | DbOperation::Update(entity)
            | DbOperation::Delete(entity) => {
                let handler = match registry.entity_handler(entity.kind()) {
                    Some(handler) => handler,
                    None => return self.unhandled(&operation.to_string()),
                };
                match &operation {
                    DbOperation::Insert(_) => handler.insert(self, entity)?,
                    DbOperation::Update(_) => handler.update(self, entity)?,
                    _ => handler.delete(self, entity)?,
                }
            }
            DbOperation::BulkDelete { statement, params } => {
                match registry.bulk_operation(statement) {
                    Some(handler) => handler.perform(self, params)?,
                    None => return self.unhandled(&operation.to_string()),
                }
            }
            DbOperation::BulkUpdate { .. } => return self.unhandled(&operation.to_string()),
        }
        Ok(OperationOutcome::Handled)
    }

    fn unhandled(&self, what: &str) -> Result<OperationOutcome> {
        match self.config.unhandled_operations {
            UnhandledPolicy::Warn => {
                warn!(operation = what, "unhandled operation");
                Ok(OperationOutcome::Unhandled)
            }
            UnhandledPolicy::Error => Err(PersistenceError::Unsupported(what.to_string())),
        }
    }

    // ---- batch access for handlers ----

    pub fn locked_batch_mut(&mut self, id: &str) -> Option<&mut LockedBatch> {
        self.context.locked_batch_mut(id)
    }

    pub fn add_locked_batch(&mut self, batch: LockedBatch) -> &mut LockedBatch {
        self.context.add_locked_batch(batch)
    }

    pub fn add_unlocked_statement(&mut self, statement: impl Into<Statement>) {
        self.context.add_unlocked_statement(statement);
    }

    /// Cached composite whose primary entity has `id`
    pub fn cached_composite(&self, id: &str) -> Option<Arc<LoadedCompositeEntity>> {
        self.context.cache().find_by_primary_id(id)
    }

    // ---- transaction boundary ----

    /// Flush all batches with one shared timestamp
    ///
    /// Each locked batch goes out as its own atomic batch followed by its index batch;
    /// the unlocked batch goes last. The first row reporting `applied = false` fails the
    /// commit with [`PersistenceError::OptimisticLock`]. The transaction state is
    /// discarded either way.
    pub fn commit(&mut self) -> Result<()> {
        let context = std::mem::take(&mut self.context);
        if context.is_empty() {
            debug!("commit with nothing to flush");
            return Ok(());
        }

        let timestamp = self.store.next_timestamp();
        let (locked, variety) = context.into_batches();
        let locked_count = locked.len();
        for batch in locked {
            let id = batch.id().to_string();
            let (primary, index) = batch.into_batches()?;
            self.flush_batch(primary, timestamp, &id)?;
            self.flush_batch(index, timestamp, &id)?;
        }
        self.flush_batch(variety, timestamp, "unlocked")?;

        debug!(timestamp, locked_batches = locked_count, "transaction committed");
        Ok(())
    }

    fn flush_batch(&self, mut batch: Batch, timestamp: i64, owner: &str) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        batch.set_default_timestamp(timestamp);
        debug!(owner, statements = batch.len(), "flushing batch");

        let rows = self.store.execute_batch(&batch)?;
        if rows.iter().any(|row| !row.applied) {
            return Err(PersistenceError::OptimisticLock(format!(
                "'{}' was updated by another transaction concurrently",
                owner
            )));
        }
        Ok(())
    }

    /// Drop every pending statement and the composite cache
    pub fn rollback(&mut self) {
        self.context = TransactionContext::new();
    }

    // ---- schema ----

    pub fn create_schema(&self) -> Result<()> {
        self.registry.schema().create_schema(self.store.as_ref())
    }

    pub fn drop_schema(&self) -> Result<()> {
        self.registry.schema().drop_schema(self.store.as_ref())
    }

    /// Create one schema area; only the engine area has tables
    pub fn create_schema_component(&self, component: SchemaComponent) -> Result<()> {
        match component {
            SchemaComponent::Engine => self.create_schema(),
            other => {
                info!(component = %other, "schema component not managed, skipped");
                Ok(())
            }
        }
    }

    pub fn drop_schema_component(&self, component: SchemaComponent) -> Result<()> {
        match component {
            SchemaComponent::Engine => self.drop_schema(),
            other => {
                info!(component = %other, "schema component not managed, skipped");
                Ok(())
            }
        }
    }

    pub fn table_exists(&self, table: &str) -> bool {
        self.store.table_exists(table)
    }

    pub fn is_schema_present(&self, component: SchemaComponent) -> bool {
        match component {
            SchemaComponent::Engine => self.is_engine_schema_present(),
            _ => false,
        }
    }

    pub fn is_engine_schema_present(&self) -> bool {
        self.store.table_exists(PROC_DEF_TABLE)
    }

    pub fn is_history_schema_present(&self) -> bool {
        false
    }

    pub fn is_identity_schema_present(&self) -> bool {
        false
    }

    pub fn is_cmmn_schema_present(&self) -> bool {
        false
    }

    pub fn is_cmmn_history_schema_present(&self) -> bool {
        false
    }

    pub fn db_version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    /// Schema DDL qualified with the configured keyspace
    pub fn schema_ddl(&self) -> String {
        self.registry.schema().ddl(Some(&self.config.keyspace))
    }
}
