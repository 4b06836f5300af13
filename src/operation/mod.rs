//! Operation handlers and the registry that dispatches to them
//!
//! Handlers translate an operation into statements appended to the session's batches;
//! only reads reach the store before commit.

pub mod bulk;
pub mod composite;
pub mod entities;
mod registry;

pub use composite::{ProcessInstanceLoader, PROCESS_INSTANCE};
pub use registry::{OperationRegistry, OperationRegistryBuilder};

use crate::cache::LoadedCompositeEntity;
use crate::error::{PersistenceError, Result};
use crate::session::PersistenceSession;
use crate::types::{Entity, EntityKind};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Insert, update, delete and by-id read for one entity kind
pub trait EntityOperationHandler: Send + Sync {
    fn kind(&self) -> EntityKind;

    fn insert(&self, session: &mut PersistenceSession, entity: &Entity) -> Result<()>;

    fn update(&self, session: &mut PersistenceSession, entity: &Entity) -> Result<()>;

    fn delete(&self, session: &mut PersistenceSession, entity: &Entity) -> Result<()>;

    fn get_by_id(&self, session: &mut PersistenceSession, id: &str) -> Result<Option<Arc<Entity>>>;
}

pub trait SingleResultQueryHandler: Send + Sync {
    fn execute(
        &self,
        session: &mut PersistenceSession,
        params: &QueryParams,
    ) -> Result<Option<Arc<Entity>>>;
}

pub trait ListQueryHandler: Send + Sync {
    fn execute(&self, session: &mut PersistenceSession, params: &QueryParams)
        -> Result<Vec<Arc<Entity>>>;
}

/// Named bulk operation; statements go to the unlocked batch
pub trait BulkOperationHandler: Send + Sync {
    fn perform(&self, session: &mut PersistenceSession, params: &QueryParams) -> Result<()>;
}

/// Assembles an aggregate from its physical rows
pub trait CompositeEntityLoader: Send + Sync {
    fn name(&self) -> &str;

    /// `None` when the primary entity does not exist
    fn load(
        &self,
        session: &mut PersistenceSession,
        id: &str,
    ) -> Result<Option<LoadedCompositeEntity>>;
}

/// Query / bulk operation parameters
///
/// Either one positional value or named values; `get` falls back to the positional
/// value so single-parameter handlers accept both forms.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    value: Option<String>,
    named: BTreeMap<String, String>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(value: &str) -> Self {
        Self {
            value: Some(value.to_string()),
            named: BTreeMap::new(),
        }
    }

    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.named.insert(name.to_string(), value.to_string());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.named
            .get(name)
            .map(String::as_str)
            .or(self.value.as_deref())
    }

    /// Named value only, without the positional fallback
    pub fn named(&self, name: &str) -> Option<&str> {
        self.named.get(name).map(String::as_str)
    }

    pub fn require(&self, name: &str) -> Result<&str> {
        self.get(name).ok_or_else(|| {
            PersistenceError::InvalidData(format!("missing query parameter '{}'", name))
        })
    }
}

/// A write request from the engine's flush
#[derive(Debug, Clone, PartialEq)]
pub enum DbOperation {
    Insert(Entity),
    Update(Entity),
    Delete(Entity),
    BulkDelete { statement: String, params: QueryParams },
    BulkUpdate { statement: String, params: QueryParams },
}

impl fmt::Display for DbOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbOperation::Insert(e) => write!(f, "INSERT {} '{}'", e.kind(), e.id()),
            DbOperation::Update(e) => write!(f, "UPDATE {} '{}'", e.kind(), e.id()),
            DbOperation::Delete(e) => write!(f, "DELETE {} '{}'", e.kind(), e.id()),
            DbOperation::BulkDelete { statement, .. } => write!(f, "BULK DELETE '{}'", statement),
            DbOperation::BulkUpdate { statement, .. } => write!(f, "BULK UPDATE '{}'", statement),
        }
    }
}

/// Whether a handler took care of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationOutcome {
    Handled,
    /// No handler registered; logged and skipped
    Unhandled,
}

impl OperationOutcome {
    pub fn is_handled(self) -> bool {
        self == OperationOutcome::Handled
    }
}
