//! widerow - workflow-engine persistence over a wide-column store
//!
//! Maps generic entity CRUD, named queries and bulk operations onto statements against
//! a schemaless wide-row store, adding what the store lacks natively:
//! - atomic multi-statement commit under one shared write timestamp
//! - optimistic concurrency via per-entity conditional revision checks
//! - composite aggregate loading with a per-transaction cache
//! - secondary-index lookups through an inverted index table
//!
//! ## Architecture
//! - storage: `ColumnStore` client surface + `MemoryStore` reference implementation
//! - catalog / serializer / index: schema objects, row codecs, inverted index rows
//! - operation / query: handlers the session dispatches to by entity kind or name
//! - txn: locked batches and the transaction context
//! - session: the facade driving all of the above

pub mod cache;
pub mod catalog;
pub mod config;
pub mod index;
pub mod operation;
pub mod query;
pub mod serializer;
pub mod session;
pub mod storage;
pub mod txn;
pub mod types;

mod error;

pub use config::{MemoryStoreConfig, PersistenceConfig, UnhandledPolicy};
pub use error::{PersistenceError, Result};

pub use cache::{LoadedCompositeEntity, LoadedEntityCache};
pub use catalog::{SchemaComponent, SchemaRegistry};
pub use index::SecondaryIndex;
pub use operation::{DbOperation, OperationOutcome, OperationRegistry, QueryParams};
pub use session::{EntityLoadListener, PersistenceSession};
pub use storage::{ColumnStore, MemoryStore, StoreStats};
pub use types::{Entity, EntityKind, Row, Value};
