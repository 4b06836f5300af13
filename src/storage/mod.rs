//! Column-store client surface
//!
//! The provider never talks to a wire driver directly. Everything it needs from the
//! downstream store is captured by [`ColumnStore`]: batched writes reporting per-row
//! `[applied]` flags, equality reads, DDL, and a cluster-wide monotonic timestamp.
//!
//! [`MemoryStore`] is the in-process reference implementation.

pub mod checksum;
pub mod memory;
pub mod snapshot;
pub mod statement;
pub mod timestamp;

pub use memory::{MemoryStore, StoreStats};
pub use statement::{
    Assignment, Batch, Clause, Condition, Delete, Insert, Select, Statement, Update,
};
pub use timestamp::MonotonicTimestamps;

use crate::error::Result;
use crate::types::{Row, SchemaStatement};

/// Result row of a batch execution
///
/// Conditional batches return one row; `applied` is false when any condition failed,
/// in which case `columns` holds the current values of the checked columns.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub applied: bool,
    pub columns: Row,
}

impl ResultRow {
    pub fn applied() -> Self {
        Self {
            applied: true,
            columns: Row::new(),
        }
    }

    pub fn rejected(columns: Row) -> Self {
        Self {
            applied: false,
            columns,
        }
    }
}

pub trait ColumnStore: Send + Sync {
    /// Execute a logged batch atomically; returns the `[applied]` rows
    fn execute_batch(&self, batch: &Batch) -> Result<Vec<ResultRow>>;

    fn select(&self, select: &Select) -> Result<Vec<Row>>;

    fn execute_schema(&self, statement: &SchemaStatement) -> Result<()>;

    fn table_exists(&self, table: &str) -> bool;

    fn count(&self, table: &str) -> Result<u64>;

    /// Next value of the cluster-wide monotonic write clock (microseconds)
    fn next_timestamp(&self) -> i64;

    /// First row matching `select`, if any
    fn select_one(&self, select: &Select) -> Result<Option<Row>> {
        let select = select.clone().limit(1);
        Ok(self.select(&select)?.into_iter().next())
    }
}
