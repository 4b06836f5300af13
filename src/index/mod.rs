//! Secondary index layer
//!
//! Inverted lookup rows in `cam_index`, partitioned by `(idx_name, idx_value)` with the
//! referenced primary id as clustering column. Writers add entry/removal statements to
//! a batch; readers get back primary ids only and resolve them through the by-id path.

use crate::catalog::tables::INDEX_TABLE;
use crate::error::Result;
use crate::storage::{ColumnStore, Delete, Insert, Select, Statement};
use std::fmt;

/// Named index over `cam_index`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SecondaryIndex {
    name: &'static str,
}

/// Process definition ids by definition key
pub const PROC_DEF_BY_KEY: SecondaryIndex = SecondaryIndex::new("proc_def_by_key");
/// Process definition ids by deployment id
pub const PROC_DEF_BY_DEPLOYMENT: SecondaryIndex = SecondaryIndex::new("proc_def_by_deployment");
/// Process instance id by (non-root) execution id
pub const PROC_INST_BY_EXECUTION: SecondaryIndex = SecondaryIndex::new("proc_inst_by_execution");
pub const PROC_INST_BY_BUSINESS_KEY: SecondaryIndex =
    SecondaryIndex::new("proc_inst_by_business_key");
pub const JOBS_BY_EXECUTION_ID: SecondaryIndex = SecondaryIndex::new("jobs_by_execution_id");

impl SecondaryIndex {
    pub const fn new(name: &'static str) -> Self {
        Self { name }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Statement recording `value -> id`
    pub fn entry(&self, value: &str, id: &str) -> Statement {
        Insert::into_table(INDEX_TABLE)
            .value("idx_name", self.name)
            .value("idx_value", value)
            .value("val", id)
            .into()
    }

    pub fn removal(&self, value: &str, id: &str) -> Statement {
        Delete::from(INDEX_TABLE)
            .where_eq("idx_name", self.name)
            .where_eq("idx_value", value)
            .where_eq("val", id)
            .into()
    }

    /// Primary ids recorded under `value`, in clustering order
    pub fn lookup(&self, store: &dyn ColumnStore, value: &str) -> Result<Vec<String>> {
        let select = Select::from(INDEX_TABLE)
            .where_eq("idx_name", self.name)
            .where_eq("idx_value", value);
        store
            .select(&select)?
            .iter()
            .map(|row| row.text("val"))
            .collect()
    }

    /// First id recorded under `value`
    pub fn lookup_one(&self, store: &dyn ColumnStore, value: &str) -> Result<Option<String>> {
        Ok(self.lookup(store, value)?.into_iter().next())
    }
}

impl fmt::Display for SecondaryIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SchemaRegistry;
    use crate::storage::{Batch, MemoryStore};

    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        SchemaRegistry::engine().create_schema(&store).unwrap();
        store
    }

    #[test]
    fn test_entry_and_lookup() {
        let store = store();
        let mut batch = Batch::new();
        batch.add(JOBS_BY_EXECUTION_ID.entry("ex1", "j2"));
        batch.add(JOBS_BY_EXECUTION_ID.entry("ex1", "j1"));
        batch.add(JOBS_BY_EXECUTION_ID.entry("ex2", "j3"));
        batch.add(PROC_DEF_BY_KEY.entry("ex1", "other"));
        store.execute_batch(&batch).unwrap();

        assert_eq!(
            JOBS_BY_EXECUTION_ID.lookup(&store, "ex1").unwrap(),
            vec!["j1".to_string(), "j2".to_string()]
        );
        assert!(JOBS_BY_EXECUTION_ID.lookup(&store, "missing").unwrap().is_empty());
    }

    #[test]
    fn test_removal() {
        let store = store();
        let mut batch = Batch::new();
        batch.add(PROC_INST_BY_BUSINESS_KEY.entry("order-7", "pi1"));
        store.execute_batch(&batch).unwrap();

        let mut batch = Batch::new();
        batch.add(PROC_INST_BY_BUSINESS_KEY.removal("order-7", "pi1"));
        store.execute_batch(&batch).unwrap();

        assert_eq!(PROC_INST_BY_BUSINESS_KEY.lookup_one(&store, "order-7").unwrap(), None);
    }

    #[test]
    fn test_entry_rendering() {
        assert_eq!(
            PROC_DEF_BY_KEY.entry("invoice", "invoice:1").to_string(),
            "INSERT INTO cam_index (idx_name, idx_value, val) \
             VALUES ('proc_def_by_key', 'invoice', 'invoice:1')"
        );
    }
}
