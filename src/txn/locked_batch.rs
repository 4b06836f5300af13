//! Per-entity statement group with an optimistic revision check
//!
//! One `LockedBatch` exists per locked row and transaction. Handlers append the data
//! statements for that row (and index maintenance to the separate index list); at
//! commit the batch contributes exactly one conditional statement:
//!
//! | state                       | lock statement                                   |
//! |-----------------------------|--------------------------------------------------|
//! | locked, row updated         | `UPDATE t SET col = rev + 1 WHERE id = ? IF col = rev` |
//! | locked, row deleted         | `DELETE FROM t WHERE id = ? IF col = rev`        |
//! | fresh (`should_not_lock`), deleted | `DELETE FROM t WHERE id = ?`              |
//! | fresh                       | none                                             |

use crate::error::Result;
use crate::storage::{Batch, Delete, Statement, Update};
use crate::types::next_revision;

/// Row whose revision column guards the batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockTarget {
    pub table: String,
    pub revision_column: String,
    pub id: String,
    /// Revision the transaction read
    pub revision: i32,
}

impl LockTarget {
    pub fn new(table: &str, revision_column: &str, id: &str, revision: i32) -> Self {
        Self {
            table: table.to_string(),
            revision_column: revision_column.to_string(),
            id: id.to_string(),
            revision,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LockedBatch {
    target: LockTarget,
    should_not_lock: bool,
    delete_row: bool,
    statements: Vec<Statement>,
    index_statements: Vec<Statement>,
}

impl LockedBatch {
    pub fn new(target: LockTarget) -> Self {
        Self {
            target,
            should_not_lock: false,
            delete_row: false,
            statements: Vec::new(),
            index_statements: Vec::new(),
        }
    }

    /// Batch for a row created in this transaction; nothing to check against
    pub fn unlocked(target: LockTarget) -> Self {
        let mut batch = Self::new(target);
        batch.should_not_lock = true;
        batch
    }

    pub fn id(&self) -> &str {
        &self.target.id
    }

    pub fn target(&self) -> &LockTarget {
        &self.target
    }

    pub fn should_not_lock(&self) -> bool {
        self.should_not_lock
    }

    pub fn set_should_not_lock(&mut self, should_not_lock: bool) {
        self.should_not_lock = should_not_lock;
    }

    /// The guarded row itself is deleted by this transaction
    pub fn mark_deleted(&mut self) {
        self.delete_row = true;
    }

    pub fn is_deleted(&self) -> bool {
        self.delete_row
    }

    pub fn add_statement(&mut self, statement: impl Into<Statement>) {
        self.statements.push(statement.into());
    }

    pub fn add_index_statement(&mut self, statement: impl Into<Statement>) {
        self.index_statements.push(statement.into());
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn index_statements(&self) -> &[Statement] {
        &self.index_statements
    }

    /// Whether the batch contributes a lock statement at commit
    pub fn has_lock_statement(&self) -> bool {
        !self.should_not_lock || self.delete_row
    }

    pub fn lock_statement(&self) -> Result<Option<Statement>> {
        let t = &self.target;
        let statement = match (self.should_not_lock, self.delete_row) {
            (false, false) => Some(
                Update::table(&t.table)
                    .set(&t.revision_column, next_revision(t.revision)?)
                    .where_eq("id", &t.id)
                    .only_if(&t.revision_column, t.revision)
                    .into(),
            ),
            (false, true) => Some(
                Delete::from(&t.table)
                    .where_eq("id", &t.id)
                    .only_if(&t.revision_column, t.revision)
                    .into(),
            ),
            (true, true) => Some(Delete::from(&t.table).where_eq("id", &t.id).into()),
            (true, false) => None,
        };
        Ok(statement)
    }

    /// Split into the primary batch (data + lock statement) and the index batch
    pub fn into_batches(self) -> Result<(Batch, Batch)> {
        let lock = self.lock_statement()?;
        let mut primary = Batch::new();
        primary.extend(self.statements);
        if let Some(lock) = lock {
            primary.add(lock);
        }
        let mut index = Batch::new();
        index.extend(self.index_statements);
        Ok((primary, index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Insert;

    fn target() -> LockTarget {
        LockTarget::new("cam_proc_inst", "version", "pi1", 3)
    }

    #[test]
    fn test_update_lock() {
        let batch = LockedBatch::new(target());
        assert_eq!(
            batch.lock_statement().unwrap().unwrap().to_string(),
            "UPDATE cam_proc_inst SET version = 4 WHERE id = 'pi1' IF version = 3"
        );
    }

    #[test]
    fn test_delete_variants() {
        let mut locked = LockedBatch::new(target());
        locked.mark_deleted();
        assert_eq!(
            locked.lock_statement().unwrap().unwrap().to_string(),
            "DELETE FROM cam_proc_inst WHERE id = 'pi1' IF version = 3"
        );

        let mut fresh = LockedBatch::unlocked(target());
        assert!(fresh.lock_statement().unwrap().is_none());
        assert!(!fresh.has_lock_statement());
        fresh.mark_deleted();
        assert!(fresh.has_lock_statement());
        let st = fresh.lock_statement().unwrap().unwrap();
        assert!(!st.is_conditional());
    }

    #[test]
    fn test_into_batches() {
        let mut batch = LockedBatch::new(target());
        batch.add_statement(Insert::into_table("cam_proc_inst").value("id", "pi1"));
        batch.add_index_statement(Insert::into_table("cam_index").value("idx_name", "x"));

        let (primary, index) = batch.into_batches().unwrap();
        assert_eq!(primary.len(), 2);
        assert!(primary.has_conditions());
        assert_eq!(index.len(), 1);
        assert!(!index.has_conditions());
    }

    #[test]
    fn test_lock_at_max_revision_is_rejected() {
        let batch = LockedBatch::new(LockTarget::new("cam_job", "version", "j1", i32::MAX));
        assert!(matches!(
            batch.lock_statement(),
            Err(crate::error::PersistenceError::InvalidData(_))
        ));
        assert!(batch.into_batches().is_err());
    }
}
