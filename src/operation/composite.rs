//! Process instance aggregate
//!
//! A process instance is one `cam_proc_inst` row: the root execution, its child
//! executions, variables and event subscriptions sit in map columns of frozen
//! structured values. The row's `version` column is the optimistic lock for every
//! entity embedded in it, and it is the revision reported for the root execution.

use super::CompositeEntityLoader;
use crate::cache::LoadedCompositeEntity;
use crate::catalog::tables::{EVENT_SUBSCRIPTIONS, EXECUTIONS, PROC_INST_TABLE, VARIABLES};
use crate::error::{PersistenceError, Result};
use crate::session::PersistenceSession;
use crate::storage::Select;
use crate::txn::{LockTarget, LockedBatch};
use crate::types::{Entity, EntityKind};
use std::sync::Arc;

/// Composite name of the process instance aggregate
pub const PROCESS_INSTANCE: &str = "processInstance";

pub fn process_instance_target(process_instance_id: &str, revision: i32) -> LockTarget {
    LockTarget::new(PROC_INST_TABLE, "version", process_instance_id, revision)
}

/// Locked batch of the process instance `process_instance_id`
///
/// Opened on first use with the revision of the process instance as this transaction
/// knows it: from the cached aggregate, otherwise loaded from the store.
pub fn process_instance_batch<'s>(
    session: &'s mut PersistenceSession,
    process_instance_id: &str,
) -> Result<&'s mut LockedBatch> {
    if session.context().locked_batch(process_instance_id).is_none() {
        let composite = session
            .select_composite_by_id(PROCESS_INSTANCE, process_instance_id)?
            .ok_or_else(|| {
                PersistenceError::InvalidData(format!(
                    "process instance '{}' not found",
                    process_instance_id
                ))
            })?;
        let revision = composite.primary().revision();
        return Ok(session.add_locked_batch(LockedBatch::new(process_instance_target(
            process_instance_id,
            revision,
        ))));
    }
    session.locked_batch_mut(process_instance_id).ok_or_else(|| {
        PersistenceError::InvalidData(format!(
            "no batch for process instance '{}'",
            process_instance_id
        ))
    })
}

pub struct ProcessInstanceLoader;

impl CompositeEntityLoader for ProcessInstanceLoader {
    fn name(&self) -> &str {
        PROCESS_INSTANCE
    }

    fn load(
        &self,
        session: &mut PersistenceSession,
        id: &str,
    ) -> Result<Option<LoadedCompositeEntity>> {
        let row = match session.select_row(&Select::from(PROC_INST_TABLE).where_eq("id", id))? {
            Some(row) => row,
            None => return Ok(None),
        };
        let version = row.opt_int("version")?.unwrap_or(0);
        let serializers = session.serializers();

        let mut executions = Vec::new();
        let mut primary = None;
        for (execution_id, value) in row.map(EXECUTIONS)? {
            let mut entity = serializers.read_udt(EntityKind::Execution, &value)?;
            if execution_id == id {
                if let Entity::Execution(root) = &mut entity {
                    root.revision = version;
                }
                let entity = Arc::new(entity);
                primary = Some(Arc::clone(&entity));
                executions.push(entity);
            } else {
                executions.push(Arc::new(entity));
            }
        }
        let primary = primary.ok_or_else(|| {
            PersistenceError::InvalidData(format!(
                "process instance '{}' has no root execution",
                id
            ))
        })?;

        let mut composite = LoadedCompositeEntity::new(primary);
        for execution in executions {
            composite.embed(EXECUTIONS, execution);
        }
        for value in row.map(VARIABLES)?.values() {
            let entity = serializers.read_udt(EntityKind::VariableInstance, value)?;
            composite.embed(VARIABLES, Arc::new(entity));
        }
        for value in row.map(EVENT_SUBSCRIPTIONS)?.values() {
            let entity = serializers.read_udt(EntityKind::EventSubscription, value)?;
            composite.embed(EVENT_SUBSCRIPTIONS, Arc::new(entity));
        }
        Ok(Some(composite))
    }
}
