//! Entity operation handlers
//!
//! - deployments and resources are never locked; their statements go to the unlocked batch
//! - process definitions and jobs lock on their own row
//! - executions, variables and event subscriptions live inside the `cam_proc_inst` row
//!   and lock on it (see [`super::composite`])

use super::composite::{self, PROCESS_INSTANCE};
use super::EntityOperationHandler;
use crate::catalog::tables::{
    DEPLOYMENT_TABLE, EVENT_SUBSCRIPTIONS, EXECUTIONS, JOB_TABLE, PROC_DEF_TABLE,
    PROC_INST_TABLE, RESOURCE_TABLE, VARIABLES,
};
use crate::error::Result;
use crate::index::{
    JOBS_BY_EXECUTION_ID, PROC_DEF_BY_DEPLOYMENT, PROC_DEF_BY_KEY, PROC_INST_BY_BUSINESS_KEY,
    PROC_INST_BY_EXECUTION,
};
use crate::session::PersistenceSession;
use crate::storage::{Delete, Insert, Select, Update};
use crate::txn::{LockTarget, LockedBatch};
use crate::types::{Entity, EntityKind, Row, Value};
use std::sync::Arc;

/// Row of `table` by primary id, decoded as `kind`
fn load_row_entity(
    session: &PersistenceSession,
    table: &str,
    kind: EntityKind,
    id: &str,
) -> Result<Option<Arc<Entity>>> {
    match session.select_row(&Select::from(table).where_eq("id", id))? {
        Some(row) => Ok(Some(Arc::new(session.serializers().read(kind, &row)?))),
        None => Ok(None),
    }
}

/// Update statement setting every non-key column of `row`
fn update_all(table: &str, id: &str, row: Row) -> Update {
    row.into_columns()
        .into_iter()
        .filter(|(column, _)| column != "id")
        .fold(Update::table(table), |st, (column, value)| st.set(&column, value))
        .where_eq("id", id)
}

pub struct DeploymentOperations;

impl EntityOperationHandler for DeploymentOperations {
    fn kind(&self) -> EntityKind {
        EntityKind::Deployment
    }

    fn insert(&self, session: &mut PersistenceSession, entity: &Entity) -> Result<()> {
        let row = session.serializers().write(entity)?;
        session.add_unlocked_statement(Insert::into_table(DEPLOYMENT_TABLE).values(row));
        Ok(())
    }

    fn update(&self, session: &mut PersistenceSession, entity: &Entity) -> Result<()> {
        let row = session.serializers().write(entity)?;
        session.add_unlocked_statement(update_all(DEPLOYMENT_TABLE, entity.id(), row));
        Ok(())
    }

    fn delete(&self, session: &mut PersistenceSession, entity: &Entity) -> Result<()> {
        session.add_unlocked_statement(Delete::from(DEPLOYMENT_TABLE).where_eq("id", entity.id()));
        Ok(())
    }

    fn get_by_id(&self, session: &mut PersistenceSession, id: &str) -> Result<Option<Arc<Entity>>> {
        load_row_entity(session, DEPLOYMENT_TABLE, EntityKind::Deployment, id)
    }
}

pub struct ResourceOperations;

impl EntityOperationHandler for ResourceOperations {
    fn kind(&self) -> EntityKind {
        EntityKind::Resource
    }

    fn insert(&self, session: &mut PersistenceSession, entity: &Entity) -> Result<()> {
        let row = session.serializers().write(entity)?;
        session.add_unlocked_statement(Insert::into_table(RESOURCE_TABLE).values(row));
        Ok(())
    }

    fn update(&self, session: &mut PersistenceSession, entity: &Entity) -> Result<()> {
        let row = session.serializers().write(entity)?;
        session.add_unlocked_statement(update_all(RESOURCE_TABLE, entity.id(), row));
        Ok(())
    }

    fn delete(&self, session: &mut PersistenceSession, entity: &Entity) -> Result<()> {
        session.add_unlocked_statement(Delete::from(RESOURCE_TABLE).where_eq("id", entity.id()));
        Ok(())
    }

    fn get_by_id(&self, session: &mut PersistenceSession, id: &str) -> Result<Option<Arc<Entity>>> {
        load_row_entity(session, RESOURCE_TABLE, EntityKind::Resource, id)
    }
}

pub struct ProcessDefinitionOperations;

impl ProcessDefinitionOperations {
    fn target(entity: &Entity) -> LockTarget {
        LockTarget::new(PROC_DEF_TABLE, "revision", entity.id(), entity.revision())
    }
}

impl EntityOperationHandler for ProcessDefinitionOperations {
    fn kind(&self) -> EntityKind {
        EntityKind::ProcessDefinition
    }

    fn insert(&self, session: &mut PersistenceSession, entity: &Entity) -> Result<()> {
        let definition = entity.as_process_definition()?;
        let mut row = session.serializers().write(entity)?;
        row.set("revision", entity.revision_next()?);

        // fresh row: nothing to check, even if the batch was opened earlier
        let batch = session.add_locked_batch(LockedBatch::new(Self::target(entity)));
        batch.set_should_not_lock(true);
        batch.add_statement(Insert::into_table(PROC_DEF_TABLE).values(row));
        batch.add_index_statement(PROC_DEF_BY_KEY.entry(&definition.key, &definition.id));
        batch.add_index_statement(
            PROC_DEF_BY_DEPLOYMENT.entry(&definition.deployment_id, &definition.id),
        );
        Ok(())
    }

    fn update(&self, session: &mut PersistenceSession, entity: &Entity) -> Result<()> {
        let mut row = session.serializers().write(entity)?;
        // the lock statement owns the revision column
        row.remove("revision");

        let batch = session.add_locked_batch(LockedBatch::new(Self::target(entity)));
        batch.add_statement(update_all(PROC_DEF_TABLE, entity.id(), row));
        Ok(())
    }

    fn delete(&self, session: &mut PersistenceSession, entity: &Entity) -> Result<()> {
        let definition = entity.as_process_definition()?;
        let batch = session.add_locked_batch(LockedBatch::new(Self::target(entity)));
        batch.mark_deleted();
        batch.add_index_statement(PROC_DEF_BY_KEY.removal(&definition.key, &definition.id));
        batch.add_index_statement(
            PROC_DEF_BY_DEPLOYMENT.removal(&definition.deployment_id, &definition.id),
        );
        Ok(())
    }

    fn get_by_id(&self, session: &mut PersistenceSession, id: &str) -> Result<Option<Arc<Entity>>> {
        load_row_entity(session, PROC_DEF_TABLE, EntityKind::ProcessDefinition, id)
    }
}

pub struct JobOperations;

impl JobOperations {
    fn target(entity: &Entity) -> LockTarget {
        LockTarget::new(JOB_TABLE, "version", entity.id(), entity.revision())
    }
}

impl EntityOperationHandler for JobOperations {
    fn kind(&self) -> EntityKind {
        EntityKind::Job
    }

    fn insert(&self, session: &mut PersistenceSession, entity: &Entity) -> Result<()> {
        let job = entity.as_job()?;
        let mut row = session.serializers().write(entity)?;
        row.set("version", entity.revision_next()?);

        // fresh row: nothing to check, even if the batch was opened earlier
        let batch = session.add_locked_batch(LockedBatch::new(Self::target(entity)));
        batch.set_should_not_lock(true);
        batch.add_statement(Insert::into_table(JOB_TABLE).values(row));
        if let Some(execution_id) = &job.execution_id {
            batch.add_index_statement(JOBS_BY_EXECUTION_ID.entry(execution_id, &job.id));
        }
        Ok(())
    }

    fn update(&self, session: &mut PersistenceSession, entity: &Entity) -> Result<()> {
        let job = entity.as_job()?;
        let stored = session.select_row(&Select::from(JOB_TABLE).where_eq("id", &job.id))?;
        let previous_execution = match stored {
            Some(row) => row.opt_text("execution_id")?,
            None => None,
        };
        let mut row = session.serializers().write(entity)?;
        row.remove("version");

        let batch = session.add_locked_batch(LockedBatch::new(Self::target(entity)));
        batch.add_statement(update_all(JOB_TABLE, entity.id(), row));
        if previous_execution != job.execution_id {
            if let Some(previous) = &previous_execution {
                batch.add_index_statement(JOBS_BY_EXECUTION_ID.removal(previous, &job.id));
            }
        }
        if let Some(execution_id) = &job.execution_id {
            batch.add_index_statement(JOBS_BY_EXECUTION_ID.entry(execution_id, &job.id));
        }
        Ok(())
    }

    fn delete(&self, session: &mut PersistenceSession, entity: &Entity) -> Result<()> {
        let job = entity.as_job()?;
        let batch = session.add_locked_batch(LockedBatch::new(Self::target(entity)));
        batch.mark_deleted();
        if let Some(execution_id) = &job.execution_id {
            batch.add_index_statement(JOBS_BY_EXECUTION_ID.removal(execution_id, &job.id));
        }
        Ok(())
    }

    fn get_by_id(&self, session: &mut PersistenceSession, id: &str) -> Result<Option<Arc<Entity>>> {
        load_row_entity(session, JOB_TABLE, EntityKind::Job, id)
    }
}

/// Structured value for an embedded entity, carrying its next revision
fn embedded_value(session: &PersistenceSession, entity: &Entity) -> Result<Value> {
    let mut row = session.serializers().write(entity)?;
    row.set("revision", entity.revision_next()?);
    Ok(Value::Udt(row))
}

/// Embedded entity of `relation` found in a process instance composite
fn embedded_by_id(
    session: &mut PersistenceSession,
    relation: &str,
    process_instance_id: &str,
    id: &str,
) -> Result<Option<Arc<Entity>>> {
    let composite = session.select_composite_by_id(PROCESS_INSTANCE, process_instance_id)?;
    Ok(composite
        .and_then(|c| c.embedded(relation).and_then(|entities| entities.get(id)).cloned()))
}

/// Embedded entity of `relation` in any composite cached by this transaction
fn cached_embedded(session: &PersistenceSession, relation: &str, id: &str) -> Option<Arc<Entity>> {
    session
        .context()
        .cache()
        .composites()
        .find_map(|c| c.embedded(relation).and_then(|entities| entities.get(id)).cloned())
}

pub struct ExecutionOperations;

impl EntityOperationHandler for ExecutionOperations {
    fn kind(&self) -> EntityKind {
        EntityKind::Execution
    }

    fn insert(&self, session: &mut PersistenceSession, entity: &Entity) -> Result<()> {
        let execution = entity.as_execution()?;
        let value = embedded_value(session, entity)?;

        if execution.is_process_instance() {
            let target = composite::process_instance_target(&execution.id, execution.revision);
            let batch = session.add_locked_batch(LockedBatch::new(target));
            batch.set_should_not_lock(true);
            batch.add_statement(
                Insert::into_table(PROC_INST_TABLE)
                    .value("id", &execution.id)
                    .value("version", entity.revision_next()?)
                    .value("business_key", execution.business_key.clone())
                    .value("proc_def_id", &execution.process_definition_id),
            );
            batch.add_statement(
                Update::table(PROC_INST_TABLE)
                    .put_entry(EXECUTIONS, &execution.id, value)
                    .where_eq("id", &execution.id),
            );
            if let Some(business_key) = &execution.business_key {
                batch.add_index_statement(
                    PROC_INST_BY_BUSINESS_KEY.entry(business_key, &execution.id),
                );
            }
        } else {
            let batch = composite::process_instance_batch(session, &execution.process_instance_id)?;
            batch.add_statement(
                Update::table(PROC_INST_TABLE)
                    .put_entry(EXECUTIONS, &execution.id, value)
                    .where_eq("id", &execution.process_instance_id),
            );
            batch.add_index_statement(
                PROC_INST_BY_EXECUTION.entry(&execution.id, &execution.process_instance_id),
            );
        }
        Ok(())
    }

    fn update(&self, session: &mut PersistenceSession, entity: &Entity) -> Result<()> {
        let execution = entity.as_execution()?;
        let value = embedded_value(session, entity)?;

        if execution.is_process_instance() {
            let loaded = session.select_composite_by_id(PROCESS_INSTANCE, &execution.id)?;
            let previous_key = match loaded {
                Some(instance) => instance.primary().as_execution()?.business_key.clone(),
                None => None,
            };
            let target = composite::process_instance_target(&execution.id, execution.revision);
            let batch = session.add_locked_batch(LockedBatch::new(target));
            batch.add_statement(
                Update::table(PROC_INST_TABLE)
                    .set("business_key", execution.business_key.clone())
                    .put_entry(EXECUTIONS, &execution.id, value)
                    .where_eq("id", &execution.id),
            );
            if previous_key != execution.business_key {
                if let Some(previous) = &previous_key {
                    batch.add_index_statement(
                        PROC_INST_BY_BUSINESS_KEY.removal(previous, &execution.id),
                    );
                }
            }
            if let Some(business_key) = &execution.business_key {
                batch.add_index_statement(
                    PROC_INST_BY_BUSINESS_KEY.entry(business_key, &execution.id),
                );
            }
        } else {
            let batch = composite::process_instance_batch(session, &execution.process_instance_id)?;
            batch.add_statement(
                Update::table(PROC_INST_TABLE)
                    .put_entry(EXECUTIONS, &execution.id, value)
                    .where_eq("id", &execution.process_instance_id),
            );
        }
        Ok(())
    }

    fn delete(&self, session: &mut PersistenceSession, entity: &Entity) -> Result<()> {
        let execution = entity.as_execution()?;

        if execution.is_process_instance() {
            let target = composite::process_instance_target(&execution.id, execution.revision);
            let batch = session.add_locked_batch(LockedBatch::new(target));
            batch.mark_deleted();
            if let Some(business_key) = &execution.business_key {
                batch.add_index_statement(
                    PROC_INST_BY_BUSINESS_KEY.removal(business_key, &execution.id),
                );
            }
        } else {
            let batch = composite::process_instance_batch(session, &execution.process_instance_id)?;
            batch.add_statement(
                Update::table(PROC_INST_TABLE)
                    .remove_entry(EXECUTIONS, &execution.id)
                    .where_eq("id", &execution.process_instance_id),
            );
            batch.add_index_statement(
                PROC_INST_BY_EXECUTION.removal(&execution.id, &execution.process_instance_id),
            );
        }
        Ok(())
    }

    fn get_by_id(&self, session: &mut PersistenceSession, id: &str) -> Result<Option<Arc<Entity>>> {
        let process_instance_id = match session.lookup_index(PROC_INST_BY_EXECUTION, id)?.pop() {
            Some(process_instance_id) => process_instance_id,
            None => id.to_string(),
        };
        embedded_by_id(session, EXECUTIONS, &process_instance_id, id)
    }
}

pub struct VariableOperations;

impl EntityOperationHandler for VariableOperations {
    fn kind(&self) -> EntityKind {
        EntityKind::VariableInstance
    }

    fn insert(&self, session: &mut PersistenceSession, entity: &Entity) -> Result<()> {
        let variable = entity.as_variable()?;
        let value = embedded_value(session, entity)?;
        let batch = composite::process_instance_batch(session, &variable.process_instance_id)?;
        batch.add_statement(
            Update::table(PROC_INST_TABLE)
                .put_entry(VARIABLES, &variable.id, value)
                .where_eq("id", &variable.process_instance_id),
        );
        Ok(())
    }

    fn update(&self, session: &mut PersistenceSession, entity: &Entity) -> Result<()> {
        self.insert(session, entity)
    }

    fn delete(&self, session: &mut PersistenceSession, entity: &Entity) -> Result<()> {
        let variable = entity.as_variable()?;
        let batch = composite::process_instance_batch(session, &variable.process_instance_id)?;
        batch.add_statement(
            Update::table(PROC_INST_TABLE)
                .remove_entry(VARIABLES, &variable.id)
                .where_eq("id", &variable.process_instance_id),
        );
        Ok(())
    }

    /// Only variables of process instances already loaded in this transaction are found
    fn get_by_id(&self, session: &mut PersistenceSession, id: &str) -> Result<Option<Arc<Entity>>> {
        Ok(cached_embedded(session, VARIABLES, id))
    }
}

pub struct EventSubscriptionOperations;

impl EntityOperationHandler for EventSubscriptionOperations {
    fn kind(&self) -> EntityKind {
        EntityKind::EventSubscription
    }

    fn insert(&self, session: &mut PersistenceSession, entity: &Entity) -> Result<()> {
        let subscription = entity.as_event_subscription()?;
        let value = embedded_value(session, entity)?;
        let batch = composite::process_instance_batch(session, &subscription.process_instance_id)?;
        batch.add_statement(
            Update::table(PROC_INST_TABLE)
                .put_entry(EVENT_SUBSCRIPTIONS, &subscription.id, value)
                .where_eq("id", &subscription.process_instance_id),
        );
        Ok(())
    }

    fn update(&self, session: &mut PersistenceSession, entity: &Entity) -> Result<()> {
        self.insert(session, entity)
    }

    fn delete(&self, session: &mut PersistenceSession, entity: &Entity) -> Result<()> {
        let subscription = entity.as_event_subscription()?;
        let batch = composite::process_instance_batch(session, &subscription.process_instance_id)?;
        batch.add_statement(
            Update::table(PROC_INST_TABLE)
                .remove_entry(EVENT_SUBSCRIPTIONS, &subscription.id)
                .where_eq("id", &subscription.process_instance_id),
        );
        Ok(())
    }

    /// Only subscriptions of process instances already loaded in this transaction are found
    fn get_by_id(&self, session: &mut PersistenceSession, id: &str) -> Result<Option<Arc<Entity>>> {
        Ok(cached_embedded(session, EVENT_SUBSCRIPTIONS, id))
    }
}
