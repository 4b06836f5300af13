//! Row codecs for the engine entities
//!
//! Column names follow the table and type definitions in `catalog::tables`.
//! Revisions are written as found on the entity; handlers override the revision
//! column when they store the next one.

use super::EntitySerializer;
use crate::error::Result;
use crate::types::{
    DeploymentEntity, Entity, EntityKind, EventSubscriptionEntity, ExecutionEntity, JobEntity,
    ProcessDefinitionEntity, ResourceEntity, Row, VariableInstanceEntity,
};

pub struct DeploymentSerializer;

impl EntitySerializer for DeploymentSerializer {
    fn kind(&self) -> EntityKind {
        EntityKind::Deployment
    }

    fn write(&self, entity: &Entity) -> Result<Row> {
        let e = entity.as_deployment()?;
        Ok(Row::new()
            .with("id", &e.id)
            .with("name", e.name.clone())
            .with("deploy_time", e.deploy_time))
    }

    fn read(&self, row: &Row) -> Result<Entity> {
        Ok(Entity::Deployment(DeploymentEntity {
            id: row.text("id")?,
            name: row.opt_text("name")?,
            deploy_time: row.opt_bigint("deploy_time")?.unwrap_or(0),
        }))
    }
}

pub struct ResourceSerializer;

impl EntitySerializer for ResourceSerializer {
    fn kind(&self) -> EntityKind {
        EntityKind::Resource
    }

    fn write(&self, entity: &Entity) -> Result<Row> {
        let e = entity.as_resource()?;
        Ok(Row::new()
            .with("id", &e.id)
            .with("name", &e.name)
            .with("deployment_id", &e.deployment_id)
            .with("content", e.content.clone()))
    }

    fn read(&self, row: &Row) -> Result<Entity> {
        Ok(Entity::Resource(ResourceEntity {
            id: row.text("id")?,
            name: row.opt_text("name")?.unwrap_or_default(),
            deployment_id: row.opt_text("deployment_id")?.unwrap_or_default(),
            content: row.blob("content")?,
        }))
    }
}

pub struct ProcessDefinitionSerializer;

impl EntitySerializer for ProcessDefinitionSerializer {
    fn kind(&self) -> EntityKind {
        EntityKind::ProcessDefinition
    }

    fn write(&self, entity: &Entity) -> Result<Row> {
        let e = entity.as_process_definition()?;
        Ok(Row::new()
            .with("id", &e.id)
            .with("revision", e.revision)
            .with("key", &e.key)
            .with("version", e.version)
            .with("category", e.category.clone())
            .with("name", e.name.clone())
            .with("deployment_id", &e.deployment_id)
            .with("resource_name", e.resource_name.clone())
            .with("suspension_state", e.suspension_state))
    }

    fn read(&self, row: &Row) -> Result<Entity> {
        Ok(Entity::ProcessDefinition(ProcessDefinitionEntity {
            id: row.text("id")?,
            revision: row.opt_int("revision")?.unwrap_or(0),
            key: row.text("key")?,
            version: row.opt_int("version")?.unwrap_or(0),
            category: row.opt_text("category")?,
            name: row.opt_text("name")?,
            deployment_id: row.opt_text("deployment_id")?.unwrap_or_default(),
            resource_name: row.opt_text("resource_name")?,
            suspension_state: row.opt_int("suspension_state")?.unwrap_or(1),
        }))
    }
}

/// Encodes into the `execution` structured type
pub struct ExecutionSerializer;

impl EntitySerializer for ExecutionSerializer {
    fn kind(&self) -> EntityKind {
        EntityKind::Execution
    }

    fn write(&self, entity: &Entity) -> Result<Row> {
        let e = entity.as_execution()?;
        Ok(Row::new()
            .with("id", &e.id)
            .with("revision", e.revision)
            .with("proc_inst_id", &e.process_instance_id)
            .with("parent_id", e.parent_id.clone())
            .with("proc_def_id", &e.process_definition_id)
            .with("super_exec", e.super_execution_id.clone())
            .with("act_id", e.activity_id.clone())
            .with("act_inst_id", e.activity_instance_id.clone())
            .with("business_key", e.business_key.clone())
            .with("is_active", e.is_active)
            .with("is_concurrent", e.is_concurrent)
            .with("is_scope", e.is_scope)
            .with("is_event_scope", e.is_event_scope)
            .with("suspension_state", e.suspension_state)
            .with("sequence_counter", e.sequence_counter))
    }

    fn read(&self, row: &Row) -> Result<Entity> {
        Ok(Entity::Execution(ExecutionEntity {
            id: row.text("id")?,
            revision: row.opt_int("revision")?.unwrap_or(0),
            process_instance_id: row.text("proc_inst_id")?,
            parent_id: row.opt_text("parent_id")?,
            process_definition_id: row.opt_text("proc_def_id")?.unwrap_or_default(),
            super_execution_id: row.opt_text("super_exec")?,
            activity_id: row.opt_text("act_id")?,
            activity_instance_id: row.opt_text("act_inst_id")?,
            business_key: row.opt_text("business_key")?,
            is_active: row.boolean("is_active")?,
            is_concurrent: row.boolean("is_concurrent")?,
            is_scope: row.boolean("is_scope")?,
            is_event_scope: row.boolean("is_event_scope")?,
            suspension_state: row.opt_int("suspension_state")?.unwrap_or(1),
            sequence_counter: row.opt_bigint("sequence_counter")?.unwrap_or(0),
        }))
    }
}

/// Encodes into the `variable` structured type
pub struct VariableInstanceSerializer;

impl EntitySerializer for VariableInstanceSerializer {
    fn kind(&self) -> EntityKind {
        EntityKind::VariableInstance
    }

    fn write(&self, entity: &Entity) -> Result<Row> {
        let e = entity.as_variable()?;
        Ok(Row::new()
            .with("id", &e.id)
            .with("revision", e.revision)
            .with("type", &e.type_name)
            .with("name", &e.name)
            .with("execution_id", e.execution_id.clone())
            .with("proc_inst_id", &e.process_instance_id)
            .with("task_id", e.task_id.clone())
            .with("bytearray_id", e.byte_array_id.clone())
            .with("double", e.double_value)
            .with("long", e.long_value)
            .with("text", e.text_value.clone())
            .with("text2", e.text_value2.clone())
            .with("sequence_counter", e.sequence_counter)
            .with("is_concurrent_local", e.is_concurrent_local))
    }

    fn read(&self, row: &Row) -> Result<Entity> {
        Ok(Entity::VariableInstance(VariableInstanceEntity {
            id: row.text("id")?,
            revision: row.opt_int("revision")?.unwrap_or(0),
            name: row.text("name")?,
            type_name: row.opt_text("type")?.unwrap_or_default(),
            execution_id: row.opt_text("execution_id")?,
            process_instance_id: row.opt_text("proc_inst_id")?.unwrap_or_default(),
            task_id: row.opt_text("task_id")?,
            byte_array_id: row.opt_text("bytearray_id")?,
            double_value: row.opt_double("double")?,
            long_value: row.opt_bigint("long")?,
            text_value: row.opt_text("text")?,
            text_value2: row.opt_text("text2")?,
            sequence_counter: row.opt_bigint("sequence_counter")?.unwrap_or(0),
            is_concurrent_local: row.boolean("is_concurrent_local")?,
        }))
    }
}

/// Encodes into the `event_subscription` structured type
pub struct EventSubscriptionSerializer;

impl EntitySerializer for EventSubscriptionSerializer {
    fn kind(&self) -> EntityKind {
        EntityKind::EventSubscription
    }

    fn write(&self, entity: &Entity) -> Result<Row> {
        let e = entity.as_event_subscription()?;
        Ok(Row::new()
            .with("id", &e.id)
            .with("revision", e.revision)
            .with("event_type", &e.event_type)
            .with("event_name", e.event_name.clone())
            .with("execution_id", e.execution_id.clone())
            .with("proc_inst_id", &e.process_instance_id)
            .with("activity_id", e.activity_id.clone())
            .with("configuration", e.configuration.clone())
            .with("created", e.created))
    }

    fn read(&self, row: &Row) -> Result<Entity> {
        Ok(Entity::EventSubscription(EventSubscriptionEntity {
            id: row.text("id")?,
            revision: row.opt_int("revision")?.unwrap_or(0),
            event_type: row.text("event_type")?,
            event_name: row.opt_text("event_name")?,
            execution_id: row.opt_text("execution_id")?,
            process_instance_id: row.opt_text("proc_inst_id")?.unwrap_or_default(),
            activity_id: row.opt_text("activity_id")?,
            configuration: row.opt_text("configuration")?,
            created: row.opt_bigint("created")?.unwrap_or(0),
        }))
    }
}

pub struct JobSerializer;

impl EntitySerializer for JobSerializer {
    fn kind(&self) -> EntityKind {
        EntityKind::Job
    }

    fn write(&self, entity: &Entity) -> Result<Row> {
        let e = entity.as_job()?;
        Ok(Row::new()
            .with("id", &e.id)
            .with("version", e.revision)
            .with("type", &e.job_type)
            .with("execution_id", e.execution_id.clone())
            .with("proc_inst_id", e.process_instance_id.clone())
            .with("proc_def_id", e.process_definition_id.clone())
            .with("retries", e.retries)
            .with("duedate", e.due_date)
            .with("lock_owner", e.lock_owner.clone())
            .with("lock_exp_time", e.lock_expiration_time)
            .with("exception_msg", e.exception_message.clone())
            .with("handler_type", e.handler_type.clone())
            .with("handler_cfg", e.handler_configuration.clone())
            .with("suspension_state", e.suspension_state))
    }

    fn read(&self, row: &Row) -> Result<Entity> {
        Ok(Entity::Job(JobEntity {
            id: row.text("id")?,
            revision: row.opt_int("version")?.unwrap_or(0),
            job_type: row.opt_text("type")?.unwrap_or_default(),
            execution_id: row.opt_text("execution_id")?,
            process_instance_id: row.opt_text("proc_inst_id")?,
            process_definition_id: row.opt_text("proc_def_id")?,
            retries: row.opt_int("retries")?.unwrap_or(0),
            due_date: row.opt_bigint("duedate")?,
            lock_owner: row.opt_text("lock_owner")?,
            lock_expiration_time: row.opt_bigint("lock_exp_time")?,
            exception_message: row.opt_text("exception_msg")?,
            handler_type: row.opt_text("handler_type")?,
            handler_configuration: row.opt_text("handler_cfg")?,
            suspension_state: row.opt_int("suspension_state")?.unwrap_or(1),
        }))
    }
}
