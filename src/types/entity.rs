//! Engine entities persisted by the provider
//!
//! `Entity` is the tagged variant the session dispatches on; `EntityKind` is its tag.

use crate::error::{PersistenceError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Type tag carried by every entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    Deployment,
    Resource,
    ProcessDefinition,
    Execution,
    VariableInstance,
    EventSubscription,
    Job,
}

impl EntityKind {
    pub const ALL: [EntityKind; 7] = [
        EntityKind::Deployment,
        EntityKind::Resource,
        EntityKind::ProcessDefinition,
        EntityKind::Execution,
        EntityKind::VariableInstance,
        EntityKind::EventSubscription,
        EntityKind::Job,
    ];

    /// Whether entities of this kind carry an optimistic-locking revision
    pub fn is_revisioned(self) -> bool {
        !matches!(self, EntityKind::Deployment | EntityKind::Resource)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Deployment => "Deployment",
            EntityKind::Resource => "Resource",
            EntityKind::ProcessDefinition => "ProcessDefinition",
            EntityKind::Execution => "Execution",
            EntityKind::VariableInstance => "VariableInstance",
            EntityKind::EventSubscription => "EventSubscription",
            EntityKind::Job => "Job",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeploymentEntity {
    pub id: String,
    pub name: Option<String>,
    /// Milliseconds since the epoch
    pub deploy_time: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceEntity {
    pub id: String,
    pub name: String,
    pub deployment_id: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessDefinitionEntity {
    pub id: String,
    pub revision: i32,
    pub key: String,
    /// Definition version within its key, not the locking revision
    pub version: i32,
    pub category: Option<String>,
    pub name: Option<String>,
    pub deployment_id: String,
    pub resource_name: Option<String>,
    pub suspension_state: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionEntity {
    pub id: String,
    pub revision: i32,
    pub process_instance_id: String,
    pub parent_id: Option<String>,
    pub process_definition_id: String,
    pub super_execution_id: Option<String>,
    pub activity_id: Option<String>,
    pub activity_instance_id: Option<String>,
    pub business_key: Option<String>,
    pub is_active: bool,
    pub is_concurrent: bool,
    pub is_scope: bool,
    pub is_event_scope: bool,
    pub suspension_state: i32,
    pub sequence_counter: i64,
}

impl ExecutionEntity {
    /// The root execution shares its id with the process instance
    pub fn is_process_instance(&self) -> bool {
        self.id == self.process_instance_id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariableInstanceEntity {
    pub id: String,
    pub revision: i32,
    pub name: String,
    pub type_name: String,
    pub execution_id: Option<String>,
    pub process_instance_id: String,
    pub task_id: Option<String>,
    pub byte_array_id: Option<String>,
    pub double_value: Option<f64>,
    pub long_value: Option<i64>,
    pub text_value: Option<String>,
    pub text_value2: Option<String>,
    pub sequence_counter: i64,
    pub is_concurrent_local: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventSubscriptionEntity {
    pub id: String,
    pub revision: i32,
    /// message, signal, compensate or conditional
    pub event_type: String,
    pub event_name: Option<String>,
    pub execution_id: Option<String>,
    pub process_instance_id: String,
    pub activity_id: Option<String>,
    pub configuration: Option<String>,
    pub created: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobEntity {
    pub id: String,
    pub revision: i32,
    /// message or timer
    pub job_type: String,
    pub execution_id: Option<String>,
    pub process_instance_id: Option<String>,
    pub process_definition_id: Option<String>,
    pub retries: i32,
    pub due_date: Option<i64>,
    pub lock_owner: Option<String>,
    pub lock_expiration_time: Option<i64>,
    pub exception_message: Option<String>,
    pub handler_type: Option<String>,
    pub handler_configuration: Option<String>,
    pub suspension_state: i32,
}

/// Revision written after `revision`; the counter does not wrap
pub fn next_revision(revision: i32) -> Result<i32> {
    revision.checked_add(1).ok_or_else(|| {
        PersistenceError::InvalidData(format!("revision {} cannot be incremented", revision))
    })
}

/// Any entity the engine hands to the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Entity {
    Deployment(DeploymentEntity),
    Resource(ResourceEntity),
    ProcessDefinition(ProcessDefinitionEntity),
    Execution(ExecutionEntity),
    VariableInstance(VariableInstanceEntity),
    EventSubscription(EventSubscriptionEntity),
    Job(JobEntity),
}

macro_rules! entity_accessor {
    ($fn_name:ident, $variant:ident, $ty:ty) => {
        pub fn $fn_name(&self) -> Result<&$ty> {
            match self {
                Entity::$variant(e) => Ok(e),
                other => Err(PersistenceError::InvalidData(format!(
                    "expected {} entity, got {} '{}'",
                    EntityKind::$variant,
                    other.kind(),
                    other.id()
                ))),
            }
        }
    };
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Deployment(_) => EntityKind::Deployment,
            Entity::Resource(_) => EntityKind::Resource,
            Entity::ProcessDefinition(_) => EntityKind::ProcessDefinition,
            Entity::Execution(_) => EntityKind::Execution,
            Entity::VariableInstance(_) => EntityKind::VariableInstance,
            Entity::EventSubscription(_) => EntityKind::EventSubscription,
            Entity::Job(_) => EntityKind::Job,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Entity::Deployment(e) => &e.id,
            Entity::Resource(e) => &e.id,
            Entity::ProcessDefinition(e) => &e.id,
            Entity::Execution(e) => &e.id,
            Entity::VariableInstance(e) => &e.id,
            Entity::EventSubscription(e) => &e.id,
            Entity::Job(e) => &e.id,
        }
    }

    /// Revision the caller read; 0 for kinds without revisions
    pub fn revision(&self) -> i32 {
        match self {
            Entity::Deployment(_) | Entity::Resource(_) => 0,
            Entity::ProcessDefinition(e) => e.revision,
            Entity::Execution(e) => e.revision,
            Entity::VariableInstance(e) => e.revision,
            Entity::EventSubscription(e) => e.revision,
            Entity::Job(e) => e.revision,
        }
    }

    pub fn revision_next(&self) -> Result<i32> {
        next_revision(self.revision())
    }

    entity_accessor!(as_deployment, Deployment, DeploymentEntity);
    entity_accessor!(as_resource, Resource, ResourceEntity);
    entity_accessor!(as_process_definition, ProcessDefinition, ProcessDefinitionEntity);
    entity_accessor!(as_execution, Execution, ExecutionEntity);
    entity_accessor!(as_variable, VariableInstance, VariableInstanceEntity);
    entity_accessor!(as_event_subscription, EventSubscription, EventSubscriptionEntity);
    entity_accessor!(as_job, Job, JobEntity);
}
