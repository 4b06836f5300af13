//! Named queries registered by the standard operation registry
//!
//! Single-result handlers return the entity without reporting it; the session fires
//! the loaded notification for whatever a query returns.

use crate::catalog::tables::{EVENT_SUBSCRIPTIONS, EXECUTIONS, VARIABLES};
use crate::error::Result;
use crate::index::{
    JOBS_BY_EXECUTION_ID, PROC_DEF_BY_DEPLOYMENT, PROC_DEF_BY_KEY, PROC_INST_BY_BUSINESS_KEY,
};
use crate::operation::{ListQueryHandler, QueryParams, SingleResultQueryHandler, PROCESS_INSTANCE};
use crate::session::PersistenceSession;
use crate::types::{Entity, EntityKind};
use std::sync::Arc;

/// Embedded entities of `relation` in the process instance owning `execution_id`
fn embedded_for_execution(
    session: &mut PersistenceSession,
    relation: &str,
    execution_id: &str,
) -> Result<Vec<Arc<Entity>>> {
    let process_instance_id = match session.fetch_by_id(EntityKind::Execution, execution_id)? {
        Some(execution) => execution.as_execution()?.process_instance_id.clone(),
        None => return Ok(Vec::new()),
    };
    let composite = match session.select_composite_by_id(PROCESS_INSTANCE, &process_instance_id)? {
        Some(composite) => composite,
        None => return Ok(Vec::new()),
    };
    Ok(composite
        .embedded(relation)
        .map(|entities| entities.values().cloned().collect())
        .unwrap_or_default())
}

/// `selectLatestProcessDefinitionByKey`: highest version among the definitions with `key`
pub struct SelectLatestProcessDefinitionByKey;

impl SingleResultQueryHandler for SelectLatestProcessDefinitionByKey {
    fn execute(
        &self,
        session: &mut PersistenceSession,
        params: &QueryParams,
    ) -> Result<Option<Arc<Entity>>> {
        let key = params.require("key")?;
        let mut latest: Option<(i32, Arc<Entity>)> = None;
        for entity in session.fetch_by_index(EntityKind::ProcessDefinition, PROC_DEF_BY_KEY, key)? {
            let version = entity.as_process_definition()?.version;
            if latest.as_ref().map_or(true, |(v, _)| version > *v) {
                latest = Some((version, entity));
            }
        }
        Ok(latest.map(|(_, entity)| entity))
    }
}

/// `selectProcessDefinitionByDeploymentAndKey`
pub struct SelectProcessDefinitionByDeploymentAndKey;

impl SingleResultQueryHandler for SelectProcessDefinitionByDeploymentAndKey {
    fn execute(
        &self,
        session: &mut PersistenceSession,
        params: &QueryParams,
    ) -> Result<Option<Arc<Entity>>> {
        let deployment_id = params.require("deploymentId")?;
        let key = params.require("processDefinitionKey")?;
        let definitions = session.fetch_by_index(
            EntityKind::ProcessDefinition,
            PROC_DEF_BY_DEPLOYMENT,
            deployment_id,
        )?;
        for entity in definitions {
            if entity.as_process_definition()?.key == key {
                return Ok(Some(entity));
            }
        }
        Ok(None)
    }
}

/// `selectExecutionsByQueryCriteria`: all executions of a process instance
pub struct SelectExecutionsByQueryCriteria;

impl ListQueryHandler for SelectExecutionsByQueryCriteria {
    fn execute(
        &self,
        session: &mut PersistenceSession,
        params: &QueryParams,
    ) -> Result<Vec<Arc<Entity>>> {
        let process_instance_id = params.require("processInstanceId")?;
        let composite = session.select_composite_by_id(PROCESS_INSTANCE, process_instance_id)?;
        Ok(composite
            .and_then(|c| c.embedded(EXECUTIONS).map(|e| e.values().cloned().collect()))
            .unwrap_or_default())
    }
}

/// `selectProcessInstanceByQueryCriteria` by `processInstanceId` or `businessKey`
pub struct SelectProcessInstanceByQueryCriteria;

impl ListQueryHandler for SelectProcessInstanceByQueryCriteria {
    fn execute(
        &self,
        session: &mut PersistenceSession,
        params: &QueryParams,
    ) -> Result<Vec<Arc<Entity>>> {
        let business_key = params.named("businessKey");
        let ids = match (params.named("processInstanceId"), business_key) {
            (Some(id), _) => vec![id.to_string()],
            (None, Some(key)) => session.lookup_index(PROC_INST_BY_BUSINESS_KEY, key)?,
            (None, None) => vec![params.require("processInstanceId")?.to_string()],
        };

        let mut instances = Vec::with_capacity(ids.len());
        for id in ids {
            let composite = match session.select_composite_by_id(PROCESS_INSTANCE, &id)? {
                Some(composite) => composite,
                None => continue,
            };
            let primary = composite.primary();
            if let Some(key) = business_key {
                if primary.as_execution()?.business_key.as_deref() != Some(key) {
                    continue;
                }
            }
            instances.push(Arc::clone(primary));
        }
        Ok(instances)
    }
}

/// `selectEventSubscriptionsByExecutionAndType`
pub struct SelectEventSubscriptionsByExecutionAndType;

impl ListQueryHandler for SelectEventSubscriptionsByExecutionAndType {
    fn execute(
        &self,
        session: &mut PersistenceSession,
        params: &QueryParams,
    ) -> Result<Vec<Arc<Entity>>> {
        let execution_id = params.require("executionId")?;
        let event_type = params.require("eventType")?;

        let mut result = Vec::new();
        for entity in embedded_for_execution(session, EVENT_SUBSCRIPTIONS, execution_id)? {
            let subscription = entity.as_event_subscription()?;
            if subscription.execution_id.as_deref() == Some(execution_id)
                && subscription.event_type == event_type
            {
                result.push(entity);
            }
        }
        Ok(result)
    }
}

/// `selectVariablesByExecutionId`
pub struct SelectVariablesByExecutionId;

impl ListQueryHandler for SelectVariablesByExecutionId {
    fn execute(
        &self,
        session: &mut PersistenceSession,
        params: &QueryParams,
    ) -> Result<Vec<Arc<Entity>>> {
        let execution_id = params.require("executionId")?;
        let mut result = Vec::new();
        for entity in embedded_for_execution(session, VARIABLES, execution_id)? {
            if entity.as_variable()?.execution_id.as_deref() == Some(execution_id) {
                result.push(entity);
            }
        }
        Ok(result)
    }
}

/// `selectJobsByExecutionId`; jobs missing or moved behind a stale index entry are left out
pub struct SelectJobsByExecutionId;

impl ListQueryHandler for SelectJobsByExecutionId {
    fn execute(
        &self,
        session: &mut PersistenceSession,
        params: &QueryParams,
    ) -> Result<Vec<Arc<Entity>>> {
        let execution_id = params.require("executionId")?;
        let mut jobs = Vec::new();
        for entity in session.fetch_by_index(EntityKind::Job, JOBS_BY_EXECUTION_ID, execution_id)? {
            if entity.as_job()?.execution_id.as_deref() == Some(execution_id) {
                jobs.push(entity);
            }
        }
        Ok(jobs)
    }
}
