//! Bulk deletes keyed by deployment id
//!
//! All statements go to the transaction's unlocked batch.

use super::{BulkOperationHandler, QueryParams};
use crate::catalog::tables::{DEPLOYMENT_TABLE, PROC_DEF_TABLE, RESOURCE_TABLE};
use crate::error::Result;
use crate::index::{PROC_DEF_BY_DEPLOYMENT, PROC_DEF_BY_KEY};
use crate::session::PersistenceSession;
use crate::storage::{Delete, Select};
use crate::types::EntityKind;
use tracing::debug;

const DEPLOYMENT_ID: &str = "deploymentId";

/// `deleteDeployment`
pub struct DeleteDeployment;

impl BulkOperationHandler for DeleteDeployment {
    fn perform(&self, session: &mut PersistenceSession, params: &QueryParams) -> Result<()> {
        let deployment_id = params.require(DEPLOYMENT_ID)?;
        session
            .add_unlocked_statement(Delete::from(DEPLOYMENT_TABLE).where_eq("id", deployment_id));
        Ok(())
    }
}

/// `deleteResourcesByDeploymentId`, resolved through the native `deployment_idx`
pub struct DeleteResourcesByDeploymentId;

impl BulkOperationHandler for DeleteResourcesByDeploymentId {
    fn perform(&self, session: &mut PersistenceSession, params: &QueryParams) -> Result<()> {
        let deployment_id = params.require(DEPLOYMENT_ID)?;
        let rows = session.select_rows(
            &Select::from(RESOURCE_TABLE).where_eq("deployment_id", deployment_id),
        )?;
        debug!(deployment_id, resources = rows.len(), "deleting deployment resources");
        for row in rows {
            let id = row.text("id")?;
            session.add_unlocked_statement(Delete::from(RESOURCE_TABLE).where_eq("id", id));
        }
        Ok(())
    }
}

/// `deleteProcessDefinitionsByDeploymentId`; removes the definitions and their index entries
pub struct DeleteProcessDefinitionsByDeploymentId;

impl BulkOperationHandler for DeleteProcessDefinitionsByDeploymentId {
    fn perform(&self, session: &mut PersistenceSession, params: &QueryParams) -> Result<()> {
        let deployment_id = params.require(DEPLOYMENT_ID)?.to_string();
        for id in session.lookup_index(PROC_DEF_BY_DEPLOYMENT, &deployment_id)? {
            if let Some(entity) = session.fetch_by_id(EntityKind::ProcessDefinition, &id)? {
                let definition = entity.as_process_definition()?;
                session.add_unlocked_statement(PROC_DEF_BY_KEY.removal(&definition.key, &id));
                session.add_unlocked_statement(Delete::from(PROC_DEF_TABLE).where_eq("id", &id));
            }
            session.add_unlocked_statement(PROC_DEF_BY_DEPLOYMENT.removal(&deployment_id, &id));
        }
        Ok(())
    }
}
