use super::*;
use crate::catalog::tables::{EXECUTIONS, JOB_TABLE, PROC_INST_TABLE, RESOURCE_TABLE, VARIABLES};
use crate::index::{JOBS_BY_EXECUTION_ID, PROC_DEF_BY_KEY, PROC_INST_BY_BUSINESS_KEY};
use crate::operation::PROCESS_INSTANCE;
use crate::storage::{Delete, MemoryStore};
use crate::types::{
    DeploymentEntity, EventSubscriptionEntity, ExecutionEntity, JobEntity, ProcessDefinitionEntity,
    ResourceEntity, VariableInstanceEntity,
};
use parking_lot::Mutex;

#[derive(Default)]
struct RecordingListener {
    loaded: Mutex<Vec<(EntityKind, String)>>,
}

impl RecordingListener {
    fn count(&self, kind: EntityKind, id: &str) -> usize {
        self.loaded
            .lock()
            .iter()
            .filter(|(k, i)| *k == kind && i == id)
            .count()
    }

    fn total(&self) -> usize {
        self.loaded.lock().len()
    }
}

impl EntityLoadListener for RecordingListener {
    fn entity_loaded(&self, entity: &Arc<Entity>) {
        self.loaded
            .lock()
            .push((entity.kind(), entity.id().to_string()));
    }
}

struct Fixture {
    store: Arc<MemoryStore>,
    registry: Arc<OperationRegistry>,
}

impl Fixture {
    fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let registry = Arc::new(OperationRegistry::standard());
        registry.schema().create_schema(store.as_ref()).unwrap();
        Self { store, registry }
    }

    fn session(&self) -> PersistenceSession {
        self.session_with(PersistenceConfig::default())
    }

    fn session_with(&self, config: PersistenceConfig) -> PersistenceSession {
        PersistenceSession::new(self.store.clone(), Arc::clone(&self.registry), config).unwrap()
    }

    fn commit(&self, entities: Vec<Entity>) {
        let mut session = self.session();
        for entity in &entities {
            assert!(session.insert(entity).unwrap().is_handled());
        }
        session.commit().unwrap();
    }
}

fn root(id: &str, revision: i32) -> Entity {
    Entity::Execution(ExecutionEntity {
        id: id.to_string(),
        revision,
        process_instance_id: id.to_string(),
        process_definition_id: "invoice:1".to_string(),
        business_key: Some(format!("order-{}", id)),
        activity_id: Some("start".to_string()),
        is_active: true,
        is_scope: true,
        suspension_state: 1,
        ..Default::default()
    })
}

fn child(id: &str, process_instance_id: &str) -> Entity {
    Entity::Execution(ExecutionEntity {
        id: id.to_string(),
        process_instance_id: process_instance_id.to_string(),
        parent_id: Some(process_instance_id.to_string()),
        process_definition_id: "invoice:1".to_string(),
        activity_id: Some("approve".to_string()),
        is_active: true,
        suspension_state: 1,
        ..Default::default()
    })
}

fn variable(id: &str, process_instance_id: &str, execution_id: &str) -> Entity {
    Entity::VariableInstance(VariableInstanceEntity {
        id: id.to_string(),
        name: format!("var-{}", id),
        type_name: "string".to_string(),
        execution_id: Some(execution_id.to_string()),
        process_instance_id: process_instance_id.to_string(),
        text_value: Some("value".to_string()),
        ..Default::default()
    })
}

fn subscription(
    id: &str,
    process_instance_id: &str,
    execution_id: &str,
    event_type: &str,
) -> Entity {
    Entity::EventSubscription(EventSubscriptionEntity {
        id: id.to_string(),
        event_type: event_type.to_string(),
        event_name: Some("paymentReceived".to_string()),
        execution_id: Some(execution_id.to_string()),
        process_instance_id: process_instance_id.to_string(),
        ..Default::default()
    })
}

fn definition(key: &str, version: i32, deployment_id: &str) -> Entity {
    Entity::ProcessDefinition(ProcessDefinitionEntity {
        id: format!("{}:{}", key, version),
        key: key.to_string(),
        version,
        deployment_id: deployment_id.to_string(),
        suspension_state: 1,
        ..Default::default()
    })
}

fn job(id: &str, execution_id: &str) -> Entity {
    Entity::Job(JobEntity {
        id: id.to_string(),
        job_type: "message".to_string(),
        execution_id: Some(execution_id.to_string()),
        retries: 3,
        ..Default::default()
    })
}

fn resource(id: &str, deployment_id: &str) -> Entity {
    Entity::Resource(ResourceEntity {
        id: id.to_string(),
        name: format!("{}.bpmn", id),
        deployment_id: deployment_id.to_string(),
        content: vec![1, 2, 3],
    })
}

#[test]
fn test_empty_commit_makes_no_store_calls() {
    let fixture = Fixture::new();
    fixture.store.reset_stats();

    let mut session = fixture.session();
    session.commit().unwrap();
    assert_eq!(fixture.store.stats().total_calls(), 0);
}

#[test]
fn test_insert_stores_next_revision_and_stale_update_fails() {
    let fixture = Fixture::new();
    fixture.commit(vec![root("p1", 0)]);

    let mut reader = fixture.session();
    let loaded = reader.select_by_id(EntityKind::Execution, "p1").unwrap().unwrap();
    assert_eq!(loaded.revision(), 1);

    let mut stale = fixture.session();
    stale.update(&root("p1", 0)).unwrap();
    let err = stale.commit().unwrap_err();
    assert!(matches!(err, PersistenceError::OptimisticLock(_)));
    assert!(err.is_retryable());

    let mut reader = fixture.session();
    let loaded = reader.select_by_id(EntityKind::Execution, "p1").unwrap().unwrap();
    assert_eq!(loaded.revision(), 1);
}

#[test]
fn test_concurrent_update_loses_and_leaves_store_unchanged() {
    let fixture = Fixture::new();
    fixture.commit(vec![root("p1", 0)]);

    let mut first = fixture.session();
    let mut second = fixture.session();
    let seen_by_first = first.select_by_id(EntityKind::Execution, "p1").unwrap().unwrap();
    let seen_by_second = second.select_by_id(EntityKind::Execution, "p1").unwrap().unwrap();

    let mut moved = seen_by_first.as_execution().unwrap().clone();
    moved.activity_id = Some("approve".to_string());
    first.update(&Entity::Execution(moved)).unwrap();
    first.commit().unwrap();

    let mut other = seen_by_second.as_execution().unwrap().clone();
    other.activity_id = Some("reject".to_string());
    second.update(&Entity::Execution(other)).unwrap();
    assert!(matches!(
        second.commit(),
        Err(PersistenceError::OptimisticLock(_))
    ));

    let mut reader = fixture.session();
    let current = reader.select_by_id(EntityKind::Execution, "p1").unwrap().unwrap();
    let current = current.as_execution().unwrap();
    assert_eq!(current.revision, 2);
    assert_eq!(current.activity_id.as_deref(), Some("approve"));
}

#[test]
fn test_embedded_writes_lock_on_process_instance() {
    let fixture = Fixture::new();
    fixture.commit(vec![root("p1", 0)]);

    let mut first = fixture.session();
    let mut second = fixture.session();
    first.insert(&variable("v1", "p1", "p1")).unwrap();
    second.insert(&variable("v2", "p1", "p1")).unwrap();

    first.commit().unwrap();
    assert!(matches!(
        second.commit(),
        Err(PersistenceError::OptimisticLock(_))
    ));

    let mut reader = fixture.session();
    let composite = reader
        .select_composite_by_id(PROCESS_INSTANCE, "p1")
        .unwrap()
        .unwrap();
    assert_eq!(composite.primary().revision(), 2);
    let variables = composite.embedded(VARIABLES).unwrap();
    assert!(variables.contains_key("v1"));
    assert!(!variables.contains_key("v2"));
}

#[test]
fn test_embedded_write_for_unknown_instance_fails() {
    let fixture = Fixture::new();
    let mut session = fixture.session();
    let err = session.insert(&variable("v1", "missing", "missing")).unwrap_err();
    assert!(matches!(err, PersistenceError::InvalidData(_)));
}

#[test]
fn test_composite_is_cached_and_reported_once() {
    let fixture = Fixture::new();
    fixture.commit(vec![root("p1", 0), child("ex2", "p1"), variable("v1", "p1", "ex2")]);

    let listener = Arc::new(RecordingListener::default());
    let mut session = fixture.session().with_listener(listener.clone());

    let first = session
        .select_composite_by_id(PROCESS_INSTANCE, "p1")
        .unwrap()
        .unwrap();
    fixture.store.reset_stats();
    let second = session
        .select_composite_by_id(PROCESS_INSTANCE, "p1")
        .unwrap()
        .unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(fixture.store.stats().reads, 0);
    assert_eq!(session.context().cache().stats().hits, 1);

    // primary is also embedded among the executions: one notification only
    assert_eq!(listener.count(EntityKind::Execution, "p1"), 1);
    assert_eq!(listener.count(EntityKind::Execution, "ex2"), 1);
    assert_eq!(listener.count(EntityKind::VariableInstance, "v1"), 1);
    assert_eq!(listener.total(), 3);

    let by_id = session.select_by_id(EntityKind::Execution, "p1").unwrap().unwrap();
    assert!(Arc::ptr_eq(&by_id, first.primary()));
    assert_eq!(listener.total(), 3);
}

#[test]
fn test_missing_composite_is_not_cached() {
    let fixture = Fixture::new();
    let mut session = fixture.session();
    assert!(session
        .select_composite_by_id(PROCESS_INSTANCE, "nope")
        .unwrap()
        .is_none());
    assert!(session.context().cache().is_empty());
}

#[test]
fn test_unknown_composite_is_configuration_error() {
    let fixture = Fixture::new();
    let mut session = fixture.session();
    let err = session.select_composite_by_id("caseInstance", "c1").unwrap_err();
    assert!(matches!(err, PersistenceError::Configuration(_)));
    assert!(!err.is_retryable());
}

#[test]
fn test_stale_index_entry_is_skipped() {
    let fixture = Fixture::new();
    fixture.commit(vec![job("j1", "ex1"), job("j2", "ex1")]);

    // drop the row but keep its index entry
    let mut batch = Batch::new();
    batch.add(Delete::from(JOB_TABLE).where_eq("id", "j2"));
    fixture.store.execute_batch(&batch).unwrap();

    let mut session = fixture.session();
    let jobs = session
        .select_list("selectJobsByExecutionId", &QueryParams::single("ex1"))
        .unwrap();
    let ids: Vec<&str> = jobs.iter().map(|j| j.id()).collect();
    assert_eq!(ids, vec!["j1"]);
}

#[test]
fn test_job_moved_to_other_execution() {
    let fixture = Fixture::new();
    fixture.commit(vec![job("j1", "ex1")]);

    let mut moved = job("j1", "ex2");
    if let Entity::Job(job) = &mut moved {
        job.revision = 1;
    }
    let mut session = fixture.session();
    session.update(&moved).unwrap();
    session.commit().unwrap();

    let mut reader = fixture.session();
    assert!(reader.lookup_index(JOBS_BY_EXECUTION_ID, "ex1").unwrap().is_empty());
    let old = reader
        .select_list("selectJobsByExecutionId", &QueryParams::single("ex1"))
        .unwrap();
    assert!(old.is_empty());
    let new = reader
        .select_list("selectJobsByExecutionId", &QueryParams::single("ex2"))
        .unwrap();
    assert_eq!(new.len(), 1);
    assert_eq!(new[0].id(), "j1");
}

#[test]
fn test_job_query_skips_entry_for_previous_execution() {
    let fixture = Fixture::new();
    fixture.commit(vec![job("j1", "ex2")]);

    // index row left over from an execution the job no longer belongs to
    let mut batch = Batch::new();
    batch.add(JOBS_BY_EXECUTION_ID.entry("ex1", "j1"));
    fixture.store.execute_batch(&batch).unwrap();

    let mut session = fixture.session();
    let jobs = session
        .select_list("selectJobsByExecutionId", &QueryParams::single("ex1"))
        .unwrap();
    assert!(jobs.is_empty());
}

#[test]
fn test_latest_definition_by_key() {
    let fixture = Fixture::new();
    fixture.commit(vec![definition("K", 1, "d1")]);

    let session = fixture.session();
    assert_eq!(
        session.lookup_index(PROC_DEF_BY_KEY, "K").unwrap(),
        vec!["K:1".to_string()]
    );

    fixture.commit(vec![definition("K", 2, "d2"), definition("other", 5, "d2")]);
    let mut session = fixture.session();
    let latest = session
        .select_one(
            "selectLatestProcessDefinitionByKey",
            &QueryParams::new().with("key", "K"),
        )
        .unwrap()
        .unwrap();
    assert_eq!(latest.id(), "K:2");
    assert_eq!(latest.revision(), 1);

    let in_deployment = session
        .select_one(
            "selectProcessDefinitionByDeploymentAndKey",
            &QueryParams::new()
                .with("deploymentId", "d1")
                .with("processDefinitionKey", "K"),
        )
        .unwrap()
        .unwrap();
    assert_eq!(in_deployment.id(), "K:1");
}

#[test]
fn test_definition_update_checks_revision() {
    let fixture = Fixture::new();
    fixture.commit(vec![definition("K", 1, "d1")]);

    let mut session = fixture.session();
    let loaded = session
        .select_by_id(EntityKind::ProcessDefinition, "K:1")
        .unwrap()
        .unwrap();
    let mut suspended = loaded.as_process_definition().unwrap().clone();
    suspended.suspension_state = 2;
    session.update(&Entity::ProcessDefinition(suspended.clone())).unwrap();
    session.commit().unwrap();

    // same revision again is stale now
    let mut stale = fixture.session();
    stale.update(&Entity::ProcessDefinition(suspended)).unwrap();
    assert!(matches!(stale.commit(), Err(PersistenceError::OptimisticLock(_))));

    let mut reader = fixture.session();
    let current = reader
        .select_by_id(EntityKind::ProcessDefinition, "K:1")
        .unwrap()
        .unwrap();
    let current = current.as_process_definition().unwrap();
    assert_eq!(current.revision, 2);
    assert_eq!(current.suspension_state, 2);
}

#[test]
fn test_stale_lock_stops_remaining_batches() {
    let fixture = Fixture::new();
    fixture.commit(vec![definition("K", 1, "d1"), job("j1", "ex1")]);

    let mut session = fixture.session();
    let mut suspended = definition("K", 1, "d1");
    if let Entity::ProcessDefinition(definition) = &mut suspended {
        definition.revision = 1;
        definition.suspension_state = 2;
    }
    session.update(&suspended).unwrap();
    // revision 0 is stale, the stored job is at 1
    session.update(&job("j1", "ex1")).unwrap();
    session
        .insert(&Entity::Deployment(DeploymentEntity {
            id: "d9".into(),
            ..Default::default()
        }))
        .unwrap();

    fixture.store.reset_stats();
    assert!(matches!(session.commit(), Err(PersistenceError::OptimisticLock(_))));

    let stats = fixture.store.stats();
    assert_eq!(stats.timestamps_issued, 1);
    assert_eq!(stats.batches_executed, 1);
    assert_eq!(stats.batches_rejected, 1);

    // batches flushed before the failure stay applied
    let mut reader = fixture.session();
    let current = reader
        .select_by_id(EntityKind::ProcessDefinition, "K:1")
        .unwrap()
        .unwrap();
    let current = current.as_process_definition().unwrap();
    assert_eq!(current.revision, 2);
    assert_eq!(current.suspension_state, 2);

    let job = reader.select_by_id(EntityKind::Job, "j1").unwrap().unwrap();
    assert_eq!(job.revision(), 1);
    assert!(reader
        .select_by_id(EntityKind::Deployment, "d9")
        .unwrap()
        .is_none());
}

#[test]
fn test_bulk_delete_resources_by_deployment() {
    let fixture = Fixture::new();
    fixture.commit(vec![
        Entity::Deployment(DeploymentEntity {
            id: "d1".into(),
            name: Some("invoice".into()),
            deploy_time: 1_700_000_000,
        }),
        resource("r1", "d1"),
        resource("r2", "d1"),
        resource("r3", "d2"),
    ]);

    let mut session = fixture.session();
    let outcome = session
        .bulk_delete("deleteResourcesByDeploymentId", QueryParams::single("d1"))
        .unwrap();
    assert_eq!(outcome, OperationOutcome::Handled);
    session
        .bulk_delete("deleteDeployment", QueryParams::single("d1"))
        .unwrap();
    session.commit().unwrap();

    let remaining = fixture
        .store
        .select(&Select::from(RESOURCE_TABLE).where_eq("deployment_id", "d1"))
        .unwrap();
    assert!(remaining.is_empty());
    assert_eq!(session.table_count(RESOURCE_TABLE).unwrap(), 1);
    assert!(session
        .select_by_id(EntityKind::Deployment, "d1")
        .unwrap()
        .is_none());
}

#[test]
fn test_bulk_delete_definitions_by_deployment() {
    let fixture = Fixture::new();
    fixture.commit(vec![definition("K", 1, "d1"), definition("K", 2, "d2")]);

    let mut session = fixture.session();
    session
        .bulk_delete(
            "deleteProcessDefinitionsByDeploymentId",
            QueryParams::new().with("deploymentId", "d1"),
        )
        .unwrap();
    session.commit().unwrap();

    let session = fixture.session();
    assert_eq!(
        session.lookup_index(PROC_DEF_BY_KEY, "K").unwrap(),
        vec!["K:2".to_string()]
    );
    assert_eq!(session.table_count("cam_proc_def").unwrap(), 1);
}

#[test]
fn test_commit_shares_one_timestamp() {
    let fixture = Fixture::new();
    fixture.store.reset_stats();
    fixture.commit(vec![
        definition("K", 1, "d1"),
        Entity::Deployment(DeploymentEntity {
            id: "d1".into(),
            ..Default::default()
        }),
    ]);

    let stats = fixture.store.stats();
    assert_eq!(stats.timestamps_issued, 1);
    // definition rows, definition index rows, unlocked deployment batch
    assert_eq!(stats.batches_executed, 3);
}

#[test]
fn test_unhandled_operations_warn_by_default() {
    let fixture = Fixture::new();
    let mut session = fixture.session();

    assert_eq!(
        session.bulk_update("updateJobSuspensionState", QueryParams::new()).unwrap(),
        OperationOutcome::Unhandled
    );
    assert_eq!(
        session.bulk_delete("deleteHistoricTasks", QueryParams::new()).unwrap(),
        OperationOutcome::Unhandled
    );
    assert!(session
        .select_one("selectTaskById", &QueryParams::single("t1"))
        .unwrap()
        .is_none());
    assert!(session
        .select_list("selectTasksByQueryCriteria", &QueryParams::new())
        .unwrap()
        .is_empty());

    fixture.store.reset_stats();
    session.commit().unwrap();
    assert_eq!(fixture.store.stats().total_calls(), 0);
}

#[test]
fn test_unregistered_entity_kind_is_skipped() {
    let fixture = Fixture::new();
    let registry = Arc::new(
        OperationRegistry::builder()
            .serializers(crate::serializer::SerializerRegistry::standard())
            .build(),
    );
    let mut session =
        PersistenceSession::new(fixture.store.clone(), registry, PersistenceConfig::default())
            .unwrap();

    let outcome = session.insert(&job("j1", "ex1")).unwrap();
    assert_eq!(outcome, OperationOutcome::Unhandled);
    assert!(session.select_by_id(EntityKind::Job, "j1").unwrap().is_none());
    session.commit().unwrap();
    assert_eq!(fixture.store.count(JOB_TABLE).unwrap(), 0);
}

#[test]
fn test_strict_policy_rejects_unhandled() {
    let fixture = Fixture::new();
    let mut session = fixture.session_with(PersistenceConfig::strict());
    let err = session
        .bulk_update("updateJobSuspensionState", QueryParams::new())
        .unwrap_err();
    assert!(matches!(err, PersistenceError::Unsupported(_)));
}

#[test]
fn test_rollback_discards_pending_writes() {
    let fixture = Fixture::new();
    let mut session = fixture.session();
    session.insert(&job("j1", "ex1")).unwrap();
    session.rollback();

    fixture.store.reset_stats();
    session.commit().unwrap();
    assert_eq!(fixture.store.stats().total_calls(), 0);
    assert_eq!(fixture.store.count(JOB_TABLE).unwrap(), 0);
}

#[test]
fn test_execution_and_embedded_queries() {
    let fixture = Fixture::new();
    fixture.commit(vec![
        root("p1", 0),
        child("ex2", "p1"),
        variable("v1", "p1", "ex2"),
        variable("v2", "p1", "p1"),
        subscription("s1", "p1", "ex2", "message"),
        subscription("s2", "p1", "ex2", "signal"),
    ]);

    let mut session = fixture.session();
    let executions = session
        .select_list(
            "selectExecutionsByQueryCriteria",
            &QueryParams::new().with("processInstanceId", "p1"),
        )
        .unwrap();
    assert_eq!(executions.len(), 2);

    let variables = session
        .select_list("selectVariablesByExecutionId", &QueryParams::single("ex2"))
        .unwrap();
    assert_eq!(variables.len(), 1);
    assert_eq!(variables[0].id(), "v1");

    let subscriptions = session
        .select_list(
            "selectEventSubscriptionsByExecutionAndType",
            &QueryParams::new()
                .with("executionId", "ex2")
                .with("eventType", "signal"),
        )
        .unwrap();
    assert_eq!(subscriptions.len(), 1);
    assert_eq!(subscriptions[0].id(), "s2");

    let by_key = session
        .select_list(
            "selectProcessInstanceByQueryCriteria",
            &QueryParams::new().with("businessKey", "order-p1"),
        )
        .unwrap();
    assert_eq!(by_key.len(), 1);
    assert_eq!(by_key[0].id(), "p1");

    let ex2 = session.select_by_id(EntityKind::Execution, "ex2").unwrap().unwrap();
    assert_eq!(ex2.as_execution().unwrap().parent_id.as_deref(), Some("p1"));
}

#[test]
fn test_business_key_change_moves_index_entry() {
    let fixture = Fixture::new();
    fixture.commit(vec![root("p1", 0)]);

    let mut renamed = root("p1", 1);
    if let Entity::Execution(execution) = &mut renamed {
        execution.business_key = Some("order-new".to_string());
    }
    let mut session = fixture.session();
    session.update(&renamed).unwrap();
    session.commit().unwrap();

    let mut reader = fixture.session();
    assert!(reader
        .lookup_index(PROC_INST_BY_BUSINESS_KEY, "order-p1")
        .unwrap()
        .is_empty());
    let old = reader
        .select_list(
            "selectProcessInstanceByQueryCriteria",
            &QueryParams::new().with("businessKey", "order-p1"),
        )
        .unwrap();
    assert!(old.is_empty());
    let new = reader
        .select_list(
            "selectProcessInstanceByQueryCriteria",
            &QueryParams::new().with("businessKey", "order-new"),
        )
        .unwrap();
    assert_eq!(new.len(), 1);
    assert_eq!(new[0].id(), "p1");
}

#[test]
fn test_business_key_query_skips_entry_for_previous_key() {
    let fixture = Fixture::new();
    fixture.commit(vec![root("p1", 0)]);

    let mut batch = Batch::new();
    batch.add(PROC_INST_BY_BUSINESS_KEY.entry("order-old", "p1"));
    fixture.store.execute_batch(&batch).unwrap();

    let mut session = fixture.session();
    let instances = session
        .select_list(
            "selectProcessInstanceByQueryCriteria",
            &QueryParams::new().with("businessKey", "order-old"),
        )
        .unwrap();
    assert!(instances.is_empty());
}

#[test]
fn test_delete_process_instance_and_child() {
    let fixture = Fixture::new();
    fixture.commit(vec![root("p1", 0), child("ex2", "p1")]);

    let mut session = fixture.session();
    session.delete(&child("ex2", "p1")).unwrap();
    session.commit().unwrap();

    let mut session = fixture.session();
    let composite = session
        .select_composite_by_id(PROCESS_INSTANCE, "p1")
        .unwrap()
        .unwrap();
    assert_eq!(composite.embedded(EXECUTIONS).unwrap().len(), 1);
    let revision = composite.primary().revision();
    session.delete(&root("p1", revision)).unwrap();
    session.commit().unwrap();

    let mut session = fixture.session();
    assert!(session
        .select_composite_by_id(PROCESS_INSTANCE, "p1")
        .unwrap()
        .is_none());
    assert!(session
        .select_list(
            "selectProcessInstanceByQueryCriteria",
            &QueryParams::new().with("businessKey", "order-p1"),
        )
        .unwrap()
        .is_empty());
    assert_eq!(fixture.store.count(PROC_INST_TABLE).unwrap(), 0);
}

#[test]
fn test_schema_lifecycle() {
    let store = Arc::new(MemoryStore::new());
    let registry = Arc::new(OperationRegistry::standard());
    let session = PersistenceSession::new(store, registry, PersistenceConfig::default()).unwrap();

    assert!(!session.is_engine_schema_present());
    session.create_schema_component(SchemaComponent::Engine).unwrap();
    session.create_schema_component(SchemaComponent::History).unwrap();
    assert!(session.is_engine_schema_present());
    assert!(session.is_schema_present(SchemaComponent::Engine));
    assert!(!session.is_schema_present(SchemaComponent::History));
    assert!(!session.is_identity_schema_present());
    assert!(session.table_exists("cam_index"));
    assert!(session.schema_ddl().contains("camunda.cam_proc_inst"));
    assert_eq!(session.db_version(), env!("CARGO_PKG_VERSION"));

    session.drop_schema().unwrap();
    assert!(!session.is_engine_schema_present());
}

#[test]
fn test_invalid_config_rejected() {
    let fixture = Fixture::new();
    let config = PersistenceConfig::with_keyspace("bad keyspace");
    assert!(matches!(
        PersistenceSession::new(fixture.store.clone(), Arc::clone(&fixture.registry), config),
        Err(PersistenceError::Configuration(_))
    ));
}
