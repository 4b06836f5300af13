//! Engine tables and structured types

use crate::types::{ColumnDef, ColumnType, IndexDef, TableDef, TypeDef};

pub const PROC_DEF_TABLE: &str = "cam_proc_def";
pub const RESOURCE_TABLE: &str = "cam_resource";
pub const DEPLOYMENT_TABLE: &str = "cam_deployment";
pub const PROC_INST_TABLE: &str = "cam_proc_inst";
pub const JOB_TABLE: &str = "cam_job";
pub const INDEX_TABLE: &str = "cam_index";

pub const EXECUTION_TYPE: &str = "execution";
pub const VARIABLE_TYPE: &str = "variable";
pub const EVENT_SUBSCRIPTION_TYPE: &str = "event_subscription";

/// Native index on `cam_resource.deployment_id`
pub const DEPLOYMENT_IDX: &str = "deployment_idx";

/// Map columns of `cam_proc_inst` holding the embedded entities
pub const EXECUTIONS: &str = "executions";
pub const VARIABLES: &str = "variables";
pub const EVENT_SUBSCRIPTIONS: &str = "event_subscriptions";

fn col(name: &str, col_type: ColumnType) -> ColumnDef {
    ColumnDef::new(name, col_type)
}

pub fn execution_type() -> TypeDef {
    use ColumnType::*;
    TypeDef::new(
        EXECUTION_TYPE,
        vec![
            col("id", Text),
            col("revision", Int),
            col("proc_inst_id", Text),
            col("parent_id", Text),
            col("proc_def_id", Text),
            col("super_exec", Text),
            col("act_id", Text),
            col("act_inst_id", Text),
            col("business_key", Text),
            col("is_active", Boolean),
            col("is_concurrent", Boolean),
            col("is_scope", Boolean),
            col("is_event_scope", Boolean),
            col("suspension_state", Int),
            col("sequence_counter", BigInt),
        ],
    )
}

pub fn variable_type() -> TypeDef {
    use ColumnType::*;
    TypeDef::new(
        VARIABLE_TYPE,
        vec![
            col("id", Text),
            col("revision", Int),
            col("type", Text),
            col("name", Text),
            col("execution_id", Text),
            col("proc_inst_id", Text),
            col("task_id", Text),
            col("bytearray_id", Text),
            col("double", Double),
            col("long", BigInt),
            col("text", Text),
            col("text2", Text),
            col("sequence_counter", BigInt),
            col("is_concurrent_local", Boolean),
        ],
    )
}

pub fn event_subscription_type() -> TypeDef {
    use ColumnType::*;
    TypeDef::new(
        EVENT_SUBSCRIPTION_TYPE,
        vec![
            col("id", Text),
            col("revision", Int),
            col("event_type", Text),
            col("event_name", Text),
            col("execution_id", Text),
            col("proc_inst_id", Text),
            col("activity_id", Text),
            col("configuration", Text),
            col("created", BigInt),
        ],
    )
}

pub fn proc_def_table() -> TableDef {
    use ColumnType::*;
    TableDef::new(
        PROC_DEF_TABLE,
        vec![
            col("id", Text),
            col("revision", Int),
            col("key", Text),
            col("version", Int),
            col("category", Text),
            col("name", Text),
            col("deployment_id", Text),
            col("resource_name", Text),
            col("suspension_state", Int),
        ],
        "id",
    )
}

pub fn resource_table() -> TableDef {
    use ColumnType::*;
    TableDef::new(
        RESOURCE_TABLE,
        vec![
            col("id", Text),
            col("name", Text),
            col("deployment_id", Text),
            col("content", Blob),
        ],
        "id",
    )
}

pub fn resource_indexes() -> Vec<IndexDef> {
    vec![IndexDef::new(DEPLOYMENT_IDX, RESOURCE_TABLE, "deployment_id")]
}

pub fn deployment_table() -> TableDef {
    use ColumnType::*;
    TableDef::new(
        DEPLOYMENT_TABLE,
        vec![
            col("id", Text),
            col("name", Text),
            col("deploy_time", BigInt),
        ],
        "id",
    )
}

pub fn proc_inst_table() -> TableDef {
    use ColumnType::*;
    TableDef::new(
        PROC_INST_TABLE,
        vec![
            col("id", Text),
            col("version", Int),
            col("business_key", Text),
            col("proc_def_id", Text),
            col(EXECUTIONS, ColumnType::map_of(ColumnType::udt(EXECUTION_TYPE))),
            col(VARIABLES, ColumnType::map_of(ColumnType::udt(VARIABLE_TYPE))),
            col(
                EVENT_SUBSCRIPTIONS,
                ColumnType::map_of(ColumnType::udt(EVENT_SUBSCRIPTION_TYPE)),
            ),
        ],
        "id",
    )
}

pub fn job_table() -> TableDef {
    use ColumnType::*;
    TableDef::new(
        JOB_TABLE,
        vec![
            col("id", Text),
            col("version", Int),
            col("type", Text),
            col("execution_id", Text),
            col("proc_inst_id", Text),
            col("proc_def_id", Text),
            col("retries", Int),
            col("duedate", BigInt),
            col("lock_owner", Text),
            col("lock_exp_time", BigInt),
            col("exception_msg", Text),
            col("handler_type", Text),
            col("handler_cfg", Text),
            col("suspension_state", Int),
        ],
        "id",
    )
}

/// Inverted lookup rows: `(idx_name, idx_value) -> val`
pub fn index_table() -> TableDef {
    use ColumnType::*;
    TableDef::new(
        INDEX_TABLE,
        vec![
            col("idx_name", Text),
            col("idx_value", Text),
            col("val", Text),
        ],
        "idx_name",
    )
    .with_partition_key(&["idx_name", "idx_value"])
    .with_clustering_key(&["val"])
}
