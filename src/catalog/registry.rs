/// Schema registry: structured types, tables and native indexes in creation order
use super::tables;
use crate::error::Result;
use crate::storage::ColumnStore;
use crate::types::{IndexDef, SchemaStatement, TableDef, TypeDef};
use std::fmt;
use tracing::info;

/// Schema areas a workflow engine asks about
///
/// Only `Engine` is backed by tables; the others are accepted and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaComponent {
    Engine,
    History,
    Identity,
    Cmmn,
    CmmnHistory,
}

impl fmt::Display for SchemaComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SchemaComponent::Engine => "engine",
            SchemaComponent::History => "history",
            SchemaComponent::Identity => "identity",
            SchemaComponent::Cmmn => "cmmn",
            SchemaComponent::CmmnHistory => "cmmn-history",
        };
        f.write_str(name)
    }
}

/// A table plus the native indexes created right after it
#[derive(Debug, Clone)]
pub struct TableHandler {
    pub table: TableDef,
    pub indexes: Vec<IndexDef>,
}

impl TableHandler {
    pub fn new(table: TableDef) -> Self {
        Self {
            table,
            indexes: Vec::new(),
        }
    }

    pub fn with_indexes(mut self, indexes: Vec<IndexDef>) -> Self {
        self.indexes = indexes;
        self
    }
}

/// Immutable list of schema objects, iterated in registration order
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    types: Vec<TypeDef>,
    tables: Vec<TableHandler>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine schema: types first, then the tables embedding them
    pub fn engine() -> Self {
        Self::new()
            .register_type(tables::execution_type())
            .register_type(tables::variable_type())
            .register_type(tables::event_subscription_type())
            .register_table(TableHandler::new(tables::proc_def_table()))
            .register_table(
                TableHandler::new(tables::resource_table())
                    .with_indexes(tables::resource_indexes()),
            )
            .register_table(TableHandler::new(tables::deployment_table()))
            .register_table(TableHandler::new(tables::proc_inst_table()))
            .register_table(TableHandler::new(tables::job_table()))
            .register_table(TableHandler::new(tables::index_table()))
    }

    pub fn register_type(mut self, def: TypeDef) -> Self {
        self.types.push(def);
        self
    }

    pub fn register_table(mut self, handler: TableHandler) -> Self {
        self.tables.push(handler);
        self
    }

    pub fn table(&self, name: &str) -> Option<&TableDef> {
        self.tables
            .iter()
            .map(|h| &h.table)
            .find(|t| t.name == name)
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|h| h.table.name.as_str()).collect()
    }

    pub fn type_names(&self) -> Vec<&str> {
        self.types.iter().map(|t| t.name.as_str()).collect()
    }

    /// Types, then each table followed by its indexes
    pub fn create_statements(&self) -> Vec<SchemaStatement> {
        let mut statements: Vec<SchemaStatement> = self
            .types
            .iter()
            .cloned()
            .map(SchemaStatement::CreateType)
            .collect();
        for handler in &self.tables {
            statements.push(SchemaStatement::CreateTable(handler.table.clone()));
            statements.extend(handler.indexes.iter().cloned().map(SchemaStatement::CreateIndex));
        }
        statements
    }

    /// Tables before the types they embed
    pub fn drop_statements(&self) -> Vec<SchemaStatement> {
        self.tables
            .iter()
            .map(|h| SchemaStatement::DropTable(h.table.name.clone()))
            .chain(
                self.types
                    .iter()
                    .map(|t| SchemaStatement::DropType(t.name.clone())),
            )
            .collect()
    }

    pub fn create_schema(&self, store: &dyn ColumnStore) -> Result<()> {
        for statement in self.create_statements() {
            store.execute_schema(&statement)?;
        }
        info!(
            types = self.types.len(),
            tables = self.tables.len(),
            "engine schema created"
        );
        Ok(())
    }

    pub fn drop_schema(&self, store: &dyn ColumnStore) -> Result<()> {
        for statement in self.drop_statements() {
            store.execute_schema(&statement)?;
        }
        info!(tables = self.tables.len(), "engine schema dropped");
        Ok(())
    }

    /// Registered tables that currently exist in `store`
    pub fn tables_present(&self, store: &dyn ColumnStore) -> Vec<&str> {
        self.table_names()
            .into_iter()
            .filter(|name| store.table_exists(name))
            .collect()
    }

    /// Full creation script, one statement per line
    pub fn ddl(&self, keyspace: Option<&str>) -> String {
        self.create_statements()
            .iter()
            .map(|s| s.to_cql(keyspace))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
