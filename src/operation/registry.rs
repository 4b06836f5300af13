/// Operation registry: entity handlers, named queries, bulk operations, composite loaders
///
/// Built once (usually via [`OperationRegistry::standard`]) and shared read-only by
/// every session through an `Arc`.
use super::bulk::{
    DeleteDeployment, DeleteProcessDefinitionsByDeploymentId, DeleteResourcesByDeploymentId,
};
use super::composite::ProcessInstanceLoader;
use super::entities::{
    DeploymentOperations, EventSubscriptionOperations, ExecutionOperations, JobOperations,
    ProcessDefinitionOperations, ResourceOperations, VariableOperations,
};
use super::{
    BulkOperationHandler, CompositeEntityLoader, EntityOperationHandler, ListQueryHandler,
    SingleResultQueryHandler,
};
use crate::catalog::SchemaRegistry;
use crate::query;
use crate::serializer::SerializerRegistry;
use crate::types::EntityKind;
use ahash::AHashMap;

pub struct OperationRegistry {
    schema: SchemaRegistry,
    serializers: SerializerRegistry,
    entity_handlers: AHashMap<EntityKind, Box<dyn EntityOperationHandler>>,
    single_queries: AHashMap<String, Box<dyn SingleResultQueryHandler>>,
    list_queries: AHashMap<String, Box<dyn ListQueryHandler>>,
    bulk_operations: AHashMap<String, Box<dyn BulkOperationHandler>>,
    composite_loaders: AHashMap<String, Box<dyn CompositeEntityLoader>>,
}

impl OperationRegistry {
    pub fn builder() -> OperationRegistryBuilder {
        OperationRegistryBuilder::new()
    }

    /// Every handler this crate ships with
    pub fn standard() -> Self {
        Self::builder()
            .schema(SchemaRegistry::engine())
            .serializers(SerializerRegistry::standard())
            .entity_handler(Box::new(DeploymentOperations))
            .entity_handler(Box::new(ResourceOperations))
            .entity_handler(Box::new(ProcessDefinitionOperations))
            .entity_handler(Box::new(ExecutionOperations))
            .entity_handler(Box::new(VariableOperations))
            .entity_handler(Box::new(EventSubscriptionOperations))
            .entity_handler(Box::new(JobOperations))
            .single_query(
                "selectLatestProcessDefinitionByKey",
                Box::new(query::SelectLatestProcessDefinitionByKey),
            )
            .single_query(
                "selectProcessDefinitionByDeploymentAndKey",
                Box::new(query::SelectProcessDefinitionByDeploymentAndKey),
            )
            .list_query(
                "selectExecutionsByQueryCriteria",
                Box::new(query::SelectExecutionsByQueryCriteria),
            )
            .list_query(
                "selectProcessInstanceByQueryCriteria",
                Box::new(query::SelectProcessInstanceByQueryCriteria),
            )
            .list_query(
                "selectEventSubscriptionsByExecutionAndType",
                Box::new(query::SelectEventSubscriptionsByExecutionAndType),
            )
            .list_query(
                "selectVariablesByExecutionId",
                Box::new(query::SelectVariablesByExecutionId),
            )
            .list_query("selectJobsByExecutionId", Box::new(query::SelectJobsByExecutionId))
            .bulk_operation("deleteDeployment", Box::new(DeleteDeployment))
            .bulk_operation(
                "deleteResourcesByDeploymentId",
                Box::new(DeleteResourcesByDeploymentId),
            )
            .bulk_operation(
                "deleteProcessDefinitionsByDeploymentId",
                Box::new(DeleteProcessDefinitionsByDeploymentId),
            )
            .composite_loader(Box::new(ProcessInstanceLoader))
            .build()
    }

    pub fn schema(&self) -> &SchemaRegistry {
        &self.schema
    }

    pub fn serializers(&self) -> &SerializerRegistry {
        &self.serializers
    }

    pub fn entity_handler(&self, kind: EntityKind) -> Option<&dyn EntityOperationHandler> {
        self.entity_handlers.get(&kind).map(|h| h.as_ref())
    }

    pub fn single_query(&self, name: &str) -> Option<&dyn SingleResultQueryHandler> {
        self.single_queries.get(name).map(|h| h.as_ref())
    }

    pub fn list_query(&self, name: &str) -> Option<&dyn ListQueryHandler> {
        self.list_queries.get(name).map(|h| h.as_ref())
    }

    pub fn bulk_operation(&self, name: &str) -> Option<&dyn BulkOperationHandler> {
        self.bulk_operations.get(name).map(|h| h.as_ref())
    }

    pub fn composite_loader(&self, name: &str) -> Option<&dyn CompositeEntityLoader> {
        self.composite_loaders.get(name).map(|h| h.as_ref())
    }

    /// Names of the registered named queries, sorted
    pub fn query_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .single_queries
            .keys()
            .chain(self.list_queries.keys())
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names
    }
}

pub struct OperationRegistryBuilder {
    registry: OperationRegistry,
}

impl Default for OperationRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl OperationRegistryBuilder {
    pub fn new() -> Self {
        Self {
            registry: OperationRegistry {
                schema: SchemaRegistry::new(),
                serializers: SerializerRegistry::empty(),
                entity_handlers: AHashMap::new(),
                single_queries: AHashMap::new(),
                list_queries: AHashMap::new(),
                bulk_operations: AHashMap::new(),
                composite_loaders: AHashMap::new(),
            },
        }
    }

    pub fn schema(mut self, schema: SchemaRegistry) -> Self {
        self.registry.schema = schema;
        self
    }

    pub fn serializers(mut self, serializers: SerializerRegistry) -> Self {
        self.registry.serializers = serializers;
        self
    }

    pub fn entity_handler(mut self, handler: Box<dyn EntityOperationHandler>) -> Self {
        self.registry.entity_handlers.insert(handler.kind(), handler);
        self
    }

    pub fn single_query(mut self, name: &str, handler: Box<dyn SingleResultQueryHandler>) -> Self {
        self.registry.single_queries.insert(name.to_string(), handler);
        self
    }

    pub fn list_query(mut self, name: &str, handler: Box<dyn ListQueryHandler>) -> Self {
        self.registry.list_queries.insert(name.to_string(), handler);
        self
    }

    pub fn bulk_operation(mut self, name: &str, handler: Box<dyn BulkOperationHandler>) -> Self {
        self.registry.bulk_operations.insert(name.to_string(), handler);
        self
    }

    pub fn composite_loader(mut self, loader: Box<dyn CompositeEntityLoader>) -> Self {
        self.registry
            .composite_loaders
            .insert(loader.name().to_string(), loader);
        self
    }

    pub fn build(self) -> OperationRegistry {
        self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_registrations() {
        let registry = OperationRegistry::standard();
        for kind in EntityKind::ALL {
            assert!(registry.entity_handler(kind).is_some(), "{}", kind);
        }
        assert!(registry.single_query("selectLatestProcessDefinitionByKey").is_some());
        assert!(registry.list_query("selectJobsByExecutionId").is_some());
        assert!(registry.list_query("selectLatestProcessDefinitionByKey").is_none());
        assert!(registry.bulk_operation("deleteResourcesByDeploymentId").is_some());
        assert!(registry.composite_loader("processInstance").is_some());
        assert_eq!(registry.query_names().len(), 7);
    }

    #[test]
    fn test_builder_starts_empty() {
        let registry = OperationRegistry::builder().build();
        assert!(registry.entity_handler(EntityKind::Job).is_none());
        assert!(registry.schema().table_names().is_empty());
    }
}
