//! Entity <-> row codecs, one per entity kind

mod entities;

pub use entities::{
    DeploymentSerializer, EventSubscriptionSerializer, ExecutionSerializer, JobSerializer,
    ProcessDefinitionSerializer, ResourceSerializer, VariableInstanceSerializer,
};

use crate::error::{PersistenceError, Result};
use crate::types::{Entity, EntityKind, Row, Value};
use ahash::AHashMap;

pub trait EntitySerializer: Send + Sync {
    fn kind(&self) -> EntityKind;

    /// Encode `entity` as a table row or structured value
    fn write(&self, entity: &Entity) -> Result<Row>;

    fn read(&self, row: &Row) -> Result<Entity>;
}

/// Serializers keyed by entity kind
pub struct SerializerRegistry {
    serializers: AHashMap<EntityKind, Box<dyn EntitySerializer>>,
}

impl SerializerRegistry {
    pub fn empty() -> Self {
        Self {
            serializers: AHashMap::new(),
        }
    }

    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(DeploymentSerializer));
        registry.register(Box::new(ResourceSerializer));
        registry.register(Box::new(ProcessDefinitionSerializer));
        registry.register(Box::new(ExecutionSerializer));
        registry.register(Box::new(VariableInstanceSerializer));
        registry.register(Box::new(EventSubscriptionSerializer));
        registry.register(Box::new(JobSerializer));
        registry
    }

    pub fn register(&mut self, serializer: Box<dyn EntitySerializer>) {
        self.serializers.insert(serializer.kind(), serializer);
    }

    pub fn get(&self, kind: EntityKind) -> Result<&dyn EntitySerializer> {
        self.serializers
            .get(&kind)
            .map(|s| s.as_ref())
            .ok_or_else(|| {
                PersistenceError::Configuration(format!("no serializer registered for {}", kind))
            })
    }

    pub fn write(&self, entity: &Entity) -> Result<Row> {
        self.get(entity.kind())?.write(entity)
    }

    pub fn read(&self, kind: EntityKind, row: &Row) -> Result<Entity> {
        self.get(kind)?.read(row)
    }

    /// Encode as a structured (UDT) value for embedding in a map column
    pub fn write_udt(&self, entity: &Entity) -> Result<Value> {
        Ok(Value::Udt(self.write(entity)?))
    }

    pub fn read_udt(&self, kind: EntityKind, value: &Value) -> Result<Entity> {
        let row = Row::try_from(value)?;
        self.read(kind, &row)
    }
}
