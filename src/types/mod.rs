//! Value model shared by statements, rows and serializers

mod entity;
mod table;

pub use entity::{
    next_revision, DeploymentEntity, Entity, EntityKind, EventSubscriptionEntity, ExecutionEntity,
    JobEntity, ProcessDefinitionEntity, ResourceEntity, VariableInstanceEntity,
};
pub use table::{ColumnDef, ColumnType, IndexDef, SchemaStatement, TableDef, TypeDef};

use crate::error::{PersistenceError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single cell value as the column store understands it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Int(i32),
    BigInt(i64),
    Double(f64),
    Boolean(bool),
    Blob(Vec<u8>),
    /// Structured (user-defined type) value
    Udt(Row),
    /// Map column keyed by text
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Text(_) => "text",
            Value::Int(_) => "int",
            Value::BigInt(_) => "bigint",
            Value::Double(_) => "double",
            Value::Boolean(_) => "boolean",
            Value::Blob(_) => "blob",
            Value::Udt(_) => "udt",
            Value::Map(_) => "map",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Text(s) => write!(f, "'{}'", s),
            Value::Int(v) => write!(f, "{}", v),
            Value::BigInt(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Blob(b) => write!(f, "<blob {} bytes>", b.len()),
            Value::Udt(row) => write!(f, "{{udt {} fields}}", row.len()),
            Value::Map(m) => write!(f, "{{map {} entries}}", m.len()),
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::BigInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl From<Row> for Value {
    fn from(v: Row) -> Self {
        Value::Udt(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Primary-key component. Only text and integer columns can be part of a key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum KeyValue {
    Int(i64),
    Text(String),
}

impl TryFrom<&Value> for KeyValue {
    type Error = PersistenceError;

    fn try_from(value: &Value) -> Result<Self> {
        match value {
            Value::Text(s) => Ok(KeyValue::Text(s.clone())),
            Value::Int(v) => Ok(KeyValue::Int(i64::from(*v))),
            Value::BigInt(v) => Ok(KeyValue::Int(*v)),
            other => Err(PersistenceError::InvalidData(format!(
                "{} value cannot be used as a key component",
                other.type_name()
            ))),
        }
    }
}

/// Schemaless row: column name -> value, ordered by column name
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Row {
    columns: BTreeMap<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style column assignment
    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    pub fn set(&mut self, column: &str, value: impl Into<Value>) {
        self.columns.insert(column.to_string(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.get(column)
    }

    pub fn remove(&mut self, column: &str) -> Option<Value> {
        self.columns.remove(column)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.columns.iter()
    }

    pub fn into_columns(self) -> BTreeMap<String, Value> {
        self.columns
    }

    fn missing(column: &str, expected: &str) -> PersistenceError {
        PersistenceError::InvalidData(format!("column '{}' is not a non-null {}", column, expected))
    }

    pub fn text(&self, column: &str) -> Result<String> {
        self.opt_text(column)?.ok_or_else(|| Self::missing(column, "text"))
    }

    pub fn opt_text(&self, column: &str) -> Result<Option<String>> {
        match self.get(column) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Text(s)) => Ok(Some(s.clone())),
            Some(_) => Err(Self::missing(column, "text")),
        }
    }

    pub fn int(&self, column: &str) -> Result<i32> {
        self.opt_int(column)?.ok_or_else(|| Self::missing(column, "int"))
    }

    pub fn opt_int(&self, column: &str) -> Result<Option<i32>> {
        match self.get(column) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Int(v)) => Ok(Some(*v)),
            Some(_) => Err(Self::missing(column, "int")),
        }
    }

    pub fn bigint(&self, column: &str) -> Result<i64> {
        self.opt_bigint(column)?.ok_or_else(|| Self::missing(column, "bigint"))
    }

    pub fn opt_bigint(&self, column: &str) -> Result<Option<i64>> {
        match self.get(column) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::BigInt(v)) => Ok(Some(*v)),
            Some(Value::Int(v)) => Ok(Some(i64::from(*v))),
            Some(_) => Err(Self::missing(column, "bigint")),
        }
    }

    pub fn opt_double(&self, column: &str) -> Result<Option<f64>> {
        match self.get(column) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Double(v)) => Ok(Some(*v)),
            Some(_) => Err(Self::missing(column, "double")),
        }
    }

    /// Booleans default to false when absent, as unset cells read back as null
    pub fn boolean(&self, column: &str) -> Result<bool> {
        match self.get(column) {
            None | Some(Value::Null) => Ok(false),
            Some(Value::Boolean(v)) => Ok(*v),
            Some(_) => Err(Self::missing(column, "boolean")),
        }
    }

    pub fn blob(&self, column: &str) -> Result<Vec<u8>> {
        match self.get(column) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Blob(b)) => Ok(b.clone()),
            Some(_) => Err(Self::missing(column, "blob")),
        }
    }

    /// Map column; an absent map reads as empty
    pub fn map(&self, column: &str) -> Result<BTreeMap<String, Value>> {
        match self.get(column) {
            None | Some(Value::Null) => Ok(BTreeMap::new()),
            Some(Value::Map(m)) => Ok(m.clone()),
            Some(_) => Err(Self::missing(column, "map")),
        }
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}

impl TryFrom<&Value> for Row {
    type Error = PersistenceError;

    fn try_from(value: &Value) -> Result<Self> {
        match value {
            Value::Udt(row) => Ok(row.clone()),
            other => Err(PersistenceError::InvalidData(format!(
                "expected udt value, found {}",
                other.type_name()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_accessors() {
        let row = Row::new()
            .with("id", "e1")
            .with("version", 3)
            .with("created", 17_i64)
            .with("active", true)
            .with("parent_id", Value::Null);

        assert_eq!(row.text("id").unwrap(), "e1");
        assert_eq!(row.int("version").unwrap(), 3);
        assert_eq!(row.bigint("created").unwrap(), 17);
        assert!(row.boolean("active").unwrap());
        assert_eq!(row.opt_text("parent_id").unwrap(), None);
        assert_eq!(row.opt_text("missing").unwrap(), None);
        assert!(row.text("version").is_err());
    }

    #[test]
    fn test_option_into_value() {
        let none: Option<String> = None;
        assert_eq!(Value::from(none), Value::Null);
        assert_eq!(Value::from(Some(4_i32)), Value::Int(4));
    }

    #[test]
    fn test_key_value_conversion() {
        assert_eq!(KeyValue::try_from(&Value::Int(2)).unwrap(), KeyValue::Int(2));
        assert_eq!(
            KeyValue::try_from(&Value::from("k")).unwrap(),
            KeyValue::Text("k".into())
        );
        assert!(KeyValue::try_from(&Value::Double(1.0)).is_err());
    }
}
