/// Table, structured-type and index definitions plus the schema statements built from them
use serde::{Deserialize, Serialize};
use std::fmt;

/// Column data type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnType {
    Text,
    Int,
    BigInt,
    Double,
    Boolean,
    Blob,
    /// Frozen user-defined type, by name
    Udt(String),
    /// map<text, V>
    Map(Box<ColumnType>),
}

impl ColumnType {
    pub fn map_of(value: ColumnType) -> Self {
        ColumnType::Map(Box::new(value))
    }

    pub fn udt(name: &str) -> Self {
        ColumnType::Udt(name.to_string())
    }

    /// Name of the structured type this column depends on, if any
    pub fn referenced_type(&self) -> Option<&str> {
        match self {
            ColumnType::Udt(name) => Some(name),
            ColumnType::Map(inner) => inner.referenced_type(),
            _ => None,
        }
    }

    pub fn is_map(&self) -> bool {
        matches!(self, ColumnType::Map(_))
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Text => write!(f, "text"),
            ColumnType::Int => write!(f, "int"),
            ColumnType::BigInt => write!(f, "bigint"),
            ColumnType::Double => write!(f, "double"),
            ColumnType::Boolean => write!(f, "boolean"),
            ColumnType::Blob => write!(f, "blob"),
            ColumnType::Udt(name) => write!(f, "frozen<{}>", name),
            ColumnType::Map(value) => write!(f, "map<text, {}>", value),
        }
    }
}

/// Column definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub col_type: ColumnType,
}

impl ColumnDef {
    pub fn new(name: &str, col_type: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            col_type,
        }
    }
}

/// Structured (UDT) type definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDef {
    pub name: String,
    pub fields: Vec<ColumnDef>,
}

impl TypeDef {
    pub fn new(name: &str, fields: Vec<ColumnDef>) -> Self {
        Self {
            name: name.to_string(),
            fields,
        }
    }
}

/// Native secondary index on a single column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDef {
    pub name: String,
    pub table_name: String,
    pub column_name: String,
}

impl IndexDef {
    pub fn new(name: &str, table_name: &str, column_name: &str) -> Self {
        Self {
            name: name.to_string(),
            table_name: table_name.to_string(),
            column_name: column_name.to_string(),
        }
    }
}

/// Table definition
///
/// The primary key is `partition_key` followed by `clustering_key`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDef {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub partition_key: Vec<String>,
    pub clustering_key: Vec<String>,
}

impl TableDef {
    /// Table keyed by a single partition column
    pub fn new(name: &str, columns: Vec<ColumnDef>, key: &str) -> Self {
        Self {
            name: name.to_string(),
            columns,
            partition_key: vec![key.to_string()],
            clustering_key: Vec::new(),
        }
    }

    pub fn with_partition_key(mut self, columns: &[&str]) -> Self {
        self.partition_key = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_clustering_key(mut self, columns: &[&str]) -> Self {
        self.clustering_key = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn get_column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Full primary key, partition columns first
    pub fn primary_key(&self) -> impl Iterator<Item = &String> {
        self.partition_key.iter().chain(self.clustering_key.iter())
    }

    pub fn is_key_column(&self, name: &str) -> bool {
        self.primary_key().any(|c| c == name)
    }

    pub fn is_partition_column(&self, name: &str) -> bool {
        self.partition_key.iter().any(|c| c == name)
    }
}

/// DDL understood by every `ColumnStore`
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaStatement {
    CreateType(TypeDef),
    DropType(String),
    CreateTable(TableDef),
    DropTable(String),
    CreateIndex(IndexDef),
}

impl SchemaStatement {
    /// Render as CQL, qualifying names with `keyspace` when given
    pub fn to_cql(&self, keyspace: Option<&str>) -> String {
        let qualify = |name: &str| match keyspace {
            Some(ks) => format!("{}.{}", ks, name),
            None => name.to_string(),
        };
        let columns = |cols: &[ColumnDef]| {
            cols.iter()
                .map(|c| format!("{} {}", c.name, c.col_type))
                .collect::<Vec<_>>()
                .join(", ")
        };

        match self {
            SchemaStatement::CreateType(def) => format!(
                "CREATE TYPE IF NOT EXISTS {} ({});",
                qualify(&def.name),
                columns(&def.fields)
            ),
            SchemaStatement::DropType(name) => format!("DROP TYPE IF EXISTS {};", qualify(name)),
            SchemaStatement::CreateTable(def) => {
                let partition = if def.partition_key.len() == 1 {
                    def.partition_key[0].clone()
                } else {
                    format!("({})", def.partition_key.join(", "))
                };
                let key = if def.clustering_key.is_empty() {
                    partition
                } else {
                    format!("{}, {}", partition, def.clustering_key.join(", "))
                };
                format!(
                    "CREATE TABLE IF NOT EXISTS {} ({}, PRIMARY KEY ({}));",
                    qualify(&def.name),
                    columns(&def.columns),
                    key
                )
            }
            SchemaStatement::DropTable(name) => format!("DROP TABLE IF EXISTS {};", qualify(name)),
            SchemaStatement::CreateIndex(def) => format!(
                "CREATE INDEX IF NOT EXISTS {} ON {} ({});",
                def.name,
                qualify(&def.table_name),
                def.column_name
            ),
        }
    }
}

impl fmt::Display for SchemaStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_cql(None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_table_cql() {
        let def = TableDef::new(
            "cam_index",
            vec![
                ColumnDef::new("idx_name", ColumnType::Text),
                ColumnDef::new("idx_value", ColumnType::Text),
                ColumnDef::new("val", ColumnType::Text),
            ],
            "idx_name",
        )
        .with_partition_key(&["idx_name", "idx_value"])
        .with_clustering_key(&["val"]);

        assert_eq!(
            SchemaStatement::CreateTable(def).to_cql(Some("engine")),
            "CREATE TABLE IF NOT EXISTS engine.cam_index (idx_name text, idx_value text, val text, \
             PRIMARY KEY ((idx_name, idx_value), val));"
        );
    }

    #[test]
    fn test_map_of_udt() {
        let col = ColumnType::map_of(ColumnType::udt("execution"));
        assert_eq!(col.to_string(), "map<text, frozen<execution>>");
        assert_eq!(col.referenced_type(), Some("execution"));
        assert!(col.is_map());
    }

    #[test]
    fn test_key_columns() {
        let def = TableDef::new("t", vec![], "id").with_clustering_key(&["seq"]);
        assert!(def.is_key_column("id"));
        assert!(def.is_key_column("seq"));
        assert!(def.is_partition_column("id"));
        assert!(!def.is_partition_column("seq"));
    }
}
