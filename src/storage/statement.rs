//! Statements, batches and selects handed to a `ColumnStore`
//!
//! Builders mirror the CQL they stand for:
//! ```ignore
//! let st = Update::table("cam_proc_inst")
//!     .set("version", 2)
//!     .where_eq("id", "pi1")
//!     .only_if("version", 1);
//! ```

use crate::types::{Row, Value};
use std::fmt;

/// Equality predicate on a column
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub column: String,
    pub value: Value,
}

impl Clause {
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Self {
            column: column.to_string(),
            value: value.into(),
        }
    }
}

/// Lightweight-transaction condition
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `IF column = value`
    Equals(Clause),
    /// `IF EXISTS`
    Exists,
    /// `IF NOT EXISTS`
    NotExists,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Assignment {
    /// `column = value`
    Set(String, Value),
    /// `column[key] = value` on a map column
    PutEntry {
        column: String,
        key: String,
        value: Value,
    },
    /// `DELETE column[key]` on a map column
    RemoveEntry { column: String, key: String },
}

impl Assignment {
    pub fn column(&self) -> &str {
        match self {
            Assignment::Set(column, _) => column,
            Assignment::PutEntry { column, .. } => column,
            Assignment::RemoveEntry { column, .. } => column,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub table: String,
    pub values: Row,
    pub conditions: Vec<Condition>,
}

impl Insert {
    pub fn into_table(table: &str) -> Self {
        Self {
            table: table.to_string(),
            values: Row::new(),
            conditions: Vec::new(),
        }
    }

    pub fn value(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.values.set(column, value);
        self
    }

    pub fn values(mut self, row: Row) -> Self {
        for (column, value) in row.into_columns() {
            self.values.set(&column, value);
        }
        self
    }

    pub fn if_not_exists(mut self) -> Self {
        self.conditions.push(Condition::NotExists);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub table: String,
    pub assignments: Vec<Assignment>,
    pub key: Vec<Clause>,
    pub conditions: Vec<Condition>,
}

impl Update {
    pub fn table(table: &str) -> Self {
        Self {
            table: table.to_string(),
            assignments: Vec::new(),
            key: Vec::new(),
            conditions: Vec::new(),
        }
    }

    pub fn set(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.assignments
            .push(Assignment::Set(column.to_string(), value.into()));
        self
    }

    pub fn put_entry(mut self, column: &str, key: &str, value: impl Into<Value>) -> Self {
        self.assignments.push(Assignment::PutEntry {
            column: column.to_string(),
            key: key.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn remove_entry(mut self, column: &str, key: &str) -> Self {
        self.assignments.push(Assignment::RemoveEntry {
            column: column.to_string(),
            key: key.to_string(),
        });
        self
    }

    pub fn where_eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.key.push(Clause::eq(column, value));
        self
    }

    pub fn only_if(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Equals(Clause::eq(column, value)));
        self
    }

    pub fn if_exists(mut self) -> Self {
        self.conditions.push(Condition::Exists);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    pub table: String,
    pub key: Vec<Clause>,
    pub conditions: Vec<Condition>,
}

impl Delete {
    pub fn from(table: &str) -> Self {
        Self {
            table: table.to_string(),
            key: Vec::new(),
            conditions: Vec::new(),
        }
    }

    pub fn where_eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.key.push(Clause::eq(column, value));
        self
    }

    pub fn only_if(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Equals(Clause::eq(column, value)));
        self
    }
}

/// A single data-manipulation statement
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Insert(Insert),
    Update(Update),
    Delete(Delete),
}

impl Statement {
    pub fn table(&self) -> &str {
        match self {
            Statement::Insert(s) => &s.table,
            Statement::Update(s) => &s.table,
            Statement::Delete(s) => &s.table,
        }
    }

    pub fn conditions(&self) -> &[Condition] {
        match self {
            Statement::Insert(s) => &s.conditions,
            Statement::Update(s) => &s.conditions,
            Statement::Delete(s) => &s.conditions,
        }
    }

    pub fn is_conditional(&self) -> bool {
        !self.conditions().is_empty()
    }
}

impl From<Insert> for Statement {
    fn from(s: Insert) -> Self {
        Statement::Insert(s)
    }
}

impl From<Update> for Statement {
    fn from(s: Update) -> Self {
        Statement::Update(s)
    }
}

impl From<Delete> for Statement {
    fn from(s: Delete) -> Self {
        Statement::Delete(s)
    }
}

fn write_where(f: &mut fmt::Formatter<'_>, key: &[Clause]) -> fmt::Result {
    let parts: Vec<String> = key
        .iter()
        .map(|c| format!("{} = {}", c.column, c.value))
        .collect();
    write!(f, " WHERE {}", parts.join(" AND "))
}

fn write_conditions(f: &mut fmt::Formatter<'_>, conditions: &[Condition]) -> fmt::Result {
    if conditions.is_empty() {
        return Ok(());
    }
    let parts: Vec<String> = conditions
        .iter()
        .map(|c| match c {
            Condition::Equals(clause) => format!("{} = {}", clause.column, clause.value),
            Condition::Exists => "EXISTS".to_string(),
            Condition::NotExists => "NOT EXISTS".to_string(),
        })
        .collect();
    write!(f, " IF {}", parts.join(" AND "))
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Insert(s) => {
                let columns: Vec<&str> = s.values.iter().map(|(c, _)| c.as_str()).collect();
                let values: Vec<String> = s.values.iter().map(|(_, v)| v.to_string()).collect();
                write!(
                    f,
                    "INSERT INTO {} ({}) VALUES ({})",
                    s.table,
                    columns.join(", "),
                    values.join(", ")
                )?;
                write_conditions(f, &s.conditions)
            }
            Statement::Update(s) => {
                let sets: Vec<String> = s
                    .assignments
                    .iter()
                    .map(|a| match a {
                        Assignment::Set(c, v) => format!("{} = {}", c, v),
                        Assignment::PutEntry { column, key, value } => {
                            format!("{}['{}'] = {}", column, key, value)
                        }
                        Assignment::RemoveEntry { column, key } => {
                            format!("{} = {} - {{'{}'}}", column, column, key)
                        }
                    })
                    .collect();
                write!(f, "UPDATE {} SET {}", s.table, sets.join(", "))?;
                write_where(f, &s.key)?;
                write_conditions(f, &s.conditions)
            }
            Statement::Delete(s) => {
                write!(f, "DELETE FROM {}", s.table)?;
                write_where(f, &s.key)?;
                write_conditions(f, &s.conditions)
            }
        }
    }
}

/// Logged batch of statements sharing one write timestamp
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    statements: Vec<Statement>,
    timestamp: Option<i64>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, statement: impl Into<Statement>) {
        self.statements.push(statement.into());
    }

    pub fn extend(&mut self, statements: impl IntoIterator<Item = Statement>) {
        self.statements.extend(statements);
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn has_conditions(&self) -> bool {
        self.statements.iter().any(Statement::is_conditional)
    }

    /// Write timestamp applied to every statement of the batch
    pub fn set_default_timestamp(&mut self, timestamp: i64) {
        self.timestamp = Some(timestamp);
    }

    pub fn default_timestamp(&self) -> Option<i64> {
        self.timestamp
    }
}

/// Equality-filtered read
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub table: String,
    pub filters: Vec<Clause>,
    pub limit: Option<usize>,
}

impl Select {
    pub fn from(table: &str) -> Self {
        Self {
            table: table.to_string(),
            filters: Vec::new(),
            limit: None,
        }
    }

    pub fn where_eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Clause::eq(column, value));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_statement_rendering() {
        let st: Statement = Update::table("cam_proc_inst")
            .set("version", 2)
            .where_eq("id", "pi1")
            .only_if("version", 1)
            .into();
        assert_eq!(
            st.to_string(),
            "UPDATE cam_proc_inst SET version = 2 WHERE id = 'pi1' IF version = 1"
        );
        assert!(st.is_conditional());
    }

    #[test]
    fn test_batch_conditions() {
        let mut batch = Batch::new();
        batch.add(Insert::into_table("cam_deployment").value("id", "d1"));
        assert!(!batch.has_conditions());

        batch.add(Delete::from("cam_job").where_eq("id", "j1").only_if("version", 3));
        assert!(batch.has_conditions());
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.default_timestamp(), None);

        batch.set_default_timestamp(42);
        assert_eq!(batch.default_timestamp(), Some(42));
    }

    #[test]
    fn test_map_entry_rendering() {
        let st: Statement = Update::table("cam_proc_inst")
            .remove_entry("variables", "v1")
            .where_eq("id", "pi1")
            .into();
        assert_eq!(
            st.to_string(),
            "UPDATE cam_proc_inst SET variables = variables - {'v1'} WHERE id = 'pi1'"
        );
    }
}
