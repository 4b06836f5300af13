//! In-memory reference column store
//!
//! Linearizable single-process implementation of [`ColumnStore`]:
//! - cell-level last-write-wins on write timestamps, row deletes shadow older cells
//!   (a delete wins a timestamp tie)
//! - map columns keep one cell per entry, so concurrent entry writes merge
//! - conditional batches check every condition before applying anything and must
//!   stay inside one partition
//! - reads filter only on key columns or natively indexed columns

use super::snapshot::{self, SnapshotData};
use super::statement::{Assignment, Batch, Clause, Condition, Statement};
use super::timestamp::MonotonicTimestamps;
use super::{ColumnStore, ResultRow, Select};
use crate::config::MemoryStoreConfig;
use crate::error::{PersistenceError, Result};
use crate::types::{
    ColumnType, IndexDef, KeyValue, Row, SchemaStatement, TableDef, TypeDef, Value,
};
use ahash::{AHashMap, AHashSet};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Cell address inside a row: a plain column, or one entry of a map column
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
struct CellKey {
    column: String,
    entry: Option<String>,
}

impl CellKey {
    fn column(column: &str) -> Self {
        Self {
            column: column.to_string(),
            entry: None,
        }
    }

    fn entry(column: &str, key: &str) -> Self {
        Self {
            column: column.to_string(),
            entry: Some(key.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Cell {
    /// `Null` marks a deleted cell
    value: Value,
    timestamp: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct StoredRow {
    cells: BTreeMap<CellKey, Cell>,
    /// Row marker written by INSERT; keeps a row alive without regular cells
    marker: Option<i64>,
    /// Newest row deletion
    tombstone: Option<i64>,
}

impl StoredRow {
    fn shadowed(&self, timestamp: i64) -> bool {
        self.tombstone.map_or(false, |t| timestamp <= t)
    }

    fn is_live(&self) -> bool {
        self.marker.is_some() || self.cells.values().any(|c| !c.value.is_null())
    }

    fn write_marker(&mut self, timestamp: i64) {
        if self.shadowed(timestamp) {
            return;
        }
        self.marker = Some(self.marker.map_or(timestamp, |m| m.max(timestamp)));
    }

    fn write_cell(&mut self, key: CellKey, value: Value, timestamp: i64) {
        if self.shadowed(timestamp) {
            return;
        }
        if let Some(existing) = self.cells.get(&key) {
            if existing.timestamp > timestamp {
                return;
            }
        }
        self.cells.insert(key, Cell { value, timestamp });
    }

    /// Overwrite a whole map column: older entries are dropped, then the new ones written
    fn replace_map(&mut self, column: &str, entries: BTreeMap<String, Value>, timestamp: i64) {
        if self.shadowed(timestamp) {
            return;
        }
        self.cells
            .retain(|k, c| !(k.column == column && k.entry.is_some() && c.timestamp < timestamp));
        for (key, value) in entries {
            self.write_cell(CellKey::entry(column, &key), value, timestamp);
        }
    }

    fn set_column(&mut self, column: &str, value: &Value, is_map: bool, timestamp: i64) {
        match value {
            Value::Map(entries) if is_map => self.replace_map(column, entries.clone(), timestamp),
            Value::Null if is_map => self.replace_map(column, BTreeMap::new(), timestamp),
            _ => self.write_cell(CellKey::column(column), value.clone(), timestamp),
        }
    }

    fn delete(&mut self, timestamp: i64) {
        self.tombstone = Some(self.tombstone.map_or(timestamp, |t| t.max(timestamp)));
        self.cells.retain(|_, c| c.timestamp > timestamp);
        if self.marker.map_or(false, |m| m <= timestamp) {
            self.marker = None;
        }
    }

    fn column_value(&self, table: &TableDef, key: &[KeyValue], column: &str) -> Value {
        if let Some(pos) = table.primary_key().position(|c| c == column) {
            return match &key[pos] {
                KeyValue::Int(v) => key_column_value(table, column, *v),
                KeyValue::Text(s) => Value::Text(s.clone()),
            };
        }
        let is_map = table
            .get_column(column)
            .map_or(false, |c| c.col_type.is_map());
        if is_map {
            let entries: BTreeMap<String, Value> = self
                .cells
                .iter()
                .filter(|(k, c)| k.column == column && !c.value.is_null())
                .filter_map(|(k, c)| k.entry.clone().map(|e| (e, c.value.clone())))
                .collect();
            return if entries.is_empty() {
                Value::Null
            } else {
                Value::Map(entries)
            };
        }
        self.cells
            .get(&CellKey::column(column))
            .map(|c| c.value.clone())
            .unwrap_or(Value::Null)
    }

    fn render(&self, table: &TableDef, key: &[KeyValue]) -> Row {
        let mut row = Row::new();
        for (pos, column) in table.primary_key().enumerate() {
            let value = match &key[pos] {
                KeyValue::Int(v) => key_column_value(table, column, *v),
                KeyValue::Text(s) => Value::Text(s.clone()),
            };
            row.set(column, value);
        }
        for column in &table.columns {
            if table.is_key_column(&column.name) {
                continue;
            }
            let value = self.column_value(table, key, &column.name);
            if !value.is_null() {
                row.set(&column.name, value);
            }
        }
        row
    }
}

/// Integer key components are stored widened; read them back with their declared width
fn key_column_value(table: &TableDef, column: &str, value: i64) -> Value {
    match table.get_column(column).map(|c| &c.col_type) {
        Some(ColumnType::Int) => Value::Int(value as i32),
        _ => Value::BigInt(value),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct MemTable {
    pub(crate) def: TableDef,
    pub(crate) indexes: Vec<IndexDef>,
    rows: BTreeMap<Vec<KeyValue>, StoredRow>,
}

impl MemTable {
    fn new(def: TableDef) -> Self {
        Self {
            def,
            indexes: Vec::new(),
            rows: BTreeMap::new(),
        }
    }

    fn require_column(&self, column: &str) -> Result<&ColumnType> {
        self.def
            .get_column(column)
            .map(|c| &c.col_type)
            .ok_or_else(|| {
                PersistenceError::Store(format!(
                    "undefined column '{}' in table '{}'",
                    column, self.def.name
                ))
            })
    }

    fn key_part(&self, column: &str, value: Option<&Value>) -> Result<KeyValue> {
        match value {
            Some(v) if !v.is_null() => KeyValue::try_from(v),
            _ => Err(PersistenceError::Store(format!(
                "missing key column '{}' for table '{}'",
                column, self.def.name
            ))),
        }
    }

    fn key_from_clauses(&self, clauses: &[Clause]) -> Result<Vec<KeyValue>> {
        for clause in clauses {
            if !self.def.is_key_column(&clause.column) {
                return Err(PersistenceError::Store(format!(
                    "'{}' is not a primary key column of '{}'",
                    clause.column, self.def.name
                )));
            }
        }
        self.def
            .primary_key()
            .map(|column| {
                let value = clauses.iter().find(|c| &c.column == column).map(|c| &c.value);
                self.key_part(column, value)
            })
            .collect()
    }

    fn key_from_row(&self, row: &Row) -> Result<Vec<KeyValue>> {
        self.def
            .primary_key()
            .map(|column| self.key_part(column, row.get(column)))
            .collect()
    }

    fn statement_key(&self, statement: &Statement) -> Result<Vec<KeyValue>> {
        match statement {
            Statement::Insert(s) => self.key_from_row(&s.values),
            Statement::Update(s) => self.key_from_clauses(&s.key),
            Statement::Delete(s) => self.key_from_clauses(&s.key),
        }
    }

    fn validate(&self, statement: &Statement) -> Result<()> {
        match statement {
            Statement::Insert(s) => {
                for (column, _) in s.values.iter() {
                    self.require_column(column)?;
                }
            }
            Statement::Update(s) => {
                for assignment in &s.assignments {
                    let column = assignment.column();
                    let col_type = self.require_column(column)?;
                    if self.def.is_key_column(column) {
                        return Err(PersistenceError::Store(format!(
                            "primary key column '{}' cannot be updated",
                            column
                        )));
                    }
                    let entry_op = !matches!(assignment, Assignment::Set(..));
                    if entry_op && !col_type.is_map() {
                        return Err(PersistenceError::Store(format!(
                            "column '{}' is not a map",
                            column
                        )));
                    }
                }
            }
            Statement::Delete(_) => {}
        }
        for condition in statement.conditions() {
            if let Condition::Equals(clause) = condition {
                self.require_column(&clause.column)?;
            }
        }
        Ok(())
    }

    fn partition<'k>(&self, key: &'k [KeyValue]) -> &'k [KeyValue] {
        &key[..self.def.partition_key.len()]
    }

    fn live_row(&self, key: &[KeyValue]) -> Option<&StoredRow> {
        self.rows.get(key).filter(|r| r.is_live())
    }

    /// Returns the checked columns' current values when a condition fails
    fn check(&self, key: &[KeyValue], conditions: &[Condition]) -> Option<Row> {
        let row = self.live_row(key);
        let mut failed = false;
        let mut current = Row::new();
        for condition in conditions {
            let holds = match condition {
                Condition::Exists => row.is_some(),
                Condition::NotExists => row.is_none(),
                Condition::Equals(clause) => {
                    let value = row
                        .map(|r| r.column_value(&self.def, key, &clause.column))
                        .unwrap_or(Value::Null);
                    let holds = value == clause.value;
                    current.set(&clause.column, value);
                    holds
                }
            };
            failed |= !holds;
        }
        failed.then_some(current)
    }

    fn apply(&mut self, statement: &Statement, key: Vec<KeyValue>, timestamp: i64) {
        let map_columns: AHashSet<String> = self
            .def
            .columns
            .iter()
            .filter(|c| c.col_type.is_map())
            .map(|c| c.name.clone())
            .collect();
        let key_columns: AHashSet<String> = self.def.primary_key().cloned().collect();
        let row = self.rows.entry(key).or_default();

        match statement {
            Statement::Insert(s) => {
                row.write_marker(timestamp);
                for (column, value) in s.values.iter() {
                    if !key_columns.contains(column) {
                        row.set_column(column, value, map_columns.contains(column), timestamp);
                    }
                }
            }
            Statement::Update(s) => {
                for assignment in &s.assignments {
                    match assignment {
                        Assignment::Set(column, value) => {
                            row.set_column(column, value, map_columns.contains(column), timestamp)
                        }
                        Assignment::PutEntry { column, key, value } => {
                            row.write_cell(CellKey::entry(column, key), value.clone(), timestamp)
                        }
                        Assignment::RemoveEntry { column, key } => {
                            row.write_cell(CellKey::entry(column, key), Value::Null, timestamp)
                        }
                    }
                }
            }
            Statement::Delete(_) => row.delete(timestamp),
        }
    }

    fn is_filterable(&self, column: &str) -> bool {
        self.def.is_key_column(column) || self.indexes.iter().any(|i| i.column_name == column)
    }

    fn live_count(&self) -> u64 {
        self.rows.values().filter(|r| r.is_live()).count() as u64
    }

    fn max_timestamp(&self) -> i64 {
        self.rows
            .values()
            .flat_map(|r| {
                r.cells
                    .values()
                    .map(|c| c.timestamp)
                    .chain(r.marker)
                    .chain(r.tombstone)
            })
            .max()
            .unwrap_or(0)
    }
}

/// Store statistics
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StoreStats {
    /// Batches applied
    pub batches_executed: u64,
    /// Conditional batches rejected on a failed condition
    pub batches_rejected: u64,
    pub statements_applied: u64,
    pub reads: u64,
    pub timestamps_issued: u64,
}

impl StoreStats {
    /// Total calls that reached the store
    pub fn total_calls(&self) -> u64 {
        self.batches_executed + self.batches_rejected + self.reads + self.timestamps_issued
    }
}

pub struct MemoryStore {
    tables: RwLock<AHashMap<String, MemTable>>,
    types: DashMap<String, TypeDef>,
    clock: MonotonicTimestamps,
    stats: Mutex<StoreStats>,
    config: MemoryStoreConfig,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_config(MemoryStoreConfig::default())
    }

    pub fn with_config(config: MemoryStoreConfig) -> Self {
        Self {
            tables: RwLock::new(AHashMap::new()),
            types: DashMap::new(),
            clock: MonotonicTimestamps::new(),
            stats: Mutex::new(StoreStats::default()),
            config,
        }
    }

    pub fn stats(&self) -> StoreStats {
        self.stats.lock().clone()
    }

    pub fn reset_stats(&self) {
        *self.stats.lock() = StoreStats::default();
    }

    pub fn type_exists(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Persist tables, types and the write clock to `path`
    pub fn save_snapshot<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let data = {
            let tables = self.tables.read();
            let mut tables: Vec<MemTable> = tables.values().cloned().collect();
            tables.sort_by(|a, b| a.def.name.cmp(&b.def.name));
            let mut types: Vec<TypeDef> = self.types.iter().map(|t| t.value().clone()).collect();
            types.sort_by(|a, b| a.name.cmp(&b.name));
            SnapshotData {
                types,
                tables,
                last_timestamp: self.clock.last(),
            }
        };
        let bytes = snapshot::encode(&data, self.config.compress_snapshots)?;

        let path = path.as_ref();
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Restore a store saved with [`MemoryStore::save_snapshot`]
    pub fn open_snapshot<P: AsRef<Path>>(path: P, config: MemoryStoreConfig) -> Result<Self> {
        let bytes = fs::read(path)?;
        let data = snapshot::decode(&bytes)?;

        let last = data
            .tables
            .iter()
            .map(MemTable::max_timestamp)
            .fold(data.last_timestamp, i64::max);
        let store = Self {
            tables: RwLock::new(
                data.tables
                    .into_iter()
                    .map(|t| (t.def.name.clone(), t))
                    .collect(),
            ),
            types: DashMap::new(),
            clock: MonotonicTimestamps::starting_after(last),
            stats: Mutex::new(StoreStats::default()),
            config,
        };
        for def in data.types {
            store.types.insert(def.name.clone(), def);
        }
        Ok(store)
    }

    fn check_types_exist<'a>(&self, columns: impl Iterator<Item = &'a ColumnType>) -> Result<()> {
        for col_type in columns {
            if let Some(name) = col_type.referenced_type() {
                if !self.types.contains_key(name) {
                    return Err(PersistenceError::Store(format!("unknown type '{}'", name)));
                }
            }
        }
        Ok(())
    }
}

impl ColumnStore for MemoryStore {
    fn execute_batch(&self, batch: &Batch) -> Result<Vec<ResultRow>> {
        let timestamp = batch.default_timestamp().unwrap_or_else(|| self.clock.next());
        let mut tables = self.tables.write();

        let mut keyed = Vec::with_capacity(batch.len());
        for statement in batch.statements() {
            let table = tables
                .get(statement.table())
                .ok_or_else(|| PersistenceError::TableNotFound(statement.table().to_string()))?;
            table.validate(statement)?;
            let key = table.statement_key(statement)?;
            let partition = table.partition(&key).to_vec();
            keyed.push((statement, key, partition));
        }

        let conditional = batch.has_conditions();
        if conditional {
            let partitions: AHashSet<(&str, &[KeyValue])> = keyed
                .iter()
                .map(|(st, _, partition)| (st.table(), partition.as_slice()))
                .collect();
            if partitions.len() > 1 {
                return Err(PersistenceError::Store(
                    "conditional batch spans multiple partitions".to_string(),
                ));
            }

            for (statement, key, _) in &keyed {
                let current = tables
                    .get(statement.table())
                    .and_then(|t| t.check(key, statement.conditions()));
                if let Some(current) = current {
                    self.stats.lock().batches_rejected += 1;
                    return Ok(vec![ResultRow::rejected(current)]);
                }
            }
        }

        let applied = keyed.len() as u64;
        for (statement, key, _) in keyed {
            if let Some(table) = tables.get_mut(statement.table()) {
                table.apply(statement, key, timestamp);
            }
        }

        let mut stats = self.stats.lock();
        stats.batches_executed += 1;
        stats.statements_applied += applied;

        Ok(if conditional {
            vec![ResultRow::applied()]
        } else {
            Vec::new()
        })
    }

    fn select(&self, select: &Select) -> Result<Vec<Row>> {
        self.stats.lock().reads += 1;

        let tables = self.tables.read();
        let table = tables
            .get(&select.table)
            .ok_or_else(|| PersistenceError::TableNotFound(select.table.clone()))?;

        for filter in &select.filters {
            table.require_column(&filter.column)?;
            if !table.is_filterable(&filter.column) {
                return Err(PersistenceError::Store(format!(
                    "filtering '{}' on non-indexed column '{}' requires ALLOW FILTERING",
                    select.table, filter.column
                )));
            }
        }

        let limit = select.limit.unwrap_or(usize::MAX);
        let rows = table
            .rows
            .iter()
            .filter(|(_, row)| row.is_live())
            .filter(|(key, row)| {
                select
                    .filters
                    .iter()
                    .all(|f| row.column_value(&table.def, key, &f.column) == f.value)
            })
            .take(limit)
            .map(|(key, row)| row.render(&table.def, key))
            .collect();
        Ok(rows)
    }

    fn execute_schema(&self, statement: &SchemaStatement) -> Result<()> {
        match statement {
            SchemaStatement::CreateType(def) => {
                if self.types.contains_key(&def.name) {
                    return Ok(());
                }
                self.check_types_exist(def.fields.iter().map(|f| &f.col_type))?;
                self.types.insert(def.name.clone(), def.clone());
            }
            SchemaStatement::DropType(name) => {
                let tables = self.tables.read();
                let user = tables.values().find(|t| {
                    t.def
                        .columns
                        .iter()
                        .any(|c| c.col_type.referenced_type() == Some(name.as_str()))
                });
                if let Some(table) = user {
                    return Err(PersistenceError::Store(format!(
                        "cannot drop type '{}': still used by table '{}'",
                        name, table.def.name
                    )));
                }
                self.types.remove(name);
            }
            SchemaStatement::CreateTable(def) => {
                let mut tables = self.tables.write();
                if tables.contains_key(&def.name) {
                    return Ok(());
                }
                if def.partition_key.is_empty() {
                    return Err(PersistenceError::Store(format!(
                        "table '{}' has no partition key",
                        def.name
                    )));
                }
                if let Some(missing) = def.primary_key().find(|c| def.get_column(c).is_none()) {
                    return Err(PersistenceError::Store(format!(
                        "key column '{}' is not defined in table '{}'",
                        missing, def.name
                    )));
                }
                self.check_types_exist(def.columns.iter().map(|c| &c.col_type))?;
                tables.insert(def.name.clone(), MemTable::new(def.clone()));
            }
            SchemaStatement::DropTable(name) => {
                self.tables.write().remove(name);
            }
            SchemaStatement::CreateIndex(def) => {
                let mut tables = self.tables.write();
                let table = tables
                    .get_mut(&def.table_name)
                    .ok_or_else(|| PersistenceError::TableNotFound(def.table_name.clone()))?;
                table.require_column(&def.column_name)?;
                if !table.indexes.iter().any(|i| i.name == def.name) {
                    table.indexes.push(def.clone());
                }
            }
        }
        Ok(())
    }

    fn table_exists(&self, table: &str) -> bool {
        self.tables.read().contains_key(table)
    }

    fn count(&self, table: &str) -> Result<u64> {
        self.stats.lock().reads += 1;
        self.tables
            .read()
            .get(table)
            .map(MemTable::live_count)
            .ok_or_else(|| PersistenceError::TableNotFound(table.to_string()))
    }

    fn next_timestamp(&self) -> i64 {
        self.stats.lock().timestamps_issued += 1;
        self.clock.next()
    }
}
