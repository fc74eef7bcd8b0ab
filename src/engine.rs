//! Engine Module
//!
//! The table store that owns every configured table.
//!
//! ## Responsibilities
//! - Resolve table names to tables
//! - Serialize all row mutations through one entry point
//! - Enforce schema and version-counter rules on writes
//! - Run predicate queries against a consistent snapshot of one table

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{KvError, Result};
use crate::query::{self, Predicate, QueryResult};
use crate::store::{ColumnValue, Row, SetOutcome, SetRequest, Table, TableRows, TableSchema};

/// The table store
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
///
/// - **Writes** (insert/modify/delete/set): Serialized by `write_lock`
///   - Only ONE mutation at a time, across all tables
///   - Must acquire: write_lock → table RwLock (write)
///
/// - **Reads** (lookup/query): Concurrent
///   - No write_lock needed
///   - Table RwLock (read), so a mutation is never observed half-applied
pub struct Engine {
    /// Tables by name; the set of tables never changes after construction
    tables: HashMap<String, Table>,

    /// Serializes write operations
    write_lock: Mutex<()>,
}

impl Engine {
    /// Create an engine with one empty table per schema
    ///
    /// Fails if a schema is structurally invalid or a table name repeats.
    pub fn new(schemas: Vec<TableSchema>) -> Result<Self> {
        let mut tables = HashMap::with_capacity(schemas.len());
        for schema in schemas {
            schema.validate()?;
            if tables.contains_key(&schema.name) {
                return Err(KvError::Config(format!(
                    "table '{}' is declared twice",
                    schema.name
                )));
            }
            tables.insert(schema.name.clone(), Table::new(schema));
        }

        Ok(Self {
            tables,
            write_lock: Mutex::new(()),
        })
    }

    /// Create an engine for the tables of a configuration
    pub fn open(config: &Config) -> Result<Self> {
        Self::new(config.tables.clone())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Get a copy of a row
    pub fn lookup(&self, table: &str, key: &str) -> Result<Row> {
        self.table(table)?
            .get(key)
            .ok_or_else(|| KvError::KeyNotFound(key.to_string()))
    }

    /// Run a conjunctive predicate query against one table
    pub fn query(
        &self,
        table: &str,
        predicates: &[Predicate],
        max_keys: usize,
    ) -> Result<QueryResult> {
        query::run_query(self.table(table)?, predicates, max_keys)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Create a new row with counter 1
    pub fn insert(&self, table: &str, key: &str, values: &[ColumnValue]) -> Result<()> {
        self.write(table, |table, rows| {
            if rows.contains(key) {
                return Err(KvError::KeyExists(key.to_string()));
            }
            let values = table.schema().conform(values)?;
            rows.insert(key.to_string(), values);
            Ok(())
        })
    }

    /// Replace a row's values if `expected` is 0 or equals its counter
    ///
    /// Returns the new counter.
    pub fn modify(
        &self,
        table: &str,
        key: &str,
        values: &[ColumnValue],
        expected: u64,
    ) -> Result<u64> {
        self.write(table, |table, rows| modify_row(table, rows, key, values, expected))
    }

    /// Remove a row
    pub fn delete(&self, table: &str, key: &str) -> Result<()> {
        self.write(table, |_, rows| {
            rows.remove(key)
                .map(|_| ())
                .ok_or_else(|| KvError::KeyNotFound(key.to_string()))
        })
    }

    /// Execute a SET command atomically
    ///
    /// Decision order:
    /// 1. Delete sentinel: remove the row, or `KeyNotFound`
    /// 2. Absent key: create after the schema check
    /// 3. Present key: counter check, then schema check, then modify
    pub fn set(&self, table: &str, key: &str, request: &SetRequest) -> Result<SetOutcome> {
        self.write(table, |table, rows| match request {
            SetRequest::Delete => rows
                .remove(key)
                .map(|_| SetOutcome::Deleted)
                .ok_or_else(|| KvError::KeyNotFound(key.to_string())),

            SetRequest::Upsert {
                values,
                expected_counter,
            } => {
                if rows.contains(key) {
                    let counter = modify_row(table, rows, key, values, *expected_counter)?;
                    Ok(SetOutcome::Modified { counter })
                } else {
                    let values = table.schema().conform(values)?;
                    let counter = rows.insert(key.to_string(), values);
                    Ok(SetOutcome::Created { counter })
                }
            }
        })
    }

    /// Single mutation entry point: writer lock, then the table's write lock
    fn write<T, F>(&self, table: &str, mutate: F) -> Result<T>
    where
        F: FnOnce(&Table, &mut TableRows) -> Result<T>,
    {
        let table = self.table(table)?;
        let _write_guard = self.write_lock.lock();
        let mut rows = table.rows_mut();
        mutate(table, &mut rows)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    fn table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| KvError::NoSuchTable(name.to_string()))
    }

    /// Schema of a table
    pub fn schema(&self, table: &str) -> Result<&TableSchema> {
        self.table(table).map(Table::schema)
    }

    /// Names of all tables, sorted
    pub fn table_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of rows in a table
    pub fn row_count(&self, table: &str) -> Result<usize> {
        self.table(table).map(Table::len)
    }
}

/// Counter check, then schema check, then replace
fn modify_row(
    table: &Table,
    rows: &mut TableRows,
    key: &str,
    values: &[ColumnValue],
    expected: u64,
) -> Result<u64> {
    let current = rows
        .get(key)
        .map(|row| row.counter)
        .ok_or_else(|| KvError::KeyNotFound(key.to_string()))?;

    if expected != 0 && expected != current {
        return Err(KvError::VersionConflict {
            expected,
            actual: current,
        });
    }

    let values = table.schema().conform(values)?;
    rows.replace(key, values)
        .ok_or_else(|| KvError::KeyNotFound(key.to_string()))
}
