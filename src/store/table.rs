//! Table implementation
//!
//! HashMap-based row storage with an insertion-order index, behind a RwLock.

use std::collections::{BTreeMap, HashMap};

use parking_lot::{RwLock, RwLockWriteGuard};

use crate::error::Result;
use super::{Row, TableSchema, Value};

/// Rows of one table plus their creation order
#[derive(Debug, Default)]
pub struct TableRows {
    /// key -> (sequence number, row)
    rows: HashMap<String, (u64, Row)>,

    /// sequence number -> key, in creation order
    order: BTreeMap<u64, String>,

    /// Next sequence number to hand out
    next_seq: u64,
}

impl TableRows {
    pub fn get(&self, key: &str) -> Option<&Row> {
        self.rows.get(key).map(|(_, row)| row)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.rows.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Add a new row at the end of the creation order; returns its counter
    ///
    /// Caller must have checked that `key` is absent.
    pub fn insert(&mut self, key: String, values: Vec<Value>) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;

        let row = Row {
            key: key.clone(),
            counter: 1,
            values,
        };
        self.order.insert(seq, key.clone());
        self.rows.insert(key, (seq, row));
        1
    }

    /// Replace a row's values in place and bump its counter
    pub fn replace(&mut self, key: &str, values: Vec<Value>) -> Option<u64> {
        let (_, row) = self.rows.get_mut(key)?;
        row.values = values;
        row.counter += 1;
        Some(row.counter)
    }

    pub fn remove(&mut self, key: &str) -> Option<Row> {
        let (seq, row) = self.rows.remove(key)?;
        self.order.remove(&seq);
        Some(row)
    }

    /// Rows in creation order
    pub fn iter(&self) -> impl Iterator<Item = &Row> + '_ {
        self.order
            .values()
            .filter_map(move |key| self.rows.get(key).map(|(_, row)| row))
    }
}

/// One configured table
pub struct Table {
    schema: TableSchema,
    rows: RwLock<TableRows>,
}

impl Table {
    /// Create an empty table for the given schema
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            rows: RwLock::new(TableRows::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.schema.name
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Copy of a row (read lock)
    pub fn get(&self, key: &str) -> Option<Row> {
        self.rows.read().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    /// Visit every row in creation order under a single read lock
    ///
    /// Stops at the first error returned by `visit`.
    pub fn scan<F>(&self, mut visit: F) -> Result<()>
    where
        F: FnMut(&Row) -> Result<()>,
    {
        let rows = self.rows.read();
        for row in rows.iter() {
            visit(row)?;
        }
        Ok(())
    }

    /// Exclusive access for the engine's write path
    pub(crate) fn rows_mut(&self) -> RwLockWriteGuard<'_, TableRows> {
        self.rows.write()
    }
}
