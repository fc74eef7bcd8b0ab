//! Table schemas
//!
//! Column definitions are fixed at configuration load and never change.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{KvError, Result};
use super::{ColumnValue, Value};

/// Kind of a column, fixed per schema position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    String,
    Integer,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKind::String => write!(f, "string"),
            ColumnKind::Integer => write!(f, "integer"),
        }
    }
}

/// A single column declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub kind: ColumnKind,

    /// Maximum character count for String columns (`char[N]`)
    pub max_len: Option<usize>,
}

impl ColumnDef {
    pub fn integer(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ColumnKind::Integer,
            max_len: None,
        }
    }

    pub fn string(name: impl Into<String>, max_len: Option<usize>) -> Self {
        Self {
            name: name.into(),
            kind: ColumnKind::String,
            max_len,
        }
    }
}

/// Parses a `name:int` or `name:char[N]` declaration (N >= 1)
impl FromStr for ColumnDef {
    type Err = KvError;

    fn from_str(decl: &str) -> Result<Self> {
        let (name, kind) = decl
            .split_once(':')
            .ok_or_else(|| KvError::Config(format!("column '{}' needs a type", decl)))?;
        let (name, kind) = (name.trim(), kind.trim());

        if kind == "int" {
            return Ok(ColumnDef::integer(name));
        }

        let len = kind
            .strip_prefix("char[")
            .and_then(|rest| rest.strip_suffix(']'))
            .ok_or_else(|| {
                KvError::Config(format!("unknown type '{}' for column '{}'", kind, name))
            })?;
        match len.trim().parse::<usize>() {
            Ok(n) if n >= 1 => Ok(ColumnDef::string(name, Some(n))),
            _ => Err(KvError::Config(format!(
                "invalid length '{}' for column '{}'",
                len, name
            ))),
        }
    }
}

/// Name plus ordered columns of one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnDef>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDef>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// Number of columns every row must carry
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Position and definition of a column by name
    pub fn column(&self, name: &str) -> Option<(usize, &ColumnDef)> {
        self.columns.iter().enumerate().find(|(_, c)| c.name == name)
    }

    /// Check the structural rules a loaded schema must satisfy
    ///
    /// - table and column names are `[A-Za-z0-9]+`
    /// - at least one column
    /// - column names unique within the table
    pub fn validate(&self) -> Result<()> {
        validate_name("table", &self.name)
            .map_err(|e| KvError::Config(e.to_string()))?;

        if self.columns.is_empty() {
            return Err(KvError::Config(format!(
                "table '{}' declares no columns",
                self.name
            )));
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            validate_name("column", &column.name)
                .map_err(|e| KvError::Config(e.to_string()))?;
            if !seen.insert(column.name.as_str()) {
                return Err(KvError::Config(format!(
                    "table '{}' declares column '{}' twice",
                    self.name, column.name
                )));
            }
            if column.max_len == Some(0) {
                return Err(KvError::Config(format!(
                    "column '{}.{}' has zero width",
                    self.name, column.name
                )));
            }
        }

        Ok(())
    }

    /// Match named wire values against this schema and strip the names
    ///
    /// Count, order, names and kinds must all match exactly.
    pub fn conform(&self, values: &[ColumnValue]) -> Result<Vec<Value>> {
        if values.len() != self.columns.len() {
            return Err(KvError::SchemaMismatch(format!(
                "table '{}' has {} columns, got {}",
                self.name,
                self.columns.len(),
                values.len()
            )));
        }

        let mut row = Vec::with_capacity(values.len());
        for (def, given) in self.columns.iter().zip(values) {
            if def.name != given.name {
                return Err(KvError::SchemaMismatch(format!(
                    "expected column '{}', got '{}'",
                    def.name, given.name
                )));
            }
            if given.value.kind() != def.kind {
                return Err(KvError::SchemaMismatch(format!(
                    "column '{}' is {}, got {}",
                    def.name,
                    def.kind,
                    given.value.kind()
                )));
            }
            if let (Some(max), Value::Str(s)) = (def.max_len, &given.value) {
                if s.chars().count() > max {
                    return Err(KvError::SchemaMismatch(format!(
                        "column '{}' holds at most {} characters",
                        def.name, max
                    )));
                }
            }
            row.push(given.value.clone());
        }

        Ok(row)
    }

    /// Re-attach column names to stored values
    pub fn label(&self, values: &[Value]) -> Vec<ColumnValue> {
        self.columns
            .iter()
            .zip(values)
            .map(|(def, value)| ColumnValue::new(def.name.clone(), value.clone()))
            .collect()
    }
}

/// True if `name` is non-empty and ASCII alphanumeric
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// Validate a table, key or column name
pub fn validate_name(what: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(KvError::Validation(format!("{} name is empty", what)));
    }
    if !is_valid_name(name) {
        return Err(KvError::Validation(format!(
            "{} name '{}' must contain only letters and digits",
            what, name
        )));
    }
    Ok(())
}
