//! Command definitions
//!
//! Represents commands from clients.

use std::fmt;

use crate::query::Predicate;
use crate::store::SetRequest;

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Auth,
    Get,
    Set,
    Query,
}

impl CommandKind {
    /// Name used on the wire
    pub fn as_str(self) -> &'static str {
        match self {
            CommandKind::Auth => "AUTH",
            CommandKind::Get => "GET",
            CommandKind::Set => "SET",
            CommandKind::Query => "QUERY",
        }
    }

    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "AUTH" => Some(CommandKind::Auth),
            "GET" => Some(CommandKind::Get),
            "SET" => Some(CommandKind::Set),
            "QUERY" => Some(CommandKind::Query),
            _ => None,
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Log in; `password` is already in its encrypted form
    Auth { username: String, password: String },

    /// Read one row
    Get { table: String, key: String },

    /// Create, modify or delete one row
    Set {
        table: String,
        key: String,
        request: SetRequest,
    },

    /// Find keys whose rows satisfy every predicate
    Query {
        table: String,
        max_keys: usize,
        predicates: Vec<Predicate>,
    },
}

impl Command {
    /// Get the command type
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Auth { .. } => CommandKind::Auth,
            Command::Get { .. } => CommandKind::Get,
            Command::Set { .. } => CommandKind::Set,
            Command::Query { .. } => CommandKind::Query,
        }
    }
}
