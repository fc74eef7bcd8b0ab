//! Response definitions
//!
//! Represents responses to clients.

use std::fmt;

use crate::query::QueryResult;
use crate::store::{ColumnValue, SetOutcome};
use super::CommandKind;

/// Detail token of a FAIL response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailReason {
    /// Bad credentials, or a gated command before AUTH
    Auth,
    Table,
    Key,
    Column,
    Counter,
    /// Illegal characters in a table or key name
    Invalid,
    /// Unparsable predicate or operator/type mismatch
    Predicate,
}

impl FailReason {
    pub fn as_str(self) -> &'static str {
        match self {
            FailReason::Auth => "AUTH",
            FailReason::Table => "TABLE",
            FailReason::Key => "KEY",
            FailReason::Column => "COLUMN",
            FailReason::Counter => "COUNTER",
            FailReason::Invalid => "INVALID",
            FailReason::Predicate => "PREDICATE",
        }
    }

    pub fn from_wire(token: &str) -> Option<Self> {
        match token {
            "AUTH" => Some(FailReason::Auth),
            "TABLE" => Some(FailReason::Table),
            "KEY" => Some(FailReason::Key),
            "COLUMN" => Some(FailReason::Column),
            "COUNTER" => Some(FailReason::Counter),
            "INVALID" => Some(FailReason::Invalid),
            "PREDICATE" => Some(FailReason::Predicate),
            _ => None,
        }
    }
}

impl fmt::Display for FailReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row as returned by GET
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Values labelled with their column names, in schema order
    pub values: Vec<ColumnValue>,

    /// Current version counter of the row
    pub counter: u64,
}

/// A response to send to client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// `AUTH SUCCESS`
    AuthOk,

    /// `GET SUCCESS <values> COUNTER <n>`
    Record(Record),

    /// `SET SUCCESS CREATE|MODIFY|DELETE`
    Set(SetOutcome),

    /// `&QUERY&$SUCCESS$...`
    Query(QueryResult),

    /// `<COMMAND> FAIL <REASON>`
    Fail {
        command: CommandKind,
        reason: FailReason,
    },
}

impl Response {
    /// Create a FAIL response
    pub fn fail(command: CommandKind, reason: FailReason) -> Self {
        Response::Fail { command, reason }
    }

    /// Command this response answers
    pub fn command(&self) -> CommandKind {
        match self {
            Response::AuthOk => CommandKind::Auth,
            Response::Record(_) => CommandKind::Get,
            Response::Set(_) => CommandKind::Set,
            Response::Query(_) => CommandKind::Query,
            Response::Fail { command, .. } => *command,
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, Response::Fail { .. })
    }
}
