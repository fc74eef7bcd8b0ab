//! Session
//!
//! Per-connection protocol state machine. Pure: turns one decoded command
//! into one response, with no I/O of its own.
//!
//! ## States
//! ```text
//!   Unauthenticated ──AUTH ok──► Authenticated
//!         ▲  │
//!         └──┘ AUTH fail / gated command
//! ```
//!
//! GET and SET require `Authenticated`; QUERY does too unless the
//! configuration makes it public.

use std::sync::Arc;

use crate::auth;
use crate::config::Config;
use crate::engine::Engine;
use crate::error::Result;
use crate::protocol::{Command, CommandKind, FailReason, Record, Response};
use crate::query::Predicate;
use crate::store::{validate_name, SetRequest};

/// Credentials and access rules a session checks against
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    pub username: String,

    /// Encrypted password
    pub password: String,

    pub public_query: bool,
}

impl AccessPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            username: config.username.clone(),
            password: config.password.clone(),
            public_query: config.public_query,
        }
    }

    fn accepts(&self, username: &str, password: &str) -> bool {
        // Evaluate both so timing does not reveal which part differed
        let user_ok = auth::secrets_match(username, &self.username);
        let pass_ok = auth::secrets_match(password, &self.password);
        user_ok & pass_ok
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
}

/// Protocol state of one connection
pub struct Session {
    engine: Arc<Engine>,
    policy: Arc<AccessPolicy>,
    state: SessionState,
}

impl Session {
    pub fn new(engine: Arc<Engine>, policy: Arc<AccessPolicy>) -> Self {
        Self {
            engine,
            policy,
            state: SessionState::Unauthenticated,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == SessionState::Authenticated
    }

    /// Execute one command
    pub fn handle(&mut self, command: Command) -> Response {
        let kind = command.kind();

        if kind != CommandKind::Auth && !self.may_run(kind) {
            return Response::fail(kind, FailReason::Auth);
        }

        let result = match command {
            Command::Auth { username, password } => Ok(self.authenticate(&username, &password)),
            Command::Get { table, key } => self.get(&table, &key),
            Command::Set {
                table,
                key,
                request,
            } => self.set(&table, &key, &request),
            Command::Query {
                table,
                max_keys,
                predicates,
            } => self.query(&table, &predicates, max_keys),
        };

        result.unwrap_or_else(|e| {
            tracing::debug!("{} failed: {}", kind, e);
            Response::fail(kind, e.fail_reason())
        })
    }

    fn may_run(&self, kind: CommandKind) -> bool {
        self.is_authenticated() || (kind == CommandKind::Query && self.policy.public_query)
    }

    fn authenticate(&mut self, username: &str, password: &str) -> Response {
        if self.policy.accepts(username, password) {
            self.state = SessionState::Authenticated;
            tracing::debug!("User '{}' authenticated", username);
            Response::AuthOk
        } else {
            tracing::debug!("Authentication failed for user '{}'", username);
            Response::fail(CommandKind::Auth, FailReason::Auth)
        }
    }

    fn get(&self, table: &str, key: &str) -> Result<Response> {
        validate_name("table", table)?;
        validate_name("key", key)?;

        let row = self.engine.lookup(table, key)?;
        let schema = self.engine.schema(table)?;
        Ok(Response::Record(Record {
            values: schema.label(&row.values),
            counter: row.counter,
        }))
    }

    fn set(&self, table: &str, key: &str, request: &SetRequest) -> Result<Response> {
        validate_name("table", table)?;
        validate_name("key", key)?;

        let outcome = self.engine.set(table, key, request)?;
        tracing::trace!("SET {}.{} -> {:?}", table, key, outcome);
        Ok(Response::Set(outcome))
    }

    fn query(&self, table: &str, predicates: &[Predicate], max_keys: usize) -> Result<Response> {
        validate_name("table", table)?;

        let result = self.engine.query(table, predicates, max_keys)?;
        tracing::trace!("QUERY {} matched {}", table, result.total);
        Ok(Response::Query(result))
    }
}
