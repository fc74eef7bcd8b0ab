//! Protocol Module
//!
//! Defines the line-oriented wire protocol for client-server communication.
//!
//! ## Framing
//! One request or response per `\n`-terminated line (see [`frame`]).
//!
//! ## Fields
//! Fields are wrapped in pairs of identical delimiters:
//!
//! | Delimiter | Carries                          |
//! |-----------|----------------------------------|
//! | `&`       | command name, query operator     |
//! | `^`       | table name, user name            |
//! | `*`       | key, password                    |
//! | `@`       | column name, query result key    |
//! | `$`       | string value, query literal      |
//! | `#`       | integer value, max keys, count   |
//! | `~`       | expected counter                 |
//!
//! `!` ends a column or predicate; `?` ends a value block.
//! None of the delimiter characters may appear inside a field.
//!
//! ## Commands
//! - AUTH  - log in with user name and encrypted password
//! - GET   - read one row and its counter
//! - SET   - create, modify (optionally counter-checked) or delete a row
//! - QUERY - list keys whose rows satisfy all predicates

mod command;
mod response;
mod codec;
pub mod frame;

pub use command::{Command, CommandKind};
pub use response::{FailReason, Record, Response};
pub use codec::{
    contains_reserved, decode_command, decode_response, encode_command, encode_response, RESERVED,
};
pub use frame::{write_line, LineReader, MAX_LINE_LEN};
