//! Client library for connecting to a TableKV server
//!
//! Provides a blocking, one-request-at-a-time interface over the wire
//! protocol. Names and predicates are checked locally so that malformed
//! requests never reach the server.

use std::io::{BufWriter, ErrorKind};
use std::net::{TcpStream, ToSocketAddrs};

use crate::auth;
use crate::error::{KvError, Result};
use crate::protocol::{
    decode_response, encode_command, write_line, Command, CommandKind, LineReader, Record,
    Response,
};
use crate::query::{parse_predicates, QueryResult};
use crate::store::{validate_name, ColumnValue, SetOutcome, SetRequest, Value};

/// Client for connecting to a TableKV server
pub struct Client {
    reader: LineReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    /// Connect to a TableKV server
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        let reader = LineReader::new(stream.try_clone()?);
        let writer = BufWriter::new(stream);

        Ok(Self { reader, writer })
    }

    /// Send a command and receive its response
    fn request(&mut self, command: &Command) -> Result<Response> {
        let line = encode_command(command)?;
        write_line(&mut self.writer, &line)?;

        match self.reader.read_line()? {
            Some(line) => decode_response(&line),
            None => Err(KvError::Io(std::io::Error::new(
                ErrorKind::UnexpectedEof,
                "server closed the connection",
            ))),
        }
    }

    /// Log in; the password is encrypted before it is sent
    pub fn auth(&mut self, username: &str, password: &str) -> Result<()> {
        let command = Command::Auth {
            username: username.to_string(),
            password: auth::encrypt_password(password, None),
        };

        match self.request(&command)? {
            Response::AuthOk => Ok(()),
            other => Err(unexpected(CommandKind::Auth, other)),
        }
    }

    /// Read one row
    pub fn get(&mut self, table: &str, key: &str) -> Result<Record> {
        validate_name("table", table)?;
        validate_name("key", key)?;

        let command = Command::Get {
            table: table.to_string(),
            key: key.to_string(),
        };
        match self.request(&command)? {
            Response::Record(record) => Ok(record),
            other => Err(unexpected(CommandKind::Get, other)),
        }
    }

    /// Create or modify a row
    ///
    /// A non-zero `counter` makes the write conditional on the row still
    /// being at that version.
    pub fn set(
        &mut self,
        table: &str,
        key: &str,
        values: Vec<ColumnValue>,
        counter: u64,
    ) -> Result<SetOutcome> {
        self.send_set(
            table,
            key,
            SetRequest::Upsert {
                values,
                expected_counter: counter,
            },
        )
    }

    /// Delete a row
    pub fn delete(&mut self, table: &str, key: &str) -> Result<()> {
        self.send_set(table, key, SetRequest::Delete).map(|_| ())
    }

    fn send_set(&mut self, table: &str, key: &str, request: SetRequest) -> Result<SetOutcome> {
        validate_name("table", table)?;
        validate_name("key", key)?;

        let command = Command::Set {
            table: table.to_string(),
            key: key.to_string(),
            request,
        };
        match self.request(&command)? {
            Response::Set(outcome) => Ok(outcome),
            other => Err(unexpected(CommandKind::Set, other)),
        }
    }

    /// Find up to `max_keys` keys whose rows satisfy `predicates`
    ///
    /// `predicates` uses the text syntax of [`parse_predicates`], e.g.
    /// `"grade > 80, name = Ajax"`.
    pub fn query(&mut self, table: &str, predicates: &str, max_keys: usize) -> Result<QueryResult> {
        validate_name("table", table)?;
        let predicates = parse_predicates(predicates)?;

        let command = Command::Query {
            table: table.to_string(),
            max_keys,
            predicates,
        };
        match self.request(&command)? {
            Response::Query(result) => Ok(result),
            other => Err(unexpected(CommandKind::Query, other)),
        }
    }

    /// Close the connection
    pub fn disconnect(self) -> Result<()> {
        self.reader.get_ref().shutdown(std::net::Shutdown::Both)?;
        Ok(())
    }
}

fn unexpected(kind: CommandKind, response: Response) -> KvError {
    match response {
        Response::Fail { reason, .. } => KvError::Rejected(reason),
        other => KvError::Protocol(format!("unexpected reply to {}: {:?}", kind, other)),
    }
}

/// Parse `grade=90, name="Bloor Danforth"` into column values
///
/// Bare integers become integer values; anything else, or anything in
/// double quotes, is a string. Commas inside quotes do not split.
pub fn parse_record(text: &str) -> Result<Vec<ColumnValue>> {
    split_unquoted(text)
        .into_iter()
        .map(|clause| {
            let (name, raw) = clause.split_once('=').ok_or_else(|| {
                KvError::Validation(format!("'{}' is not of the form column=value", clause.trim()))
            })?;
            let name = name.trim();
            validate_name("column", name)?;

            let raw = raw.trim();
            let value = match raw.strip_prefix('"').and_then(|r| r.strip_suffix('"')) {
                Some(quoted) => Value::Str(quoted.to_string()),
                None => match raw.parse::<i64>() {
                    Ok(n) => Value::Int(n),
                    Err(_) => Value::Str(raw.to_string()),
                },
            };
            Ok(ColumnValue::new(name, value))
        })
        .collect()
}

fn split_unquoted(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (idx, c) in text.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                parts.push(&text[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}
