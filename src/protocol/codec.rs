//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! Every field is wrapped in a pair of identical delimiter characters;
//! `!` ends a column or predicate and `?` ends a value block.
//!
//! ### Request (Command) Format
//! ```text
//! &AUTH&^user^*encrypted-password*?
//! &GET&^table^*key*?
//! &SET&^table^*key*@NULL@?                                   (delete)
//! &SET&^table^*key*@col@$text$!@col@#42#!?~3~                (counter optional)
//! &QUERY&^table^#max-keys#@col@&>&$10$!@col@&=&$text$!
//! ```
//!
//! ### Response Format
//! ```text
//! AUTH SUCCESS
//! GET SUCCESS @col@#42#!? COUNTER 3
//! SET SUCCESS MODIFY COUNTER 4
//! SET FAIL COUNTER
//! &QUERY&$SUCCESS$#total#@key@!@key@!
//! &QUERY&$FAIL$^TABLE^
//! ```
//!
//! Decoding is a two-stage process: a tokenizer splits the line into
//! delimited fields and marks, then a recursive-descent parser builds
//! the typed command or response.

use crate::error::{KvError, Result};
use crate::query::{Operator, Predicate, QueryResult};
use crate::store::{ColumnValue, SetOutcome, SetRequest, Value};
use super::{Command, CommandKind, FailReason, Record, Response};

/// Characters that may never appear inside a field
pub const RESERVED: [char; 9] = ['&', '^', '*', '@', '$', '#', '!', '~', '?'];

/// Field contents reserved for the delete sentinel
const DELETE_SENTINEL: &str = "NULL";

/// True if `text` contains a reserved delimiter or a line terminator
pub fn contains_reserved(text: &str) -> bool {
    text.chars()
        .any(|c| RESERVED.contains(&c) || c == '\n' || c == '\r')
}

fn check_field(what: &str, text: &str) -> Result<()> {
    if contains_reserved(text) {
        return Err(KvError::Validation(format!(
            "{} '{}' contains a reserved character",
            what, text
        )));
    }
    Ok(())
}

// =============================================================================
// Tokenizer
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    /// Text between a pair of identical delimiters
    Field(char, &'a str),

    /// `!` or `?`
    Mark(char),
}

fn is_pair_delimiter(c: u8) -> bool {
    matches!(c, b'&' | b'^' | b'*' | b'@' | b'$' | b'#' | b'~')
}

fn tokenize(line: &str) -> Result<Vec<Token<'_>>> {
    let bytes = line.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let c = bytes[pos];
        if is_pair_delimiter(c) {
            let delim = c as char;
            let start = pos + 1;
            let len = line[start..].find(delim).ok_or_else(|| {
                KvError::Protocol(format!(
                    "unterminated '{}' field at offset {}",
                    delim, pos
                ))
            })?;
            let text = &line[start..start + len];
            if contains_reserved(text) {
                return Err(KvError::Protocol(format!(
                    "reserved character inside '{}' field at offset {}",
                    delim, pos
                )));
            }
            tokens.push(Token::Field(delim, text));
            pos = start + len + 1;
        } else if c == b'!' || c == b'?' {
            tokens.push(Token::Mark(c as char));
            pos += 1;
        } else {
            return Err(KvError::Protocol(format!(
                "unexpected character {:?} at offset {}",
                line[pos..].chars().next().unwrap_or_default(),
                pos
            )));
        }
    }

    Ok(tokens)
}

// =============================================================================
// Parser
// =============================================================================

struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(line: &'a str) -> Result<Self> {
        Ok(Self {
            tokens: tokenize(line)?,
            pos: 0,
        })
    }

    fn peek(&self) -> Option<Token<'a>> {
        self.tokens.get(self.pos).copied()
    }

    fn peek_second(&self) -> Option<Token<'a>> {
        self.tokens.get(self.pos + 1).copied()
    }

    fn next(&mut self) -> Option<Token<'a>> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn field(&mut self, delim: char, what: &str) -> Result<&'a str> {
        match self.next() {
            Some(Token::Field(d, text)) if d == delim => Ok(text),
            Some(other) => Err(KvError::Protocol(format!(
                "expected {} ('{}' field), found {:?}",
                what, delim, other
            ))),
            None => Err(KvError::Protocol(format!(
                "expected {} ('{}' field), found end of line",
                what, delim
            ))),
        }
    }

    fn mark(&mut self, mark: char) -> Result<()> {
        match self.next() {
            Some(Token::Mark(m)) if m == mark => Ok(()),
            Some(other) => Err(KvError::Protocol(format!(
                "expected '{}', found {:?}",
                mark, other
            ))),
            None => Err(KvError::Protocol(format!(
                "expected '{}', found end of line",
                mark
            ))),
        }
    }

    fn eat_mark(&mut self, mark: char) -> bool {
        if self.peek() == Some(Token::Mark(mark)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn finish(&self) -> Result<()> {
        match self.peek() {
            None => Ok(()),
            Some(token) => Err(KvError::Protocol(format!(
                "unexpected trailing {:?}",
                token
            ))),
        }
    }

    /// `( '@' COL '@' ( '$' STR '$' | '#' INT '#' ) '!' )* '?'`
    fn columns(&mut self) -> Result<Vec<ColumnValue>> {
        let mut values = Vec::new();
        loop {
            if self.eat_mark('?') {
                return Ok(values);
            }
            let name = self.field('@', "column name")?;
            let value = match self.next() {
                Some(Token::Field('$', text)) => Value::Str(text.to_string()),
                Some(Token::Field('#', text)) => Value::Int(parse_number(text, "integer value")?),
                Some(other) => {
                    return Err(KvError::Protocol(format!(
                        "expected value for column '{}', found {:?}",
                        name, other
                    )))
                }
                None => {
                    return Err(KvError::Protocol(format!(
                        "missing value for column '{}'",
                        name
                    )))
                }
            };
            self.mark('!')?;
            values.push(ColumnValue::new(name, value));
        }
    }

    /// Delete sentinel, or columns followed by an optional `~COUNTER~`
    fn set_request(&mut self) -> Result<SetRequest> {
        if self.peek() == Some(Token::Field('@', DELETE_SENTINEL))
            && self.peek_second() == Some(Token::Mark('?'))
        {
            self.pos += 2;
            return Ok(SetRequest::Delete);
        }

        let values = self.columns()?;
        let expected_counter = match self.peek() {
            Some(Token::Field('~', _)) => parse_number(self.field('~', "counter")?, "counter")?,
            _ => 0,
        };

        Ok(SetRequest::Upsert {
            values,
            expected_counter,
        })
    }

    /// `( '@' COL '@' '&' OP '&' '$' LITERAL '$' '!' )*`
    fn predicates(&mut self) -> Result<Vec<Predicate>> {
        let mut predicates = Vec::new();
        while !self.at_end() {
            let column = self.field('@', "predicate column")?;
            let op_text = self.field('&', "predicate operator")?;
            let op = single_char(op_text)
                .and_then(Operator::from_char)
                .ok_or_else(|| {
                    KvError::Protocol(format!("unknown operator '{}'", op_text))
                })?;
            let literal = self.field('$', "predicate value")?;
            self.mark('!')?;

            // Validity of the literal is judged by the query engine
            predicates.push(Predicate {
                column: column.to_string(),
                op,
                literal: literal.to_string(),
            });
        }
        Ok(predicates)
    }
}

fn single_char(text: &str) -> Option<char> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

fn parse_number<T: std::str::FromStr>(text: &str, what: &str) -> Result<T> {
    text.trim()
        .parse()
        .map_err(|_| KvError::Protocol(format!("invalid {}: '{}'", what, text)))
}

fn strip_terminator(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command as one line (without the trailing newline)
///
/// Fails with a validation error instead of emitting a reserved
/// character inside a field.
pub fn encode_command(command: &Command) -> Result<String> {
    let mut out = String::new();
    out.push('&');
    out.push_str(command.kind().as_str());
    out.push('&');

    match command {
        Command::Auth { username, password } => {
            check_field("username", username)?;
            check_field("password", password)?;
            out.push_str(&format!("^{}^*{}*?", username, password));
        }
        Command::Get { table, key } => {
            check_field("table", table)?;
            check_field("key", key)?;
            out.push_str(&format!("^{}^*{}*?", table, key));
        }
        Command::Set {
            table,
            key,
            request,
        } => {
            check_field("table", table)?;
            check_field("key", key)?;
            out.push_str(&format!("^{}^*{}*", table, key));
            match request {
                SetRequest::Delete => {
                    out.push('@');
                    out.push_str(DELETE_SENTINEL);
                    out.push_str("@?");
                }
                SetRequest::Upsert {
                    values,
                    expected_counter,
                } => {
                    encode_columns(&mut out, values)?;
                    if *expected_counter != 0 {
                        out.push_str(&format!("~{}~", expected_counter));
                    }
                }
            }
        }
        Command::Query {
            table,
            max_keys,
            predicates,
        } => {
            check_field("table", table)?;
            out.push_str(&format!("^{}^#{}#", table, max_keys));
            for predicate in predicates {
                check_field("predicate column", &predicate.column)?;
                check_field("predicate value", &predicate.literal)?;
                out.push_str(&format!(
                    "@{}@&{}&${}$!",
                    predicate.column, predicate.op, predicate.literal
                ));
            }
        }
    }

    Ok(out)
}

fn encode_columns(out: &mut String, values: &[ColumnValue]) -> Result<()> {
    for column in values {
        check_field("column name", &column.name)?;
        match &column.value {
            Value::Str(text) => {
                check_field("value", text)?;
                out.push_str(&format!("@{}@${}$!", column.name, text));
            }
            Value::Int(n) => out.push_str(&format!("@{}@#{}#!", column.name, n)),
        }
    }
    out.push('?');
    Ok(())
}

/// Decode one request line
///
/// Any framing violation (missing or unterminated delimiter pair, bad
/// number, unknown command, trailing garbage) is a protocol error.
pub fn decode_command(line: &str) -> Result<Command> {
    let mut parser = Parser::new(strip_terminator(line))?;

    let name = parser.field('&', "command name")?;
    let kind = CommandKind::from_wire(name)
        .ok_or_else(|| KvError::Protocol(format!("unknown command '{}'", name)))?;
    let arg = parser.field('^', "table or user name")?.to_string();

    let command = match kind {
        CommandKind::Auth => {
            let password = parser.field('*', "password")?.to_string();
            parser.eat_mark('?');
            Command::Auth {
                username: arg,
                password,
            }
        }
        CommandKind::Get => {
            let key = parser.field('*', "key")?.to_string();
            parser.eat_mark('?');
            Command::Get { table: arg, key }
        }
        CommandKind::Set => {
            let key = parser.field('*', "key")?.to_string();
            let request = parser.set_request()?;
            Command::Set {
                table: arg,
                key,
                request,
            }
        }
        CommandKind::Query => {
            let max_keys = parse_number(parser.field('#', "max keys")?, "max keys")?;
            let predicates = parser.predicates()?;
            Command::Query {
                table: arg,
                max_keys,
                predicates,
            }
        }
    };

    parser.finish()?;
    Ok(command)
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response as one line (without the trailing newline)
pub fn encode_response(response: &Response) -> Result<String> {
    let line = match response {
        Response::AuthOk => "AUTH SUCCESS".to_string(),
        Response::Record(record) => {
            let mut values = String::new();
            encode_columns(&mut values, &record.values)?;
            format!("GET SUCCESS {} COUNTER {}", values, record.counter)
        }
        Response::Set(SetOutcome::Created { counter }) => {
            format!("SET SUCCESS CREATE COUNTER {}", counter)
        }
        Response::Set(SetOutcome::Modified { counter }) => {
            format!("SET SUCCESS MODIFY COUNTER {}", counter)
        }
        Response::Set(SetOutcome::Deleted) => "SET SUCCESS DELETE".to_string(),
        Response::Query(result) => {
            let mut out = format!("&QUERY&$SUCCESS$#{}#", result.total);
            for key in &result.keys {
                check_field("key", key)?;
                out.push_str(&format!("@{}@!", key));
            }
            out
        }
        Response::Fail {
            command: CommandKind::Query,
            reason,
        } => format!("&QUERY&$FAIL$^{}^", reason),
        Response::Fail { command, reason } => format!("{} FAIL {}", command, reason),
    };
    Ok(line)
}

/// Decode one response line
pub fn decode_response(line: &str) -> Result<Response> {
    let line = strip_terminator(line);
    if line.starts_with('&') {
        return decode_query_response(line);
    }

    let mut parts = line.splitn(3, ' ');
    let command = parts.next().unwrap_or_default();
    let status = parts.next().unwrap_or_default();
    let rest = parts.next().unwrap_or_default();

    let kind = CommandKind::from_wire(command)
        .ok_or_else(|| KvError::Protocol(format!("unknown response '{}'", line)))?;

    match (kind, status) {
        (_, "FAIL") => Ok(Response::fail(kind, parse_reason(rest.trim())?)),
        (CommandKind::Auth, "SUCCESS") => Ok(Response::AuthOk),
        (CommandKind::Get, "SUCCESS") => {
            let (block, counter) = rest.rsplit_once(" COUNTER ").ok_or_else(|| {
                KvError::Protocol(format!("GET response without counter: '{}'", line))
            })?;
            let mut parser = Parser::new(block)?;
            let values = parser.columns()?;
            parser.finish()?;
            Ok(Response::Record(Record {
                values,
                counter: parse_number(counter, "counter")?,
            }))
        }
        (CommandKind::Set, "SUCCESS") => {
            let outcome = match rest.split_once(" COUNTER ") {
                Some(("CREATE", n)) => SetOutcome::Created {
                    counter: parse_number(n, "counter")?,
                },
                Some(("MODIFY", n)) => SetOutcome::Modified {
                    counter: parse_number(n, "counter")?,
                },
                None if rest == "DELETE" => SetOutcome::Deleted,
                _ => {
                    return Err(KvError::Protocol(format!(
                        "unknown SET outcome '{}'",
                        rest
                    )))
                }
            };
            Ok(Response::Set(outcome))
        }
        _ => Err(KvError::Protocol(format!("unknown response '{}'", line))),
    }
}

fn decode_query_response(line: &str) -> Result<Response> {
    let mut parser = Parser::new(line)?;
    let name = parser.field('&', "command name")?;
    if name != CommandKind::Query.as_str() {
        return Err(KvError::Protocol(format!(
            "unexpected block response for '{}'",
            name
        )));
    }

    let response = match parser.field('$', "status")? {
        "SUCCESS" => {
            let total = parse_number(parser.field('#', "match count")?, "match count")?;
            let mut keys = Vec::new();
            while !parser.at_end() {
                keys.push(parser.field('@', "key")?.to_string());
                parser.mark('!')?;
            }
            Response::Query(QueryResult { keys, total })
        }
        "FAIL" => {
            let reason = parse_reason(parser.field('^', "reason")?)?;
            Response::fail(CommandKind::Query, reason)
        }
        other => {
            return Err(KvError::Protocol(format!("unknown status '{}'", other)));
        }
    };

    parser.finish()?;
    Ok(response)
}

fn parse_reason(token: &str) -> Result<FailReason> {
    FailReason::from_wire(token)
        .ok_or_else(|| KvError::Protocol(format!("unknown failure reason '{}'", token)))
}
