//! Line framing
//!
//! Every request and response is one line terminated by `\n`; a
//! preceding `\r` is tolerated and stripped.

use std::io::{ErrorKind, Read, Write};

use bytes::BytesMut;

use crate::error::{KvError, Result};

/// Longest accepted line, excluding the terminator
pub const MAX_LINE_LEN: usize = 8192;

const READ_CHUNK: usize = 4096;

/// Buffered line reader over any byte stream
pub struct LineReader<R> {
    inner: R,
    buf: BytesMut,
}

impl<R: Read> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(READ_CHUNK),
        }
    }

    /// Read the next line without its terminator
    ///
    /// Returns `Ok(None)` when the peer closes the stream on a line
    /// boundary. A stream closed mid-line, an over-long line, or a line
    /// that is not UTF-8 is a protocol error.
    pub fn read_line(&mut self) -> Result<Option<String>> {
        loop {
            if let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
                let mut line = self.buf.split_to(pos + 1);
                line.truncate(pos);
                if line.last() == Some(&b'\r') {
                    line.truncate(pos - 1);
                }
                if line.len() > MAX_LINE_LEN {
                    return Err(KvError::Protocol(format!(
                        "line of {} bytes exceeds limit of {}",
                        line.len(),
                        MAX_LINE_LEN
                    )));
                }
                return String::from_utf8(line.to_vec())
                    .map(Some)
                    .map_err(|_| KvError::Protocol("line is not valid UTF-8".to_string()));
            }

            // Allow room for "\r\n" after a maximum-length line
            if self.buf.len() > MAX_LINE_LEN + 1 {
                return Err(KvError::Protocol(format!(
                    "no line terminator within {} bytes",
                    MAX_LINE_LEN
                )));
            }

            let mut chunk = [0u8; READ_CHUNK];
            let n = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };

            if n == 0 {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                let partial = self.buf.len();
                self.buf.clear();
                return Err(KvError::Protocol(format!(
                    "stream closed after {} bytes of an unterminated line",
                    partial
                )));
            }

            self.buf.extend_from_slice(&chunk[..n]);
        }
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }
}

/// Write `line` followed by `\n` and flush
pub fn write_line<W: Write>(writer: &mut W, line: &str) -> Result<()> {
    writer.write_all(line.as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
