//! Connection Handler
//!
//! Handles individual client connections: reads request lines, feeds
//! them through the session and writes one response line per request.

use std::io::{BufWriter, ErrorKind};
use std::net::TcpStream;
use std::sync::Arc;

use crate::engine::Engine;
use crate::error::{KvError, Result};
use crate::protocol::{decode_command, encode_response, write_line, LineReader, Response};
use super::session::{AccessPolicy, Session};

/// True for I/O errors that just mean the peer went away
fn is_disconnect(e: &KvError) -> bool {
    match e {
        KvError::Io(io_err) => matches!(
            io_err.kind(),
            ErrorKind::UnexpectedEof
                | ErrorKind::ConnectionReset
                | ErrorKind::ConnectionAborted
                | ErrorKind::BrokenPipe
        ),
        _ => false,
    }
}

/// Handles a single client connection
pub struct Connection {
    /// TCP stream reader (line framed)
    reader: LineReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Protocol state for this client
    session: Session,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    pub fn new(stream: TcpStream, engine: Arc<Engine>, policy: Arc<AccessPolicy>) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        // Clone stream for separate read/write handles
        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: LineReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            session: Session::new(engine, policy),
            peer_addr,
        })
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Returns `Ok(())` when the client disconnects and an error when the
    /// client breaks the protocol; in both cases the socket is closed
    /// without a further response.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        loop {
            let line = match self.reader.read_line() {
                Ok(Some(line)) => line,
                Ok(None) => {
                    tracing::debug!("Client {} disconnected", self.peer_addr);
                    return Ok(());
                }
                Err(e) if is_disconnect(&e) => {
                    tracing::debug!("Connection to {} lost: {}", self.peer_addr, e);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    return Err(e);
                }
            };

            tracing::trace!("{} -> {}", self.peer_addr, line);

            let command = match decode_command(&line) {
                Ok(command) => command,
                Err(e) => {
                    tracing::warn!("Closing {}: {}", self.peer_addr, e);
                    return Err(e);
                }
            };

            let response = self.session.handle(command);

            if let Err(e) = self.send_response(&response) {
                if is_disconnect(&e) {
                    tracing::debug!(
                        "Client {} disconnected before response could be sent: {}",
                        self.peer_addr,
                        e
                    );
                    return Ok(());
                }
                tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
                return Err(e);
            }
        }
    }

    /// Send a response to the client
    fn send_response(&mut self, response: &Response) -> Result<()> {
        let line = encode_response(response)?;
        tracing::trace!("{} <- {}", self.peer_addr, line);
        write_line(&mut self.writer, &line)
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}
