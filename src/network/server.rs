//! TCP Server
//!
//! Accepts connections and dispatches them according to the configured
//! concurrency mode.
//!
//! ## Responsibilities
//! - Bind the listening socket (failure is fatal to startup)
//! - Sequential mode: serve each connection to completion on the accept thread
//! - Pooled mode: reserve a worker slot, then accept, then bind the
//!   connection to the slot
//! - Stop accepting when a [`ShutdownHandle`] fires; in pooled mode wait
//!   for running connections to finish

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender};

use crate::config::{ConcurrencyMode, Config};
use crate::engine::Engine;
use crate::error::Result;
use super::connection::Connection;
use super::pool::WorkerPool;
use super::session::AccessPolicy;

/// How often the accept loop re-checks for shutdown
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Cloneable handle that stops a running server
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: Sender<()>,
}

impl ShutdownHandle {
    /// Ask the server to stop accepting connections
    pub fn shutdown(&self) {
        // A full channel means shutdown is already pending
        let _ = self.tx.try_send(());
    }
}

/// TCP server for TableKV
pub struct Server {
    config: Config,
    engine: Arc<Engine>,
    policy: Arc<AccessPolicy>,
    listener: TcpListener,
    shutdown_tx: Sender<()>,
    shutdown_rx: Receiver<()>,
}

impl Server {
    /// Bind the listening socket for `config`
    pub fn bind(config: Config, engine: Arc<Engine>) -> Result<Self> {
        let listener = TcpListener::bind(config.listen_addr())?;
        listener.set_nonblocking(true)?;

        let (shutdown_tx, shutdown_rx) = channel::bounded(1);
        let policy = Arc::new(AccessPolicy::from_config(&config));

        tracing::info!("Listening on {}", listener.local_addr()?);
        Ok(Self {
            config,
            engine,
            policy,
            listener,
            shutdown_tx,
            shutdown_rx,
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Handle for stopping this server from another thread
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.shutdown_tx.clone(),
        }
    }

    /// Serve until shut down (blocking)
    pub fn run(self) -> Result<()> {
        match self.config.concurrency {
            ConcurrencyMode::Sequential => {
                tracing::info!("Serving connections sequentially");
                self.run_sequential()
            }
            ConcurrencyMode::Pooled { max_connections } => {
                tracing::info!("Serving up to {} connections concurrently", max_connections);
                self.run_pooled(max_connections)
            }
        }
    }

    fn run_sequential(&self) -> Result<()> {
        while let Some(stream) = self.accept() {
            serve_connection(stream, Arc::clone(&self.engine), Arc::clone(&self.policy));
        }
        tracing::info!("Server stopped");
        Ok(())
    }

    fn run_pooled(&self, max_connections: usize) -> Result<()> {
        let pool = WorkerPool::new(max_connections)?;

        loop {
            let slot = match pool.acquire_timeout(POLL_INTERVAL) {
                Some(slot) => slot,
                None if self.shutdown_requested() => break,
                None => continue,
            };

            let stream = match self.accept() {
                Some(stream) => stream,
                None => break,
            };

            let engine = Arc::clone(&self.engine);
            let policy = Arc::clone(&self.policy);
            tracing::trace!("Connection bound to slot {}", slot.id());
            slot.run(move || serve_connection(stream, engine, policy))?;
        }

        tracing::info!("Waiting for {} active connections", pool.bound());
        pool.shutdown();
        tracing::info!("Server stopped");
        Ok(())
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown_rx.try_recv().is_ok()
    }

    /// Wait for the next connection; `None` once shutdown is requested
    ///
    /// Failures that concern a single socket are logged and skipped.
    fn accept(&self) -> Option<TcpStream> {
        loop {
            if self.shutdown_requested() {
                return None;
            }

            match self.listener.accept() {
                Ok((stream, addr)) => {
                    if let Err(e) = stream.set_nonblocking(false) {
                        tracing::warn!("Dropping connection from {}: {}", addr, e);
                        continue;
                    }
                    tracing::debug!("Accepted connection from {}", addr);
                    return Some(stream);
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(POLL_INTERVAL),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                    thread::sleep(POLL_INTERVAL);
                }
            }
        }
    }
}

/// Run one connection to completion
fn serve_connection(stream: TcpStream, engine: Arc<Engine>, policy: Arc<AccessPolicy>) {
    let mut connection = match Connection::new(stream, engine, policy) {
        Ok(connection) => connection,
        Err(e) => {
            tracing::warn!("Failed to set up connection: {}", e);
            return;
        }
    };

    if let Err(e) = connection.handle() {
        tracing::debug!("Connection {} closed: {}", connection.peer_addr(), e);
    }
}
