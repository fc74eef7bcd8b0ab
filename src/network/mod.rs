//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - Single acceptor thread
//! - Sequential mode: connections served one at a time on the acceptor
//! - Pooled mode: fixed worker pool, one connection per slot
//! - Each connection owns a [`Session`]; commands routed through Engine

mod server;
mod pool;
mod session;
mod connection;

pub use server::{Server, ShutdownHandle};
pub use pool::{Job, Slot, WorkerPool};
pub use session::{AccessPolicy, Session, SessionState};
pub use connection::Connection;
