//! # TableKV
//!
//! A networked, in-memory table store with:
//! - Fixed, configured table schemas (string and integer columns)
//! - Optimistic concurrency through per-row version counters
//! - Conjunctive predicate queries over one table
//! - A line-oriented, delimiter-framed TCP protocol
//! - Sequential or pooled connection dispatch
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │          (Sequential, or Worker Pool of N slots)             │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  one line per request
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │              Connection  +  Protocol Codec                   │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  Command / Response
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                 Session (AUTH state machine)                 │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                        Engine                                │
//! │            (Single Writer / Multi Reader)                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!          ┌────────────┴────────────┐
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │   Tables    │◄─────────│    Query    │
//!   │  (RwLock)   │   scan   │ (predicates)│
//!   └─────────────┘          └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod auth;

pub mod store;
pub mod query;
pub mod engine;
pub mod protocol;
pub mod network;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{KvError, Result};
pub use config::{ConcurrencyMode, Config};
pub use engine::Engine;
pub use client::Client;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of TableKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
