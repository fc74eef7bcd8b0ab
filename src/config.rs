//! Configuration for TableKV
//!
//! Centralized configuration with sensible defaults, plus a TOML loader for
//! the configuration file read by the server binary.
//!
//! ## File Format
//! ```toml
//! server_host = "localhost"
//! server_port = 1111
//! username = "admin"
//! password = "xxQn1..."        # output of `tablekv-cli hash-password`
//! concurrency = "pooled"       # or "sequential"
//! max_connections = 16
//! public_query = false
//!
//! [[table]]
//! name = "census"
//! columns = ["city:char[30]", "population:int"]
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{KvError, Result};
use crate::store::{ColumnDef, TableSchema};

/// Default host to listen on
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default TCP port
pub const DEFAULT_PORT: u16 = 1111;

/// Default number of worker slots in pooled mode
pub const DEFAULT_MAX_CONNECTIONS: usize = 64;

/// Main configuration for a TableKV instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// Host name or address to listen on
    pub host: String,

    /// TCP port (0 picks a free port)
    pub port: u16,

    /// How accepted connections are dispatched
    pub concurrency: ConcurrencyMode,

    // -------------------------------------------------------------------------
    // Authentication Configuration
    // -------------------------------------------------------------------------
    /// The single user allowed to log in
    pub username: String,

    /// Password in its encrypted form (see [`crate::auth::encrypt_password`])
    pub password: String,

    /// Allow QUERY before AUTH
    pub public_query: bool,

    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Table schemas; the table set is fixed for the server's lifetime
    pub tables: Vec<TableSchema>,
}

/// Connection dispatch strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcurrencyMode {
    /// Serve one connection to completion before accepting the next
    Sequential,

    /// Serve up to `max_connections` connections at once on a worker pool
    Pooled { max_connections: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            concurrency: ConcurrencyMode::Pooled {
                max_connections: DEFAULT_MAX_CONNECTIONS,
            },
            username: String::new(),
            password: String::new(),
            public_query: false,
            tables: Vec::new(),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// `host:port` for binding
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check the configuration for consistency
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(KvError::Config("server host must not be empty".to_string()));
        }
        if self.username.is_empty() || self.password.is_empty() {
            return Err(KvError::Config(
                "username and password must both be set".to_string(),
            ));
        }
        if let ConcurrencyMode::Pooled { max_connections: 0 } = self.concurrency {
            return Err(KvError::Config(
                "max_connections must be at least 1".to_string(),
            ));
        }
        if self.tables.is_empty() {
            return Err(KvError::Config("at least one table is required".to_string()));
        }

        let mut names = HashSet::new();
        for table in &self.tables {
            table.validate()?;
            if !names.insert(table.name.as_str()) {
                return Err(KvError::Config(format!(
                    "table '{}' declared more than once",
                    table.name
                )));
            }
        }

        Ok(())
    }

    /// Load and validate a configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            KvError::Config(format!("cannot read '{}': {}", path.display(), e))
        })?;
        Self::parse(&text)
    }

    /// Parse and validate TOML configuration text
    pub fn parse(text: &str) -> Result<Self> {
        let file: ConfigFile =
            toml::from_str(text).map_err(|e| KvError::Config(e.to_string()))?;
        let config = file.into_config()?;
        config.validate()?;
        Ok(config)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the host to listen on
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the TCP port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the login credentials; `password` is the encrypted form
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.username = username.into();
        self.config.password = password.into();
        self
    }

    /// Set the dispatch strategy
    pub fn concurrency(mut self, mode: ConcurrencyMode) -> Self {
        self.config.concurrency = mode;
        self
    }

    /// Serve connections one at a time
    pub fn sequential(self) -> Self {
        self.concurrency(ConcurrencyMode::Sequential)
    }

    /// Serve up to `max_connections` connections concurrently
    pub fn pooled(self, max_connections: usize) -> Self {
        self.concurrency(ConcurrencyMode::Pooled { max_connections })
    }

    /// Allow QUERY without authentication
    pub fn public_query(mut self, public: bool) -> Self {
        self.config.public_query = public;
        self
    }

    /// Add a table
    pub fn table(mut self, schema: TableSchema) -> Self {
        self.config.tables.push(schema);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

// =============================================================================
// File Loader
// =============================================================================

/// On-disk form of [`Config`]
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default = "default_host")]
    server_host: String,

    #[serde(default = "default_port")]
    server_port: u16,

    username: String,
    password: String,

    #[serde(default)]
    concurrency: ModeFile,

    #[serde(default = "default_max_connections")]
    max_connections: usize,

    #[serde(default)]
    public_query: bool,

    #[serde(default, rename = "table")]
    tables: Vec<TableFile>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ModeFile {
    Sequential,
    #[default]
    Pooled,
}

/// One `[[table]]` entry; columns are `name:int` or `name:char[N]`
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TableFile {
    name: String,
    columns: Vec<String>,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_max_connections() -> usize {
    DEFAULT_MAX_CONNECTIONS
}

impl ConfigFile {
    fn into_config(self) -> Result<Config> {
        let concurrency = match self.concurrency {
            ModeFile::Sequential => ConcurrencyMode::Sequential,
            ModeFile::Pooled => ConcurrencyMode::Pooled {
                max_connections: self.max_connections,
            },
        };

        let tables = self
            .tables
            .into_iter()
            .map(TableFile::into_schema)
            .collect::<Result<Vec<_>>>()?;

        Ok(Config {
            host: self.server_host,
            port: self.server_port,
            concurrency,
            username: self.username,
            password: self.password,
            public_query: self.public_query,
            tables,
        })
    }
}

impl TableFile {
    fn into_schema(self) -> Result<TableSchema> {
        let columns = self
            .columns
            .iter()
            .map(|decl| decl.parse::<ColumnDef>())
            .collect::<Result<Vec<_>>>()?;
        Ok(TableSchema::new(self.name, columns))
    }
}
