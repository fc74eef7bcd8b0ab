//! TableKV Server Binary
//!
//! Loads a configuration file and starts the TCP server.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tablekv::network::Server;
use tablekv::{Config, Engine};
use tracing_subscriber::{fmt, EnvFilter};

/// TableKV Server
#[derive(Parser, Debug)]
#[command(name = "tablekv-server")]
#[command(about = "Networked in-memory table store")]
#[command(version)]
struct Args {
    /// Configuration file
    config: PathBuf,

    /// Override the listen address from the configuration (host:port)
    #[arg(short, long)]
    listen: Option<String>,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tablekv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("TableKV Server v{}", tablekv::VERSION);
    tracing::info!("Configuration file: {}", args.config.display());

    let mut config = match Config::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Some(listen) = &args.listen {
        match listen.rsplit_once(':').map(|(host, port)| (host, port.parse::<u16>())) {
            Some((host, Ok(port))) => {
                config.host = host.to_string();
                config.port = port;
            }
            _ => {
                tracing::error!("Invalid listen address '{}', expected host:port", listen);
                std::process::exit(1);
            }
        }
    }

    // Open engine
    let engine = match Engine::open(&config) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Engine initialized with tables: {}", engine.table_names().join(", "));

    // Start server
    let server = match Server::bind(config, engine) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to bind: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
