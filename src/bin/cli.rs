//! TableKV CLI Client
//!
//! Command-line interface for interacting with TableKV.

use std::process;

use clap::{Parser, Subcommand};
use tablekv::auth::encrypt_password;
use tablekv::client::parse_record;
use tablekv::store::SetOutcome;
use tablekv::{Client, Result};

/// TableKV CLI
#[derive(Parser, Debug)]
#[command(name = "tablekv-cli")]
#[command(about = "CLI for the TableKV table store")]
#[command(version)]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:1111")]
    server: String,

    /// User name for AUTH
    #[arg(short, long, default_value = "admin")]
    user: String,

    /// Plain-text password for AUTH
    #[arg(short, long)]
    password: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a row by key
    Get { table: String, key: String },

    /// Create or modify a row, e.g. `set marks alice "grade=90"`
    Set {
        table: String,
        key: String,

        /// Column values: `col=value, col="text"`
        values: String,

        /// Only modify if the row is still at this counter
        #[arg(short, long, default_value = "0")]
        counter: u64,
    },

    /// Delete a row
    Del { table: String, key: String },

    /// List keys matching predicates, e.g. `query marks "grade > 80"`
    Query {
        table: String,

        /// Predicates: `col>10, name=Ajax` (empty matches every row)
        #[arg(default_value = "")]
        predicates: String,

        /// Maximum number of keys to return
        #[arg(short, long, default_value = "10")]
        max_keys: usize,
    },

    /// Print the encrypted form of a password for the configuration file
    HashPassword { password: String },
}

fn main() {
    let args = Args::parse();

    if let Commands::HashPassword { password } = &args.command {
        println!("{}", encrypt_password(password, None));
        return;
    }

    if let Err(e) = run(args) {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let mut client = Client::connect(args.server.as_str())?;
    if let Some(password) = &args.password {
        client.auth(&args.user, password)?;
    }

    match args.command {
        Commands::Get { table, key } => {
            let record = client.get(&table, &key)?;
            let values: Vec<String> = record
                .values
                .iter()
                .map(|c| format!("{}={}", c.name, c.value))
                .collect();
            println!("{} (counter {})", values.join(", "), record.counter);
        }
        Commands::Set {
            table,
            key,
            values,
            counter,
        } => match client.set(&table, &key, parse_record(&values)?, counter)? {
            SetOutcome::Created { counter } => println!("created (counter {})", counter),
            SetOutcome::Modified { counter } => println!("modified (counter {})", counter),
            SetOutcome::Deleted => println!("deleted"),
        },
        Commands::Del { table, key } => {
            client.delete(&table, &key)?;
            println!("deleted");
        }
        Commands::Query {
            table,
            predicates,
            max_keys,
        } => {
            let result = client.query(&table, &predicates, max_keys)?;
            for key in &result.keys {
                println!("{}", key);
            }
            if result.is_truncated() {
                println!("... {} matches in total", result.total);
            }
        }
        Commands::HashPassword { .. } => {}
    }

    client.disconnect()
}
