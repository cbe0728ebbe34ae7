//! mongokit CLI
//!
//! Usage:
//!   mkit id new                     Print a new ObjectId
//!   mkit id new -n 10 --parts       Print 10 ids with their decoded fields
//!   mkit id inspect <HEX>           Decode an ObjectId
//!   mkit id inspect <HEX> --json    Decode an ObjectId as JSON
//!   mkit db ping --config app.toml  Connect and ping a MongoDB server

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mongokit::object_id::{self, ObjectIdParts};
use mongokit::{Client, ClientConfig, ObjectId};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

#[derive(Parser)]
#[command(name = "mkit")]
#[command(about = "mongokit command-line tools", long_about = None)]
#[command(version)]
struct Cli {
    /// Log level (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate and decode ObjectIds
    Id {
        #[command(subcommand)]
        action: IdAction,
    },
    /// MongoDB connectivity
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

#[derive(Subcommand)]
enum IdAction {
    /// Generate new ObjectIds
    New {
        /// Number of ids to generate
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,

        /// Also print the decoded fields of each id
        #[arg(long)]
        parts: bool,
    },
    /// Decode the fields of an ObjectId
    Inspect {
        /// 24-character hex ObjectId
        hex: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum DbAction {
    /// Connect with a TOML config and ping the server
    Ping {
        /// Path to the client config file
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,
    },
}

/// Decoded ObjectId as printed by `mkit id inspect`
#[derive(Debug, Serialize, PartialEq)]
struct InspectReport {
    id: String,
    timestamp: u32,
    datetime: String,
    machine: String,
    process: u16,
    counter: u32,
}

impl From<ObjectId> for InspectReport {
    fn from(oid: ObjectId) -> Self {
        let parts = ObjectIdParts::from(oid);
        Self {
            id: oid.to_hex(),
            timestamp: parts.timestamp,
            datetime: parts.datetime().to_rfc3339(),
            machine: parts.machine.iter().map(|b| format!("{:02x}", b)).collect(),
            process: parts.process,
            counter: parts.counter,
        }
    }
}

impl InspectReport {
    fn render(&self) -> String {
        format!(
            "id:        {}\ntimestamp: {} ({})\nmachine:   {}\nprocess:   {}\ncounter:   {}",
            self.id, self.timestamp, self.datetime, self.machine, self.process, self.counter
        )
    }

    fn render_line(&self) -> String {
        format!(
            "{}  ts={} machine={} process={} counter={}",
            self.id, self.datetime, self.machine, self.process, self.counter
        )
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    match cli.command {
        Commands::Id { action } => match action {
            IdAction::New { count, parts } => {
                for line in new_ids(count, parts)? {
                    println!("{}", line);
                }
            }
            IdAction::Inspect { hex, json } => {
                println!("{}", inspect_id(&hex, json)?);
            }
        },
        Commands::Db { action } => match action {
            DbAction::Ping { config } => ping_database(&config)?,
        },
    }

    Ok(())
}

/// Generate `count` ids, one output line each
fn new_ids(count: usize, parts: bool) -> Result<Vec<String>> {
    let generator = object_id::init().context("Failed to initialize ObjectId generator")?;
    debug!(count, "Generating ObjectIds");

    Ok((0..count)
        .map(|_| {
            let oid = generator.generate();
            if parts {
                InspectReport::from(oid).render_line()
            } else {
                oid.to_hex()
            }
        })
        .collect())
}

fn inspect_id(hex: &str, json: bool) -> Result<String> {
    let oid = object_id::parse_hex(hex).with_context(|| format!("Cannot decode '{}'", hex))?;
    let report = InspectReport::from(oid);

    if json {
        serde_json::to_string_pretty(&report).context("Failed to serialize report")
    } else {
        Ok(report.render())
    }
}

fn ping_database(path: &Path) -> Result<()> {
    let config = ClientConfig::from_file(path)
        .with_context(|| format!("Failed to load config {}", path.display()))?;

    let rt = tokio::runtime::Runtime::new()
        .context("Failed to create tokio runtime")?;

    rt.block_on(async {
        let client = Client::connect(&config)
            .await
            .with_context(|| format!("Failed to connect to {}", config.addr))?;
        client.ping().await.context("Ping failed")?;
        println!(
            "{}",
            ping_report(&config.addr, client.database().name(), client.context_timeout())
        );
        Ok(())
    })
}

fn ping_report(addr: &str, database: &str, timeout: Duration) -> String {
    format!("ok: {} (database {}, timeout {}s)", addr, database, timeout.as_secs())
}

/// Initialize logging based on log level
fn init_logging(level: &str) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .ok(); // Ignore error if already initialized

    Ok(())
}
