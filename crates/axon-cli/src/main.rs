//! Axon CLI - command-line client for hub-attached device functions

mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{warn, Level};
use tracing_subscriber::FmtSubscriber;

use axon_core::ErrorKind;
use axon_runtime::Axon;
use config::Config;

#[derive(Parser, Debug)]
#[command(name = "axon")]
#[command(about = "CogniPilot client for USB sensor hub gateways")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "axon.toml")]
    config: PathBuf,

    /// Additional hub URL to register (repeatable)
    #[arg(short = 'H', long = "hub")]
    hubs: Vec<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List registered hubs and their state
    Hubs,
    /// List online functions of a class
    List { class: String },
    /// Read one attribute of a function
    Get {
        identifier: String,
        attribute: String,
    },
    /// Write one attribute of a function
    Set {
        identifier: String,
        attribute: String,
        value: String,
    },
    /// Show a function's full attribute snapshot
    Info { identifier: String },
    /// Poll a function and print value changes
    Watch {
        identifier: String,
        /// Poll interval in milliseconds
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = Config::load_or_default(&args.config)?;
    let axon = Axon::new(config.runtime.clone());

    let mut hub_urls = config.hubs.clone();
    hub_urls.extend(args.hubs.iter().cloned());

    if hub_urls.is_empty() && !matches!(args.command, Command::Hubs) {
        anyhow::bail!(
            "no hub configured; add one to {} or pass --hub",
            args.config.display()
        );
    }

    for url in &hub_urls {
        match axon.register_hub(url).await {
            Ok(_) => {}
            Err(e) if e.kind == ErrorKind::UnreachableHub => {
                warn!(hub = %url, error = %e, "Hub unreachable, preregistering");
                axon.preregister_hub(url).await?;
            }
            Err(e) => return Err(e.into()),
        }
    }

    match args.command {
        Command::Hubs => commands::hubs(&axon).await,
        Command::List { class } => commands::list(&axon, &class).await,
        Command::Get {
            identifier,
            attribute,
        } => commands::get(&axon, &identifier, &attribute).await,
        Command::Set {
            identifier,
            attribute,
            value,
        } => commands::set(&axon, &identifier, &attribute, &value).await,
        Command::Info { identifier } => commands::info(&axon, &identifier).await,
        Command::Watch {
            identifier,
            interval_ms,
        } => commands::watch(&axon, &identifier, interval_ms).await,
    }
}
