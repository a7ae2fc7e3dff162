//! pruntime-cli - Command-line interface for pRuntime workers
//!
//! Encodes and decodes `PhactoryAPI` records and calls worker methods.

mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use pruntime_client::ClientConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pruntime-cli")]
#[command(about = "Command-line interface for the pRuntime PhactoryAPI")]
#[command(version)]
struct Cli {
    /// Worker address (overrides config)
    #[arg(short, long, env = "PRUNTIME_ADDR")]
    server: Option<SocketAddr>,

    /// Path to a YAML client config
    #[arg(short, long, env = "PRUNTIME_CONFIG")]
    config: Option<PathBuf>,

    /// Prefix requests with their varint length (true/false)
    #[arg(long)]
    request_delimited: Option<bool>,

    /// Expect length-prefixed responses (true/false)
    #[arg(long)]
    response_delimited: Option<bool>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the methods of PhactoryAPI
    Methods,

    /// Print the fields of a record or enum schema
    Schema {
        /// Schema name, e.g. PhactoryInfo
        name: String,
    },

    /// Encode a JSON record (or @file.json) and print it as hex
    Encode {
        /// Record schema name
        schema: String,

        /// Record JSON
        json: String,

        /// Prefix the output with its varint length
        #[arg(short, long)]
        delimited: bool,
    },

    /// Decode a hex-encoded record and print it as JSON
    Decode {
        /// Record schema name
        schema: String,

        /// Encoded record in hex
        hex: String,

        /// Input carries a varint length prefix
        #[arg(short, long)]
        delimited: bool,
    },

    /// Call a method on the worker
    Call {
        /// Method name, short or full (/pruntime_rpc.PhactoryAPI/GetInfo)
        method: String,

        /// Request JSON (or @file.json); empty request if omitted
        json: Option<String>,
    },

    /// Send bytes through the Echo method
    Echo {
        /// Payload in hex
        hex: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match ClientConfig::load_from(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}", "Config error".red(), e);
            std::process::exit(1);
        }
    };
    if let Some(addr) = cli.server {
        config.addr = addr;
    }
    if let Some(delimited) = cli.request_delimited {
        config.request_delimited = delimited;
    }
    if let Some(delimited) = cli.response_delimited {
        config.response_delimited = delimited;
    }

    match commands::execute(&config, cli.command).await {
        Ok(output) => {
            println!("{}", output);
        }
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            std::process::exit(1);
        }
    }

    Ok(())
}
