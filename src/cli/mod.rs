//! CLI module for Conduit
//!
//! # Commands
//!
//! - `serve` - Start the router
//! - `config init` - Write an example configuration file
//!
//! # Example
//!
//! ```bash
//! # Start with the default config path, overriding the port
//! conduit serve --port 9000
//!
//! # Write a starter config
//! conduit config init --output conduit.toml
//! ```

pub mod config;
pub mod serve;

pub use config::handle_config_init;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Conduit - adaptive multi-backend content router
#[derive(Parser, Debug)]
#[command(
    name = "conduit",
    version,
    about = "Adaptive content router that learns which storage backend to use"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the Conduit server
    Serve(ServeArgs),
    /// Configuration utilities
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "conduit.toml")]
    pub config: PathBuf,

    /// Override server port
    #[arg(short, long, env = "CONDUIT_PORT")]
    pub port: Option<u16>,

    /// Override server host
    #[arg(short = 'H', long, env = "CONDUIT_HOST")]
    pub host: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "CONDUIT_LOG_LEVEL")]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Initialize a new configuration file
    Init(ConfigInitArgs),
}

#[derive(Args, Debug)]
pub struct ConfigInitArgs {
    /// Output file path
    #[arg(short, long, default_value = "conduit.toml")]
    pub output: PathBuf,

    /// Overwrite existing file
    #[arg(short, long)]
    pub force: bool,
}
