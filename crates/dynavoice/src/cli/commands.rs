//! CLI command definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Dynavoice - dynamic voice channels for Discord
#[derive(Parser, Debug)]
#[command(name = "dynavoice")]
#[command(about = "Dynamic voice channels for Discord", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file layered over the defaults
    #[arg(short, long, global = true, env = "DYNAVOICE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Connect to Discord and manage secondary channels
    Run {
        /// Maximum database connections
        #[arg(long, default_value = "8")]
        pool_size: u32,

        /// Skip pending database migrations on startup
        #[arg(long)]
        skip_migrations: bool,
    },

    /// Apply pending database migrations and exit
    Migrate,

    /// Print the effective configuration as JSON
    Config,
}
