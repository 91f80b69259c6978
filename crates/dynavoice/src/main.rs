//! Dynavoice binary.
//!
//! - `run` connects to Discord and manages secondary channels
//! - `migrate` applies pending database migrations
//! - `config` prints the effective configuration

use clap::Parser;
use dynavoice::observability::{ObservabilityConfig, init_observability};

mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use cli::{Cli, Commands, migrate, run_bot, show_config};

    // Secrets may live in a local .env file
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let mut observability = ObservabilityConfig::default().with_json_logs(cli.json_logs);
    if cli.verbose {
        observability = observability.with_log_level("debug");
    }
    init_observability(&observability)?;

    match cli.command {
        Commands::Run {
            pool_size,
            skip_migrations,
        } => {
            run_bot(cli.config.as_deref(), pool_size, skip_migrations).await?;
        }

        Commands::Migrate => {
            migrate()?;
        }

        Commands::Config => {
            show_config(cli.config.as_deref())?;
        }
    }

    Ok(())
}
