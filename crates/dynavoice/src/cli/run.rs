//! Handlers for the `run`, `migrate` and `config` commands.

use dynavoice::{
    DatabaseError, DynavoiceBot, DynavoiceConfig, EventPublisher, PgStore, Store, TracingPublisher,
    establish_connection, establish_pool, run_migrations,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument, warn};

fn load_config(path: Option<&Path>) -> Result<DynavoiceConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => DynavoiceConfig::from_file(path)?,
        None => DynavoiceConfig::load()?,
    };
    Ok(config)
}

/// Apply pending migrations.
#[instrument]
pub fn migrate() -> Result<(), DatabaseError> {
    let mut conn = establish_connection()?;
    run_migrations(&mut conn)?;
    Ok(())
}

/// Print the effective configuration.
pub fn show_config(path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(path)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

/// Run the bot until the gateway connection ends or Ctrl+C is pressed.
#[instrument(skip(config_path))]
pub async fn run_bot(
    config_path: Option<&Path>,
    pool_size: u32,
    skip_migrations: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let token = std::env::var("DISCORD_TOKEN")
        .map_err(|_| "DISCORD_TOKEN environment variable not set")?;

    if !skip_migrations {
        tokio::task::spawn_blocking(migrate).await??;
    }

    let store: Arc<dyn Store> = Arc::new(PgStore::new(establish_pool(pool_size)?));
    let publisher: Arc<dyn EventPublisher> = Arc::new(TracingPublisher);

    let mut bot = DynavoiceBot::new(token, store, publisher, config).await?;
    let shards = bot.shard_manager();
    info!("Dynavoice starting");

    tokio::select! {
        result = bot.start() => result?,
        signal = tokio::signal::ctrl_c() => {
            match signal {
                Ok(()) => info!("Shutdown requested"),
                Err(e) => warn!(error = %e, "Failed to listen for Ctrl+C"),
            }
            shards.shutdown_all().await;
        }
    }

    Ok(())
}
