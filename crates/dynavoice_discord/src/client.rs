//! Discord bot client setup and lifecycle management.

use crate::{DiscordError, DiscordErrorKind, DiscordResult, DynavoiceHandler};
use dynavoice_interface::{EventPublisher, Store};
use dynavoice_rate_limit::DynavoiceConfig;
use serenity::Client;
use serenity::gateway::ShardManager;
use std::sync::Arc;
use tracing::{info, instrument};

/// Dynavoice Discord bot.
///
/// # Example
/// ```no_run
/// use dynavoice_discord::DynavoiceBot;
/// use dynavoice_interface::InMemoryStore;
/// use dynavoice_lifecycle::TracingPublisher;
/// use dynavoice_rate_limit::DynavoiceConfig;
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let token = std::env::var("DISCORD_TOKEN")?;
///     let mut bot = DynavoiceBot::new(
///         token,
///         Arc::new(InMemoryStore::new()),
///         Arc::new(TracingPublisher),
///         DynavoiceConfig::load()?,
///     )
///     .await?;
///     bot.start().await?;
///     Ok(())
/// }
/// ```
pub struct DynavoiceBot {
    client: Client,
}

impl DynavoiceBot {
    /// Build the serenity client.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is empty or the client fails to build.
    #[instrument(skip(token, store, publisher, config), fields(token_len = token.len()))]
    pub async fn new(
        token: String,
        store: Arc<dyn Store>,
        publisher: Arc<dyn EventPublisher>,
        config: DynavoiceConfig,
    ) -> DiscordResult<Self> {
        if token.trim().is_empty() {
            return Err(DiscordError::new(DiscordErrorKind::ConfigurationError(
                "DISCORD_TOKEN is empty".to_string(),
            )));
        }

        let handler = DynavoiceHandler::new(store, publisher, config);
        let intents = DynavoiceHandler::intents();
        info!("Building Serenity client with intents: {:?}", intents);

        let client = Client::builder(&token, intents)
            .event_handler(handler)
            .await
            .map_err(|e| {
                DiscordError::new(DiscordErrorKind::ConnectionFailed(format!(
                    "Failed to build client: {}",
                    e
                )))
            })?;

        Ok(Self { client })
    }

    /// Run the gateway connection until it shuts down.
    ///
    /// # Errors
    ///
    /// Returns an error if the client encounters a fatal error.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> DiscordResult<()> {
        info!("Starting Discord bot");

        self.client.start().await.map_err(|e| {
            DiscordError::new(DiscordErrorKind::ConnectionFailed(format!(
                "Client error: {}",
                e
            )))
        })
    }

    /// Handle for closing every shard while `start` is running.
    pub fn shard_manager(&self) -> Arc<ShardManager> {
        self.client.shard_manager.clone()
    }
}
