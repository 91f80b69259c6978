//! Serenity event handler feeding gateway events into the lifecycle controller.
//!
//! The controller is built once the gateway cache is populated: occupancy is
//! read from the cache, and startup reconciliation would otherwise see every
//! secondary as empty.

use crate::conversions::{from_channel, from_guild, from_user};
use crate::platform::SerenityPlatform;
use chrono::Utc;
use dynavoice_core::VoiceStateChange;
use dynavoice_interface::{EventPublisher, Store};
use dynavoice_lifecycle::LifecycleController;
use dynavoice_rate_limit::DynavoiceConfig;
use serenity::all::{GuildChannel, GuildId, Message, Ready, VoiceState};
use serenity::async_trait;
use serenity::client::{Context, EventHandler};
use serenity::model::gateway::GatewayIntents;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

const HOUSEKEEPING_INTERVAL: Duration = Duration::from_secs(600);

/// Event handler for the Dynavoice bot.
pub struct DynavoiceHandler {
    store: Arc<dyn Store>,
    publisher: Arc<dyn EventPublisher>,
    config: DynavoiceConfig,
    controller: OnceLock<LifecycleController>,
}

impl DynavoiceHandler {
    /// Create a handler; the controller is wired up on `cache_ready`.
    pub fn new(
        store: Arc<dyn Store>,
        publisher: Arc<dyn EventPublisher>,
        config: DynavoiceConfig,
    ) -> Self {
        Self {
            store,
            publisher,
            config,
            controller: OnceLock::new(),
        }
    }

    /// Required gateway intents.
    ///
    /// Presences feed activity-based names; members supply display names.
    pub fn intents() -> GatewayIntents {
        GatewayIntents::GUILDS
            | GatewayIntents::GUILD_VOICE_STATES
            | GatewayIntents::GUILD_MEMBERS
            | GatewayIntents::GUILD_PRESENCES
    }

    /// The controller, once the cache is ready.
    pub fn controller(&self) -> Option<&LifecycleController> {
        self.controller.get()
    }

    fn spawn_housekeeping(controller: LifecycleController) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(HOUSEKEEPING_INTERVAL);
            interval.tick().await;
            loop {
                interval.tick().await;
                controller.housekeeping();
            }
        });
    }
}

#[async_trait]
impl EventHandler for DynavoiceHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(
            bot_name = %ready.user.name,
            guild_count = ready.guilds.len(),
            "Discord bot connected"
        );
    }

    #[instrument(skip(self, ctx, guilds), fields(guild_count = guilds.len()))]
    async fn cache_ready(&self, ctx: Context, guilds: Vec<GuildId>) {
        let platform = Arc::new(SerenityPlatform::new(ctx.http.clone(), ctx.cache.clone()));
        let controller = LifecycleController::new(
            platform,
            self.store.clone(),
            self.publisher.clone(),
            &self.config,
        );
        if self.controller.set(controller.clone()).is_err() {
            debug!("Cache ready again after reconnect; controller already running");
            return;
        }

        match controller.start().await {
            Ok(report) => info!(
                checked = report.checked,
                deleted = report.deleted,
                restored = report.restored,
                failed = report.failed,
                "Startup reconciliation finished"
            ),
            Err(e) => error!(error = %e, "Failed to load registry"),
        }
        Self::spawn_housekeeping(controller);
    }

    async fn voice_state_update(&self, _ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let Some(controller) = self.controller.get() else {
            debug!("Voice state update before cache ready, ignoring");
            return;
        };
        let Some(guild_id) = new.guild_id else {
            return;
        };

        let change = VoiceStateChange {
            guild_id: from_guild(guild_id),
            member_id: from_user(new.user_id),
            before: old.and_then(|o| o.channel_id).map(from_channel),
            after: new.channel_id.map(from_channel),
            timestamp: Utc::now(),
        };
        controller.on_voice_state_changed(&change).await;
    }

    async fn channel_delete(
        &self,
        _ctx: Context,
        channel: GuildChannel,
        _messages: Option<Vec<Message>>,
    ) {
        let Some(controller) = self.controller.get() else {
            return;
        };
        let id = from_channel(channel.id);
        if controller.registry().secondary(id).is_none() {
            return;
        }

        info!(channel_id = %id, "Secondary deleted outside the bot");
        if let Err(e) = controller.delete_secondary(id).await {
            warn!(channel_id = %id, error = %e, "Failed to clean up deleted secondary");
        }
    }
}
