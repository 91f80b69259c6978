//! Collaborator traits for the lifecycle core.

use crate::{OverrideSubject, PermissionOverride, TextChannelSpec, VoiceChannelSpec};
use async_trait::async_trait;
use dynavoice_core::{
    Alias, ChannelId, GuildId, GuildSettings, LifecycleEvent, MemberId, OccupancySnapshot,
    Primary, PrimaryPatch, Secondary, SecondaryPatch,
};
use dynavoice_error::LifecycleResult;

/// Chat platform operations needed by the lifecycle controller.
///
/// Implementations map platform failures onto the lifecycle taxonomy; in
/// particular a channel that no longer exists must surface as `NotFound`.
#[async_trait]
pub trait VoicePlatform: Send + Sync {
    /// Create a voice channel and return its id.
    async fn create_voice_channel(&self, spec: &VoiceChannelSpec) -> LifecycleResult<ChannelId>;

    /// Create a text channel hidden from the default role and return its id.
    async fn create_text_channel(&self, spec: &TextChannelSpec) -> LifecycleResult<ChannelId>;

    /// Rename a channel.
    async fn rename_channel(&self, channel: ChannelId, name: &str) -> LifecycleResult<()>;

    /// Delete a channel.
    async fn delete_channel(&self, channel: ChannelId) -> LifecycleResult<()>;

    /// Move a connected member into a voice channel.
    async fn move_member(
        &self,
        guild: GuildId,
        member: MemberId,
        channel: ChannelId,
    ) -> LifecycleResult<()>;

    /// Create or replace a permission override on a channel.
    async fn set_permission_override(
        &self,
        channel: ChannelId,
        subject: OverrideSubject,
        permissions: PermissionOverride,
    ) -> LifecycleResult<()>;

    /// Drop every channel-specific override so permissions are inherited again.
    async fn clear_permission_overrides(&self, channel: ChannelId) -> LifecycleResult<()>;

    /// Current name and occupants of a voice channel.
    async fn occupancy_snapshot(&self, channel: ChannelId) -> LifecycleResult<OccupancySnapshot>;

    /// Display name of a guild member.
    async fn member_display_name(&self, guild: GuildId, member: MemberId)
    -> LifecycleResult<String>;
}

/// Persistence of primary channels.
#[async_trait]
pub trait PrimaryStore: Send + Sync {
    /// Fetch a primary.
    async fn get_primary(&self, id: ChannelId) -> LifecycleResult<Option<Primary>>;

    /// All primaries of a guild.
    async fn list_primaries_by_guild(&self, guild: GuildId) -> LifecycleResult<Vec<Primary>>;

    /// All primaries.
    async fn list_primaries(&self) -> LifecycleResult<Vec<Primary>>;

    /// Store a new primary; an existing id is a `Conflict`.
    async fn create_primary(&self, primary: &Primary) -> LifecycleResult<Primary>;

    /// Update templates; a missing id is `NotFound`.
    async fn update_primary(&self, id: ChannelId, patch: &PrimaryPatch)
    -> LifecycleResult<Primary>;
}

/// Persistence of secondary channels.
#[async_trait]
pub trait SecondaryStore: Send + Sync {
    /// Store a new secondary; an existing id is a `Conflict`.
    async fn create_secondary(&self, secondary: &Secondary) -> LifecycleResult<Secondary>;

    /// Fetch a secondary.
    async fn get_secondary(&self, id: ChannelId) -> LifecycleResult<Option<Secondary>>;

    /// All secondaries.
    async fn list_secondaries(&self) -> LifecycleResult<Vec<Secondary>>;

    /// Apply a partial update; a missing id is `NotFound`.
    async fn update_secondary(
        &self,
        id: ChannelId,
        patch: &SecondaryPatch,
    ) -> LifecycleResult<Secondary>;

    /// Delete a secondary; a missing id is `NotFound`.
    async fn delete_secondary(&self, id: ChannelId) -> LifecycleResult<()>;

    /// Number of secondaries spawned from a primary.
    async fn count_by_parent(&self, parent: ChannelId, guild: GuildId) -> LifecycleResult<usize>;
}

/// Persistence of activity aliases.
#[async_trait]
pub trait AliasStore: Send + Sync {
    /// All aliases of a guild.
    async fn list_aliases(&self, guild: GuildId) -> LifecycleResult<Vec<Alias>>;

    /// Insert or replace the alias for `(guild, activity)`.
    async fn upsert_alias(&self, alias: &Alias) -> LifecycleResult<Alias>;

    /// Remove an alias; a missing alias is `NotFound`.
    async fn delete_alias(&self, guild: GuildId, activity: &str) -> LifecycleResult<()>;
}

/// Persistence of guild settings.
#[async_trait]
pub trait GuildSettingsStore: Send + Sync {
    /// Settings of a guild; missing rows read as defaults.
    async fn get_settings(&self, guild: GuildId) -> LifecycleResult<GuildSettings>;

    /// Toggle join requests.
    async fn set_allow_join_requests(
        &self,
        guild: GuildId,
        enabled: bool,
    ) -> LifecycleResult<GuildSettings>;

    /// Toggle paired text channels for new secondaries.
    async fn set_text_channels_enabled(
        &self,
        guild: GuildId,
        enabled: bool,
    ) -> LifecycleResult<GuildSettings>;
}

/// Every store the lifecycle core needs.
pub trait Store: PrimaryStore + SecondaryStore + AliasStore + GuildSettingsStore {}

impl<T> Store for T where T: PrimaryStore + SecondaryStore + AliasStore + GuildSettingsStore {}

/// Fire-and-forget sink for lifecycle telemetry.
///
/// Publishing must never block or fail the lifecycle operation that emits it.
pub trait EventPublisher: Send + Sync {
    /// Publish a lifecycle event.
    fn publish(&self, event: &LifecycleEvent);
}
