//! `VoicePlatform` implementation over serenity's HTTP client and cache.
//!
//! Occupancy is read from the gateway cache (voice states, members and
//! presences), so the client must run with the voice state, member and
//! presence intents.

use crate::conversions::{activity_kind, from_channel, to_channel, to_guild, to_user};
use crate::error::lifecycle_error;
use async_trait::async_trait;
use dynavoice_core::{Activity, ChannelId, GuildId, MemberId, OccupancySnapshot, Occupant};
use dynavoice_error::{LifecycleError, LifecycleResult};
use dynavoice_interface::{
    OverrideSubject, PermissionOverride, TextChannelSpec, VoiceChannelSpec, VoicePlatform,
};
use serenity::all::{
    Cache, ChannelType, CreateChannel, EditChannel, GuildChannel, Http, PermissionOverwrite,
    PermissionOverwriteType, Permissions, RoleId,
};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Discord voice platform.
#[derive(Clone)]
pub struct SerenityPlatform {
    http: Arc<Http>,
    cache: Arc<Cache>,
}

impl std::fmt::Debug for SerenityPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerenityPlatform")
            .field("guilds", &self.cache.guilds().len())
            .finish()
    }
}

impl SerenityPlatform {
    /// Wrap a client's HTTP handle and cache.
    pub fn new(http: Arc<Http>, cache: Arc<Cache>) -> Self {
        Self { http, cache }
    }

    fn cache_http(&self) -> (&Arc<Cache>, &Http) {
        (&self.cache, &self.http)
    }

    fn cached_channel(&self, channel: ChannelId) -> Option<GuildChannel> {
        let id = to_channel(channel);
        self.cache.guilds().into_iter().find_map(|guild_id| {
            self.cache
                .guild(guild_id)
                .and_then(|guild| guild.channels.get(&id).cloned())
        })
    }

    async fn guild_channel(&self, channel: ChannelId) -> LifecycleResult<GuildChannel> {
        if let Some(cached) = self.cached_channel(channel) {
            return Ok(cached);
        }
        self.http
            .get_channel(to_channel(channel))
            .await
            .map_err(|e| lifecycle_error("get_channel", e))?
            .guild()
            .ok_or_else(|| LifecycleError::not_found(format!("guild channel {channel}")))
    }

    fn occupants(&self, channel: &GuildChannel) -> Vec<Occupant> {
        let Some(guild) = self.cache.guild(channel.guild_id) else {
            return Vec::new();
        };
        let mut occupants: Vec<_> = guild
            .voice_states
            .values()
            .filter(|state| state.channel_id == Some(channel.id))
            .map(|state| {
                let member = state
                    .member
                    .as_ref()
                    .or_else(|| guild.members.get(&state.user_id));
                let id = MemberId(state.user_id.get());
                let mut occupant = match member {
                    Some(m) if m.user.bot => Occupant::bot(id, m.display_name()),
                    Some(m) => Occupant::new(id, m.display_name()),
                    None => Occupant::new(id, state.user_id.to_string()),
                };
                if let Some(presence) = guild.presences.get(&state.user_id) {
                    for activity in &presence.activities {
                        if let Some(kind) = activity_kind(activity.kind) {
                            occupant =
                                occupant.with_activity(Activity::new(activity.name.clone(), kind));
                        }
                    }
                }
                occupant
            })
            .collect();
        // voice states live in a map; keep a stable scan order
        occupants.sort_by_key(|o| *o.id());
        occupants
    }
}

/// Apply the explicit bits of `wanted` on top of an existing overwrite,
/// leaving every other permission bit untouched.
fn merge(
    existing: Option<&PermissionOverwrite>,
    kind: PermissionOverwriteType,
    wanted: PermissionOverride,
) -> PermissionOverwrite {
    let (mut allow, mut deny) = existing
        .map(|o| (o.allow, o.deny))
        .unwrap_or((Permissions::empty(), Permissions::empty()));
    for (bit, setting) in [
        (Permissions::CONNECT, wanted.connect),
        (Permissions::VIEW_CHANNEL, wanted.view_channel),
    ] {
        match setting {
            Some(true) => {
                allow.insert(bit);
                deny.remove(bit);
            }
            Some(false) => {
                deny.insert(bit);
                allow.remove(bit);
            }
            None => {}
        }
    }
    PermissionOverwrite { allow, deny, kind }
}

fn overwrite_kind(subject: OverrideSubject) -> PermissionOverwriteType {
    match subject {
        OverrideSubject::Member(member) => PermissionOverwriteType::Member(to_user(member)),
        OverrideSubject::Role(role) => PermissionOverwriteType::Role(RoleId::new(role.get())),
    }
}

#[async_trait]
impl VoicePlatform for SerenityPlatform {
    #[instrument(skip(self, spec), fields(name = %spec.name()))]
    async fn create_voice_channel(&self, spec: &VoiceChannelSpec) -> LifecycleResult<ChannelId> {
        let template = self.guild_channel(*spec.adjacent_to()).await?;

        let mut builder = CreateChannel::new(spec.name().clone())
            .kind(ChannelType::Voice)
            .position(template.position.saturating_add(1))
            .permissions(template.permission_overwrites.clone());
        if let Some(category) = template.parent_id {
            builder = builder.category(category);
        }
        if let Some(bitrate) = template.bitrate {
            builder = builder.bitrate(bitrate);
        }
        if let Some(limit) = template.user_limit {
            builder = builder.user_limit(limit);
        }

        let created = to_guild(*spec.guild_id())
            .create_channel(self.cache_http(), builder)
            .await
            .map_err(|e| lifecycle_error("create_voice_channel", e))?;
        debug!(id = %created.id, "Voice channel created");
        Ok(from_channel(created.id))
    }

    #[instrument(skip(self, spec), fields(name = %spec.name()))]
    async fn create_text_channel(&self, spec: &TextChannelSpec) -> LifecycleResult<ChannelId> {
        let voice = self.guild_channel(*spec.paired_with()).await?;
        let guild = *spec.guild_id();
        let bot = self.cache.current_user().id;

        let mut builder = CreateChannel::new(spec.name().clone())
            .kind(ChannelType::Text)
            .permissions([
                PermissionOverwrite {
                    allow: Permissions::empty(),
                    deny: Permissions::VIEW_CHANNEL,
                    kind: PermissionOverwriteType::Role(RoleId::new(guild.everyone_role().get())),
                },
                PermissionOverwrite {
                    allow: Permissions::VIEW_CHANNEL | Permissions::MANAGE_CHANNELS,
                    deny: Permissions::empty(),
                    kind: PermissionOverwriteType::Member(bot),
                },
            ]);
        if let Some(category) = voice.parent_id {
            builder = builder.category(category);
        }

        let created = to_guild(guild)
            .create_channel(self.cache_http(), builder)
            .await
            .map_err(|e| lifecycle_error("create_text_channel", e))?;
        Ok(from_channel(created.id))
    }

    #[instrument(skip(self))]
    async fn rename_channel(&self, channel: ChannelId, name: &str) -> LifecycleResult<()> {
        to_channel(channel)
            .edit(self.cache_http(), EditChannel::new().name(name))
            .await
            .map_err(|e| lifecycle_error("rename_channel", e))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_channel(&self, channel: ChannelId) -> LifecycleResult<()> {
        to_channel(channel)
            .delete(self.cache_http())
            .await
            .map_err(|e| lifecycle_error("delete_channel", e))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn move_member(
        &self,
        guild: GuildId,
        member: MemberId,
        channel: ChannelId,
    ) -> LifecycleResult<()> {
        to_guild(guild)
            .move_member(self.cache_http(), to_user(member), to_channel(channel))
            .await
            .map_err(|e| lifecycle_error("move_member", e))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn set_permission_override(
        &self,
        channel: ChannelId,
        subject: OverrideSubject,
        permissions: PermissionOverride,
    ) -> LifecycleResult<()> {
        let kind = overwrite_kind(subject);
        let id = to_channel(channel);

        if permissions.is_inherit() {
            return id
                .delete_permission(&self.http, kind)
                .await
                .map_err(|e| lifecycle_error("delete_permission", e));
        }

        let current = self.guild_channel(channel).await?;
        let existing = current
            .permission_overwrites
            .iter()
            .find(|o| o.kind == kind);
        let overwrite = merge(existing, kind, permissions);
        id.create_permission(&self.http, overwrite)
            .await
            .map_err(|e| lifecycle_error("create_permission", e))
    }

    /// Re-sync with the category, or drop every overwrite when the channel
    /// has no category.
    #[instrument(skip(self))]
    async fn clear_permission_overrides(&self, channel: ChannelId) -> LifecycleResult<()> {
        let current = self.guild_channel(channel).await?;
        let inherited = match current.parent_id {
            Some(category) => {
                self.guild_channel(from_channel(category))
                    .await?
                    .permission_overwrites
            }
            None => Vec::new(),
        };
        to_channel(channel)
            .edit(self.cache_http(), EditChannel::new().permissions(inherited))
            .await
            .map_err(|e| lifecycle_error("clear_permission_overrides", e))?;
        Ok(())
    }

    async fn occupancy_snapshot(&self, channel: ChannelId) -> LifecycleResult<OccupancySnapshot> {
        let current = self.guild_channel(channel).await?;
        let members = self.occupants(&current);
        Ok(OccupancySnapshot::new(channel, current.name, members))
    }

    async fn member_display_name(
        &self,
        guild: GuildId,
        member: MemberId,
    ) -> LifecycleResult<String> {
        let cached = self.cache.guild(to_guild(guild)).and_then(|g| {
            g.members
                .get(&to_user(member))
                .map(|m| m.display_name().to_string())
        });
        if let Some(name) = cached {
            return Ok(name);
        }
        let fetched = to_guild(guild)
            .member(self.cache_http(), to_user(member))
            .await
            .map_err(|e| lifecycle_error("member", e))?;
        Ok(fetched.display_name().to_string())
    }
}
