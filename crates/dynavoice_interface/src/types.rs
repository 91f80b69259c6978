//! Value types exchanged with the platform.

use derive_getters::Getters;
use dynavoice_core::{ChannelId, GuildId, MemberId, RoleId};
use serde::{Deserialize, Serialize};

/// Request for a new voice channel.
///
/// The platform places the channel directly below `adjacent_to` and copies its
/// category, bitrate and permission sync state.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize, derive_builder::Builder)]
#[builder(setter(into))]
pub struct VoiceChannelSpec {
    guild_id: GuildId,
    name: String,
    adjacent_to: ChannelId,
}

/// Request for a text channel paired with a voice channel.
///
/// The channel is created hidden from the guild's default role; visibility
/// is granted per member with [`PermissionOverride::view`].
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize, derive_builder::Builder)]
#[builder(setter(into))]
pub struct TextChannelSpec {
    guild_id: GuildId,
    name: String,
    paired_with: ChannelId,
}

/// Who a permission override applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OverrideSubject {
    /// A single member
    Member(MemberId),
    /// A role; the guild's default role shares the guild id
    Role(RoleId),
}

/// Explicit allow/deny bits of a channel permission override.
///
/// `None` leaves the permission inherited. An override with neither bit set
/// removes the subject's override from the channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionOverride {
    /// Connect permission
    pub connect: Option<bool>,
    /// View channel permission
    pub view_channel: Option<bool>,
}

impl PermissionOverride {
    /// Allow or deny connecting.
    pub fn connect(allow: bool) -> Self {
        Self {
            connect: Some(allow),
            ..Self::default()
        }
    }

    /// Remove the subject's override.
    pub fn inherit() -> Self {
        Self::default()
    }

    /// Whether the override sets no explicit bit.
    pub fn is_inherit(&self) -> bool {
        self.connect.is_none() && self.view_channel.is_none()
    }

    /// Allow or deny seeing the channel.
    pub fn view(allow: bool) -> Self {
        Self {
            view_channel: Some(allow),
            ..Self::default()
        }
    }
}
