//! Conversions between serenity models and Dynavoice's typed identifiers.
//!
//! Serenity ids wrap a non-zero u64; platform snowflakes are never zero.

use dynavoice_core::{ActivityKind, ChannelId, GuildId, MemberId};
use serenity::all::{self as discord, ActivityType};

pub(crate) fn to_channel(id: ChannelId) -> discord::ChannelId {
    discord::ChannelId::new(id.get())
}

pub(crate) fn from_channel(id: discord::ChannelId) -> ChannelId {
    ChannelId(id.get())
}

pub(crate) fn to_guild(id: GuildId) -> discord::GuildId {
    discord::GuildId::new(id.get())
}

pub(crate) fn from_guild(id: discord::GuildId) -> GuildId {
    GuildId(id.get())
}

pub(crate) fn to_user(id: MemberId) -> discord::UserId {
    discord::UserId::new(id.get())
}

pub(crate) fn from_user(id: discord::UserId) -> MemberId {
    MemberId(id.get())
}

/// Map a gateway activity type. Unknown types are dropped.
pub(crate) fn activity_kind(kind: ActivityType) -> Option<ActivityKind> {
    match kind {
        ActivityType::Playing => Some(ActivityKind::Playing),
        ActivityType::Streaming => Some(ActivityKind::Streaming),
        ActivityType::Listening => Some(ActivityKind::Listening),
        ActivityType::Watching => Some(ActivityKind::Watching),
        ActivityType::Competing => Some(ActivityKind::Competing),
        ActivityType::Custom => Some(ActivityKind::Custom),
        _ => None,
    }
}
