//! Events flowing into and out of the lifecycle controller.

use crate::{ChannelId, GuildId, MemberId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A member's voice connection moved.
///
/// Either side may be absent: `before == None` is a fresh connection,
/// `after == None` a disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceStateChange {
    /// Guild the change happened in
    pub guild_id: GuildId,
    /// Member whose connection moved
    pub member_id: MemberId,
    /// Channel the member left
    pub before: Option<ChannelId>,
    /// Channel the member entered
    pub after: Option<ChannelId>,
    /// When the platform reported the change
    pub timestamp: DateTime<Utc>,
}

impl VoiceStateChange {
    /// Whether the change moved the member between channels at all.
    pub fn is_move(&self) -> bool {
        self.before != self.after
    }
}

/// Lifecycle facts published for observability.
///
/// # Examples
///
/// ```
/// use dynavoice_core::{ChannelId, LifecycleEvent};
///
/// let event = LifecycleEvent::Deleted { id: ChannelId(42) };
/// let json = serde_json::to_string(&event).unwrap();
/// assert_eq!(json, r#"{"event":"resource.deleted","id":42}"#);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum LifecycleEvent {
    /// A secondary was created
    #[serde(rename = "resource.created", rename_all = "camelCase")]
    Created {
        /// Secondary id
        id: ChannelId,
        /// Initial name
        name: String,
        /// Primary it was spawned from
        parent_id: ChannelId,
        /// Creation time
        created_at: DateTime<Utc>,
    },
    /// A secondary's computed state was refreshed
    #[serde(rename = "resource.updated", rename_all = "camelCase")]
    Updated {
        /// Secondary id
        id: ChannelId,
        /// Primary it was spawned from
        parent_id: ChannelId,
        /// Computed name
        name: String,
        /// Lock state
        locked: bool,
        /// Detected activities
        activities: Vec<String>,
        /// Non-bot occupant count
        member_count: usize,
    },
    /// A secondary was deleted
    #[serde(rename = "resource.deleted")]
    Deleted {
        /// Secondary id
        id: ChannelId,
    },
}

impl LifecycleEvent {
    /// Topic name of the event.
    pub fn topic(&self) -> &'static str {
        match self {
            Self::Created { .. } => "resource.created",
            Self::Updated { .. } => "resource.updated",
            Self::Deleted { .. } => "resource.deleted",
        }
    }

    /// Secondary the event is about.
    pub fn id(&self) -> ChannelId {
        match self {
            Self::Created { id, .. } | Self::Updated { id, .. } | Self::Deleted { id } => *id,
        }
    }
}
