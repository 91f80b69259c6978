//! Occupancy snapshots: who is in a voice channel and what they are doing.

use crate::{ChannelId, MemberId};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// Kind of presence activity reported by the platform.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    /// Playing a game
    Playing,
    /// Streaming
    Streaming,
    /// Listening to music
    Listening,
    /// Watching something
    Watching,
    /// Competing in something
    Competing,
    /// Custom status text
    Custom,
}

impl ActivityKind {
    /// Whether activities of this kind contribute to channel names.
    ///
    /// Custom statuses and music presence are ignored.
    pub fn names_channel(self) -> bool {
        !matches!(self, Self::Custom | Self::Listening)
    }
}

/// A single presence activity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, derive_new::new)]
pub struct Activity {
    /// Activity label, e.g. a game title
    #[new(into)]
    pub name: String,
    /// Activity kind
    pub kind: ActivityKind,
}

impl Activity {
    /// A `Playing` activity.
    pub fn playing(name: impl Into<String>) -> Self {
        Self::new(name, ActivityKind::Playing)
    }
}

/// A member connected to a voice channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct Occupant {
    id: MemberId,
    display_name: String,
    #[getter(skip)]
    bot: bool,
    activities: Vec<Activity>,
}

impl Occupant {
    /// A human occupant.
    pub fn new(id: MemberId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            bot: false,
            activities: Vec::new(),
        }
    }

    /// A bot occupant.
    pub fn bot(id: MemberId, display_name: impl Into<String>) -> Self {
        Self {
            bot: true,
            ..Self::new(id, display_name)
        }
    }

    /// Whether the occupant is a bot account.
    pub fn is_bot(&self) -> bool {
        self.bot
    }

    /// Add an activity.
    pub fn with_activity(mut self, activity: Activity) -> Self {
        self.activities.push(activity);
        self
    }

    /// Labels of this occupant's activities that contribute to naming.
    ///
    /// Bots never contribute.
    pub fn activity_labels(&self) -> Vec<String> {
        if self.bot {
            return Vec::new();
        }
        self.activities
            .iter()
            .filter(|a| a.kind.names_channel())
            .map(|a| a.name.clone())
            .collect()
    }
}

/// Point-in-time view of a voice channel's occupants.
///
/// Occupancy counts only non-bot members; a channel with nothing but bots
/// left in it is considered abandoned.
///
/// # Examples
///
/// ```
/// use dynavoice_core::{Activity, ActivityKind, ChannelId, MemberId, OccupancySnapshot, Occupant};
///
/// let snapshot = OccupancySnapshot::new(
///     ChannelId(1),
///     "General 1",
///     vec![
///         Occupant::new(MemberId(1), "ana").with_activity(Activity::playing("Chess")),
///         Occupant::new(MemberId(2), "bo")
///             .with_activity(Activity::new("Lo-fi", ActivityKind::Listening)),
///         Occupant::bot(MemberId(3), "jukebox").with_activity(Activity::playing("Radio")),
///     ],
/// );
///
/// assert_eq!(snapshot.member_count(), 2);
/// assert_eq!(snapshot.activity_labels(), vec!["Chess".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupancySnapshot {
    /// Channel the snapshot was taken of
    pub channel_id: ChannelId,
    /// Channel's current display name on the platform
    pub name: String,
    /// Every connected member, bots included
    pub members: Vec<Occupant>,
}

impl OccupancySnapshot {
    /// Create a snapshot.
    pub fn new(channel_id: ChannelId, name: impl Into<String>, members: Vec<Occupant>) -> Self {
        Self {
            channel_id,
            name: name.into(),
            members,
        }
    }

    /// Non-bot occupants in scan order.
    pub fn humans(&self) -> impl Iterator<Item = &Occupant> {
        self.members.iter().filter(|m| !m.bot)
    }

    /// Number of non-bot occupants.
    pub fn member_count(&self) -> usize {
        self.humans().count()
    }

    /// Whether no non-bot occupant remains.
    pub fn is_empty(&self) -> bool {
        self.member_count() == 0
    }

    /// Whether the member is connected (bots included).
    pub fn contains(&self, member: MemberId) -> bool {
        self.members.iter().any(|m| m.id == member)
    }

    /// Display name of a connected member.
    pub fn display_name_of(&self, member: MemberId) -> Option<&str> {
        self.members
            .iter()
            .find(|m| m.id == member)
            .map(|m| m.display_name.as_str())
    }

    /// Activity labels that contribute to naming, in scan order.
    pub fn activity_labels(&self) -> Vec<String> {
        self.humans().flat_map(Occupant::activity_labels).collect()
    }

    /// Connected member by id.
    pub fn occupant(&self, member: MemberId) -> Option<&Occupant> {
        self.members.iter().find(|m| m.id == member)
    }
}
