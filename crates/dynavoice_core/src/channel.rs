//! Primary and secondary channel records, aliases and guild settings.

use crate::{ChannelId, GuildId, MemberId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Template used when no activity is detected in a secondary.
pub const DEFAULT_GENERAL_NAME: &str = "General ##";

/// Template used when at least one activity is detected in a secondary.
pub const DEFAULT_ACTIVITY_TEMPLATE: &str = "@@game@@ ##";

/// A long-lived template channel that spawns secondaries when joined.
///
/// # Examples
///
/// ```
/// use dynavoice_core::{ChannelId, GuildId, MemberId, PrimaryBuilder};
///
/// let primary = PrimaryBuilder::default()
///     .id(ChannelId(1))
///     .guild_id(GuildId(2))
///     .creator_id(MemberId(3))
///     .build()
///     .unwrap();
///
/// assert_eq!(primary.general_name, "General ##");
/// assert_eq!(primary.template_for(false), "General ##");
/// assert_eq!(primary.template_for(true), "@@game@@ ##");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_builder::Builder)]
#[builder(setter(into))]
pub struct Primary {
    /// Platform channel id
    pub id: ChannelId,
    /// Owning guild
    pub guild_id: GuildId,
    /// Administrator who configured the primary
    pub creator_id: MemberId,
    /// Template used when no activity is detected
    #[builder(default = "DEFAULT_GENERAL_NAME.to_string()")]
    pub general_name: String,
    /// Template used when an activity is detected
    #[builder(default = "DEFAULT_ACTIVITY_TEMPLATE.to_string()")]
    pub activity_template: String,
}

impl Primary {
    /// Select the template for the given occupancy.
    pub fn template_for(&self, has_activity: bool) -> &str {
        if has_activity {
            &self.activity_template
        } else {
            &self.general_name
        }
    }
}

/// Partial update of a primary's templates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, derive_setters::Setters)]
#[setters(prefix = "with_", strip_option, into)]
pub struct PrimaryPatch {
    /// New general template
    pub general_name: Option<String>,
    /// New activity template
    pub activity_template: Option<String>,
}

impl PrimaryPatch {
    /// Apply the patch in place.
    pub fn apply(&self, primary: &mut Primary) {
        if let Some(general) = &self.general_name {
            primary.general_name = general.clone();
        }
        if let Some(template) = &self.activity_template {
            primary.activity_template = template.clone();
        }
    }
}

/// An ephemeral channel spawned from a primary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_builder::Builder)]
#[builder(setter(into))]
pub struct Secondary {
    /// Platform channel id
    pub id: ChannelId,
    /// Owning guild
    pub guild_id: GuildId,
    /// Primary this secondary was spawned from
    pub parent_id: ChannelId,
    /// Current owner; starts as the member whose join spawned it
    pub creator_id: MemberId,
    /// Name that supersedes the template-computed name
    #[builder(default)]
    pub name_override: Option<String>,
    /// Whether new connections are restricted to explicitly allowed members
    #[builder(default)]
    pub locked: bool,
    /// Paired text channel, when the guild enables text channels
    #[builder(default)]
    pub text_channel_id: Option<ChannelId>,
    /// Creation time
    #[builder(default = "Utc::now()")]
    pub created_at: DateTime<Utc>,
}

/// Partial update of a secondary.
///
/// `name_override` uses a nested option: `Some(None)` clears the override.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, derive_setters::Setters)]
#[setters(prefix = "with_", strip_option)]
pub struct SecondaryPatch {
    /// New owner
    pub creator_id: Option<MemberId>,
    /// New name override
    pub name_override: Option<Option<String>>,
    /// New lock state
    pub locked: Option<bool>,
    /// New paired text channel
    pub text_channel_id: Option<Option<ChannelId>>,
}

impl SecondaryPatch {
    /// Apply the patch in place.
    pub fn apply(&self, secondary: &mut Secondary) {
        if let Some(creator) = self.creator_id {
            secondary.creator_id = creator;
        }
        if let Some(name) = &self.name_override {
            secondary.name_override = name.clone();
        }
        if let Some(locked) = self.locked {
            secondary.locked = locked;
        }
        if let Some(text) = self.text_channel_id {
            secondary.text_channel_id = text;
        }
    }
}

/// Per-guild display alias for a detected activity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, derive_new::new)]
pub struct Alias {
    /// Owning guild
    pub guild_id: GuildId,
    /// Activity label as reported by the platform
    pub activity_name: String,
    /// Display text substituted for the activity
    pub alias_text: String,
}

/// Per-guild feature flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildSettings {
    /// Guild the settings belong to
    pub guild_id: GuildId,
    /// Whether members may request to join locked secondaries
    pub allow_join_requests: bool,
    /// Whether secondaries get a paired text channel
    pub text_channels_enabled: bool,
}

impl GuildSettings {
    /// Settings for a guild without a stored row.
    pub fn defaults_for(guild_id: GuildId) -> Self {
        Self {
            guild_id,
            ..Self::default()
        }
    }
}
