//! Diesel row types and conversions to the core data model.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use dynavoice_core::{
    Alias, ChannelId, GuildId, GuildSettings, MemberId, Primary, PrimaryPatch, Secondary,
    SecondaryPatch,
};

/// Database row for the `primaries` table.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Insertable)]
#[diesel(table_name = crate::schema::primaries)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PrimaryRow {
    pub id: i64,
    pub guild_id: i64,
    pub creator_id: i64,
    pub general_name: String,
    pub activity_template: String,
}

impl From<PrimaryRow> for Primary {
    fn from(row: PrimaryRow) -> Self {
        Primary {
            id: ChannelId::from_db(row.id),
            guild_id: GuildId::from_db(row.guild_id),
            creator_id: MemberId::from_db(row.creator_id),
            general_name: row.general_name,
            activity_template: row.activity_template,
        }
    }
}

impl From<&Primary> for PrimaryRow {
    fn from(primary: &Primary) -> Self {
        Self {
            id: primary.id.to_db(),
            guild_id: primary.guild_id.to_db(),
            creator_id: primary.creator_id.to_db(),
            general_name: primary.general_name.clone(),
            activity_template: primary.activity_template.clone(),
        }
    }
}

/// Changeset for template updates.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = crate::schema::primaries)]
pub struct UpdatePrimaryRow {
    pub general_name: Option<String>,
    pub activity_template: Option<String>,
}

impl UpdatePrimaryRow {
    /// Whether the changeset would update nothing.
    pub fn is_empty(&self) -> bool {
        self.general_name.is_none() && self.activity_template.is_none()
    }
}

impl From<&PrimaryPatch> for UpdatePrimaryRow {
    fn from(patch: &PrimaryPatch) -> Self {
        Self {
            general_name: patch.general_name.clone(),
            activity_template: patch.activity_template.clone(),
        }
    }
}

/// Database row for the `secondaries` table.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Insertable)]
#[diesel(table_name = crate::schema::secondaries)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SecondaryRow {
    pub id: i64,
    pub guild_id: i64,
    pub parent_id: i64,
    pub creator_id: i64,
    pub name_override: Option<String>,
    pub locked: bool,
    pub text_channel_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl From<SecondaryRow> for Secondary {
    fn from(row: SecondaryRow) -> Self {
        Secondary {
            id: ChannelId::from_db(row.id),
            guild_id: GuildId::from_db(row.guild_id),
            parent_id: ChannelId::from_db(row.parent_id),
            creator_id: MemberId::from_db(row.creator_id),
            name_override: row.name_override,
            locked: row.locked,
            text_channel_id: row.text_channel_id.map(ChannelId::from_db),
            created_at: row.created_at,
        }
    }
}

impl From<&Secondary> for SecondaryRow {
    fn from(secondary: &Secondary) -> Self {
        Self {
            id: secondary.id.to_db(),
            guild_id: secondary.guild_id.to_db(),
            parent_id: secondary.parent_id.to_db(),
            creator_id: secondary.creator_id.to_db(),
            name_override: secondary.name_override.clone(),
            locked: secondary.locked,
            text_channel_id: secondary.text_channel_id.map(ChannelId::to_db),
            created_at: secondary.created_at,
        }
    }
}

/// Changeset for partial secondary updates.
///
/// Nested options distinguish "leave alone" from "set to NULL".
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = crate::schema::secondaries)]
pub struct UpdateSecondaryRow {
    pub creator_id: Option<i64>,
    pub name_override: Option<Option<String>>,
    pub locked: Option<bool>,
    pub text_channel_id: Option<Option<i64>>,
}

impl UpdateSecondaryRow {
    /// Whether the changeset would update nothing.
    pub fn is_empty(&self) -> bool {
        self.creator_id.is_none()
            && self.name_override.is_none()
            && self.locked.is_none()
            && self.text_channel_id.is_none()
    }
}

impl From<&SecondaryPatch> for UpdateSecondaryRow {
    fn from(patch: &SecondaryPatch) -> Self {
        Self {
            creator_id: patch.creator_id.map(MemberId::to_db),
            name_override: patch.name_override.clone(),
            locked: patch.locked,
            text_channel_id: patch.text_channel_id.map(|t| t.map(ChannelId::to_db)),
        }
    }
}

/// Database row for the `aliases` table.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = crate::schema::aliases)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AliasRow {
    pub id: i32,
    pub guild_id: i64,
    pub activity_name: String,
    pub alias_text: String,
}

impl From<AliasRow> for Alias {
    fn from(row: AliasRow) -> Self {
        Alias::new(
            GuildId::from_db(row.guild_id),
            row.activity_name,
            row.alias_text,
        )
    }
}

/// Insertable alias.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::aliases)]
pub struct NewAliasRow {
    pub guild_id: i64,
    pub activity_name: String,
    pub alias_text: String,
}

impl From<&Alias> for NewAliasRow {
    fn from(alias: &Alias) -> Self {
        Self {
            guild_id: alias.guild_id.to_db(),
            activity_name: alias.activity_name.clone(),
            alias_text: alias.alias_text.clone(),
        }
    }
}

/// Database row for the `guilds` table.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Insertable)]
#[diesel(table_name = crate::schema::guilds)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct GuildRow {
    pub id: i64,
    pub allow_join_requests: bool,
    pub text_channels_enabled: bool,
}

impl From<GuildRow> for GuildSettings {
    fn from(row: GuildRow) -> Self {
        GuildSettings {
            guild_id: GuildId::from_db(row.id),
            allow_join_requests: row.allow_join_requests,
            text_channels_enabled: row.text_channels_enabled,
        }
    }
}

impl From<&GuildSettings> for GuildRow {
    fn from(settings: &GuildSettings) -> Self {
        Self {
            id: settings.guild_id.to_db(),
            allow_join_requests: settings.allow_join_requests,
            text_channels_enabled: settings.text_channels_enabled,
        }
    }
}
