//! Core data types for Dynavoice.
//!
//! This crate provides the data model shared by every Dynavoice crate: typed
//! platform identifiers, primary and secondary channel records, aliases, guild
//! settings, occupancy snapshots and the lifecycle telemetry events. It also
//! contains the channel name template engine, a pure function of its inputs.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod channel;
mod event;
mod ids;
mod occupancy;
mod template;

pub use channel::{
    Alias, GuildSettings, Primary, PrimaryBuilder, PrimaryPatch, Secondary, SecondaryBuilder,
    SecondaryPatch, DEFAULT_ACTIVITY_TEMPLATE, DEFAULT_GENERAL_NAME,
};
pub use event::{LifecycleEvent, VoiceStateChange};
pub use ids::{ChannelId, GuildId, MemberId, RoleId};
pub use occupancy::{Activity, ActivityKind, OccupancySnapshot, Occupant};
pub use template::{
    MAX_NAME_LENGTH, NameContext, NameContextBuilder, TemplateViolation, render, truncate_name,
    validate_template,
};
