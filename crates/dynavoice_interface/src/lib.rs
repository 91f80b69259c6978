//! Trait definitions for the collaborators of the Dynavoice lifecycle core.
//!
//! The lifecycle controller talks to three collaborators, each behind a trait:
//!
//! - [`VoicePlatform`] - the chat platform (channel creation, renames, moves,
//!   permission overrides, occupancy snapshots)
//! - [`PrimaryStore`], [`SecondaryStore`], [`AliasStore`], [`GuildSettingsStore`] -
//!   transactional persistence; writes against a missing row fail with `NotFound`
//! - [`EventPublisher`] - fire-and-forget lifecycle telemetry
//!
//! [`InMemoryStore`] implements every store trait and backs the test suites.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod memory;
mod traits;
mod types;

pub use memory::InMemoryStore;
pub use traits::{
    AliasStore, EventPublisher, GuildSettingsStore, PrimaryStore, SecondaryStore, Store,
    VoicePlatform,
};
pub use types::{
    OverrideSubject, PermissionOverride, TextChannelSpec, TextChannelSpecBuilder,
    VoiceChannelSpec, VoiceChannelSpecBuilder,
};
