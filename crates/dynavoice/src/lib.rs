//! Dynavoice - dynamic voice channels for Discord.
//!
//! Members join a configured *primary* voice channel; Dynavoice spawns a
//! *secondary* channel next to it, moves them in, keeps its name in sync with
//! who is inside and what they are playing, and deletes it once the last
//! member leaves.
//!
//! # Architecture
//!
//! - `dynavoice_core` - data model and the name template engine
//! - `dynavoice_error` - error types
//! - `dynavoice_interface` - collaborator traits and the in-memory store
//! - `dynavoice_rate_limit` - configuration, call policy, rename quota
//! - `dynavoice_database` - PostgreSQL persistence
//! - `dynavoice_lifecycle` - lifecycle controller, ownership, commands
//! - `dynavoice_discord` - serenity adapter
//!
//! This crate re-exports everything for convenience.
//!
//! # Cargo Features
//!
//! - `observability` - OpenTelemetry span export to stdout

#![forbid(unsafe_code)]

pub use dynavoice_core::*;
pub use dynavoice_database::{PgPool, PgStore, establish_connection, establish_pool, run_migrations};
pub use dynavoice_discord::*;
pub use dynavoice_error::*;
pub use dynavoice_interface::*;
pub use dynavoice_lifecycle::*;
pub use dynavoice_rate_limit::*;

pub mod observability;
