//! Lifecycle core for Dynavoice.
//!
//! Secondaries are ephemeral voice channels spawned when a member joins a
//! primary. This crate keeps them consistent under concurrent membership
//! changes:
//!
//! - [`LifecycleController`] - spawns, renames, reconciles and deletes secondaries
//! - [`Registry`] - in-memory index of primaries and secondaries
//! - [`Debouncer`] - at most one queued or running rename per channel
//! - [`ResourceLocks`] - per-channel async mutual exclusion
//! - [`OwnershipManager`] - lock, unlock and ownership transfer
//! - [`JoinRequests`] - owner approval for joining locked secondaries
//! - [`CommandDispatcher`] - typed command execution
//! - [`TracingPublisher`], [`BroadcastPublisher`], [`FanoutPublisher`] - lifecycle telemetry

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod commands;
mod controller;
mod debounce;
mod join_request;
mod locks;
mod ownership;
mod publisher;
mod registry;

pub use commands::{
    Command, CommandDispatcher, CommandOutcome, InfoTarget, InfoView, Invoker, TemplateKind,
};
pub use controller::{LifecycleController, ReconcileOutcome, ReconcileReport};
pub use debounce::{Debouncer, JobRunner};
pub use join_request::{JoinDecision, JoinOutcome, JoinRequests, JoinTicket, PendingJoin};
pub use locks::{ResourceGuard, ResourceLocks};
pub use ownership::OwnershipManager;
pub use publisher::{BroadcastPublisher, FanoutPublisher, TracingPublisher};
pub use registry::{Registry, RegistryEntry};
