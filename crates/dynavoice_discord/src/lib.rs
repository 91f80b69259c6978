//! Discord adapter for Dynavoice.
//!
//! - [`SerenityPlatform`] implements `VoicePlatform` over serenity's HTTP
//!   client and gateway cache
//! - [`DynavoiceHandler`] turns gateway events into lifecycle calls
//! - [`DynavoiceBot`] owns the serenity client
//!
//! Serenity HTTP failures are mapped onto the lifecycle error taxonomy:
//! unknown resources become `NotFound`, missing permissions
//! `PermissionDenied`, and throttling or gateway timeouts become retryable.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod conversions;
mod error;
mod handler;
mod platform;

pub use client::DynavoiceBot;
pub use error::{DiscordError, DiscordErrorKind, DiscordResult};
pub use handler::DynavoiceHandler;
pub use platform::SerenityPlatform;
