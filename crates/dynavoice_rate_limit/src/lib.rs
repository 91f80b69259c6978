//! Configuration and call bounds for Dynavoice.
//!
//! This crate provides:
//! - [`DynavoiceConfig`] - layered TOML configuration (bundled defaults, user
//!   files, environment)
//! - [`CallPolicy`] - timeout plus bounded retry with backoff for every
//!   platform and persistence call
//! - [`RenameQuota`] - per-channel rename limiter built on governor

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod policy;
mod quota;

pub use config::{CallConfig, DynavoiceConfig, LifecycleConfig, RenameQuotaConfig};
pub use policy::CallPolicy;
pub use quota::RenameQuota;
