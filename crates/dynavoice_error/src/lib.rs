//! Error types for Dynavoice.
//!
//! This crate provides the foundation error types used throughout the Dynavoice workspace.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! [`LifecycleError`] carries the taxonomy every collaborator call is mapped onto
//! (not found, permission denied, rate limited, conflict, validation, timeout),
//! so the lifecycle controller can decide between cleanup, retry and abandonment.
//!
//! # Examples
//!
//! ```
//! use dynavoice_error::{DynavoiceResult, LifecycleError, LifecycleErrorKind};
//!
//! fn rename() -> DynavoiceResult<()> {
//!     Err(LifecycleError::new(LifecycleErrorKind::NotFound("channel 42".to_string())))?
//! }
//!
//! match rename() {
//!     Ok(()) => println!("renamed"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
#[cfg(feature = "database")]
mod database;
mod error;
mod lifecycle;

pub use config::ConfigError;
#[cfg(feature = "database")]
pub use database::{DatabaseError, DatabaseErrorKind};
pub use error::{DynavoiceError, DynavoiceErrorKind, DynavoiceResult};
pub use lifecycle::{LifecycleError, LifecycleErrorKind, LifecycleResult};
