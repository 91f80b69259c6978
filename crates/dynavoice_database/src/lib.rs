//! PostgreSQL persistence for Dynavoice.
//!
//! This crate provides the diesel schema, row models, embedded migrations and
//! [`PgStore`], which implements every store trait from
//! `dynavoice_interface` on top of an r2d2 connection pool.
//!
//! # Example
//!
//! ```rust,no_run
//! use dynavoice_database::{PgStore, establish_connection, establish_pool, run_migrations};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut conn = establish_connection()?;
//! run_migrations(&mut conn)?;
//!
//! let store = PgStore::new(establish_pool(8)?);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

mod connection;
mod models;
mod store;

pub mod schema;

pub use connection::{PgPool, establish_connection, establish_pool, run_migrations};
pub use models::{
    AliasRow, GuildRow, NewAliasRow, PrimaryRow, SecondaryRow, UpdatePrimaryRow,
    UpdateSecondaryRow,
};
pub use store::PgStore;

use dynavoice_error::DatabaseError;

/// Result type for database operations.
pub type DatabaseResult<T> = Result<T, DatabaseError>;
