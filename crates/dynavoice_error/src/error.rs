//! Top-level error wrapper types.

use crate::{ConfigError, LifecycleError};
#[cfg(feature = "database")]
use crate::DatabaseError;

/// The foundation error enum aggregating every crate-level error.
///
/// # Examples
///
/// ```
/// use dynavoice_error::{ConfigError, DynavoiceError};
///
/// let err: DynavoiceError = ConfigError::new("missing token").into();
/// assert!(format!("{}", err).contains("Configuration Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum DynavoiceErrorKind {
    /// Lifecycle (platform or persistence collaborator) error
    #[from(LifecycleError)]
    Lifecycle(LifecycleError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Database error
    #[cfg(feature = "database")]
    #[from(DatabaseError)]
    Database(DatabaseError),
}

/// Dynavoice error with kind discrimination.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Dynavoice Error: {}", _0)]
pub struct DynavoiceError(Box<DynavoiceErrorKind>);

impl DynavoiceError {
    /// Create a new error from a kind.
    pub fn new(kind: DynavoiceErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &DynavoiceErrorKind {
        &self.0
    }
}

// Generic From implementation for any type that converts to DynavoiceErrorKind
impl<T> From<T> for DynavoiceError
where
    T: Into<DynavoiceErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Dynavoice operations.
pub type DynavoiceResult<T> = std::result::Result<T, DynavoiceError>;
