//! Lifecycle error taxonomy.
//!
//! Every platform and persistence call made by the lifecycle controller is
//! mapped onto one of these kinds before the controller inspects it.

/// Lifecycle error conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum LifecycleErrorKind {
    /// Platform resource or persisted record is already absent.
    #[display("Not found: {_0}")]
    NotFound(String),

    /// Missing manage or permission-override capability.
    #[display("Permission denied: {_0}")]
    PermissionDenied(String),

    /// Platform throttling.
    #[display("Rate limited during {operation} (retry after {retry_after_ms:?} ms)")]
    RateLimited {
        /// Operation that was throttled
        operation: String,
        /// Delay suggested by the platform, if any
        retry_after_ms: Option<u64>,
    },

    /// Persistence uniqueness or version conflict.
    #[display("Conflict: {_0}")]
    Conflict(String),

    /// Malformed template or name exceeding constraints.
    #[display("Validation failed: {_0}")]
    Validation(String),

    /// Collaborator call exceeded its time bound.
    #[display("Timed out: {_0}")]
    Timeout(String),

    /// Uncategorized platform failure.
    #[display("Platform error: {_0}")]
    Platform(String),

    /// Uncategorized persistence failure.
    #[display("Persistence error: {_0}")]
    Persistence(String),
}

impl LifecycleErrorKind {
    /// Whether the failure may succeed on a bounded retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Timeout(_))
    }
}

/// Lifecycle error with source location tracking.
///
/// # Examples
///
/// ```
/// use dynavoice_error::{LifecycleError, LifecycleErrorKind};
///
/// let err = LifecycleError::new(LifecycleErrorKind::Timeout("rename".to_string()));
/// assert!(err.kind.is_retryable());
/// assert!(format!("{}", err).contains("Timed out"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Lifecycle Error: {} at line {} in {}", kind, line, file)]
pub struct LifecycleError {
    /// The kind of error that occurred
    pub kind: LifecycleErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl LifecycleError {
    /// Create a new LifecycleError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: LifecycleErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Shorthand for a [`LifecycleErrorKind::NotFound`] error.
    #[track_caller]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::new(LifecycleErrorKind::NotFound(what.into()))
    }

    /// Shorthand for a [`LifecycleErrorKind::Validation`] error.
    #[track_caller]
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::new(LifecycleErrorKind::Validation(reason.into()))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &LifecycleErrorKind {
        &self.kind
    }

    /// Whether the target was already absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, LifecycleErrorKind::NotFound(_))
    }
}

/// Result type for lifecycle operations.
pub type LifecycleResult<T> = Result<T, LifecycleError>;
