//! Discord-specific error types and the mapping of serenity failures onto
//! the lifecycle taxonomy.

use derive_getters::Getters;
use dynavoice_error::{LifecycleError, LifecycleErrorKind};
use serenity::http::HttpError;

/// Discord error variants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum DiscordErrorKind {
    /// Serenity API error (HTTP or gateway).
    #[display("Serenity API error: {_0}")]
    SerenityError(String),

    /// Connection to the Discord gateway failed.
    #[display("Connection failed: {_0}")]
    ConnectionFailed(String),

    /// Missing token or other invalid settings.
    #[display("Configuration error: {_0}")]
    ConfigurationError(String),
}

/// Discord error with source location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error, Getters)]
#[display("Discord Error: {} at line {} in {}", kind, line, file)]
pub struct DiscordError {
    kind: DiscordErrorKind,
    line: u32,
    file: &'static str,
}

impl DiscordError {
    /// Create a new DiscordError with automatic location tracking.
    ///
    /// # Example
    /// ```
    /// use dynavoice_discord::{DiscordError, DiscordErrorKind};
    ///
    /// let err = DiscordError::new(DiscordErrorKind::ConfigurationError("DISCORD_TOKEN".into()));
    /// assert!(err.to_string().contains("Configuration error"));
    /// ```
    #[track_caller]
    pub fn new(kind: DiscordErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

/// Result type for Discord operations.
pub type DiscordResult<T> = Result<T, DiscordError>;

impl From<serenity::Error> for DiscordError {
    #[track_caller]
    fn from(err: serenity::Error) -> Self {
        DiscordError::new(DiscordErrorKind::SerenityError(err.to_string()))
    }
}

// JSON error codes: https://discord.com/developers/docs/topics/opcodes-and-status-codes
const UNKNOWN_CHANNEL: isize = 10003;
const UNKNOWN_GUILD: isize = 10004;
const UNKNOWN_MEMBER: isize = 10007;
const UNKNOWN_USER: isize = 10013;
const MISSING_ACCESS: isize = 50001;
const MISSING_PERMISSIONS: isize = 50013;
const TARGET_NOT_IN_VOICE: isize = 40032;

/// Map a serenity failure onto the lifecycle taxonomy.
#[track_caller]
pub(crate) fn lifecycle_error(operation: &str, err: serenity::Error) -> LifecycleError {
    let serenity::Error::Http(HttpError::UnsuccessfulRequest(response)) = &err else {
        return LifecycleError::new(LifecycleErrorKind::Platform(format!("{operation}: {err}")));
    };

    let detail = format!("{operation}: {}", response.error.message);
    let kind = match (response.status_code.as_u16(), response.error.code) {
        (_, UNKNOWN_CHANNEL | UNKNOWN_GUILD | UNKNOWN_MEMBER | UNKNOWN_USER)
        | (_, TARGET_NOT_IN_VOICE)
        | (404, _) => LifecycleErrorKind::NotFound(detail),
        (_, MISSING_ACCESS | MISSING_PERMISSIONS) | (403, _) => {
            LifecycleErrorKind::PermissionDenied(detail)
        }
        (429, _) => LifecycleErrorKind::RateLimited {
            operation: operation.to_string(),
            retry_after_ms: None,
        },
        (408 | 502 | 503 | 504, _) => LifecycleErrorKind::Timeout(detail),
        _ => LifecycleErrorKind::Platform(detail),
    };
    LifecycleError::new(kind)
}
