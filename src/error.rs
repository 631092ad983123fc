//! Error types for the jukebox daemon.
//!
//! Defines the error codes and error type shared by the registry, the
//! rotation engine, the track store and the RPC layer.

use std::fmt;

/// Error codes returned by the daemon in error responses.
///
/// These codes are used in JSON-RPC error responses and allow clients
/// to programmatically handle specific error conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Group or member does not exist.
    /// Trigger: unknown group code, or device id not a member of the group.
    NotFound,

    /// A required field is missing or malformed.
    /// Trigger: empty device id or display name, unsafe filename.
    InvalidInput,

    /// Track duration could not be read.
    /// Trigger: corrupt, truncated or unsupported audio file.
    MediaError,

    /// Reserved for duplicate-code races. Code collisions are retried instead.
    Conflict,

    /// Reading or writing the track storage directory failed.
    /// Trigger: missing source file, permissions, disk full.
    StorageFailed,
}

impl ErrorCode {
    /// Returns the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::MediaError => "MEDIA_ERROR",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::StorageFailed => "STORAGE_FAILED",
        }
    }

    /// Returns a human-readable description of the error.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::NotFound => "Group or member not found",
            ErrorCode::InvalidInput => "Required field missing or invalid",
            ErrorCode::MediaError => "Audio file could not be read",
            ErrorCode::Conflict => "Conflicting concurrent update",
            ErrorCode::StorageFailed => "Track storage operation failed",
        }
    }

    /// Returns a recovery hint suggesting how to resolve this error.
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            ErrorCode::NotFound => {
                "Check the group code (4 uppercase letters) or join the group before updating it"
            }
            ErrorCode::InvalidInput => {
                "Provide a non-empty device_id and display_name; filenames must not contain path separators"
            }
            ErrorCode::MediaError => {
                "Re-upload the file in a supported format (mp3, wav, flac, ogg, m4a, aac)"
            }
            ErrorCode::Conflict => "Retry the request",
            ErrorCode::StorageFailed => {
                "Check that the storage directory exists and is writable (JUKEBOX_STORAGE_PATH)"
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type for jukebox operations.
#[derive(Debug)]
pub struct JukeboxError {
    /// The error code identifying the type of error.
    pub code: ErrorCode,
    /// Human-readable error message with context.
    pub message: String,
    /// Optional underlying cause of the error.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl JukeboxError {
    /// Creates a new JukeboxError with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new JukeboxError with an underlying cause.
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a NOT_FOUND error for an unknown group code.
    pub fn group_not_found(code: &str) -> Self {
        Self::new(ErrorCode::NotFound, format!("Group {} does not exist", code))
    }

    /// Creates a NOT_FOUND error for a device that is not a member of the group.
    pub fn member_not_found(code: &str, device_id: &str) -> Self {
        Self::new(
            ErrorCode::NotFound,
            format!("Device {} is not a member of group {}", device_id, code),
        )
    }

    /// Creates an INVALID_INPUT error for a missing field.
    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::InvalidInput,
            format!("Missing required field: {}", field),
        )
    }

    /// Creates an INVALID_INPUT error with a free-form reason.
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, reason)
    }

    /// Creates a MEDIA_ERROR for a track whose duration cannot be read.
    pub fn media(device_id: &str, track_id: &str, reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::MediaError,
            format!(
                "Cannot read duration of {}/{}: {}",
                device_id,
                track_id,
                reason.into()
            ),
        )
    }

    /// Creates a STORAGE_FAILED error wrapping an I/O failure.
    pub fn storage(context: impl Into<String>, source: std::io::Error) -> Self {
        let context = context.into();
        Self::with_source(
            ErrorCode::StorageFailed,
            format!("{}: {}", context, source),
            source,
        )
    }
}

impl fmt::Display for JukeboxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}. Recovery: {}",
            self.code,
            self.message,
            self.code.recovery_hint()
        )
    }
}

impl std::error::Error for JukeboxError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Result type alias using JukeboxError.
pub type Result<T> = std::result::Result<T, JukeboxError>;
