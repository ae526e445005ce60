//! Error types for the till engine
//!
//! Every business-rule failure carries a structured kind plus the field or
//! invariant that failed, so callers can present an actionable prompt
//! (for example "opening below float requires a justification") without the
//! engine guessing intent.

use thiserror::Error;

/// Coarse classification of a [`TillError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    InvalidState,
    Busy,
    Infrastructure,
}

/// The main error type for till operations
#[derive(Error, Debug)]
pub enum TillError {
    /// Malformed or out-of-range input
    #[error("Validation error on '{field}': {message}")]
    Validation { field: &'static str, message: String },

    /// An invariant would be violated (e.g. a second open shift)
    #[error("Conflict ({invariant}): {message}")]
    Conflict {
        invariant: &'static str,
        message: String,
    },

    /// Unknown shift, location, expense or recovery record
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// Operation is not valid for the entity's lifecycle state
    #[error("Cannot {operation} {entity_type} {identifier}: it is {state}")]
    InvalidState {
        entity_type: &'static str,
        identifier: String,
        state: String,
        operation: &'static str,
    },

    /// The per-location lock could not be acquired in time
    #[error("Location {location} is busy (waited {waited_ms} ms)")]
    Busy { location: String, waited_ms: u64 },

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Export errors
    #[error("Export error: {0}")]
    Export(String),
}

impl TillError {
    /// Create a validation error for a specific field
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Create a conflict error naming the violated invariant
    pub fn conflict(invariant: &'static str, message: impl Into<String>) -> Self {
        Self::Conflict {
            invariant,
            message: message.into(),
        }
    }

    /// Create a "not found" error for shifts
    pub fn shift_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Shift",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for locations
    pub fn location_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Location",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for recovery records
    pub fn record_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "RecoveryRecord",
            identifier: identifier.into(),
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidState { .. } => ErrorKind::InvalidState,
            Self::Busy { .. } => ErrorKind::Busy,
            Self::Config(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Storage(_)
            | Self::Export(_) => ErrorKind::Infrastructure,
        }
    }

    /// Only lock contention is worth retrying; business-rule failures are not
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Busy { .. })
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

impl From<std::io::Error> for TillError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for TillError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<csv::Error> for TillError {
    fn from(err: csv::Error) -> Self {
        Self::Export(err.to_string())
    }
}

/// Result type alias for till operations
pub type TillResult<T> = Result<T, TillError>;
