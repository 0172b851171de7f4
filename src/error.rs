//! Unified error hierarchy for rowtrack
//!
//! The estimation pipeline itself never fails; these errors come from the
//! edges around it: sensor access, payload decoding, session lifecycle,
//! configuration and workout storage.

use std::path::PathBuf;
use thiserror::Error;

use crate::models::SourceKind;

/// Top-level error type for all rowtrack operations
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Sample source (sensor or peripheral) errors
    #[error("Sample source error: {0}")]
    Source(#[from] SourceError),

    /// Wire payload decoding errors
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Session lifecycle errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Workout storage errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors raised while acquiring or subscribing to a sample stream
#[derive(Debug, Error)]
pub enum SourceError {
    /// The user or OS refused sensor access
    #[error("Permission denied for {source_kind} source")]
    PermissionDenied { source_kind: SourceKind },

    /// No peripheral with the expected name was found while scanning
    #[error("Device not found: {name}")]
    DeviceNotFound { name: String },

    /// Connection or service discovery failed
    #[error("Connection failed: {reason}")]
    ConnectionFailed { reason: String },

    /// The notifying characteristic is not exposed by the peripheral
    #[error("Characteristic {characteristic} unavailable on service {service}")]
    CharacteristicUnavailable {
        service: String,
        characteristic: String,
    },

    /// Subscribe was called before access was granted
    #[error("Source is not connected")]
    NotConnected,
}

/// Errors decoding a peripheral notification payload
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The base64 envelope could not be decoded
    #[error("Invalid payload envelope: {reason}")]
    InvalidEnvelope { reason: String },

    /// The decoded bytes are not ASCII text
    #[error("Payload is not ASCII")]
    NotAscii,
}

/// Session lifecycle errors
#[derive(Debug, Error)]
pub enum SessionError {
    /// Only one tracking session can be active at a time
    #[error("Session already active: {session_id}")]
    AlreadyActive { session_id: uuid::Uuid },

    /// The operation requires an active session
    #[error("No active session")]
    NotActive,
}

/// Workout storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Writing a record failed
    #[error("Write to {path} failed: {reason}")]
    WriteFailed { path: PathBuf, reason: String },

    /// Reading stored records failed
    #[error("Read from {path} failed: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    /// A stored line could not be parsed
    #[error("Corrupt record at line {line}: {reason}")]
    CorruptRecord { line: usize, reason: String },
}

/// Result type alias for rowtrack operations
pub type Result<T> = std::result::Result<T, TrackerError>;

impl TrackerError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TrackerError::Source(SourceError::ConnectionFailed { .. })
                | TrackerError::Source(SourceError::DeviceNotFound { .. })
                | TrackerError::Io(_)
        )
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            TrackerError::Decode(_) => ErrorSeverity::Warning,
            TrackerError::Session(SessionError::NotActive) => ErrorSeverity::Warning,
            TrackerError::Source(SourceError::DeviceNotFound { .. }) => ErrorSeverity::Warning,
            TrackerError::Source(SourceError::PermissionDenied { .. }) => ErrorSeverity::Error,
            TrackerError::Storage(StorageError::CorruptRecord { .. }) => ErrorSeverity::Error,
            TrackerError::Internal(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            TrackerError::Source(SourceError::PermissionDenied { source_kind }) => {
                format!(
                    "Access to the {} was denied. Grant the permission and start the session again.",
                    source_kind.description()
                )
            }
            TrackerError::Source(SourceError::DeviceNotFound { name }) => {
                format!("Could not find sensor '{}'. Make sure it is powered on and nearby.", name)
            }
            TrackerError::Session(SessionError::AlreadyActive { .. }) => {
                "A workout is already in progress. Finish it before starting another.".to_string()
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical system error requiring immediate attention
    Critical,
    /// Error that prevents operation but system can continue
    Error,
    /// Warning that doesn't prevent operation
    Warning,
    /// Informational message
    Info,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical => tracing::Level::ERROR,
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
            ErrorSeverity::Info => tracing::Level::INFO,
        }
    }
}
