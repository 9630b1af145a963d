//! Error types for keyrec.
//!
//! This module defines all error types used throughout the keyrec crate.
//! The two session-level failures (`EventSource` and `SinkWrite`) carry the
//! text recorded so far, so a caller can still flush it somewhere else.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for keyrec operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Session Errors ===
    /// The key event feed became unavailable mid-session.
    #[error("event source '{source_name}' failed: {message}")]
    EventSource {
        /// Name of the event source.
        source_name: &'static str,
        /// Description of what went wrong.
        message: String,
        /// Text decoded before the failure.
        recovered: String,
    },

    /// Persisting the recorded text failed.
    #[error("failed to write recording to {sink}: {source}")]
    SinkWrite {
        /// Human-readable sink description (usually a path).
        sink: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
        /// The text that could not be written.
        recovered: String,
    },

    /// An event log line could not be parsed.
    #[error("invalid event at {path}:{line}: {message}")]
    EventLog {
        /// Path to the event log.
        path: PathBuf,
        /// One-based line number.
        line: usize,
        /// Description of the parse failure.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Platform Errors ===
    /// Terminal or OS operation failed.
    #[error("platform error: {0}")]
    Platform(String),

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for keyrec operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new platform error.
    #[must_use]
    pub fn platform(message: impl Into<String>) -> Self {
        Self::Platform(message.into())
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create an event source error with no recovered text.
    ///
    /// The recorder fills in the recovered text when the error crosses the
    /// session boundary.
    #[must_use]
    pub fn event_source(source_name: &'static str, message: impl Into<String>) -> Self {
        Self::EventSource {
            source_name,
            message: message.into(),
            recovered: String::new(),
        }
    }

    /// Attach recovered session text to an event source error.
    ///
    /// Other variants are returned unchanged.
    #[must_use]
    pub fn with_recovered(self, text: String) -> Self {
        match self {
            Self::EventSource {
                source_name,
                message,
                ..
            } => Self::EventSource {
                source_name,
                message,
                recovered: text,
            },
            other => other,
        }
    }

    /// Text that was recorded before this error, if any.
    #[must_use]
    pub fn recovered_text(&self) -> Option<&str> {
        match self {
            Self::EventSource { recovered, .. } | Self::SinkWrite { recovered, .. } => {
                Some(recovered)
            }
            _ => None,
        }
    }

    /// Check if this error came from persisting a recording.
    #[must_use]
    pub fn is_sink_error(&self) -> bool {
        matches!(self, Self::SinkWrite { .. })
    }

    /// Check if this error came from the event feed.
    #[must_use]
    pub fn is_event_source_error(&self) -> bool {
        matches!(self, Self::EventSource { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::platform("raw mode unavailable");
        assert_eq!(err.to_string(), "platform error: raw mode unavailable");
    }

    #[test]
    fn test_internal_error() {
        let err = Error::internal("something went wrong");
        assert_eq!(err.to_string(), "internal error: something went wrong");
    }

    #[test]
    fn test_event_source_error_display() {
        let err = Error::event_source("channel", "sender disconnected");
        let msg = err.to_string();
        assert!(msg.contains("channel"));
        assert!(msg.contains("sender disconnected"));
        assert!(err.is_event_source_error());
        assert!(!err.is_sink_error());
    }

    #[test]
    fn test_with_recovered_fills_event_source() {
        let err = Error::event_source("channel", "gone").with_recovered("abc".to_string());
        assert_eq!(err.recovered_text(), Some("abc"));
    }

    #[test]
    fn test_with_recovered_ignores_other_variants() {
        let err = Error::internal("bug").with_recovered("abc".to_string());
        assert!(err.recovered_text().is_none());
    }

    #[test]
    fn test_sink_write_error_keeps_text() {
        let err = Error::SinkWrite {
            sink: "/readonly/out.txt".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            recovered: "hello".to_string(),
        };
        assert!(err.is_sink_error());
        assert_eq!(err.recovered_text(), Some("hello"));
        assert!(err.to_string().contains("/readonly/out.txt"));
    }

    #[test]
    fn test_event_log_error_display() {
        let err = Error::EventLog {
            path: PathBuf::from("events.jsonl"),
            line: 3,
            message: "missing field `phase`".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid event at events.jsonl:3: missing field `phase`"
        );
    }

    #[test]
    fn test_config_validation_error_display() {
        let err = Error::ConfigValidation {
            message: "invalid interval".to_string(),
        };
        assert!(err.to_string().contains("invalid interval"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("file not found"));
        assert!(err.recovered_text().is_none());
    }

    #[test]
    fn test_directory_create_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = Error::DirectoryCreate {
            path: PathBuf::from("/root/forbidden"),
            source: io_err,
        };
        assert!(err.to_string().contains("/root/forbidden"));
    }
}
