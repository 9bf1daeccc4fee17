//! Error types for scene bundle operations.
//!
//! Every error carries:
//! - A stable numeric code for machine parsing
//! - A category for grouping
//! - A recoverability hint so callers can decide whether to retry
//!
//! Cancellation is deliberately separate from I/O failure: a cancelled run
//! may simply be restarted, while an I/O failure usually needs attention
//! (disk full, missing asset, permissions).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for scene bundle operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Configuration file errors.
    Config,
    /// Collection document errors (malformed JSON, bad structure).
    Document,
    /// Archive container errors.
    Bundle,
    /// Caller- or destruction-initiated interruption.
    Interrupted,
    /// Host application collaboration errors.
    Host,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Document => write!(f, "document"),
            ErrorCategory::Bundle => write!(f, "bundle"),
            ErrorCategory::Interrupted => write!(f, "interrupted"),
            ErrorCategory::Host => write!(f, "host"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for scene bundle operations.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    // Document errors (20-29)
    #[error("malformed collection document: {0}")]
    Parse(String),

    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    // Bundle errors (30-39)
    #[error("invalid bundle: {0}")]
    InvalidBundle(String),

    #[error("archive error: {0}")]
    Archive(String),

    // Interruption (40-49)
    #[error("operation cancelled")]
    Cancelled,

    #[error("operation interrupted: caller destroyed")]
    CallerDestroyed,

    // Host errors (50-59)
    #[error("host error: {0}")]
    Host(String),

    #[error("timed out after {seconds}s waiting for host during {phase}")]
    HandshakeTimeout { phase: String, seconds: u64 },

    #[error("another export or import is already in progress")]
    Busy,

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Configuration errors
    /// - 20-29: Document errors
    /// - 30-39: Bundle errors
    /// - 40-49: Interruption
    /// - 50-59: Host errors
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::Parse(_) => 20,
            Error::CollectionNotFound(_) => 21,
            Error::InvalidBundle(_) => 30,
            Error::Archive(_) => 31,
            Error::Cancelled => 40,
            Error::CallerDestroyed => 41,
            Error::Host(_) => 50,
            Error::HandshakeTimeout { .. } => 51,
            Error::Busy => 52,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) => ErrorCategory::Config,
            Error::Parse(_) | Error::CollectionNotFound(_) => ErrorCategory::Document,
            Error::InvalidBundle(_) | Error::Archive(_) => ErrorCategory::Bundle,
            Error::Cancelled | Error::CallerDestroyed => ErrorCategory::Interrupted,
            Error::Host(_) | Error::HandshakeTimeout { .. } | Error::Busy => ErrorCategory::Host,
            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Returns whether retrying the same operation may succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Config(_) => true,

            // The document or bundle itself is broken
            Error::Parse(_) => false,
            Error::CollectionNotFound(_) => false,
            Error::InvalidBundle(_) => false,
            Error::Archive(_) => true,

            // User asked to stop; running again is fine
            Error::Cancelled => true,
            // Owner is gone; nobody to retry for
            Error::CallerDestroyed => false,

            Error::Host(_) => true,
            Error::HandshakeTimeout { .. } => true,
            Error::Busy => true,

            Error::Io(_) => true,
            Error::Json(_) => false,
        }
    }

    /// Returns true for caller- or destruction-initiated interruptions.
    pub fn is_interruption(&self) -> bool {
        matches!(self, Error::Cancelled | Error::CallerDestroyed)
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::Config(_) => "Configuration Error",
            Error::Parse(_) => "Malformed Scene Collection",
            Error::CollectionNotFound(_) => "Scene Collection Not Found",
            Error::InvalidBundle(_) => "Invalid Scene Bundle",
            Error::Archive(_) => "Archive Error",
            Error::Cancelled => "Cancelled",
            Error::CallerDestroyed => "Interrupted",
            Error::Host(_) => "Host Error",
            Error::HandshakeTimeout { .. } => "Host Did Not Respond",
            Error::Busy => "Operation In Progress",
            Error::Io(_) => "I/O Error",
            Error::Json(_) => "Serialization Error",
        }
    }
}
