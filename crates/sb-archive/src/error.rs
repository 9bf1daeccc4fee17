//! Error types for archive operations.

use sb_common::CancelReason;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while writing or reading a bundle archive.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// I/O error on the archive itself or an extraction target
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O error on a queued source file (missing asset, permission denied)
    #[error("cannot read source file '{}': {source}", path.display())]
    SourceFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// ZIP archive error
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The cancel token was observed set
    #[error("archive operation cancelled ({0:?})")]
    Cancelled(CancelReason),

    /// Entry not present in the archive
    #[error("entry not found in archive: {0}")]
    EntryNotFound(String),

    /// Entry name would escape the extraction directory
    #[error("unsafe entry name: {0}")]
    UnsafeEntryName(String),

    /// Entry name is empty or otherwise unusable
    #[error("invalid entry name: {0:?}")]
    InvalidEntryName(String),

    /// Two queued entries share an internal name
    #[error("duplicate entry name: {0}")]
    DuplicateEntry(String),

    /// Entry requested as text is not UTF-8
    #[error("entry is not valid UTF-8: {0}")]
    InvalidUtf8(String),

    /// Nothing queued
    #[error("archive has no entries to write")]
    EmptyArchive,

    /// Corrupted or unsupported manifest
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),
}

impl ArchiveError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ArchiveError::Cancelled(_))
    }
}

impl From<CancelReason> for ArchiveError {
    fn from(reason: CancelReason) -> Self {
        ArchiveError::Cancelled(reason)
    }
}

impl From<ArchiveError> for sb_common::Error {
    fn from(err: ArchiveError) -> Self {
        match err {
            ArchiveError::Cancelled(reason) => reason.into(),
            ArchiveError::Io(e) => sb_common::Error::Io(e),
            ArchiveError::InvalidManifest(msg) => sb_common::Error::InvalidBundle(msg),
            other => sb_common::Error::Archive(other.to_string()),
        }
    }
}

/// Result type alias for archive operations.
pub type Result<T> = std::result::Result<T, ArchiveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_maps_to_common_error() {
        let err: sb_common::Error = ArchiveError::Cancelled(CancelReason::Cancelled).into();
        assert!(matches!(err, sb_common::Error::Cancelled));

        let err: sb_common::Error =
            ArchiveError::Cancelled(CancelReason::CallerDestroyed).into();
        assert!(matches!(err, sb_common::Error::CallerDestroyed));
    }

    #[test]
    fn test_source_file_message_names_path() {
        let err = ArchiveError::SourceFile {
            path: PathBuf::from("/media/missing.png"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        assert!(err.to_string().contains("/media/missing.png"));
        let common: sb_common::Error = err.into();
        assert!(matches!(common, sb_common::Error::Archive(_)));
    }
}
