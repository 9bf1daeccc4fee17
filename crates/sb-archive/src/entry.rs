//! Queued archive entries and entry-name rules.
//!
//! Internal names always use forward slashes. A name ending in `/` is a
//! directory marker.

use crate::{ArchiveError, Result};
use std::path::{Component, Path, PathBuf};

/// Where an entry's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntrySource {
    /// Streamed from disk in chunks; the file is opened only when its turn
    /// comes.
    File(PathBuf),
    /// Small in-memory blob (manifest, collection document).
    Memory(Vec<u8>),
    /// Empty directory marker.
    Directory,
}

/// One entry waiting to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingArchiveEntry {
    pub name: String,
    pub source: EntrySource,
}

impl PendingArchiveEntry {
    pub fn file(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            source: EntrySource::File(path.into()),
        }
    }

    pub fn bytes(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            source: EntrySource::Memory(data),
        }
    }

    pub fn directory(name: impl Into<String>) -> Self {
        let mut name = name.into();
        if !name.ends_with('/') {
            name.push('/');
        }
        Self {
            name,
            source: EntrySource::Directory,
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self.source, EntrySource::Directory)
    }

    /// Size of the entry's payload: file size via stat, blob length, or 0.
    pub fn size(&self) -> Result<u64> {
        match &self.source {
            EntrySource::File(path) => std::fs::metadata(path)
                .map(|m| m.len())
                .map_err(|source| ArchiveError::SourceFile {
                    path: path.clone(),
                    source,
                }),
            EntrySource::Memory(data) => Ok(data.len() as u64),
            EntrySource::Directory => Ok(0),
        }
    }
}

/// Normalize an internal entry name: backslashes become `/`, `.` segments and
/// repeated separators are dropped. Rejects empty, absolute, and `..` names.
///
/// A trailing `/` (directory marker) is preserved.
pub fn normalize_entry_name(name: &str) -> Result<String> {
    let unified = name.replace('\\', "/");
    if unified.starts_with('/') {
        return Err(ArchiveError::UnsafeEntryName(name.to_string()));
    }

    let is_dir = unified.ends_with('/');
    let mut segments = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err(ArchiveError::UnsafeEntryName(name.to_string())),
            s if s.contains(':') => return Err(ArchiveError::UnsafeEntryName(name.to_string())),
            s => segments.push(s),
        }
    }

    if segments.is_empty() {
        return Err(ArchiveError::InvalidEntryName(name.to_string()));
    }

    let mut normalized = segments.join("/");
    if is_dir {
        normalized.push('/');
    }
    Ok(normalized)
}

/// Map an entry name read from an archive to a path relative to the
/// extraction root. Any name that could escape the root (absolute paths,
/// drive prefixes, `..`) is rejected.
pub fn safe_relative_path(name: &str) -> Result<PathBuf> {
    let normalized = normalize_entry_name(name)?;
    let relative: PathBuf = normalized.trim_end_matches('/').split('/').collect();

    let all_normal = relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    if !all_normal || Path::new(&relative).is_absolute() {
        return Err(ArchiveError::UnsafeEntryName(name.to_string()));
    }
    Ok(relative)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_backslashes() {
        assert_eq!(
            normalize_entry_name("Assets\\images\\logo.png").unwrap(),
            "Assets/images/logo.png"
        );
        assert_eq!(
            normalize_entry_name("./Assets//misc/a.txt").unwrap(),
            "Assets/misc/a.txt"
        );
    }

    #[test]
    fn test_normalize_keeps_directory_marker() {
        assert_eq!(normalize_entry_name("Assets/empty/").unwrap(), "Assets/empty/");
    }

    #[test]
    fn test_normalize_rejects_traversal() {
        assert!(matches!(
            normalize_entry_name("../evil.txt"),
            Err(ArchiveError::UnsafeEntryName(_))
        ));
        assert!(matches!(
            normalize_entry_name("Assets/../../evil.txt"),
            Err(ArchiveError::UnsafeEntryName(_))
        ));
        assert!(matches!(
            normalize_entry_name("/etc/passwd"),
            Err(ArchiveError::UnsafeEntryName(_))
        ));
        assert!(matches!(
            normalize_entry_name("C:/Windows/evil.dll"),
            Err(ArchiveError::UnsafeEntryName(_))
        ));
        assert!(matches!(
            normalize_entry_name("\\\\server\\share\\x"),
            Err(ArchiveError::UnsafeEntryName(_))
        ));
    }

    #[test]
    fn test_normalize_rejects_empty() {
        assert!(matches!(
            normalize_entry_name(""),
            Err(ArchiveError::InvalidEntryName(_))
        ));
        assert!(matches!(
            normalize_entry_name("./"),
            Err(ArchiveError::InvalidEntryName(_))
        ));
    }

    #[test]
    fn test_safe_relative_path() {
        let path = safe_relative_path("Assets/images/logo.png").unwrap();
        assert_eq!(path, PathBuf::from("Assets").join("images").join("logo.png"));
        let dir = safe_relative_path("Assets/empty/").unwrap();
        assert_eq!(dir, PathBuf::from("Assets").join("empty"));
        assert!(safe_relative_path("a/../../b").is_err());
    }

    #[test]
    fn test_directory_constructor_appends_slash() {
        let entry = PendingArchiveEntry::directory("Assets/empty");
        assert_eq!(entry.name, "Assets/empty/");
        assert!(entry.is_directory());
        assert_eq!(entry.size().unwrap(), 0);
    }

    #[test]
    fn test_size_of_missing_file_is_source_error() {
        let entry = PendingArchiveEntry::file("a.png", "/definitely/not/here.png");
        assert!(matches!(entry.size(), Err(ArchiveError::SourceFile { .. })));
    }
}
