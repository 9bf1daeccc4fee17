//! Bundle configuration types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application name for data directories.
pub(crate) const APP_NAME: &str = "scene-bundle";

/// Compression applied to archive entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    Deflated,
    Stored,
}

impl std::fmt::Display for Compression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Compression::Deflated => write!(f, "deflated"),
            Compression::Stored => write!(f, "stored"),
        }
    }
}

/// Tunables for export and import runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleConfig {
    /// Schema version of this file.
    pub schema_version: String,

    /// Read/write chunk size for archive streaming, in bytes.
    pub chunk_size: usize,

    /// How long to wait for each host notification during import.
    pub handshake_timeout_secs: u64,

    /// Where the active collection is backed up before an import replaces it.
    pub backup_dir: PathBuf,

    /// Parent of per-collection asset directories created on import.
    pub assets_root: PathBuf,

    /// Filter ids stripped on export in addition to the built-in set.
    pub extra_incompatible_filters: Vec<String>,

    pub compression: Compression,
}

impl Default for BundleConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_NAME);
        Self {
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            chunk_size: 64 * 1024,
            handshake_timeout_secs: 30,
            backup_dir: data_dir.join("backups"),
            assets_root: data_dir.join("assets"),
            extra_incompatible_filters: Vec::new(),
            compression: Compression::Deflated,
        }
    }
}

impl BundleConfig {
    pub fn handshake_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.handshake_timeout_secs)
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_handshake_timeout_secs(mut self, secs: u64) -> Self {
        self.handshake_timeout_secs = secs;
        self
    }

    pub fn with_backup_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.backup_dir = dir.into();
        self
    }

    pub fn with_assets_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.assets_root = dir.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BundleConfig::default();
        assert_eq!(config.schema_version, crate::CONFIG_SCHEMA_VERSION);
        assert_eq!(config.chunk_size, 65536);
        assert_eq!(config.handshake_timeout_secs, 30);
        assert!(config.backup_dir.ends_with("backups"));
        assert!(config.assets_root.ends_with("assets"));
        assert_eq!(config.compression, Compression::Deflated);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: BundleConfig =
            serde_json::from_str(r#"{"chunk_size": 4096, "compression": "stored"}"#).unwrap();
        assert_eq!(config.chunk_size, 4096);
        assert_eq!(config.compression, Compression::Stored);
        assert_eq!(config.handshake_timeout_secs, 30);
    }

    #[test]
    fn test_builder() {
        let config = BundleConfig::default()
            .with_chunk_size(1024)
            .with_handshake_timeout_secs(2)
            .with_backup_dir("/tmp/b");
        assert_eq!(config.chunk_size, 1024);
        assert_eq!(config.handshake_timeout(), std::time::Duration::from_secs(2));
        assert_eq!(config.backup_dir, PathBuf::from("/tmp/b"));
    }
}
