//! Streaming archive writer/reader for scene bundles.
//!
//! A scene bundle is a ZIP archive containing:
//! - `manifest.json`: canvas size, requirements, device descriptions
//! - `collection.json`: the rewritten scene collection document
//! - `Assets/<class>/...`: relocated media, shaders, scripts
//!
//! Both directions stream in bounded chunks, report per-entry and overall
//! progress through a [`ProgressEmitter`](sb_common::ProgressEmitter), and
//! poll a [`CancelToken`](sb_common::CancelToken) at every chunk and entry
//! boundary.
//!
//! # Example
//!
//! ```no_run
//! use sb_archive::{ArchiveReader, ArchiveWriter, IoContext};
//! use std::path::Path;
//!
//! let mut writer = ArchiveWriter::new();
//! writer.add_bytes("collection.json", b"{}".to_vec()).unwrap();
//! writer.add_file("Assets/images/logo.png", "/media/logo.png").unwrap();
//! writer.write(Path::new("show.scenebundle"), &IoContext::default()).unwrap();
//!
//! let mut reader = ArchiveReader::open(Path::new("show.scenebundle")).unwrap();
//! assert!(reader.contains("collection.json"));
//! reader.extract_all(Path::new("/tmp/show"), &IoContext::default()).unwrap();
//! ```

pub mod entry;
pub mod error;
pub mod manifest;
pub mod progress;
pub mod reader;
pub mod writer;

pub use entry::{normalize_entry_name, safe_relative_path, EntrySource, PendingArchiveEntry};
pub use error::{ArchiveError, Result};
pub use manifest::{
    BundleManifest, RequirementLink, ASSETS_DIR, BUNDLE_FORMAT_VERSION, COLLECTION_FILE_NAME,
    MANIFEST_FILE_NAME,
};
pub use progress::IoContext;
pub use reader::{ArchiveReader, ExtractSummary};
pub use writer::{ArchiveWriter, WriteSummary};
pub use zip::CompressionMethod;

/// Default streaming chunk size in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;
