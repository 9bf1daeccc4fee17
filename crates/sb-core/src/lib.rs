//! Scene Bundle Core Library
//!
//! This library provides the core functionality for scene bundles:
//! - Asset path deduplication into a portable namespace
//! - Export/import rewriting of collection documents
//! - Host and filesystem collaborator interfaces, plus a directory-backed host
//! - The create/switch handshake that installs an imported collection
//! - The export/import orchestrator and its worker thread
//! - Exit codes and structured logging for the CLI
//!
//! The binary entry point is in `main.rs`.

pub mod assets;
pub mod exit_codes;
pub mod filters;
pub mod handshake;
pub mod host;
pub mod logging;
pub mod orchestrator;
pub mod rewrite;
pub mod worker;

pub use assets::{AssetClass, AssetDeduplicator, AssetKind, AssetMapping};
pub use filters::{FilterCompatibilityFilter, SkippedFilterRecord};
pub use host::{DirectoryHost, FileSystem, HostEvent, LocalFs, SceneHost};
pub use orchestrator::{
    BundleOrchestrator, ExportReport, ExportRequest, ExportState, ImportReport, ImportRequest,
    ImportState,
};
pub use worker::BundleWorker;
