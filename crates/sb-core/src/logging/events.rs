//! Event names, run stages, and per-run correlation fields.
//!
//! Every [`log_event!`](crate::log_event) call uses one of the names below
//! as its tracing target and carries the run id and stage.

/// Stages of an export or import run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Startup and configuration.
    Init,
    /// Reading the active collection from the host.
    Collect,
    /// Placeholder and asset-path rewriting.
    Rewrite,
    /// Writing the archive.
    Package,
    /// Unpacking an archive.
    Extract,
    /// Create/switch exchange with the host.
    Handshake,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Init => "init",
            Stage::Collect => "collect",
            Stage::Rewrite => "rewrite",
            Stage::Package => "package",
            Stage::Extract => "extract",
            Stage::Handshake => "handshake",
        };
        write!(f, "{}", s)
    }
}

/// Standard event names used in logging.
pub mod event_names {
    // Export
    pub const EXPORT_STARTED: &str = "export.started";
    pub const EXPORT_COLLECTED: &str = "export.collected";
    pub const EXPORT_REWRITTEN: &str = "export.rewritten";
    pub const EXPORT_PACKAGED: &str = "export.packaged";
    pub const EXPORT_FAILED: &str = "export.failed";

    // Import
    pub const IMPORT_STARTED: &str = "import.started";
    pub const IMPORT_EXTRACTED: &str = "import.extracted";
    pub const IMPORT_REWRITTEN: &str = "import.rewritten";
    pub const IMPORT_FINISHED: &str = "import.finished";
    pub const IMPORT_FAILED: &str = "import.failed";

    // Handshake
    pub const HANDSHAKE_PHASE: &str = "handshake.phase";

    // Config/init events
    pub const CONFIG_LOADED: &str = "config.loaded";
    pub const CONFIG_ERROR: &str = "config.error";
}

/// Correlation fields shared by every event of one run.
#[derive(Debug, Clone)]
pub struct LogContext {
    pub run_id: String,
    pub collection: Option<String>,
}

impl LogContext {
    pub fn new(run_id: impl Into<String>) -> Self {
        LogContext {
            run_id: run_id.into(),
            collection: None,
        }
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }
}
