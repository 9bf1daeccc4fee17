//! Collaborator interfaces: the scene host and the filesystem.
//!
//! The host owns scene collections and processes create/switch requests on
//! its own event loop, announcing completion through notifications.
//! Listeners are invoked on the host's thread and must not block.

mod directory;
mod fs;

pub use directory::{DirectoryHost, HostState, HOST_STATE_FILE};
pub use fs::{FileSystem, LocalFs};

use sb_common::{Error, Result};
use std::path::PathBuf;
use std::sync::Arc;

/// Handle returned by [`SceneHost::subscribe`].
pub type SubscriptionId = u64;

/// Callback receiving host notifications.
pub type HostListener = Arc<dyn Fn(&HostEvent) + Send + Sync>;

/// Notifications dispatched by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// A requested collection now exists.
    CollectionCreated { name: String },
    /// The active collection changed.
    CollectionChanged { name: String },
    /// A create or switch request for `name` could not be carried out.
    RequestFailed { name: String, reason: String },
}

impl HostEvent {
    pub fn collection(&self) -> &str {
        match self {
            HostEvent::CollectionCreated { name }
            | HostEvent::CollectionChanged { name }
            | HostEvent::RequestFailed { name, .. } => name,
        }
    }
}

/// The application that owns scene collections.
pub trait SceneHost: Send + Sync {
    /// Name of the active collection.
    fn current_collection(&self) -> Result<String>;

    fn collection_names(&self) -> Result<Vec<String>>;

    /// File backing the named collection.
    fn collection_path(&self, name: &str) -> Result<PathBuf>;

    /// Serialized document of the named collection.
    fn read_collection(&self, name: &str) -> Result<String>;

    /// Output canvas as (width, height).
    fn canvas_size(&self) -> Result<(u32, u32)>;

    /// Ask the host to create a collection. Completion is signalled by
    /// [`HostEvent::CollectionCreated`], failure by [`HostEvent::RequestFailed`].
    fn request_create_collection(&self, name: &str) -> Result<()>;

    /// Ask the host to switch collections. Completion is signalled by
    /// [`HostEvent::CollectionChanged`], failure by [`HostEvent::RequestFailed`].
    fn request_switch_collection(&self, name: &str) -> Result<()>;

    fn subscribe(&self, listener: HostListener) -> SubscriptionId;

    fn unsubscribe(&self, id: SubscriptionId);
}

/// File stem reserved for the host's own state file.
pub const RESERVED_COLLECTION_NAME: &str = "host";

/// Reject names that cannot be used as a collection file stem.
pub fn validate_collection_name(name: &str) -> Result<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::Config("collection name is empty".to_string()));
    }
    if trimmed == "." || trimmed == ".." || name.contains(['/', '\\', ':']) {
        return Err(Error::Config(format!("invalid collection name: {:?}", name)));
    }
    if trimmed.eq_ignore_ascii_case(RESERVED_COLLECTION_NAME) {
        return Err(Error::Config(format!("collection name is reserved: {:?}", name)));
    }
    Ok(())
}
