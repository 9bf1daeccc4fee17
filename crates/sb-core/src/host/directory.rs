//! A scene host backed by a directory of collection files.
//!
//! Layout:
//! - `<dir>/<name>.json`: one file per collection
//! - `<dir>/host.json`: active collection and canvas size
//!
//! Like an interactive host, it keeps the active collection in memory and
//! writes it back to its file whenever it switches away. Requests are queued
//! to a single event-loop thread that performs them in order and dispatches
//! notifications from that thread.

use super::fs::{FileSystem, LocalFs};
use super::{validate_collection_name, HostEvent, HostListener, SceneHost, SubscriptionId};
use parking_lot::Mutex;
use sb_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;
use tracing::{debug, error, info, warn};

/// Host state file inside the collections directory.
pub const HOST_STATE_FILE: &str = "host.json";

/// Persisted host state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostState {
    pub current_collection: String,
    pub canvas_width: u32,
    pub canvas_height: u32,
}

impl Default for HostState {
    fn default() -> Self {
        Self {
            current_collection: "Untitled".to_string(),
            canvas_width: 1920,
            canvas_height: 1080,
        }
    }
}

enum Request {
    Create(String),
    Switch(String),
    Shutdown,
}

struct Shared {
    dir: PathBuf,
    state: Mutex<HostState>,
    /// In-memory copy of the active collection.
    active_document: Mutex<String>,
    listeners: Mutex<Vec<(SubscriptionId, HostListener)>>,
    next_id: AtomicU64,
}

/// Directory-backed [`SceneHost`] with its own event-loop thread.
pub struct DirectoryHost {
    shared: Arc<Shared>,
    requests: mpsc::Sender<Request>,
    event_loop: Option<JoinHandle<()>>,
}

impl DirectoryHost {
    /// Open (or initialize) a collections directory and start the event loop.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;

        let state_path = dir.join(HOST_STATE_FILE);
        let state = if state_path.is_file() {
            let text = std::fs::read_to_string(&state_path)?;
            serde_json::from_str::<HostState>(&text).map_err(|e| {
                Error::Host(format!("invalid {}: {}", state_path.display(), e))
            })?
        } else {
            HostState::default()
        };
        validate_collection_name(&state.current_collection)?;

        let active_path = collection_file(&dir, &state.current_collection);
        if !active_path.is_file() {
            LocalFs.write_atomic(&active_path, &empty_collection(&state.current_collection))?;
        }
        let active_document = std::fs::read_to_string(&active_path)?;

        let shared = Arc::new(Shared {
            dir,
            state: Mutex::new(state),
            active_document: Mutex::new(active_document),
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        });
        shared.save_state()?;

        let (tx, rx) = mpsc::channel();
        let loop_shared = shared.clone();
        let handle = std::thread::Builder::new()
            .name("sb-host-loop".to_string())
            .spawn(move || run_event_loop(loop_shared, rx))?;

        info!(dir = %shared.dir.display(), "Directory host started");
        Ok(Self {
            shared,
            requests: tx,
            event_loop: Some(handle),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.shared.dir
    }

    pub fn state(&self) -> HostState {
        self.shared.state.lock().clone()
    }

    fn send(&self, request: Request) -> Result<()> {
        self.requests
            .send(request)
            .map_err(|_| Error::Host("host event loop has stopped".to_string()))
    }
}

impl Drop for DirectoryHost {
    fn drop(&mut self) {
        let _ = self.requests.send(Request::Shutdown);
        if let Some(handle) = self.event_loop.take() {
            if handle.join().is_err() {
                error!("Host event loop panicked");
            }
        }
    }
}

impl SceneHost for DirectoryHost {
    fn current_collection(&self) -> Result<String> {
        Ok(self.shared.state.lock().current_collection.clone())
    }

    fn collection_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.shared.dir)? {
            let path = entry?.path();
            let is_collection = path.is_file()
                && path.extension().is_some_and(|ext| ext == "json")
                && path.file_name().is_some_and(|n| n != HOST_STATE_FILE);
            if let (true, Some(stem)) = (is_collection, path.file_stem()) {
                names.push(stem.to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    fn collection_path(&self, name: &str) -> Result<PathBuf> {
        validate_collection_name(name)?;
        Ok(collection_file(&self.shared.dir, name))
    }

    fn read_collection(&self, name: &str) -> Result<String> {
        validate_collection_name(name)?;
        if self.shared.state.lock().current_collection == name {
            return Ok(self.shared.active_document.lock().clone());
        }
        let path = collection_file(&self.shared.dir, name);
        if !path.is_file() {
            return Err(Error::CollectionNotFound(name.to_string()));
        }
        Ok(std::fs::read_to_string(path)?)
    }

    fn canvas_size(&self) -> Result<(u32, u32)> {
        let state = self.shared.state.lock();
        Ok((state.canvas_width, state.canvas_height))
    }

    fn request_create_collection(&self, name: &str) -> Result<()> {
        validate_collection_name(name)?;
        self.send(Request::Create(name.to_string()))
    }

    fn request_switch_collection(&self, name: &str) -> Result<()> {
        validate_collection_name(name)?;
        self.send(Request::Switch(name.to_string()))
    }

    fn subscribe(&self, listener: HostListener) -> SubscriptionId {
        let id = self.shared.next_id.fetch_add(1, Ordering::SeqCst);
        self.shared.listeners.lock().push((id, listener));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.shared.listeners.lock().retain(|(sid, _)| *sid != id);
    }
}

fn run_event_loop(shared: Arc<Shared>, requests: mpsc::Receiver<Request>) {
    for request in requests {
        let (name, outcome) = match request {
            Request::Create(name) => {
                let outcome = shared.create(&name);
                (name, outcome)
            }
            Request::Switch(name) => {
                let outcome = shared.switch(&name);
                (name, outcome)
            }
            Request::Shutdown => break,
        };
        let events = outcome.unwrap_or_else(|e| {
            error!(collection = %name, error = %e, "Host request failed");
            vec![HostEvent::RequestFailed {
                name,
                reason: e.to_string(),
            }]
        });
        for event in events {
            shared.dispatch(&event);
        }
    }

    if let Err(e) = shared.save_active() {
        warn!(error = %e, "Failed to save active collection on shutdown");
    }
    debug!("Host event loop stopped");
}

impl Shared {
    fn create(&self, name: &str) -> Result<Vec<HostEvent>> {
        let path = collection_file(&self.dir, name);
        if path.exists() {
            return Err(Error::Host(format!("collection already exists: {}", name)));
        }
        let document = empty_collection(name);
        LocalFs.write_atomic(&path, &document)?;
        self.activate(name, String::from_utf8_lossy(&document).into_owned())?;
        info!(collection = name, "Collection created");
        Ok(vec![
            HostEvent::CollectionCreated {
                name: name.to_string(),
            },
            HostEvent::CollectionChanged {
                name: name.to_string(),
            },
        ])
    }

    fn switch(&self, name: &str) -> Result<Vec<HostEvent>> {
        let path = collection_file(&self.dir, name);
        if !path.is_file() {
            return Err(Error::CollectionNotFound(name.to_string()));
        }
        if self.state.lock().current_collection != name {
            let document = std::fs::read_to_string(&path)?;
            self.activate(name, document)?;
        }
        info!(collection = name, "Collection switched");
        Ok(vec![HostEvent::CollectionChanged {
            name: name.to_string(),
        }])
    }

    /// Save the outgoing collection, then make `name` active.
    fn activate(&self, name: &str, document: String) -> Result<()> {
        self.save_active()?;
        *self.active_document.lock() = document;
        self.state.lock().current_collection = name.to_string();
        self.save_state()
    }

    fn save_active(&self) -> Result<()> {
        let current = self.state.lock().current_collection.clone();
        let document = self.active_document.lock().clone();
        LocalFs.write_atomic(&collection_file(&self.dir, &current), document.as_bytes())?;
        Ok(())
    }

    fn save_state(&self) -> Result<()> {
        let state = self.state.lock().clone();
        let json = serde_json::to_vec_pretty(&state)?;
        LocalFs.write_atomic(&self.dir.join(HOST_STATE_FILE), &json)?;
        Ok(())
    }

    fn dispatch(&self, event: &HostEvent) {
        // Listeners may unsubscribe from inside the callback
        let listeners: Vec<HostListener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        debug!(?event, listeners = listeners.len(), "Dispatching host event");
        for listener in listeners {
            listener(event);
        }
    }
}

fn collection_file(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.json", name))
}

fn empty_collection(name: &str) -> Vec<u8> {
    let document = serde_json::json!({
        "name": name,
        "current_scene": "Scene",
        "scene_order": [{"name": "Scene"}],
        "sources": [],
        "groups": [],
        "transitions": [],
        "modules": {}
    });
    serde_json::to_vec_pretty(&document).unwrap_or_default()
}
