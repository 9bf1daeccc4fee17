//! Inputs, outputs, and run states of the bundle orchestrator.

use crate::filters::SkippedFilterRecord;
use crate::rewrite::VideoDevice;
use sb_archive::{BundleManifest, RequirementLink};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Export progress through its stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportState {
    #[default]
    Idle,
    Collecting,
    Rewriting,
    Packaging,
    Done,
    Cancelled,
    Error,
}

/// Import progress through its stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportState {
    #[default]
    Idle,
    Extracting,
    Rewriting,
    SwitchingCollection,
    Done,
    Cancelled,
    Error,
}

/// Caller metadata for one export.
#[derive(Debug, Clone, Default)]
pub struct ExportRequest {
    /// Archive to create.
    pub output: PathBuf,
    pub required_plugins: Vec<String>,
    pub requirements: Vec<RequirementLink>,
    pub output_scenes: Vec<String>,
    /// Device descriptions keyed by source uuid or source name.
    pub video_labels: BTreeMap<String, String>,
    /// Stream Deck profile files shipped with the bundle.
    pub stream_deck_assets: Vec<PathBuf>,
    /// Semantic version of the packaged collection.
    pub version: Option<String>,
    /// Product id; a UUID v4 is generated when absent.
    pub bundle_id: Option<String>,
}

impl ExportRequest {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            ..Self::default()
        }
    }

    pub fn with_plugin(mut self, plugin: impl Into<String>) -> Self {
        self.required_plugins.push(plugin.into());
        self
    }

    pub fn with_requirement(mut self, name: impl Into<String>, url: impl Into<String>) -> Self {
        self.requirements.push(RequirementLink::new(name, url));
        self
    }

    pub fn with_output_scene(mut self, scene: impl Into<String>) -> Self {
        self.output_scenes.push(scene.into());
        self
    }

    pub fn with_video_label(mut self, key: impl Into<String>, label: impl Into<String>) -> Self {
        self.video_labels.insert(key.into(), label.into());
        self
    }

    pub fn with_stream_deck_asset(mut self, path: impl Into<PathBuf>) -> Self {
        self.stream_deck_assets.push(path.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_bundle_id(mut self, id: impl Into<String>) -> Self {
        self.bundle_id = Some(id.into());
        self
    }
}

/// Summary of a finished export.
#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub archive: PathBuf,
    pub collection_name: String,
    pub bundle_id: String,
    /// Distinct files and directories relocated into the bundle.
    pub assets: usize,
    pub entries: usize,
    pub bytes: u64,
    pub skipped_filters: Vec<SkippedFilterRecord>,
    pub video_devices: Vec<VideoDevice>,
}

/// Caller input for one import.
#[derive(Debug, Clone, Default)]
pub struct ImportRequest {
    pub archive: PathBuf,
    /// Requested collection name; made unique against existing collections.
    pub collection_name: String,
    /// Where assets are extracted. Defaults to `<assets_root>/<name>`.
    pub destination: Option<PathBuf>,
    /// Replacement settings keyed by capture-device uuid.
    pub device_settings: BTreeMap<String, Value>,
    pub audio_settings: Option<Value>,
}

impl ImportRequest {
    pub fn new(archive: impl Into<PathBuf>, collection_name: impl Into<String>) -> Self {
        Self {
            archive: archive.into(),
            collection_name: collection_name.into(),
            ..Self::default()
        }
    }

    pub fn with_destination(mut self, dir: impl Into<PathBuf>) -> Self {
        self.destination = Some(dir.into());
        self
    }

    pub fn with_device_settings(mut self, uuid: impl Into<String>, settings: Value) -> Self {
        self.device_settings.insert(uuid.into(), settings);
        self
    }

    pub fn with_audio_settings(mut self, settings: Value) -> Self {
        self.audio_settings = Some(settings);
        self
    }
}

/// Summary of a finished import.
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    /// Final (possibly suffixed) collection name.
    pub collection_name: String,
    pub destination: PathBuf,
    pub entries: usize,
    pub bytes: u64,
    pub unresolved_placeholders: Vec<String>,
    pub rejected_paths: Vec<String>,
    pub manifest: BundleManifest,
}
