//! Bundle manifest types and serialization.
//!
//! The manifest describes what a bundle needs from the machine it is
//! installed on:
//! - Canvas dimensions the collection was authored for
//! - Plugins and third-party tools the collection depends on
//! - Human-readable descriptions of capture devices to re-select on import
//! - Stream Deck assets shipped alongside the collection

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current bundle format version.
pub const BUNDLE_FORMAT_VERSION: u32 = 1;

/// Manifest entry name within the archive.
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// Collection document entry name within the archive.
pub const COLLECTION_FILE_NAME: &str = "collection.json";

/// Root directory of relocated assets within the archive.
pub const ASSETS_DIR: &str = "Assets";

/// A named link to something the importer must install separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementLink {
    pub name: String,
    pub url: String,
}

impl RequirementLink {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Top-level bundle metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleManifest {
    /// Bundle format version.
    pub format_version: u32,

    /// Identifier of this bundle (product id or generated UUID).
    pub bundle_id: String,

    /// Semantic version of the packaged collection.
    #[serde(default)]
    pub version: String,

    /// Name of the collection at export time.
    #[serde(default)]
    pub collection_name: String,

    pub canvas_width: u32,
    pub canvas_height: u32,

    #[serde(default)]
    pub required_plugins: Vec<String>,

    /// Source uuid → device description shown to the importer.
    #[serde(default)]
    pub video_device_descriptions: BTreeMap<String, String>,

    #[serde(default)]
    pub third_party_requirements: Vec<RequirementLink>,

    /// Portable paths of Stream Deck assets in the archive.
    #[serde(default)]
    pub stream_deck_assets: Vec<String>,

    /// Scenes the author selected as outputs.
    #[serde(default)]
    pub output_scenes: Vec<String>,

    /// Export time. Bundles written by other tools may omit it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    /// Tool that produced the bundle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<String>,
}

impl BundleManifest {
    /// Create a manifest for a canvas of the given size with a fresh bundle id.
    pub fn new(canvas_width: u32, canvas_height: u32) -> Self {
        Self {
            format_version: BUNDLE_FORMAT_VERSION,
            bundle_id: uuid::Uuid::new_v4().to_string(),
            version: "1.0.0".to_string(),
            collection_name: String::new(),
            canvas_width,
            canvas_height,
            required_plugins: Vec::new(),
            video_device_descriptions: BTreeMap::new(),
            third_party_requirements: Vec::new(),
            stream_deck_assets: Vec::new(),
            output_scenes: Vec::new(),
            created_at: Some(Utc::now()),
            generator: None,
        }
    }

    pub fn with_bundle_id(mut self, bundle_id: impl Into<String>) -> Self {
        self.bundle_id = bundle_id.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_collection_name(mut self, name: impl Into<String>) -> Self {
        self.collection_name = name.into();
        self
    }

    pub fn with_generator(mut self, generator: impl Into<String>) -> Self {
        self.generator = Some(generator.into());
        self
    }

    pub fn add_required_plugin(&mut self, plugin: impl Into<String>) {
        let plugin = plugin.into();
        if !self.required_plugins.contains(&plugin) {
            self.required_plugins.push(plugin);
        }
    }

    pub fn add_requirement(&mut self, link: RequirementLink) {
        self.third_party_requirements.push(link);
    }

    pub fn describe_video_device(&mut self, uuid: impl Into<String>, description: impl Into<String>) {
        self.video_device_descriptions
            .insert(uuid.into(), description.into());
    }

    /// Validate the manifest structure.
    pub fn validate(&self) -> crate::Result<()> {
        if self.format_version == 0 || self.format_version > BUNDLE_FORMAT_VERSION {
            return Err(crate::ArchiveError::InvalidManifest(format!(
                "unsupported format version {} (supported: {})",
                self.format_version, BUNDLE_FORMAT_VERSION
            )));
        }

        if self.bundle_id.trim().is_empty() {
            return Err(crate::ArchiveError::InvalidManifest(
                "bundleId is empty".to_string(),
            ));
        }

        if self.canvas_width == 0 || self.canvas_height == 0 {
            return Err(crate::ArchiveError::InvalidManifest(format!(
                "canvas size {}x{} is not positive",
                self.canvas_width, self.canvas_height
            )));
        }

        for asset in &self.stream_deck_assets {
            crate::entry::normalize_entry_name(asset).map_err(|_| {
                crate::ArchiveError::InvalidManifest(format!(
                    "stream deck asset has invalid path: {}",
                    asset
                ))
            })?;
        }

        Ok(())
    }

    /// Serialize to JSON with consistent formatting.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse from JSON.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_new() {
        let manifest = BundleManifest::new(1920, 1080);
        assert_eq!(manifest.format_version, BUNDLE_FORMAT_VERSION);
        assert_eq!(manifest.canvas_width, 1920);
        assert!(uuid::Uuid::parse_str(&manifest.bundle_id).is_ok());
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_manifest_camel_case_keys() {
        let mut manifest = BundleManifest::new(1280, 720).with_bundle_id("product-42");
        manifest.add_required_plugin("move-transition");
        manifest.describe_video_device("uuid-1", "Front camera");
        manifest.add_requirement(RequirementLink::new("Font", "https://example.com/font"));

        let json: serde_json::Value = serde_json::from_str(&manifest.to_json().unwrap()).unwrap();
        assert_eq!(json["canvasWidth"], 1280);
        assert_eq!(json["canvasHeight"], 720);
        assert_eq!(json["formatVersion"], 1);
        assert_eq!(json["bundleId"], "product-42");
        assert_eq!(json["requiredPlugins"][0], "move-transition");
        assert_eq!(json["videoDeviceDescriptions"]["uuid-1"], "Front camera");
        assert_eq!(json["thirdPartyRequirements"][0]["url"], "https://example.com/font");
        assert!(json["streamDeckAssets"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_manifest_roundtrip() {
        let manifest = BundleManifest::new(1920, 1080)
            .with_version("2.1.0")
            .with_collection_name("Stream Night")
            .with_generator("sb-core 0.1.0");
        let parsed = BundleManifest::from_json(&manifest.to_json().unwrap()).unwrap();
        assert_eq!(parsed, manifest);
    }

    #[test]
    fn test_minimal_manifest_parses() {
        let json = r#"{
            "formatVersion": 1,
            "bundleId": "abc",
            "canvasWidth": 1920,
            "canvasHeight": 1080,
            "createdAt": "2026-01-15T14:30:22Z"
        }"#;
        let manifest = BundleManifest::from_json(json).unwrap();
        assert!(manifest.required_plugins.is_empty());
        assert!(manifest.created_at.is_some());
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_manifest_without_created_at_parses() {
        let json = r#"{
            "formatVersion": 1,
            "bundleId": "abc",
            "canvasWidth": 1920,
            "canvasHeight": 1080
        }"#;
        let manifest = BundleManifest::from_json(json).unwrap();
        assert_eq!(manifest.created_at, None);
        assert!(manifest.validate().is_ok());

        let out: serde_json::Value = serde_json::from_str(&manifest.to_json().unwrap()).unwrap();
        assert!(out.get("createdAt").is_none());
    }

    #[test]
    fn test_validate_rejects_future_version() {
        let mut manifest = BundleManifest::new(1920, 1080);
        manifest.format_version = BUNDLE_FORMAT_VERSION + 1;
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_canvas() {
        let manifest = BundleManifest::new(0, 1080);
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_traversing_stream_deck_asset() {
        let mut manifest = BundleManifest::new(1920, 1080);
        manifest.stream_deck_assets.push("../icons/a.png".into());
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_duplicate_plugins_ignored() {
        let mut manifest = BundleManifest::new(1920, 1080);
        manifest.add_required_plugin("a");
        manifest.add_required_plugin("a");
        assert_eq!(manifest.required_plugins.len(), 1);
    }
}
