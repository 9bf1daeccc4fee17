//! Collection document rewriting.
//!
//! Export replaces everything machine-specific with placeholders:
//! - capture-device `settings` become `"{<uuid>}"` or
//!   `"{AUDIO_CAPTURE_SETTINGS}"`
//! - absolute paths to existing files become `"{FILE}:<portable path>"`
//! - incompatible filters are dropped
//!
//! Import reverses the placeholders against the destination directory and
//! caller-supplied device settings. All matching is done on parsed JSON
//! nodes, never on serialized text.

use crate::assets::AssetDeduplicator;
use crate::filters::{FilterCompatibilityFilter, SkippedFilterRecord};
use crate::host::FileSystem;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Prefix of a relocated file reference.
pub const FILE_MARKER: &str = "{FILE}:";

/// Placeholder standing in for audio capture settings.
pub const AUDIO_SETTINGS_PLACEHOLDER: &str = "{AUDIO_CAPTURE_SETTINGS}";

/// Top-level document sections that are rewritten on export.
pub const REWRITE_SECTIONS: &[&str] = &["sources", "groups", "transitions", "modules"];

/// Source ids of video capture devices.
pub const VIDEO_CAPTURE_IDS: &[&str] = &[
    "dshow_input",
    "av_capture_input",
    "macos_avcapture",
    "v4l2_input",
];

/// Source ids of audio capture devices.
pub const AUDIO_CAPTURE_IDS: &[&str] = &[
    "wasapi_input_capture",
    "wasapi_output_capture",
    "coreaudio_input_capture",
    "coreaudio_output_capture",
    "pulse_input_capture",
    "pulse_output_capture",
    "alsa_input_capture",
];

const BROWSER_SOURCE_ID: &str = "browser_source";
const BROWSER_LOCAL_FILE: &str = "local_file";

/// A video capture source whose settings were replaced by a placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoDevice {
    pub uuid: String,
    pub name: String,
}

/// What an export rewrite changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportRewrite {
    pub skipped_filters: Vec<SkippedFilterRecord>,
    pub video_devices: Vec<VideoDevice>,
    pub audio_devices: usize,
    pub file_references: usize,
}

/// Export-direction rewriter.
pub struct ExportRewriter<'a> {
    assets: &'a mut AssetDeduplicator,
    filters: &'a FilterCompatibilityFilter,
    fs: &'a dyn FileSystem,
    report: ExportRewrite,
}

impl<'a> ExportRewriter<'a> {
    pub fn new(
        assets: &'a mut AssetDeduplicator,
        filters: &'a FilterCompatibilityFilter,
        fs: &'a dyn FileSystem,
    ) -> Self {
        Self {
            assets,
            filters,
            fs,
            report: ExportRewrite::default(),
        }
    }

    /// Rewrite the export sections of `document` in place.
    pub fn rewrite(mut self, document: &mut Value) -> ExportRewrite {
        for section in REWRITE_SECTIONS {
            if let Some(value) = document.get_mut(*section) {
                self.visit(value);
            }
        }
        debug!(
            files = self.report.file_references,
            video = self.report.video_devices.len(),
            audio = self.report.audio_devices,
            skipped_filters = self.report.skipped_filters.len(),
            "Export rewrite complete"
        );
        self.report
    }

    fn visit(&mut self, value: &mut Value) {
        match value {
            Value::Object(map) => self.visit_object(map),
            Value::Array(items) => {
                for item in items {
                    self.visit(item);
                }
            }
            Value::String(s) => {
                if let Some(replacement) = self.file_reference(s) {
                    *s = replacement;
                }
            }
            _ => {}
        }
    }

    fn visit_object(&mut self, map: &mut Map<String, Value>) {
        let id = map.get("id").and_then(Value::as_str).map(str::to_string);
        let name = map
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        match id.as_deref() {
            Some(id) if VIDEO_CAPTURE_IDS.contains(&id) => {
                let uuid = map
                    .get("uuid")
                    .and_then(Value::as_str)
                    .filter(|u| !u.is_empty())
                    .unwrap_or(name.as_str())
                    .to_string();
                map.insert("settings".into(), Value::String(format!("{{{}}}", uuid)));
                self.report.video_devices.push(VideoDevice {
                    uuid,
                    name: name.clone(),
                });
            }
            Some(id) if AUDIO_CAPTURE_IDS.contains(&id) => {
                map.insert(
                    "settings".into(),
                    Value::String(AUDIO_SETTINGS_PLACEHOLDER.to_string()),
                );
                self.report.audio_devices += 1;
            }
            Some(BROWSER_SOURCE_ID) => self.rewrite_browser_source(map),
            _ => {}
        }

        if let Some(Value::Array(filters)) = map.get_mut("filters") {
            self.filters
                .filter(&name, filters, &mut self.report.skipped_filters);
        }

        for (_, child) in map.iter_mut() {
            self.visit(child);
        }
    }

    /// The page of a browser source travels with its whole directory.
    fn rewrite_browser_source(&mut self, map: &mut Map<String, Value>) {
        let Some(Value::Object(settings)) = map.get_mut("settings") else {
            return;
        };
        let Some(Value::String(local_file)) = settings.get_mut(BROWSER_LOCAL_FILE) else {
            return;
        };

        let path = PathBuf::from(local_file.as_str());
        if !path.is_absolute() || !self.fs.is_file(&path) {
            return;
        }
        let (Some(parent), Some(file_name)) = (path.parent(), path.file_name()) else {
            return;
        };

        let portable_dir = self.assets.resolve_directory(&parent.to_string_lossy());
        *local_file = format!(
            "{}{}/{}",
            FILE_MARKER,
            portable_dir,
            file_name.to_string_lossy()
        );
        self.report.file_references += 1;
    }

    fn file_reference(&mut self, s: &str) -> Option<String> {
        if s.starts_with(FILE_MARKER) {
            return None;
        }
        let path = Path::new(s);
        if !path.is_absolute() || !self.fs.is_file(path) {
            return None;
        }
        self.report.file_references += 1;
        Some(format!("{}{}", FILE_MARKER, self.assets.resolve(s)))
    }
}

/// What an import rewrite changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportRewrite {
    pub resolved_files: usize,
    pub resolved_devices: usize,
    /// Placeholders with no caller-supplied settings (replaced by `{}`).
    pub unresolved_placeholders: Vec<String>,
    /// `{FILE}:` references left untouched because their path was unsafe.
    pub rejected_paths: Vec<String>,
}

/// Import-direction rewriter.
pub struct ImportRewriter<'a> {
    destination: &'a Path,
    device_settings: &'a BTreeMap<String, Value>,
    audio_settings: Option<&'a Value>,
    collection_name: Option<&'a str>,
    report: ImportRewrite,
}

impl<'a> ImportRewriter<'a> {
    pub fn new(destination: &'a Path, device_settings: &'a BTreeMap<String, Value>) -> Self {
        Self {
            destination,
            device_settings,
            audio_settings: None,
            collection_name: None,
            report: ImportRewrite::default(),
        }
    }

    pub fn with_audio_settings(mut self, settings: Option<&'a Value>) -> Self {
        self.audio_settings = settings;
        self
    }

    /// Set the document's top-level `name` as part of the rewrite.
    pub fn with_collection_name(mut self, name: &'a str) -> Self {
        self.collection_name = Some(name);
        self
    }

    pub fn rewrite(mut self, document: &mut Value) -> ImportRewrite {
        self.visit(document);
        if let (Some(name), Value::Object(map)) = (self.collection_name, document) {
            map.insert("name".into(), Value::String(name.to_string()));
        }
        self.report
    }

    fn visit(&mut self, value: &mut Value) {
        match value {
            Value::Object(map) => {
                for (key, child) in map.iter_mut() {
                    if key == "settings" && self.resolve_settings(child) {
                        continue;
                    }
                    self.visit(child);
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.visit(item);
                }
            }
            Value::String(s) => {
                if let Some(path) = self.resolve_file(s) {
                    *s = path;
                }
            }
            _ => {}
        }
    }

    /// Replace a settings placeholder. Returns true if `value` was one.
    fn resolve_settings(&mut self, value: &mut Value) -> bool {
        let Some(token) = value.as_str() else {
            return false;
        };

        if token == AUDIO_SETTINGS_PLACEHOLDER {
            *value = match self.audio_settings {
                Some(settings) => {
                    self.report.resolved_devices += 1;
                    settings.clone()
                }
                None => {
                    self.report.unresolved_placeholders.push(token.to_string());
                    Value::Object(Map::new())
                }
            };
            return true;
        }

        let Some(key) = token
            .strip_prefix('{')
            .and_then(|t| t.strip_suffix('}'))
            .filter(|k| !k.is_empty())
        else {
            return false;
        };

        *value = match self.device_settings.get(key) {
            Some(settings) => {
                self.report.resolved_devices += 1;
                settings.clone()
            }
            None => {
                warn!(device = key, "No settings supplied for capture device");
                self.report.unresolved_placeholders.push(key.to_string());
                Value::Object(Map::new())
            }
        };
        true
    }

    fn resolve_file(&mut self, s: &str) -> Option<String> {
        let portable = s.strip_prefix(FILE_MARKER)?;
        match portable_to_relative(portable) {
            Some(relative) => {
                self.report.resolved_files += 1;
                Some(self.destination.join(relative).to_string_lossy().into_owned())
            }
            None => {
                warn!(path = portable, "Leaving unsafe portable path untouched");
                self.report.rejected_paths.push(portable.to_string());
                None
            }
        }
    }
}

/// Relative path for a portable path, or `None` if it is absolute, has empty
/// segments, or could climb out of the destination.
fn portable_to_relative(portable: &str) -> Option<PathBuf> {
    if portable.is_empty() || portable.contains('\\') {
        return None;
    }
    let mut relative = PathBuf::new();
    for segment in portable.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." || segment.contains(':') {
            return None;
        }
        relative.push(segment);
    }
    Some(relative)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::LocalFs;
    use serde_json::json;
    use tempfile::TempDir;

    fn export(document: &mut Value) -> (ExportRewrite, AssetDeduplicator) {
        let mut assets = AssetDeduplicator::new();
        let filters = FilterCompatibilityFilter::new();
        let report = ExportRewriter::new(&mut assets, &filters, &LocalFs).rewrite(document);
        (report, assets)
    }

    #[test]
    fn test_video_capture_settings_replaced() {
        let mut doc = json!({
            "sources": [{
                "id": "dshow_input",
                "name": "Webcam",
                "uuid": "7d2e-11",
                "settings": {"video_device_id": "USB Camera:\\\\?\\usb#vid_046d"}
            }]
        });
        let (report, _) = export(&mut doc);
        assert_eq!(doc["sources"][0]["settings"], "{7d2e-11}");
        assert_eq!(
            report.video_devices,
            vec![VideoDevice {
                uuid: "7d2e-11".into(),
                name: "Webcam".into()
            }]
        );
    }

    #[test]
    fn test_audio_capture_settings_replaced() {
        let mut doc = json!({
            "sources": [
                {"id": "wasapi_input_capture", "name": "Mic", "settings": {"device_id": "x"}},
                {"id": "pulse_output_capture", "name": "Desktop", "settings": {}}
            ]
        });
        let (report, _) = export(&mut doc);
        assert_eq!(doc["sources"][0]["settings"], AUDIO_SETTINGS_PLACEHOLDER);
        assert_eq!(doc["sources"][1]["settings"], AUDIO_SETTINGS_PLACEHOLDER);
        assert_eq!(report.audio_devices, 2);
    }

    #[test]
    fn test_existing_absolute_files_become_markers() {
        let dir = TempDir::new().unwrap();
        let image = dir.path().join("logo.png");
        std::fs::write(&image, b"png").unwrap();
        let image_str = image.to_string_lossy().into_owned();

        let mut doc = json!({
            "name": "Show",
            "sources": [{
                "id": "image_source",
                "name": "Logo",
                "settings": {
                    "file": image_str,
                    "missing": "/definitely/not/here.png",
                    "relative": "logo.png"
                }
            }],
            "scene_order": [{"name": image_str}]
        });
        let (report, assets) = export(&mut doc);

        assert_eq!(
            doc["sources"][0]["settings"]["file"],
            "{FILE}:Assets/images/logo.png"
        );
        assert_eq!(doc["sources"][0]["settings"]["missing"], "/definitely/not/here.png");
        assert_eq!(doc["sources"][0]["settings"]["relative"], "logo.png");
        // Sections outside the rewrite set are untouched
        assert_eq!(doc["scene_order"][0]["name"], image_str.as_str());
        assert_eq!(report.file_references, 1);
        assert_eq!(assets.len(), 1);
    }

    #[test]
    fn test_browser_source_resolved_through_directory() {
        let dir = TempDir::new().unwrap();
        let site = dir.path().join("overlay");
        std::fs::create_dir(&site).unwrap();
        std::fs::write(site.join("index.html"), "<html/>").unwrap();
        std::fs::write(site.join("style.css"), "body{}").unwrap();

        let mut doc = json!({
            "sources": [{
                "id": "browser_source",
                "name": "Alerts",
                "settings": {"local_file": site.join("index.html").to_string_lossy(), "is_local_file": true}
            }]
        });
        let (_, assets) = export(&mut doc);

        assert_eq!(
            doc["sources"][0]["settings"]["local_file"],
            "{FILE}:Assets/misc/overlay/index.html"
        );
        assert_eq!(assets.mappings().len(), 1);
        assert_eq!(assets.mappings()[0].kind, crate::assets::AssetKind::Directory);
    }

    #[test]
    fn test_filters_filtered_with_owner_name() {
        let mut doc = json!({
            "sources": [{
                "id": "dshow_input",
                "name": "Cam",
                "uuid": "u1",
                "filters": [
                    {"id": "nv_greenscreen_filter", "name": "Green"},
                    {"id": "color_filter", "name": "Color"}
                ]
            }]
        });
        let (report, _) = export(&mut doc);
        assert_eq!(doc["sources"][0]["filters"].as_array().unwrap().len(), 1);
        assert_eq!(report.skipped_filters[0].source_name, "Cam");
        assert_eq!(report.skipped_filters[0].filter_name, "Green");
    }

    #[test]
    fn test_import_resolves_placeholders() {
        let dest = PathBuf::from("/collections/Show");
        let mut devices = BTreeMap::new();
        devices.insert("u1".to_string(), json!({"video_device_id": "cam-2"}));
        let audio = json!({"device_id": "default"});

        let mut doc = json!({
            "name": "Old",
            "sources": [
                {"id": "dshow_input", "settings": "{u1}"},
                {"id": "v4l2_input", "settings": "{u2}"},
                {"id": "wasapi_input_capture", "settings": AUDIO_SETTINGS_PLACEHOLDER},
                {"id": "image_source", "settings": {"file": "{FILE}:Assets/images/logo.png"}}
            ]
        });
        let report = ImportRewriter::new(&dest, &devices)
            .with_audio_settings(Some(&audio))
            .with_collection_name("Show")
            .rewrite(&mut doc);

        assert_eq!(doc["name"], "Show");
        assert_eq!(doc["sources"][0]["settings"]["video_device_id"], "cam-2");
        assert_eq!(doc["sources"][1]["settings"], json!({}));
        assert_eq!(doc["sources"][2]["settings"]["device_id"], "default");
        let expected = dest.join("Assets").join("images").join("logo.png");
        assert_eq!(
            doc["sources"][3]["settings"]["file"],
            expected.to_string_lossy().into_owned()
        );
        assert_eq!(report.unresolved_placeholders, vec!["u2".to_string()]);
        assert_eq!(report.resolved_files, 1);
        assert_eq!(report.resolved_devices, 2);
    }

    #[test]
    fn test_import_substitution_is_exact() {
        let devices = BTreeMap::new();
        let mut doc = json!({
            "sources": [{"settings": {"text": "literal {FILE}:Assets/a.png inside", "label": "{u1} suffix"}}]
        });
        let before = doc.clone();
        ImportRewriter::new(Path::new("/dest"), &devices).rewrite(&mut doc);
        assert_eq!(doc, before);
    }

    #[test]
    fn test_import_rejects_unsafe_portable_paths() {
        let devices = BTreeMap::new();
        let mut doc = json!({
            "sources": [
                {"settings": {"file": "{FILE}:../../etc/passwd"}},
                {"settings": {"file": "{FILE}:/abs/path.png"}},
                {"settings": {"file": "{FILE}:Assets//double.png"}}
            ]
        });
        let before = doc.clone();
        let report = ImportRewriter::new(Path::new("/dest"), &devices).rewrite(&mut doc);
        assert_eq!(doc, before);
        assert_eq!(report.rejected_paths.len(), 3);
    }

    #[test]
    fn test_portable_to_relative() {
        assert_eq!(
            portable_to_relative("Assets/misc/overlay/index.html"),
            Some(PathBuf::from("Assets/misc/overlay/index.html"))
        );
        assert_eq!(portable_to_relative(""), None);
        assert_eq!(portable_to_relative("C:/x"), None);
        assert_eq!(portable_to_relative("a/./b"), None);
    }
}
