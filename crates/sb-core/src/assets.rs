//! Asset path deduplication.
//!
//! Every media file (or browser-source directory) referenced by a collection
//! is given a portable path under `Assets/<class>/`. The mapping is stable for
//! one export: resolving the same source twice yields the same portable path,
//! and two different sources never share one. Collisions are detected
//! case-insensitively so bundles extract cleanly on case-insensitive
//! filesystems.

use sb_archive::ASSETS_DIR;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

/// Asset directory a file is placed in, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    Images,
    Video,
    Audio,
    Shaders,
    Scripts,
    Misc,
}

impl AssetClass {
    /// Classify by extension (case-insensitive).
    pub fn from_path(path: &str) -> Self {
        let (_, ext) = split_extension(file_name(path));
        let ext = ext.map(str::to_ascii_lowercase).unwrap_or_default();
        match ext.as_str() {
            "png" | "jpg" | "jpeg" | "gif" | "bmp" | "tga" | "webp" | "svg" => AssetClass::Images,
            "mp4" | "mov" | "mkv" | "webm" | "avi" | "flv" | "m4v" | "ts" => AssetClass::Video,
            "wav" | "mp3" | "ogg" | "flac" | "aac" | "m4a" | "opus" => AssetClass::Audio,
            "shader" | "effect" | "hlsl" | "glsl" => AssetClass::Shaders,
            "lua" | "py" => AssetClass::Scripts,
            _ => AssetClass::Misc,
        }
    }

    pub fn dir_name(self) -> &'static str {
        match self {
            AssetClass::Images => "images",
            AssetClass::Video => "video",
            AssetClass::Audio => "audio",
            AssetClass::Shaders => "shaders",
            AssetClass::Scripts => "scripts",
            AssetClass::Misc => "misc",
        }
    }
}

impl std::fmt::Display for AssetClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Whether a mapping packages one file or the files directly inside a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    File,
    Directory,
}

/// One source path and the portable path it was assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetMapping {
    pub source: PathBuf,
    pub portable: String,
    pub kind: AssetKind,
}

/// Assigns collision-free portable paths to referenced assets.
#[derive(Debug, Default)]
pub struct AssetDeduplicator {
    by_source: HashMap<String, usize>,
    claimed: HashSet<String>,
    mappings: Vec<AssetMapping>,
}

impl AssetDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Portable path for a referenced file. Idempotent per source path.
    pub fn resolve(&mut self, path: &str) -> String {
        let normalized = path.replace('\\', "/");
        if let Some(&index) = self.by_source.get(&normalized) {
            return self.mappings[index].portable.clone();
        }

        let class = AssetClass::from_path(&normalized);
        let name = match file_name(&normalized) {
            "" => "asset",
            name => name,
        };
        let prefix = format!("{}/{}", ASSETS_DIR, class.dir_name());
        let portable = self.claim(&prefix, name);
        self.record(normalized, path, portable, AssetKind::File)
    }

    /// Portable path for a referenced directory (browser-source root),
    /// always under `Assets/misc/`. Shares one namespace with files.
    pub fn resolve_directory(&mut self, dir: &str) -> String {
        let normalized = dir.replace('\\', "/");
        let trimmed = normalized.trim_end_matches('/').to_string();
        if let Some(&index) = self.by_source.get(&trimmed) {
            return self.mappings[index].portable.clone();
        }

        let name = match file_name(&trimmed) {
            "" => "folder",
            name => name,
        };
        let prefix = format!("{}/{}", ASSETS_DIR, AssetClass::Misc.dir_name());
        let portable = self.claim_exact_stem(&prefix, name);
        self.record(trimmed, dir.trim_end_matches(['/', '\\']), portable, AssetKind::Directory)
    }

    /// Previously assigned portable path, if any.
    pub fn lookup(&self, path: &str) -> Option<&str> {
        let normalized = path.replace('\\', "/");
        self.by_source
            .get(normalized.trim_end_matches('/'))
            .map(|&index| self.mappings[index].portable.as_str())
    }

    /// Forget every mapping. Called at the start of each export.
    pub fn reset(&mut self) {
        self.by_source.clear();
        self.claimed.clear();
        self.mappings.clear();
    }

    /// Mappings in the order they were first resolved.
    pub fn mappings(&self) -> &[AssetMapping] {
        &self.mappings
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    fn record(&mut self, key: String, source: &str, portable: String, kind: AssetKind) -> String {
        self.claimed.insert(portable.to_lowercase());
        self.by_source.insert(key, self.mappings.len());
        self.mappings.push(AssetMapping {
            source: PathBuf::from(source),
            portable: portable.clone(),
            kind,
        });
        portable
    }

    /// First free `<prefix>/<stem>[_n].<ext>`.
    fn claim(&self, prefix: &str, name: &str) -> String {
        let (stem, ext) = split_extension(name);
        let build = |suffix: Option<u32>| {
            let mut candidate = format!("{}/{}", prefix, stem);
            if let Some(n) = suffix {
                candidate.push_str(&format!("_{}", n));
            }
            if let Some(ext) = ext {
                candidate.push('.');
                candidate.push_str(ext);
            }
            candidate
        };
        self.first_free(build)
    }

    /// Directories keep dots in their names, suffix goes at the end.
    fn claim_exact_stem(&self, prefix: &str, name: &str) -> String {
        self.first_free(|suffix| match suffix {
            None => format!("{}/{}", prefix, name),
            Some(n) => format!("{}/{}_{}", prefix, name, n),
        })
    }

    fn first_free(&self, build: impl Fn(Option<u32>) -> String) -> String {
        let candidate = build(None);
        if !self.claimed.contains(&candidate.to_lowercase()) {
            return candidate;
        }
        (1..)
            .map(|n| build(Some(n)))
            .find(|c| !self.claimed.contains(&c.to_lowercase()))
            .unwrap_or(candidate)
    }
}

/// Last `/`-separated segment.
fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Split `name.ext` at the last dot. Leading-dot names have no extension.
fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(0) | None => (name, None),
        Some(i) => (&name[..i], Some(&name[i + 1..])),
    }
}
