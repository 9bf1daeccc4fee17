//! Removal of filters that cannot travel between machines.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;

/// Filter ids stripped from every export.
///
/// These wrap machine-local plugins or vendor SDKs (VST hosts, NVIDIA
/// effects) whose settings are meaningless on another system.
pub const BUILTIN_INCOMPATIBLE_FILTERS: &[&str] = &[
    "vst_filter",
    "nv_greenscreen_filter",
    "nv_audiofx_filter",
    "nvidia_audiofx_filter",
    "nv_denoiser_filter",
];

/// A filter removed during export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFilterRecord {
    pub source_name: String,
    pub filter_name: String,
}

/// Drops incompatible filter objects from `filters` arrays.
#[derive(Debug, Clone)]
pub struct FilterCompatibilityFilter {
    incompatible: HashSet<String>,
}

impl Default for FilterCompatibilityFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterCompatibilityFilter {
    pub fn new() -> Self {
        Self {
            incompatible: BUILTIN_INCOMPATIBLE_FILTERS
                .iter()
                .map(|id| id.to_string())
                .collect(),
        }
    }

    /// Add configured ids on top of the built-in set.
    pub fn with_extra<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.incompatible.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn is_incompatible(&self, id: &str) -> bool {
        self.incompatible.contains(id)
    }

    /// Remove incompatible filters in place, keeping the order of the rest,
    /// and record each removal against `source_name`.
    pub fn filter(
        &self,
        source_name: &str,
        filters: &mut Vec<Value>,
        skipped: &mut Vec<SkippedFilterRecord>,
    ) {
        filters.retain(|filter| {
            let id = filter.get("id").and_then(Value::as_str).unwrap_or_default();
            if !self.is_incompatible(id) {
                return true;
            }
            let filter_name = filter
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or(id)
                .to_string();
            debug!(source = source_name, filter = %filter_name, id, "Skipping incompatible filter");
            skipped.push(SkippedFilterRecord {
                source_name: source_name.to_string(),
                filter_name,
            });
            false
        });
    }
}
