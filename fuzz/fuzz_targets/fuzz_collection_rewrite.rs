//! Fuzz target for collection document rewriting.
//!
//! Runs arbitrary JSON through the import rewriter: placeholder resolution
//! must never panic, and every resolved `{FILE}:` reference must stay under
//! the destination directory.

#![no_main]

use libfuzzer_sys::fuzz_target;
use sb_core::rewrite::ImportRewriter;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

fn check_paths(value: &Value, dest: &Path) {
    match value {
        Value::String(s) => {
            let path = Path::new(s);
            if path.starts_with(dest) {
                assert!(path
                    .components()
                    .all(|c| !matches!(c, std::path::Component::ParentDir)));
            }
        }
        Value::Array(items) => items.iter().for_each(|v| check_paths(v, dest)),
        Value::Object(map) => map.values().for_each(|v| check_paths(v, dest)),
        _ => {}
    }
}

fuzz_target!(|data: &[u8]| {
    let Ok(mut document) = serde_json::from_slice::<Value>(data) else {
        return;
    };
    let dest = Path::new("/bundle/dest");
    // Only paths the rewriter produced are checked
    if document.to_string().contains("/bundle/dest") {
        return;
    }
    let devices = BTreeMap::new();
    let _ = ImportRewriter::new(dest, &devices)
        .with_collection_name("Fuzzed")
        .rewrite(&mut document);
    check_paths(&document, dest);
});
