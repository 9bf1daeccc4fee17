//! Fuzz target for config.json parsing and validation.
//!
//! Tests that configuration parsing handles arbitrary input without
//! panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use sb_config::{validate_config, BundleConfig};

fuzz_target!(|data: &[u8]| {
    // Should never panic, only return an error
    if let Ok(config) = serde_json::from_slice::<BundleConfig>(data) {
        let _ = validate_config(&config);
    }
});
