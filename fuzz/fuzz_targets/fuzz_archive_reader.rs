//! Fuzz target for scene bundle reading.
//!
//! Bundles come from other machines, so opening, listing, reading the
//! manifest, and extracting must never panic or write outside the
//! destination directory.

#![no_main]

use libfuzzer_sys::fuzz_target;
use sb_archive::{ArchiveReader, IoContext};

fuzz_target!(|data: &[u8]| {
    let Ok(mut reader) = ArchiveReader::from_bytes(data.to_vec()) else {
        return;
    };
    let _ = reader.entry_names();
    let _ = reader.read_manifest();

    let Ok(dir) = tempfile::tempdir() else {
        return;
    };
    let dest = dir.path().join("out");
    if std::fs::create_dir(&dest).is_err() {
        return;
    }
    let _ = reader.extract_all(&dest, &IoContext::default());

    // Nothing may land beside the destination
    let siblings: Vec<_> = std::fs::read_dir(dir.path())
        .map(|rd| rd.filter_map(Result::ok).map(|e| e.file_name()).collect())
        .unwrap_or_default();
    assert_eq!(siblings, vec![std::ffi::OsString::from("out")]);
});
