//! No-mock archive integration tests.
//!
//! Exercises real archive creation and extraction on disk:
//! - Byte-identical extraction of files, blobs, and empty directories
//! - Cancellation at every entry boundary leaves no output behind
//! - Overall progress is non-decreasing and ends at exactly 1.0
//! - Entries that would escape the destination are refused
//! - A missing source file aborts before any output exists

use sb_archive::{ArchiveError, ArchiveReader, ArchiveWriter, IoContext};
use sb_common::{CancelReason, CancelToken, FnEmitter, NullEmitter, ProgressEmitter, ProgressEvent};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

// ============================================================================
// Helpers
// ============================================================================

/// Create a few source files of varied size under `root`.
fn make_sources(root: &Path) -> Vec<(String, PathBuf, Vec<u8>)> {
    let specs: [(&str, &str, usize); 4] = [
        ("Assets/images/logo.png", "logo.png", 3_000),
        ("Assets/video/intro.mp4", "intro.mp4", 70_000),
        ("Assets/audio/empty.wav", "empty.wav", 0),
        ("Assets/misc/overlay/index.html", "index.html", 517),
    ];
    specs
        .iter()
        .map(|(name, file, len)| {
            let data: Vec<u8> = (0..*len).map(|i| (i * 31 % 256) as u8).collect();
            let path = root.join(file);
            std::fs::write(&path, &data).unwrap();
            (name.to_string(), path, data)
        })
        .collect()
}

fn build_writer(sources: &[(String, PathBuf, Vec<u8>)]) -> ArchiveWriter {
    let mut writer = ArchiveWriter::new().with_chunk_size(4096);
    writer
        .add_bytes("collection.json", br#"{"name":"Show","sources":[]}"#.to_vec())
        .unwrap();
    for (name, path, _) in sources {
        writer.add_file(name.clone(), path).unwrap();
    }
    writer.add_directory("Assets/shaders").unwrap();
    writer
}

fn recording_emitter() -> (Arc<Mutex<Vec<ProgressEvent>>>, Arc<dyn ProgressEmitter>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let emitter: Arc<dyn ProgressEmitter> =
        Arc::new(FnEmitter(move |e: ProgressEvent| sink.lock().unwrap().push(e)));
    (events, emitter)
}

fn dir_is_empty(dir: &Path) -> bool {
    std::fs::read_dir(dir).unwrap().next().is_none()
}

// ============================================================================
// Fidelity
// ============================================================================

#[test]
fn test_roundtrip_is_byte_identical() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let sources = make_sources(src.path());
    let archive = out.path().join("show.scenebundle");

    let summary = build_writer(&sources)
        .write(&archive, &IoContext::default())
        .unwrap();
    assert_eq!(summary.entries, sources.len() + 2);

    let dest = out.path().join("extracted");
    let mut reader = ArchiveReader::open(&archive).unwrap().with_chunk_size(1000);
    let extracted = reader.extract_all(&dest, &IoContext::default()).unwrap();
    assert_eq!(extracted.entries, sources.len() + 1);
    assert_eq!(extracted.directories, 1);

    for (name, _, data) in &sources {
        let on_disk = std::fs::read(dest.join(name)).unwrap();
        assert_eq!(&on_disk, data, "content mismatch for {}", name);
    }
    assert!(dest.join("Assets/shaders").is_dir());
    assert_eq!(
        std::fs::read_to_string(dest.join("collection.json")).unwrap(),
        r#"{"name":"Show","sources":[]}"#
    );
}

// ============================================================================
// Cancellation
// ============================================================================

#[test]
fn test_cancel_at_every_entry_boundary_leaves_nothing() {
    let src = TempDir::new().unwrap();
    let sources = make_sources(src.path());
    let total_entries = build_writer(&sources).entry_count();

    for k in 0..=total_entries {
        let out = TempDir::new().unwrap();
        let archive = out.path().join("show.scenebundle");
        let cancel = CancelToken::new();
        if k == 0 {
            cancel.cancel();
        }

        let finished = Arc::new(AtomicUsize::new(0));
        let counter = finished.clone();
        let trigger = cancel.clone();
        let emitter: Arc<dyn ProgressEmitter> = Arc::new(FnEmitter(move |e: ProgressEvent| {
            if let ProgressEvent::File { fraction, .. } = e {
                if fraction >= 1.0 && counter.fetch_add(1, Ordering::SeqCst) + 1 == k {
                    trigger.cancel();
                }
            }
        }));

        let result = build_writer(&sources).write(&archive, &IoContext::new(cancel, emitter));

        assert!(
            matches!(result, Err(ArchiveError::Cancelled(CancelReason::Cancelled))),
            "k={} expected cancellation, got {:?}",
            k,
            result.map(|s| s.entries)
        );
        assert!(!archive.exists(), "k={} left an archive behind", k);
        assert!(dir_is_empty(out.path()), "k={} left a temp file behind", k);
    }
}

#[test]
fn test_caller_destroyed_is_distinct_from_cancel() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let sources = make_sources(src.path());
    let cancel = CancelToken::new();
    cancel.mark_caller_destroyed();

    let result = build_writer(&sources).write(
        &out.path().join("show.scenebundle"),
        &IoContext::new(cancel, Arc::new(NullEmitter)),
    );
    assert!(matches!(
        result,
        Err(ArchiveError::Cancelled(CancelReason::CallerDestroyed))
    ));
}

#[test]
fn test_cancelled_extraction_removes_partial_file() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let sources = make_sources(src.path());
    let archive = out.path().join("show.scenebundle");
    build_writer(&sources)
        .write(&archive, &IoContext::default())
        .unwrap();

    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    // Cancel partway through the large video entry
    let emitter: Arc<dyn ProgressEmitter> = Arc::new(FnEmitter(move |e: ProgressEvent| {
        if let ProgressEvent::File { name, fraction } = e {
            if name.ends_with("intro.mp4") && fraction > 0.1 {
                trigger.cancel();
            }
        }
    }));

    let dest = out.path().join("extracted");
    let mut reader = ArchiveReader::open(&archive).unwrap().with_chunk_size(4096);
    let result = reader.extract_all(&dest, &IoContext::new(cancel, emitter));

    assert!(matches!(result, Err(ArchiveError::Cancelled(_))));
    assert!(!dest.join("Assets/video/intro.mp4").exists());
}

// ============================================================================
// Progress
// ============================================================================

#[test]
fn test_progress_monotonic_and_complete() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let sources = make_sources(src.path());
    let (events, emitter) = recording_emitter();

    build_writer(&sources)
        .write(
            &out.path().join("show.scenebundle"),
            &IoContext::new(CancelToken::new(), emitter),
        )
        .unwrap();

    let events = events.lock().unwrap();
    let overall: Vec<f64> = events
        .iter()
        .filter(|e| matches!(e, ProgressEvent::Overall { .. }))
        .map(ProgressEvent::fraction)
        .collect();
    assert!(!overall.is_empty());
    assert!(overall.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(*overall.last().unwrap(), 1.0);

    // Every entry reaches a file fraction of 1.0 exactly once
    let completed: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            ProgressEvent::File { name, fraction } if *fraction >= 1.0 => Some(name.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(completed.len(), sources.len() + 2);
    assert!(completed.contains(&"Assets/audio/empty.wav"));
    assert!(completed.contains(&"Assets/shaders/"));
}

#[test]
fn test_extract_progress_ends_at_one() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let sources = make_sources(src.path());
    let archive = out.path().join("show.scenebundle");
    build_writer(&sources)
        .write(&archive, &IoContext::default())
        .unwrap();

    let (events, emitter) = recording_emitter();
    let mut reader = ArchiveReader::open(&archive).unwrap();
    reader
        .extract_all(
            &out.path().join("extracted"),
            &IoContext::new(CancelToken::new(), emitter),
        )
        .unwrap();

    let events = events.lock().unwrap();
    let last = events.last().unwrap();
    assert_eq!(last, &ProgressEvent::overall(1.0));
}

// ============================================================================
// Safety
// ============================================================================

#[test]
fn test_zip_slip_entry_is_refused() {
    use std::io::Write;
    use zip::write::{FileOptions, ZipWriter};

    let out = TempDir::new().unwrap();
    let archive = out.path().join("evil.scenebundle");
    {
        let file = std::fs::File::create(&archive).unwrap();
        let mut zip = ZipWriter::new(file);
        let options: FileOptions<'_, ()> = FileOptions::default();
        zip.start_file("collection.json", options).unwrap();
        zip.write_all(b"{}").unwrap();
        zip.start_file("../evil.txt", options).unwrap();
        zip.write_all(b"pwned").unwrap();
        zip.finish().unwrap();
    }

    let dest = out.path().join("nested").join("extracted");
    let mut reader = ArchiveReader::open(&archive).unwrap();
    let result = reader.extract_all(&dest, &IoContext::default());

    assert!(matches!(result, Err(ArchiveError::UnsafeEntryName(_))));
    assert!(!out.path().join("nested").join("evil.txt").exists());
    // Names are checked before anything is written
    assert!(!dest.join("collection.json").exists());
}

#[test]
fn test_missing_source_produces_no_output() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let sources = make_sources(src.path());
    let mut writer = build_writer(&sources);
    writer
        .add_file("Assets/images/deleted.png", src.path().join("deleted.png"))
        .unwrap();

    let archive = out.path().join("show.scenebundle");
    let result = writer.write(&archive, &IoContext::default());

    match result {
        Err(ArchiveError::SourceFile { path, .. }) => {
            assert!(path.ends_with("deleted.png"));
        }
        other => panic!("expected SourceFile error, got {:?}", other.map(|s| s.entries)),
    }
    assert!(dir_is_empty(out.path()));
}

#[test]
fn test_write_replaces_existing_archive() {
    let out = TempDir::new().unwrap();
    let archive = out.path().join("show.scenebundle");
    std::fs::write(&archive, b"stale").unwrap();

    let mut writer = ArchiveWriter::new();
    writer.add_bytes("collection.json", b"{}".to_vec()).unwrap();
    writer.write(&archive, &IoContext::default()).unwrap();

    let reader = ArchiveReader::open(&archive).unwrap();
    assert_eq!(reader.entry_names(), vec!["collection.json"]);
}
