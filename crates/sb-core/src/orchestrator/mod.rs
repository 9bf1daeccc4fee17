//! Export and import pipelines.
//!
//! A [`BundleOrchestrator`] owns one host, one filesystem, and one
//! configuration. It runs at most one export or import at a time; the run
//! itself is synchronous and is usually driven from a
//! [`BundleWorker`](crate::worker::BundleWorker) thread.

mod request;

pub use request::{ExportReport, ExportRequest, ExportState, ImportReport, ImportRequest, ImportState};

use crate::assets::{AssetDeduplicator, AssetKind, AssetMapping};
use crate::filters::FilterCompatibilityFilter;
use crate::handshake::CollectionHandshake;
use crate::host::{validate_collection_name, FileSystem, SceneHost};
use crate::logging::{event_names, generate_run_id, LogContext, Stage};
use crate::rewrite::{ExportRewriter, ImportRewriter};
use parking_lot::Mutex;
use sb_archive::{
    ArchiveError, ArchiveReader, ArchiveWriter, BundleManifest, CompressionMethod, IoContext,
    COLLECTION_FILE_NAME, MANIFEST_FILE_NAME,
};
use sb_common::{CancelToken, Error, NullEmitter, OperationResult, ProgressEmitter, Result};
use sb_config::{BundleConfig, Compression};
use serde_json::Value;
use std::fs::File;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Tool name recorded in exported manifests.
const GENERATOR: &str = concat!("sb-core ", env!("CARGO_PKG_VERSION"));

/// Runs exports and imports against one host.
pub struct BundleOrchestrator {
    host: Arc<dyn SceneHost>,
    fs: Arc<dyn FileSystem>,
    config: BundleConfig,
    emitter: Arc<dyn ProgressEmitter>,
    filters: FilterCompatibilityFilter,
    assets: Mutex<AssetDeduplicator>,
    busy: AtomicBool,
    export_state: Mutex<ExportState>,
    import_state: Mutex<ImportState>,
}

/// Clears the busy flag when a run ends, however it ends.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl BundleOrchestrator {
    pub fn new(host: Arc<dyn SceneHost>, fs: Arc<dyn FileSystem>, config: BundleConfig) -> Self {
        let filters = FilterCompatibilityFilter::new()
            .with_extra(config.extra_incompatible_filters.iter().cloned());
        Self {
            host,
            fs,
            config,
            emitter: Arc::new(NullEmitter),
            filters,
            assets: Mutex::new(AssetDeduplicator::new()),
            busy: AtomicBool::new(false),
            export_state: Mutex::new(ExportState::Idle),
            import_state: Mutex::new(ImportState::Idle),
        }
    }

    /// Receive progress for every subsequent run.
    pub fn with_emitter(mut self, emitter: Arc<dyn ProgressEmitter>) -> Self {
        self.emitter = emitter;
        self
    }

    pub fn config(&self) -> &BundleConfig {
        &self.config
    }

    pub fn export_state(&self) -> ExportState {
        *self.export_state.lock()
    }

    pub fn import_state(&self) -> ImportState {
        *self.import_state.lock()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Asset mappings recorded by the most recent export.
    pub fn asset_mappings(&self) -> Vec<AssetMapping> {
        self.assets.lock().mappings().to_vec()
    }

    fn acquire(&self) -> Result<RunGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::Busy)?;
        Ok(RunGuard(&self.busy))
    }

    fn io_context(&self, cancel: &CancelToken) -> IoContext {
        IoContext::new(cancel.clone(), self.emitter.clone())
    }

    // ------------------------------------------------------------------
    // Export
    // ------------------------------------------------------------------

    /// Package the host's active collection into `request.output`.
    pub fn export(&self, request: &ExportRequest, cancel: &CancelToken) -> Result<ExportReport> {
        let _guard = self.acquire()?;
        let log = LogContext::new(generate_run_id());

        let result = self.run_export(request, cancel, &log);
        let state = match &result {
            Ok(_) => ExportState::Done,
            Err(e) if e.is_interruption() => ExportState::Cancelled,
            Err(_) => ExportState::Error,
        };
        *self.export_state.lock() = state;

        if let Err(e) = &result {
            crate::log_event!(
                log,
                WARN,
                event_names::EXPORT_FAILED,
                Stage::Package,
                "Export failed",
                error = %e,
                code = e.code(),
                result = %OperationResult::from(e)
            );
        }
        result
    }

    fn run_export(
        &self,
        request: &ExportRequest,
        cancel: &CancelToken,
        log: &LogContext,
    ) -> Result<ExportReport> {
        *self.export_state.lock() = ExportState::Collecting;
        let mut assets = self.assets.lock();
        assets.reset();

        let current = self.host.current_collection()?;
        let log = log.clone().with_collection(current.clone());
        crate::log_event!(
            log,
            INFO,
            event_names::EXPORT_STARTED,
            Stage::Collect,
            "Starting export",
            output = %request.output.display()
        );

        let text = self.host.read_collection(&current)?;
        let mut document: Value = serde_json::from_str(&text)
            .map_err(|e| Error::Parse(format!("collection '{}': {}", current, e)))?;
        let (canvas_width, canvas_height) = self.host.canvas_size()?;
        crate::log_event!(
            log,
            DEBUG,
            event_names::EXPORT_COLLECTED,
            Stage::Collect,
            "Collection loaded",
            bytes = text.len(),
            canvas_width = canvas_width,
            canvas_height = canvas_height
        );
        cancel.check()?;

        *self.export_state.lock() = ExportState::Rewriting;
        let rewrite = ExportRewriter::new(&mut assets, &self.filters, self.fs.as_ref())
            .rewrite(&mut document);
        for skipped in &rewrite.skipped_filters {
            crate::log_event!(
                log,
                INFO,
                event_names::EXPORT_REWRITTEN,
                Stage::Rewrite,
                "Skipped incompatible filter",
                source = %skipped.source_name,
                filter = %skipped.filter_name
            );
        }

        let mut manifest = BundleManifest::new(canvas_width, canvas_height)
            .with_collection_name(current.clone())
            .with_generator(GENERATOR);
        if let Some(id) = &request.bundle_id {
            manifest = manifest.with_bundle_id(id.clone());
        }
        if let Some(version) = &request.version {
            manifest = manifest.with_version(version.clone());
        }
        for plugin in &request.required_plugins {
            manifest.add_required_plugin(plugin.clone());
        }
        for link in &request.requirements {
            manifest.add_requirement(link.clone());
        }
        manifest.output_scenes = request.output_scenes.clone();
        for device in &rewrite.video_devices {
            let label = request
                .video_labels
                .get(&device.uuid)
                .or_else(|| request.video_labels.get(&device.name))
                .cloned()
                .unwrap_or_else(|| device.name.clone());
            manifest.describe_video_device(device.uuid.clone(), label);
        }
        for path in &request.stream_deck_assets {
            if !self.fs.is_file(path) {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("stream deck asset not found: {}", path.display()),
                )));
            }
            let portable = assets.resolve(&path.to_string_lossy());
            manifest.stream_deck_assets.push(portable);
        }
        manifest.validate()?;

        crate::log_event!(
            log,
            INFO,
            event_names::EXPORT_REWRITTEN,
            Stage::Rewrite,
            "Collection rewritten",
            assets = assets.len(),
            file_references = rewrite.file_references,
            video_devices = rewrite.video_devices.len(),
            audio_devices = rewrite.audio_devices,
            skipped_filters = rewrite.skipped_filters.len()
        );
        cancel.check()?;

        *self.export_state.lock() = ExportState::Packaging;
        let mut writer = ArchiveWriter::new()
            .with_chunk_size(self.config.chunk_size)
            .with_compression(compression_method(self.config.compression));
        writer.add_json(MANIFEST_FILE_NAME, &manifest)?;
        writer.add_json(COLLECTION_FILE_NAME, &document)?;
        for mapping in assets.mappings() {
            self.enqueue_asset(&mut writer, mapping)?;
        }

        let summary = writer.write(&request.output, &self.io_context(cancel))?;
        crate::log_event!(
            log,
            INFO,
            event_names::EXPORT_PACKAGED,
            Stage::Package,
            "Archive written",
            path = %summary.path.display(),
            entries = summary.entries,
            bytes = summary.bytes
        );

        Ok(ExportReport {
            archive: summary.path,
            collection_name: current,
            bundle_id: manifest.bundle_id,
            assets: assets.len(),
            entries: summary.entries,
            bytes: summary.bytes,
            skipped_filters: rewrite.skipped_filters,
            video_devices: rewrite.video_devices,
        })
    }

    /// Queue one relocated asset. Directories contribute the regular files
    /// directly beneath them; an empty directory is kept as a marker.
    fn enqueue_asset(&self, writer: &mut ArchiveWriter, mapping: &AssetMapping) -> Result<()> {
        match mapping.kind {
            AssetKind::File => writer.add_file(mapping.portable.clone(), mapping.source.clone())?,
            AssetKind::Directory => {
                let files = self.fs.list_files(&mapping.source, false)?;
                if files.is_empty() {
                    writer.add_directory(mapping.portable.clone())?;
                }
                for file in files {
                    let Some(file_name) = file.file_name() else {
                        continue;
                    };
                    let name = format!("{}/{}", mapping.portable, file_name.to_string_lossy());
                    writer.add_file(name, file)?;
                }
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Import
    // ------------------------------------------------------------------

    /// Install the bundle at `request.archive` as a new host collection.
    pub fn import(&self, request: &ImportRequest, cancel: &CancelToken) -> Result<ImportReport> {
        let _guard = self.acquire()?;
        let log = LogContext::new(generate_run_id()).with_collection(request.collection_name.clone());

        let result = self.run_import(request, cancel, &log);
        let state = match &result {
            Ok(_) => ImportState::Done,
            Err(e) if e.is_interruption() => ImportState::Cancelled,
            Err(_) => ImportState::Error,
        };
        *self.import_state.lock() = state;

        if let Err(e) = &result {
            crate::log_event!(
                log,
                WARN,
                event_names::IMPORT_FAILED,
                Stage::Extract,
                "Import failed",
                error = %e,
                code = e.code(),
                result = %OperationResult::from(e)
            );
        }
        result
    }

    fn run_import(
        &self,
        request: &ImportRequest,
        cancel: &CancelToken,
        log: &LogContext,
    ) -> Result<ImportReport> {
        *self.import_state.lock() = ImportState::Extracting;
        validate_collection_name(&request.collection_name)?;
        crate::log_event!(
            log,
            INFO,
            event_names::IMPORT_STARTED,
            Stage::Extract,
            "Starting import",
            archive = %request.archive.display()
        );

        let mut reader = open_bundle(&request.archive)?.with_chunk_size(self.config.chunk_size);
        for required in [MANIFEST_FILE_NAME, COLLECTION_FILE_NAME] {
            if !reader.contains(required) {
                return Err(Error::InvalidBundle(format!("archive has no {}", required)));
            }
        }
        let manifest = reader.read_manifest()?;
        let text = reader
            .read_string(COLLECTION_FILE_NAME)
            .map_err(|e| match e {
                ArchiveError::InvalidUtf8(name) => {
                    Error::InvalidBundle(format!("{} is not valid UTF-8", name))
                }
                other => other.into(),
            })?;
        let mut document: Value = serde_json::from_str(&text)
            .map_err(|e| Error::InvalidBundle(format!("{}: {}", COLLECTION_FILE_NAME, e)))?;

        let existing = self.host.collection_names()?;
        let name = unique_collection_name(&existing, request.collection_name.trim());
        let log = log.clone().with_collection(name.clone());

        let destination = request
            .destination
            .clone()
            .unwrap_or_else(|| self.config.assets_root.join(&name));
        self.fs.create_dir_all(&destination)?;
        self.fs.remove_dir_contents(&destination)?;

        let summary = match reader.extract_all(&destination, &self.io_context(cancel)) {
            Ok(summary) => summary,
            Err(e) => {
                if let Err(cleanup) = self.fs.remove_dir_contents(&destination) {
                    tracing::warn!(
                        dir = %destination.display(),
                        error = %cleanup,
                        "Failed to clean destination after aborted extraction"
                    );
                }
                return Err(e.into());
            }
        };
        crate::log_event!(
            log,
            INFO,
            event_names::IMPORT_EXTRACTED,
            Stage::Extract,
            "Bundle extracted",
            destination = %destination.display(),
            entries = summary.entries,
            bytes = summary.bytes
        );

        *self.import_state.lock() = ImportState::Rewriting;
        let rewrite = ImportRewriter::new(&destination, &request.device_settings)
            .with_audio_settings(request.audio_settings.as_ref())
            .with_collection_name(&name)
            .rewrite(&mut document);
        for placeholder in &rewrite.unresolved_placeholders {
            crate::log_event!(
                log,
                WARN,
                event_names::IMPORT_REWRITTEN,
                Stage::Rewrite,
                "No settings supplied for device placeholder",
                placeholder = %placeholder
            );
        }
        for path in &rewrite.rejected_paths {
            crate::log_event!(
                log,
                WARN,
                event_names::IMPORT_REWRITTEN,
                Stage::Rewrite,
                "Left unsafe asset reference untouched",
                path = %path
            );
        }
        crate::log_event!(
            log,
            INFO,
            event_names::IMPORT_REWRITTEN,
            Stage::Rewrite,
            "Collection rewritten",
            files = rewrite.resolved_files,
            devices = rewrite.resolved_devices
        );
        // Last point at which cancellation leaves the host untouched.
        cancel.check()?;

        *self.import_state.lock() = ImportState::SwitchingCollection;
        let bytes = serde_json::to_vec_pretty(&document)?;
        let prior = self.host.current_collection()?;
        CollectionHandshake::new(
            self.host.as_ref(),
            self.fs.as_ref(),
            self.config.handshake_timeout(),
        )
        .with_log_context(log.clone())
        .install(&prior, &name, &bytes, &self.config.backup_dir)?;

        crate::log_event!(
            log,
            INFO,
            event_names::IMPORT_FINISHED,
            Stage::Handshake,
            "Collection installed",
            prior = %prior
        );

        Ok(ImportReport {
            collection_name: name,
            destination,
            entries: summary.entries,
            bytes: summary.bytes,
            unresolved_placeholders: rewrite.unresolved_placeholders,
            rejected_paths: rewrite.rejected_paths,
            manifest,
        })
    }
}

/// Collapse a run result into the status reported to callers.
pub fn operation_result<T>(result: &Result<T>) -> OperationResult {
    match result {
        Ok(_) => OperationResult::Success,
        Err(e) => OperationResult::from(e),
    }
}

/// `requested`, or `requested (n)` with the smallest n ≥ 2 that no existing
/// collection uses. Comparison ignores ASCII case.
pub fn unique_collection_name(existing: &[String], requested: &str) -> String {
    let taken = |candidate: &str| existing.iter().any(|e| e.eq_ignore_ascii_case(candidate));
    if !taken(requested) {
        return requested.to_string();
    }
    let mut n = 2u32;
    loop {
        let candidate = format!("{} ({})", requested, n);
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Open an archive, reporting anything that is not a readable zip as an
/// invalid bundle.
pub fn open_bundle(path: &Path) -> Result<ArchiveReader<File>> {
    ArchiveReader::open(path).map_err(|e| match e {
        ArchiveError::Zip(zip) => Error::InvalidBundle(format!("{}: {}", path.display(), zip)),
        other => other.into(),
    })
}

fn compression_method(compression: Compression) -> CompressionMethod {
    match compression {
        Compression::Deflated => CompressionMethod::Deflated,
        Compression::Stored => CompressionMethod::Stored,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{DirectoryHost, LocalFs};
    use sb_common::CancelReason;
    use serde_json::json;
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        root: PathBuf,
        host: Arc<DirectoryHost>,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let root = dir.path().to_path_buf();
            let collections = root.join("collections");
            std::fs::create_dir_all(&collections).unwrap();
            let media = root.join("media");
            std::fs::create_dir_all(media.join("overlay")).unwrap();
            std::fs::write(media.join("logo.png"), vec![7u8; 2048]).unwrap();
            std::fs::write(media.join("overlay").join("index.html"), "<html/>").unwrap();
            std::fs::write(media.join("overlay").join("style.css"), "body{}").unwrap();

            let doc = json!({
                "name": "Show",
                "sources": [
                    {"id": "image_source", "name": "Logo", "settings": {
                        "file": media.join("logo.png").to_string_lossy()
                    }, "filters": [
                        {"id": "color_filter", "name": "Tint"},
                        {"id": "nv_greenscreen_filter", "name": "Green"}
                    ]},
                    {"id": "browser_source", "name": "Overlay", "settings": {
                        "local_file": media.join("overlay").join("index.html").to_string_lossy(),
                        "is_local_file": true
                    }},
                    {"id": "dshow_input", "name": "Cam", "uuid": "cam-1", "settings": {"device": "x"}}
                ]
            });
            std::fs::write(
                collections.join("Show.json"),
                serde_json::to_vec_pretty(&doc).unwrap(),
            )
            .unwrap();
            std::fs::write(
                collections.join("host.json"),
                r#"{"current_collection":"Show","canvas_width":1280,"canvas_height":720}"#,
            )
            .unwrap();

            let host = Arc::new(DirectoryHost::open(&collections).unwrap());
            Self {
                _dir: dir,
                root,
                host,
            }
        }

        fn orchestrator(&self) -> BundleOrchestrator {
            let config = BundleConfig::default()
                .with_chunk_size(1024)
                .with_handshake_timeout_secs(5)
                .with_backup_dir(self.root.join("backups"))
                .with_assets_root(self.root.join("assets"));
            BundleOrchestrator::new(self.host.clone(), Arc::new(LocalFs), config)
        }
    }

    #[test]
    fn test_unique_collection_name() {
        let existing = vec!["Show".to_string(), "show (2)".to_string()];
        assert_eq!(unique_collection_name(&existing, "Other"), "Other");
        assert_eq!(unique_collection_name(&existing, "Show"), "Show (3)");
        assert_eq!(unique_collection_name(&existing, "SHOW"), "SHOW (3)");
        assert_eq!(unique_collection_name(&[], "Show"), "Show");
    }

    #[test]
    fn test_operation_result() {
        assert_eq!(operation_result(&Ok(())), OperationResult::Success);
        assert_eq!(
            operation_result::<()>(&Err(Error::CallerDestroyed)),
            OperationResult::CallerDestroyed
        );
        assert_eq!(
            operation_result::<()>(&Err(Error::Busy)),
            OperationResult::Error
        );
    }

    #[test]
    fn test_export_packages_collection_and_assets() {
        let fx = Fixture::new();
        let orchestrator = fx.orchestrator();
        let output = fx.root.join("show.scenebundle");

        let report = orchestrator
            .export(
                &ExportRequest::new(&output)
                    .with_plugin("StreamFX")
                    .with_video_label("cam-1", "Front camera")
                    .with_version("2.1.0"),
                &CancelToken::new(),
            )
            .unwrap();

        assert_eq!(orchestrator.export_state(), ExportState::Done);
        assert_eq!(report.collection_name, "Show");
        assert_eq!(report.assets, 2);
        assert_eq!(report.skipped_filters.len(), 1);
        assert_eq!(report.skipped_filters[0].filter_name, "Green");

        let mut reader = ArchiveReader::open(&output).unwrap();
        let names = reader.entry_names();
        assert!(names.contains(&"Assets/images/logo.png".to_string()));
        assert!(names.contains(&"Assets/misc/overlay/index.html".to_string()));
        assert!(names.contains(&"Assets/misc/overlay/style.css".to_string()));

        let manifest = reader.read_manifest().unwrap();
        assert_eq!((manifest.canvas_width, manifest.canvas_height), (1280, 720));
        assert_eq!(manifest.version, "2.1.0");
        assert_eq!(manifest.required_plugins, vec!["StreamFX"]);
        assert_eq!(
            manifest.video_device_descriptions.get("cam-1").map(String::as_str),
            Some("Front camera")
        );

        let doc: Value = reader.read_json(COLLECTION_FILE_NAME).unwrap();
        assert_eq!(doc["sources"][0]["settings"]["file"], "{FILE}:Assets/images/logo.png");
        assert_eq!(doc["sources"][2]["settings"], "{cam-1}");
    }

    #[test]
    fn test_export_malformed_collection_writes_nothing() {
        let fx = Fixture::new();
        std::fs::write(fx.host.dir().join("Broken.json"), "{ not json").unwrap();
        fx.host.request_switch_collection("Broken").unwrap();
        // Wait for the host loop to process the switch.
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while fx.host.current_collection().unwrap() != "Broken" {
            assert!(std::time::Instant::now() < deadline);
            std::thread::sleep(Duration::from_millis(10));
        }

        let orchestrator = fx.orchestrator();
        let output = fx.root.join("broken.scenebundle");
        let err = orchestrator
            .export(&ExportRequest::new(&output), &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
        assert_eq!(orchestrator.export_state(), ExportState::Error);
        assert!(!output.exists());
    }

    #[test]
    fn test_export_cancelled_before_start() {
        let fx = Fixture::new();
        let orchestrator = fx.orchestrator();
        let output = fx.root.join("show.scenebundle");
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = orchestrator
            .export(&ExportRequest::new(&output), &cancel)
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert_eq!(cancel.reason(), Some(CancelReason::Cancelled));
        assert_eq!(orchestrator.export_state(), ExportState::Cancelled);
        assert!(!output.exists());
        assert!(!orchestrator.is_busy());
    }

    #[test]
    fn test_concurrent_run_is_busy() {
        let fx = Fixture::new();
        let orchestrator = fx.orchestrator();
        let _guard = orchestrator.acquire().unwrap();

        let err = orchestrator
            .export(
                &ExportRequest::new(fx.root.join("x.scenebundle")),
                &CancelToken::new(),
            )
            .unwrap_err();
        assert!(matches!(err, Error::Busy));
    }

    #[test]
    fn test_import_rejects_archive_without_manifest() {
        let fx = Fixture::new();
        let archive = fx.root.join("bare.zip");
        let mut writer = ArchiveWriter::new();
        writer
            .add_bytes(COLLECTION_FILE_NAME, b"{}".to_vec())
            .unwrap();
        writer.write(&archive, &IoContext::default()).unwrap();

        let orchestrator = fx.orchestrator();
        let err = orchestrator
            .import(&ImportRequest::new(&archive, "New"), &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidBundle(_)));
        assert_eq!(operation_result::<()>(&Err(err)), OperationResult::InvalidBundle);
        assert_eq!(fx.host.current_collection().unwrap(), "Show");
    }

    #[test]
    fn test_import_rejects_non_utf8_collection() {
        let fx = Fixture::new();
        let archive = fx.root.join("latin1.zip");
        let mut writer = ArchiveWriter::new();
        writer
            .add_json(MANIFEST_FILE_NAME, &BundleManifest::new(1280, 720))
            .unwrap();
        writer
            .add_bytes(COLLECTION_FILE_NAME, vec![b'{', 0xff, 0xfe, b'}'])
            .unwrap();
        writer.write(&archive, &IoContext::default()).unwrap();

        let result = fx
            .orchestrator()
            .import(&ImportRequest::new(&archive, "New"), &CancelToken::new());
        assert!(
            matches!(result, Err(Error::InvalidBundle(_))),
            "got {:?}",
            result.as_ref().err()
        );
        assert_eq!(operation_result(&result), OperationResult::InvalidBundle);
        assert_eq!(fx.host.current_collection().unwrap(), "Show");
    }

    #[test]
    fn test_import_as_reserved_name_fails_fast() {
        let fx = Fixture::new();
        let orchestrator = fx.orchestrator();
        let output = fx.root.join("show.scenebundle");
        orchestrator
            .export(&ExportRequest::new(&output), &CancelToken::new())
            .unwrap();

        let started = std::time::Instant::now();
        let result =
            orchestrator.import(&ImportRequest::new(&output, "host"), &CancelToken::new());
        assert!(
            matches!(result, Err(Error::Config(_))),
            "got {:?}",
            result.as_ref().err()
        );
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(orchestrator.import_state(), ImportState::Error);
        assert_eq!(fx.host.current_collection().unwrap(), "Show");
        assert_eq!(fx.host.collection_names().unwrap(), vec!["Show"]);
    }

    #[test]
    fn test_import_rejects_non_zip() {
        let fx = Fixture::new();
        let archive = fx.root.join("notes.txt");
        std::fs::write(&archive, "plain text").unwrap();

        let err = fx
            .orchestrator()
            .import(&ImportRequest::new(&archive, "New"), &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidBundle(_)));
    }

    #[test]
    fn test_import_uses_unique_name_and_installs() {
        let fx = Fixture::new();
        let orchestrator = fx.orchestrator();
        let output = fx.root.join("show.scenebundle");
        orchestrator
            .export(&ExportRequest::new(&output), &CancelToken::new())
            .unwrap();

        let report = orchestrator
            .import(
                &ImportRequest::new(&output, "Show")
                    .with_device_settings("cam-1", json!({"device": "new-cam"})),
                &CancelToken::new(),
            )
            .unwrap();

        assert_eq!(report.collection_name, "Show (2)");
        assert_eq!(report.destination, fx.root.join("assets").join("Show (2)"));
        assert!(report.unresolved_placeholders.is_empty());
        assert_eq!(orchestrator.import_state(), ImportState::Done);
        assert_eq!(fx.host.current_collection().unwrap(), "Show (2)");
        assert!(fx.root.join("backups").join("Show.json").is_file());

        let installed: Value =
            serde_json::from_str(&fx.host.read_collection("Show (2)").unwrap()).unwrap();
        assert_eq!(installed["name"], "Show (2)");
        assert_eq!(installed["sources"][2]["settings"]["device"], "new-cam");
        let logo = report.destination.join("Assets/images/logo.png");
        assert_eq!(
            installed["sources"][0]["settings"]["file"],
            logo.to_string_lossy().into_owned()
        );
        assert_eq!(std::fs::read(logo).unwrap(), vec![7u8; 2048]);
    }
}
