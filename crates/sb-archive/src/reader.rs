//! Archive reader with safe, streaming extraction.
//!
//! Every entry name is validated before anything touches the filesystem;
//! a name that would escape the destination aborts the whole extraction.

use crate::entry::safe_relative_path;
use crate::progress::{IoContext, ProgressTracker};
use crate::{ArchiveError, BundleManifest, Result, DEFAULT_CHUNK_SIZE, MANIFEST_FILE_NAME};
use std::fs::File;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;
use tracing::{debug, info, warn};
use zip::ZipArchive;

/// Outcome of a successful extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    /// File entries written.
    pub entries: usize,
    /// Directory entries created.
    pub directories: usize,
    /// Uncompressed bytes written.
    pub bytes: u64,
}

/// Reader for scene bundle archives.
pub struct ArchiveReader<R: Read + Seek> {
    archive: ZipArchive<R>,
    chunk_size: usize,
}

impl ArchiveReader<File> {
    /// Open an archive from a file path.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let reader = Self::from_reader(file)?;
        info!(path = %path.display(), entries = reader.len(), "Archive opened");
        Ok(reader)
    }
}

impl ArchiveReader<Cursor<Vec<u8>>> {
    /// Open an archive from bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::from_reader(Cursor::new(bytes))
    }
}

impl<R: Read + Seek> ArchiveReader<R> {
    /// Create a reader from any Read + Seek source.
    pub fn from_reader(reader: R) -> Result<Self> {
        let archive = ZipArchive::new(reader)?;
        Ok(Self {
            archive,
            chunk_size: DEFAULT_CHUNK_SIZE,
        })
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Number of entries, directory markers included.
    pub fn len(&self) -> usize {
        self.archive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archive.is_empty()
    }

    /// Entry names in central-directory order.
    pub fn entry_names(&self) -> Vec<String> {
        (0..self.archive.len())
            .filter_map(|i| self.archive.name_for_index(i).map(str::to_string))
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.archive.index_for_name(name).is_some()
    }

    /// Read a whole entry into memory.
    pub fn read_entry(&mut self, name: &str) -> Result<Vec<u8>> {
        let mut file = self
            .archive
            .by_name(name)
            .map_err(|_| ArchiveError::EntryNotFound(name.to_string()))?;

        let mut data = Vec::with_capacity(usize::try_from(file.size()).unwrap_or(0));
        file.read_to_end(&mut data)?;

        debug!(name, bytes = data.len(), "Read entry from archive");
        Ok(data)
    }

    /// Read an entry as UTF-8 text.
    pub fn read_string(&mut self, name: &str) -> Result<String> {
        let data = self.read_entry(name)?;
        String::from_utf8(data).map_err(|_| ArchiveError::InvalidUtf8(name.to_string()))
    }

    /// Read and parse a JSON entry.
    pub fn read_json<T: serde::de::DeserializeOwned>(&mut self, name: &str) -> Result<T> {
        let data = self.read_entry(name)?;
        Ok(serde_json::from_slice(&data)?)
    }

    /// Read, parse, and validate the bundle manifest.
    pub fn read_manifest(&mut self) -> Result<BundleManifest> {
        let json = self.read_string(MANIFEST_FILE_NAME).map_err(|e| match e {
            ArchiveError::EntryNotFound(_) => {
                ArchiveError::InvalidManifest(format!("{} is missing", MANIFEST_FILE_NAME))
            }
            other => other,
        })?;
        let manifest = BundleManifest::from_json(&json)
            .map_err(|e| ArchiveError::InvalidManifest(e.to_string()))?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Extract every entry beneath `dest`, creating it if needed.
    ///
    /// Names are checked up front, so an unsafe entry fails before any file
    /// is written. On error or cancellation the entry being written is
    /// removed; entries already completed are left for the caller to clean
    /// up together with `dest`.
    pub fn extract_all(&mut self, dest: &Path, ctx: &IoContext) -> Result<ExtractSummary> {
        ctx.check()?;

        let mut plan = Vec::with_capacity(self.archive.len());
        let mut total = 0u64;
        for i in 0..self.archive.len() {
            let entry = self.archive.by_index_raw(i)?;
            let name = entry.name().to_string();
            let relative = safe_relative_path(&name).map_err(|e| {
                warn!(entry = %name, "Refusing to extract unsafe entry name");
                e
            })?;
            let is_dir = entry.is_dir();
            if !is_dir {
                total = total.saturating_add(entry.size());
            }
            plan.push((i, name, relative, is_dir));
        }

        std::fs::create_dir_all(dest)?;
        let mut tracker = ProgressTracker::new(total, ctx.emitter.clone());
        let mut buf = vec![0u8; self.chunk_size];
        let mut summary = ExtractSummary::default();

        for (index, name, relative, is_dir) in plan {
            ctx.check()?;
            let target = dest.join(&relative);

            if is_dir {
                std::fs::create_dir_all(&target)?;
                tracker.entry_complete(&name);
                summary.directories += 1;
                continue;
            }

            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }

            match self.extract_entry(index, &name, &target, &mut buf, &mut tracker, ctx) {
                Ok(()) => {
                    summary.entries += 1;
                }
                Err(e) => {
                    let _ = std::fs::remove_file(&target);
                    return Err(e);
                }
            }
        }

        ctx.check()?;
        summary.bytes = tracker.bytes_done();
        tracker.complete();

        info!(
            dest = %dest.display(),
            entries = summary.entries,
            directories = summary.directories,
            bytes = summary.bytes,
            "Archive extracted"
        );
        Ok(summary)
    }

    fn extract_entry(
        &mut self,
        index: usize,
        name: &str,
        target: &Path,
        buf: &mut [u8],
        tracker: &mut ProgressTracker,
        ctx: &IoContext,
    ) -> Result<()> {
        let mut entry = self.archive.by_index(index)?;
        let len = entry.size();
        let mut out = File::create(target)?;
        let mut written = 0u64;
        let mut last_fraction = 0.0;

        loop {
            ctx.check()?;
            let n = match entry.read(buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            out.write_all(&buf[..n])?;
            written += n as u64;
            last_fraction = tracker.advance(name, n as u64, written, len);
        }

        out.flush()?;
        if last_fraction < 1.0 {
            tracker.entry_complete(name);
        }
        Ok(())
    }
}
