//! Streaming archive writer.
//!
//! Entries are queued first and written in one pass. Before streaming, every
//! entry is sized (files statted, blobs measured) so overall progress is
//! exact. Each file entry is then pulled through a chunk source that owns the
//! only open source handle, reports progress, and observes cancellation.
//!
//! Output goes to a temporary sibling of the target and is renamed into place
//! only after the central directory is written; any failure or cancellation
//! drops the temp file, so no truncated archive is ever left at the target.

use crate::entry::{normalize_entry_name, EntrySource, PendingArchiveEntry};
use crate::progress::{IoContext, ProgressTracker};
use crate::{ArchiveError, Result, DEFAULT_CHUNK_SIZE};
use std::collections::HashSet;
use std::fs::File;
use std::io::{Cursor, Read, Seek, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

/// Entries at or above this size need ZIP64 headers.
const LARGE_FILE_THRESHOLD: u64 = u32::MAX as u64;

/// Outcome of a successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    pub path: PathBuf,
    pub entries: usize,
    pub bytes: u64,
}

/// Builder for scene bundle archives.
#[derive(Debug)]
pub struct ArchiveWriter {
    entries: Vec<PendingArchiveEntry>,
    names: HashSet<String>,
    chunk_size: usize,
    compression: CompressionMethod,
}

impl Default for ArchiveWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveWriter {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            names: HashSet::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            compression: CompressionMethod::Deflated,
        }
    }

    /// Set the streaming chunk size (minimum 1 byte).
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_compression(mut self, compression: CompressionMethod) -> Self {
        self.compression = compression;
        self
    }

    /// Queue an entry. Names are normalized to forward slashes and must be
    /// unique within this writer.
    pub fn add_entry(&mut self, mut entry: PendingArchiveEntry) -> Result<()> {
        let mut name = normalize_entry_name(&entry.name)?;
        if entry.is_directory() && !name.ends_with('/') {
            name.push('/');
        } else if !entry.is_directory() && name.ends_with('/') {
            return Err(ArchiveError::InvalidEntryName(entry.name));
        }

        if !self.names.insert(name.clone()) {
            return Err(ArchiveError::DuplicateEntry(name));
        }

        entry.name = name;
        debug!(name = %entry.name, "Queued archive entry");
        self.entries.push(entry);
        Ok(())
    }

    /// Queue a file to be streamed from disk.
    pub fn add_file(&mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Result<()> {
        self.add_entry(PendingArchiveEntry::file(name, path))
    }

    /// Queue an in-memory blob.
    pub fn add_bytes(&mut self, name: impl Into<String>, data: Vec<u8>) -> Result<()> {
        self.add_entry(PendingArchiveEntry::bytes(name, data))
    }

    /// Queue a JSON-serializable value as a pretty-printed blob.
    pub fn add_json<T: serde::Serialize>(&mut self, name: impl Into<String>, value: &T) -> Result<()> {
        let json = serde_json::to_vec_pretty(value)?;
        self.add_bytes(name, json)
    }

    /// Queue an empty directory marker.
    pub fn add_directory(&mut self, name: impl Into<String>) -> Result<()> {
        self.add_entry(PendingArchiveEntry::directory(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[PendingArchiveEntry] {
        &self.entries
    }

    /// Sum of all entry sizes. Stats every queued file; a missing source
    /// file fails here, before any output is created.
    pub fn total_bytes(&self) -> Result<u64> {
        self.entries
            .iter()
            .try_fold(0u64, |acc, entry| Ok(acc.saturating_add(entry.size()?)))
    }

    /// Write the archive to `path`, consuming the queue.
    pub fn write(self, path: &Path, ctx: &IoContext) -> Result<WriteSummary> {
        if self.entries.is_empty() {
            return Err(ArchiveError::EmptyArchive);
        }
        ctx.check()?;

        let sizes = self
            .entries
            .iter()
            .map(PendingArchiveEntry::size)
            .collect::<Result<Vec<u64>>>()?;
        let total: u64 = sizes.iter().sum();

        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut temp = tempfile::Builder::new()
            .prefix(".sb-")
            .suffix(".partial")
            .tempfile_in(parent)?;

        let bytes = match self.stream_entries(temp.as_file_mut(), &sizes, total, ctx) {
            Ok(bytes) => bytes,
            Err(e) => {
                // Dropping `temp` removes the partial archive
                if e.is_cancelled() {
                    info!(path = %path.display(), "Archive write cancelled");
                } else {
                    warn!(path = %path.display(), error = %e, "Archive write failed");
                }
                return Err(e);
            }
        };

        temp.persist(path).map_err(|e| ArchiveError::Io(e.error))?;

        info!(
            path = %path.display(),
            entries = self.entries.len(),
            bytes,
            "Archive written"
        );

        Ok(WriteSummary {
            path: path.to_path_buf(),
            entries: self.entries.len(),
            bytes,
        })
    }

    /// Write the archive to a byte vector (for in-memory use and tests).
    pub fn write_to_vec(self, ctx: &IoContext) -> Result<Vec<u8>> {
        if self.entries.is_empty() {
            return Err(ArchiveError::EmptyArchive);
        }
        ctx.check()?;

        let sizes = self
            .entries
            .iter()
            .map(PendingArchiveEntry::size)
            .collect::<Result<Vec<u64>>>()?;
        let total: u64 = sizes.iter().sum();

        let mut buffer = Cursor::new(Vec::new());
        self.stream_entries(&mut buffer, &sizes, total, ctx)?;
        Ok(buffer.into_inner())
    }

    fn stream_entries<W: Write + Seek>(
        &self,
        out: W,
        sizes: &[u64],
        total: u64,
        ctx: &IoContext,
    ) -> Result<u64> {
        let mut zip = ZipWriter::new(out);
        let mut tracker = ProgressTracker::new(total, ctx.emitter.clone());
        let mut buf = vec![0u8; self.chunk_size];

        for (entry, &len) in self.entries.iter().zip(sizes) {
            ctx.check()?;

            let options: FileOptions<'_, ()> = FileOptions::default()
                .compression_method(self.compression)
                .large_file(len >= LARGE_FILE_THRESHOLD);

            if entry.is_directory() {
                zip.add_directory(entry.name.as_str(), options.unix_permissions(0o755))?;
                tracker.entry_complete(&entry.name);
                continue;
            }

            let mut source = ChunkSource::open(entry, len, ctx)?;
            zip.start_file(entry.name.as_str(), options.unix_permissions(0o644))?;
            while let Some(chunk) = source.next_chunk(&mut buf, &mut tracker, ctx)? {
                zip.write_all(chunk)?;
            }
            source.finish(&mut tracker);
        }

        // Cancellation after the last entry still discards the archive
        ctx.check()?;
        zip.finish()?;
        tracker.complete();
        Ok(tracker.bytes_done())
    }
}

enum SourceReader<'a> {
    File { file: File, path: &'a Path },
    Memory(Cursor<&'a [u8]>),
}

/// Pull-based data source for one entry.
struct ChunkSource<'a> {
    name: &'a str,
    reader: SourceReader<'a>,
    len: u64,
    read: u64,
    last_fraction: f64,
}

impl<'a> ChunkSource<'a> {
    fn open(entry: &'a PendingArchiveEntry, len: u64, ctx: &IoContext) -> Result<Self> {
        ctx.check()?;
        let reader = match &entry.source {
            EntrySource::File(path) => {
                let file = File::open(path).map_err(|source| ArchiveError::SourceFile {
                    path: path.clone(),
                    source,
                })?;
                SourceReader::File { file, path }
            }
            EntrySource::Memory(data) => SourceReader::Memory(Cursor::new(data.as_slice())),
            EntrySource::Directory => {
                return Err(ArchiveError::InvalidEntryName(entry.name.clone()));
            }
        };
        Ok(Self {
            name: &entry.name,
            reader,
            len,
            read: 0,
            last_fraction: 0.0,
        })
    }

    /// Read the next chunk into `buf`. Returns `None` at end of entry.
    fn next_chunk<'b>(
        &mut self,
        buf: &'b mut [u8],
        tracker: &mut ProgressTracker,
        ctx: &IoContext,
    ) -> Result<Option<&'b [u8]>> {
        ctx.check()?;

        let n = match &mut self.reader {
            SourceReader::File { file, path } => {
                read_retrying(file, buf).map_err(|source| ArchiveError::SourceFile {
                    path: path.to_path_buf(),
                    source,
                })?
            }
            SourceReader::Memory(cursor) => read_retrying(cursor, buf)?,
        };

        if n == 0 {
            return Ok(None);
        }

        self.read += n as u64;
        self.last_fraction = tracker.advance(self.name, n as u64, self.read, self.len);
        Ok(buf.get(..n))
    }

    fn finish(self, tracker: &mut ProgressTracker) {
        if self.last_fraction < 1.0 {
            tracker.entry_complete(self.name);
        }
    }
}

fn read_retrying<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    loop {
        match reader.read(buf) {
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}
