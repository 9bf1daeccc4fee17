//! Filesystem operations used by export and import.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Filesystem collaborator.
pub trait FileSystem: Send + Sync {
    fn is_file(&self, path: &Path) -> bool;

    fn is_dir(&self, path: &Path) -> bool;

    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Regular files under `dir`, sorted. Descends into subdirectories only
    /// when `recursive` is set.
    fn list_files(&self, dir: &Path, recursive: bool) -> io::Result<Vec<PathBuf>>;

    /// Delete everything inside `dir`, keeping `dir` itself.
    fn remove_dir_contents(&self, dir: &Path) -> io::Result<()>;

    /// Copy `from` to `to` through a temporary sibling of `to`, so `to` is
    /// either its old content or the complete new content.
    fn safe_copy(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Replace `path` with `data` atomically.
    fn write_atomic(&self, path: &Path, data: &[u8]) -> io::Result<()>;
}

/// The real local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

impl LocalFs {
    fn temp_sibling(path: &Path) -> io::Result<tempfile::NamedTempFile> {
        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        tempfile::Builder::new()
            .prefix(".sb-")
            .suffix(".tmp")
            .tempfile_in(parent)
    }
}

impl FileSystem for LocalFs {
    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn list_files(&self, dir: &Path, recursive: bool) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut pending = vec![dir.to_path_buf()];
        while let Some(current) = pending.pop() {
            for entry in std::fs::read_dir(&current)? {
                let entry = entry?;
                let file_type = entry.file_type()?;
                if file_type.is_file() {
                    files.push(entry.path());
                } else if recursive && file_type.is_dir() {
                    pending.push(entry.path());
                }
            }
        }
        files.sort();
        Ok(files)
    }

    fn remove_dir_contents(&self, dir: &Path) -> io::Result<()> {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                std::fs::remove_dir_all(entry.path())?;
            } else {
                std::fs::remove_file(entry.path())?;
            }
        }
        Ok(())
    }

    fn safe_copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        let mut source = std::fs::File::open(from)?;
        let mut temp = Self::temp_sibling(to)?;
        io::copy(&mut source, temp.as_file_mut())?;
        temp.as_file().sync_all()?;
        temp.persist(to).map_err(|e| e.error)?;
        Ok(())
    }

    fn write_atomic(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        let mut temp = Self::temp_sibling(path)?;
        temp.write_all(data)?;
        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}
