//! Contains various `std::fs` wrapper functions that also contain the target path in their errors.

use crate::errors::FsPathError;
use std::path::{Path, PathBuf};

type Result<T> = std::result::Result<T, FsPathError>;

/// Wrapper for [`std::fs::read_to_string`].
pub fn read_to_string(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    std::fs::read_to_string(path).map_err(|err| FsPathError::read(err, path))
}

/// Wrapper for [`std::fs::write`].
pub fn write(path: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> Result<()> {
    let path = path.as_ref();
    std::fs::write(path, contents).map_err(|err| FsPathError::write(err, path))
}

/// Wrapper for [`std::fs::copy`].
pub fn copy(from: impl AsRef<Path>, to: impl AsRef<Path>) -> Result<u64> {
    let from = from.as_ref();
    let to = to.as_ref();
    std::fs::copy(from, to).map_err(|err| FsPathError::copy(err, from, to))
}

/// Wrapper for [`std::fs::create_dir_all`].
pub fn create_dir_all(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    std::fs::create_dir_all(path).map_err(|err| FsPathError::create_dir(err, path))
}

/// Returns the regular, non-hidden files of `dir`, sorted by file name.
///
/// Hidden entries (a leading `.`) and sub-directories are skipped.
pub fn files_sorted(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let entries = std::fs::read_dir(dir).map_err(|err| FsPathError::read_dir(err, dir))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| FsPathError::read_dir(err, dir))?;
        let path = entry.path();
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if !hidden && path.is_file() {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}
