use std::{
    io,
    path::{Path, PathBuf},
};

/// Various error variants for `fs` operations that serve as an addition to the io::Error which
/// does not provide any information about the path.
#[derive(Debug, thiserror::Error)]
#[allow(missing_docs)]
pub enum FsPathError {
    /// Provides additional path context for [`std::fs::write`].
    #[error("failed to write to {path:?}: {source}")]
    Write { source: io::Error, path: PathBuf },
    /// Provides additional path context for [`std::fs::read`].
    #[error("failed to read from {path:?}: {source}")]
    Read { source: io::Error, path: PathBuf },
    /// Provides additional path context for [`std::fs::copy`].
    #[error("failed to copy from {from:?} to {to:?}: {source}")]
    Copy { source: io::Error, from: PathBuf, to: PathBuf },
    /// Provides additional path context for [`std::fs::read_dir`].
    #[error("failed to read directory {path:?}: {source}")]
    ReadDir { source: io::Error, path: PathBuf },
    /// Provides additional path context for [`std::fs::create_dir_all`].
    #[error("failed to create dir {path:?}: {source}")]
    CreateDir { source: io::Error, path: PathBuf },
}

impl FsPathError {
    /// Returns the complementary error variant for [`std::fs::write`].
    pub fn write(source: io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Write { source, path: path.into() }
    }

    /// Returns the complementary error variant for [`std::fs::read`].
    pub fn read(source: io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Read { source, path: path.into() }
    }

    /// Returns the complementary error variant for [`std::fs::copy`].
    pub fn copy(source: io::Error, from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Self {
        Self::Copy { source, from: from.into(), to: to.into() }
    }

    /// Returns the complementary error variant for [`std::fs::read_dir`].
    pub fn read_dir(source: io::Error, path: impl Into<PathBuf>) -> Self {
        Self::ReadDir { source, path: path.into() }
    }

    /// Returns the complementary error variant for [`std::fs::create_dir_all`].
    pub fn create_dir(source: io::Error, path: impl Into<PathBuf>) -> Self {
        Self::CreateDir { source, path: path.into() }
    }

    /// Returns the path the failed operation was working on.
    pub fn path(&self) -> &Path {
        match self {
            Self::Write { path, .. }
            | Self::Read { path, .. }
            | Self::ReadDir { path, .. }
            | Self::CreateDir { path, .. } => path,
            Self::Copy { from, .. } => from,
        }
    }
}

impl AsRef<Path> for FsPathError {
    fn as_ref(&self) -> &Path {
        self.path()
    }
}

impl From<FsPathError> for io::Error {
    fn from(value: FsPathError) -> Self {
        match value {
            FsPathError::Write { source, .. }
            | FsPathError::Read { source, .. }
            | FsPathError::Copy { source, .. }
            | FsPathError::ReadDir { source, .. }
            | FsPathError::CreateDir { source, .. } => source,
        }
    }
}
