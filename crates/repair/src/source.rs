use crate::{
    engine::RepairError,
    version::{Resolution, ResolveAction, VersionResolver},
};
use solidifi_common::{errors::FsPathError, fs};
use std::path::{Path, PathBuf};

/// A Solidity source file: an on-disk path and the in-memory text of it.
///
/// One pipeline run owns exactly one `SourceFile`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceFile {
    path: PathBuf,
    text: String,
}

impl SourceFile {
    /// Reads the file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, FsPathError> {
        let path = path.into();
        let text = fs::read_to_string(&path)?;
        Ok(Self { path, text })
    }

    /// Creates a file from text that is not on disk yet.
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self { path: path.into(), text: text.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn into_text(self) -> String {
        self.text
    }

    /// The file name, used as the source unit name in compiler inputs.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "source.sol".to_string())
    }

    /// Writes the text back to [`Self::path`].
    pub fn save(&self) -> Result<(), FsPathError> {
        fs::write(&self.path, &self.text)
    }

    /// Resolves the pragma of the text. A synthesized pragma is written to disk right away.
    pub fn resolve_version(
        &mut self,
        resolver: &VersionResolver,
    ) -> Result<Resolution, RepairError> {
        let resolution = resolver.resolve(&self.text)?;
        if resolution.is_modified() {
            self.text.clone_from(&resolution.text);
            if resolution.action == ResolveAction::Synthesized {
                info!(target: "solidifi::repair", path = %self.path.display(), "added missing pragma");
                self.save()?;
            }
        }
        Ok(resolution)
    }
}
