use solidifi_common::errors::{FsPathError, SolcError};
use solidifi_repair::RepairError;
use std::path::PathBuf;

/// Errors of the snippet library.
#[derive(Debug, thiserror::Error)]
pub enum SnippetError {
    /// The class directory does not exist.
    #[error("no snippet directory for bug type `{bug_type}` at {}", dir.display())]
    MissingClass {
        /// The bug type name.
        bug_type: String,
        /// The expected directory.
        dir: PathBuf,
    },
    /// A fragment could not be read.
    #[error(transparent)]
    Fs(#[from] FsPathError),
}

/// Reasons a file could not be injected. All of them abort the current file only.
#[derive(Debug, thiserror::Error)]
pub enum InjectError {
    /// The source could not be brought to a compiling state.
    #[error("failed to repair source")]
    Repair(#[from] RepairError),
    /// The AST could not be obtained.
    #[error("failed to compile AST")]
    Solc(#[from] SolcError),
    /// Reading or writing a file failed.
    #[error(transparent)]
    Fs(#[from] FsPathError),
    /// The snippet library is unusable.
    #[error(transparent)]
    Snippet(#[from] SnippetError),
    /// A configured transform or weakening pattern is not a valid regex.
    #[error("invalid pattern `{pattern}`")]
    Pattern {
        /// The pattern as configured.
        pattern: String,
        /// The regex error.
        #[source]
        source: regex::Error,
    },
    /// The AST-mode compile reported errors.
    #[error("AST compilation failed: {0}")]
    AstErrors(String),
}
