use std::{io, path::PathBuf, time::Duration};

/// Failures to run the compiler or to understand what it printed.
///
/// These are environment errors: they are never repaired, and abort processing of the current
/// file only.
#[derive(Debug, thiserror::Error)]
pub enum SolcError {
    /// The compiler process could not be started.
    #[error("failed to spawn `{}`: {source}", program.display())]
    Spawn {
        /// The program that was executed.
        program: PathBuf,
        /// The underlying io error.
        source: io::Error,
    },
    /// Reading from or writing to the compiler process failed.
    #[error("failed to communicate with solc: {0}")]
    Io(#[from] io::Error),
    /// The compiler did not exit within the configured limit and was killed.
    #[error("solc did not finish within {}s", .0.as_secs())]
    Timeout(Duration),
    /// The compiler exited unsuccessfully without printing any output.
    #[error("solc exited with {code:?}: {stderr}")]
    Exit {
        /// The exit code, if the process was not killed by a signal.
        code: Option<i32>,
        /// Everything the process printed to stderr.
        stderr: String,
    },
    /// The standard-json output could not be deserialized.
    #[error("failed to parse solc output: {0}")]
    Json(#[from] serde_json::Error),
    /// A requested source was not part of the compiler output.
    #[error("solc output does not contain an AST for `{0}`")]
    MissingAst(String),
}
