use crate::handler;
use eyre::{Result, WrapErr};
use rayon::prelude::*;
use solidifi_common::{errors::display_chain, term::BatchProgress};
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, filter::LevelFilter, prelude::*};
use yansi::Paint;

/// Initializes a tracing subscriber writing to stderr.
///
/// `level` overrides `RUST_LOG`, which defaults to `info` when unset.
pub fn subscriber(level: Option<LevelFilter>) {
    let filter = match level {
        Some(level) => EnvFilter::default().add_directive(level.into()),
        None => EnvFilter::builder().with_default_directive(LevelFilter::INFO.into()).from_env_lossy(),
    };
    let registry = tracing_subscriber::Registry::default().with(filter);
    let fmt = tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false);
    let _ = registry.with(fmt).try_init();
}

/// Returns the Solidity files below `path`, sorted by file name within each directory.
///
/// A file path is returned as is, whatever its extension.
pub fn collect_sources(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    eyre::ensure!(path.is_dir(), "`{}` is neither a file nor a directory", path.display());

    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(path).sort_by_file_name() {
        let entry = entry.wrap_err_with(|| format!("failed to walk `{}`", path.display()))?;
        if entry.file_type().is_file() && entry.path().extension().is_some_and(|ext| ext == "sol")
        {
            files.push(entry.into_path());
        }
    }
    eyre::ensure!(!files.is_empty(), "no Solidity files found in `{}`", path.display());
    Ok(files)
}

/// The per-file results of [`run_batch`].
#[derive(Debug)]
pub struct BatchOutcome<T> {
    /// Files that succeeded, in input order.
    pub succeeded: Vec<(PathBuf, T)>,
    /// Files that failed, in input order.
    pub failed: Vec<(PathBuf, eyre::Report)>,
}

impl<T> BatchOutcome<T> {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// Fails if no file succeeded.
    pub fn ensure_any_succeeded(&self) -> Result<()> {
        if self.succeeded.is_empty() && !self.failed.is_empty() {
            eyre::bail!("all {} files failed", self.failed.len());
        }
        Ok(())
    }
}

/// Prints one line per failed file, followed by a hint when the cause is one SolidiFI knows.
pub fn print_failures(failed: &[(PathBuf, eyre::Report)]) {
    for (file, err) in failed {
        println!("{} {}: {err}", "✗".red(), file.display());
        if let Some(hint) = handler::hint(err.as_ref()) {
            println!("  {} {hint}", "hint:".yellow());
        }
    }
}

/// Runs `f` on every file on a pool of `jobs` threads.
///
/// A failing file is logged with its error chain and does not stop the others.
pub fn run_batch<T, F>(
    files: &[PathBuf],
    jobs: usize,
    progress: BatchProgress,
    f: F,
) -> Result<BatchOutcome<T>>
where
    T: Send,
    F: Fn(&Path) -> Result<T> + Sync,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .thread_name(|i| format!("solidifi-worker-{i}"))
        .build()
        .wrap_err("failed to create thread pool")?;

    let results: Vec<_> = pool.install(|| {
        files
            .par_iter()
            .map(|file| {
                let result = f(file);
                if let Err(err) = &result {
                    error!(file = %file.display(), "{}", display_chain(err.as_ref()));
                }
                progress.file_done(file, result.is_ok());
                (file.clone(), result)
            })
            .collect()
    });
    progress.finish();

    let mut outcome = BatchOutcome { succeeded: Vec::new(), failed: Vec::new() };
    for (file, result) in results {
        match result {
            Ok(value) => outcome.succeeded.push((file, value)),
            Err(err) => outcome.failed.push((file, err)),
        }
    }
    Ok(outcome)
}
