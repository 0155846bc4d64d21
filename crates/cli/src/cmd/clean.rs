use crate::{
    cmd::version_resolver,
    opts::{ConfigOpts, ShellOptions},
    utils::{self, BatchOutcome},
};
use clap::Parser;
use eyre::{Result, WrapErr};
use solidifi_common::term::BatchProgress;
use solidifi_config::Config;
use solidifi_repair::{ResolveAction, SourceFile, VersionResolver, normalize::normalize_legacy};
use std::path::{Path, PathBuf};
use yansi::Paint;

/// CLI arguments for `solidifi clean`.
#[derive(Clone, Debug, Parser)]
pub struct CleanArgs {
    /// A Solidity file, or a directory searched recursively for `.sol` files.
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    #[command(flatten)]
    pub config: ConfigOpts,
}

impl CleanArgs {
    pub fn run(self, shell: ShellOptions) -> Result<()> {
        let config = self.config.load_config(&self.config)?;
        let files = utils::collect_sources(&self.path)?;
        let progress = if shell.progress() {
            BatchProgress::new(files.len(), "cleaning")
        } else {
            BatchProgress::hidden(files.len())
        };

        let outcome = execute(&config, &files, progress)?;
        let changed = outcome.succeeded.iter().filter(|(_, cleaned)| cleaned.changed).count();
        utils::print_failures(&outcome.failed);
        println!(
            "{}",
            format!("Rewrote {changed} of {} files", outcome.total()).bold()
        );
        outcome.ensure_any_succeeded()
    }
}

/// What [`clean_file`] did to one file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cleaned {
    /// What was done to the pragma.
    pub pragma: ResolveAction,
    /// Whether the file was rewritten.
    pub changed: bool,
}

/// Resolves the pragma of `path` and rewrites legacy constructs in place.
pub fn clean_file(path: &Path, resolver: &VersionResolver) -> Result<Cleaned> {
    let mut source = SourceFile::open(path)?;
    let resolution = source.resolve_version(resolver)?;
    let normalized = normalize_legacy(source.text(), &resolution.compiler);
    let changed = resolution.is_modified() || normalized != source.text();
    if changed {
        source.set_text(normalized);
        source.save()?;
        debug!(file = %path.display(), pragma = ?resolution.action, "rewrote legacy source");
    }
    Ok(Cleaned { pragma: resolution.action, changed })
}

/// Cleans every file, one worker per configured job.
pub fn execute(
    config: &Config,
    files: &[PathBuf],
    progress: BatchProgress,
) -> Result<BatchOutcome<Cleaned>> {
    let resolver = version_resolver(config);
    utils::run_batch(files, config.jobs(), progress, |file: &Path| {
        clean_file(file, &resolver).wrap_err_with(|| format!("failed to clean `{}`", file.display()))
    })
}
