use crate::{
    cmd::version_resolver,
    opts::{CompilerOpts, ConfigOpts, ShellOptions},
    utils::{self, BatchOutcome},
};
use clap::Parser;
use eyre::{Result, WrapErr};
use figment::{
    Metadata, Profile, Provider,
    error::Kind::InvalidType,
    value::{Dict, Map, Value},
};
use itertools::Itertools;
use serde::Serialize;
use solidifi_common::{Compiler, term::BatchProgress};
use solidifi_config::{BugType, Config};
use solidifi_inject::{BugInjector, InjectionReport};
use solidifi_repair::AutoRepairEngine;
use std::path::{Path, PathBuf};
use yansi::Paint;

/// CLI arguments for `solidifi inject`.
#[derive(Clone, Debug, Serialize, Parser)]
pub struct InjectArgs {
    /// A Solidity file, or a directory searched recursively for `.sol` files.
    #[arg(value_name = "PATH")]
    #[serde(skip)]
    pub path: PathBuf,

    /// The bug class to inject, by name or id.
    #[arg(long, short, value_name = "NAME|ID")]
    #[serde(skip)]
    pub bug_type: String,

    /// Output root. Buggy files are written to `<OUT>/buggy/<bug type>/`.
    #[arg(long, short, value_name = "OUT")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out: Option<PathBuf>,

    /// Root of the snippet library.
    #[arg(long, value_name = "DIR")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bugs_dir: Option<PathBuf>,

    #[command(flatten)]
    #[serde(skip)]
    pub compiler: CompilerOpts,

    #[command(flatten)]
    #[serde(flatten)]
    pub config: ConfigOpts,
}

impl InjectArgs {
    pub fn run(self, shell: ShellOptions) -> Result<()> {
        let config = self.config.load_config(&self)?;
        let bug = find_bug_type(&config, &self.bug_type)?.clone();
        let files = utils::collect_sources(&self.path)?;
        let progress = if shell.progress() {
            BatchProgress::new(files.len(), "injecting")
        } else {
            BatchProgress::hidden(files.len())
        };

        let outcome = execute(&config, &bug, config.solc.solc(), &files, progress)?;
        print_summary(&bug, &outcome);
        outcome.ensure_any_succeeded()
    }
}

impl Provider for InjectArgs {
    fn metadata(&self) -> Metadata {
        Metadata::named("Inject Args Provider")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, figment::Error> {
        let value = Value::serialize(self)?;
        let error = InvalidType(value.to_actual(), "map".into());
        let mut dict = value.into_dict().ok_or(error)?;

        let solc = self.compiler.dict()?;
        if !solc.is_empty() {
            dict.insert("solc".to_string(), Value::serialize(solc)?);
        }

        Ok(Map::from([(Profile::Default, dict)]))
    }
}

/// Looks up a bug class by name or id.
pub fn find_bug_type<'a>(config: &'a Config, key: &str) -> Result<&'a BugType> {
    config.bug_type(key).ok_or_else(|| {
        let known = config.bug_types.iter().map(|bug| format!("{} ({})", bug.name, bug.id));
        eyre::eyre!("unknown bug type `{key}`, expected one of: {}", known.format(", "))
    })
}

/// Builds the injector described by `config`.
pub fn injector<C: Compiler>(config: &Config, compiler: C) -> BugInjector<C> {
    let engine = AutoRepairEngine::new(compiler)
        .resolver(version_resolver(config))
        .max_rounds(config.repair.max_rounds)
        .division_by_zero_signatures(config.repair.division_by_zero_signatures.clone());
    BugInjector::new(engine, &config.bugs_dir)
        .snippet_forms(config.snippet_forms.clone())
        .transforms(config.transforms.clone())
        .weakenings(config.weakenings.clone())
}

/// Injects `bug` into every file, one worker per configured job.
pub fn execute<C: Compiler>(
    config: &Config,
    bug: &BugType,
    compiler: C,
    files: &[PathBuf],
    progress: BatchProgress,
) -> Result<BatchOutcome<InjectionReport>> {
    ensure_distinct_names(files)?;
    let injector = injector(config, compiler);
    utils::run_batch(files, config.jobs(), progress, |file: &Path| {
        injector
            .inject(file, bug, &config.out)
            .wrap_err_with(|| format!("failed to inject into `{}`", file.display()))
    })
}

/// Fails if two inputs share a file name, since buggy files are written to one flat directory
/// per bug type.
pub fn ensure_distinct_names(files: &[PathBuf]) -> Result<()> {
    let clashes: Vec<_> = files.iter().filter_map(|file| file.file_name()).duplicates().collect();
    if let Some(&name) = clashes.first() {
        let paths = files.iter().filter(|file| file.file_name() == Some(name));
        eyre::bail!(
            "{} input files are named `{}`: {}",
            paths.clone().count(),
            name.to_string_lossy(),
            paths.map(|file| format!("`{}`", file.display())).format(", ")
        );
    }
    Ok(())
}

fn print_summary(bug: &BugType, outcome: &BatchOutcome<InjectionReport>) {
    for (_, report) in &outcome.succeeded {
        let mut line = format!(
            "{} {}: {}/{} sites",
            "✓".green(),
            report.buggy.display(),
            report.injected(),
            report.candidates
        );
        if report.repair.rounds > 0 {
            line.push_str(&format!(", {} repair rounds", report.repair.rounds));
        }
        if report.exhausted {
            line.push_str(", snippets exhausted");
        }
        println!("{line}");
    }
    utils::print_failures(&outcome.failed);

    let injected: usize = outcome.succeeded.iter().map(|(_, report)| report.injected()).sum();
    let summary = format!(
        "Injected {injected} {} bugs into {} of {} files",
        bug.name,
        outcome.succeeded.len(),
        outcome.total()
    );
    if outcome.failed.is_empty() {
        println!("{}", summary.bold());
    } else {
        println!("{} ({} failed)", summary.bold(), outcome.failed.len().red());
    }
}
