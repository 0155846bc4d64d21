use eyre::EyreHandler;
use itertools::Itertools;
use solidifi_common::errors::{SolcError, causes};
use solidifi_config::ExtractConfigError;
use solidifi_inject::{InjectError, SnippetError};
use solidifi_repair::{RepairError, VersionError};
use std::{error::Error, fmt};

/// Returns what the user can do about `error`, judged by the first cause SolidiFI knows.
///
/// Unrecoverable diagnostics, compiler environment problems and configuration mistakes each
/// get their own advice. Plain io errors get none.
pub fn hint(error: &(dyn Error + 'static)) -> Option<String> {
    eyre::Chain::new(error).find_map(|cause| {
        if let Some(err) = cause.downcast_ref::<SolcError>() {
            return solc_hint(err);
        }
        if let Some(err) = cause.downcast_ref::<RepairError>() {
            return match err {
                RepairError::UnknownDiagnostic { .. } | RepairError::Patch { .. } => Some(
                    "no automatic patch applies to this diagnostic; fix the source by hand and rerun"
                        .to_string(),
                ),
                RepairError::RoundLimit(rounds) => Some(format!(
                    "every round fixed one error but more remain; raise `repair.max_rounds` (now {rounds})"
                )),
                _ => None,
            };
        }
        if let Some(VersionError::Unrecognized(_)) = cause.downcast_ref::<VersionError>() {
            return Some("replace the pragma with a plain `pragma solidity ^0.4.x;`".to_string());
        }
        if let Some(SnippetError::MissingClass { .. }) = cause.downcast_ref::<SnippetError>() {
            return Some(
                "point `--bugs-dir` at a snippet library with one directory per bug type"
                    .to_string(),
            );
        }
        if let Some(InjectError::Pattern { .. }) = cause.downcast_ref::<InjectError>() {
            return Some(
                "fix the rule in the `transforms` or `weakenings` section of the config".to_string(),
            );
        }
        if cause.is::<ExtractConfigError>() {
            return Some(
                "check `solidifi.toml` and the `SOLIDIFI_` environment variables".to_string(),
            );
        }
        None
    })
}

fn solc_hint(err: &SolcError) -> Option<String> {
    match err {
        SolcError::Spawn { program, .. } if program.as_os_str() == "docker" => {
            Some("docker mode needs the `docker` client on PATH".to_string())
        }
        SolcError::Spawn { .. } => Some(
            "install the compiler with `svm install <version>`, pass `--solc <PATH>` or use `--docker`"
                .to_string(),
        ),
        SolcError::Timeout(limit) => Some(format!(
            "raise `solc.timeout` (now {}s) or `SOLIDIFI_SOLC_TIMEOUT`",
            limit.as_secs()
        )),
        SolcError::Exit { .. } | SolcError::Json(_) => {
            Some("the compiler produced no standard-json output; check that it runs".to_string())
        }
        SolcError::Io(_) | SolcError::MissingAst(_) => None,
    }
}

/// Error reporting for `eyre` that prints the deduplicated cause chain and a hint.
pub struct Handler {
    debug_handler: Option<Box<dyn EyreHandler>>,
}

impl Handler {
    pub fn new(debug_handler: Option<Box<dyn EyreHandler>>) -> Self {
        Self { debug_handler }
    }
}

impl EyreHandler for Handler {
    fn display(&self, error: &(dyn Error + 'static), f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use fmt::Display;
        causes(error).into_iter().format("; ").fmt(f)
    }

    fn debug(&self, error: &(dyn Error + 'static), f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(debug_handler) = &self.debug_handler {
            return debug_handler.debug(error, f);
        }
        if f.alternate() {
            return fmt::Debug::fmt(error, f);
        }

        let causes = causes(error);
        let Some((outer, sources)) = causes.split_first() else { return Ok(()) };
        write!(f, "{outer}")?;
        if !sources.is_empty() {
            write!(f, "\n\nContext:")?;
            for source in sources {
                write!(f, "\n- {source}")?;
            }
        }
        if let Some(hint) = hint(error) {
            write!(f, "\n\nHint: {hint}")?;
        }
        Ok(())
    }

    fn track_caller(&mut self, location: &'static std::panic::Location<'static>) {
        if let Some(debug_handler) = &mut self.debug_handler {
            debug_handler.track_caller(location);
        }
    }
}

/// Installs the SolidiFI [`eyre`] and [`panic`](mod@std::panic) hooks as the global ones.
///
/// With `SOLIDIFI_DEBUG` set, errors are reported by `color_eyre` with span traces instead.
pub fn install() {
    let panic_section = "This is a bug in SolidiFI. Please report it together with the input file.";
    let (panic_hook, debug_hook) =
        color_eyre::config::HookBuilder::default().panic_section(panic_section).into_hooks();
    panic_hook.install();
    let debug_hook = debug_hook.into_eyre_hook();
    let debug = std::env::var_os("SOLIDIFI_DEBUG").is_some();
    if let Err(e) =
        eyre::set_hook(Box::new(move |e| Box::new(Handler::new(debug.then(|| debug_hook(e))))))
    {
        debug!("failed to install eyre error hook: {e}");
    }
}
