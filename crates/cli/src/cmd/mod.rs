//! Subcommands of the `solidifi` binary.

use solidifi_config::Config;
use solidifi_repair::VersionResolver;

pub mod clean;
pub mod config;
pub mod inject;

/// The version resolver configured by `config`.
pub(crate) fn version_resolver(config: &Config) -> VersionResolver {
    VersionResolver::new(config.default_pragma.clone(), config.legacy_caret_version.clone())
}
