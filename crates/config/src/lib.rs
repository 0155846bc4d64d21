//! # solidifi-config
//!
//! SolidiFI configuration.
//!
//! Values are merged, in increasing priority, from [`Config::default`], a `solidifi.toml` file and
//! `SOLIDIFI_` prefixed environment variables.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

use figment::{
    Figment, Metadata, Profile, Provider,
    providers::{Env, Format, Serialized, Toml},
    value::{Dict, Map},
};
use semver::Version;
use serde::{Deserialize, Serialize};
use solidifi_common::{Solc, SolcMode};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

mod bugs;
pub use bugs::{BugType, SnippetForms, TransformRule, WeakenRule};

mod error;
pub use error::{ConfigError, ExtractConfigError};

pub use figment;

/// SolidiFI configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the snippet library, one directory per bug class.
    pub bugs_dir: PathBuf,
    /// Output root, buggy files land in `<out>/buggy/<bug type>/`.
    pub out: PathBuf,
    /// Version of the caret pragma prepended to files without one.
    pub default_pragma: Version,
    /// What a caret or comparison pragma of the `0.4` line resolves to.
    pub legacy_caret_version: Version,
    /// Number of files processed in parallel, `0` for one per CPU.
    pub jobs: usize,
    /// Compiler invocation.
    pub solc: SolcConfig,
    /// Auto repair loop.
    pub repair: RepairConfig,
    /// Known vulnerability classes.
    pub bug_types: Vec<BugType>,
    /// Snippet sub-directory names.
    pub snippet_forms: SnippetForms,
    /// Code-transform rules.
    pub transforms: Vec<TransformRule>,
    /// Weaken-security rules.
    pub weakenings: Vec<WeakenRule>,
}

/// Compiler invocation settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolcConfig {
    /// `native` or `docker`.
    pub mode: SolcMode,
    /// Explicit binary, used for every version.
    pub binary: Option<PathBuf>,
    /// Root of per-version installs, the `svm` data directory when unset.
    pub svm_home: Option<PathBuf>,
    /// Image used in docker mode.
    pub docker_image: String,
    /// Wall-clock limit of one compiler run, in seconds.
    pub timeout: u64,
}

impl Default for SolcConfig {
    fn default() -> Self {
        Self {
            mode: SolcMode::Native,
            binary: None,
            svm_home: None,
            docker_image: "solc_select_solc".to_string(),
            timeout: 120,
        }
    }
}

impl SolcConfig {
    /// Returns a compiler runner with these settings.
    pub fn solc(&self) -> Solc {
        Solc::new(self.mode)
            .binary(self.binary.clone())
            .svm_home(self.svm_home.clone())
            .docker_image(&self.docker_image)
            .timeout(Duration::from_secs(self.timeout))
    }
}

/// Auto repair settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairConfig {
    /// Upper bound of compile/patch rounds per file.
    pub max_rounds: usize,
    /// Function headers whose bodies are commented out on a division-by-zero error.
    pub division_by_zero_signatures: Vec<String>,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            max_rounds: 50,
            division_by_zero_signatures: vec![
                "function payOwners() private canPayOwners".to_string(),
            ],
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bugs_dir: "bugs".into(),
            out: ".".into(),
            default_pragma: Version::new(0, 4, 25),
            legacy_caret_version: Version::new(0, 4, 26),
            jobs: 0,
            solc: SolcConfig::default(),
            repair: RepairConfig::default(),
            bug_types: BugType::defaults(),
            snippet_forms: SnippetForms::default(),
            transforms: Vec::new(),
            weakenings: Vec::new(),
        }
    }
}

impl Config {
    /// The name of the config file.
    pub const FILE_NAME: &'static str = "solidifi.toml";

    /// The prefix of environment variables.
    pub const ENV_PREFIX: &'static str = "SOLIDIFI_";

    /// Sections whose keys are flattened to `<SECTION>_<KEY>` in the environment.
    pub const NESTED_SECTIONS: &'static [&'static str] = &["solc", "repair", "snippet_forms"];

    /// Loads the config from `solidifi.toml` in the current directory and the environment.
    pub fn load() -> Result<Self, ExtractConfigError> {
        Self::try_from(Self::figment())
    }

    /// Loads the config from the given file and the environment.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, ExtractConfigError> {
        Self::try_from(Self::figment_with_file(path))
    }

    /// Attempts to extract a `Config` from `provider`.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use solidifi_config::{Config, figment::providers::{Format, Toml}};
    ///
    /// let figment = Config::figment().merge(Toml::file("other.toml"));
    /// let config = Config::try_from(figment);
    /// ```
    pub fn try_from<T: Provider>(provider: T) -> Result<Self, ExtractConfigError> {
        trace!("load config with provider: {:?}", provider.metadata());
        Figment::from(provider).extract::<Self>().map_err(ExtractConfigError::new)
    }

    /// Returns the default figment: defaults, `solidifi.toml`, then the environment.
    pub fn figment() -> Figment {
        Self::figment_with_file(Self::FILE_NAME)
    }

    /// Returns the default figment reading the TOML layer from `path`.
    ///
    /// A missing file contributes nothing.
    pub fn figment_with_file(path: impl AsRef<Path>) -> Figment {
        Figment::from(Self::default()).merge(Toml::file(path.as_ref())).merge(Self::env_provider())
    }

    fn env_provider() -> Env {
        Env::prefixed(Self::ENV_PREFIX).map(|key| {
            let key = key.as_str();
            let section = Self::NESTED_SECTIONS
                .iter()
                .find(|section| key.starts_with(&format!("{}_", section.to_ascii_uppercase())));
            match section {
                Some(section) => format!("{section}.{}", &key[section.len() + 1..]).into(),
                None => key.into(),
            }
        })
    }

    /// Returns the class named by `key`, an id or a case-insensitive name.
    pub fn bug_type(&self, key: &str) -> Option<&BugType> {
        self.bug_types.iter().find(|bug| bug.matches(key))
    }

    /// Transform rules of the given class.
    pub fn transforms_for<'a>(&'a self, bug: &'a BugType) -> impl Iterator<Item = &'a TransformRule> {
        self.transforms.iter().filter(move |rule| bug.matches(&rule.bug_type))
    }

    /// Weaken-security rules of the given class.
    pub fn weakenings_for<'a>(&'a self, bug: &'a BugType) -> impl Iterator<Item = &'a WeakenRule> {
        self.weakenings.iter().filter(move |rule| bug.matches(&rule.bug_type))
    }

    /// Number of worker threads to use for batch runs.
    pub fn jobs(&self) -> usize {
        if self.jobs == 0 {
            std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
        } else {
            self.jobs
        }
    }

    /// Serializes the config as TOML.
    pub fn to_string_pretty(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl Provider for Config {
    fn metadata(&self) -> Metadata {
        Metadata::named("SolidiFI Config")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, figment::Error> {
        Serialized::defaults(self).data()
    }
}
