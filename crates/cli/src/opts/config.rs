use clap::Parser;
use eyre::{Result, WrapErr};
use figment::{
    Figment, Metadata, Profile, Provider,
    error::Kind::InvalidType,
    value::{Dict, Map, Value},
};
use serde::Serialize;
use solidifi_common::SolcMode;
use solidifi_config::Config;
use std::path::PathBuf;

/// Options shared by every command that reads the configuration.
#[derive(Clone, Debug, Default, Serialize, Parser)]
#[command(next_help_heading = "Config options")]
pub struct ConfigOpts {
    /// Path to the config file.
    ///
    /// Defaults to `solidifi.toml` in the current directory.
    #[arg(long, value_name = "FILE")]
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// Number of files processed in parallel.
    ///
    /// Defaults to one per CPU.
    #[arg(long, short, value_name = "N")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,
}

impl ConfigOpts {
    /// Returns the figment of the selected config file and the environment.
    pub fn figment(&self) -> Result<Figment> {
        match &self.config {
            Some(path) => {
                eyre::ensure!(path.is_file(), "config file `{}` does not exist", path.display());
                Ok(Config::figment_with_file(path))
            }
            None => Ok(Config::figment()),
        }
    }

    /// Loads the config, with the values of `args` taking precedence over file and environment.
    pub fn load_config<P: Provider>(&self, args: P) -> Result<Config> {
        let figment = self.figment()?.merge(args);
        Config::try_from(figment).wrap_err("failed to load the configuration")
    }
}

impl Provider for ConfigOpts {
    fn metadata(&self) -> Metadata {
        Metadata::named("Config Args Provider")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, figment::Error> {
        let value = Value::serialize(self)?;
        let error = InvalidType(value.to_actual(), "map".into());
        let dict = value.into_dict().ok_or(error)?;
        Ok(Map::from([(Profile::Default, dict)]))
    }
}

/// Compiler selection, merged into the `solc` section of the config.
#[derive(Clone, Debug, Default, Parser)]
#[command(next_help_heading = "Compiler options")]
pub struct CompilerOpts {
    /// Run `solc-select` inside the configured docker image instead of a local binary.
    #[arg(long)]
    pub docker: bool,

    /// Use this solc binary for every version.
    #[arg(long, value_name = "PATH", conflicts_with = "docker")]
    pub solc: Option<PathBuf>,
}

impl CompilerOpts {
    /// The `solc` section overrides set on the command line.
    pub fn dict(&self) -> Result<Dict, figment::Error> {
        let mut dict = Dict::new();
        if self.docker {
            dict.insert("mode".to_string(), Value::serialize(SolcMode::Docker)?);
        }
        if let Some(solc) = &self.solc {
            dict.insert("mode".to_string(), Value::serialize(SolcMode::Native)?);
            dict.insert("binary".to_string(), Value::serialize(solc)?);
        }
        Ok(dict)
    }
}
