use crate::opts::ConfigOpts;
use clap::Parser;
use eyre::Result;

/// CLI arguments for `solidifi config`.
#[derive(Clone, Debug, Parser)]
pub struct ConfigArgs {
    #[command(flatten)]
    pub config: ConfigOpts,
}

impl ConfigArgs {
    /// Prints the merged configuration as TOML.
    pub fn run(self) -> Result<()> {
        let config = self.config.load_config(&self.config)?;
        print!("{}", config.to_string_pretty()?);
        Ok(())
    }
}
