use crate::{
    cmd::{clean::CleanArgs, config::ConfigArgs, inject::InjectArgs},
    handler,
    opts::ShellOptions,
    utils,
};
use clap::{Parser, Subcommand};
use eyre::Result;

/// Generate labeled vulnerable variants of Solidity contracts.
#[derive(Debug, Parser)]
#[command(name = "solidifi", version, next_display_order = None)]
pub struct Solidifi {
    #[command(flatten)]
    pub shell: ShellOptions,

    #[command(subcommand)]
    pub cmd: SolidifiSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum SolidifiSubcommand {
    /// Repair Solidity files until they compile, then inject bugs of one class.
    #[command(visible_alias = "i")]
    Inject(InjectArgs),

    /// Resolve the pragma and rewrite legacy constructors and `emit`s in place.
    Clean(CleanArgs),

    /// Print the merged configuration.
    Config(ConfigArgs),
}

/// Run the `solidifi` command-line interface.
pub fn run() -> Result<()> {
    handler::install();
    let args = Solidifi::parse();
    utils::subscriber(args.shell.log_level());
    args.shell.color.unwrap_or_default().apply();
    run_command(args)
}

/// Run the subcommand.
pub fn run_command(args: Solidifi) -> Result<()> {
    let shell = args.shell;
    match args.cmd {
        SolidifiSubcommand::Inject(cmd) => cmd.run(shell),
        SolidifiSubcommand::Clean(cmd) => cmd.run(shell),
        SolidifiSubcommand::Config(cmd) => cmd.run(),
    }
}
