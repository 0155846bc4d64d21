mod config;
pub use config::{CompilerOpts, ConfigOpts};

mod shell;
pub use shell::{ColorChoice, ShellOptions};
