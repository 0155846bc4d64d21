use clap::{Parser, ValueEnum};
use tracing_subscriber::filter::LevelFilter;

/// Global shell options.
#[derive(Clone, Copy, Debug, Default, Parser)]
pub struct ShellOptions {
    /// Use verbose output.
    #[arg(long, short, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Do not print log messages.
    #[arg(long, short, global = true, alias = "silent", conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log messages coloring.
    #[arg(long, global = true, value_enum)]
    pub color: Option<ColorChoice>,
}

impl ShellOptions {
    /// The log level selected by the flags, if any.
    ///
    /// `None` leaves the filter to `RUST_LOG`.
    pub fn log_level(self) -> Option<LevelFilter> {
        match (self.verbose, self.quiet) {
            (true, _) => Some(LevelFilter::DEBUG),
            (false, true) => Some(LevelFilter::ERROR),
            (false, false) => None,
        }
    }

    /// Whether a progress bar should be drawn.
    pub fn progress(self) -> bool {
        !self.quiet
    }
}

/// When to color the output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Color when writing to a terminal that supports it.
    #[default]
    Auto,
    /// Always color.
    Always,
    /// Never color.
    Never,
}

impl ColorChoice {
    /// Applies the choice to all `yansi` painting.
    pub fn apply(self) {
        match self {
            Self::Auto => yansi::whenever(yansi::Condition::TTY_AND_COLOR),
            Self::Always => yansi::enable(),
            Self::Never => yansi::disable(),
        }
    }
}
