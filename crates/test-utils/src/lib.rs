#![warn(unused_crate_dependencies, unreachable_pub)]

#[macro_use]
extern crate tracing;

mod compiler;
pub use compiler::ScriptedCompiler;

// Helpers for writing source files, snippet libraries and canned compiler outputs.
pub mod fixtures;
pub use fixtures::AstBuilder;

/// Initializes tracing for tests.
pub fn init_tracing() {
    let _ = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
