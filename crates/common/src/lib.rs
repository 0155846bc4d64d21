//! Common utilities for the SolidiFI tools.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![warn(missing_docs)]

#[macro_use]
extern crate tracing;

pub mod compile;
pub mod errors;
pub mod fs;
pub mod solc;
pub mod term;

pub use compile::{Compiler, CompilerOutput, Diagnostic, DiagnosticExt, Severity, SolcInput};
pub use solc::{Solc, SolcMode};
