//! # solidifi-cli
//!
//! The `solidifi` command line: batch drivers for bug injection and legacy cleaning, the `eyre`
//! report handler and the tracing subscriber.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

pub mod args;
pub mod cmd;
pub mod handler;
pub mod opts;
pub mod utils;
