//! # solidifi-repair
//!
//! Brings a Solidity source file into a state a pinned compiler version accepts:
//!
//! - [`VersionResolver`] finds, repairs or synthesizes the `pragma solidity` declaration.
//! - [`classify`] maps compiler diagnostics onto a closed set of [`DiagnosticCategory`]s.
//! - [`patches`] holds one pure text patch per category.
//! - [`AutoRepairEngine`] runs the bounded compile, classify, patch loop.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

pub mod diagnostic;
pub use diagnostic::{DiagnosticCategory, classify};

mod engine;
pub use engine::{
    AppliedPatch, AutoRepairEngine, Converged, DEFAULT_MAX_ROUNDS, RepairError, RepairOutcome,
};

pub mod normalize;

pub mod patches;
pub use patches::PatchError;

pub mod scan;

mod source;
pub use source::SourceFile;

pub mod version;
pub use version::{Resolution, ResolveAction, VersionError, VersionResolver, VersionTag};
