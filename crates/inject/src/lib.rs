//! # solidifi-inject
//!
//! Injects pre-authored vulnerable code snippets into Solidity sources.
//!
//! The [`InjectionPointScanner`] derives candidate sites from the compiler AST, the
//! [`OffsetTracker`] maps them onto the mutated text and keeps the [`BugLog`] in step, and the
//! [`BugInjector`] ties both to the repair pipeline and the [`SnippetLibrary`].

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

pub mod ast;
pub use ast::{AstNode, SrcSpan};

mod error;
pub use error::{InjectError, SnippetError};

mod injector;
pub use injector::{BugInjector, InjectionReport};

pub mod report;
pub use report::{Approach, BugLog, BugLogEntry};

pub mod scanner;
pub use scanner::{InjectionPointScanner, InjectionSite, Placement, SiteKind};

pub mod snippets;
pub use snippets::{Snippet, SnippetForm, SnippetLibrary, SnippetQueue};

pub mod tracker;
pub use tracker::{Injection, OffsetTracker, Relocated};

pub mod transform;
