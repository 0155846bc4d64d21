//! Solidity standard-json input and output, and the [`Compiler`] seam.

use crate::errors::SolcError;
pub use foundry_compilers::artifacts::{SecondarySourceLocation, Severity, SourceLocation};
use regex::Regex;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, sync::Arc, sync::LazyLock};

/// Output selection requesting diagnostics plus enough artifacts to force code generation.
const DIAGNOSTICS_SELECTION: &[&str] = &["abi", "evm.bytecode.object"];

/// Output selection requesting the per-source AST, both the modern and the pre-0.4.12 format.
const AST_SELECTION: &[&str] = &["ast", "legacyAST"];

static FORMATTED_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.sol:(\d+):\d+:").unwrap());

/// Something that turns a standard-json input into a standard-json output.
///
/// Implemented by [`Solc`](crate::Solc) and by test doubles.
pub trait Compiler: Send + Sync {
    /// Compiles `input` with the given compiler `version`.
    fn compile(&self, version: &Version, input: &SolcInput) -> Result<CompilerOutput, SolcError>;
}

impl<C: Compiler + ?Sized> Compiler for &C {
    fn compile(&self, version: &Version, input: &SolcInput) -> Result<CompilerOutput, SolcError> {
        (**self).compile(version, input)
    }
}

impl<C: Compiler + ?Sized> Compiler for Arc<C> {
    fn compile(&self, version: &Version, input: &SolcInput) -> Result<CompilerOutput, SolcError> {
        (**self).compile(version, input)
    }
}

impl<C: Compiler + ?Sized> Compiler for Box<C> {
    fn compile(&self, version: &Version, input: &SolcInput) -> Result<CompilerOutput, SolcError> {
        (**self).compile(version, input)
    }
}

/// A standard-json compiler input holding a single source unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolcInput {
    /// Always `Solidity`.
    pub language: String,
    /// Source units by name.
    pub sources: BTreeMap<String, Source>,
    /// Compiler settings.
    pub settings: Settings,
}

impl SolcInput {
    /// Creates an input that only asks for diagnostics.
    pub fn diagnostics(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(name, content, "*", DIAGNOSTICS_SELECTION)
    }

    /// Creates an input that asks for the AST of the source unit.
    pub fn ast(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(name, content, "", AST_SELECTION)
    }

    fn new(
        name: impl Into<String>,
        content: impl Into<String>,
        contract: &str,
        outputs: &[&str],
    ) -> Self {
        let sources = BTreeMap::from([(name.into(), Source { content: content.into() })]);
        let per_contract =
            BTreeMap::from([(contract.to_string(), outputs.iter().map(|s| s.to_string()).collect())]);
        let output_selection = BTreeMap::from([("*".to_string(), per_contract)]);
        Self { language: "Solidity".to_string(), sources, settings: Settings { output_selection } }
    }

    /// Returns the name of the first source unit.
    pub fn source_name(&self) -> Option<&str> {
        self.sources.keys().next().map(String::as_str)
    }
}

/// Content of a single source unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// The source text.
    pub content: String,
}

/// The subset of compiler settings used here.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// `file -> contract -> [outputs]`.
    pub output_selection: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

/// A standard-json compiler output.
///
/// Sources are kept as raw JSON since compilers before 0.4.12 only emit `legacyAST`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CompilerOutput {
    /// Diagnostics of all severities.
    #[serde(default)]
    pub errors: Vec<Diagnostic>,
    /// Per-source outputs.
    #[serde(default)]
    pub sources: BTreeMap<String, SourceOutput>,
}

impl CompilerOutput {
    /// Returns an iterator over all error-severity diagnostics.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.errors.iter().filter(|d| d.severity.is_error())
    }

    /// Whether there is at least one error-severity diagnostic.
    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    /// Returns the AST of `source`, preferring the modern `ast` over `legacyAST`.
    pub fn ast(&self, source: &str) -> Option<&serde_json::Value> {
        let out = self.sources.get(source)?;
        out.ast.as_ref().or(out.legacy_ast.as_ref())
    }
}

/// Per-source compiler output.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceOutput {
    /// The source unit id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    /// The compact AST.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ast: Option<serde_json::Value>,
    /// The legacy AST produced by older compilers.
    #[serde(default, rename = "legacyAST", skip_serializing_if = "Option::is_none")]
    pub legacy_ast: Option<serde_json::Value>,
}

/// A single compiler diagnostic, as found in the `errors` array of the output.
pub type Diagnostic = foundry_compilers::artifacts::Error;

/// Construction and lookup helpers for [`Diagnostic`].
pub trait DiagnosticExt: Sized {
    /// Creates an error-severity diagnostic of the given `type` without location.
    fn error(kind: impl Into<String>, message: impl Into<String>) -> Self;

    /// Sets the formatted message.
    #[must_use]
    fn with_formatted(self, formatted: impl Into<String>) -> Self;

    /// Sets the primary source location.
    #[must_use]
    fn with_location(self, file: impl Into<String>, start: i32, end: i32) -> Self;

    /// The formatted message if present, the short message otherwise.
    fn formatted(&self) -> &str;

    /// The source file the diagnostic points into, if any.
    fn source_file(&self) -> Option<&str>;

    /// Returns the 1-based line the diagnostic points to in `source`.
    ///
    /// Uses the byte offset of the primary location if present, otherwise the
    /// `<file>.sol:<line>:<col>:` marker of the formatted message.
    fn line(&self, source: &str) -> Option<usize>;
}

impl DiagnosticExt for Diagnostic {
    fn error(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source_location: None,
            secondary_source_locations: Vec::new(),
            r#type: kind.into(),
            component: "general".to_string(),
            severity: Severity::Error,
            error_code: None,
            message: message.into(),
            formatted_message: None,
        }
    }

    fn with_formatted(mut self, formatted: impl Into<String>) -> Self {
        self.formatted_message = Some(formatted.into());
        self
    }

    fn with_location(mut self, file: impl Into<String>, start: i32, end: i32) -> Self {
        self.source_location = Some(SourceLocation { file: file.into(), start, end });
        self
    }

    fn formatted(&self) -> &str {
        self.formatted_message.as_deref().unwrap_or(&self.message)
    }

    fn source_file(&self) -> Option<&str> {
        self.source_location.as_ref().map(|loc| loc.file.as_str())
    }

    fn line(&self, source: &str) -> Option<usize> {
        if let Some(loc) = &self.source_location
            && let Ok(start) = usize::try_from(loc.start)
        {
            return Some(line_of_offset(source, start));
        }
        let caps = FORMATTED_LINE.captures(self.formatted_message.as_deref()?)?;
        caps[1].parse().ok()
    }
}

/// Returns the 1-based line number of the byte `offset` in `source`.
///
/// Offsets past the end are clamped to the last line.
pub fn line_of_offset(source: &str, offset: usize) -> usize {
    let end = offset.min(source.len());
    source.as_bytes()[..end].iter().filter(|b| **b == b'\n').count() + 1
}
