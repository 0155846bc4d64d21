use crate::{
    diagnostic::{DiagnosticCategory, classify},
    patches::{self, PatchContext, PatchError},
    source::SourceFile,
    version::{ResolveAction, VersionError, VersionResolver},
};
use semver::Version;
use solidifi_common::{
    Compiler, CompilerOutput, DiagnosticExt, SolcInput,
    errors::{FsPathError, SolcError},
};

/// Default cap on the number of patch rounds.
pub const DEFAULT_MAX_ROUNDS: usize = 50;

/// The result of [`AutoRepairEngine::repair`].
pub type RepairOutcome = Result<Converged, RepairError>;

/// Reasons a source file cannot be brought to a compiling state.
#[derive(Debug, thiserror::Error)]
pub enum RepairError {
    /// The pragma could not be resolved.
    #[error(transparent)]
    Version(#[from] VersionError),
    /// The compiler could not be run or returned garbage.
    #[error(transparent)]
    Compiler(#[from] SolcError),
    /// A synthesized pragma could not be written back.
    #[error(transparent)]
    Fs(#[from] FsPathError),
    /// An error diagnostic outside the known categories.
    #[error("round {round}: unrecoverable diagnostic: {message}")]
    UnknownDiagnostic {
        /// The patch round the diagnostic was reported in.
        round: usize,
        /// The formatted diagnostic.
        message: String,
    },
    /// The patch for a known category did not apply.
    #[error("round {round}: failed to apply `{category}` patch")]
    Patch {
        /// The patch round.
        round: usize,
        /// Name of the diagnostic category.
        category: &'static str,
        /// Why the patch failed.
        #[source]
        source: PatchError,
    },
    /// Errors remained after the maximum number of patch rounds.
    #[error("source still has errors after {0} repair rounds")]
    RoundLimit(usize),
}

/// A patch applied during a repair run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppliedPatch {
    /// 1-based patch round.
    pub round: usize,
    /// The repaired diagnostic.
    pub category: DiagnosticCategory,
    /// The reported line, if any.
    pub line: Option<usize>,
}

/// A source that compiles without errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Converged {
    /// The repaired text.
    pub source: String,
    /// The compiler version it compiles with.
    pub version: Version,
    /// What the version resolver did to the pragma.
    pub pragma: ResolveAction,
    /// Number of patch rounds, zero for a source that compiled right away.
    pub rounds: usize,
    /// The patches, in application order.
    pub patches: Vec<AppliedPatch>,
}

/// Repair loop states.
#[derive(Debug)]
enum State {
    Compiling,
    Classifying(CompilerOutput),
    Patching { category: DiagnosticCategory, line: Option<usize> },
    Converged,
}

/// Drives the compile, classify, patch loop until the source compiles.
///
/// Every round patches the first error-severity diagnostic only and recompiles, since a patch
/// moves code and invalidates the locations of all later diagnostics of the same batch.
#[derive(Clone, Debug)]
pub struct AutoRepairEngine<C> {
    compiler: C,
    resolver: VersionResolver,
    max_rounds: usize,
    division_by_zero_signatures: Vec<String>,
}

impl<C: Compiler> AutoRepairEngine<C> {
    /// Creates an engine with the default resolver and round cap.
    pub fn new(compiler: C) -> Self {
        Self {
            compiler,
            resolver: VersionResolver::default(),
            max_rounds: DEFAULT_MAX_ROUNDS,
            division_by_zero_signatures: Vec::new(),
        }
    }

    /// Sets the pragma resolver.
    #[must_use]
    pub fn resolver(mut self, resolver: VersionResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Sets the maximum number of patch rounds.
    #[must_use]
    pub fn max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// Sets the function headers whose bodies are commented out on a division by zero.
    #[must_use]
    pub fn division_by_zero_signatures(mut self, signatures: Vec<String>) -> Self {
        self.division_by_zero_signatures = signatures;
        self
    }

    pub fn compiler(&self) -> &C {
        &self.compiler
    }

    pub fn version_resolver(&self) -> &VersionResolver {
        &self.resolver
    }

    /// Resolves the pragma of `file`, then repairs its text in memory.
    ///
    /// A synthesized pragma is persisted to disk; the repaired text is not.
    pub fn repair_file(&self, file: &mut SourceFile) -> RepairOutcome {
        file.resolve_version(&self.resolver)?;
        let converged = self.repair(&file.name(), file.text())?;
        file.set_text(converged.source.clone());
        Ok(converged)
    }

    /// Repairs `text`, compiled as the source unit `name`.
    pub fn repair(&self, name: &str, text: &str) -> RepairOutcome {
        let resolution = self.resolver.resolve(text)?;
        let version = resolution.compiler;
        let mut buffer = resolution.text;
        let cx = PatchContext { division_by_zero_signatures: &self.division_by_zero_signatures };

        let mut round = 0;
        let mut applied = Vec::new();
        let mut state = State::Compiling;
        loop {
            state = match state {
                State::Compiling => {
                    let input = SolcInput::diagnostics(name, buffer.as_str());
                    State::Classifying(self.compiler.compile(&version, &input)?)
                }
                State::Classifying(output) => match output.errors().next() {
                    None => State::Converged,
                    Some(_) if round == self.max_rounds => {
                        return Err(RepairError::RoundLimit(self.max_rounds));
                    }
                    Some(diagnostic) => {
                        round += 1;
                        let category = classify(diagnostic, &buffer);
                        debug!(target: "solidifi::repair", round, %category, "{}", diagnostic.message);
                        if !category.is_known() {
                            return Err(RepairError::UnknownDiagnostic {
                                round,
                                message: diagnostic.formatted().trim().to_string(),
                            });
                        }
                        State::Patching { line: diagnostic.line(&buffer), category }
                    }
                },
                State::Patching { category, line } => {
                    buffer = patches::apply(&category, &buffer, &cx).map_err(|source| {
                        RepairError::Patch { round, category: category.name(), source }
                    })?;
                    debug!(target: "solidifi::repair", round, %category, ?line, "applied patch");
                    applied.push(AppliedPatch { round, category, line });
                    State::Compiling
                }
                State::Converged => {
                    debug!(target: "solidifi::repair", rounds = round, %version, "converged");
                    return Ok(Converged {
                        source: buffer,
                        version,
                        pragma: resolution.action,
                        rounds: round,
                        patches: applied,
                    });
                }
            };
        }
    }
}
