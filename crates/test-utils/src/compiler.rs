use semver::Version;
use solidifi_common::{Compiler, CompilerOutput, SolcInput, errors::SolcError};
use std::{collections::VecDeque, sync::Mutex};

/// A [`Compiler`] that replays canned outputs in order and records every input it was given.
///
/// Running out of outputs is reported as a failed compiler run.
#[derive(Debug, Default)]
pub struct ScriptedCompiler {
    outputs: Mutex<VecDeque<CompilerOutput>>,
    inputs: Mutex<Vec<(Version, SolcInput)>>,
}

impl ScriptedCompiler {
    pub fn new(outputs: impl IntoIterator<Item = CompilerOutput>) -> Self {
        Self { outputs: Mutex::new(outputs.into_iter().collect()), ..Default::default() }
    }

    /// Queues another output.
    pub fn push(&self, output: CompilerOutput) {
        self.outputs.lock().unwrap().push_back(output);
    }

    /// All inputs compiled so far, in order.
    pub fn inputs(&self) -> Vec<(Version, SolcInput)> {
        self.inputs.lock().unwrap().clone()
    }

    /// The source text of the `n`th compiled input.
    pub fn source_of(&self, n: usize) -> Option<String> {
        let inputs = self.inputs.lock().unwrap();
        let (_, input) = inputs.get(n)?;
        input.sources.values().next().map(|source| source.content.clone())
    }

    pub fn calls(&self) -> usize {
        self.inputs.lock().unwrap().len()
    }

    pub fn remaining(&self) -> usize {
        self.outputs.lock().unwrap().len()
    }
}

impl Compiler for ScriptedCompiler {
    fn compile(&self, version: &Version, input: &SolcInput) -> Result<CompilerOutput, SolcError> {
        self.inputs.lock().unwrap().push((version.clone(), input.clone()));
        let output = self.outputs.lock().unwrap().pop_front();
        trace!(%version, source = ?input.source_name(), replayed = output.is_some(), "scripted compile");
        output.ok_or_else(|| SolcError::Exit {
            code: Some(1),
            stderr: "scripted compiler has no output left".to_string(),
        })
    }
}
