use serde_json::{Value, json};
use solidifi_common::{CompilerOutput, Diagnostic, compile::SourceOutput};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Writes `contents` to `dir/rel`, creating parent directories.
pub fn write_file(dir: &Path, rel: &str, contents: &str) -> PathBuf {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, contents).unwrap();
    path
}

/// Creates `<root>/<class_dir>/{ts,tf}` holding one file per fragment, named so that directory
/// order equals slice order. A form without fragments gets no directory.
pub fn snippet_library(root: &Path, class_dir: &str, statements: &[&str], blocks: &[&str]) {
    fs::create_dir_all(root.join(class_dir)).unwrap();
    for (form, fragments) in [("ts", statements), ("tf", blocks)] {
        if fragments.is_empty() {
            continue;
        }
        let dir = root.join(class_dir).join(form);
        fs::create_dir_all(&dir).unwrap();
        for (i, fragment) in fragments.iter().enumerate() {
            fs::write(dir.join(format!("snippet_{i:03}.sol")), fragment).unwrap();
        }
    }
}

/// An output without any diagnostics.
pub fn clean_output() -> CompilerOutput {
    CompilerOutput::default()
}

/// An output holding the given diagnostics.
pub fn output_with(diagnostics: impl IntoIterator<Item = Diagnostic>) -> CompilerOutput {
    CompilerOutput { errors: diagnostics.into_iter().collect(), ..Default::default() }
}

/// An AST-mode output for the source unit `name`.
pub fn ast_output(name: &str, ast: Value) -> CompilerOutput {
    let mut output = CompilerOutput::default();
    output
        .sources
        .insert(name.to_string(), SourceOutput { id: Some(0), ast: Some(ast), legacy_ast: None });
    output
}

/// Builds compact-AST JSON for a source text, locating nodes by the text they span.
#[derive(Debug)]
pub struct AstBuilder<'a> {
    source: &'a str,
    next_id: u64,
}

impl<'a> AstBuilder<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source, next_id: 1 }
    }

    /// A node of `kind` spanning the first occurrence of `fragment`.
    pub fn node(&mut self, kind: &str, fragment: &str, children: Vec<Value>) -> Value {
        self.nth(kind, fragment, 0, children)
    }

    /// A node of `kind` spanning the `n`th occurrence of `fragment`.
    pub fn nth(&mut self, kind: &str, fragment: &str, n: usize, children: Vec<Value>) -> Value {
        let start = self
            .source
            .match_indices(fragment)
            .nth(n)
            .map(|(start, _)| start)
            .unwrap_or_else(|| panic!("`{fragment}` occurs less than {} times", n + 1));
        self.span(kind, start, fragment.len(), children)
    }

    /// A node of `kind` spanning `length` bytes from `start`.
    pub fn span(&mut self, kind: &str, start: usize, length: usize, children: Vec<Value>) -> Value {
        let id = self.next_id;
        self.next_id += 1;
        json!({
            "id": id,
            "nodeType": kind,
            "src": format!("{start}:{length}:0"),
            "nodes": children,
        })
    }

    /// The `SourceUnit` spanning the whole source.
    pub fn unit(&mut self, children: Vec<Value>) -> Value {
        self.span("SourceUnit", 0, self.source.len(), children)
    }
}
