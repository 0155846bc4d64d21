//! The directory-backed library of vulnerable code fragments.

use crate::error::SnippetError;
use solidifi_common::fs;
use solidifi_config::{BugType, SnippetForms};
use std::{
    collections::VecDeque,
    fmt,
    path::{Path, PathBuf},
};

/// How a fragment is placed relative to its injection site.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SnippetForm {
    /// Inserted before a statement-level node.
    Statement,
    /// Inserted after a block, function or modifier.
    Block,
}

impl SnippetForm {
    /// Forms in the order they are injected.
    pub const ALL: [Self; 2] = [Self::Statement, Self::Block];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Statement => "statement",
            Self::Block => "block",
        }
    }

    fn configured_dir<'a>(&self, forms: &'a SnippetForms) -> &'a str {
        match self {
            Self::Statement => &forms.statement,
            Self::Block => &forms.block,
        }
    }

    const fn fallback_dir(&self) -> &'static str {
        match self {
            Self::Statement => "statement-form",
            Self::Block => "block-form",
        }
    }
}

impl fmt::Display for SnippetForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single fragment file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snippet {
    pub path: PathBuf,
    pub text: String,
}

impl Snippet {
    /// The fragment without surrounding whitespace, as it is inserted.
    pub fn fragment(&self) -> &str {
        self.text.trim()
    }

    /// Number of lines of [`Self::fragment`].
    pub fn lines(&self) -> usize {
        self.fragment().lines().count()
    }
}

/// The fragments of one form, consumed front to back. A fragment is popped only once it was
/// injected.
#[derive(Clone, Debug)]
pub struct SnippetQueue {
    form: SnippetForm,
    total: usize,
    fragments: VecDeque<Snippet>,
}

impl SnippetQueue {
    pub fn new(form: SnippetForm, fragments: impl IntoIterator<Item = Snippet>) -> Self {
        let fragments: VecDeque<_> = fragments.into_iter().collect();
        Self { form, total: fragments.len(), fragments }
    }

    pub fn form(&self) -> SnippetForm {
        self.form
    }

    pub fn peek(&self) -> Option<&Snippet> {
        self.fragments.front()
    }

    pub fn pop(&mut self) -> Option<Snippet> {
        self.fragments.pop_front()
    }

    pub fn remaining(&self) -> usize {
        self.fragments.len()
    }

    pub fn consumed(&self) -> usize {
        self.total - self.fragments.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.fragments.is_empty()
    }
}

/// The fragments of one bug type: `<bugs_dir>/<class dir>/<form dir>/*`, in file name order.
///
/// A form whose directory is missing is skipped. Hidden and empty files are ignored.
#[derive(Clone, Debug)]
pub struct SnippetLibrary {
    dir: PathBuf,
    statement: Option<Vec<Snippet>>,
    block: Option<Vec<Snippet>>,
}

impl SnippetLibrary {
    /// Reads all fragments of `bug`.
    pub fn load(
        bugs_dir: impl AsRef<Path>,
        bug: &BugType,
        forms: &SnippetForms,
    ) -> Result<Self, SnippetError> {
        let dir = bugs_dir.as_ref().join(&bug.dir);
        if !dir.is_dir() {
            return Err(SnippetError::MissingClass { bug_type: bug.name.clone(), dir });
        }
        let statement = load_form(&dir, SnippetForm::Statement, forms)?;
        let block = load_form(&dir, SnippetForm::Block, forms)?;
        Ok(Self { dir, statement, block })
    }

    /// The class directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// A fresh queue over the fragments of `form`, `None` if the form has no directory.
    pub fn queue(&self, form: SnippetForm) -> Option<SnippetQueue> {
        self.fragments(form).map(|fragments| SnippetQueue::new(form, fragments.iter().cloned()))
    }

    pub fn fragments(&self, form: SnippetForm) -> Option<&[Snippet]> {
        match form {
            SnippetForm::Statement => self.statement.as_deref(),
            SnippetForm::Block => self.block.as_deref(),
        }
    }

    /// Total number of fragments over both forms.
    pub fn len(&self) -> usize {
        SnippetForm::ALL.iter().filter_map(|form| self.fragments(*form)).map(<[_]>::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn load_form(
    class_dir: &Path,
    form: SnippetForm,
    forms: &SnippetForms,
) -> Result<Option<Vec<Snippet>>, SnippetError> {
    let Some(dir) = [form.configured_dir(forms), form.fallback_dir()]
        .into_iter()
        .map(|name| class_dir.join(name))
        .find(|dir| dir.is_dir())
    else {
        debug!(target: "solidifi::inject", dir = %class_dir.display(), %form, "no snippet directory");
        return Ok(None);
    };

    let mut fragments = Vec::new();
    for path in fs::files_sorted(&dir)? {
        let text = fs::read_to_string(&path)?;
        if text.trim().is_empty() {
            warn!(target: "solidifi::inject", path = %path.display(), "skipping empty snippet");
            continue;
        }
        fragments.push(Snippet { path, text });
    }
    Ok(Some(fragments))
}
