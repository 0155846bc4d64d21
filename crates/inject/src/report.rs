//! The bug log: where each injected bug ended up in the buggy file.

use solidifi_common::{errors::FsPathError, fs};
use std::{borrow::Cow, fmt, path::Path};

/// CSV header of a bug log.
pub const CSV_HEADER: &str = "loc,length,bug type,approach";

/// How a bug was introduced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Approach {
    /// A fragment from the snippet library was inserted.
    SnippetInjection,
    /// Secure code was rewritten into a vulnerable variant.
    CodeTransform,
    /// A `revert();` guard was commented out.
    WeakeningSecurity,
}

impl Approach {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SnippetInjection => "code snippet injection",
            Self::CodeTransform => "code transform",
            Self::WeakeningSecurity => "weakening security",
        }
    }
}

impl fmt::Display for Approach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One injected bug.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BugLogEntry {
    /// 1-based line of the first line of the bug in the final file.
    pub line: usize,
    /// Number of lines of the bug.
    pub length: usize,
    pub bug_type: String,
    pub approach: Approach,
}

impl BugLogEntry {
    pub fn new(line: usize, length: usize, bug_type: impl Into<String>, approach: Approach) -> Self {
        Self { line, length, bug_type: bug_type.into(), approach }
    }
}

/// Insertion-ordered log of injected bugs.
///
/// Next to each entry the log keeps the byte offset its bug starts at in the current text.
/// Every edit of the text must be reported through [`BugLog::shift`] so that lines and offsets
/// keep referring to the current text.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BugLog {
    entries: Vec<BugLogEntry>,
    offsets: Vec<usize>,
}

impl BugLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `entry`, whose bug starts at byte `offset` of the current text.
    pub fn push(&mut self, offset: usize, entry: BugLogEntry) {
        self.entries.push(entry);
        self.offsets.push(offset);
    }

    /// Moves every entry starting at or after byte `from` by `bytes` bytes and `lines` lines.
    ///
    /// Entries before `from` are left alone, even when they sit on the same line.
    pub fn shift(&mut self, from: usize, bytes: isize, lines: isize) {
        for (entry, offset) in self.entries.iter_mut().zip(&mut self.offsets) {
            if *offset >= from {
                *offset = offset.saturating_add_signed(bytes);
                entry.line = entry.line.saturating_add_signed(lines);
            }
        }
    }

    /// Byte offsets of the entries in the current text, in log order.
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    pub fn entries(&self) -> &[BugLogEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &BugLogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries made with `approach`.
    pub fn count(&self, approach: Approach) -> usize {
        self.entries.iter().filter(|entry| entry.approach == approach).count()
    }

    /// Renders the log as CSV, header included.
    pub fn to_csv(&self) -> String {
        let mut out = String::from(CSV_HEADER);
        out.push('\n');
        for entry in &self.entries {
            out.push_str(&format!(
                "{},{},{},{}\n",
                entry.line,
                entry.length,
                csv_field(&entry.bug_type),
                csv_field(entry.approach.as_str())
            ));
        }
        out
    }

    /// Writes the CSV rendering to `path`.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<(), FsPathError> {
        fs::write(path, self.to_csv())
    }
}

fn csv_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}
