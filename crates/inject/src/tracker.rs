//! Maps injection sites computed on the pristine source onto the mutated text.

use crate::{
    ast::SrcSpan,
    report::{Approach, BugLog, BugLogEntry},
    scanner::{InjectionSite, Placement},
};
use solidifi_common::compile::line_of_offset;
use std::{collections::BTreeSet, ops::Range};

/// Where a pristine span was found in the current text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Relocated {
    /// Start offset in the current text.
    pub start: usize,
    /// Exclusive end offset in the current text.
    pub end: usize,
    /// 1-based line of `start`.
    pub line: usize,
}

/// The result of [`OffsetTracker::inject`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Injection {
    /// The fragment was inserted and logged.
    Injected(BugLogEntry),
    /// The site's text no longer occurs in the current text.
    NotFound,
    /// Another fragment was already injected at the site's offset.
    AlreadyUsed,
}

impl Injection {
    pub fn is_injected(&self) -> bool {
        matches!(self, Self::Injected(_))
    }
}

/// Owns the pristine and the current text of one file plus its [`BugLog`].
///
/// Sites are located by searching the current text for the exact text they spanned in the
/// pristine source, so they survive earlier insertions and rewrites.
#[derive(Clone, Debug)]
pub struct OffsetTracker {
    pristine: String,
    current: String,
    log: BugLog,
    used: BTreeSet<usize>,
}

impl OffsetTracker {
    /// Tracks `source`, which is both the pristine and the current text.
    pub fn new(source: impl Into<String>) -> Self {
        let pristine = source.into();
        Self::with_current(pristine.clone(), pristine)
    }

    /// Tracks a `current` text that was already derived from `pristine`.
    pub fn with_current(pristine: impl Into<String>, current: impl Into<String>) -> Self {
        Self {
            pristine: pristine.into(),
            current: current.into(),
            log: BugLog::new(),
            used: BTreeSet::new(),
        }
    }

    pub fn pristine(&self) -> &str {
        &self.pristine
    }

    pub fn text(&self) -> &str {
        &self.current
    }

    pub fn log(&self) -> &BugLog {
        &self.log
    }

    /// Raw pristine offsets consumed so far.
    pub fn used_offsets(&self) -> &BTreeSet<usize> {
        &self.used
    }

    /// Finds the first occurrence of the pristine text of `span` in the current text.
    pub fn relocate(&self, span: SrcSpan) -> Option<Relocated> {
        let snippet = self.pristine.get(span.start..span.start + span.length)?;
        if snippet.is_empty() {
            return None;
        }
        let start = self.current.find(snippet)?;
        Some(Relocated {
            start,
            end: start + snippet.len(),
            line: line_of_offset(&self.current, start),
        })
    }

    /// Inserts `fragment` at `site` and logs it as a `bug_type` snippet injection.
    ///
    /// Entries starting at or after the insertion offset are shifted before the new entry is
    /// appended.
    pub fn inject(&mut self, site: &InjectionSite, fragment: &str, bug_type: &str) -> Injection {
        let key = site.offset_key();
        if self.used.contains(&key) {
            trace!(target: "solidifi::inject", node = site.node, key, "offset already used");
            return Injection::AlreadyUsed;
        }
        let Some(at) = self.relocate(site.span) else {
            debug!(target: "solidifi::inject", node = site.node, kind = %site.kind, span = %site.span, "site not found in current text");
            return Injection::NotFound;
        };

        let fragment = fragment.trim();
        let length = fragment.lines().count();
        let (offset, text, start) = match site.placement() {
            Placement::Before => (at.start, format!("{fragment}\n"), at.start),
            Placement::After => (at.end, format!("\n{fragment}"), at.end + 1),
        };
        self.splice(offset..offset, &text);

        let line = line_of_offset(&self.current, start);
        let entry = BugLogEntry::new(line, length, bug_type, Approach::SnippetInjection);
        self.log.push(start, entry.clone());
        self.used.insert(key);
        trace!(target: "solidifi::inject", node = site.node, kind = %site.kind, line, length, "injected");
        Injection::Injected(entry)
    }

    /// Replaces `range` of the current text by `replacement` and logs a single-line entry at
    /// the start of the range.
    pub fn rewrite(
        &mut self,
        range: Range<usize>,
        replacement: &str,
        bug_type: &str,
        approach: Approach,
    ) -> BugLogEntry {
        let start = range.start;
        self.splice(range, replacement);
        let entry = BugLogEntry::new(line_of_offset(&self.current, start), 1, bug_type, approach);
        self.log.push(start, entry.clone());
        entry
    }

    /// Replaces `range` of the current text, moving the logged entries that follow it.
    pub(crate) fn splice(&mut self, range: Range<usize>, replacement: &str) {
        let removed = &self.current[range.clone()];
        let lines = newlines(replacement) as isize - newlines(removed) as isize;
        let bytes = replacement.len() as isize - removed.len() as isize;
        self.current.replace_range(range.clone(), replacement);
        self.log.shift(range.end, bytes, lines);
    }

    pub fn into_parts(self) -> (String, BugLog) {
        (self.current, self.log)
    }
}

fn newlines(text: &str) -> usize {
    text.bytes().filter(|b| *b == b'\n').count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::SiteKind;
    use similar_asserts::assert_eq;

    const SRC: &str = "\
contract A {
    uint x;
    function f() public {
        x = 1;
    }
}
";

    fn site(kind: SiteKind, fragment: &str) -> InjectionSite {
        let start = SRC.find(fragment).unwrap();
        InjectionSite { kind, node: start as i64, span: SrcSpan::new(start, fragment.len()) }
    }

    fn line(text: &str, n: usize) -> &str {
        text.lines().nth(n - 1).unwrap()
    }

    #[test]
    fn inserts_before_statements() {
        let mut tracker = OffsetTracker::new(SRC);
        let injection = tracker.inject(
            &site(SiteKind::VariableDeclaration, "uint x"),
            "\nuint bug1;\nuint bug2;\n",
            "TOD",
        );
        assert_eq!(injection, Injection::Injected(BugLogEntry::new(2, 2, "TOD", Approach::SnippetInjection)));
        assert_eq!(
            tracker.text(),
            "\
contract A {
    uint bug1;
uint bug2;
uint x;
    function f() public {
        x = 1;
    }
}
"
        );
    }

    #[test]
    fn inserts_after_blocks() {
        let mut tracker = OffsetTracker::new(SRC);
        let body = "function f() public {\n        x = 1;\n    }";
        let injection = tracker.inject(&site(SiteKind::FunctionDefinition, body), "function bug() {}", "TOD");
        assert!(injection.is_injected());
        assert_eq!(tracker.log().entries()[0].line, 6);
        assert_eq!(line(tracker.text(), 5), "    }");
        assert_eq!(line(tracker.text(), 6), "function bug() {}");
        assert_eq!(line(tracker.text(), 7), "}");
    }

    #[test]
    fn earlier_insertions_shift_logged_lines() {
        let mut tracker = OffsetTracker::new(SRC);
        tracker.inject(&site(SiteKind::ExpressionStatement, "x = 1;"), "a();\nb();", "TOD");
        tracker.inject(&site(SiteKind::VariableDeclaration, "uint x"), "c();\nd();\ne();", "TOD");

        let lines: Vec<_> = tracker.log().iter().map(|e| e.line).collect();
        assert_eq!(lines, [7, 2]);
        let text = tracker.text();
        assert_eq!(line(text, 7).trim(), "a();");
        assert_eq!(line(text, 2).trim(), "c();");
    }

    #[test]
    fn same_line_insertions_keep_earlier_entries() {
        const SRC: &str = "contract A {\n    function f() public {\n        if (c) { a(); } else { b(); }\n    }\n}\n";
        let site = |kind, fragment: &str| {
            let start = SRC.find(fragment).unwrap();
            InjectionSite { kind, node: start as i64, span: SrcSpan::new(start, fragment.len()) }
        };
        let mut tracker = OffsetTracker::new(SRC);
        tracker.inject(&site(SiteKind::Block, "{ a(); }"), "bugA();", "TOD");
        tracker.inject(&site(SiteKind::ExpressionStatement, "b();"), "bugB();", "TOD");

        let text = tracker.text();
        let lines: Vec<_> = tracker.log().iter().map(|e| e.line).collect();
        assert_eq!(lines, [4, 4]);
        assert_eq!(line(text, 4), "bugA(); else { bugB();");
        assert_eq!(line(text, 5), "b(); }");
        assert_eq!(tracker.log().offsets()[0], text.find("bugA();").unwrap());
        assert_eq!(tracker.log().offsets()[1], text.find("bugB();").unwrap());
    }

    #[test]
    fn multi_line_rewrites_shift_later_entries() {
        let mut tracker = OffsetTracker::new(SRC);
        tracker.inject(&site(SiteKind::ExpressionStatement, "x = 1;"), "a();", "TOD");
        let start = tracker.text().find("uint x;").unwrap();
        let entry = tracker.rewrite(
            start..start + "uint x;".len(),
            "uint x;\n    uint y;",
            "TOD",
            Approach::CodeTransform,
        );
        assert_eq!(entry.line, 2);

        let text = tracker.text();
        let lines: Vec<_> = tracker.log().iter().map(|e| e.line).collect();
        assert_eq!(lines, [5, 2]);
        assert_eq!(line(text, 5).trim(), "a();");
        assert_eq!(line(text, 3).trim(), "uint y;");
    }

    #[test]
    fn skips_used_and_missing_sites() {
        let mut tracker = OffsetTracker::with_current(SRC, SRC.replace("x = 1;", "x = 2;"));
        let statement = site(SiteKind::ExpressionStatement, "x = 1;");
        assert_eq!(tracker.inject(&statement, "a();", "TOD"), Injection::NotFound);

        let declaration = site(SiteKind::VariableDeclaration, "uint x");
        assert!(tracker.inject(&declaration, "a();", "TOD").is_injected());
        assert_eq!(tracker.inject(&declaration, "b();", "TOD"), Injection::AlreadyUsed);
        assert_eq!(tracker.used_offsets().len(), 1);
        assert_eq!(tracker.log().len(), 1);
    }

    #[test]
    fn relocates_by_first_occurrence() {
        let tracker = OffsetTracker::with_current(SRC, format!("// x = 1;\n{SRC}"));
        let at = tracker.relocate(site(SiteKind::ExpressionStatement, "x = 1;").span).unwrap();
        assert_eq!(at, Relocated { start: 3, end: 9, line: 1 });
        assert!(tracker.relocate(SrcSpan::new(3, 0)).is_none());
        assert!(tracker.relocate(SrcSpan::new(SRC.len(), 4)).is_none());
    }
}
