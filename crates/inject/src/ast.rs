//! Flattening of the compiler AST into the nodes injection sites are drawn from.

use serde_json::Value;
use std::fmt;

/// A byte span from a `src` attribute, `"<start>:<length>:<file index>"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SrcSpan {
    /// Start byte offset.
    pub start: usize,
    /// Length in bytes.
    pub length: usize,
}

impl SrcSpan {
    pub const fn new(start: usize, length: usize) -> Self {
        Self { start, length }
    }

    /// Parses a `src` attribute. Unknown locations (`-1`) yield `None`.
    pub fn parse(src: &str) -> Option<Self> {
        let mut parts = src.split(':');
        let start = parts.next()?.trim().parse().ok()?;
        let length = parts.next()?.trim().parse().ok()?;
        Some(Self { start, length })
    }

    /// The end offset used by all containment checks, one past the exclusive end.
    pub const fn end(&self) -> usize {
        self.start + self.length + 1
    }

    /// Whether an `end` offset falls inside this span.
    ///
    /// The interval is open on the left and closed on the right, so a node ending exactly at
    /// the closing delimiter of this span is inside it.
    pub const fn contains_end(&self, end: usize) -> bool {
        end > self.start && end <= self.end()
    }
}

impl fmt::Display for SrcSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.length)
    }
}

/// An AST node with an id and a source location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AstNode {
    pub id: i64,
    /// `nodeType` of the compact AST, `name` of the legacy AST.
    pub kind: String,
    pub span: SrcSpan,
}

/// Collects every node of `ast` that has an id and a known source location.
///
/// Works on both the compact AST (`nodeType`, `nodes`) and the legacy AST (`name`, `children`).
/// Objects are walked with keys in sorted order and a node is listed when its kind key is
/// reached, so the order only depends on the JSON content.
pub fn flatten(ast: &Value) -> Vec<AstNode> {
    let mut nodes = Vec::new();
    walk(ast, &mut nodes);
    nodes
}

fn walk(value: &Value, nodes: &mut Vec<AstNode>) {
    match value {
        Value::Object(map) => {
            let kind_key = if map.contains_key("nodeType") { "nodeType" } else { "name" };
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
            for (key, child) in entries {
                if child.is_object() || child.is_array() {
                    walk(child, nodes);
                } else if key == kind_key
                    && let Some(node) = node(map)
                {
                    nodes.push(node);
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|item| walk(item, nodes)),
        _ => {}
    }
}

fn node(map: &serde_json::Map<String, Value>) -> Option<AstNode> {
    let id = map.get("id")?.as_i64()?;
    let kind = map.get("nodeType").or_else(|| map.get("name"))?.as_str()?.to_string();
    let span = SrcSpan::parse(map.get("src")?.as_str()?)?;
    Some(AstNode { id, kind, span })
}
