//! Computes the AST nodes a snippet can be injected at.

use crate::{
    ast::{AstNode, SrcSpan},
    snippets::SnippetForm,
};
use regex::Regex;
use std::{collections::BTreeSet, fmt, sync::LazyLock};

static INTERFACE_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:interface|library)\b").unwrap());

/// Constructs whose end offsets mark parameters and arguments.
const PARAMETER_KINDS: &[&str] = &[
    "ParameterList",
    "FunctionCall",
    "ExpressionStatement",
    "Return",
    "VariableDeclarationStatement",
    "ModifierInvocation",
    "BinaryOperation",
];

/// Constructs that open a block of their own.
const BLOCK_KINDS: &[&str] = &["FunctionDefinition", "ModifierDefinition", "EventDefinition", "Block"];

/// Node kinds an injection site can be drawn from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SiteKind {
    VariableDeclaration,
    ExpressionStatement,
    EmitStatement,
    Identifier,
    PlaceholderStatement,
    Return,
    Block,
    FunctionDefinition,
    ModifierDefinition,
    EventDefinition,
}

impl SiteKind {
    /// The order candidates are collected in.
    pub const SCAN_ORDER: [Self; 10] = [
        Self::VariableDeclaration,
        Self::ExpressionStatement,
        Self::EmitStatement,
        Self::Identifier,
        Self::PlaceholderStatement,
        Self::Return,
        Self::Block,
        Self::FunctionDefinition,
        Self::ModifierDefinition,
        Self::EventDefinition,
    ];

    pub fn parse(kind: &str) -> Option<Self> {
        Self::SCAN_ORDER.into_iter().find(|k| k.as_str() == kind)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::VariableDeclaration => "VariableDeclaration",
            Self::ExpressionStatement => "ExpressionStatement",
            Self::EmitStatement => "EmitStatement",
            Self::Identifier => "Identifier",
            Self::PlaceholderStatement => "PlaceholderStatement",
            Self::Return => "Return",
            Self::Block => "Block",
            Self::FunctionDefinition => "FunctionDefinition",
            Self::ModifierDefinition => "ModifierDefinition",
            Self::EventDefinition => "EventDefinition",
        }
    }

    /// Where a fragment goes relative to a node of this kind.
    pub const fn placement(&self) -> Placement {
        match self {
            Self::Block | Self::FunctionDefinition | Self::ModifierDefinition => Placement::After,
            _ => Placement::Before,
        }
    }

    /// Kinds that are admitted by block-form scans only when outside every block.
    const fn is_block_form_statement(&self) -> bool {
        matches!(
            self,
            Self::ModifierDefinition
                | Self::Return
                | Self::ExpressionStatement
                | Self::PlaceholderStatement
                | Self::Block
                | Self::EmitStatement
        )
    }
}

impl fmt::Display for SiteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a fragment is inserted relative to its site.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Placement {
    /// Right before the node, followed by a newline.
    Before,
    /// Right after the node, preceded by a newline.
    After,
}

/// A candidate injection point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InjectionSite {
    pub kind: SiteKind,
    /// Id of the AST node.
    pub node: i64,
    /// The node's span in the source the AST was built from.
    pub span: SrcSpan,
}

impl InjectionSite {
    pub const fn placement(&self) -> Placement {
        self.kind.placement()
    }

    /// The raw source offset consumed by injecting at this site: the start for insertions
    /// before the node, the end for insertions after it.
    pub const fn offset_key(&self) -> usize {
        match self.placement() {
            Placement::Before => self.span.start,
            Placement::After => self.span.end(),
        }
    }
}

/// Derives injection sites from the flattened AST of a source.
///
/// A site is excluded when its end offset falls inside an interface or library, and depending
/// on its kind inside a parameter-bearing construct, a struct body or a block.
#[derive(Debug)]
pub struct InjectionPointScanner<'a> {
    nodes: &'a [AstNode],
    parameters: Vec<SrcSpan>,
    blocks: Vec<SrcSpan>,
    structs: Vec<SrcSpan>,
    interfaces: Vec<SrcSpan>,
}

impl<'a> InjectionPointScanner<'a> {
    /// Indexes the exclusion ranges of `nodes`, the AST of `source`.
    ///
    /// A contract definition counts as an interface or library only if the AST places it at an
    /// `interface` or `library` keyword of the text.
    pub fn new(nodes: &'a [AstNode], source: &str) -> Self {
        let spans = |kinds: &[&str]| -> Vec<SrcSpan> {
            nodes.iter().filter(|n| kinds.contains(&n.kind.as_str())).map(|n| n.span).collect()
        };
        let keywords: BTreeSet<usize> =
            INTERFACE_KEYWORD.find_iter(source).map(|m| m.start()).collect();
        let interfaces = spans(&["ContractDefinition"])
            .into_iter()
            .filter(|span| keywords.contains(&span.start))
            .collect();
        Self {
            nodes,
            parameters: spans(PARAMETER_KINDS),
            blocks: spans(BLOCK_KINDS),
            structs: spans(&["StructDefinition"]),
            interfaces,
        }
    }

    /// Returns the candidate sites for snippets of `form`, grouped by kind in
    /// [`SiteKind::SCAN_ORDER`] and in AST order within a kind.
    pub fn scan(&self, form: SnippetForm) -> Vec<InjectionSite> {
        let mut sites = Vec::new();
        for kind in SiteKind::SCAN_ORDER {
            for node in self.nodes.iter().filter(|n| n.kind == kind.as_str()) {
                let end = node.span.end();
                let excluded = match kind {
                    SiteKind::VariableDeclaration | SiteKind::Identifier => {
                        self.within_interface(end)
                            || self.is_parameter(end)
                            || self.within_struct(end)
                    }
                    _ if form == SnippetForm::Block && kind.is_block_form_statement() => {
                        self.within_interface(end) || self.within_block(end)
                    }
                    _ => self.within_interface(end),
                };
                if !excluded {
                    sites.push(InjectionSite { kind, node: node.id, span: node.span });
                }
            }
        }
        trace!(target: "solidifi::inject", ?form, sites = sites.len(), "scanned injection sites");
        sites
    }

    pub fn within_interface(&self, end: usize) -> bool {
        self.interfaces.iter().any(|span| span.contains_end(end))
    }

    pub fn is_parameter(&self, end: usize) -> bool {
        self.parameters.iter().any(|span| span.contains_end(end))
    }

    pub fn within_block(&self, end: usize) -> bool {
        self.blocks.iter().any(|span| span.contains_end(end))
    }

    pub fn within_struct(&self, end: usize) -> bool {
        self.structs.iter().any(|span| span.contains_end(end))
    }
}
