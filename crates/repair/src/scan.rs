//! Lexical helpers over Solidity source text.
//!
//! These are not a parser: they find delimiters, function headers and contract bodies well
//! enough to anchor text patches, skipping string literals and comments where it matters.

use regex::Regex;
use std::{ops::Range, sync::LazyLock};

static FUNCTION_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:function\s+(\w+)|(constructor))\s*\(").unwrap());

static CONTRACT_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(contract|library|interface)\s+(\w+)\s*(?:is\s+[^{;]*)?\{").unwrap()
});

static PAYABLE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bpayable\b").unwrap());

/// Returns the offset of the delimiter closing the `{`, `(` or `[` at `open`.
///
/// String literals, line comments and block comments are skipped.
pub fn matching_delimiter(src: &str, open: usize) -> Option<usize> {
    let bytes = src.as_bytes();
    let (opening, closing) = match bytes.get(open)? {
        b'{' => (b'{', b'}'),
        b'(' => (b'(', b')'),
        b'[' => (b'[', b']'),
        _ => return None,
    };
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                i = skip_string(bytes, i);
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                i = bytes[i..].iter().position(|b| *b == b'\n').map_or(bytes.len(), |n| i + n);
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = src[i + 2..].find("*/").map_or(bytes.len(), |n| i + 2 + n + 2);
                continue;
            }
            b if b == opening => depth += 1,
            b if b == closing => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn skip_string(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' => return i,
            b if b == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Counts the comma separated, non-empty items of a parameter or argument list.
pub fn arity(list: &str) -> usize {
    let mut count = 0;
    let mut depth = 0usize;
    let mut item = false;
    for c in list.chars() {
        match c {
            '(' | '[' => {
                depth += 1;
                item = true;
            }
            ')' | ']' => {
                depth = depth.saturating_sub(1);
                item = true;
            }
            ',' if depth == 0 => {
                if item {
                    count += 1;
                }
                item = false;
            }
            c if c.is_whitespace() => {}
            _ => item = true,
        }
    }
    if item {
        count += 1;
    }
    count
}

/// Returns the byte range of the 1-based `line`, without its line terminator.
pub fn line_range(src: &str, line: usize) -> Option<Range<usize>> {
    if line == 0 {
        return None;
    }
    let mut start = 0;
    for _ in 1..line {
        start += src[start..].find('\n')? + 1;
    }
    let end = src[start..].find('\n').map_or(src.len(), |n| start + n);
    Some(start..end)
}

/// Returns the leading whitespace of `line`.
pub fn indentation(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

/// A `function name(...)` or `constructor(...)` header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FunctionHeader {
    /// The function name, `constructor` for the constructor keyword.
    pub name: String,
    /// Offset of the `function` or `constructor` keyword.
    pub start: usize,
    /// Parameter list, without the parentheses.
    pub params: Range<usize>,
    /// Everything between the closing parenthesis and the body or `;`.
    pub tail: Range<usize>,
    /// The body including both braces, `None` for declarations.
    pub body: Option<Range<usize>>,
}

impl FunctionHeader {
    /// Number of declared parameters.
    pub fn arity(&self, src: &str) -> usize {
        arity(&src[self.params.clone()])
    }

    /// Whether the header already carries the `payable` modifier.
    pub fn is_payable(&self, src: &str) -> bool {
        PAYABLE.is_match(&src[self.tail.clone()])
    }

    /// Whether this is a `constructor` or a legacy constructor of `contract`.
    pub fn is_constructor_of(&self, contract: &str) -> bool {
        self.name == "constructor" || self.name == contract
    }

    /// Returns `src` with `payable` inserted right after the parameter list.
    pub fn with_payable(&self, src: &str) -> String {
        let at = self.params.end + 1;
        format!("{} payable{}", &src[..at], &src[at..])
    }
}

/// Returns all function and constructor headers of `src`, in source order.
pub fn function_headers(src: &str) -> Vec<FunctionHeader> {
    FUNCTION_HEADER
        .captures_iter(src)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(1).or_else(|| caps.get(2))?.as_str().to_string();
            let open = whole.end() - 1;
            let close = matching_delimiter(src, open)?;
            let stop = close + 1 + src[close + 1..].find(['{', ';'])?;
            let body = if src.as_bytes()[stop] == b'{' {
                Some(stop..matching_delimiter(src, stop)? + 1)
            } else {
                None
            };
            Some(FunctionHeader {
                name,
                start: whole.start(),
                params: open + 1..close,
                tail: close + 1..stop,
                body,
            })
        })
        .collect()
}

/// A `contract`, `library` or `interface` definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractSpan {
    /// `contract`, `library` or `interface`.
    pub kind: String,
    /// The contract name.
    pub name: String,
    /// Offset of the keyword.
    pub start: usize,
    /// The body including both braces.
    pub body: Range<usize>,
}

/// Returns all contract-like definitions of `src`, in source order.
pub fn contracts(src: &str) -> Vec<ContractSpan> {
    CONTRACT_HEADER
        .captures_iter(src)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let open = whole.end() - 1;
            let close = matching_delimiter(src, open)?;
            Some(ContractSpan {
                kind: caps[1].to_string(),
                name: caps[2].to_string(),
                start: whole.start(),
                body: open..close + 1,
            })
        })
        .collect()
}
