//! The patch catalog: one pure `(source, diagnostic details) -> source` repair per
//! [`DiagnosticCategory`].
//!
//! Patches anchor on text, never on byte offsets reported by the compiler, so they stay valid
//! after earlier rounds moved code around.

use crate::{
    diagnostic::DiagnosticCategory,
    scan::{self, FunctionHeader},
};
use regex::Regex;
use std::sync::LazyLock;

/// A modifier placeholder `_` that is not followed by `;`.
static UNTERMINATED_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|[\s{;])_([ \t]*(?:\}|//|$))").unwrap());

/// Failure to apply a patch. Always unrecoverable for the current file.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PatchError {
    /// The diagnostic did not say which line it is about.
    #[error("diagnostic carries no source line")]
    MissingLine,
    /// The reported line is past the end of the source.
    #[error("line {0} does not exist")]
    LineOutOfRange(usize),
    /// No function header to add `payable` to.
    #[error("no non-payable function `{function}` taking {args} argument(s)")]
    NoPayableFunction {
        /// The function name, `*` if any name matches.
        function: String,
        /// The expected number of parameters.
        args: usize,
    },
    /// No constructor to add `payable` to.
    #[error("no non-payable constructor of contract `{0}`")]
    NoConstructor(String),
    /// No placeholder without `;` at or above the reported line.
    #[error("no unterminated placeholder at or above line {0}")]
    NoPlaceholder(usize),
    /// No documentation comment to add the `@param` tag to.
    #[error("no documentation comment for param `{param}` near line {line}")]
    NoDocComment {
        /// The parameter name.
        param: String,
        /// The reported line.
        line: usize,
    },
    /// The parameter already has a description.
    #[error("param `{0}` is already documented")]
    AlreadyDocumented(String),
    /// Neither a configured signature nor a function enclosing the reported line was found.
    #[error("no function body to comment out")]
    NoFunctionBody,
    /// The line to comment out is blank or already a comment.
    #[error("line {0} is already commented out")]
    AlreadyCommented(usize),
    /// The patch ran but left the source unchanged.
    #[error("`{0}` patch did not change the source")]
    NoProgress(&'static str),
    /// The category has no patch.
    #[error("no patch for `{0}` diagnostics")]
    Unsupported(&'static str),
}

/// Inputs of the patches that are not part of a diagnostic.
#[derive(Clone, Copy, Debug, Default)]
pub struct PatchContext<'a> {
    /// Function headers whose bodies are commented out on a division by zero.
    pub division_by_zero_signatures: &'a [String],
}

/// Dispatches `category` to its patch.
pub fn apply(
    category: &DiagnosticCategory,
    src: &str,
    cx: &PatchContext<'_>,
) -> Result<String, PatchError> {
    let patched = match category {
        DiagnosticCategory::PayableMissing { function, args } => {
            add_payable_to_function(src, function.as_deref(), *args)
        }
        DiagnosticCategory::ConstructorPayable { contract, args } => {
            add_payable_to_constructor(src, contract, *args)
        }
        DiagnosticCategory::OverrideMutability { function } => {
            add_payable_to_override(src, function)
        }
        DiagnosticCategory::MissingSemicolon { line } => {
            terminate_placeholder(src, line.ok_or(PatchError::MissingLine)?)
        }
        DiagnosticCategory::DocstringMissingParam { param, line } => {
            document_param(src, param, line.ok_or(PatchError::MissingLine)?)
        }
        DiagnosticCategory::DivisionByZero { line } => {
            comment_out_function_body(src, cx.division_by_zero_signatures, *line)
        }
        DiagnosticCategory::UndeclaredIdentifier { line } => {
            comment_out_line(src, line.ok_or(PatchError::MissingLine)?)
        }
        DiagnosticCategory::Unknown => Err(PatchError::Unsupported(category.name())),
    }?;
    if patched == src {
        return Err(PatchError::NoProgress(category.name()));
    }
    Ok(patched)
}

/// Adds `payable` to the first non-payable function named `function` (any name if `None`)
/// that declares `args` parameters.
pub fn add_payable_to_function(
    src: &str,
    function: Option<&str>,
    args: usize,
) -> Result<String, PatchError> {
    scan::function_headers(src)
        .iter()
        .filter(|h| h.name != "constructor" && function.is_none_or(|name| h.name == name))
        .find(|h| accepts_payable(h, src, Some(args)))
        .map(|h| h.with_payable(src))
        .ok_or_else(|| PatchError::NoPayableFunction {
            function: function.unwrap_or("*").to_string(),
            args,
        })
}

/// Adds `payable` to the constructor of `contract`, either the `constructor` keyword form or the
/// legacy `function <Contract>(..)` form.
pub fn add_payable_to_constructor(
    src: &str,
    contract: &str,
    args: Option<usize>,
) -> Result<String, PatchError> {
    let body = scan::contracts(src)
        .into_iter()
        .find(|c| c.name == contract)
        .map(|c| c.body)
        .ok_or_else(|| PatchError::NoConstructor(contract.to_string()))?;
    scan::function_headers(src)
        .iter()
        .filter(|h| body.contains(&h.start) && h.is_constructor_of(contract))
        .find(|h| accepts_payable(h, src, args))
        .map(|h| h.with_payable(src))
        .ok_or_else(|| PatchError::NoConstructor(contract.to_string()))
}

/// Adds `payable` to the implementation of the payable base function `function`.
pub fn add_payable_to_override(src: &str, function: &str) -> Result<String, PatchError> {
    scan::function_headers(src)
        .iter()
        .filter(|h| h.name == function)
        .find(|h| accepts_payable(h, src, None))
        .map(|h| h.with_payable(src))
        .ok_or_else(|| PatchError::NoPayableFunction { function: function.to_string(), args: 0 })
}

fn accepts_payable(header: &FunctionHeader, src: &str, args: Option<usize>) -> bool {
    header.body.is_some()
        && !header.is_payable(src)
        && args.is_none_or(|args| header.arity(src) == args)
}

/// Terminates the nearest modifier placeholder at or above `line` with `;`.
pub fn terminate_placeholder(src: &str, line: usize) -> Result<String, PatchError> {
    scan::line_range(src, line).ok_or(PatchError::LineOutOfRange(line))?;
    for n in (1..=line).rev() {
        let Some(range) = scan::line_range(src, n) else { continue };
        let text = &src[range.clone()];
        if UNTERMINATED_PLACEHOLDER.is_match(text) {
            let fixed = UNTERMINATED_PLACEHOLDER.replace(text, "${1}_;${2}");
            return Ok(splice(src, range, &fixed));
        }
    }
    Err(PatchError::NoPlaceholder(line))
}

/// Gives `param` the description `param` in the documentation of the function at `line`.
///
/// A bare `@param <name>` tag is completed in place; otherwise a new tag line is added to the
/// doc comment preceding the function.
pub fn document_param(src: &str, param: &str, line: usize) -> Result<String, PatchError> {
    let name = regex::escape(param);
    let line_start = scan::line_range(src, line).ok_or(PatchError::LineOutOfRange(line))?.start;

    let bare = Regex::new(&format!(r"(?m)(@param[ \t]+{name})[ \t]*(\*/)?[ \t]*$"))
        .map_err(|_| PatchError::NoDocComment { param: param.to_string(), line })?;
    let nearest = bare
        .captures_iter(src)
        .filter_map(|caps| caps.get(1))
        .filter(|m| m.start() < line_start)
        .last()
        .or_else(|| bare.captures(src).and_then(|caps| caps.get(1)));
    if let Some(tag) = nearest {
        return Ok(format!("{} {param}{}", &src[..tag.end()], &src[tag.end()..]));
    }

    let documented = Regex::new(&format!(r"@param[ \t]+{name}[ \t]+\S"))
        .map_err(|_| PatchError::NoDocComment { param: param.to_string(), line })?;
    if documented.is_match(src) {
        return Err(PatchError::AlreadyDocumented(param.to_string()));
    }

    let no_doc = || PatchError::NoDocComment { param: param.to_string(), line };
    let header =
        scan::function_headers(src).into_iter().find(|h| h.start >= line_start).ok_or_else(no_doc)?;
    let before = src[..header.start].trim_end();
    let last_line_start = before.rfind('\n').map_or(0, |n| n + 1);
    let last_line = &before[last_line_start..];
    let indent = scan::indentation(last_line);

    if before.ends_with("*/") {
        if last_line.trim() == "*/" {
            let tag = format!("{indent}* @param {param} {param}\n");
            return Ok(splice(src, last_line_start..last_line_start, &tag));
        }
        let close = before.len() - 2;
        return Ok(splice(src, close..close, &format!("@param {param} {param} ")));
    }
    if last_line.trim_start().starts_with("///") {
        let tag = format!("\n{indent}/// @param {param} {param}");
        return Ok(splice(src, before.len()..before.len(), &tag));
    }
    Err(no_doc())
}

/// Comments out the body of the first function matching one of `signatures`, or else of the
/// function enclosing `line`.
///
/// The braces stay in place, so the function keeps compiling as an empty one.
pub fn comment_out_function_body(
    src: &str,
    signatures: &[String],
    line: Option<usize>,
) -> Result<String, PatchError> {
    for signature in signatures {
        let pattern = format!(r"{}\s*\{{", regex::escape(signature.trim()).replace(' ', r"\s+"));
        let Ok(re) = Regex::new(&pattern) else { continue };
        if let Some(m) = re.find(src) {
            let open = m.end() - 1;
            if let Some(close) = scan::matching_delimiter(src, open) {
                return Ok(comment_out_between(src, open, close));
            }
        }
    }

    let line = line.ok_or(PatchError::NoFunctionBody)?;
    let offset = scan::line_range(src, line).ok_or(PatchError::LineOutOfRange(line))?.start;
    scan::function_headers(src)
        .into_iter()
        .filter_map(|h| h.body)
        .filter(|body| body.start <= offset && offset < body.end)
        .last()
        .map(|body| comment_out_between(src, body.start, body.end - 1))
        .ok_or(PatchError::NoFunctionBody)
}

/// Prefixes every non-blank line strictly between the braces at `open` and `close` with `// `,
/// keeping the closing brace on a line of its own.
fn comment_out_between(src: &str, open: usize, close: usize) -> String {
    let inner = &src[open + 1..close];
    let mut lines: Vec<String> = inner
        .split('\n')
        .map(|line| {
            let trimmed = line.trim_start();
            if trimmed.is_empty() || trimmed.starts_with("//") {
                line.to_string()
            } else {
                format!("{}// {trimmed}", scan::indentation(line))
            }
        })
        .collect();
    if lines.last().is_some_and(|last| !last.trim().is_empty()) {
        lines.push(String::new());
    }
    splice(src, open + 1..close, &lines.join("\n"))
}

/// Comments out the 1-based `line`.
pub fn comment_out_line(src: &str, line: usize) -> Result<String, PatchError> {
    let range = scan::line_range(src, line).ok_or(PatchError::LineOutOfRange(line))?;
    let text = &src[range.clone()];
    let trimmed = text.trim_start();
    if trimmed.is_empty() || trimmed.starts_with("//") {
        return Err(PatchError::AlreadyCommented(line));
    }
    Ok(splice(src, range, &format!("{}// {trimmed}", scan::indentation(text))))
}

fn splice(src: &str, range: std::ops::Range<usize>, with: &str) -> String {
    let mut out = String::with_capacity(src.len() + with.len());
    out.push_str(&src[..range.start]);
    out.push_str(with);
    out.push_str(&src[range.end..]);
    out
}
