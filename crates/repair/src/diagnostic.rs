//! Classification of compiler diagnostics into the categories the patch catalog can repair.

use regex::Regex;
use solidifi_common::{Diagnostic, DiagnosticExt, compile::line_of_offset};
use std::{fmt, sync::LazyLock};

static FORGOT_PAYABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)did you forget the "payable" modifier"#).unwrap());

/// The function type of the callee, `function (uint256,address) external returns (bool)`.
static CALLEE_TYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"function\s*\(([^)]*)\)").unwrap());

/// A constructor callee returns the contract it creates.
static CREATED_CONTRACT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"returns\s*\(\s*contract\s+(\w+)\s*\)").unwrap());

/// `Cannot set option "value", since the constructor of contract Foo is not payable.`
static CONSTRUCTOR_NOT_PAYABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"constructor of contract (\w+) is not payable").unwrap());

/// The value call in the source excerpt, `token.buy.value(1 ether)(x)`.
static VALUE_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w+)\s*\.\s*value\s*\(").unwrap());

static OVERRIDE_MUTABILITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"Overriding function changes state mutability from "payable""#).unwrap()
});

static OVERRIDDEN_HERE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Overridden function is here:\s*\n\s*function\s+(\w+)").unwrap()
});

static FUNCTION_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*function\s+(\w+)").unwrap());

static MISSING_SEMICOLON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Expected (?:';'|token Semicolon) but got (?:'\}'|RBrace)").unwrap());

static UNDOCUMENTED_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"No description given for param (\w+)").unwrap());

static UNDECLARED_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Undeclared identifier").unwrap());

static DIVISION_BY_ZERO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)division by zero").unwrap());

/// The known diagnostic categories, with the fields their patches need.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiagnosticCategory {
    /// A `.value(..)` call to a function that is not payable.
    PayableMissing {
        /// The called member, if the source excerpt shows it.
        function: Option<String>,
        /// Number of parameters of the callee.
        args: usize,
    },
    /// A `new C.value(..)` call to a constructor that is not payable.
    ConstructorPayable {
        /// The created contract.
        contract: String,
        /// Number of constructor parameters, if the message shows the constructor type.
        args: Option<usize>,
    },
    /// A non-payable override of a payable base function.
    OverrideMutability {
        /// The overridden function.
        function: String,
    },
    /// A modifier placeholder `_` without its terminating `;`.
    MissingSemicolon {
        /// Line the parser stopped at.
        line: Option<usize>,
    },
    /// A `@param` tag without a description.
    DocstringMissingParam {
        /// The undocumented parameter.
        param: String,
        /// Line of the documented declaration.
        line: Option<usize>,
    },
    /// A reference to an undeclared identifier.
    UndeclaredIdentifier {
        /// The offending line.
        line: Option<usize>,
    },
    /// A constant division by zero.
    DivisionByZero {
        /// The offending line.
        line: Option<usize>,
    },
    /// Anything else. Not repairable.
    Unknown,
}

impl DiagnosticCategory {
    /// A short, stable name of the category.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PayableMissing { .. } => "payable-missing",
            Self::ConstructorPayable { .. } => "constructor-payable-legacy",
            Self::OverrideMutability { .. } => "override-mutability",
            Self::MissingSemicolon { .. } => "parse-error-missing-semicolon",
            Self::DocstringMissingParam { .. } => "docstring-missing-param",
            Self::UndeclaredIdentifier { .. } => "undeclared-identifier",
            Self::DivisionByZero { .. } => "division-by-zero",
            Self::Unknown => "unknown",
        }
    }

    /// Whether the patch catalog has an entry for this category.
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl fmt::Display for DiagnosticCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Classifies `diagnostic`, reported against `source`.
pub fn classify(diagnostic: &Diagnostic, source: &str) -> DiagnosticCategory {
    let message = diagnostic.message.as_str();
    let formatted = diagnostic.formatted();
    let line = diagnostic.line(source);

    if FORGOT_PAYABLE.is_match(message) {
        let args = CALLEE_TYPE.captures(message).map(|caps| crate::scan::arity(&caps[1]));
        if let Some(caps) = CREATED_CONTRACT.captures(message) {
            return DiagnosticCategory::ConstructorPayable { contract: caps[1].to_string(), args };
        }
        // the header line repeats the message, the quoted source follows it
        let function = formatted
            .split_once('\n')
            .and_then(|(_, excerpt)| VALUE_CALL.captures(excerpt))
            .map(|caps| caps[1].to_string());
        return DiagnosticCategory::PayableMissing { function, args: args.unwrap_or_default() };
    }
    if let Some(caps) = CONSTRUCTOR_NOT_PAYABLE.captures(message) {
        return DiagnosticCategory::ConstructorPayable { contract: caps[1].to_string(), args: None };
    }
    if OVERRIDE_MUTABILITY.is_match(message) {
        if let Some(function) = overridden_function(diagnostic, source) {
            return DiagnosticCategory::OverrideMutability { function };
        }
        return DiagnosticCategory::Unknown;
    }
    if MISSING_SEMICOLON.is_match(message) {
        return DiagnosticCategory::MissingSemicolon { line };
    }
    if let Some(caps) = UNDOCUMENTED_PARAM.captures(message) {
        return DiagnosticCategory::DocstringMissingParam { param: caps[1].to_string(), line };
    }
    if UNDECLARED_IDENTIFIER.is_match(message) {
        return DiagnosticCategory::UndeclaredIdentifier { line };
    }
    if DIVISION_BY_ZERO.is_match(message) {
        return DiagnosticCategory::DivisionByZero { line };
    }
    DiagnosticCategory::Unknown
}

/// Name of the base function from the "Overridden function is here:" note, either quoted in the
/// formatted message or read from the secondary location.
fn overridden_function(diagnostic: &Diagnostic, source: &str) -> Option<String> {
    if let Some(caps) = OVERRIDDEN_HERE.captures(diagnostic.formatted()) {
        return Some(caps[1].to_string());
    }
    diagnostic
        .secondary_source_locations
        .iter()
        .filter(|loc| loc.message.as_deref().is_some_and(|m| m.contains("Overridden function")))
        .find_map(|loc| {
            let start = usize::try_from(loc.start?).ok()?;
            let line = crate::scan::line_range(source, line_of_offset(source, start))?;
            FUNCTION_NAME.captures(&source[start.min(line.end)..line.end]).map(|c| c[1].to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use solidifi_common::compile::SecondarySourceLocation;

    fn error(message: &str, formatted: &str) -> Diagnostic {
        Diagnostic::error("TypeError", message).with_formatted(formatted)
    }

    #[test]
    fn payable_direct_call() {
        let diag = error(
            r#"Member "value" not found or not visible after argument-dependent lookup in function (uint256,address) external - did you forget the "payable" modifier?"#,
            "a.sol:12:9: TypeError: Member \"value\" not found ...\n        shop.buy.value(msg.value)(1, msg.sender);\n        ^------------^\n",
        );
        assert_eq!(
            classify(&diag, ""),
            DiagnosticCategory::PayableMissing { function: Some("buy".into()), args: 2 }
        );
    }

    #[test]
    fn payable_constructor_call() {
        let diag = error(
            r#"Member "value" not found or not visible after argument-dependent lookup in function (uint256) returns (contract Vault) - did you forget the "payable" modifier?"#,
            "a.sol:20:9: TypeError: ...\n        new Vault.value(1 ether)(5);\n",
        );
        let category = classify(&diag, "");
        assert_eq!(
            category,
            DiagnosticCategory::ConstructorPayable { contract: "Vault".into(), args: Some(1) }
        );
        assert_eq!(category.name(), "constructor-payable-legacy");

        let modern = error(
            r#"Cannot set option "value", since the constructor of contract Vault is not payable."#,
            "",
        );
        assert_eq!(
            classify(&modern, ""),
            DiagnosticCategory::ConstructorPayable { contract: "Vault".into(), args: None }
        );
    }

    #[test]
    fn override_from_formatted_note() {
        let diag = error(
            r#"Overriding function changes state mutability from "payable" to "nonpayable"."#,
            "a.sol:9:5: TypeError: Overriding function changes state mutability from \"payable\" to \"nonpayable\".\n    function fund() public {\n    ^\na.sol:3:5: Overridden function is here:\n    function fund() public payable;\n    ^-----------------------------^\n",
        );
        assert_eq!(
            classify(&diag, ""),
            DiagnosticCategory::OverrideMutability { function: "fund".into() }
        );
    }

    #[test]
    fn override_from_secondary_location() {
        let source = "contract A {\n    function fund() public payable;\n}\n";
        let start = source.find("function").unwrap() as i32;
        let mut diag = error(
            r#"Overriding function changes state mutability from "payable" to "nonpayable"."#,
            "",
        );
        diag.secondary_source_locations.push(SecondarySourceLocation {
            file: Some("a.sol".into()),
            start: Some(start),
            end: Some(start + 30),
            message: Some("Overridden function is here:".into()),
        });
        assert_eq!(
            classify(&diag, source),
            DiagnosticCategory::OverrideMutability { function: "fund".into() }
        );
    }

    #[test]
    fn line_based_categories() {
        let semicolon = Diagnostic::error("ParserError", "Expected ';' but got '}'")
            .with_formatted("a.sol:7:5: ParserError: Expected ';' but got '}'\n    }\n    ^\n");
        assert_eq!(classify(&semicolon, ""), DiagnosticCategory::MissingSemicolon { line: Some(7) });

        let doc = Diagnostic::error("DocstringParsingError", "No description given for param _to")
            .with_formatted("a.sol:4:5: DocstringParsingError: No description given for param _to\n");
        assert_eq!(
            classify(&doc, ""),
            DiagnosticCategory::DocstringMissingParam { param: "_to".into(), line: Some(4) }
        );

        let undeclared = Diagnostic::error("DeclarationError", "Undeclared identifier.")
            .with_formatted("a.sol:15:9: DeclarationError: Undeclared identifier.\n");
        assert_eq!(
            classify(&undeclared, ""),
            DiagnosticCategory::UndeclaredIdentifier { line: Some(15) }
        );

        let div = Diagnostic::error("TypeError", "Division by zero.")
            .with_formatted("a.sol:30:20: TypeError: Division by zero.\n");
        assert_eq!(classify(&div, ""), DiagnosticCategory::DivisionByZero { line: Some(30) });
    }

    #[test]
    fn everything_else_is_unknown() {
        let diag = Diagnostic::error("TypeError", "Invalid implicit conversion.");
        let category = classify(&diag, "");
        assert_eq!(category, DiagnosticCategory::Unknown);
        assert!(!category.is_known());
    }
}
