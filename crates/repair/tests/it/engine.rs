use semver::Version;
use similar_asserts::assert_eq;
use solidifi_common::{Diagnostic, DiagnosticExt, errors::SolcError};
use solidifi_repair::{
    AutoRepairEngine, DiagnosticCategory, PatchError, RepairError, ResolveAction, SourceFile,
};
use solidifi_test_utils::{
    ScriptedCompiler,
    fixtures::{clean_output, output_with, write_file},
    init_tracing,
};

const SHOP: &str = "\
pragma solidity ^0.4.24;

contract Shop {
    function buy(uint amount) public {
    }

    function buy(uint amount, address to) public {
    }
}

contract Client {
    Shop shop;

    function order() public payable {
        shop.buy.value(msg.value)(1, msg.sender);
    }
}
";

fn payable_error() -> Diagnostic {
    Diagnostic::error(
        "TypeError",
        r#"Member "value" not found or not visible after argument-dependent lookup in function (uint256,address) external - did you forget the "payable" modifier?"#,
    )
    .with_formatted(
        "Shop.sol:15:9: TypeError: Member \"value\" not found or not visible after argument-dependent lookup in function (uint256,address) external - did you forget the \"payable\" modifier?\n        shop.buy.value(msg.value)(1, msg.sender);\n        ^------------^\n",
    )
}

fn undeclared(line: usize) -> Diagnostic {
    Diagnostic::error("DeclarationError", "Undeclared identifier.").with_formatted(format!(
        "Shop.sol:{line}:9: DeclarationError: Undeclared identifier.\n"
    ))
}

#[test]
fn converges_after_one_payable_patch() {
    init_tracing();
    let compiler = ScriptedCompiler::new([output_with([payable_error()]), clean_output()]);
    let engine = AutoRepairEngine::new(&compiler);

    let converged = engine.repair("Shop.sol", SHOP).unwrap();
    assert_eq!(converged.rounds, 1);
    assert_eq!(converged.version, Version::new(0, 4, 26));
    assert_eq!(converged.pragma, ResolveAction::Unchanged);
    assert_eq!(converged.patches.len(), 1);
    assert_eq!(
        converged.patches[0].category,
        DiagnosticCategory::PayableMissing { function: Some("buy".into()), args: 2 }
    );
    let expected = SHOP.replace(
        "function buy(uint amount, address to) public {",
        "function buy(uint amount, address to) payable public {",
    );
    assert_eq!(converged.source, expected);

    assert_eq!(compiler.calls(), 2);
    assert_eq!(compiler.source_of(1).unwrap(), converged.source);
    assert!(compiler.inputs().iter().all(|(version, _)| *version == Version::new(0, 4, 26)));
}

#[test]
fn repairing_converged_source_is_identity() {
    let compiler = ScriptedCompiler::new([clean_output(), clean_output()]);
    let engine = AutoRepairEngine::new(&compiler);

    let first = engine.repair("Shop.sol", SHOP).unwrap();
    let second = engine.repair("Shop.sol", &first.source).unwrap();
    assert_eq!(first.rounds, 0);
    assert_eq!(second.rounds, 0);
    assert!(second.patches.is_empty());
    assert_eq!(second.source, SHOP);
}

#[test]
fn patches_only_the_first_error_per_round() {
    let compiler = ScriptedCompiler::new([
        output_with([undeclared(15), payable_error()]),
        output_with([payable_error()]),
        clean_output(),
    ]);
    let engine = AutoRepairEngine::new(&compiler);

    let converged = engine.repair("Shop.sol", SHOP).unwrap();
    assert_eq!(converged.rounds, 2);
    let names: Vec<_> = converged.patches.iter().map(|p| p.category.name()).collect();
    assert_eq!(names, ["undeclared-identifier", "payable-missing"]);
    assert_eq!(converged.patches[0].line, Some(15));

    // the second compile saw the first patch only
    let second = compiler.source_of(1).unwrap();
    assert!(second.contains("        // shop.buy.value(msg.value)(1, msg.sender);\n"));
    assert!(!second.contains("payable public"));
}

#[test]
fn warnings_do_not_block_convergence() {
    let mut warning = undeclared(3);
    warning.severity = solidifi_common::Severity::Warning;
    let compiler = ScriptedCompiler::new([output_with([warning])]);

    let converged = AutoRepairEngine::new(&compiler).repair("Shop.sol", SHOP).unwrap();
    assert_eq!(converged.rounds, 0);
    assert_eq!(converged.source, SHOP);
}

#[test]
fn unknown_diagnostic_is_unrecoverable() {
    let compiler = ScriptedCompiler::new([output_with([Diagnostic::error(
        "TypeError",
        "Type int256 is not implicitly convertible to expected type uint256.",
    )])]);

    let err = AutoRepairEngine::new(&compiler).repair("Shop.sol", SHOP).unwrap_err();
    match err {
        RepairError::UnknownDiagnostic { round, message } => {
            assert_eq!(round, 1);
            assert!(message.contains("not implicitly convertible"));
        }
        err => panic!("unexpected error: {err}"),
    }
}

#[test]
fn failing_patch_is_unrecoverable() {
    let diag = Diagnostic::error("ParserError", "Expected token Semicolon but got RBrace")
        .with_formatted("Shop.sol:5:5: ParserError: Expected token Semicolon but got RBrace\n");
    let compiler = ScriptedCompiler::new([output_with([diag])]);

    let err = AutoRepairEngine::new(&compiler).repair("Shop.sol", SHOP).unwrap_err();
    assert!(matches!(
        err,
        RepairError::Patch {
            round: 1,
            category: "parse-error-missing-semicolon",
            source: PatchError::NoPlaceholder(5),
        }
    ));
}

#[test]
fn stops_at_round_limit() {
    let compiler = ScriptedCompiler::new([
        output_with([undeclared(15)]),
        output_with([undeclared(12)]),
        output_with([undeclared(14)]),
    ]);
    let engine = AutoRepairEngine::new(&compiler).max_rounds(2);

    let err = engine.repair("Shop.sol", SHOP).unwrap_err();
    assert!(matches!(err, RepairError::RoundLimit(2)), "{err}");
    assert_eq!(compiler.calls(), 3);
}

#[test]
fn compiler_failure_is_an_environment_error() {
    let compiler = ScriptedCompiler::default();
    let err = AutoRepairEngine::new(&compiler).repair("Shop.sol", SHOP).unwrap_err();
    assert!(matches!(err, RepairError::Compiler(SolcError::Exit { .. })));
}

#[test]
fn division_by_zero_uses_configured_signature() {
    let src = "\
pragma solidity 0.4.24;

contract Split {
    function payOwners() private canPayOwners {
        uint share = total / 0;
    }
}
";
    let diag = Diagnostic::error(
        "TypeError",
        "Operator / not compatible with types uint256 and int_const 0. Division by zero.",
    )
    .with_formatted("Split.sol:5:22: TypeError: Division by zero.\n");
    let compiler = ScriptedCompiler::new([output_with([diag]), clean_output()]);
    let engine = AutoRepairEngine::new(&compiler)
        .division_by_zero_signatures(vec!["function payOwners() private canPayOwners".into()]);

    let converged = engine.repair("Split.sol", src).unwrap();
    assert!(converged.source.contains("        // uint share = total / 0;\n    }"));
    assert_eq!(converged.version, Version::new(0, 4, 24));
}

#[test]
fn repair_file_persists_synthesized_pragma_only() {
    let dir = tempfile::tempdir().unwrap();
    let body = "contract Shop {\n    function buy(uint a, address b) public {}\n}\n";
    let path = write_file(dir.path(), "Shop.sol", body);

    let compiler = ScriptedCompiler::new([clean_output()]);
    let mut file = SourceFile::open(&path).unwrap();
    let converged = AutoRepairEngine::new(&compiler).repair_file(&mut file).unwrap();

    let expected = format!("pragma solidity ^0.4.25;\n\n{body}");
    assert_eq!(std::fs::read_to_string(&path).unwrap(), expected);
    assert_eq!(converged.source, expected);
    assert_eq!(file.text(), expected);
    assert_eq!(converged.version, Version::new(0, 4, 26));
    assert_eq!(compiler.inputs()[0].1.source_name(), Some("Shop.sol"));
}
