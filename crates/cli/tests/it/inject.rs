use solidifi_cli::cmd::inject::{execute, find_bug_type};
use solidifi_common::term::BatchProgress;
use solidifi_config::Config;
use solidifi_inject::report::CSV_HEADER;
use solidifi_test_utils::{
    AstBuilder, ScriptedCompiler,
    fixtures::{ast_output, clean_output, snippet_library, write_file},
    init_tracing,
};
use std::fs;

const VAULT: &str = "\
pragma solidity ^0.4.24;

contract Vault {
    uint total;

    function store(uint amount) public {
        total += amount;
    }
}
";

const STORE: &str = "\
function store(uint amount) public {
        total += amount;
    }";

fn vault_ast() -> serde_json::Value {
    let mut b = AstBuilder::new(VAULT);
    let total = b.node("VariableDeclaration", "uint total", vec![]);
    let amount = b.node("VariableDeclaration", "uint amount", vec![]);
    let params = b.node("ParameterList", "(uint amount)", vec![amount]);
    let add = b.node("ExpressionStatement", "total += amount;", vec![]);
    let store = b.node("FunctionDefinition", STORE, vec![params, add]);
    let start = VAULT.find("contract Vault").unwrap();
    let vault = b.span("ContractDefinition", start, VAULT.len() - 1 - start, vec![total, store]);
    b.unit(vec![vault])
}

#[test]
fn injects_and_writes_artifacts() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(dir.path(), "contracts/Vault.sol", VAULT);
    snippet_library(
        &dir.path().join("bugs"),
        "tx.origin",
        &["require(tx.origin == owner);", "if (tx.origin != owner) { revert(); }"],
        &[],
    );
    let compiler = ScriptedCompiler::new([clean_output(), ast_output("buggy_Vault.sol", vault_ast())]);

    let config = Config {
        bugs_dir: dir.path().join("bugs"),
        out: dir.path().join("out"),
        jobs: 1,
        ..Default::default()
    };
    let bug = find_bug_type(&config, "7").unwrap();
    let outcome = execute(&config, bug, &compiler, &[file], BatchProgress::hidden(1)).unwrap();

    assert!(outcome.failed.is_empty());
    let (_, report) = &outcome.succeeded[0];
    assert_eq!(report.candidates, 3);
    assert_eq!(report.injected(), 2);
    assert!(report.exhausted);
    assert_eq!(compiler.remaining(), 0);

    let out = dir.path().join("out/buggy/tx.origin");
    let buggy = fs::read_to_string(out.join("buggy_Vault.sol")).unwrap();
    assert!(buggy.contains("require(tx.origin == owner);"), "{buggy}");
    assert!(buggy.contains("if (tx.origin != owner) { revert(); }"), "{buggy}");
    let log = fs::read_to_string(out.join("BugLog_Vault.csv")).unwrap();
    assert!(log.starts_with(CSV_HEADER), "{log}");
    assert_eq!(log.lines().count(), 3);
}

#[test]
fn missing_snippet_class_fails_the_file() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let file = write_file(dir.path(), "Vault.sol", VAULT);
    let compiler = ScriptedCompiler::new(Vec::new());

    let config = Config {
        bugs_dir: dir.path().join("bugs"),
        out: dir.path().join("out"),
        jobs: 1,
        ..Default::default()
    };
    let bug = find_bug_type(&config, "Re-entrancy").unwrap();
    let outcome = execute(&config, bug, &compiler, &[file], BatchProgress::hidden(1)).unwrap();

    assert!(outcome.succeeded.is_empty());
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.ensure_any_succeeded().unwrap_err().to_string(), "all 1 files failed");
    assert_eq!(compiler.calls(), 0);
}

#[test]
fn same_named_files_are_rejected_before_running() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let files = [
        write_file(dir.path(), "a/Vault.sol", VAULT),
        write_file(dir.path(), "b/Vault.sol", VAULT),
        write_file(dir.path(), "b/Other.sol", VAULT),
    ];
    let compiler = ScriptedCompiler::new(Vec::new());

    let config = Config {
        bugs_dir: dir.path().join("bugs"),
        out: dir.path().join("out"),
        jobs: 2,
        ..Default::default()
    };
    let bug = find_bug_type(&config, "tx.origin").unwrap();
    let err = execute(&config, bug, &compiler, &files, BatchProgress::hidden(3)).unwrap_err();

    let msg = err.to_string();
    assert!(msg.starts_with("2 input files are named `Vault.sol`: "), "{msg}");
    assert!(msg.contains(&files[0].display().to_string()), "{msg}");
    assert!(msg.contains(&files[1].display().to_string()), "{msg}");
    assert_eq!(compiler.calls(), 0);
    assert!(!dir.path().join("out").exists());
}
