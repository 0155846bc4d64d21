use serde_json::Value;
use similar_asserts::assert_eq;
use solidifi_common::{Diagnostic, DiagnosticExt, errors::SolcError};
use solidifi_config::{BugType, TransformRule};
use solidifi_inject::{Approach, BugInjector, InjectError, InjectionReport};
use solidifi_repair::AutoRepairEngine;
use solidifi_test_utils::{
    AstBuilder, ScriptedCompiler,
    fixtures::{ast_output, clean_output, output_with, snippet_library, write_file},
    init_tracing,
};
use std::{fs, path::PathBuf};

const LIBRARY: &str = "\
library SafeMath {
    function add(uint a, uint b) internal pure returns (uint) {
        return a + b;
    }
}";

const BANK: &str = "\
pragma solidity ^0.4.24;

library SafeMath {
    function add(uint a, uint b) internal pure returns (uint) {
        return a + b;
    }
}

contract Bank {
    mapping(address => uint) balances;

    function deposit() public payable {
        balances[msg.sender] += msg.value;
    }

    function withdraw(uint amount) public {
        msg.sender.transfer(amount);
    }
}
";

const ADD: &str = "\
function add(uint a, uint b) internal pure returns (uint) {
        return a + b;
    }";

const DEPOSIT: &str = "\
function deposit() public payable {
        balances[msg.sender] += msg.value;
    }";

const WITHDRAW: &str = "\
function withdraw(uint amount) public {
        msg.sender.transfer(amount);
    }";

fn bank_ast(src: &str) -> Value {
    let mut b = AstBuilder::new(src);

    let add_params = b.node("ParameterList", "(uint a, uint b)", vec![]);
    let a = b.node("VariableDeclaration", "uint a", vec![]);
    let ret = b.node("Return", "return a + b;", vec![]);
    let add_body = b.node("Block", "{\n        return a + b;\n    }", vec![ret]);
    let add = b.node("FunctionDefinition", ADD, vec![a, add_params, add_body]);
    let library = b.node("ContractDefinition", LIBRARY, vec![add]);

    let balances = b.node("VariableDeclaration", "mapping(address => uint) balances", vec![]);
    let credit = b.node("ExpressionStatement", "balances[msg.sender] += msg.value;", vec![]);
    let deposit_body = b.node("Block", "{\n        balances[msg.sender] += msg.value;\n    }", vec![credit]);
    let deposit = b.node("FunctionDefinition", DEPOSIT, vec![deposit_body]);

    let params = b.node("ParameterList", "(uint amount)", vec![]);
    let amount = b.node("VariableDeclaration", "uint amount", vec![]);
    let argument = b.nth("Identifier", "amount", 1, vec![]);
    let call = b.node("FunctionCall", "msg.sender.transfer(amount)", vec![argument]);
    let transfer = b.node("ExpressionStatement", "msg.sender.transfer(amount);", vec![call]);
    let withdraw_body = b.node("Block", "{\n        msg.sender.transfer(amount);\n    }", vec![transfer]);
    let withdraw = b.node("FunctionDefinition", WITHDRAW, vec![params, amount, withdraw_body]);

    let start = src.find("contract Bank").unwrap();
    let bank = b.span("ContractDefinition", start, src.len() - 1 - start, vec![balances, deposit, withdraw]);
    b.unit(vec![library, bank])
}

struct Setup {
    dir: tempfile::TempDir,
    compiler: ScriptedCompiler,
}

impl Setup {
    fn new(src: &str, ast: Value, statements: &[&str], blocks: &[&str]) -> Self {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "src/Bank.sol", src);
        snippet_library(&dir.path().join("bugs"), "Re-entrancy", statements, blocks);
        let compiler = ScriptedCompiler::new([clean_output(), ast_output("buggy_Bank.sol", ast)]);
        Self { dir, compiler }
    }

    fn injector(&self) -> BugInjector<&ScriptedCompiler> {
        BugInjector::new(AutoRepairEngine::new(&self.compiler), self.dir.path().join("bugs"))
    }

    fn run(&self, injector: &BugInjector<&ScriptedCompiler>) -> Result<InjectionReport, InjectError> {
        let bug = BugType::new(1, "Re-entrancy");
        injector.inject(&self.dir.path().join("src/Bank.sol"), &bug, &self.dir.path().join("out"))
    }

    fn buggy(&self) -> String {
        fs::read_to_string(self.out("buggy_Bank.sol")).unwrap()
    }

    fn out(&self, name: &str) -> PathBuf {
        self.dir.path().join("out/buggy/Re-entrancy").join(name)
    }
}

fn fragments(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("// bug {i}\nuint bug{i};\n")).collect()
}

fn line(text: &str, n: usize) -> &str {
    text.lines().nth(n - 1).unwrap().trim()
}

#[test]
fn logged_lines_point_at_injected_fragments() {
    let snippets = fragments(10);
    let snippets: Vec<_> = snippets.iter().map(String::as_str).collect();
    let setup = Setup::new(BANK, bank_ast(BANK), &snippets, &[]);

    let report = setup.run(&setup.injector()).unwrap();
    // both functions, both statements and the state variable; the function bodies share
    // their end offset with the functions
    assert_eq!(report.injected(), 5);
    assert_eq!(report.candidates, 7);
    assert!(!report.exhausted);
    assert_eq!(report.repair.rounds, 0);

    let buggy = setup.buggy();
    for (i, entry) in report.log.iter().enumerate() {
        assert_eq!(entry.length, 2);
        assert_eq!(entry.approach, Approach::SnippetInjection);
        assert_eq!(line(&buggy, entry.line), format!("// bug {i}"));
        assert_eq!(line(&buggy, entry.line + 1), format!("uint bug{i};"));
        assert_eq!(buggy.matches(&format!("// bug {i}\n")).count(), 1);
    }
    let lines: Vec<_> = report.log.iter().map(|e| e.line).collect();
    assert_eq!(lines, [27, 23, 19, 15, 10]);

    // the library is untouched
    assert!(buggy.contains(LIBRARY));

    let csv = fs::read_to_string(setup.out("BugLog_Bank.csv")).unwrap();
    assert_eq!(
        csv,
        "loc,length,bug type,approach\n\
         27,2,Re-entrancy,code snippet injection\n\
         23,2,Re-entrancy,code snippet injection\n\
         19,2,Re-entrancy,code snippet injection\n\
         15,2,Re-entrancy,code snippet injection\n\
         10,2,Re-entrancy,code snippet injection\n"
    );
    assert_eq!(report.bug_log, setup.out("BugLog_Bank.csv"));

    // the source itself is left alone
    assert_eq!(fs::read_to_string(setup.dir.path().join("src/Bank.sol")).unwrap(), BANK);
    assert_eq!(setup.compiler.calls(), 2);
    assert_eq!(setup.compiler.inputs()[1].1.source_name(), Some("buggy_Bank.sol"));
}

#[test]
fn stops_when_snippets_run_out() {
    let setup = Setup::new(BANK, bank_ast(BANK), &["a();", "b();"], &[]);

    let report = setup.run(&setup.injector()).unwrap();
    assert_eq!(report.injected(), 2);
    assert!(report.exhausted);
    assert!(report.candidates > 2);

    let buggy = setup.buggy();
    for entry in report.log.iter() {
        assert_eq!(entry.length, 1);
    }
    assert_eq!(line(&buggy, report.log.entries()[0].line), "a();");
    assert_eq!(line(&buggy, report.log.entries()[1].line), "b();");
}

#[test]
fn block_form_snippets_go_after_functions() {
    let blocks = ["function bug0() public {}", "function bug1() public {}", "uint bug2;"];
    let setup = Setup::new(BANK, bank_ast(BANK), &[], &blocks);

    let report = setup.run(&setup.injector()).unwrap();
    assert_eq!(report.candidates, 3);
    assert_eq!(report.injected(), 3);

    let buggy = setup.buggy();
    let lines: Vec<_> = report.log.iter().map(|e| e.line).collect();
    assert_eq!(lines, [21, 16, 10]);
    for (entry, fragment) in report.log.iter().zip(blocks) {
        assert_eq!(line(&buggy, entry.line), fragment);
    }
    // function fragments follow the closing brace of their function
    assert_eq!(line(&buggy, 20), "}");
    assert_eq!(line(&buggy, 15), "}");
    assert_eq!(line(&buggy, 9), "contract Bank {");
}

#[test]
fn library_only_source_gets_nothing() {
    let src = format!("pragma solidity ^0.4.24;\n\n{LIBRARY}\n");
    let mut b = AstBuilder::new(&src);
    let ret = b.node("Return", "return a + b;", vec![]);
    let body = b.node("Block", "{\n        return a + b;\n    }", vec![ret]);
    let a = b.node("VariableDeclaration", "uint a", vec![]);
    let library = b.node("ContractDefinition", LIBRARY, vec![a, body]);
    let ast = b.unit(vec![library]);

    let snippets = fragments(3);
    let snippets: Vec<_> = snippets.iter().map(String::as_str).collect();
    let setup = Setup::new(&src, ast, &snippets, &snippets);

    let report = setup.run(&setup.injector()).unwrap();
    assert_eq!(report.candidates, 0);
    assert_eq!(report.injected(), 0);
    assert_eq!(setup.buggy(), src);
}

#[test]
fn code_transforms_are_logged_after_snippets() {
    let setup = Setup::new(BANK, bank_ast(BANK), &[], &[]);
    let injector = setup.injector().transforms(vec![
        TransformRule {
            bug_type: "Re-entrancy".into(),
            secure: r"msg\.sender\.transfer\((\w+)\);".into(),
            vulnerable: "require(msg.sender.call.value($1)());".into(),
        },
        TransformRule {
            bug_type: "TOD".into(),
            secure: "balances".into(),
            vulnerable: "oops".into(),
        },
    ]);

    let report = setup.run(&injector).unwrap();
    assert_eq!(report.log.count(Approach::CodeTransform), 1);
    assert_eq!(report.log.entries()[0].line, 17);
    assert!(setup.buggy().contains("        require(msg.sender.call.value(amount)());\n"));
    assert!(setup.buggy().contains("balances"));
}

#[test]
fn repair_failure_aborts_the_file() {
    let setup = Setup::new(BANK, bank_ast(BANK), &["a();"], &[]);
    let compiler = ScriptedCompiler::new([output_with([Diagnostic::error("TypeError", "Something new.")])]);
    let injector = BugInjector::new(AutoRepairEngine::new(&compiler), setup.dir.path().join("bugs"));

    let err = setup.run(&injector).unwrap_err();
    assert!(matches!(err, InjectError::Repair(_)), "{err}");
}

#[test]
fn missing_ast_is_an_environment_error() {
    let setup = Setup::new(BANK, bank_ast(BANK), &["a();"], &[]);
    let compiler = ScriptedCompiler::new([clean_output(), clean_output()]);
    let injector = BugInjector::new(AutoRepairEngine::new(&compiler), setup.dir.path().join("bugs"));

    let err = setup.run(&injector).unwrap_err();
    assert!(matches!(err, InjectError::Solc(SolcError::MissingAst(name)) if name == "buggy_Bank.sol"));
}

#[test]
fn unknown_bug_class_fails_before_writing() {
    let setup = Setup::new(BANK, bank_ast(BANK), &["a();"], &[]);
    let bug = BugType::new(5, "TOD");
    let err = setup
        .injector()
        .inject(&setup.dir.path().join("src/Bank.sol"), &bug, &setup.dir.path().join("out"))
        .unwrap_err();
    assert!(matches!(err, InjectError::Snippet(_)));
    assert!(!setup.dir.path().join("out/buggy/TOD").exists());
}
