use similar_asserts::assert_eq;
use solidifi_cli::cmd::clean::{Cleaned, clean_file, execute};
use solidifi_common::term::BatchProgress;
use solidifi_config::Config;
use solidifi_repair::{ResolveAction, VersionResolver};
use solidifi_test_utils::{fixtures::write_file, init_tracing};
use std::fs;

const TOKEN: &str = "\
contract Token {
    event Minted(uint amount);

    constructor(uint supply) public {
        emit Minted(supply);
    }
}
";

#[test]
fn synthesizes_pragma_and_rewrites_constructor() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "Token.sol", TOKEN);

    let cleaned = clean_file(&path, &VersionResolver::default()).unwrap();
    assert_eq!(cleaned, Cleaned { pragma: ResolveAction::Synthesized, changed: true });
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "\
pragma solidity ^0.4.25;

contract Token {
    event Minted(uint amount);

    function Token(uint supply) public {
        emit Minted(supply);
    }
}
"
    );

    let again = clean_file(&path, &VersionResolver::default()).unwrap();
    assert_eq!(again, Cleaned { pragma: ResolveAction::Unchanged, changed: false });
}

#[test]
fn strips_emit_for_old_compilers() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "Token.sol", &format!("pragma solidity 0.4.19;\n\n{TOKEN}"));

    let cleaned = clean_file(&path, &VersionResolver::default()).unwrap();
    assert!(cleaned.changed);
    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("        Minted(supply);\n"), "{text}");
    assert!(text.contains("function Token(uint supply) public {"), "{text}");
}

#[test]
fn batch_continues_past_unreadable_pragma() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let good = write_file(dir.path(), "a/Good.sol", TOKEN);
    let bad = write_file(dir.path(), "b/Bad.sol", "pragma solidity latest;\ncontract Bad {}\n");

    let config = Config { jobs: 2, ..Default::default() };
    let files = vec![good.clone(), bad.clone()];
    let outcome = execute(&config, &files, BatchProgress::hidden(files.len())).unwrap();

    assert_eq!(outcome.succeeded.len(), 1);
    assert_eq!(outcome.succeeded[0].0, good);
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].0, bad);
    let err = format!("{:#}", outcome.failed[0].1);
    assert!(err.contains("failed to clean"), "{err}");
    outcome.ensure_any_succeeded().unwrap();
    assert_eq!(fs::read_to_string(&bad).unwrap(), "pragma solidity latest;\ncontract Bad {}\n");
}
