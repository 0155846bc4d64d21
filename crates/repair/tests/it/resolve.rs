use semver::Version;
use solidifi_repair::{ResolveAction, VersionResolver, VersionTag};

#[test]
fn declared_versions_are_returned_verbatim() {
    let resolver = VersionResolver::default();
    for patch in 11..=26 {
        let src = format!("pragma solidity 0.4.{patch};\n\ncontract A {{}}\n");
        let res = resolver.resolve(&src).unwrap();
        assert_eq!(res.tag.version(), Some(&Version::new(0, 4, patch)));
        assert_eq!(res.compiler, Version::new(0, 4, patch));
        assert_eq!(res.text, src);
    }
}

#[test]
fn synthesized_pragma_resolves() {
    let resolver = VersionResolver::new(Version::new(0, 5, 0), Version::new(0, 4, 26));
    let res = resolver.resolve("// SPDX\ncontract A {}\n").unwrap();
    assert_eq!(res.action, ResolveAction::Synthesized);
    assert!(res.text.starts_with("pragma solidity ^0.5.0;\n\n// SPDX"));
    assert_eq!(res.text.lines().filter(|l| l.starts_with("pragma solidity")).count(), 1);
    assert!(matches!(VersionTag::detect(&res.text), VersionTag::Declared { .. }));
    assert_eq!(res.compiler, Version::new(0, 5, 0));
}
