//! Rewrites that let modern sources compile with the legacy `0.4` compilers.

use crate::scan;
use regex::Regex;
use semver::Version;
use std::sync::LazyLock;

static PUBLIC_CONSTRUCTOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"constructor\s*\(([^)]*)\)\s*public\s*\{").unwrap());

static EMIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bemit\s+").unwrap());

/// First compiler release that knows the `emit` keyword.
const EMIT_SINCE: Version = Version::new(0, 4, 21);

/// Turns `constructor(..) public {` into the legacy `function <Contract>(..) public {` form in
/// every contract and, for compilers older than `0.4.21`, drops `emit` keywords.
pub fn normalize_legacy(text: &str, version: &Version) -> String {
    let mut out = text.to_string();
    // back to front, so earlier spans stay valid
    for contract in scan::contracts(text).into_iter().rev() {
        if contract.kind != "contract" {
            continue;
        }
        let body = &out[contract.body.clone()];
        let Some(caps) = PUBLIC_CONSTRUCTOR.captures(body) else { continue };
        let Some(whole) = caps.get(0) else { continue };
        let legacy = format!("function {}({}) public {{", contract.name, &caps[1]);
        let at = contract.body.start + whole.start();
        out.replace_range(at..at + whole.len(), &legacy);
    }
    if *version < EMIT_SINCE {
        out = EMIT.replace_all(&out, "").into_owned();
    }
    out
}
